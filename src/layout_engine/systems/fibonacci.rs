use crate::layout_engine::LayoutInput;
use crate::layout_engine::systems::LayoutSystem;
use crate::layout_engine::utils::fraction;
use crate::model::ClientId;
use crate::sys::geometry::Rect;

/// Each client takes `ratio` of what is left, splitting alternately left and
/// top; the last client gets the whole remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FibonacciLayoutSystem {
    gap: i32,
    border: i32,
}

impl FibonacciLayoutSystem {
    pub fn new(gap: i32, border: i32) -> Self { Self { gap, border } }
}

impl LayoutSystem for FibonacciLayoutSystem {
    fn calculate_layout(&self, input: &LayoutInput<'_>) -> Vec<(ClientId, Rect)> {
        let gap = self.gap;
        let mut remaining = input.area.inset(gap);
        let mut out = Vec::with_capacity(input.windows.len());

        for (i, window) in input.windows.iter().enumerate() {
            if i + 1 == input.windows.len() {
                out.push((window.client, remaining.without_border(self.border)));
                break;
            }
            let rect = if i % 2 == 0 {
                let width = fraction(remaining.width - gap, input.ratio);
                let rect = Rect::new(remaining.x, remaining.y, width, remaining.height);
                remaining = Rect::new(
                    rect.max_x() + gap,
                    remaining.y,
                    remaining.width - width - gap,
                    remaining.height,
                );
                rect
            } else {
                let height = fraction(remaining.height - gap, input.ratio);
                let rect = Rect::new(remaining.x, remaining.y, remaining.width, height);
                remaining = Rect::new(
                    remaining.x,
                    rect.max_y() + gap,
                    remaining.width,
                    remaining.height - height - gap,
                );
                rect
            };
            out.push((window.client, rect.without_border(self.border)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::tests::windows;

    #[test]
    fn splits_alternate_between_axes() {
        let windows = windows(3, 0);
        let input = LayoutInput {
            area: Rect::new(0, 0, 1000, 600),
            ratio: 0.5,
            scroll_offset: 0,
            windows: &windows,
        };
        let rects: Vec<_> = FibonacciLayoutSystem::new(10, 0)
            .calculate_layout(&input)
            .into_iter()
            .map(|(_, r)| r)
            .collect();
        assert_eq!(
            rects,
            vec![
                Rect::new(10, 10, 485, 580),
                Rect::new(505, 10, 485, 285),
                Rect::new(505, 305, 485, 285),
            ]
        );
    }

    #[test]
    fn single_client_takes_everything() {
        let windows = windows(1, 0);
        let input = LayoutInput {
            area: Rect::new(0, 0, 1000, 600),
            ratio: 1.0,
            scroll_offset: 0,
            windows: &windows,
        };
        let rects = FibonacciLayoutSystem::new(10, 0).calculate_layout(&input);
        assert_eq!(rects[0].1, Rect::new(10, 10, 980, 580));
    }
}
