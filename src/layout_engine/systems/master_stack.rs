use crate::layout_engine::LayoutInput;
use crate::layout_engine::systems::LayoutSystem;
use crate::layout_engine::utils::fraction;
use crate::model::ClientId;
use crate::sys::geometry::Rect;

/// One master column on the left, the remaining clients stacked on the
/// right with equal heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterStackLayoutSystem {
    gap: i32,
    border: i32,
}

impl MasterStackLayoutSystem {
    pub fn new(gap: i32, border: i32) -> Self { Self { gap, border } }
}

impl LayoutSystem for MasterStackLayoutSystem {
    fn calculate_layout(&self, input: &LayoutInput<'_>) -> Vec<(ClientId, Rect)> {
        let (area, gap) = (input.area, self.gap);
        let n = input.windows.len() as i32;
        let Some((master, stack)) = input.windows.split_first() else {
            return Vec::new();
        };

        if stack.is_empty() {
            return vec![(master.client, area.inset(gap).without_border(self.border))];
        }

        let master_width = fraction(area.width - 3 * gap, input.ratio);
        let master_rect = Rect::new(area.x + gap, area.y + gap, master_width, area.height - 2 * gap);

        let stack_x = master_rect.max_x() + gap;
        let stack_width = area.width - master_width - 3 * gap;
        let stack_height = (area.height - n * gap) / (n - 1);

        let mut out = Vec::with_capacity(input.windows.len());
        out.push((master.client, master_rect.without_border(self.border)));
        for (i, window) in stack.iter().enumerate() {
            let y = area.y + gap + i as i32 * (stack_height + gap);
            let rect = Rect::new(stack_x, y, stack_width, stack_height);
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

    fn layout(n: usize, ratio: f64) -> Vec<Rect> {
        let windows = windows(n, 0);
        let input = LayoutInput {
            area: Rect::new(0, 0, 1000, 600),
            ratio,
            scroll_offset: 0,
            windows: &windows,
        };
        MasterStackLayoutSystem::new(10, 0)
            .calculate_layout(&input)
            .into_iter()
            .map(|(_, r)| r)
            .collect()
    }

    #[test]
    fn single_client_fills_area_minus_gap() {
        assert_eq!(layout(1, 1.0), vec![Rect::new(10, 10, 980, 580)]);
    }

    #[test]
    fn master_takes_ratio_of_width_minus_three_gaps() {
        let rects = layout(2, 0.5);
        assert_eq!(rects[0], Rect::new(10, 10, 485, 580));
        assert_eq!(rects[1], Rect::new(505, 10, 485, 580));
    }

    #[test]
    fn stack_slots_are_separated_by_gaps() {
        let rects = layout(4, 0.5);
        // (600 - 4 * 10) / 3
        let h = 186;
        assert_eq!(rects[1], Rect::new(505, 10, 485, h));
        assert_eq!(rects[2], Rect::new(505, 10 + h + 10, 485, h));
        assert_eq!(rects[3], Rect::new(505, 10 + 2 * (h + 10), 485, h));
    }

    #[test]
    fn borders_shrink_but_never_collapse() {
        let windows = windows(2, 0);
        let input = LayoutInput {
            area: Rect::new(0, 0, 40, 600),
            ratio: 1.0,
            scroll_offset: 0,
            windows: &windows,
        };
        let rects = MasterStackLayoutSystem::new(10, 3).calculate_layout(&input);
        assert_eq!(rects[0].1, Rect::new(10, 10, 4, 574));
        assert_eq!(rects[1].1.width, 1);
    }
}
