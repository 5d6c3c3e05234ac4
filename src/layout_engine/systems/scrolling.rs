use crate::layout_engine::systems::LayoutSystem;
use crate::layout_engine::{Direction, LayoutInput, TiledWindow};
use crate::model::ClientId;
use crate::sys::geometry::Rect;

/// Full-height columns laid out left to right on a strip wider than the
/// screen, viewed through a horizontal scroll offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollingLayoutSystem {
    gap: i32,
    border: i32,
}

impl ScrollingLayoutSystem {
    pub fn new(gap: i32, border: i32) -> Self { Self { gap, border } }

    /// Width of the whole strip including the outer gaps.
    pub fn total_width(&self, windows: &[TiledWindow]) -> i32 {
        windows.iter().fold(self.gap, |acc, w| acc + w.column_width + self.gap)
    }

    pub fn max_offset(&self, area: Rect, windows: &[TiledWindow]) -> i32 {
        (self.total_width(windows) - area.width).max(0)
    }

    pub fn clamp_offset(&self, area: Rect, windows: &[TiledWindow], offset: i32) -> i32 {
        offset.clamp(0, self.max_offset(area, windows))
    }

    /// Offsets at which each column is flush with the left edge of the area.
    fn column_stops<'a>(&self, windows: &'a [TiledWindow]) -> impl Iterator<Item = i32> + 'a {
        let gap = self.gap;
        windows.iter().scan(0, move |start, w| {
            let stop = *start;
            *start += w.column_width + gap;
            Some(stop)
        })
    }

    /// The next column boundary from the current offset in `direction`.
    pub fn next_stop(&self, input: &LayoutInput<'_>, direction: Direction) -> i32 {
        let current = input.scroll_offset;
        let mut stops = self.column_stops(input.windows);
        let target = match direction {
            Direction::Right => stops.find(|&s| s > current),
            Direction::Left => stops.take_while(|&s| s < current).last(),
        };
        let target = target.unwrap_or(match direction {
            Direction::Right => i32::MAX,
            Direction::Left => 0,
        });
        self.clamp_offset(input.area, input.windows, target)
    }

    /// The smallest change of offset that brings `client`'s column fully into
    /// view, as far as it fits.
    pub fn reveal(&self, input: &LayoutInput<'_>, client: ClientId) -> i32 {
        let current = input.scroll_offset;
        let stops = self.column_stops(input.windows);
        let Some((start, window)) = stops
            .zip(input.windows)
            .find(|(_, w)| w.client == client)
        else {
            return current;
        };
        let end = start + window.column_width + 2 * self.gap;
        let target = if start < current {
            start
        } else if end > current + input.area.width {
            end - input.area.width
        } else {
            current
        };
        self.clamp_offset(input.area, input.windows, target)
    }
}

impl LayoutSystem for ScrollingLayoutSystem {
    fn calculate_layout(&self, input: &LayoutInput<'_>) -> Vec<(ClientId, Rect)> {
        let (area, gap) = (input.area, self.gap);
        let height = area.height - 2 * gap;
        let mut x = area.x + gap - input.scroll_offset;
        input
            .windows
            .iter()
            .map(|window| {
                let rect = Rect::new(x, area.y + gap, window.column_width, height);
                x += window.column_width + gap;
                (window.client, rect.without_border(self.border))
            })
            .collect()
    }
}

/// Linear interpolation of the scroll offset over a fixed number of steps.
/// The last value is always exactly the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollAnimation {
    from: i32,
    to: i32,
    steps: u32,
    step: u32,
}

impl ScrollAnimation {
    pub fn new(from: i32, to: i32, steps: u32) -> Self {
        let steps = if from == to { 0 } else { steps.max(1) };
        ScrollAnimation { from, to, steps, step: 0 }
    }
}

impl Iterator for ScrollAnimation {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.step >= self.steps {
            return None;
        }
        self.step += 1;
        let delta = i64::from(self.to - self.from) * i64::from(self.step) / i64::from(self.steps);
        Some(self.from + delta as i32)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.steps - self.step) as usize;
        (left, Some(left))
    }
}

impl ExactSizeIterator for ScrollAnimation {}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::tests::windows;

    const AREA: Rect = Rect::new(0, 0, 1000, 600);

    fn input(windows: &[TiledWindow], scroll_offset: i32) -> LayoutInput<'_> {
        LayoutInput { area: AREA, ratio: 1.0, scroll_offset, windows }
    }

    #[test]
    fn columns_start_at_gap_minus_offset() {
        let windows = windows(3, 600);
        let system = ScrollingLayoutSystem::new(10, 0);
        let rects: Vec<_> =
            system.calculate_layout(&input(&windows, 100)).into_iter().map(|(_, r)| r).collect();
        assert_eq!(
            rects,
            vec![
                Rect::new(-90, 10, 600, 580),
                Rect::new(520, 10, 600, 580),
                Rect::new(1130, 10, 600, 580),
            ]
        );
    }

    #[test]
    fn offset_is_clamped_to_strip() {
        let windows = windows(3, 600);
        let system = ScrollingLayoutSystem::new(10, 0);
        assert_eq!(system.total_width(&windows), 1840);
        assert_eq!(system.clamp_offset(AREA, &windows, 5000), 840);
        assert_eq!(system.clamp_offset(AREA, &windows, -5), 0);
        assert_eq!(system.max_offset(AREA, &windows[..1]), 0);
    }

    #[test]
    fn steps_between_column_boundaries() {
        let windows = windows(3, 600);
        let system = ScrollingLayoutSystem::new(10, 0);
        assert_eq!(system.next_stop(&input(&windows, 0), Direction::Right), 610);
        assert_eq!(system.next_stop(&input(&windows, 610), Direction::Right), 840);
        assert_eq!(system.next_stop(&input(&windows, 840), Direction::Right), 840);
        assert_eq!(system.next_stop(&input(&windows, 840), Direction::Left), 610);
        assert_eq!(system.next_stop(&input(&windows, 0), Direction::Left), 0);
    }

    #[test]
    fn reveal_scrolls_just_enough() {
        let windows = windows(3, 600);
        let system = ScrollingLayoutSystem::new(10, 0);
        assert_eq!(system.reveal(&input(&windows, 0), windows[1].client), 230);
        assert_eq!(system.reveal(&input(&windows, 840), windows[0].client), 0);
        assert_eq!(system.reveal(&input(&windows, 0), windows[0].client), 0);
    }

    #[test]
    fn animation_ends_exactly_on_target() {
        let offsets: Vec<_> = ScrollAnimation::new(0, 610, 8).collect();
        assert_eq!(offsets.len(), 8);
        assert_eq!(offsets.first(), Some(&76));
        assert_eq!(offsets.last(), Some(&610));
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));

        assert_eq!(ScrollAnimation::new(40, 40, 8).count(), 0);
        assert_eq!(ScrollAnimation::new(100, 0, 0).collect::<Vec<_>>(), vec![0]);
    }
}
