//! Pure geometry: which rectangle each tiled client of a workspace gets.

mod systems;
mod utils;

pub use systems::{
    FibonacciLayoutSystem, LayoutSystem, LayoutSystemKind, MasterStackLayoutSystem,
    RadialLayoutSystem, ScrollAnimation, ScrollingLayoutSystem,
};
pub use utils::usable_area;

pub use crate::common::config::LayoutMode;
use crate::common::config::LayoutSettings;
use crate::model::ClientId;
use crate::sys::geometry::Rect;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// A Normal client as seen by the layout systems.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TiledWindow {
    pub client: ClientId,
    /// Only used by the scrolling layout.
    pub column_width: i32,
}

#[derive(Clone, Copy, Debug)]
pub struct LayoutInput<'a> {
    /// Screen minus struts.
    pub area: Rect,
    pub ratio: f64,
    pub scroll_offset: i32,
    pub windows: &'a [TiledWindow],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutEngine {
    gap: i32,
    border: i32,
}

impl LayoutEngine {
    pub fn new(settings: &LayoutSettings) -> Self {
        LayoutEngine {
            gap: settings.gap.max(0),
            border: settings.border.max(0),
        }
    }

    pub fn gap(&self) -> i32 { self.gap }

    pub fn system(&self, mode: LayoutMode) -> LayoutSystemKind {
        let (gap, border) = (self.gap, self.border);
        match mode {
            LayoutMode::MasterStack => MasterStackLayoutSystem::new(gap, border).into(),
            LayoutMode::Fibonacci => FibonacciLayoutSystem::new(gap, border).into(),
            LayoutMode::Radial => RadialLayoutSystem::new(gap, border).into(),
            LayoutMode::Scrolling => ScrollingLayoutSystem::new(gap, border).into(),
        }
    }

    pub fn calculate(&self, mode: LayoutMode, input: &LayoutInput<'_>) -> Vec<(ClientId, Rect)> {
        if input.windows.is_empty() {
            return Vec::new();
        }
        self.system(mode).calculate_layout(input)
    }

    /// Where a floating client that the user never placed goes.
    pub fn center_floating(&self, area: Rect, frame: Rect) -> Rect {
        area.centered(frame.size()).clamp_size()
    }

    pub fn scrolling(&self) -> ScrollingLayoutSystem { ScrollingLayoutSystem::new(self.gap, self.border) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use slotmap::SlotMap;

    use super::*;
    use crate::sys::geometry::Size;

    pub(crate) fn windows(n: usize, column_width: i32) -> Vec<TiledWindow> {
        let mut map = SlotMap::<ClientId, ()>::with_key();
        (0..n)
            .map(|_| TiledWindow { client: map.insert(()), column_width })
            .collect()
    }

    #[test]
    fn every_mode_is_deterministic_and_never_degenerate() {
        let engine = LayoutEngine::new(&LayoutSettings { gap: 10, border: 2, ratio_step: 0.05 });
        let windows = windows(7, 600);
        let input = LayoutInput {
            area: Rect::new(0, 20, 1000, 580),
            ratio: 0.5,
            scroll_offset: 0,
            windows: &windows,
        };
        for mode in [
            LayoutMode::MasterStack,
            LayoutMode::Fibonacci,
            LayoutMode::Radial,
            LayoutMode::Scrolling,
        ] {
            let first = engine.calculate(mode, &input);
            assert_eq!(first, engine.calculate(mode, &input), "{mode}");
            assert_eq!(first.len(), windows.len(), "{mode}");
            assert!(first.iter().all(|(_, r)| r.width >= 1 && r.height >= 1), "{mode}");
        }
    }

    #[test]
    fn empty_workspace_has_no_layout() {
        let engine = LayoutEngine::new(&LayoutSettings::default());
        let input = LayoutInput {
            area: Rect::new(0, 0, 1000, 600),
            ratio: 1.0,
            scroll_offset: 0,
            windows: &[],
        };
        assert!(engine.calculate(LayoutMode::Radial, &input).is_empty());
    }

    #[test]
    fn floating_windows_are_centered() {
        let engine = LayoutEngine::new(&LayoutSettings::default());
        let frame = Rect::from_parts(Default::default(), Size::new(400, 300));
        assert_eq!(
            engine.center_floating(Rect::new(0, 30, 1000, 570), frame),
            Rect::new(300, 165, 400, 300)
        );
    }
}
