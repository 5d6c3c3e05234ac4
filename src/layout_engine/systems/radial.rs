use std::f64::consts::TAU;

use crate::layout_engine::LayoutInput;
use crate::layout_engine::systems::LayoutSystem;
use crate::layout_engine::utils::fraction;
use crate::model::ClientId;
use crate::sys::geometry::{Point, Rect, Size};

/// The first client as a square in the middle of the area, the others as
/// half-size squares on a widening spiral around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadialLayoutSystem {
    gap: i32,
    border: i32,
}

impl RadialLayoutSystem {
    pub fn new(gap: i32, border: i32) -> Self { Self { gap, border } }

    fn center_side(&self, area: Rect, ratio: f64) -> i32 { fraction(area.width.min(area.height), ratio) }

    /// Center of satellite `i` (1-based) out of `n` clients.
    fn satellite_center(&self, area: Rect, side: i32, i: usize, n: usize) -> Point {
        let satellite = side / 2;
        let initial_radius = f64::from(side) / 2.0 + f64::from(self.gap) + f64::from(satellite) / 2.0;
        let radius = initial_radius + (i - 1) as f64 * f64::from(self.gap);
        let angle = TAU * (i - 1) as f64 / (n - 1) as f64;
        let center = area.center();
        Point::new(
            center.x + (radius * angle.cos()).round() as i32,
            center.y + (radius * angle.sin()).round() as i32,
        )
    }
}

impl LayoutSystem for RadialLayoutSystem {
    fn calculate_layout(&self, input: &LayoutInput<'_>) -> Vec<(ClientId, Rect)> {
        let area = input.area;
        let n = input.windows.len();
        let side = self.center_side(area, input.ratio);
        let satellite = Size::new(side / 2, side / 2);

        input
            .windows
            .iter()
            .enumerate()
            .map(|(i, window)| {
                let rect = if i == 0 {
                    area.centered(Size::new(side, side))
                } else {
                    let c = self.satellite_center(area, side, i, n);
                    Rect::new(
                        c.x - satellite.width / 2,
                        c.y - satellite.height / 2,
                        satellite.width,
                        satellite.height,
                    )
                };
                (window.client, rect.without_border(self.border))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::layout_engine::tests::windows;

    #[test]
    fn five_clients_sit_on_a_widening_spiral() {
        let windows = windows(5, 0);
        let input = LayoutInput {
            area: Rect::new(0, 0, 1000, 600),
            ratio: 0.5,
            scroll_offset: 0,
            windows: &windows,
        };
        let rects: Vec<_> = RadialLayoutSystem::new(10, 0)
            .calculate_layout(&input)
            .into_iter()
            .map(|(_, r)| r)
            .collect();

        // side 300, satellites 150, initial radius 150 + 10 + 75.
        assert_eq!(rects[0], Rect::new(350, 150, 300, 300));
        let center = Point::new(500, 300);
        let expected = [
            Point::new(center.x + 235, center.y),
            Point::new(center.x, center.y + 245),
            Point::new(center.x - 255, center.y),
            Point::new(center.x, center.y - 265),
        ];
        for (rect, expected) in rects[1..].iter().zip(expected) {
            assert_eq!(rect.size(), Size::new(150, 150));
            assert_eq!(rect.center(), expected);
        }
    }

    #[test]
    fn lone_client_is_a_centered_square() {
        let windows = windows(1, 0);
        let input = LayoutInput {
            area: Rect::new(0, 30, 1000, 570),
            ratio: 1.0,
            scroll_offset: 0,
            windows: &windows,
        };
        let rects = RadialLayoutSystem::new(10, 0).calculate_layout(&input);
        assert_eq!(rects[0].1, Rect::new(215, 30, 570, 570));
    }
}
