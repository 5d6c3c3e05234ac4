use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self { Self { x, y } }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self { Self { width, height } }
}

/// An integer rectangle in root-window coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn from_parts(origin: Point, size: Size) -> Self {
        Self::new(origin.x, origin.y, size.width, size.height)
    }

    pub fn origin(&self) -> Point { Point::new(self.x, self.y) }

    pub fn size(&self) -> Size { Size::new(self.width, self.height) }

    pub fn center(&self) -> Point { Point::new(self.x + self.width / 2, self.y + self.height / 2) }

    pub fn max_x(&self) -> i32 { self.x + self.width }

    pub fn max_y(&self) -> i32 { self.y + self.height }

    /// A rectangle of `size` whose center coincides with this rectangle's.
    pub fn centered(&self, size: Size) -> Rect {
        Rect::new(
            self.x + (self.width - size.width) / 2,
            self.y + (self.height - size.height) / 2,
            size.width,
            size.height,
        )
    }

    pub fn inset(&self, amount: i32) -> Rect {
        Rect::new(
            self.x + amount,
            self.y + amount,
            self.width - 2 * amount,
            self.height - 2 * amount,
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Shrinks width and height by twice the border and clamps both to at
    /// least one pixel.
    pub fn without_border(&self, border: i32) -> Rect {
        Rect::new(
            self.x,
            self.y,
            (self.width - 2 * border).max(1),
            (self.height - 2 * border).max(1),
        )
    }

    pub fn clamp_size(&self) -> Rect {
        Rect::new(self.x, self.y, self.width.max(1), self.height.max(1))
    }
}

/// Edge reservation advertised by a window such as a panel or dock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strut {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

impl Strut {
    pub fn max(self, other: Strut) -> Strut {
        Strut {
            left: self.left.max(other.left),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Removes the reserved edges from `screen`.
    pub fn apply(&self, screen: Rect) -> Rect {
        let left = to_i32(self.left);
        let right = to_i32(self.right);
        let top = to_i32(self.top);
        let bottom = to_i32(self.bottom);
        Rect::new(
            screen.x + left,
            screen.y + top,
            (screen.width - left - right).max(1),
            (screen.height - top - bottom).max(1),
        )
    }
}

fn to_i32(value: u32) -> i32 { i32::try_from(value).unwrap_or(i32::MAX) }

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn centered_keeps_size() {
        let screen = Rect::new(0, 0, 1000, 600);
        assert_eq!(screen.centered(Size::new(200, 100)), Rect::new(400, 250, 200, 100));
    }

    #[test]
    fn strut_takes_per_edge_maximum() {
        let panel = Strut { top: 30, ..Default::default() };
        let dock = Strut { top: 10, left: 48, ..Default::default() };
        let combined = panel.max(dock);
        assert_eq!(combined, Strut { left: 48, right: 0, top: 30, bottom: 0 });
        assert_eq!(combined.apply(Rect::new(0, 0, 1000, 600)), Rect::new(48, 30, 952, 570));
    }

    #[test]
    fn oversized_struts_never_produce_empty_rects() {
        let strut = Strut { left: 700, right: 700, ..Default::default() };
        assert_eq!(strut.apply(Rect::new(0, 0, 1000, 600)).width, 1);
    }
}
