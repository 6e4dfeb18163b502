//! Integer screen geometry shared by every control-core component.

use serde::{Deserialize, Serialize};

/// A pixel position on the virtual screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = f64::from(other.x) - f64::from(self.x);
        let dy = f64::from(other.y) - f64::from(self.y);
        (dx * dx + dy * dy).sqrt()
    }
}

/// An axis-aligned screen rectangle.
///
/// Extents are unsigned, so degenerate (zero-area) rectangles are
/// representable but negative ones are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// X coordinate of the right edge.
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Y coordinate of the bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    /// Containment is inclusive on all four edges.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Midpoint with integer truncation on each axis.
    pub fn center(&self) -> Point {
        Point::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Interior intersection test: zero-area rectangles never overlap and
    /// touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x.max(other.x) < self.right().min(other.right())
            && self.y.max(other.y) < self.bottom().min(other.bottom())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_inclusive_on_all_edges() {
        let rect = Rect::new(10, 20, 30, 40);
        assert!(rect.contains(Point::new(10, 20)));
        assert!(rect.contains(Point::new(40, 60)));
        assert!(rect.contains(Point::new(10, 60)));
        assert!(rect.contains(Point::new(40, 20)));
    }

    #[test]
    fn contains_excludes_one_pixel_past_any_edge() {
        let rect = Rect::new(10, 20, 30, 40);
        assert!(!rect.contains(Point::new(9, 20)));
        assert!(!rect.contains(Point::new(41, 20)));
        assert!(!rect.contains(Point::new(10, 19)));
        assert!(!rect.contains(Point::new(10, 61)));
    }

    #[test]
    fn center_truncates_odd_extents() {
        assert_eq!(Rect::new(0, 0, 5, 5).center(), Point::new(2, 2));
        assert_eq!(Rect::new(100, 100, 100, 50).center(), Point::new(150, 125));
    }

    #[test]
    fn overlaps_requires_interior_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        let touching = Rect::new(10, 0, 10, 10);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&touching));
        assert!(!touching.overlaps(&a));
    }

    #[test]
    fn zero_area_rect_never_overlaps() {
        let line = Rect::new(5, 0, 0, 10);
        let body = Rect::new(0, 0, 10, 10);
        assert!(!line.overlaps(&body));
        assert!(!body.overlaps(&line));
    }

    #[test]
    fn distance_is_euclidean() {
        let d = Point::new(0, 0).distance_to(Point::new(3, 4));
        assert!((d - 5.0).abs() < 1e-9);
    }
}
