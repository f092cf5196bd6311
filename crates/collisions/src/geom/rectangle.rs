//! Axis-aligned rectangle.

use super::{LineSegment, Point};

/// Axis-aligned bounding box stored as origin (top-left) and size.
///
/// Edges are part of the rectangle: `contains` and `intersects` are inclusive,
/// so two rectangles sharing an edge intersect.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two opposite corners.
    pub fn from_corners(a: Point, b: Point) -> Self {
        let min_x = a.x.min(b.x);
        let min_y = a.y.min(b.y);
        Self {
            x: min_x,
            y: min_y,
            width: a.x.max(b.x) - min_x,
            height: a.y.max(b.y) - min_y,
        }
    }

    #[inline]
    pub fn min_x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn min_y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    /// Get the centre point.
    #[inline]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Check if the point lies inside or on the edge.
    #[inline]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x() && x <= self.max_x() && y >= self.min_y() && y <= self.max_y()
    }

    #[inline]
    pub fn contains_point(&self, point: Point) -> bool {
        self.contains(point.x, point.y)
    }

    /// Check if `other` lies entirely within this rectangle.
    #[inline]
    pub fn contains_rectangle(&self, other: &Rectangle) -> bool {
        other.min_x() >= self.min_x()
            && other.max_x() <= self.max_x()
            && other.min_y() >= self.min_y()
            && other.max_y() <= self.max_y()
    }

    /// Check if two rectangles overlap or touch.
    #[inline]
    pub fn intersects(&self, other: &Rectangle) -> bool {
        self.min_x() <= other.max_x()
            && self.max_x() >= other.min_x()
            && self.min_y() <= other.max_y()
            && self.max_y() >= other.min_y()
    }

    /// The overlapping region, or `None` when the rectangles are disjoint.
    /// Touching rectangles yield a zero-area intersection.
    pub fn intersection(&self, other: &Rectangle) -> Option<Rectangle> {
        if !self.intersects(other) {
            return None;
        }
        let min_x = self.min_x().max(other.min_x());
        let min_y = self.min_y().max(other.min_y());
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        Some(Rectangle::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    #[inline]
    pub fn intersects_line_segment(&self, segment: &LineSegment) -> bool {
        segment.intersects(self)
    }

    /// Split into four equal quadrants: top-left, top-right, bottom-left, bottom-right.
    pub fn quadrants(&self) -> [Rectangle; 4] {
        let center = self.center();
        let left_w = center.x - self.min_x();
        let right_w = self.max_x() - center.x;
        let top_h = center.y - self.min_y();
        let bottom_h = self.max_y() - center.y;
        [
            Rectangle::new(self.x, self.y, left_w, top_h),
            Rectangle::new(center.x, self.y, right_w, top_h),
            Rectangle::new(self.x, center.y, left_w, bottom_h),
            Rectangle::new(center.x, center.y, right_w, bottom_h),
        ]
    }

    /// All four components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_edge_inclusive() {
        let r = Rectangle::new(0.0, 0.0, 64.0, 64.0);
        assert!(r.contains(0.0, 0.0));
        assert!(r.contains(64.0, 64.0));
        assert!(r.contains(32.0, 10.0));
        assert!(!r.contains(64.1, 0.0));
        assert!(!r.contains(-0.1, 0.0));
        assert!(!r.contains(f32::NAN, 0.0));
    }

    #[test]
    fn test_intersects() {
        let a = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let b = Rectangle::new(5.0, 5.0, 10.0, 10.0);
        let c = Rectangle::new(20.0, 20.0, 10.0, 10.0);
        let touching = Rectangle::new(10.0, 0.0, 10.0, 10.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!c.intersects(&a));
        assert!(a.intersects(&touching));
    }

    #[test]
    fn test_intersection() {
        let a = Rectangle::new(0.0, 0.0, 10.0, 10.0);
        let b = Rectangle::new(5.0, 2.0, 10.0, 4.0);
        assert_eq!(a.intersection(&b), Some(Rectangle::new(5.0, 2.0, 5.0, 4.0)));
        assert_eq!(a.intersection(&Rectangle::new(11.0, 0.0, 1.0, 1.0)), None);

        let edge = a.intersection(&Rectangle::new(10.0, 0.0, 5.0, 10.0)).unwrap();
        assert_eq!(edge.width, 0.0);
    }

    #[test]
    fn test_quadrants_cover_parent() {
        let r = Rectangle::new(0.0, 0.0, 128.0, 128.0);
        let [tl, tr, bl, br] = r.quadrants();
        assert_eq!(tl, Rectangle::new(0.0, 0.0, 64.0, 64.0));
        assert_eq!(tr, Rectangle::new(64.0, 0.0, 64.0, 64.0));
        assert_eq!(bl, Rectangle::new(0.0, 64.0, 64.0, 64.0));
        assert_eq!(br, Rectangle::new(64.0, 64.0, 64.0, 64.0));
    }

    #[test]
    fn test_from_corners() {
        let r = Rectangle::from_corners(Point::new(10.0, 2.0), Point::new(4.0, 8.0));
        assert_eq!(r, Rectangle::new(4.0, 2.0, 6.0, 6.0));
        assert!(r.contains_rectangle(&Rectangle::new(5.0, 3.0, 1.0, 1.0)));
        assert!(!r.contains_rectangle(&Rectangle::new(5.0, 3.0, 10.0, 1.0)));
    }
}
