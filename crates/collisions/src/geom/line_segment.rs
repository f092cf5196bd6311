//! Line segment.

use glam::Vec2;

use super::{Point, Rectangle};

/// A finite segment between `(x1, y1)` and `(x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineSegment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl LineSegment {
    /// Distance under which a point counts as lying on the segment.
    pub const TOLERANCE: f32 = 1e-3;

    pub const fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_points(start: Point, end: Point) -> Self {
        Self::new(start.x, start.y, end.x, end.y)
    }

    #[inline]
    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    #[inline]
    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.start().distance_to(&self.end())
    }

    /// Slab test (Liang–Barsky clip). Touching an edge or corner counts.
    pub fn intersects(&self, rect: &Rectangle) -> bool {
        let dx = self.x2 - self.x1;
        let dy = self.y2 - self.y1;
        let mut t_enter = 0.0_f32;
        let mut t_exit = 1.0_f32;

        let slabs = [
            (-dx, self.x1 - rect.min_x()),
            (dx, rect.max_x() - self.x1),
            (-dy, self.y1 - rect.min_y()),
            (dy, rect.max_y() - self.y1),
        ];
        for (p, q) in slabs {
            if p == 0.0 {
                // Parallel to this slab: reject only when outside it.
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                if t > t_exit {
                    return false;
                }
                t_enter = t_enter.max(t);
            } else {
                if t < t_enter {
                    return false;
                }
                t_exit = t_exit.min(t);
            }
        }
        t_enter <= t_exit
    }

    /// Shortest distance from `point` to any point of the segment.
    pub fn distance_to(&self, point: Point) -> f32 {
        let a = Vec2::from(self.start());
        let ab = Vec2::from(self.end()) - a;
        let p = Vec2::from(point);
        let len_sq = ab.length_squared();
        if len_sq == 0.0 {
            return p.distance(a);
        }
        let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
        p.distance(a + ab * t)
    }

    /// Whether `point` lies on the segment, within [`Self::TOLERANCE`].
    #[inline]
    pub fn contains(&self, point: Point) -> bool {
        self.distance_to(point) <= Self::TOLERANCE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_rectangle() {
        let diagonal = LineSegment::new(0.0, 0.0, 128.0, 128.0);
        assert!(diagonal.intersects(&Rectangle::new(0.0, 0.0, 32.0, 32.0)));
        assert!(diagonal.intersects(&Rectangle::new(96.0, 96.0, 32.0, 32.0)));
        assert!(!diagonal.intersects(&Rectangle::new(96.0, 0.0, 32.0, 32.0)));
        assert!(!diagonal.intersects(&Rectangle::new(0.0, 96.0, 32.0, 32.0)));
        // Passing exactly through a corner.
        assert!(diagonal.intersects(&Rectangle::new(64.0, 0.0, 64.0, 64.0)));
    }

    #[test]
    fn test_intersects_stops_at_endpoints() {
        let short = LineSegment::new(0.0, 0.0, 10.0, 0.0);
        assert!(!short.intersects(&Rectangle::new(11.0, -1.0, 5.0, 2.0)));
        assert!(short.intersects(&Rectangle::new(10.0, -1.0, 5.0, 2.0)));
    }

    #[test]
    fn test_axis_parallel() {
        let vertical = LineSegment::new(5.0, -10.0, 5.0, 10.0);
        assert!(vertical.intersects(&Rectangle::new(0.0, 0.0, 10.0, 10.0)));
        assert!(!vertical.intersects(&Rectangle::new(6.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_degenerate_segment() {
        let dot = LineSegment::new(3.0, 3.0, 3.0, 3.0);
        assert!(dot.intersects(&Rectangle::new(0.0, 0.0, 10.0, 10.0)));
        assert!(!dot.intersects(&Rectangle::new(4.0, 4.0, 10.0, 10.0)));
        assert!(dot.contains(Point::new(3.0, 3.0)));
    }

    #[test]
    fn test_contains_point() {
        let diagonal = LineSegment::new(0.0, 0.0, 128.0, 128.0);
        assert!(diagonal.contains(Point::new(0.0, 0.0)));
        assert!(diagonal.contains(Point::new(127.0, 127.0)));
        assert!(!diagonal.contains(Point::new(127.0, 0.0)));
        assert!(!diagonal.contains(Point::new(129.0, 129.0)));
        assert_eq!(LineSegment::new(0.0, 0.0, 3.0, 4.0).length(), 5.0);
    }
}
