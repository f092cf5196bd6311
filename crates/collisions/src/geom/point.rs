//! 2D point.

use glam::Vec2;

/// A point in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance_to(&self, other: &Point) -> f32 {
        Vec2::from(*self).distance(Vec2::from(*other))
    }

    /// Squared distance, for comparisons that do not need the root.
    #[inline]
    pub fn distance_squared_to(&self, other: &Point) -> f32 {
        Vec2::from(*self).distance_squared(Vec2::from(*other))
    }

    /// Linear interpolation towards `target`; `alpha = 0` is `self`, `alpha = 1` is `target`.
    #[inline]
    pub fn lerp(&self, target: &Point, alpha: f32) -> Point {
        Vec2::from(*self).lerp(Vec2::from(*target), alpha).into()
    }

    /// Both coordinates are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Vec2> for Point {
    #[inline]
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Point> for Vec2 {
    #[inline]
    fn from(p: Point) -> Self {
        Vec2::new(p.x, p.y)
    }
}

impl From<(f32, f32)> for Point {
    #[inline]
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(a.distance_squared_to(&b), 25.0);
    }

    #[test]
    fn test_lerp() {
        let a = Point::new(0.0, 10.0);
        let b = Point::new(10.0, 20.0);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.lerp(&b, 0.5), Point::new(5.0, 15.0));
    }
}
