//! Spatial indexing.
//!
//! Three quadtrees over a fixed root rectangle:
//! - [`PointQuadTree`]: point elements, single-threaded, `&mut self` mutation.
//! - [`RegionQuadTree`]: box elements that may straddle quadrants.
//! - [`ConcurrentPointQuadTree`]: point elements shared between threads.
//!
//! A leaf splits into four quadrants when it holds more than
//! `element_limit` elements (up to `max_depth`), and four quadrants collapse
//! back into their parent once the parent's subtree holds `merge_watermark`
//! elements or fewer.

mod arena;
mod concurrent;
mod point_quadtree;
mod region_quadtree;

pub use concurrent::ConcurrentPointQuadTree;
pub use point_quadtree::PointQuadTree;
pub use region_quadtree::RegionQuadTree;

use crate::geom::{Point, Rectangle};

/// Child position inside a subdivided node. The discriminant is the index
/// into [`Rectangle::quadrants`] and into a node's child array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    TopLeft = 0,
    TopRight = 1,
    BottomLeft = 2,
    BottomRight = 3,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopLeft,
        Quadrant::TopRight,
        Quadrant::BottomLeft,
        Quadrant::BottomRight,
    ];

    /// The single quadrant of `bounds` that owns `point`.
    ///
    /// Points on the vertical split line go right, points on the horizontal
    /// split line go down, so every point in `bounds` has exactly one owner.
    #[inline]
    pub fn containing(bounds: &Rectangle, point: Point) -> Quadrant {
        let center = bounds.center();
        match (point.x < center.x, point.y < center.y) {
            (true, true) => Quadrant::TopLeft,
            (false, true) => Quadrant::TopRight,
            (true, false) => Quadrant::BottomLeft,
            (false, false) => Quadrant::BottomRight,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrant_tie_break() {
        let bounds = Rectangle::new(0.0, 0.0, 128.0, 128.0);
        assert_eq!(Quadrant::containing(&bounds, Point::new(0.0, 0.0)), Quadrant::TopLeft);
        assert_eq!(Quadrant::containing(&bounds, Point::new(63.9, 63.9)), Quadrant::TopLeft);
        assert_eq!(Quadrant::containing(&bounds, Point::new(64.0, 0.0)), Quadrant::TopRight);
        assert_eq!(Quadrant::containing(&bounds, Point::new(0.0, 64.0)), Quadrant::BottomLeft);
        assert_eq!(Quadrant::containing(&bounds, Point::new(64.0, 64.0)), Quadrant::BottomRight);
        assert_eq!(Quadrant::containing(&bounds, Point::new(128.0, 128.0)), Quadrant::BottomRight);
    }

    #[test]
    fn test_quadrant_matches_child_bounds() {
        let bounds = Rectangle::new(-50.0, 10.0, 100.0, 40.0);
        let children = bounds.quadrants();
        for (x, y) in [(-50.0, 10.0), (0.0, 30.0), (49.0, 11.0), (-1.0, 49.0), (50.0, 50.0)] {
            let point = Point::new(x, y);
            let quadrant = Quadrant::containing(&bounds, point);
            assert!(children[quadrant.index()].contains_point(point));
        }
    }
}
