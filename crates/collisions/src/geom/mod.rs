//! Geometry primitives used by the collision quadtrees.
//!
//! All types are small `Copy` values; every operation is pure.

mod line_segment;
mod point;
mod rectangle;

pub use line_segment::LineSegment;
pub use point::Point;
pub use rectangle::Rectangle;
