//! Collision entities.
//!
//! Ready-made elements for game objects. The moving point and box track the
//! previous frame's position so rendering can interpolate between simulation
//! steps; the circle is static.

mod collision_box;
mod collision_circle;
mod collision_point;

pub use collision_box::CollisionBox;
pub use collision_circle::CollisionCircle;
pub use collision_point::CollisionPoint;

/// Round to the nearest integer, halves rounding up (towards +inf).
#[inline]
pub(crate) fn round_coordinate(value: f32) -> i32 {
    (value + 0.5).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::round_coordinate;

    #[test]
    fn test_round_coordinate() {
        assert_eq!(round_coordinate(1.49), 1);
        assert_eq!(round_coordinate(1.5), 2);
        assert_eq!(round_coordinate(-1.5), -1);
        assert_eq!(round_coordinate(-1.6), -2);
    }
}
