//! Static circle entity.

use glam::Vec2;

use super::round_coordinate;
use crate::element::{Bounded, ElementId, IdSequence, Positioned, SpatialElement};
use crate::geom::{Point, Rectangle};

/// A circular game object that does not interpolate: it renders where it is.
///
/// Indexed by its centre in point trees and by its bounding square in region
/// trees.
#[derive(Debug, Clone, Copy)]
pub struct CollisionCircle {
    id: ElementId,
    center: Point,
    radius: f32,
}

impl CollisionCircle {
    /// Create a circle with the next id from `ids`.
    pub fn new(ids: &IdSequence, x: f32, y: f32, radius: f32) -> Self {
        Self::with_id(ids.next_id(), x, y, radius)
    }

    pub fn with_id(id: ElementId, x: f32, y: f32, radius: f32) -> Self {
        Self {
            id,
            center: Point::new(x, y),
            radius,
        }
    }

    /// Move the centre.
    pub fn set(&mut self, x: f32, y: f32) {
        self.center = Point::new(x, y);
    }

    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    /// Step `speed` units towards `(x, y)`.
    pub fn move_towards(&mut self, x: f32, y: f32, speed: f32) {
        let from = Vec2::from(self.center);
        let direction = (Vec2::new(x, y) - from).normalize_or_zero();
        let next = from + direction * speed;
        self.set(next.x, next.y);
    }

    /// Distance from the centre to `other`'s position.
    pub fn distance_to<P: Positioned + ?Sized>(&self, other: &P) -> f32 {
        self.center.distance_to(&other.position())
    }

    /// Whether `point` lies on or inside the circle.
    pub fn contains_point(&self, point: Point) -> bool {
        self.center.distance_squared_to(&point) <= self.radius * self.radius
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn render_x(&self) -> i32 {
        round_coordinate(self.center.x)
    }

    #[inline]
    pub fn render_y(&self) -> i32 {
        round_coordinate(self.center.y)
    }
}

impl SpatialElement for CollisionCircle {
    #[inline]
    fn id(&self) -> ElementId {
        self.id
    }
}

impl Positioned for CollisionCircle {
    #[inline]
    fn position(&self) -> Point {
        self.center
    }
}

impl Bounded for CollisionCircle {
    fn bounds(&self) -> Rectangle {
        Rectangle::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.radius * 2.0,
            self.radius * 2.0,
        )
    }
}

impl PartialEq for CollisionCircle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CollisionCircle {}
