//! Interpolating point entity.

use glam::Vec2;

use super::round_coordinate;
use crate::element::{ElementId, IdSequence, Positioned, SpatialElement};
use crate::geom::Point;

/// A point-sized game object.
///
/// Call [`CollisionPoint::pre_update`] at the start of every frame, move the
/// point during update, then [`CollisionPoint::interpolate`] when rendering.
#[derive(Debug, Clone, Copy)]
pub struct CollisionPoint {
    id: ElementId,
    position: Point,
    previous: Point,
    render: Point,
    render_x: i32,
    render_y: i32,
    interpolating: bool,
}

impl CollisionPoint {
    /// Create a point with the next id from `ids`.
    pub fn new(ids: &IdSequence, x: f32, y: f32) -> Self {
        Self::with_id(ids.next_id(), x, y)
    }

    pub fn with_id(id: ElementId, x: f32, y: f32) -> Self {
        let position = Point::new(x, y);
        let mut point = Self {
            id,
            position,
            previous: position,
            render: position,
            render_x: 0,
            render_y: 0,
            interpolating: false,
        };
        point.store_render_coordinates();
        point
    }

    fn store_render_coordinates(&mut self) {
        self.render_x = round_coordinate(self.render.x);
        self.render_y = round_coordinate(self.render.y);
    }

    /// Snapshot the current position as the previous-frame position.
    pub fn pre_update(&mut self) {
        self.previous = self.position;
    }

    /// Move the render position between the previous and current position.
    /// Stops once the rounded render coordinates reach the current position.
    pub fn interpolate(&mut self, alpha: f32) {
        if !self.interpolating {
            return;
        }
        self.render = self.previous.lerp(&self.position, alpha);
        self.store_render_coordinates();
        if self.render_x == round_coordinate(self.position.x)
            && self.render_y == round_coordinate(self.position.y)
        {
            self.interpolating = false;
        }
    }

    /// Set the position; the render position catches up through interpolation.
    pub fn set(&mut self, x: f32, y: f32) {
        if x == self.position.x && y == self.position.y {
            return;
        }
        self.position = Point::new(x, y);
        self.interpolating = true;
    }

    /// Translate by `(dx, dy)`.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.set(self.position.x + dx, self.position.y + dy);
    }

    /// Teleport: previous and render positions jump along with the current one.
    pub fn force_to(&mut self, x: f32, y: f32) {
        self.position = Point::new(x, y);
        self.previous = self.position;
        self.render = self.position;
        self.interpolating = false;
        self.store_render_coordinates();
    }

    /// Step `speed` units towards `(x, y)`.
    pub fn move_towards(&mut self, x: f32, y: f32, speed: f32) {
        let from = Vec2::from(self.position);
        let direction = (Vec2::new(x, y) - from).normalize_or_zero();
        let next = from + direction * speed;
        self.set(next.x, next.y);
    }

    pub fn distance_to<P: Positioned + ?Sized>(&self, other: &P) -> f32 {
        self.position.distance_to(&other.position())
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.position.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.position.y
    }

    #[inline]
    pub fn previous_position(&self) -> Point {
        self.previous
    }

    #[inline]
    pub fn render_position(&self) -> Point {
        self.render
    }

    #[inline]
    pub fn render_x(&self) -> i32 {
        self.render_x
    }

    #[inline]
    pub fn render_y(&self) -> i32 {
        self.render_y
    }
}

impl SpatialElement for CollisionPoint {
    #[inline]
    fn id(&self) -> ElementId {
        self.id
    }
}

impl Positioned for CollisionPoint {
    #[inline]
    fn position(&self) -> Point {
        self.position
    }
}

impl PartialEq for CollisionPoint {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CollisionPoint {}
