//! Interpolating box entity.

use super::round_coordinate;
use crate::element::{Bounded, ElementId, IdSequence, SpatialElement};
use crate::geom::{Point, Rectangle};

/// An axis-aligned game object with a size.
#[derive(Debug, Clone, Copy)]
pub struct CollisionBox {
    id: ElementId,
    bounds: Rectangle,
    previous: Rectangle,
    render: Rectangle,
    render_x: i32,
    render_y: i32,
    interpolating: bool,
}

impl CollisionBox {
    /// Create a box with the next id from `ids`.
    pub fn new(ids: &IdSequence, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::with_id(ids.next_id(), x, y, width, height)
    }

    pub fn with_id(id: ElementId, x: f32, y: f32, width: f32, height: f32) -> Self {
        let bounds = Rectangle::new(x, y, width, height);
        let mut collision_box = Self {
            id,
            bounds,
            previous: bounds,
            render: bounds,
            render_x: 0,
            render_y: 0,
            interpolating: false,
        };
        collision_box.store_render_coordinates();
        collision_box
    }

    fn store_render_coordinates(&mut self) {
        self.render_x = round_coordinate(self.render.x);
        self.render_y = round_coordinate(self.render.y);
    }

    /// Snapshot the current bounds as the previous-frame bounds.
    pub fn pre_update(&mut self) {
        self.previous = self.bounds;
    }

    /// Interpolate position and size between the previous and current bounds.
    pub fn interpolate(&mut self, alpha: f32) {
        if !self.interpolating {
            return;
        }
        let origin = Point::new(self.previous.x, self.previous.y)
            .lerp(&Point::new(self.bounds.x, self.bounds.y), alpha);
        let size = Point::new(self.previous.width, self.previous.height)
            .lerp(&Point::new(self.bounds.width, self.bounds.height), alpha);
        self.render = Rectangle::new(origin.x, origin.y, size.x, size.y);
        self.store_render_coordinates();
        if self.render_x == round_coordinate(self.bounds.x)
            && self.render_y == round_coordinate(self.bounds.y)
            && self.render.width == self.bounds.width
            && self.render.height == self.bounds.height
        {
            self.interpolating = false;
        }
    }

    /// Move the top-left corner.
    pub fn set(&mut self, x: f32, y: f32) {
        if x == self.bounds.x && y == self.bounds.y {
            return;
        }
        self.bounds.x = x;
        self.bounds.y = y;
        self.interpolating = true;
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        if width == self.bounds.width && height == self.bounds.height {
            return;
        }
        self.bounds.width = width;
        self.bounds.height = height;
        self.interpolating = true;
    }

    /// Teleport: previous and render bounds jump along with the current ones.
    pub fn force_to(&mut self, x: f32, y: f32) {
        self.bounds.x = x;
        self.bounds.y = y;
        self.previous = self.bounds;
        self.render = self.bounds;
        self.interpolating = false;
        self.store_render_coordinates();
    }

    #[inline]
    pub fn previous_bounds(&self) -> Rectangle {
        self.previous
    }

    #[inline]
    pub fn render_bounds(&self) -> Rectangle {
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

impl SpatialElement for CollisionBox {
    #[inline]
    fn id(&self) -> ElementId {
        self.id
    }
}

impl Bounded for CollisionBox {
    #[inline]
    fn bounds(&self) -> Rectangle {
        self.bounds
    }
}

impl PartialEq for CollisionBox {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CollisionBox {}
