//! Quadtrees for 2D collision queries.
//!
//! The crate holds the geometric value types ([`geom`]), the contract an
//! indexed element satisfies ([`element`]), ready-made interpolating entities
//! ([`entity`]) and three quadtrees ([`spatial`]):
//!
//! - [`PointQuadTree`] for point elements behind `&mut self`,
//! - [`RegionQuadTree`] for boxes that may straddle quadrants,
//! - [`ConcurrentPointQuadTree`] for point elements shared across threads.
//!
//! All trees are configured with a [`QuadTreeConfig`].

pub mod config;
pub mod element;
pub mod entity;
mod error;
pub mod geom;
pub mod spatial;

pub use config::QuadTreeConfig;
pub use element::{Bounded, ElementId, IdSequence, Positioned, SpatialElement};
pub use entity::{CollisionBox, CollisionCircle, CollisionPoint};
pub use error::ConfigError;
pub use geom::{LineSegment, Point, Rectangle};
pub use spatial::{ConcurrentPointQuadTree, PointQuadTree, Quadrant, RegionQuadTree};
