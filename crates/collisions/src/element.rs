//! The contract an indexed element must satisfy.
//!
//! Trees never own or mutate elements: they store cheap handles (`Clone`
//! values) and compare them by [`SpatialElement::id`]. Insert an `Arc<T>` to
//! share one element between the caller and a tree.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::geom::{Point, Rectangle};

/// Stable element identity.
pub type ElementId = u32;

/// Anything that can be stored in a quadtree.
pub trait SpatialElement {
    /// Identity used for equality and removal. Must be unique among the
    /// elements currently stored in one tree.
    fn id(&self) -> ElementId;
}

/// An element indexed by a single point.
pub trait Positioned: SpatialElement {
    fn position(&self) -> Point;
}

/// An element indexed by its axis-aligned bounds.
pub trait Bounded: SpatialElement {
    fn bounds(&self) -> Rectangle;
}

impl<T: SpatialElement + ?Sized> SpatialElement for Arc<T> {
    #[inline]
    fn id(&self) -> ElementId {
        (**self).id()
    }
}

impl<T: Positioned + ?Sized> Positioned for Arc<T> {
    #[inline]
    fn position(&self) -> Point {
        (**self).position()
    }
}

impl<T: Bounded + ?Sized> Bounded for Arc<T> {
    #[inline]
    fn bounds(&self) -> Rectangle {
        (**self).bounds()
    }
}

impl<T: SpatialElement + ?Sized> SpatialElement for &T {
    #[inline]
    fn id(&self) -> ElementId {
        (**self).id()
    }
}

impl<T: Positioned + ?Sized> Positioned for &T {
    #[inline]
    fn position(&self) -> Point {
        (**self).position()
    }
}

impl<T: Bounded + ?Sized> Bounded for &T {
    #[inline]
    fn bounds(&self) -> Rectangle {
        (**self).bounds()
    }
}

/// Monotonic id generator.
///
/// There is no global instance: whoever creates elements owns a sequence and
/// passes it where ids are needed, so tests never share hidden counter state.
#[derive(Debug)]
pub struct IdSequence {
    next: AtomicU32,
}

impl IdSequence {
    /// Create a sequence whose first id is `first`.
    pub const fn new(first: ElementId) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }

    /// Take the next id. Safe to call from many threads.
    #[inline]
    pub fn next_id(&self) -> ElementId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The id the next call to [`Self::next_id`] will return.
    pub fn peek(&self) -> ElementId {
        self.next.load(Ordering::Relaxed)
    }

    /// Restart the sequence at `first`.
    pub fn reset(&self, first: ElementId) {
        self.next.store(first, Ordering::Relaxed);
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sequence_is_monotonic() {
        let ids = IdSequence::new(10);
        assert_eq!(ids.next_id(), 10);
        assert_eq!(ids.next_id(), 11);
        assert_eq!(ids.peek(), 12);
        ids.reset(0);
        assert_eq!(ids.next_id(), 0);
    }

    #[test]
    fn test_sequence_unique_across_threads() {
        let ids = IdSequence::default();
        let collected: Vec<Vec<ElementId>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| (0..1000).map(|_| ids.next_id()).collect::<Vec<_>>()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let unique: HashSet<ElementId> = collected.into_iter().flatten().collect();
        assert_eq!(unique.len(), 4000);
    }
}
