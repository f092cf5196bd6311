//! Point quadtree.

use std::fmt;

use tracing::{debug, trace};

use super::Quadrant;
use super::arena::{Arena, Bucket, NodeId, ROOT};
use crate::config::{QuadTreeConfig, validate_bounds};
use crate::element::{ElementId, Positioned};
use crate::error::ConfigError;
use crate::geom::{LineSegment, Point, Rectangle};

/// Quadtree of point elements.
///
/// Each element lives in exactly one leaf, chosen by its position at
/// insertion time. The tree does not follow moving elements: remove the
/// element with its old position and add it again (see [`Self::relocate`]).
pub struct PointQuadTree<E> {
    arena: Arena<E>,
    config: QuadTreeConfig,
}

impl<E: Positioned + Clone> PointQuadTree<E> {
    /// Create an empty tree covering `bounds`.
    pub fn new(config: QuadTreeConfig, bounds: Rectangle) -> Result<Self, ConfigError> {
        config.validate()?;
        validate_bounds(&bounds)?;
        Ok(Self {
            arena: Arena::new(bounds),
            config,
        })
    }

    /// Create a tree that only merges once a subtree is empty.
    pub fn with_limit(element_limit: usize, bounds: Rectangle) -> Result<Self, ConfigError> {
        Self::new(QuadTreeConfig::new(element_limit, 0), bounds)
    }

    /// Insert an element. Returns `false` if its position lies outside the
    /// root bounds (edges are inside).
    pub fn add(&mut self, element: E) -> bool {
        match self.place(element) {
            Some(leaf) => {
                self.subdivide_from(vec![leaf]);
                true
            }
            None => false,
        }
    }

    /// Insert many elements, splitting overflowing leaves once at the end.
    /// Returns how many were inserted.
    pub fn add_all<I: IntoIterator<Item = E>>(&mut self, elements: I) -> usize {
        let touched: Vec<NodeId> = elements
            .into_iter()
            .filter_map(|element| self.place(element))
            .collect();
        let added = touched.len();
        self.subdivide_from(touched);
        added
    }

    /// Remove an element, located by its current position and matched by id.
    /// Returns `false` if it is not in the tree.
    pub fn remove(&mut self, element: &E) -> bool {
        match self.take(element) {
            Some(leaf) => {
                self.merge_from(leaf);
                true
            }
            None => false,
        }
    }

    /// Remove many elements, checking for merges once at the end.
    /// Returns how many were removed.
    pub fn remove_all<'a, I>(&mut self, elements: I) -> usize
    where
        I: IntoIterator<Item = &'a E>,
        E: 'a,
    {
        let touched: Vec<NodeId> = elements
            .into_iter()
            .filter_map(|element| self.take(element))
            .collect();
        let removed = touched.len();
        for leaf in touched {
            // Earlier merges in this pass may have released the leaf.
            if self.arena.is_live(leaf) {
                self.merge_from(leaf);
            }
        }
        removed
    }

    /// Move an element: remove `previous` (the handle holding its old
    /// position), then insert `current`. Returns `true` only if both steps
    /// succeed.
    pub fn relocate(&mut self, previous: &E, current: E) -> bool {
        self.remove(previous) && self.add(current)
    }

    /// Elements whose position lies inside `area`.
    pub fn elements_within_area(&self, area: &Rectangle) -> Vec<E> {
        let mut result = Vec::new();
        self.elements_within_area_into(&mut result, area);
        result
    }

    /// Like [`Self::elements_within_area`], appending to `result`.
    pub fn elements_within_area_into(&self, result: &mut Vec<E>, area: &Rectangle) {
        self.arena.visit_leaves(
            |bounds| bounds.intersects(area),
            |node| {
                let elements = node.elements().into_iter().flatten();
                result.extend(elements.filter(|e| area.contains_point(e.position())).cloned());
            },
        );
    }

    /// Elements lying on `segment`.
    pub fn elements_intersecting_line_segment(&self, segment: &LineSegment) -> Vec<E> {
        let mut result = Vec::new();
        self.elements_intersecting_line_segment_into(&mut result, segment);
        result
    }

    /// Like [`Self::elements_intersecting_line_segment`], appending to `result`.
    pub fn elements_intersecting_line_segment_into(&self, result: &mut Vec<E>, segment: &LineSegment) {
        self.arena.visit_leaves(
            |bounds| segment.intersects(bounds),
            |node| {
                let elements = node.elements().into_iter().flatten();
                result.extend(elements.filter(|e| segment.contains(e.position())).cloned());
            },
        );
    }

    /// Elements held directly by the root; empty once it has subdivided.
    pub fn elements(&self) -> &[E] {
        self.arena
            .node(ROOT)
            .elements()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every element in the tree, in quadrant order.
    pub fn all_elements(&self) -> Vec<E> {
        let mut result = Vec::with_capacity(self.total_elements());
        self.arena.visit_leaves(
            |_| true,
            |node| result.extend(node.elements().into_iter().flatten().cloned()),
        );
        result
    }

    /// Ids of every element, in quadrant order.
    pub fn element_ids(&self) -> Vec<ElementId> {
        let mut ids = Vec::with_capacity(self.total_elements());
        self.arena.visit_leaves(
            |_| true,
            |node| ids.extend(node.elements().into_iter().flatten().map(|e| e.id())),
        );
        ids
    }

    /// Remove every element and collapse back to a single quad.
    pub fn clear(&mut self) {
        self.arena.reset();
    }

    fn place(&mut self, element: E) -> Option<NodeId> {
        let point = element.position();
        if !self.bounds().contains_point(point) {
            debug!(
                "Rejected element {} at ({}, {}): outside quadtree bounds",
                element.id(),
                point.x,
                point.y
            );
            return None;
        }
        let leaf = self.leaf_for(point);
        self.arena.node_mut(leaf).elements_mut()?.push(element);
        self.arena.increase_totals(leaf, 1);
        Some(leaf)
    }

    fn take(&mut self, element: &E) -> Option<NodeId> {
        let point = element.position();
        if !self.bounds().contains_point(point) {
            return None;
        }
        let id = element.id();
        let leaf = self.leaf_for(point);
        let elements = self.arena.node_mut(leaf).elements_mut()?;
        let index = elements.iter().position(|e| e.id() == id)?;
        elements.remove(index);
        self.arena.decrease_totals(leaf, 1);
        Some(leaf)
    }

    fn leaf_for(&self, point: Point) -> NodeId {
        let mut id = ROOT;
        loop {
            let node = self.arena.node(id);
            match &node.bucket {
                Bucket::Subdivided(children) => {
                    id = children[Quadrant::containing(&node.bounds, point).index()];
                }
                _ => return id,
            }
        }
    }

    /// Split every overflowing leaf in `pending`, and any child that still
    /// overflows afterwards.
    fn subdivide_from(&mut self, mut pending: Vec<NodeId>) {
        while let Some(id) = pending.pop() {
            let node = self.arena.node(id);
            let overflowing = node
                .elements()
                .is_some_and(|elements| elements.len() > self.config.element_limit);
            if !overflowing || node.depth >= self.config.max_depth {
                continue;
            }
            let (bounds, depth) = (node.bounds, node.depth);
            let Some((elements, children)) = self.arena.split(id) else {
                continue;
            };
            trace!("Subdividing quad at depth {} holding {} elements", depth, elements.len());
            for element in elements {
                let child = children[Quadrant::containing(&bounds, element.position()).index()];
                let child_node = self.arena.node_mut(child);
                child_node.total += 1;
                if let Some(bucket) = child_node.elements_mut() {
                    bucket.push(element);
                }
            }
            pending.extend(children);
        }
    }

    /// Collapse the highest ancestor of `leaf` whose subtree has dropped to
    /// the merge watermark. Ancestors never hold fewer elements than their
    /// descendants, so the walk stops at the first one above it.
    fn merge_from(&mut self, leaf: NodeId) {
        let mut target = None;
        let mut current = self.arena.node(leaf).parent;
        while let Some(id) = current {
            let node = self.arena.node(id);
            if node.total > self.config.merge_watermark {
                break;
            }
            target = Some(id);
            current = node.parent;
        }
        if let Some(id) = target {
            let elements = self.arena.collapse(id);
            trace!(
                "Merged quad at depth {} back into {} elements",
                self.arena.node(id).depth,
                elements.len()
            );
            self.arena.node_mut(id).bucket = Bucket::Leaf(elements);
        }
    }
}

impl<E> PointQuadTree<E> {
    /// Total elements in the tree.
    pub fn total_elements(&self) -> usize {
        self.arena.node(ROOT).total
    }

    /// Number of leaf quadrants: 1 until the root first subdivides, then 4, ...
    pub fn total_quads(&self) -> usize {
        self.arena.leaf_count()
    }

    /// Depth of the deepest leaf; 0 while the root is a leaf.
    pub fn depth(&self) -> usize {
        self.arena.max_depth()
    }

    /// Area covered by the root quad.
    pub fn bounds(&self) -> Rectangle {
        self.arena.node(ROOT).bounds
    }

    /// Limits this tree was built with.
    pub fn config(&self) -> &QuadTreeConfig {
        &self.config
    }
}

impl<E> fmt::Debug for PointQuadTree<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointQuadTree")
            .field("elements", &self.total_elements())
            .field("quads", &self.total_quads())
            .field("bounds", &self.bounds())
            .field("config", &self.config)
            .finish()
    }
}
