//! Region quadtree for boxes that may span several quadrants.

use std::collections::HashMap;
use std::fmt;

use fixedbitset::FixedBitSet;
use tracing::{debug, trace};

use super::Quadrant;
use super::arena::{Arena, Bucket, NodeId, ROOT};
use crate::config::{QuadTreeConfig, validate_bounds};
use crate::element::{Bounded, ElementId};
use crate::error::ConfigError;
use crate::geom::{LineSegment, Point, Rectangle};

/// A stored element and the bounds it was indexed with.
#[derive(Debug)]
struct Slot<E> {
    element: E,
    bounds: Rectangle,
}

/// Quadtree of bounded elements.
///
/// Every element is stored once in a slab; leaves hold slot indices. A box
/// crossing a split line is referenced by every leaf it overlaps, so counts
/// and query results are deduplicated by slot.
pub struct RegionQuadTree<E> {
    arena: Arena<usize>,
    slots: Vec<Option<Slot<E>>>,
    free_slots: Vec<usize>,
    /// Element ID -> slot index.
    index: HashMap<ElementId, usize>,
    config: QuadTreeConfig,
}

impl<E: Bounded + Clone> RegionQuadTree<E> {
    /// Create an empty tree covering `bounds`.
    pub fn new(config: QuadTreeConfig, bounds: Rectangle) -> Result<Self, ConfigError> {
        config.validate()?;
        validate_bounds(&bounds)?;
        Ok(Self {
            arena: Arena::new(bounds),
            slots: Vec::new(),
            free_slots: Vec::new(),
            index: HashMap::new(),
            config,
        })
    }

    /// Create a tree that only merges once a subtree is empty.
    pub fn with_limit(element_limit: usize, bounds: Rectangle) -> Result<Self, ConfigError> {
        Self::new(QuadTreeConfig::new(element_limit, 0), bounds)
    }

    /// Insert an element.
    ///
    /// Returns `false` unless its bounds lie fully inside the root (edges
    /// included), or if an element with the same id is already stored.
    pub fn add(&mut self, element: E) -> bool {
        match self.place(element) {
            Some(leaves) => {
                self.subdivide_from(leaves);
                true
            }
            None => false,
        }
    }

    /// Insert many elements, splitting overflowing leaves once at the end.
    /// Returns how many were inserted.
    pub fn add_all<I: IntoIterator<Item = E>>(&mut self, elements: I) -> usize {
        let mut added = 0;
        let mut touched = Vec::new();
        for element in elements {
            if let Some(leaves) = self.place(element) {
                touched.extend(leaves);
                added += 1;
            }
        }
        self.subdivide_from(touched);
        added
    }

    /// Remove the element with the same id. It is located by the bounds it
    /// was inserted with, so a handle that has moved since is still found.
    pub fn remove(&mut self, element: &E) -> bool {
        match self.take(element.id()) {
            Some(leaves) => {
                self.merge_from(&leaves);
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
        let mut removed = 0;
        let mut touched = Vec::new();
        for element in elements {
            if let Some(leaves) = self.take(element.id()) {
                touched.extend(leaves);
                removed += 1;
            }
        }
        self.merge_from(&touched);
        removed
    }

    /// Re-index an element under its new bounds.
    pub fn relocate(&mut self, previous: &E, current: E) -> bool {
        self.remove(previous) && self.add(current)
    }

    /// Look up a stored element by id.
    pub fn get(&self, id: ElementId) -> Option<&E> {
        let slot = *self.index.get(&id)?;
        self.slots[slot].as_ref().map(|s| &s.element)
    }

    /// Elements whose bounds intersect `area`, each reported once.
    pub fn elements_within_area(&self, area: &Rectangle) -> Vec<E> {
        let mut result = Vec::new();
        self.elements_within_area_into(&mut result, area);
        result
    }

    /// Like [`Self::elements_within_area`], appending to `result`.
    pub fn elements_within_area_into(&self, result: &mut Vec<E>, area: &Rectangle) {
        self.collect_unique(
            result,
            |bounds| bounds.intersects(area),
            |bounds| bounds.intersects(area),
        );
    }

    /// Elements whose bounds `segment` passes through, each reported once.
    pub fn elements_intersecting_line_segment(&self, segment: &LineSegment) -> Vec<E> {
        let mut result = Vec::new();
        self.elements_intersecting_line_segment_into(&mut result, segment);
        result
    }

    /// Like [`Self::elements_intersecting_line_segment`], appending to `result`.
    pub fn elements_intersecting_line_segment_into(&self, result: &mut Vec<E>, segment: &LineSegment) {
        self.collect_unique(
            result,
            |bounds| segment.intersects(bounds),
            |bounds| segment.intersects(bounds),
        );
    }

    /// Elements whose bounds contain `point`.
    pub fn elements_containing_point(&self, point: Point) -> Vec<E> {
        let mut result = Vec::new();
        self.elements_containing_point_into(&mut result, point);
        result
    }

    /// Like [`Self::elements_containing_point`], appending to `result`.
    ///
    /// Only one leaf is visited: any box containing `point` overlaps the leaf
    /// that owns `point`, so it is referenced there.
    pub fn elements_containing_point_into(&self, result: &mut Vec<E>, point: Point) {
        if !self.bounds().contains_point(point) {
            return;
        }
        let leaf = self.arena.node(self.leaf_for(point));
        for &slot in leaf.elements().into_iter().flatten() {
            if let Some(s) = &self.slots[slot] {
                if s.bounds.contains_point(point) {
                    result.push(s.element.clone());
                }
            }
        }
    }

    /// Elements referenced directly by the root; empty once it has subdivided.
    pub fn elements(&self) -> Vec<E> {
        self.arena
            .node(ROOT)
            .elements()
            .into_iter()
            .flatten()
            .filter_map(|&slot| self.slots[slot].as_ref().map(|s| s.element.clone()))
            .collect()
    }

    /// Every stored element, each once.
    pub fn all_elements(&self) -> Vec<E> {
        self.slots.iter().flatten().map(|s| s.element.clone()).collect()
    }

    /// Remove every element and collapse back to a single quad.
    pub fn clear(&mut self) {
        self.arena.reset();
        self.slots.clear();
        self.free_slots.clear();
        self.index.clear();
    }

    fn place(&mut self, element: E) -> Option<Vec<NodeId>> {
        let id = element.id();
        let bounds = element.bounds();
        if !bounds.is_finite() || !self.bounds().contains_rectangle(&bounds) {
            debug!("Rejected element {}: bounds {:?} outside quadtree", id, bounds);
            return None;
        }
        if self.index.contains_key(&id) {
            debug!("Rejected element {}: id already indexed", id);
            return None;
        }

        let slot = self.alloc_slot(Slot { element, bounds });
        self.index.insert(id, slot);

        let leaves = self.leaves_overlapping(&bounds);
        for &leaf in &leaves {
            if let Some(bucket) = self.arena.node_mut(leaf).elements_mut() {
                bucket.push(slot);
            }
            self.arena.increase_totals(leaf, 1);
        }
        Some(leaves)
    }

    fn take(&mut self, id: ElementId) -> Option<Vec<NodeId>> {
        let slot = self.index.remove(&id)?;
        let bounds = self.slots[slot].as_ref()?.bounds;
        let leaves = self.leaves_overlapping(&bounds);
        for &leaf in &leaves {
            let Some(bucket) = self.arena.node_mut(leaf).elements_mut() else {
                continue;
            };
            if let Some(position) = bucket.iter().position(|&s| s == slot) {
                bucket.remove(position);
                self.arena.decrease_totals(leaf, 1);
            }
        }
        self.slots[slot] = None;
        self.free_slots.push(slot);
        Some(leaves)
    }

    fn alloc_slot(&mut self, slot: Slot<E>) -> usize {
        if let Some(index) = self.free_slots.pop() {
            self.slots[index] = Some(slot);
            index
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }

    #[inline]
    fn slot_bounds(&self, slot: usize) -> Option<Rectangle> {
        self.slots[slot].as_ref().map(|s| s.bounds)
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

    fn leaves_overlapping(&self, bounds: &Rectangle) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = self.arena.node(id);
            if !node.bounds.intersects(bounds) {
                continue;
            }
            match &node.bucket {
                Bucket::Leaf(_) => leaves.push(id),
                Bucket::Subdivided(children) => stack.extend(children),
                Bucket::Free => {}
            }
        }
        leaves
    }

    /// Walk leaves passing `prune`, reporting each slot passing `accept` once.
    fn collect_unique<P, A>(&self, result: &mut Vec<E>, prune: P, mut accept: A)
    where
        P: FnMut(&Rectangle) -> bool,
        A: FnMut(&Rectangle) -> bool,
    {
        let mut seen = FixedBitSet::with_capacity(self.slots.len());
        self.arena.visit_leaves(prune, |node| {
            for &slot in node.elements().into_iter().flatten() {
                if seen.put(slot) {
                    continue;
                }
                if let Some(s) = &self.slots[slot] {
                    if accept(&s.bounds) {
                        result.push(s.element.clone());
                    }
                }
            }
        });
    }

    /// Distinct elements below `id`, counting no further than `limit + 1`.
    fn distinct_count(&self, id: NodeId, limit: usize) -> usize {
        let node = self.arena.node(id);
        if let Some(elements) = node.elements() {
            return elements.len();
        }
        let mut seen = FixedBitSet::with_capacity(self.slots.len());
        let mut count = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match &self.arena.node(current).bucket {
                Bucket::Leaf(elements) => {
                    for &slot in elements {
                        if !seen.put(slot) {
                            count += 1;
                            if count > limit {
                                return count;
                            }
                        }
                    }
                }
                Bucket::Subdivided(children) => stack.extend(children),
                Bucket::Free => {}
            }
        }
        count
    }

    /// Split overflowing leaves. A leaf is only split when some child would
    /// receive a non-empty, strictly smaller share of its elements; otherwise
    /// every new leaf would overflow the same way and split again.
    fn subdivide_from(&mut self, mut pending: Vec<NodeId>) {
        while let Some(id) = pending.pop() {
            let node = self.arena.node(id);
            let Some(elements) = node.elements() else {
                continue;
            };
            if elements.len() <= self.config.element_limit || node.depth >= self.config.max_depth {
                continue;
            }
            let quadrants = node.bounds.quadrants();
            let mut shares = [0usize; 4];
            for &slot in elements {
                if let Some(bounds) = self.slot_bounds(slot) {
                    for (share, quadrant) in shares.iter_mut().zip(&quadrants) {
                        if quadrant.intersects(&bounds) {
                            *share += 1;
                        }
                    }
                }
            }
            if !shares.iter().any(|&share| share > 0 && share < elements.len()) {
                continue;
            }

            let (depth, before) = (node.depth, node.total);
            let Some((elements, children)) = self.arena.split(id) else {
                continue;
            };
            let mut references = 0;
            for slot in elements {
                let Some(bounds) = self.slot_bounds(slot) else {
                    continue;
                };
                for (child, quadrant) in children.iter().zip(&quadrants) {
                    if quadrant.intersects(&bounds) {
                        let child_node = self.arena.node_mut(*child);
                        child_node.total += 1;
                        if let Some(bucket) = child_node.elements_mut() {
                            bucket.push(slot);
                        }
                        references += 1;
                    }
                }
            }
            // Straddling boxes now count once per child they landed in.
            if references > before {
                self.arena.increase_totals(id, references - before);
            }
            trace!(
                "Subdividing region quad at depth {} into {} references",
                depth, references
            );
            pending.extend(children);
        }
    }

    /// Collapse the highest ancestor of any touched leaf whose subtree holds
    /// no more than the merge watermark of distinct elements.
    fn merge_from(&mut self, leaves: &[NodeId]) {
        let watermark = self.config.merge_watermark;
        for &leaf in leaves {
            if !self.arena.is_live(leaf) {
                continue;
            }
            let mut target = None;
            let mut current = self.arena.node(leaf).parent;
            while let Some(id) = current {
                let node = self.arena.node(id);
                // References bound distinct elements from above.
                if node.total > watermark && self.distinct_count(id, watermark) > watermark {
                    break;
                }
                target = Some(id);
                current = node.parent;
            }
            if let Some(id) = target {
                self.merge(id);
            }
        }
    }

    fn merge(&mut self, id: NodeId) {
        let drained = self.arena.collapse(id);
        let mut seen = FixedBitSet::with_capacity(self.slots.len());
        let elements: Vec<usize> = drained.into_iter().filter(|&slot| !seen.put(slot)).collect();
        let references = self.arena.node(id).total;
        if references > elements.len() {
            self.arena.decrease_totals(id, references - elements.len());
        }
        trace!(
            "Merged region quad at depth {} back into {} elements",
            self.arena.node(id).depth,
            elements.len()
        );
        self.arena.node_mut(id).bucket = Bucket::Leaf(elements);
    }
}

impl<E> RegionQuadTree<E> {
    /// Distinct elements in the tree.
    pub fn total_elements(&self) -> usize {
        self.index.len()
    }

    /// Number of leaf quadrants.
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

impl<E> fmt::Debug for RegionQuadTree<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionQuadTree")
            .field("elements", &self.total_elements())
            .field("quads", &self.total_quads())
            .field("bounds", &self.bounds())
            .field("config", &self.config)
            .finish()
    }
}
