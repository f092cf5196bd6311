//! Point quadtree shared between threads.
//!
//! Every node carries its own `RwLock`. Queries hold read locks from the root
//! down to the leaves they visit, so a query never observes an element twice
//! or misses one that stays put. Writers only lock the leaf they change;
//! merges lock the collapsing node and then its descendants. Locks are always
//! taken ancestor before descendant.
//!
//! Element totals are atomics updated while the changed leaf is write-locked,
//! so they are exact once writers are quiescent and never overwritten by a
//! merge.

use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, trace};

use super::Quadrant;
use crate::config::{QuadTreeConfig, validate_bounds};
use crate::element::{ElementId, Positioned};
use crate::error::ConfigError;
use crate::geom::{LineSegment, Point, Rectangle};

enum NodeState<E> {
    Leaf(Vec<E>),
    Subdivided([Arc<Node<E>>; 4]),
    /// Drained by a merge. Writers that reach it start over from the root.
    Retired,
}

struct Node<E> {
    bounds: Rectangle,
    depth: usize,
    total: AtomicUsize,
    state: RwLock<NodeState<E>>,
}

impl<E: Positioned> Node<E> {
    /// Build a node over `elements`, subdividing as far as the config asks.
    fn with_elements(bounds: Rectangle, depth: usize, elements: Vec<E>, config: &QuadTreeConfig) -> Self {
        let total = elements.len();
        let state = if total > config.element_limit && depth < config.max_depth {
            NodeState::Subdivided(subdivide(&bounds, depth, elements, config))
        } else {
            NodeState::Leaf(elements)
        };
        Self {
            bounds,
            depth,
            total: AtomicUsize::new(total),
            state: RwLock::new(state),
        }
    }
}

fn subdivide<E: Positioned>(
    bounds: &Rectangle,
    depth: usize,
    elements: Vec<E>,
    config: &QuadTreeConfig,
) -> [Arc<Node<E>>; 4] {
    let mut buckets: [Vec<E>; 4] = Default::default();
    for element in elements {
        buckets[Quadrant::containing(bounds, element.position()).index()].push(element);
    }
    let quadrants = bounds.quadrants();
    std::array::from_fn(|i| {
        Arc::new(Node::with_elements(
            quadrants[i],
            depth + 1,
            mem::take(&mut buckets[i]),
            config,
        ))
    })
}

#[inline]
fn read<E>(lock: &RwLock<NodeState<E>>) -> RwLockReadGuard<'_, NodeState<E>> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

#[inline]
fn write<E>(lock: &RwLock<NodeState<E>>) -> RwLockWriteGuard<'_, NodeState<E>> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Retire `node` and everything below it, collecting their elements.
fn drain<E>(node: &Node<E>, out: &mut Vec<E>) {
    let state = mem::replace(&mut *write(&node.state), NodeState::Retired);
    match state {
        NodeState::Leaf(elements) => out.extend(elements),
        NodeState::Subdivided(children) => {
            for child in &children {
                drain(child, out);
            }
        }
        NodeState::Retired => {}
    }
}

/// Visit leaves passing `prune`, holding read locks along the whole path.
fn visit_leaves<E, P, V>(node: &Node<E>, prune: &mut P, visit: &mut V)
where
    P: FnMut(&Rectangle) -> bool,
    V: FnMut(usize, &[E]),
{
    if !prune(&node.bounds) {
        return;
    }
    let state = read(&node.state);
    match &*state {
        NodeState::Leaf(elements) => visit(node.depth, elements),
        NodeState::Subdivided(children) => {
            for child in children {
                visit_leaves(child, prune, visit);
            }
        }
        NodeState::Retired => {}
    }
}

/// Point quadtree whose operations all take `&self`.
///
/// Share it between threads with `Arc` or scoped threads. Elements are
/// cheap handles; see [`crate::element`].
pub struct ConcurrentPointQuadTree<E> {
    root: Arc<Node<E>>,
    config: QuadTreeConfig,
    merges: AtomicUsize,
}

impl<E: Positioned + Clone> ConcurrentPointQuadTree<E> {
    /// Create an empty tree covering `bounds`.
    pub fn new(config: QuadTreeConfig, bounds: Rectangle) -> Result<Self, ConfigError> {
        config.validate()?;
        validate_bounds(&bounds)?;
        Ok(Self {
            root: Arc::new(Node::with_elements(bounds, 0, Vec::new(), &config)),
            config,
            merges: AtomicUsize::new(0),
        })
    }

    /// Create a tree that only merges once a subtree is empty.
    pub fn with_limit(element_limit: usize, bounds: Rectangle) -> Result<Self, ConfigError> {
        Self::new(QuadTreeConfig::new(element_limit, 0), bounds)
    }

    /// Insert an element. Returns `false` if its position lies outside the
    /// root bounds.
    pub fn add(&self, element: E) -> bool {
        let point = element.position();
        if !self.bounds().contains_point(point) {
            debug!(
                "Rejected element {} at ({}, {}): outside quadtree bounds",
                element.id(),
                point.x,
                point.y
            );
            return false;
        }
        let config = self.config;
        self.update_leaf(point, move |leaf, state, ancestors| {
            let NodeState::Leaf(elements) = state else {
                return false;
            };
            elements.push(element);
            adjust_totals(leaf, ancestors, |total| total.fetch_add(1, Ordering::Relaxed));
            if elements.len() > config.element_limit && leaf.depth < config.max_depth {
                let elements = mem::take(elements);
                trace!(
                    "Subdividing quad at depth {} holding {} elements",
                    leaf.depth,
                    elements.len()
                );
                *state = NodeState::Subdivided(subdivide(&leaf.bounds, leaf.depth, elements, &config));
            }
            true
        })
    }

    /// Insert many elements. Returns how many were inserted.
    pub fn add_all<I: IntoIterator<Item = E>>(&self, elements: I) -> usize {
        elements.into_iter().map(|e| self.add(e)).filter(|&added| added).count()
    }

    /// Remove an element, located by its current position and matched by id.
    pub fn remove(&self, element: &E) -> bool {
        let point = element.position();
        if !self.bounds().contains_point(point) {
            return false;
        }
        let id = element.id();
        let removed = self.update_leaf(point, |leaf, state, ancestors| {
            let NodeState::Leaf(elements) = state else {
                return false;
            };
            let Some(index) = elements.iter().position(|e| e.id() == id) else {
                return false;
            };
            elements.remove(index);
            adjust_totals(leaf, ancestors, |total| total.fetch_sub(1, Ordering::Relaxed));
            true
        });
        if removed {
            self.merge_along(point);
        }
        removed
    }

    /// Remove many elements. Returns how many were removed.
    pub fn remove_all<'a, I>(&self, elements: I) -> usize
    where
        I: IntoIterator<Item = &'a E>,
        E: 'a,
    {
        elements.into_iter().filter(|e| self.remove(e)).count()
    }

    /// Remove `previous` and insert `current`. Not atomic: a concurrent
    /// query may see the element in neither place.
    pub fn relocate(&self, previous: &E, current: E) -> bool {
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
        visit_leaves(
            &self.root,
            &mut |bounds: &Rectangle| bounds.intersects(area),
            &mut |_: usize, elements: &[E]| {
                result.extend(elements.iter().filter(|e| area.contains_point(e.position())).cloned());
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
        visit_leaves(
            &self.root,
            &mut |bounds: &Rectangle| segment.intersects(bounds),
            &mut |_: usize, elements: &[E]| {
                result.extend(elements.iter().filter(|e| segment.contains(e.position())).cloned());
            },
        );
    }

    /// Elements held directly by the root; empty once it has subdivided.
    pub fn elements(&self) -> Vec<E> {
        match &*read(&self.root.state) {
            NodeState::Leaf(elements) => elements.clone(),
            _ => Vec::new(),
        }
    }

    /// A consistent snapshot of every element.
    pub fn all_elements(&self) -> Vec<E> {
        let mut result = Vec::new();
        visit_leaves(&self.root, &mut |_: &Rectangle| true, &mut |_: usize, elements: &[E]| {
            result.extend_from_slice(elements)
        });
        result
    }

    /// Ids of every element, from the same kind of snapshot as [`Self::all_elements`].
    pub fn element_ids(&self) -> Vec<ElementId> {
        let mut ids = Vec::new();
        visit_leaves(&self.root, &mut |_: &Rectangle| true, &mut |_: usize, elements: &[E]| {
            ids.extend(elements.iter().map(|e| e.id()))
        });
        ids
    }

    /// Remove every element and collapse back to a single quad.
    pub fn clear(&self) {
        let mut state = write(&self.root.state);
        let mut dropped = Vec::new();
        match mem::replace(&mut *state, NodeState::Leaf(Vec::new())) {
            NodeState::Leaf(elements) => dropped = elements,
            NodeState::Subdivided(children) => {
                for child in &children {
                    drain(child, &mut dropped);
                }
            }
            NodeState::Retired => {}
        }
        // Writers finished with every drained leaf before we could lock it,
        // so the root total covers exactly what was dropped.
        self.root.total.fetch_sub(dropped.len(), Ordering::Relaxed);
    }

    /// Write-lock the leaf owning `point` and run `update` on it along with
    /// the leaf's ancestors, root first.
    ///
    /// Descent takes short-lived read locks. A leaf that split before we
    /// locked it is descended further; one retired by a merge sends us back
    /// to the root.
    fn update_leaf<R, F>(&self, point: Point, update: F) -> R
    where
        F: FnOnce(&Node<E>, &mut NodeState<E>, &[Arc<Node<E>>]) -> R,
    {
        self.update_leaf_from(Arc::clone(&self.root), Vec::new(), point, update)
    }

    /// Continue an [`Self::update_leaf`] descent at `node`, reached through
    /// `ancestors`. Both are dropped if `node` turns out to be retired.
    fn update_leaf_from<R, F>(
        &self,
        node: Arc<Node<E>>,
        ancestors: Vec<Arc<Node<E>>>,
        point: Point,
        update: F,
    ) -> R
    where
        F: FnOnce(&Node<E>, &mut NodeState<E>, &[Arc<Node<E>>]) -> R,
    {
        let mut resume = Some((node, ancestors));
        'restart: loop {
            let (mut node, mut ancestors) = resume
                .take()
                .unwrap_or_else(|| (Arc::clone(&self.root), Vec::new()));
            loop {
                let next = match &*read(&node.state) {
                    NodeState::Subdivided(children) => {
                        Some(Arc::clone(&children[Quadrant::containing(&node.bounds, point).index()]))
                    }
                    NodeState::Leaf(_) => None,
                    NodeState::Retired => continue 'restart,
                };
                if let Some(child) = next {
                    ancestors.push(node);
                    node = child;
                    continue;
                }

                let mut state = write(&node.state);
                if matches!(*state, NodeState::Retired) {
                    continue 'restart;
                }
                if matches!(*state, NodeState::Leaf(_)) {
                    return update(&node, &mut state, &ancestors);
                }
                // Split since we looked; keep descending.
            }
        }
    }

    /// Collapse the highest node on the path to `point` whose subtree has
    /// dropped to the merge watermark.
    fn merge_along(&self, point: Point) {
        let watermark = self.config.merge_watermark;
        let mut node = Arc::clone(&self.root);
        loop {
            if node.total.load(Ordering::Relaxed) <= watermark {
                self.merge(&node);
                return;
            }
            let next = match &*read(&node.state) {
                NodeState::Subdivided(children) => {
                    Arc::clone(&children[Quadrant::containing(&node.bounds, point).index()])
                }
                _ => return,
            };
            node = next;
        }
    }

    fn merge(&self, node: &Node<E>) {
        let mut state = write(&node.state);
        if !matches!(*state, NodeState::Subdivided(_))
            || node.total.load(Ordering::Relaxed) > self.config.merge_watermark
        {
            return;
        }
        let NodeState::Subdivided(children) = mem::replace(&mut *state, NodeState::Retired) else {
            return;
        };
        let mut elements = Vec::new();
        for child in &children {
            drain(child, &mut elements);
        }
        let merged = elements.len();
        // Writers that slipped in below us before the drain can leave more
        // than the limit behind.
        *state = if merged > self.config.element_limit && node.depth < self.config.max_depth {
            NodeState::Subdivided(subdivide(&node.bounds, node.depth, elements, &self.config))
        } else {
            NodeState::Leaf(elements)
        };
        self.merges.fetch_add(1, Ordering::Relaxed);
        trace!("Merged quad at depth {} back into {} elements", node.depth, merged);
    }
}

fn adjust_totals<E>(leaf: &Node<E>, ancestors: &[Arc<Node<E>>], apply: impl Fn(&AtomicUsize) -> usize) {
    apply(&leaf.total);
    for node in ancestors {
        apply(&node.total);
    }
}

impl<E> ConcurrentPointQuadTree<E> {
    /// Total elements in the tree. Exact whenever no write is in flight.
    pub fn total_elements(&self) -> usize {
        self.root.total.load(Ordering::Relaxed)
    }

    /// Number of leaf quadrants.
    pub fn total_quads(&self) -> usize {
        let mut count = 0;
        visit_leaves(&self.root, &mut |_: &Rectangle| true, &mut |_: usize, _: &[E]| count += 1);
        count
    }

    /// Depth of the deepest leaf; 0 while the root is a leaf.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        visit_leaves(&self.root, &mut |_: &Rectangle| true, &mut |depth: usize, _: &[E]| {
            deepest = deepest.max(depth)
        });
        deepest
    }

    /// How many times a subtree has been collapsed into its root.
    pub fn total_merge_operations(&self) -> usize {
        self.merges.load(Ordering::Relaxed)
    }

    /// Area covered by the root quad.
    pub fn bounds(&self) -> Rectangle {
        self.root.bounds
    }

    /// Limits this tree was built with.
    pub fn config(&self) -> &QuadTreeConfig {
        &self.config
    }
}

impl<E> fmt::Debug for ConcurrentPointQuadTree<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentPointQuadTree")
            .field("elements", &self.total_elements())
            .field("quads", &self.total_quads())
            .field("merges", &self.total_merge_operations())
            .field("bounds", &self.bounds())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{IdSequence, SpatialElement};
    use crate::entity::CollisionPoint;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    fn bounds() -> Rectangle {
        Rectangle::new(0.0, 0.0, 128.0, 128.0)
    }

    fn random_points(rng: &mut StdRng, ids: &IdSequence, count: usize) -> Vec<CollisionPoint> {
        (0..count)
            .map(|_| CollisionPoint::new(ids, rng.random_range(0.0..128.0), rng.random_range(0.0..128.0)))
            .collect()
    }

    /// Node totals match the elements below them and no retired node is reachable.
    fn assert_consistent(tree: &ConcurrentPointQuadTree<CollisionPoint>) {
        fn check(node: &Node<CollisionPoint>) -> usize {
            let state = read(&node.state);
            let count = match &*state {
                NodeState::Leaf(elements) => {
                    for e in elements {
                        assert!(node.bounds.contains_point(e.position()));
                    }
                    elements.len()
                }
                NodeState::Subdivided(children) => children.iter().map(|c| check(c)).sum(),
                NodeState::Retired => panic!("retired node at depth {} is reachable", node.depth),
            };
            assert_eq!(node.total.load(Ordering::Relaxed), count);
            count
        }
        check(&tree.root);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = QuadTreeConfig::new(4, 4);
        assert!(ConcurrentPointQuadTree::<CollisionPoint>::new(config, bounds()).is_err());
        assert!(ConcurrentPointQuadTree::<CollisionPoint>::with_limit(0, bounds()).is_err());
    }

    #[test]
    fn test_add_and_remove() {
        let tree = ConcurrentPointQuadTree::with_limit(2, bounds()).unwrap();
        let ids = IdSequence::default();
        let mut rng = StdRng::seed_from_u64(21);
        let points = random_points(&mut rng, &ids, 1000);
        for (i, p) in points.iter().enumerate() {
            assert!(tree.add(*p));
            assert_eq!(tree.total_elements(), i + 1);
        }
        assert_consistent(&tree);
        for (i, p) in points.iter().enumerate().rev() {
            assert!(tree.remove(p));
            assert_eq!(tree.total_elements(), i);
        }
        assert_eq!(tree.total_quads(), 1);
        assert!(!tree.remove(&points[0]));
        assert_consistent(&tree);
    }

    #[test]
    fn test_add_out_of_bounds_is_rejected() {
        let tree = ConcurrentPointQuadTree::with_limit(2, bounds()).unwrap();
        assert!(!tree.add(CollisionPoint::with_id(1, -1.0, 5.0)));
        assert!(!tree.add(CollisionPoint::with_id(2, 5.0, f32::NAN)));
        assert!(tree.add(CollisionPoint::with_id(3, 128.0, 128.0)));
        assert_eq!(tree.total_elements(), 1);
    }

    #[test]
    fn test_subdivide() {
        let tree = ConcurrentPointQuadTree::with_limit(2, bounds()).unwrap();
        tree.add(CollisionPoint::with_id(1, 0.0, 0.0));
        tree.add(CollisionPoint::with_id(2, 127.0, 0.0));
        assert_eq!(tree.total_quads(), 1);
        assert_eq!(tree.elements().len(), 2);
        tree.add(CollisionPoint::with_id(3, 0.0, 127.0));
        assert_eq!(tree.total_quads(), 4);
        assert!(tree.elements().is_empty());
        assert_eq!(tree.depth(), 1);

        tree.add(CollisionPoint::with_id(4, 40.0, 10.0));
        tree.add(CollisionPoint::with_id(5, 10.0, 40.0));
        assert_eq!(tree.total_quads(), 7);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.total_elements(), 5);
        assert_consistent(&tree);
    }

    #[test]
    fn test_merge() {
        let tree = ConcurrentPointQuadTree::new(QuadTreeConfig::new(4, 3), bounds()).unwrap();
        let points = [
            CollisionPoint::with_id(1, 0.0, 0.0),
            CollisionPoint::with_id(2, 127.0, 0.0),
            CollisionPoint::with_id(3, 0.0, 127.0),
            CollisionPoint::with_id(4, 127.0, 127.0),
            CollisionPoint::with_id(5, 10.0, 10.0),
        ];
        assert_eq!(tree.add_all(points), 5);
        assert_eq!(tree.total_quads(), 4);

        assert!(tree.remove(&points[3]));
        assert_eq!(tree.total_quads(), 4);
        assert_eq!(tree.total_merge_operations(), 0);
        assert!(tree.remove(&points[2]));
        assert_eq!(tree.total_quads(), 1);
        assert_eq!(tree.total_merge_operations(), 1);
        assert_eq!(tree.elements().len(), 3);
        assert_consistent(&tree);
    }

    /// Builds a tree whose merges always drain more than the element limit,
    /// the state inserts racing a merge leave behind.
    #[test]
    fn test_overfull_merge_resubdivides() {
        let config = QuadTreeConfig {
            element_limit: 2,
            merge_watermark: 8,
            max_depth: 8,
        };
        let tree = ConcurrentPointQuadTree {
            root: Arc::new(Node::with_elements(bounds(), 0, Vec::new(), &config)),
            config,
            merges: AtomicUsize::new(0),
        };
        let points = [
            CollisionPoint::with_id(1, 10.0, 10.0),
            CollisionPoint::with_id(2, 100.0, 10.0),
            CollisionPoint::with_id(3, 10.0, 100.0),
            CollisionPoint::with_id(4, 100.0, 100.0),
        ];
        assert_eq!(tree.add_all(points), 4);
        assert_eq!(tree.total_quads(), 4);
        let stale = match &*read(&tree.root.state) {
            NodeState::Subdivided(children) => Arc::clone(&children[Quadrant::TopLeft.index()]),
            _ => panic!("root did not subdivide"),
        };

        tree.merge(&tree.root);
        assert_eq!(tree.total_merge_operations(), 1);
        assert!(matches!(*read(&stale.state), NodeState::Retired));
        assert!(matches!(*read(&tree.root.state), NodeState::Subdivided(_)));
        assert_eq!(tree.total_quads(), 4);
        assert_eq!(tree.total_elements(), 4);
        assert_eq!(stale.total.load(Ordering::Relaxed), 1);
        assert_consistent(&tree);

        // A writer still holding the retired quad starts over from the root.
        let late = CollisionPoint::with_id(5, 20.0, 20.0);
        let added = tree.update_leaf_from(
            Arc::clone(&stale),
            vec![Arc::clone(&tree.root)],
            late.position(),
            |leaf, state, ancestors| {
                let NodeState::Leaf(elements) = state else {
                    return false;
                };
                assert_eq!(ancestors.len(), leaf.depth);
                elements.push(late);
                adjust_totals(leaf, ancestors, |total| total.fetch_add(1, Ordering::Relaxed));
                true
            },
        );
        assert!(added);
        assert_eq!(stale.total.load(Ordering::Relaxed), 1);
        assert_eq!(tree.total_elements(), 5);
        assert!(tree.elements_within_area(&Rectangle::new(0.0, 0.0, 32.0, 32.0)).contains(&late));
        assert_consistent(&tree);

        assert!(tree.remove(&late));
        assert_eq!(tree.total_merge_operations(), 2);
        assert_eq!(tree.total_elements(), 4);
        assert_eq!(tree.total_quads(), 4);
        assert_consistent(&tree);
    }

    #[test]
    fn test_remove_all() {
        let tree = ConcurrentPointQuadTree::new(QuadTreeConfig::new(8, 4), bounds()).unwrap();
        let ids = IdSequence::default();
        let mut rng = StdRng::seed_from_u64(22);
        let points = random_points(&mut rng, &ids, 500);
        assert_eq!(tree.add_all(points.iter().copied()), 500);
        assert!(tree.total_quads() > 1);
        assert_eq!(tree.remove_all(points.iter()), 500);
        assert_eq!(tree.total_elements(), 0);
        assert_eq!(tree.total_quads(), 1);
    }

    #[test]
    fn test_queries() {
        let tree = ConcurrentPointQuadTree::with_limit(2, bounds()).unwrap();
        let ids = IdSequence::default();
        let mut rng = StdRng::seed_from_u64(23);
        let points = random_points(&mut rng, &ids, 400);
        tree.add_all(points.iter().copied());

        for _ in 0..50 {
            let area = Rectangle::new(
                rng.random_range(0.0..100.0),
                rng.random_range(0.0..100.0),
                rng.random_range(1.0..60.0),
                rng.random_range(1.0..60.0),
            );
            let found: HashSet<ElementId> = tree.elements_within_area(&area).iter().map(|p| p.id()).collect();
            let expected: HashSet<ElementId> = points
                .iter()
                .filter(|p| area.contains_point(p.position()))
                .map(|p| p.id())
                .collect();
            assert_eq!(found, expected);
        }

        let on_line = CollisionPoint::with_id(10_000, 32.0, 32.0);
        tree.add(on_line);
        let found = tree.elements_intersecting_line_segment(&LineSegment::new(0.0, 0.0, 64.0, 64.0));
        assert!(found.contains(&on_line));
        assert!(found.iter().all(|p| (p.x() - p.y()).abs() <= LineSegment::TOLERANCE * 2.0));
    }

    #[test]
    fn test_relocate_and_clear() {
        let tree = ConcurrentPointQuadTree::with_limit(2, bounds()).unwrap();
        let ids = IdSequence::default();
        let mut rng = StdRng::seed_from_u64(24);
        tree.add_all(random_points(&mut rng, &ids, 50));

        let before = CollisionPoint::with_id(500, 5.0, 5.0);
        tree.add(before);
        let mut after = before;
        after.set(120.0, 120.0);
        assert!(tree.relocate(&before, after));
        assert_eq!(tree.total_elements(), 51);
        assert!(tree.elements_within_area(&Rectangle::new(119.0, 119.0, 2.0, 2.0)).contains(&after));

        tree.clear();
        assert_eq!(tree.total_elements(), 0);
        assert_eq!(tree.total_quads(), 1);
        assert!(tree.all_elements().is_empty());
    }

    #[test]
    fn test_concurrent_adds_are_all_counted() {
        let tree = ConcurrentPointQuadTree::with_limit(4, bounds()).unwrap();
        let ids = IdSequence::default();
        thread::scope(|s| {
            for seed in 0..8 {
                let (tree, ids) = (&tree, &ids);
                s.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    for p in random_points(&mut rng, ids, 500) {
                        assert!(tree.add(p));
                    }
                });
            }
        });
        assert_eq!(tree.total_elements(), 4000);
        let unique: HashSet<ElementId> = tree.element_ids().into_iter().collect();
        assert_eq!(unique.len(), 4000);
        assert_consistent(&tree);
    }

    #[test]
    fn test_concurrent_add_remove_with_readers() {
        const WRITERS: u64 = 4;
        const READERS: u64 = 4;
        const CYCLES: usize = 20;

        let tree = ConcurrentPointQuadTree::new(QuadTreeConfig::new(8, 4), bounds()).unwrap();
        let ids = IdSequence::default();
        let done = AtomicBool::new(false);

        // Never removed: every full-bounds query must see all of them.
        let mut rng = StdRng::seed_from_u64(99);
        let stationary = random_points(&mut rng, &ids, 16);
        let stationary_ids: HashSet<ElementId> = stationary.iter().map(|p| p.id()).collect();
        tree.add_all(stationary.iter().copied());

        thread::scope(|s| {
            let writers: Vec<_> = (0..WRITERS)
                .map(|seed| {
                    let (tree, ids) = (&tree, &ids);
                    s.spawn(move || {
                        let mut rng = StdRng::seed_from_u64(seed);
                        let points = random_points(&mut rng, ids, 200);
                        for _ in 0..CYCLES {
                            assert_eq!(tree.add_all(points.iter().copied()), points.len());
                            assert_eq!(tree.remove_all(points.iter()), points.len());
                        }
                    })
                })
                .collect();

            for seed in 0..READERS {
                let (tree, done, stationary_ids) = (&tree, &done, &stationary_ids);
                s.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(1000 + seed);
                    while !done.load(Ordering::Relaxed) {
                        let area = Rectangle::new(
                            rng.random_range(0.0..96.0),
                            rng.random_range(0.0..96.0),
                            rng.random_range(1.0..32.0),
                            rng.random_range(1.0..32.0),
                        );
                        let found = tree.elements_within_area(&area);
                        let unique: HashSet<ElementId> = found.iter().map(|p| p.id()).collect();
                        assert_eq!(unique.len(), found.len(), "duplicate element in query result");

                        let everything: HashSet<ElementId> = tree.element_ids().into_iter().collect();
                        assert!(everything.is_superset(stationary_ids));
                    }
                });
            }

            for writer in writers {
                writer.join().unwrap();
            }
            done.store(true, Ordering::Relaxed);
        });

        assert!(tree.total_merge_operations() > 0);
        assert_eq!(tree.total_elements(), stationary.len());
        assert_eq!(tree.remove_all(stationary.iter()), stationary.len());
        assert_eq!(tree.total_elements(), 0);
        assert_eq!(tree.total_quads(), 1);
        assert_consistent(&tree);
    }
}
