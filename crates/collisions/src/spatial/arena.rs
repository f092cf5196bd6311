//! Index-linked node storage shared by the single-threaded quadtrees.
//!
//! Nodes live in one `Vec`; parent and child links are indices, so there are
//! no reference cycles to manage. Slots of merged-away nodes are recycled.

use std::mem;

use crate::geom::Rectangle;

pub(crate) type NodeId = usize;

/// The root always occupies the first slot.
pub(crate) const ROOT: NodeId = 0;

#[derive(Debug)]
pub(crate) enum Bucket<T> {
    Leaf(Vec<T>),
    Subdivided([NodeId; 4]),
    /// Slot waiting to be reused.
    Free,
}

#[derive(Debug)]
pub(crate) struct Node<T> {
    pub(crate) bounds: Rectangle,
    pub(crate) depth: usize,
    pub(crate) parent: Option<NodeId>,
    /// Element references held by the leaves below (and including) this node.
    pub(crate) total: usize,
    pub(crate) bucket: Bucket<T>,
}

impl<T> Node<T> {
    fn leaf(bounds: Rectangle, depth: usize, parent: Option<NodeId>) -> Self {
        Self {
            bounds,
            depth,
            parent,
            total: 0,
            bucket: Bucket::Leaf(Vec::new()),
        }
    }

    #[inline]
    pub(crate) fn elements(&self) -> Option<&Vec<T>> {
        match &self.bucket {
            Bucket::Leaf(elements) => Some(elements),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn elements_mut(&mut self) -> Option<&mut Vec<T>> {
        match &mut self.bucket {
            Bucket::Leaf(elements) => Some(elements),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn children(&self) -> Option<&[NodeId; 4]> {
        match &self.bucket {
            Bucket::Subdivided(children) => Some(children),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Arena<T> {
    nodes: Vec<Node<T>>,
    free: Vec<NodeId>,
}

impl<T> Arena<T> {
    pub(crate) fn new(bounds: Rectangle) -> Self {
        Self {
            nodes: vec![Node::leaf(bounds, 0, None)],
            free: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<T> {
        &self.nodes[id]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        &mut self.nodes[id]
    }

    #[inline]
    pub(crate) fn is_live(&self, id: NodeId) -> bool {
        !matches!(self.nodes[id].bucket, Bucket::Free)
    }

    /// Drop everything and start again from an empty root.
    pub(crate) fn reset(&mut self) {
        let bounds = self.nodes[ROOT].bounds;
        self.nodes.clear();
        self.nodes.push(Node::leaf(bounds, 0, None));
        self.free.clear();
    }

    fn alloc(&mut self, node: Node<T>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = node;
            id
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn release(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        node.bucket = Bucket::Free;
        node.parent = None;
        node.total = 0;
        self.free.push(id);
    }

    /// Replace a leaf with four empty child leaves.
    ///
    /// Returns the leaf's former elements for the caller to redistribute and
    /// the new children in [`Quadrant`](super::Quadrant) order. `None` if `id`
    /// is not a leaf.
    pub(crate) fn split(&mut self, id: NodeId) -> Option<(Vec<T>, [NodeId; 4])> {
        let elements = mem::take(self.nodes[id].elements_mut()?);
        let (bounds, depth) = (self.nodes[id].bounds, self.nodes[id].depth);
        let children = bounds
            .quadrants()
            .map(|quadrant| self.alloc(Node::leaf(quadrant, depth + 1, Some(id))));
        self.nodes[id].bucket = Bucket::Subdivided(children);
        Some((elements, children))
    }

    /// Turn a subdivided node back into an empty leaf, releasing every
    /// descendant. Returns the descendants' elements in quadrant order.
    pub(crate) fn collapse(&mut self, id: NodeId) -> Vec<T> {
        let mut drained = Vec::with_capacity(self.nodes[id].total);
        let mut stack: Vec<NodeId> = match mem::replace(&mut self.nodes[id].bucket, Bucket::Leaf(Vec::new())) {
            Bucket::Subdivided(children) => children.iter().rev().copied().collect(),
            Bucket::Leaf(elements) => {
                drained = elements;
                Vec::new()
            }
            Bucket::Free => Vec::new(),
        };
        while let Some(child) = stack.pop() {
            match mem::replace(&mut self.nodes[child].bucket, Bucket::Free) {
                Bucket::Leaf(elements) => drained.extend(elements),
                Bucket::Subdivided(grandchildren) => stack.extend(grandchildren.iter().rev()),
                Bucket::Free => {}
            }
            self.release(child);
        }
        drained
    }

    /// Add `n` to the totals of `id` and all of its ancestors.
    pub(crate) fn increase_totals(&mut self, id: NodeId, n: usize) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &mut self.nodes[node_id];
            node.total += n;
            current = node.parent;
        }
    }

    /// Subtract `n` from the totals of `id` and all of its ancestors.
    pub(crate) fn decrease_totals(&mut self, id: NodeId, n: usize) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &mut self.nodes[node_id];
            node.total = node.total.saturating_sub(n);
            current = node.parent;
        }
    }

    /// Visit the leaves below `ROOT` whose bounds pass `prune`, in quadrant order.
    pub(crate) fn visit_leaves<P, V>(&self, mut prune: P, mut visit: V)
    where
        P: FnMut(&Rectangle) -> bool,
        V: FnMut(&Node<T>),
    {
        let mut stack = vec![ROOT];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !prune(&node.bounds) {
                continue;
            }
            match &node.bucket {
                Bucket::Leaf(_) => visit(node),
                Bucket::Subdivided(children) => stack.extend(children.iter().rev()),
                Bucket::Free => {}
            }
        }
    }

    /// Number of leaf quadrants in the tree.
    pub(crate) fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.visit_leaves(|_| true, |_| count += 1);
        count
    }

    /// Depth of the deepest leaf.
    pub(crate) fn max_depth(&self) -> usize {
        let mut depth = 0;
        self.visit_leaves(|_| true, |node| depth = depth.max(node.depth));
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_collapse_recycle_slots() {
        let mut arena: Arena<u32> = Arena::new(Rectangle::new(0.0, 0.0, 128.0, 128.0));
        arena.node_mut(ROOT).elements_mut().unwrap().extend([1, 2, 3]);

        let (elements, children) = arena.split(ROOT).unwrap();
        assert_eq!(elements, vec![1, 2, 3]);
        assert_eq!(arena.leaf_count(), 4);
        assert_eq!(arena.node(children[3]).bounds, Rectangle::new(64.0, 64.0, 64.0, 64.0));
        assert_eq!(arena.node(children[0]).parent, Some(ROOT));
        assert_eq!(arena.node(children[0]).depth, 1);

        arena.node_mut(children[0]).elements_mut().unwrap().push(1);
        arena.node_mut(children[3]).elements_mut().unwrap().push(3);
        let (_, grandchildren) = arena.split(children[0]).unwrap();
        arena.node_mut(grandchildren[0]).elements_mut().unwrap().push(1);
        assert_eq!(arena.leaf_count(), 7);
        assert_eq!(arena.max_depth(), 2);

        let drained = arena.collapse(ROOT);
        assert_eq!(drained, vec![1, 3]);
        assert_eq!(arena.leaf_count(), 1);
        assert!(!arena.is_live(children[0]));
        assert!(!arena.is_live(grandchildren[2]));

        // Freed slots are reused rather than growing the arena.
        let (_, again) = arena.split(ROOT).unwrap();
        assert!(again.iter().all(|&id| id <= 8));
    }

    #[test]
    fn test_split_rejects_non_leaf() {
        let mut arena: Arena<u32> = Arena::new(Rectangle::new(0.0, 0.0, 10.0, 10.0));
        assert!(arena.split(ROOT).is_some());
        assert!(arena.split(ROOT).is_none());
    }

    #[test]
    fn test_totals_follow_ancestors() {
        let mut arena: Arena<u32> = Arena::new(Rectangle::new(0.0, 0.0, 10.0, 10.0));
        let (_, children) = arena.split(ROOT).unwrap();
        arena.increase_totals(children[1], 3);
        assert_eq!(arena.node(children[1]).total, 3);
        assert_eq!(arena.node(ROOT).total, 3);
        arena.decrease_totals(children[1], 2);
        assert_eq!(arena.node(ROOT).total, 1);
        assert_eq!(arena.node(children[0]).total, 0);
    }
}
