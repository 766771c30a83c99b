//! Doubly-linked ordered sequence backed by an index arena.
//!
//! Links are `NodeId`s into the owning [`Sequence`], so traversal never touches a dangling
//! reference. A sequence always holds at least one node. Playback walks it circularly: the
//! successor of the tail is the head and the predecessor of the head is the tail.

use std::fmt;

/// Handle to a node inside a [`Sequence`].
///
/// Ids are only minted by the sequence that owns the node; using an id with another sequence
/// is a logic error and panics on out-of-range access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Node<T> {
    prev: Option<NodeId>,
    next: Option<NodeId>,
    payload: T,
}

/// Ordered list that exclusively owns its payloads.
pub struct Sequence<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Sequence<T> {
    /// Create a single-node sequence, returning it with the id of that node.
    pub fn create(payload: T) -> (Self, NodeId) {
        let seq = Self {
            nodes: vec![Node {
                prev: None,
                next: None,
                payload,
            }],
        };
        (seq, NodeId(0))
    }

    /// Splice a new node immediately after `node` and return its id.
    ///
    /// If `node` was the tail the new node becomes the tail.
    ///
    /// # Panics
    ///
    /// Panics if `node` does not belong to this sequence, or if the sequence already holds
    /// `u32::MAX` nodes.
    pub fn insert_after(&mut self, node: NodeId, payload: T) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("sequence node count overflow"));
        let old_next = self.nodes[node.index()].next;

        self.nodes.push(Node {
            prev: Some(node),
            next: old_next,
            payload,
        });
        self.nodes[node.index()].next = Some(id);
        if let Some(n) = old_next {
            self.nodes[n.index()].prev = Some(id);
        }
        id
    }

    /// First node, found by following `prev` links from `node`.
    pub fn head(&self, mut node: NodeId) -> NodeId {
        while let Some(p) = self.nodes[node.index()].prev {
            node = p;
        }
        node
    }

    /// Last node, found by following `next` links from `node`.
    pub fn tail(&self, mut node: NodeId) -> NodeId {
        while let Some(n) = self.nodes[node.index()].next {
            node = n;
        }
        node
    }

    pub fn next(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].next
    }

    pub fn prev(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.index()].prev
    }

    /// Successor of `node`, wrapping from the tail to the head.
    pub fn next_wrapping(&self, node: NodeId) -> NodeId {
        self.next(node).unwrap_or_else(|| self.head(node))
    }

    /// Predecessor of `node`, wrapping from the head to the tail.
    pub fn prev_wrapping(&self, node: NodeId) -> NodeId {
        self.prev(node).unwrap_or_else(|| self.tail(node))
    }

    pub fn get(&self, node: NodeId) -> &T {
        &self.nodes[node.index()].payload
    }

    pub fn get_mut(&mut self, node: NodeId) -> &mut T {
        &mut self.nodes[node.index()].payload
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Head of the list. Every node of the arena belongs to the same list.
    pub fn first(&self) -> NodeId {
        self.head(NodeId(0))
    }

    /// Ids from `node` forward to the tail.
    pub fn ids_from(&self, node: NodeId) -> Ids<'_, T> {
        Ids {
            seq: self,
            cursor: Some(node),
        }
    }

    /// Ids in list order, head to tail.
    pub fn ids(&self) -> Ids<'_, T> {
        self.ids_from(self.first())
    }

    /// Payloads in list order, head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.ids().map(move |id| self.get(id))
    }

    /// Apply `f` to every payload in list order.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(NodeId, &mut T)) {
        let mut cursor = Some(self.first());
        while let Some(id) = cursor {
            let node = &mut self.nodes[id.index()];
            f(id, &mut node.payload);
            cursor = node.next;
        }
    }

    /// Consume the sequence, yielding payloads head to tail.
    pub fn into_payloads(self) -> Vec<T> {
        let order: Vec<NodeId> = self.ids().collect();
        let mut slots: Vec<Option<T>> = self.nodes.into_iter().map(|n| Some(n.payload)).collect();
        order
            .into_iter()
            .filter_map(|id| slots[id.index()].take())
            .collect()
    }
}

/// Forward iterator over node ids.
pub struct Ids<'a, T> {
    seq: &'a Sequence<T>,
    cursor: Option<NodeId>,
}

impl<T> Iterator for Ids<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cursor?;
        self.cursor = self.seq.next(id);
        Some(id)
    }
}

impl<T: fmt::Debug> fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(k: usize) -> (Sequence<usize>, Vec<NodeId>) {
        let (mut seq, root) = Sequence::create(0);
        let mut ids = vec![root];
        let mut last = root;
        for i in 1..=k {
            last = seq.insert_after(last, i);
            ids.push(last);
        }
        (seq, ids)
    }

    #[test]
    fn head_from_any_node_is_the_original_root() {
        for k in 0..8 {
            let (seq, ids) = build(k);
            for &id in &ids {
                assert_eq!(seq.head(id), ids[0]);
            }
            assert_eq!(seq.ids_from(ids[0]).count(), k + 1);
        }
    }

    #[test]
    fn tail_follows_appends() {
        let (seq, ids) = build(4);
        for &id in &ids {
            assert_eq!(seq.tail(id), ids[4]);
        }
        assert_eq!(seq.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn insert_after_middle_splices() {
        let (mut seq, a) = Sequence::create('a');
        let c = seq.insert_after(a, 'c');
        let b = seq.insert_after(a, 'b');

        assert_eq!(seq.iter().copied().collect::<String>(), "abc");
        assert_eq!(seq.next(a), Some(b));
        assert_eq!(seq.prev(b), Some(a));
        assert_eq!(seq.next(b), Some(c));
        assert_eq!(seq.prev(c), Some(b));
        assert_eq!(seq.tail(a), c);
    }

    #[test]
    fn links_are_mutual_inverses() {
        let (seq, _) = build(5);
        for id in seq.ids() {
            if let Some(n) = seq.next(id) {
                assert_eq!(seq.prev(n), Some(id));
            }
            if let Some(p) = seq.prev(id) {
                assert_eq!(seq.next(p), Some(id));
            }
        }
    }

    #[test]
    fn wrapping_traversal_is_circular() {
        let (seq, ids) = build(2);
        assert_eq!(seq.next_wrapping(ids[2]), ids[0]);
        assert_eq!(seq.prev_wrapping(ids[0]), ids[2]);
        assert_eq!(seq.next_wrapping(ids[0]), ids[1]);

        let (single, root) = Sequence::create(());
        assert_eq!(single.next_wrapping(root), root);
        assert_eq!(single.prev_wrapping(root), root);
    }

    #[test]
    fn into_payloads_follows_list_order() {
        let (mut seq, a) = Sequence::create(1);
        let c = seq.insert_after(a, 3);
        seq.insert_after(a, 2);
        seq.insert_after(c, 4);
        assert_eq!(seq.into_payloads(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn for_each_mut_visits_every_node_once() {
        let (mut seq, _) = build(3);
        let mut visited = 0;
        seq.for_each_mut(|_, v| {
            *v *= 10;
            visited += 1;
        });
        assert_eq!(visited, 4);
        assert_eq!(format!("{seq:?}"), "[0, 10, 20, 30]");
    }
}
