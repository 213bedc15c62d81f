//! Priority queue over collapse candidates.
//!
//! An ordered set of `(cost, edge)` entries with a per-edge handle table, so
//! costs can be decreased, increased, or erased in O(log n) as collapses
//! invalidate their neighborhoods. Entries order by cost first (total order
//! over f64, so `+∞` entries sink to the back), then by edge id.

use std::cmp::Ordering;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy)]
struct Entry {
    cost: f64,
    edge: usize,
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then(self.edge.cmp(&other.edge))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

/// Ordered multiset of `(cost, edge)` with stable per-edge handles.
#[derive(Debug, Clone, Default)]
pub struct EdgeQueue {
    set: BTreeSet<Entry>,
    // The cost currently stored per edge; doubles as the erase handle.
    handles: Vec<Option<f64>>,
}

impl EdgeQueue {
    /// Create a queue sized for `num_edges` edge ids.
    pub fn with_num_edges(num_edges: usize) -> Self {
        Self {
            set: BTreeSet::new(),
            handles: vec![None; num_edges],
        }
    }

    /// Number of queued edges.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether no edges are queued.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Whether `edge` currently has an entry.
    pub fn contains(&self, edge: usize) -> bool {
        self.handles[edge].is_some()
    }

    /// Insert `edge` with `cost`. The edge must not already be queued.
    pub fn insert(&mut self, edge: usize, cost: f64) {
        debug_assert!(!self.contains(edge), "edge {edge} already queued");
        self.set.insert(Entry { cost, edge });
        self.handles[edge] = Some(cost);
    }

    /// Re-key `edge` to `cost`, inserting it if absent.
    pub fn update(&mut self, edge: usize, cost: f64) {
        self.erase(edge);
        self.insert(edge, cost);
    }

    /// Remove `edge` if queued.
    pub fn erase(&mut self, edge: usize) {
        if let Some(cost) = self.handles[edge].take() {
            let removed = self.set.remove(&Entry { cost, edge });
            debug_assert!(removed, "handle table out of sync for edge {edge}");
        }
    }

    /// The minimum entry, without removing it.
    pub fn peek(&self) -> Option<(f64, usize)> {
        self.set.first().map(|entry| (entry.cost, entry.edge))
    }

    /// Remove and return the minimum entry.
    pub fn pop(&mut self) -> Option<(f64, usize)> {
        let entry = self.set.pop_first()?;
        self.handles[entry.edge] = None;
        Some((entry.cost, entry.edge))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_cost_then_edge() {
        let mut q = EdgeQueue::with_num_edges(4);
        q.insert(2, 1.0);
        q.insert(0, 1.0);
        q.insert(1, 0.5);
        q.insert(3, f64::INFINITY);

        assert_eq!(q.pop(), Some((0.5, 1)));
        assert_eq!(q.pop(), Some((1.0, 0)));
        assert_eq!(q.pop(), Some((1.0, 2)));
        assert_eq!(q.pop(), Some((f64::INFINITY, 3)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_update_rekeys() {
        let mut q = EdgeQueue::with_num_edges(3);
        q.insert(0, 3.0);
        q.insert(1, 2.0);
        q.update(0, 1.0);
        assert_eq!(q.peek(), Some((1.0, 0)));
        q.update(0, f64::INFINITY);
        assert_eq!(q.peek(), Some((2.0, 1)));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_erase_clears_handle() {
        let mut q = EdgeQueue::with_num_edges(2);
        q.insert(0, 1.0);
        q.insert(1, 2.0);
        q.erase(0);
        assert!(!q.contains(0));
        assert_eq!(q.len(), 1);
        // Erasing twice is a no-op.
        q.erase(0);
        assert_eq!(q.pop(), Some((2.0, 1)));
    }

    #[test]
    fn test_infinite_top_signals_starvation() {
        let mut q = EdgeQueue::with_num_edges(2);
        q.insert(0, f64::INFINITY);
        q.insert(1, f64::INFINITY);
        let (cost, _) = q.peek().unwrap();
        assert!(cost.is_infinite());
    }
}
