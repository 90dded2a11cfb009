//! Deduplicating FIFO queue.

use std::collections::VecDeque;
use std::hash::Hash;

use rustc_hash::FxHashSet;

/// FIFO queue in which every item appears at most once.
///
/// Pushing an item that is already queued is a no-op; it keeps its original
/// position. Membership tests are O(1).
#[derive(Debug)]
pub struct QueueSet<T> {
    order: VecDeque<T>,
    members: FxHashSet<T>,
}

impl<T: Copy + Eq + Hash> QueueSet<T> {
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
            members: FxHashSet::default(),
        }
    }

    /// Appends `item` unless it is already queued. Returns `true` if it was added.
    pub fn push(&mut self, item: T) -> bool {
        if self.members.insert(item) {
            self.order.push_back(item);
            true
        } else {
            false
        }
    }

    /// Removes and returns the oldest item.
    pub fn pop(&mut self) -> Option<T> {
        let item = self.order.pop_front()?;
        self.members.remove(&item);
        Some(item)
    }

    /// Pops up to `max` items in FIFO order.
    pub fn pop_up_to(&mut self, max: usize) -> Vec<T> {
        let n = max.min(self.order.len());
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            if let Some(item) = self.pop() {
                out.push(item);
            }
        }
        out
    }

    pub fn contains(&self, item: &T) -> bool {
        self.members.contains(item)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}

impl<T: Copy + Eq + Hash> Default for QueueSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
