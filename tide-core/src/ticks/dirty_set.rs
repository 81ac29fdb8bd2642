//! Bounded, deduplicated FIFO of positions awaiting re-evaluation.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use tide_utils::{BlockPos, ChunkPos};

/// The result of [`DirtySet::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// The position was queued.
    Queued,
    /// The position was already pending.
    Duplicate,
    /// The position was queued and the oldest entry was dropped to make room.
    Evicted(BlockPos),
}

/// A deduplicated, insertion-ordered set of dirty positions.
///
/// Each position is present at most once. When the set is full the oldest
/// entry is dropped to admit a new one. Pending entries are also counted per
/// chunk column so callers can tell when a region has settled.
#[derive(Debug)]
pub struct DirtySet {
    queue: VecDeque<BlockPos>,
    members: FxHashSet<BlockPos>,
    per_chunk: FxHashMap<ChunkPos, usize>,
    capacity: usize,
}

impl DirtySet {
    /// Creates an empty set holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            members: FxHashSet::default(),
            per_chunk: FxHashMap::default(),
            capacity: capacity.max(1),
        }
    }

    /// Queues `pos` unless it is already pending.
    pub fn insert(&mut self, pos: BlockPos) -> Insert {
        if !self.members.insert(pos) {
            return Insert::Duplicate;
        }
        let evicted = if self.queue.len() >= self.capacity {
            self.pop_front()
        } else {
            None
        };
        self.queue.push_back(pos);
        *self.per_chunk.entry(pos.chunk_pos()).or_insert(0) += 1;
        evicted.map_or(Insert::Queued, Insert::Evicted)
    }

    /// Removes and returns the oldest pending position.
    pub fn pop_front(&mut self) -> Option<BlockPos> {
        let pos = self.queue.pop_front()?;
        self.members.remove(&pos);
        self.release(pos.chunk_pos(), 1);
        Some(pos)
    }

    /// Removes up to `max` of the oldest positions, oldest first.
    pub fn drain_front(&mut self, max: usize) -> Vec<BlockPos> {
        let mut batch = Vec::with_capacity(max.min(self.queue.len()));
        while batch.len() < max {
            let Some(pos) = self.pop_front() else {
                break;
            };
            batch.push(pos);
        }
        batch
    }

    /// Returns true if `pos` is pending.
    #[must_use]
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.members.contains(&pos)
    }

    /// Number of pending positions inside `chunk`.
    #[must_use]
    pub fn pending_in(&self, chunk: ChunkPos) -> usize {
        self.per_chunk.get(&chunk).copied().unwrap_or(0)
    }

    /// Drops every pending position inside `chunk`, returning how many were removed.
    pub fn remove_region(&mut self, chunk: ChunkPos) -> usize {
        let Some(count) = self.per_chunk.remove(&chunk) else {
            return 0;
        };
        let members = &mut self.members;
        self.queue.retain(|pos| {
            let keep = pos.chunk_pos() != chunk;
            if !keep {
                members.remove(pos);
            }
            keep
        });
        count
    }

    /// Number of pending positions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// The maximum number of pending positions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&mut self, chunk: ChunkPos, count: usize) {
        if let Some(pending) = self.per_chunk.get_mut(&chunk) {
            *pending = pending.saturating_sub(count);
            if *pending == 0 {
                self.per_chunk.remove(&chunk);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_dedupes() {
        let mut set = DirtySet::new(8);
        let pos = BlockPos::new(1, 2, 3);
        assert_eq!(set.insert(pos), Insert::Queued);
        assert_eq!(set.insert(pos), Insert::Duplicate);
        assert_eq!(set.len(), 1);

        assert_eq!(set.pop_front(), Some(pos));
        assert!(set.is_empty());
        // Once popped it may be queued again.
        assert_eq!(set.insert(pos), Insert::Queued);
    }

    #[test]
    fn test_order_is_stable() {
        let mut set = DirtySet::new(8);
        let a = BlockPos::new(0, 0, 0);
        let b = BlockPos::new(5, 0, 0);
        let c = BlockPos::new(2, 0, 0);
        set.insert(a);
        set.insert(b);
        set.insert(a);
        set.insert(c);
        assert_eq!(set.drain_front(10), vec![a, b, c]);
    }

    #[test]
    fn test_drain_respects_budget() {
        let mut set = DirtySet::new(16);
        for x in 0..10 {
            set.insert(BlockPos::new(x, 0, 0));
        }
        let batch = set.drain_front(4);
        assert_eq!(batch.len(), 4);
        assert_eq!(batch[0], BlockPos::new(0, 0, 0));
        assert_eq!(set.len(), 6);
        assert_eq!(set.pop_front(), Some(BlockPos::new(4, 0, 0)));
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut set = DirtySet::new(3);
        for x in 0..3 {
            assert_eq!(set.insert(BlockPos::new(x, 0, 0)), Insert::Queued);
        }
        assert_eq!(
            set.insert(BlockPos::new(3, 0, 0)),
            Insert::Evicted(BlockPos::new(0, 0, 0))
        );
        assert_eq!(set.len(), 3);
        assert!(!set.contains(BlockPos::new(0, 0, 0)));
        assert!(set.contains(BlockPos::new(3, 0, 0)));
    }

    #[test]
    fn test_pending_per_chunk() {
        let mut set = DirtySet::new(16);
        set.insert(BlockPos::new(1, 0, 1));
        set.insert(BlockPos::new(2, 5, 1));
        set.insert(BlockPos::new(17, 0, 1));
        assert_eq!(set.pending_in(ChunkPos::new(0, 0)), 2);
        assert_eq!(set.pending_in(ChunkPos::new(1, 0)), 1);
        assert_eq!(set.pending_in(ChunkPos::new(-1, 0)), 0);

        set.pop_front();
        assert_eq!(set.pending_in(ChunkPos::new(0, 0)), 1);
    }

    #[test]
    fn test_remove_region() {
        let mut set = DirtySet::new(16);
        set.insert(BlockPos::new(1, 0, 1));
        set.insert(BlockPos::new(-3, 0, 1));
        set.insert(BlockPos::new(2, 0, 1));

        assert_eq!(set.remove_region(ChunkPos::new(0, 0)), 2);
        assert_eq!(set.len(), 1);
        assert!(!set.contains(BlockPos::new(1, 0, 1)));
        assert_eq!(set.pending_in(ChunkPos::new(0, 0)), 0);
        assert_eq!(set.pop_front(), Some(BlockPos::new(-3, 0, 1)));
        assert_eq!(set.remove_region(ChunkPos::new(0, 0)), 0);
    }
}
