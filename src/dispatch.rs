//! Binary-heap dispatch queue. Entries live in a dense array laid out
//! breadth-first: the children of slot `i` sit at `2i + 1` and `2i + 2`, and
//! no entry is ever served after one of its descendants.

use std::iter::FusedIterator;

use tracing::{debug, trace};

use crate::entity::{EntityId, Order, Priority};
use crate::error::QueueError;

/// Capacity used by [`DispatchQueue::new`].
pub const DEFAULT_CAPACITY: usize = 100;

/// A scheduled operation: which entity, and how urgently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub entity: EntityId,
    pub priority: Priority,
}

/// Priority queue of scheduled operations against registry entities.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    entries: Vec<Entry>,
    order: Order,
}

impl DispatchQueue {
    pub fn new(order: Order) -> Self {
        Self {
            entries: Vec::with_capacity(DEFAULT_CAPACITY),
            order,
        }
    }

    /// Queue with room for `capacity` entries before the first growth. A
    /// capacity the allocator cannot satisfy is an error, not an abort.
    pub fn with_capacity(order: Order, capacity: usize) -> Result<Self, QueueError> {
        let mut entries = Vec::new();
        entries
            .try_reserve_exact(capacity)
            .map_err(|source| QueueError::AllocationFailure { capacity, source })?;
        Ok(Self { entries, order })
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.capacity()
    }

    /// The heap array exactly as stored, root first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Schedule `entity` with `priority`.
    ///
    /// When the backing store is full its capacity is doubled first. A failed
    /// reservation is reported before anything is written, so the existing
    /// heap is left intact.
    pub fn insert(&mut self, entity: EntityId, priority: Priority) -> Result<(), QueueError> {
        self.grow_if_full()?;
        self.entries.push(Entry { entity, priority });
        let slot = self.sift_up(self.entries.len() - 1);
        trace!(%entity, priority, slot, "queued entry");
        Ok(())
    }

    /// The entry that would be served next.
    pub fn peek(&self) -> Option<&Entry> {
        self.entries.first()
    }

    /// Remove and return the entry that should be served next. The referenced
    /// entity stays in the registry.
    pub fn extract_best(&mut self) -> Option<Entry> {
        if self.entries.is_empty() {
            return None;
        }
        let best = self.entries.swap_remove(0);
        if !self.entries.is_empty() {
            self.sift_down(0);
        }
        trace!(entity = %best.entity, priority = best.priority, "extracted entry");
        Some(best)
    }

    /// True when at least one entry references `entity`. Linear in the queue
    /// length.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entries.iter().any(|entry| entry.entity == entity)
    }

    /// Number of entries referencing `entity`. Linear in the queue length.
    pub fn pending(&self, entity: EntityId) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.entity == entity)
            .count()
    }

    /// Every entry in service order, computed on a private copy of the heap.
    pub fn drain_sorted(&self) -> SortedDrain {
        SortedDrain {
            scratch: self.clone(),
        }
    }

    fn grow_if_full(&mut self) -> Result<(), QueueError> {
        let capacity = self.entries.capacity();
        if self.entries.len() < capacity {
            return Ok(());
        }
        let additional = capacity.max(1);
        self.entries.try_reserve_exact(additional).map_err(|source| {
            QueueError::AllocationFailure {
                capacity: capacity.saturating_add(additional),
                source,
            }
        })?;
        debug!(
            from = capacity,
            to = self.entries.capacity(),
            "grew dispatch queue"
        );
        Ok(())
    }

    fn sift_up(&mut self, mut slot: usize) -> usize {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if !self.order.prefers(self.entries[slot].priority, self.entries[parent].priority) {
                break;
            }
            self.entries.swap(slot, parent);
            slot = parent;
        }
        slot
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.entries.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut best = slot;

            if left < len && self.order.prefers(self.entries[left].priority, self.entries[best].priority) {
                best = left;
            }
            if right < len && self.order.prefers(self.entries[right].priority, self.entries[best].priority) {
                best = right;
            }
            if best == slot {
                break;
            }
            self.entries.swap(slot, best);
            slot = best;
        }
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new(Order::default())
    }
}

/// Iterator returned by [`DispatchQueue::drain_sorted`]. It owns its copy of
/// the heap, so the queue it came from can keep changing meanwhile.
#[derive(Debug, Clone)]
pub struct SortedDrain {
    scratch: DispatchQueue,
}

impl Iterator for SortedDrain {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        self.scratch.extract_best()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.scratch.len();
        (len, Some(len))
    }
}

impl ExactSizeIterator for SortedDrain {}

impl FusedIterator for SortedDrain {}
