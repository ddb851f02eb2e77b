//! Reassembly buffer for out-of-order completions.
//!
//! This module provides a buffer that accepts items tagged with line indices
//! and releases them in index order. The consumer uses it to turn worker
//! completions, which arrive in any order, back into the original line order.
//!
//! Two items may target the same index (for instance a placeholder racing a
//! real result). [`ReorderBuffer::merge`] resolves the conflict by keeping the
//! item with the higher [`Ranked::rank`].
//!
//! # Example
//!
//! ```
//! use factpipe_lib::reorder_buffer::ReorderBuffer;
//!
//! let mut buffer: ReorderBuffer<String> = ReorderBuffer::new();
//!
//! // Insert items out of order
//! buffer.insert(2, "third".to_string());
//! buffer.insert(0, "first".to_string());
//! buffer.insert(1, "second".to_string());
//!
//! // Pop in index order
//! assert_eq!(buffer.try_pop_next(), Some("first".to_string()));
//! assert_eq!(buffer.try_pop_next(), Some("second".to_string()));
//! assert_eq!(buffer.try_pop_next(), Some("third".to_string()));
//! assert_eq!(buffer.try_pop_next(), None);
//! ```

use std::collections::VecDeque;

/// Items that can be ranked against another item for the same slot.
pub trait Ranked {
    /// Higher ranks win conflicts.
    fn rank(&self) -> u8;
}

/// What [`ReorderBuffer::merge`] did with an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The slot was empty and now holds the item.
    Inserted,
    /// The item outranked the buffered one and replaced it.
    Replaced,
    /// The buffered item was kept; the new one was dropped.
    Kept,
    /// The index was already released; the item was dropped.
    Stale,
}

/// A buffer that releases items in sequential index order.
///
/// Items can be inserted with any index at or after [`Self::next_seq`], but
/// they are only released once every prior index has been released.
///
/// Uses a sparse `VecDeque` for O(1) insert and pop operations. Every index
/// below `next_seq` has been released and evicted; the buffer only holds items
/// that are not yet contiguous with the cursor.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    /// Sparse buffer: position (index - `next_seq`) maps to an optional item.
    buffer: VecDeque<Option<T>>,
    /// Next index to release; also the index of buffer[0].
    next_seq: u64,
    /// Number of items currently stored.
    count: usize,
}

impl<T> ReorderBuffer<T> {
    /// Create a new, empty buffer whose cursor starts at index 0.
    #[must_use]
    pub fn new() -> Self {
        Self { buffer: VecDeque::new(), next_seq: 0, count: 0 }
    }

    /// Insert an item at an index, replacing whatever was buffered there.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if the index has already been released.
    pub fn insert(&mut self, seq: u64, item: T) {
        debug_assert!(seq >= self.next_seq, "Index {seq} is before cursor {}", self.next_seq);
        if let Some(slot) = self.slot_mut(seq) {
            if slot.replace(item).is_none() {
                self.count += 1;
            }
        }
    }

    /// Pop the next sequential item if available.
    ///
    /// Advances the cursor when an item is returned.
    #[must_use]
    pub fn try_pop_next(&mut self) -> Option<T> {
        if !self.can_pop() {
            return None;
        }
        let item = self.buffer.pop_front().flatten()?;
        self.next_seq += 1;
        self.count -= 1;
        Some(item)
    }

    /// Drain all consecutive ready items starting from the cursor.
    ///
    /// # Example
    ///
    /// ```
    /// use factpipe_lib::reorder_buffer::ReorderBuffer;
    ///
    /// let mut buffer: ReorderBuffer<i32> = ReorderBuffer::new();
    /// buffer.insert(0, 10);
    /// buffer.insert(1, 20);
    /// buffer.insert(3, 40);  // Gap at 2
    ///
    /// let ready: Vec<_> = buffer.drain_ready().collect();
    /// assert_eq!(ready, vec![10, 20]);  // Stops at gap
    /// ```
    pub fn drain_ready(&mut self) -> DrainReady<'_, T> {
        DrainReady { buffer: self }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of items currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Next index to be released.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Whether the item at the cursor is present.
    #[must_use]
    pub fn can_pop(&self) -> bool {
        self.buffer.front().is_some_and(Option::is_some)
    }

    /// Returns the slot for `seq`, growing the buffer as needed. `None` when
    /// `seq` has already been released.
    #[allow(clippy::cast_possible_truncation)]
    fn slot_mut(&mut self, seq: u64) -> Option<&mut Option<T>> {
        let offset = seq.checked_sub(self.next_seq)? as usize;
        if self.buffer.len() <= offset {
            self.buffer.resize_with(offset + 1, || None);
        }
        self.buffer.get_mut(offset)
    }
}

impl<T: Ranked> ReorderBuffer<T> {
    /// Merge an item into the buffer at `seq`.
    ///
    /// An empty slot takes the item. An occupied slot keeps whichever item
    /// ranks higher; on a tie the buffered item stays. Items for indices that
    /// were already released are dropped so no index is ever released twice.
    ///
    /// # Example
    ///
    /// ```
    /// use factpipe_lib::reorder_buffer::{MergeOutcome, Ranked, ReorderBuffer};
    ///
    /// #[derive(Debug, PartialEq)]
    /// struct Item(u8);
    /// impl Ranked for Item {
    ///     fn rank(&self) -> u8 { self.0 }
    /// }
    ///
    /// let mut buffer = ReorderBuffer::new();
    /// assert_eq!(buffer.merge(1, Item(1)), MergeOutcome::Inserted);
    /// assert_eq!(buffer.merge(1, Item(4)), MergeOutcome::Replaced);
    /// assert_eq!(buffer.merge(1, Item(2)), MergeOutcome::Kept);
    /// ```
    pub fn merge(&mut self, seq: u64, item: T) -> MergeOutcome {
        let Some(slot) = self.slot_mut(seq) else {
            return MergeOutcome::Stale;
        };
        if let Some(existing) = slot.as_mut() {
            if item.rank() > existing.rank() {
                *existing = item;
                return MergeOutcome::Replaced;
            }
            return MergeOutcome::Kept;
        }
        *slot = Some(item);
        self.count += 1;
        MergeOutcome::Inserted
    }
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator that drains consecutive ready items from a `ReorderBuffer`.
pub struct DrainReady<'a, T> {
    buffer: &'a mut ReorderBuffer<T>,
}

impl<T> Iterator for DrainReady<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.try_pop_next()
    }
}
