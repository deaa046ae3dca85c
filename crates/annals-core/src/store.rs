//! The authoritative, ordered event history.
//!
//! # Design
//!
//! - **Append-mostly**: events are appended in registration order and never
//!   modified.
//! - **Contiguous removal**: entries leave only as inclusive index ranges,
//!   never one by one from the middle.
//! - **Monotonic**: sequences strictly increase from front to back.
//! - **Shared records**: entries are [`Arc`]s, so snapshots handed to
//!   readers are cheap and cannot affect the store.

use std::num::NonZeroUsize;
use std::sync::Arc;

use annals_types::{EventCategory, HistoricalEvent};

use crate::error::HistoryError;

/// An inclusive index range removed from the store, in pre-removal indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovedRange {
    /// First removed index.
    pub start: usize,
    /// Last removed index (inclusive).
    pub end: usize,
}

impl RemovedRange {
    /// Number of entries the range covers.
    pub const fn count(&self) -> usize {
        self.end.saturating_sub(self.start).saturating_add(1)
    }
}

/// Ordered sequence of accepted events.
#[derive(Debug, Default)]
pub struct EventStore {
    /// All entries, oldest first.
    events: Vec<Arc<HistoricalEvent>>,
}

impl EventStore {
    /// Create an empty store.
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Return the number of stored events.
    pub const fn len(&self) -> usize {
        self.events.len()
    }

    /// Return whether the store is empty.
    pub const fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append an event, returning its index.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NonMonotonicSequence`] if the event's
    /// sequence does not exceed the newest stored sequence. The store is
    /// unchanged in that case.
    pub fn append(&mut self, event: Arc<HistoricalEvent>) -> Result<usize, HistoryError> {
        if let Some(previous) = self.last_sequence() {
            if event.sequence <= previous {
                return Err(HistoryError::NonMonotonicSequence {
                    previous,
                    next: event.sequence,
                });
            }
        }
        let index = self.events.len();
        self.events.push(event);
        Ok(index)
    }

    /// Snapshot of every stored event, oldest first.
    pub fn events(&self) -> Vec<Arc<HistoricalEvent>> {
        self.events.clone()
    }

    /// Event at `index`, if present.
    pub fn get(&self, index: usize) -> Option<Arc<HistoricalEvent>> {
        self.events.get(index).cloned()
    }

    /// The newest event, if any.
    pub fn latest(&self) -> Option<Arc<HistoricalEvent>> {
        self.events.last().cloned()
    }

    /// Sequence of the newest event, if any.
    pub fn last_sequence(&self) -> Option<u64> {
        self.events.last().map(|event| event.sequence)
    }

    /// Snapshot of the events in `category`, oldest first.
    pub fn by_category(&self, category: EventCategory) -> Vec<Arc<HistoricalEvent>> {
        self.events
            .iter()
            .filter(|event| event.category() == category)
            .cloned()
            .collect()
    }

    /// Remove the inclusive range `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidRange`] if `start > end`, or
    /// [`HistoryError::RangeOutOfBounds`] if `end` is not a valid index.
    /// Nothing is removed on error.
    pub fn remove_range(&mut self, start: usize, end: usize) -> Result<RemovedRange, HistoryError> {
        if start > end {
            return Err(HistoryError::InvalidRange { start, end });
        }
        if end >= self.events.len() {
            return Err(HistoryError::RangeOutOfBounds {
                start,
                end,
                len: self.events.len(),
            });
        }
        self.events.drain(start..=end);
        Ok(RemovedRange { start, end })
    }

    /// Remove the `count` oldest events. Returns `None` if nothing was
    /// removed (`count == 0` or the store is empty).
    pub fn remove_oldest(&mut self, count: usize) -> Option<RemovedRange> {
        let count = count.min(self.events.len());
        let end = count.checked_sub(1)?;
        self.events.drain(..count);
        Some(RemovedRange { start: 0, end })
    }

    /// Evict the oldest events until at most `capacity` remain.
    pub fn enforce_capacity(&mut self, capacity: NonZeroUsize) -> Option<RemovedRange> {
        let excess = self.events.len().saturating_sub(capacity.get());
        self.remove_oldest(excess)
    }
}
