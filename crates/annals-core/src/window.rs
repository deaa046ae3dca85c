//! Bounded buffer of the most recently accepted event contents.
//!
//! The window is internal bookkeeping for duplicate suppression only. It is
//! not the public history: entries that fall out of it are dropped
//! silently, and pruning the history never touches it.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use annals_types::EventContent;

/// Fixed-capacity, insertion-ordered buffer of recent event contents.
///
/// Invariant: `len() <= capacity()` at all times.
#[derive(Debug, Clone)]
pub struct RecencyWindow {
    /// Oldest entry at the front, newest at the back.
    entries: VecDeque<EventContent>,
    /// Maximum number of entries retained.
    capacity: NonZeroUsize,
}

impl RecencyWindow {
    /// Create an empty window holding at most `capacity` entries.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Push the newest entry, evicting the oldest when full.
    ///
    /// Returns the evicted entry, if any.
    pub fn push(&mut self, content: EventContent) -> Option<EventContent> {
        let evicted = if self.entries.len() >= self.capacity.get() {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(content);
        evicted
    }

    /// Whether a content-equal entry is currently in the window.
    pub fn contains(&self, content: &EventContent) -> bool {
        self.entries.iter().any(|entry| entry == content)
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the window holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries retained.
    pub const fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &EventContent> {
        self.entries.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use annals_types::EventType;

    use super::*;

    fn content(cause: &str) -> EventContent {
        EventContent {
            event_type: EventType::MedicalStarts,
            source: "Medical".to_owned(),
            cause: cause.to_owned(),
            description: "Fell ill".to_owned(),
            actor: "John Smith".to_owned(),
            primary_entity: None,
            secondary_entity: None,
        }
    }

    fn window(capacity: usize) -> RecencyWindow {
        RecencyWindow::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut w = window(3);
        for i in 0..10 {
            w.push(content(&format!("Cause {i}")));
            assert!(w.len() <= 3);
        }
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut w = window(2);
        assert!(w.push(content("a")).is_none());
        assert!(w.push(content("b")).is_none());
        let evicted = w.push(content("c")).unwrap();
        assert_eq!(evicted.cause, "a");

        let causes: Vec<_> = w.iter().map(|c| c.cause.as_str()).collect();
        assert_eq!(causes, ["b", "c"]);
    }

    #[test]
    fn contains_compares_content() {
        let mut w = window(2);
        w.push(content("a"));
        assert!(w.contains(&content("a")));
        assert!(!w.contains(&content("b")));

        w.push(content("b"));
        w.push(content("c"));
        assert!(!w.contains(&content("a")));
    }
}
