//! Recent-duplicate suppression.
//!
//! A candidate is a duplicate when a content-equal event is among the last
//! `match_range` accepted events. Older repeats are accepted again: the
//! check only guards against recent repeats, which keeps it bounded by the
//! window size instead of the whole history.

use std::num::NonZeroUsize;

use annals_types::EventContent;

use crate::window::RecencyWindow;

/// Outcome of checking a candidate against the recency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupDecision {
    /// No recent content-equal event; the candidate should be stored.
    Fresh,
    /// A content-equal event is in the window; the candidate is dropped.
    Duplicate,
}

/// Duplicate suppression over a [`RecencyWindow`].
#[derive(Debug, Clone)]
pub struct DedupPolicy {
    window: RecencyWindow,
}

impl DedupPolicy {
    /// Create a policy comparing against the last `match_range` accepted
    /// events.
    pub fn new(match_range: NonZeroUsize) -> Self {
        Self {
            window: RecencyWindow::new(match_range),
        }
    }

    /// Classify a candidate. Never mutates the window.
    pub fn decide(&self, candidate: &EventContent) -> DedupDecision {
        if self.window.contains(candidate) {
            DedupDecision::Duplicate
        } else {
            DedupDecision::Fresh
        }
    }

    /// Whether the candidate should be stored.
    pub fn should_accept(&self, candidate: &EventContent) -> bool {
        self.decide(candidate) == DedupDecision::Fresh
    }

    /// Record an accepted event so later repeats of it are suppressed.
    pub fn record(&mut self, accepted: EventContent) {
        self.window.push(accepted);
    }

    /// The window size this policy was built with.
    pub const fn match_range(&self) -> NonZeroUsize {
        self.window.capacity()
    }

    /// The underlying window.
    pub const fn window(&self) -> &RecencyWindow {
        &self.window
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use annals_types::{EntityId, EventType};

    use super::*;

    fn content(event_type: EventType, cause: &str) -> EventContent {
        EventContent {
            event_type,
            source: "Medical".to_owned(),
            cause: cause.to_owned(),
            description: "Test Description".to_owned(),
            actor: "Test Actor".to_owned(),
            primary_entity: None,
            secondary_entity: None,
        }
    }

    fn policy(range: usize) -> DedupPolicy {
        DedupPolicy::new(NonZeroUsize::new(range).unwrap())
    }

    #[test]
    fn recent_repeat_is_duplicate() {
        let mut p = policy(3);
        let c = content(EventType::MedicalCured, "Test Cause");
        assert!(p.should_accept(&c));
        p.record(c.clone());
        assert_eq!(p.decide(&c), DedupDecision::Duplicate);
    }

    #[test]
    fn deciding_does_not_mutate() {
        let p = policy(3);
        let c = content(EventType::MedicalCured, "Test Cause");
        assert!(p.should_accept(&c));
        assert!(p.should_accept(&c));
        assert!(p.window().is_empty());
    }

    #[test]
    fn differing_type_is_fresh() {
        let mut p = policy(3);
        p.record(content(EventType::MedicalCured, "Test Cause"));
        assert!(p.should_accept(&content(EventType::MedicalDeath, "Test Cause")));
    }

    #[test]
    fn differing_entity_is_fresh() {
        let mut p = policy(3);
        let base = content(EventType::MalfunctionPartsFailure, "Worn seal");
        p.record(base.clone());

        let mut elsewhere = base;
        elsewhere.secondary_entity = Some(EntityId::new());
        assert!(p.should_accept(&elsewhere));
    }

    #[test]
    fn evicted_repeat_is_fresh_again() {
        let mut p = policy(2);
        let first = content(EventType::MedicalCured, "Cause 0");
        p.record(first.clone());
        p.record(content(EventType::MedicalCured, "Cause 1"));
        assert!(!p.should_accept(&first));

        p.record(content(EventType::MedicalCured, "Cause 2"));
        assert!(p.should_accept(&first));
    }
}
