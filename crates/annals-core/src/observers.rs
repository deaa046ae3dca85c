//! Built-in listeners.
//!
//! - [`TracingListener`] -- writes every notification to the log.
//! - [`EventTally`] -- running per-type and per-category counts that follow
//!   removals as well as additions.
//! - [`BroadcastListener`] -- forwards notifications onto a
//!   [`tokio::sync::broadcast`] channel for async consumers such as
//!   dashboard sockets.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use annals_types::{EventCategory, EventType, HistoricalEvent};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::config::MAX_BROADCAST_CAPACITY;
use crate::listener::{EventListener, ListenerError};

// ---------------------------------------------------------------------------
// TracingListener
// ---------------------------------------------------------------------------

/// Logs every accepted event at `info` and every removal at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl EventListener for TracingListener {
    fn on_event_added(
        &self,
        index: usize,
        event: &Arc<HistoricalEvent>,
    ) -> Result<(), ListenerError> {
        info!(
            index,
            sequence = event.sequence,
            tick = event.tick,
            category = %event.category(),
            event_type = %event.event_type(),
            source = event.content.source,
            cause = event.content.cause,
            actor = event.content.actor,
            "{}",
            event.description()
        );
        Ok(())
    }

    fn on_events_removed(&self, start: usize, end: usize) -> Result<(), ListenerError> {
        debug!(start, end, "Historical events removed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// EventTally
// ---------------------------------------------------------------------------

/// Counts of events currently in the history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TallySummary {
    /// Count per event type (types with no events are absent).
    pub by_type: BTreeMap<EventType, u64>,
    /// Count per category (categories with no events are absent).
    pub by_category: BTreeMap<EventCategory, u64>,
    /// Total number of events.
    pub total: u64,
}

#[derive(Debug, Default)]
struct TallyInner {
    /// Event type at each history index. `None` marks events added before
    /// the tally was attached.
    mirror: Vec<Option<EventType>>,
    by_type: BTreeMap<EventType, u64>,
}

/// Per-type statistics over the history.
///
/// The tally mirrors the history's index layout so a removal notification
/// can be translated back into the event types it removed.
#[derive(Debug, Default)]
pub struct EventTally {
    inner: Mutex<TallyInner>,
}

impl EventTally {
    /// Create an empty tally. Attach it before any event is registered to
    /// count the whole history.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TallyInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of counted events of `event_type`.
    pub fn count(&self, event_type: EventType) -> u64 {
        self.lock().by_type.get(&event_type).copied().unwrap_or(0)
    }

    /// Number of counted events in `category`.
    pub fn category_count(&self, category: EventCategory) -> u64 {
        self.lock()
            .by_type
            .iter()
            .filter(|(event_type, _)| event_type.category() == category)
            .fold(0u64, |acc, (_, n)| acc.saturating_add(*n))
    }

    /// Snapshot of all counts.
    pub fn summary(&self) -> TallySummary {
        let inner = self.lock();
        let mut summary = TallySummary::default();
        for (&event_type, &n) in &inner.by_type {
            summary.by_type.insert(event_type, n);
            let entry = summary.by_category.entry(event_type.category()).or_insert(0);
            *entry = entry.saturating_add(n);
            summary.total = summary.total.saturating_add(n);
        }
        summary
    }
}

impl EventListener for EventTally {
    fn on_event_added(
        &self,
        index: usize,
        event: &Arc<HistoricalEvent>,
    ) -> Result<(), ListenerError> {
        let mut inner = self.lock();
        if index < inner.mirror.len() {
            return Err(ListenerError::new(format!(
                "tally out of step: event added at {index} but {} already mirrored",
                inner.mirror.len()
            )));
        }
        // Events added before the tally was attached are unknown.
        inner.mirror.resize(index, None);
        let event_type = event.event_type();
        inner.mirror.push(Some(event_type));
        let entry = inner.by_type.entry(event_type).or_insert(0);
        *entry = entry.saturating_add(1);
        Ok(())
    }

    fn on_events_removed(&self, start: usize, end: usize) -> Result<(), ListenerError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        // Indices past the mirror belong to events the tally never saw.
        let stop = end.saturating_add(1).min(inner.mirror.len());
        if start >= stop {
            return Ok(());
        }
        for event_type in inner.mirror.drain(start..stop).flatten() {
            if let Some(n) = inner.by_type.get_mut(&event_type) {
                *n = n.saturating_sub(1);
                if *n == 0 {
                    inner.by_type.remove(&event_type);
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BroadcastListener
// ---------------------------------------------------------------------------

/// A history change, as delivered to async subscribers.
#[derive(Debug, Clone)]
pub enum HistoryNotification {
    /// An event was added at `index`.
    Added {
        /// Position of the event in the history.
        index: usize,
        /// The accepted record.
        event: Arc<HistoricalEvent>,
    },
    /// The inclusive range `[start, end]` was removed.
    Removed {
        /// First removed index.
        start: usize,
        /// Last removed index (inclusive).
        end: usize,
    },
}

/// Bridges synchronous history notifications onto a broadcast channel.
///
/// If a subscriber falls behind by more than the channel capacity it
/// receives [`broadcast::error::RecvError::Lagged`] and skips ahead.
#[derive(Debug)]
pub struct BroadcastListener {
    tx: broadcast::Sender<HistoryNotification>,
}

impl BroadcastListener {
    /// Create a listener backed by a channel of the given capacity.
    ///
    /// The capacity is clamped to `1..=`[`MAX_BROADCAST_CAPACITY`].
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.clamp(1, MAX_BROADCAST_CAPACITY));
        Self { tx }
    }

    /// Subscribe to future notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryNotification> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn publish(&self, notification: HistoryNotification) {
        // send fails only when there are no receivers, which is normal
        // when nobody is watching.
        let receivers = self.tx.send(notification).unwrap_or(0);
        debug!(receivers, "History notification broadcast");
    }
}

impl EventListener for BroadcastListener {
    fn on_event_added(
        &self,
        index: usize,
        event: &Arc<HistoricalEvent>,
    ) -> Result<(), ListenerError> {
        self.publish(HistoryNotification::Added {
            index,
            event: Arc::clone(event),
        });
        Ok(())
    }

    fn on_events_removed(&self, start: usize, end: usize) -> Result<(), ListenerError> {
        self.publish(HistoryNotification::Removed { start, end });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use annals_types::{EventContent, EventId};
    use chrono::Utc;

    use super::*;

    fn event(sequence: u64, event_type: EventType) -> Arc<HistoricalEvent> {
        Arc::new(HistoricalEvent {
            id: EventId::new(),
            sequence,
            tick: 0,
            created_at: Utc::now(),
            content: EventContent {
                event_type,
                source: "Test".to_owned(),
                cause: "Test Cause".to_owned(),
                description: "Test Description".to_owned(),
                actor: "Test Actor".to_owned(),
                primary_entity: None,
                secondary_entity: None,
            },
        })
    }

    #[test]
    fn tally_counts_additions() {
        let tally = EventTally::new();
        tally.on_event_added(0, &event(1, EventType::MedicalCured)).unwrap();
        tally.on_event_added(1, &event(2, EventType::MedicalDeath)).unwrap();
        tally.on_event_added(2, &event(3, EventType::MedicalDeath)).unwrap();
        tally.on_event_added(3, &event(4, EventType::TaskFinish)).unwrap();

        assert_eq!(tally.count(EventType::MedicalDeath), 2);
        assert_eq!(tally.count(EventType::HazardActsOfGod), 0);
        assert_eq!(tally.category_count(EventCategory::Medical), 3);

        let summary = tally.summary();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.by_category.get(&EventCategory::Task), Some(&1));
    }

    #[test]
    fn tally_follows_removals() {
        let tally = EventTally::new();
        tally.on_event_added(0, &event(1, EventType::MedicalCured)).unwrap();
        tally.on_event_added(1, &event(2, EventType::MedicalDeath)).unwrap();
        tally.on_event_added(2, &event(3, EventType::TaskFinish)).unwrap();

        tally.on_events_removed(0, 1).unwrap();
        assert_eq!(tally.count(EventType::MedicalCured), 0);
        assert_eq!(tally.count(EventType::MedicalDeath), 0);
        assert_eq!(tally.count(EventType::TaskFinish), 1);
        assert!(!tally.summary().by_type.contains_key(&EventType::MedicalCured));

        // The surviving event is now at index 0; the next one lands at 1.
        tally.on_event_added(1, &event(4, EventType::TaskFinish)).unwrap();
        tally.on_events_removed(0, 0).unwrap();
        assert_eq!(tally.count(EventType::TaskFinish), 1);
    }

    #[test]
    fn tally_attached_late_counts_only_what_it_saw() {
        let tally = EventTally::new();
        tally.on_event_added(5, &event(6, EventType::HazardMeteoriteImpact)).unwrap();
        assert_eq!(tally.summary().total, 1);

        // Removing the unseen prefix leaves the count alone.
        tally.on_events_removed(0, 4).unwrap();
        assert_eq!(tally.summary().total, 1);
        tally.on_events_removed(0, 0).unwrap();
        assert_eq!(tally.summary().total, 0);
    }

    #[test]
    fn tally_rejects_out_of_step_index() {
        let tally = EventTally::new();
        tally.on_event_added(0, &event(1, EventType::TaskFinish)).unwrap();
        assert!(tally.on_event_added(0, &event(2, EventType::TaskFinish)).is_err());
        assert_eq!(tally.count(EventType::TaskFinish), 1);
    }

    #[tokio::test]
    async fn broadcast_forwards_notifications() {
        let listener = BroadcastListener::new(8);
        let mut rx = listener.subscribe();
        assert_eq!(listener.receiver_count(), 1);

        let added = event(1, EventType::MissionStart);
        listener.on_event_added(0, &added).unwrap();
        listener.on_events_removed(0, 0).unwrap();

        match rx.recv().await.unwrap() {
            HistoryNotification::Added { index, event } => {
                assert_eq!(index, 0);
                assert!(Arc::ptr_eq(&event, &added));
            }
            other => panic!("unexpected notification: {other:?}"),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            HistoryNotification::Removed { start: 0, end: 0 }
        ));
    }

    #[test]
    fn broadcast_capacity_is_clamped() {
        let listener = BroadcastListener::new(usize::MAX);
        let _rx = listener.subscribe();
        assert!(listener.on_events_removed(0, 0).is_ok());
    }

    #[test]
    fn broadcast_without_subscribers_is_not_an_error() {
        let listener = BroadcastListener::new(0);
        assert!(listener.on_event_added(0, &event(1, EventType::TaskFinish)).is_ok());
    }
}
