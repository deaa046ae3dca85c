//! Listener registration and synchronous, ordered dispatch.
//!
//! # Guarantees
//!
//! - Listeners are notified in registration order.
//! - The registry keeps only [`Weak`] references; it never keeps a listener
//!   alive. Listeners whose owner dropped them are skipped and pruned.
//! - Each dispatch pass walks a snapshot of the registry taken when the pass
//!   starts, and the registry lock is not held while callbacks run. A
//!   callback may therefore add or remove listeners (itself included).
//!   A listener removed by a callback is not called for the rest of that
//!   pass; a listener added mid-pass is first called on the next pass.
//! - A failing listener (error return or panic) is logged and counted, and
//!   the pass continues with the next listener.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use annals_types::HistoricalEvent;
use tracing::warn;

/// Error returned by a listener callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("listener failed: {message}")]
pub struct ListenerError {
    /// Description of the failure.
    pub message: String,
}

impl ListenerError {
    /// Create a listener error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Observer of the event history.
///
/// Callbacks run synchronously on the thread that mutated the history and
/// should return promptly. They may read the history and add or remove
/// listeners, but must not register or prune events on the same manager
/// (such calls are refused with
/// [`HistoryError::ReentrantMutation`](crate::HistoryError::ReentrantMutation)).
pub trait EventListener: Send + Sync {
    /// Called once for every accepted event. `index` is the event's
    /// position in the history right after it was added.
    ///
    /// # Errors
    ///
    /// A returned error is logged by the dispatcher and does not affect
    /// other listeners or the history.
    fn on_event_added(&self, index: usize, event: &Arc<HistoricalEvent>)
    -> Result<(), ListenerError>;

    /// Called once per removal with the inclusive range of removed
    /// indices, numbered as they were before the removal.
    ///
    /// # Errors
    ///
    /// A returned error is logged by the dispatcher and does not affect
    /// other listeners or the history.
    fn on_events_removed(&self, start: usize, end: usize) -> Result<(), ListenerError> {
        let _ = (start, end);
        Ok(())
    }
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Return the raw registration number.
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for ListenerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "listener-{}", self.into_inner())
    }
}

/// Outcome of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners whose callback returned `Ok`.
    pub delivered: usize,
    /// Listeners whose callback returned an error or panicked.
    pub failed: usize,
}

impl DispatchReport {
    /// Combine two reports.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        Self {
            delivered: self.delivered.saturating_add(other.delivered),
            failed: self.failed.saturating_add(other.failed),
        }
    }
}

/// A registered listener.
struct Slot {
    id: ListenerId,
    listener: Weak<dyn EventListener>,
    /// Cleared on removal so an in-flight pass skips the listener.
    active: AtomicBool,
}

#[derive(Default)]
struct RegistryInner {
    /// Last id handed out.
    last_id: u64,
    /// Registered listeners in registration order.
    slots: Vec<Arc<Slot>>,
}

/// Ordered set of listeners plus the dispatcher that notifies them.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Mutex<RegistryInner>,
}

impl core::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        // Callbacks never run under this lock, so a poisoned guard still
        // holds a consistent slot list.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener.
    ///
    /// Registering the same listener instance twice returns the existing id
    /// and does not lead to duplicate notifications.
    pub fn add(&self, listener: &Arc<dyn EventListener>) -> ListenerId {
        let weak = Arc::downgrade(listener);
        let mut inner = self.lock();
        inner.slots.retain(|slot| slot.listener.strong_count() > 0);

        if let Some(existing) = inner
            .slots
            .iter()
            .find(|slot| Weak::ptr_eq(&slot.listener, &weak))
        {
            return existing.id;
        }

        inner.last_id = inner.last_id.saturating_add(1);
        let id = ListenerId(inner.last_id);
        inner.slots.push(Arc::new(Slot {
            id,
            listener: weak,
            active: AtomicBool::new(true),
        }));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    ///
    /// A pass in progress skips the listener from its next callback on
    /// when the removal comes from the dispatching thread (a callback). A
    /// pass running concurrently on another thread may already have
    /// picked the listener and can deliver one more callback after this
    /// returns.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let Some(position) = inner.slots.iter().position(|slot| slot.id == id) else {
            return false;
        };
        let slot = inner.slots.remove(position);
        slot.active.store(false, Ordering::SeqCst);
        true
    }

    /// Whether `id` is currently registered.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.lock()
            .slots
            .iter()
            .any(|slot| slot.id == id && slot.listener.strong_count() > 0)
    }

    /// Number of registered listeners that are still alive.
    pub fn len(&self) -> usize {
        self.lock()
            .slots
            .iter()
            .filter(|slot| slot.listener.strong_count() > 0)
            .count()
    }

    /// Whether no live listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Notify every listener that `event` was added at `index`.
    pub fn fire_event_added(&self, index: usize, event: &Arc<HistoricalEvent>) -> DispatchReport {
        self.dispatch("event_added", |listener| {
            listener.on_event_added(index, event)
        })
    }

    /// Notify every listener that `[start, end]` was removed.
    pub fn fire_events_removed(&self, start: usize, end: usize) -> DispatchReport {
        self.dispatch("events_removed", |listener| {
            listener.on_events_removed(start, end)
        })
    }

    /// Snapshot of the live slots, pruning dead ones.
    fn snapshot(&self) -> Vec<Arc<Slot>> {
        let mut inner = self.lock();
        inner.slots.retain(|slot| slot.listener.strong_count() > 0);
        inner.slots.clone()
    }

    fn dispatch<F>(&self, callback: &'static str, mut notify: F) -> DispatchReport
    where
        F: FnMut(&dyn EventListener) -> Result<(), ListenerError>,
    {
        let mut report = DispatchReport::default();
        for slot in self.snapshot() {
            if !slot.active.load(Ordering::SeqCst) {
                continue;
            }
            let Some(listener) = slot.listener.upgrade() else {
                continue;
            };

            match catch_unwind(AssertUnwindSafe(|| notify(listener.as_ref()))) {
                Ok(Ok(())) => {
                    report.delivered = report.delivered.saturating_add(1);
                }
                Ok(Err(err)) => {
                    warn!(listener = %slot.id, callback, %err, "Listener callback failed");
                    report.failed = report.failed.saturating_add(1);
                }
                Err(payload) => {
                    warn!(
                        listener = %slot.id,
                        callback,
                        panic = panic_message(payload.as_ref()),
                        "Listener callback panicked"
                    );
                    report.failed = report.failed.saturating_add(1);
                }
            }
        }
        report
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use annals_types::{EventContent, EventId, EventType};
    use chrono::Utc;

    use super::*;

    /// Appends `name` to a shared log on every callback.
    struct Named {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl EventListener for Named {
        fn on_event_added(
            &self,
            index: usize,
            _event: &Arc<HistoricalEvent>,
        ) -> Result<(), ListenerError> {
            self.log.lock().unwrap().push(format!("{}:added:{index}", self.name));
            Ok(())
        }

        fn on_events_removed(&self, start: usize, end: usize) -> Result<(), ListenerError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:removed:{start}-{end}", self.name));
            Ok(())
        }
    }

    struct Failing;

    impl EventListener for Failing {
        fn on_event_added(
            &self,
            _index: usize,
            _event: &Arc<HistoricalEvent>,
        ) -> Result<(), ListenerError> {
            Err(ListenerError::new("display offline"))
        }
    }

    struct Panicking;

    impl EventListener for Panicking {
        fn on_event_added(
            &self,
            _index: usize,
            _event: &Arc<HistoricalEvent>,
        ) -> Result<(), ListenerError> {
            panic!("listener bug");
        }
    }

    fn event() -> Arc<HistoricalEvent> {
        Arc::new(HistoricalEvent {
            id: EventId::new(),
            sequence: 1,
            tick: 0,
            created_at: Utc::now(),
            content: EventContent {
                event_type: EventType::MissionStart,
                source: "Mission".to_owned(),
                cause: "Exploration".to_owned(),
                description: "Mission Starting".to_owned(),
                actor: "Rover Team".to_owned(),
                primary_entity: None,
                secondary_entity: None,
            },
        })
    }

    fn named(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn EventListener> {
        Arc::new(Named {
            name,
            log: Arc::clone(log),
        })
    }

    #[test]
    fn notifies_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let a = named("a", &log);
        let b = named("b", &log);
        let c = named("c", &log);
        registry.add(&b);
        registry.add(&a);
        registry.add(&c);

        let report = registry.fire_event_added(0, &event());
        assert_eq!(report, DispatchReport { delivered: 3, failed: 0 });
        registry.fire_events_removed(0, 0);

        assert_eq!(
            *log.lock().unwrap(),
            [
                "b:added:0",
                "a:added:0",
                "c:added:0",
                "b:removed:0-0",
                "a:removed:0-0",
                "c:removed:0-0",
            ]
        );
    }

    #[test]
    fn duplicate_registration_returns_same_id() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let a = named("a", &log);
        let first = registry.add(&a);
        let second = registry.add(&a);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);

        let b = named("b", &log);
        let third = registry.add(&b);
        assert!(third.into_inner() > first.into_inner());
        assert_eq!(third.to_string(), format!("listener-{}", third.into_inner()));

        registry.fire_event_added(0, &event());
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn removal_is_idempotent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let id = registry.add(&named("a", &log));
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(!registry.contains(id));
    }

    #[test]
    fn registry_does_not_keep_listeners_alive() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let a = named("a", &log);
        let id = registry.add(&a);
        drop(a);

        assert!(!registry.contains(id));
        assert!(registry.is_empty());
        let report = registry.fire_event_added(0, &event());
        assert_eq!(report, DispatchReport::default());
    }

    #[test]
    fn failures_are_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ListenerRegistry::new();
        let failing: Arc<dyn EventListener> = Arc::new(Failing);
        let panicking: Arc<dyn EventListener> = Arc::new(Panicking);
        let a = named("a", &log);
        registry.add(&failing);
        registry.add(&panicking);
        registry.add(&a);

        let report = registry.fire_event_added(0, &event());
        assert_eq!(report, DispatchReport { delivered: 1, failed: 2 });
        assert_eq!(*log.lock().unwrap(), ["a:added:0"]);

        // The registry stays usable after a panic.
        let again = registry.fire_event_added(1, &event());
        assert_eq!(again.failed, 2);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn merge_adds_counts() {
        let a = DispatchReport { delivered: 2, failed: 1 };
        let b = DispatchReport { delivered: 1, failed: 0 };
        assert_eq!(a.merge(b), DispatchReport { delivered: 3, failed: 1 });
    }
}
