//! The historical event manager: the public surface producers and
//! observers use.
//!
//! # Locking discipline
//!
//! Two locks are involved:
//!
//! - the **state lock** guards the store and the dedup window. It is held
//!   only while checking and mutating them, never while listener code runs,
//!   so readers such as [`HistoricalEventManager::events`] never see a
//!   partial append and never wait on a slow listener;
//! - the **serial lock** is held for a whole registration or prune,
//!   including its dispatch. Listeners therefore see additions and removals
//!   in exactly the order they were applied, and two concurrent
//!   registrations of the same content cannot both be accepted.
//!
//! A registration or prune issued from inside a callback on the
//! dispatching thread would wait on the serial lock forever; it is refused
//! with [`HistoryError::ReentrantMutation`] instead.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use annals_types::{EventCategory, EventContent, EventId, HistoricalEvent};
use chrono::Utc;
use tracing::debug;

use crate::clock::SequenceSource;
use crate::config::HistoryConfig;
use crate::dedup::{DedupDecision, DedupPolicy};
use crate::error::HistoryError;
use crate::listener::{DispatchReport, EventListener, ListenerId, ListenerRegistry};
use crate::store::{EventStore, RemovedRange};

/// Result of [`HistoricalEventManager::register_new_event`].
#[derive(Debug, Clone)]
pub enum Registration {
    /// The event was stored and listeners were notified.
    Accepted {
        /// The stored record.
        event: Arc<HistoricalEvent>,
        /// Position of the record in the history.
        index: usize,
        /// Oldest events evicted to respect the capacity, if any.
        evicted: Option<RemovedRange>,
        /// Combined outcome of the dispatch passes.
        report: DispatchReport,
    },
    /// A content-equal event was registered recently; nothing changed.
    Suppressed,
}

impl Registration {
    /// Whether the event was stored.
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// The stored record, if the event was accepted.
    pub const fn event(&self) -> Option<&Arc<HistoricalEvent>> {
        match self {
            Self::Accepted { event, .. } => Some(event),
            Self::Suppressed => None,
        }
    }
}

/// Outcome of a prune operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pruned {
    /// The removed range, in pre-removal indexing.
    pub range: RemovedRange,
    /// Outcome of the removal notification.
    pub report: DispatchReport,
}

/// Store plus dedup window, always mutated together.
#[derive(Debug)]
struct HistoryState {
    store: EventStore,
    dedup: DedupPolicy,
}

/// Holds the serial lock and marks the current thread as the one mutating
/// the history until dropped.
struct Exclusive<'a> {
    _serial: MutexGuard<'a, ()>,
    owner: &'a Mutex<Option<ThreadId>>,
}

impl Drop for Exclusive<'_> {
    fn drop(&mut self) {
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Records historical events, suppresses recent duplicates and notifies
/// listeners.
///
/// Safe to share between producer and observer threads via
/// `Arc<HistoricalEventManager>`.
pub struct HistoricalEventManager {
    state: Mutex<HistoryState>,
    listeners: ListenerRegistry,
    serial: Mutex<()>,
    /// Thread currently holding the serial lock, if any.
    owner: Mutex<Option<ThreadId>>,
    clock: Arc<dyn SequenceSource>,
    capacity: Option<NonZeroUsize>,
}

impl core::fmt::Debug for HistoricalEventManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HistoricalEventManager")
            .field("len", &self.len())
            .field("match_range", &self.match_range())
            .field("capacity", &self.capacity)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

impl HistoricalEventManager {
    /// Create an unbounded manager comparing new events against the last
    /// `match_range` accepted ones.
    pub fn new(clock: Arc<dyn SequenceSource>, match_range: NonZeroUsize) -> Self {
        Self::with_capacity(clock, match_range, None)
    }

    /// Create a manager that keeps at most `capacity` events, evicting the
    /// oldest (and reporting them as removed) beyond that.
    pub fn with_capacity(
        clock: Arc<dyn SequenceSource>,
        match_range: NonZeroUsize,
        capacity: Option<NonZeroUsize>,
    ) -> Self {
        Self {
            state: Mutex::new(HistoryState {
                store: EventStore::new(),
                dedup: DedupPolicy::new(match_range),
            }),
            listeners: ListenerRegistry::new(),
            serial: Mutex::new(()),
            owner: Mutex::new(None),
            clock,
            capacity,
        }
    }

    /// Create a manager from a [`HistoryConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Config`] if `match_range` or `capacity` is
    /// zero.
    pub fn from_config(
        clock: Arc<dyn SequenceSource>,
        config: &HistoryConfig,
    ) -> Result<Self, HistoryError> {
        let match_range = config.match_range_nonzero()?;
        let capacity = config.capacity_nonzero()?;
        Ok(Self::with_capacity(clock, match_range, capacity))
    }

    fn state(&self) -> MutexGuard<'_, HistoryState> {
        // No code path panics while holding this lock, so a poisoned guard
        // still holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the serial lock, refusing re-entry from a callback.
    fn exclusive(&self) -> Result<Exclusive<'_>, HistoryError> {
        let me = thread::current().id();
        if *self.owner.lock().unwrap_or_else(PoisonError::into_inner) == Some(me) {
            return Err(HistoryError::ReentrantMutation);
        }
        let serial = self.serial.lock().unwrap_or_else(PoisonError::into_inner);
        *self.owner.lock().unwrap_or_else(PoisonError::into_inner) = Some(me);
        Ok(Exclusive {
            _serial: serial,
            owner: &self.owner,
        })
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Register a new event.
    ///
    /// If a content-equal event is among the last `match_range` accepted
    /// events, the call returns [`Registration::Suppressed`] and nothing
    /// changes. Otherwise the event is stamped, appended, remembered for
    /// duplicate suppression, and every listener is notified (after any
    /// capacity eviction has been reported).
    ///
    /// # Errors
    ///
    /// - [`HistoryError::MalformedEvent`] if a required field is blank.
    /// - [`HistoryError::Clock`] or [`HistoryError::NonMonotonicSequence`]
    ///   if the sequence source fails or goes backwards.
    /// - [`HistoryError::ReentrantMutation`] if called from one of this
    ///   manager's listener callbacks.
    ///
    /// Nothing is stored and no listener is notified on error.
    pub fn register_new_event(&self, content: EventContent) -> Result<Registration, HistoryError> {
        if let Some(field) = content.missing_field() {
            return Err(HistoryError::MalformedEvent { field });
        }

        let _exclusive = self.exclusive()?;

        let (event, index, evicted) = {
            let mut state = self.state();

            if state.dedup.decide(&content) == DedupDecision::Duplicate {
                debug!(
                    event_type = %content.event_type,
                    source = content.source,
                    actor = content.actor,
                    "Suppressed recent duplicate event"
                );
                return Ok(Registration::Suppressed);
            }

            let stamp = self.clock.next_stamp()?;
            let event = Arc::new(HistoricalEvent {
                id: EventId::new(),
                sequence: stamp.sequence,
                tick: stamp.tick,
                created_at: Utc::now(),
                content: content.clone(),
            });

            state.store.append(Arc::clone(&event))?;
            state.dedup.record(content);
            let evicted = self
                .capacity
                .and_then(|capacity| state.store.enforce_capacity(capacity));
            let index = state
                .store
                .len()
                .checked_sub(1)
                .ok_or(HistoryError::InternalError("store empty after append"))?;
            (event, index, evicted)
        };

        debug!(
            sequence = event.sequence,
            tick = event.tick,
            index,
            event_type = %event.event_type(),
            "Registered historical event"
        );

        let mut report = DispatchReport::default();
        if let Some(range) = evicted {
            debug!(start = range.start, end = range.end, "Evicted events over capacity");
            report = report.merge(self.listeners.fire_events_removed(range.start, range.end));
        }
        report = report.merge(self.listeners.fire_event_added(index, &event));

        Ok(Registration::Accepted {
            event,
            index,
            evicted,
            report,
        })
    }

    // -----------------------------------------------------------------------
    // Pruning
    // -----------------------------------------------------------------------

    /// Remove the inclusive index range `[start, end]` and notify listeners
    /// once.
    ///
    /// The dedup window is not affected.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidRange`] or
    /// [`HistoryError::RangeOutOfBounds`] without removing anything, or
    /// [`HistoryError::ReentrantMutation`] if called from a callback.
    pub fn remove_range(&self, start: usize, end: usize) -> Result<Pruned, HistoryError> {
        let _exclusive = self.exclusive()?;
        let range = self.state().store.remove_range(start, end)?;
        Ok(self.announce_removal(range))
    }

    /// Remove the `count` oldest events. Returns `None` if there was
    /// nothing to remove, in which case no notification fires.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::ReentrantMutation`] if called from a callback.
    pub fn prune_oldest(&self, count: usize) -> Result<Option<Pruned>, HistoryError> {
        let _exclusive = self.exclusive()?;
        let removed = self.state().store.remove_oldest(count);
        Ok(removed.map(|range| self.announce_removal(range)))
    }

    /// Remove every event. Returns `None` if the history was already empty.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::ReentrantMutation`] if called from a callback.
    pub fn clear(&self) -> Result<Option<Pruned>, HistoryError> {
        self.prune_oldest(usize::MAX)
    }

    fn announce_removal(&self, range: RemovedRange) -> Pruned {
        debug!(start = range.start, end = range.end, "Pruned historical events");
        let report = self.listeners.fire_events_removed(range.start, range.end);
        Pruned { range, report }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshot of the history, oldest first.
    pub fn events(&self) -> Vec<Arc<HistoricalEvent>> {
        self.state().store.events()
    }

    /// Snapshot of the events in `category`, oldest first.
    pub fn events_by_category(&self, category: EventCategory) -> Vec<Arc<HistoricalEvent>> {
        self.state().store.by_category(category)
    }

    /// The event at `index`, if present.
    pub fn event(&self, index: usize) -> Option<Arc<HistoricalEvent>> {
        self.state().store.get(index)
    }

    /// The newest event, if any.
    pub fn latest(&self) -> Option<Arc<HistoricalEvent>> {
        self.state().store.latest()
    }

    /// Number of events in the history.
    pub fn len(&self) -> usize {
        self.state().store.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.state().store.is_empty()
    }

    /// Size of the recent-duplicate window.
    pub fn match_range(&self) -> NonZeroUsize {
        self.state().dedup.match_range()
    }

    /// Maximum number of stored events, if bounded.
    pub const fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Register a listener. The manager only keeps a weak reference; the
    /// listener stops being notified once its last [`Arc`] is dropped.
    ///
    /// Registering the same instance twice returns the existing id.
    pub fn add_listener(&self, listener: &Arc<dyn EventListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    /// Safe to call from inside a callback.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Number of live registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
