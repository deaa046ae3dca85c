//! Historical event manager for the Annals simulation history.
//!
//! Every subsystem of a running simulation reports discrete,
//! human-readable events (a colonist cured, a mission started, a part
//! failed). This crate records them in order, drops near-identical repeats
//! and notifies observers synchronously.
//!
//! # Modules
//!
//! - [`clock`] -- [`SequenceSource`] trait, [`AtomicSequence`] and
//!   [`SimulationClock`].
//! - [`config`] -- Configuration loading from `annals-config.yaml`.
//! - [`builder`] -- [`EventBuilder`] for validated event content.
//! - [`window`] -- Bounded buffer of recently accepted contents.
//! - [`dedup`] -- Recent-duplicate suppression over the window.
//! - [`store`] -- The ordered, prunable event history.
//! - [`listener`] -- [`EventListener`] trait, registry and dispatcher.
//! - [`manager`] -- [`HistoricalEventManager`], the public surface.
//! - [`observers`] -- Built-in logging, statistics and broadcast listeners.
//!
//! # Usage
//!
//! ```
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//!
//! use annals_core::{AtomicSequence, EventBuilder, HistoricalEventManager};
//! use annals_types::EventType;
//!
//! let manager = HistoricalEventManager::new(
//!     Arc::new(AtomicSequence::new()),
//!     NonZeroUsize::MIN,
//! );
//! let content = EventBuilder::new(EventType::MedicalCured)
//!     .source("Medical")
//!     .cause("Cold")
//!     .description("Recovered from a cold")
//!     .actor("Jane Doe")
//!     .build()
//!     .ok();
//!
//! if let Some(content) = content {
//!     let first = manager.register_new_event(content.clone()).ok();
//!     let repeat = manager.register_new_event(content).ok();
//!     assert!(first.is_some_and(|r| r.is_accepted()));
//!     assert!(repeat.is_some_and(|r| !r.is_accepted()));
//! }
//! assert_eq!(manager.len(), 1);
//! ```

pub mod builder;
pub mod clock;
pub mod config;
pub mod dedup;
pub mod error;
pub mod listener;
pub mod manager;
pub mod observers;
pub mod store;
pub mod window;

pub use builder::EventBuilder;
pub use clock::{AtomicSequence, ClockError, SequenceSource, SimulationClock, Stamp};
pub use config::{ConfigError, HistoryConfig};
pub use dedup::{DedupDecision, DedupPolicy};
pub use error::HistoryError;
pub use listener::{DispatchReport, EventListener, ListenerError, ListenerId, ListenerRegistry};
pub use manager::{HistoricalEventManager, Pruned, Registration};
pub use observers::{BroadcastListener, EventTally, HistoryNotification, TallySummary, TracingListener};
pub use store::{EventStore, RemovedRange};
pub use window::RecencyWindow;
