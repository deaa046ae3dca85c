//! Replays a recorded sequence of event drafts through a manager.
//!
//! A replay file is a JSON array of entries. Each entry is an
//! [`EventContent`] object with an optional `advance_ticks` field that moves
//! the simulation clock forward before the event is registered:
//!
//! ```json
//! [
//!   { "event_type": "medical_starts", "source": "Medical", "cause": "Cold",
//!     "description": "Caught a cold", "actor": "Jane Doe" },
//!   { "advance_ticks": 3, "event_type": "medical_cured", "source": "Medical",
//!     "cause": "Cold", "description": "Recovered from a cold", "actor": "Jane Doe" }
//! ]
//! ```

use std::path::Path;

use annals_core::{HistoricalEventManager, HistoryError, Registration, SimulationClock};
use annals_types::EventContent;
use serde::Deserialize;
use tracing::warn;

use crate::error::EngineError;

/// One recorded draft.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayEntry {
    /// Ticks to advance the clock by before registering.
    #[serde(default)]
    pub advance_ticks: u64,
    /// The event to register.
    #[serde(flatten)]
    pub event: EventContent,
}

/// Outcome counts of a replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Entries stored in the history.
    pub accepted: u64,
    /// Entries dropped as recent duplicates.
    pub suppressed: u64,
    /// Entries refused as malformed.
    pub rejected: u64,
    /// Listener callbacks that failed while replaying.
    pub listener_failures: u64,
}

/// Parse a replay file.
///
/// # Errors
///
/// Returns [`EngineError::Io`] or [`EngineError::Json`] if the file cannot
/// be read or parsed.
pub fn load(path: &Path) -> Result<Vec<ReplayEntry>, EngineError> {
    let contents = std::fs::read_to_string(path)?;
    parse(&contents)
}

/// Parse replay entries from a JSON string.
///
/// # Errors
///
/// Returns [`EngineError::Json`] if the input is not a JSON array of entries.
pub fn parse(json: &str) -> Result<Vec<ReplayEntry>, EngineError> {
    Ok(serde_json::from_str(json)?)
}

/// Register every entry in order.
///
/// Malformed entries are logged and skipped; any other history error stops
/// the replay.
///
/// # Errors
///
/// Returns [`EngineError::Clock`] if the clock cannot advance, or
/// [`EngineError::History`] if the manager refuses an entry for a reason
/// other than malformed content.
pub fn run(
    manager: &HistoricalEventManager,
    clock: &SimulationClock,
    entries: Vec<ReplayEntry>,
) -> Result<ReplayStats, EngineError> {
    let mut stats = ReplayStats::default();
    for (position, entry) in entries.into_iter().enumerate() {
        for _ in 0..entry.advance_ticks {
            clock.advance()?;
        }
        match manager.register_new_event(entry.event) {
            Ok(Registration::Accepted { report, .. }) => {
                stats.accepted = stats.accepted.saturating_add(1);
                stats.listener_failures = stats
                    .listener_failures
                    .saturating_add(u64::try_from(report.failed).unwrap_or(u64::MAX));
            }
            Ok(Registration::Suppressed) => {
                stats.suppressed = stats.suppressed.saturating_add(1);
            }
            Err(HistoryError::MalformedEvent { field }) => {
                warn!(position, field, "Skipping malformed replay entry");
                stats.rejected = stats.rejected.saturating_add(1);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(stats)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Arc;

    use annals_types::EventType;

    use super::*;

    const SAMPLE: &str = r#"[
        { "event_type": "medical_starts", "source": "Medical", "cause": "Cold",
          "description": "Caught a cold", "actor": "Jane Doe" },
        { "event_type": "medical_starts", "source": "Medical", "cause": "Cold",
          "description": "Caught a cold", "actor": "Jane Doe" },
        { "advance_ticks": 3, "event_type": "medical_cured", "source": "Medical",
          "cause": "Cold", "description": "Recovered from a cold", "actor": "Jane Doe" },
        { "event_type": "task_finish", "source": "Task", "cause": "",
          "description": "", "actor": "John Doe" }
    ]"#;

    #[test]
    fn parses_entries_with_optional_advance() {
        let entries = parse(SAMPLE).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].advance_ticks, 0);
        assert_eq!(entries[2].advance_ticks, 3);
        assert_eq!(entries[2].event.event_type, EventType::MedicalCured);
        assert_eq!(entries[0].event.primary_entity, None);
    }

    #[test]
    fn rejects_non_array_input() {
        assert!(matches!(parse("{}"), Err(EngineError::Json { .. })));
    }

    #[test]
    fn replay_counts_each_outcome() {
        let clock = Arc::new(SimulationClock::new());
        let manager = HistoricalEventManager::new(clock.clone(), NonZeroUsize::new(10).unwrap());

        let stats = run(&manager, &clock, parse(SAMPLE).unwrap()).unwrap();
        assert_eq!(
            stats,
            ReplayStats {
                accepted: 2,
                suppressed: 1,
                rejected: 1,
                listener_failures: 0,
            }
        );
        assert_eq!(clock.tick(), 3);

        let ticks: Vec<u64> = manager.events().iter().map(|e| e.tick).collect();
        assert_eq!(ticks, [0, 3]);
    }
}
