//! Replay binary for the Annals simulation history.
//!
//! Wires the configuration, structured logging and the historical event
//! manager together, then replays a JSON file of event drafts through it.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `annals-config.yaml`
//! 3. Create the simulation clock and the manager
//! 4. Attach the logging, statistics and broadcast listeners
//! 5. Replay the file named on the command line
//! 6. Log the replay outcome and the per-category tally
//!
//! # Usage
//!
//! ```text
//! annals-engine <replay.json>
//! ```

mod error;
mod replay;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use annals_core::{
    BroadcastListener, EventListener, EventTally, HistoricalEventManager, HistoryConfig,
    HistoryNotification, SimulationClock, TracingListener,
};
use annals_types::EventCategory;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, looked up in the working directory.
const CONFIG_PATH: &str = "annals-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the replay file or the history
/// manager fails.
#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("annals-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        match_range = config.match_range,
        capacity = ?config.capacity,
        log_events = config.log_events,
        broadcast_capacity = config.broadcast_capacity,
        "Configuration loaded"
    );

    // 3. Clock and manager.
    let clock = Arc::new(SimulationClock::new());
    let manager = HistoricalEventManager::from_config(clock.clone(), &config)?;

    // 4. Listeners. The manager holds them weakly, so they live here.
    let tracing_listener: Option<Arc<dyn EventListener>> = config
        .log_events
        .then(|| Arc::new(TracingListener) as Arc<dyn EventListener>);
    if let Some(listener) = &tracing_listener {
        manager.add_listener(listener);
    }

    let tally = Arc::new(EventTally::new());
    let tally_listener: Arc<dyn EventListener> = tally.clone();
    manager.add_listener(&tally_listener);

    let broadcast = Arc::new(BroadcastListener::new(config.broadcast_capacity));
    let mut rx = broadcast.subscribe();
    let broadcast_listener: Arc<dyn EventListener> = broadcast.clone();
    let broadcast_id = manager.add_listener(&broadcast_listener);

    let watcher = tokio::spawn(async move {
        let mut seen = 0u64;
        loop {
            match rx.recv().await {
                Ok(HistoryNotification::Added { index, event }) => {
                    debug!(index, sequence = event.sequence, "Watcher saw addition");
                    seen = seen.saturating_add(1);
                }
                Ok(HistoryNotification::Removed { start, end }) => {
                    debug!(start, end, "Watcher saw removal");
                    seen = seen.saturating_add(1);
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Watcher fell behind the history");
                }
                Err(RecvError::Closed) => break,
            }
        }
        seen
    });

    info!(listeners = manager.listener_count(), "History manager ready");

    // 5. Replay.
    let Some(path) = replay_path() else {
        warn!("No replay file given; usage: annals-engine <replay.json>");
        return Ok(());
    };
    let entries = replay::load(&path)?;
    info!(path = %path.display(), entries = entries.len(), "Replaying events");
    let stats = replay::run(&manager, &clock, entries)?;

    // Dropping the last sender closes the channel and ends the watcher.
    manager.remove_listener(broadcast_id);
    drop(broadcast_listener);
    drop(broadcast);
    let seen = watcher.await?;

    // 6. Report.
    info!(
        accepted = stats.accepted,
        suppressed = stats.suppressed,
        rejected = stats.rejected,
        listener_failures = stats.listener_failures,
        stored = manager.len(),
        tick = clock.tick(),
        broadcast_seen = seen,
        "Replay complete"
    );
    let summary = tally.summary();
    for category in EventCategory::ALL {
        let count = summary.by_category.get(&category).copied().unwrap_or(0);
        info!(category = %category, count, "Category tally");
    }
    info!(total = summary.total, "Tally complete");

    Ok(())
}

/// Load configuration from `annals-config.yaml`, falling back to defaults
/// when the file is absent.
fn load_config() -> Result<HistoryConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        let config = HistoryConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!("Config file not found, using defaults");
        Ok(HistoryConfig::default())
    }
}

/// The replay file named by the first command-line argument.
fn replay_path() -> Option<PathBuf> {
    std::env::args_os().nth(1).map(PathBuf::from)
}
