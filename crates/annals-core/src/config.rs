//! Configuration loading for the historical event manager.
//!
//! The configuration lives in `annals-config.yaml`. Every field has a
//! default, so an empty document (or no file at all) yields a working
//! manager.
//!
//! ```yaml
//! match_range: 10        # recent-duplicate window size
//! capacity: 5000         # optional bound on stored events
//! log_events: true       # attach the tracing listener
//! broadcast_capacity: 256
//! ```

use std::num::NonZeroUsize;
use std::path::Path;

use serde::Deserialize;

/// Default size of the recent-duplicate window.
pub const DEFAULT_MATCH_RANGE: usize = 10;

/// Default channel size for the async broadcast bridge.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 256;

/// Largest accepted channel size for the async broadcast bridge. The
/// channel allocates every slot up front.
pub const MAX_BROADCAST_CAPACITY: usize = 4096;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is syntactically valid but not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Settings for a [`HistoricalEventManager`](crate::HistoricalEventManager).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryConfig {
    /// Number of most recent accepted events a new event is compared
    /// against for duplicate suppression. Fixed for the manager's lifetime.
    #[serde(default = "default_match_range")]
    pub match_range: usize,

    /// Maximum number of events kept in the history. `None` keeps
    /// everything; otherwise the oldest events are evicted (and reported
    /// as removed) once the bound is exceeded.
    #[serde(default)]
    pub capacity: Option<usize>,

    /// Whether the engine attaches a logging listener.
    #[serde(default = "default_true")]
    pub log_events: bool,

    /// Channel size for the async broadcast listener.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            match_range: default_match_range(),
            capacity: None,
            log_events: true,
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl HistoryConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // An empty document deserializes as unit, not as an empty map.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `match_range`, `capacity` or
    /// `broadcast_capacity` is zero, or if `broadcast_capacity` exceeds
    /// [`MAX_BROADCAST_CAPACITY`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.match_range_nonzero()?;
        self.capacity_nonzero()?;
        if !(1..=MAX_BROADCAST_CAPACITY).contains(&self.broadcast_capacity) {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "broadcast_capacity must be between 1 and {MAX_BROADCAST_CAPACITY}, got {}",
                    self.broadcast_capacity
                ),
            });
        }
        Ok(())
    }

    /// The match range as a [`NonZeroUsize`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `match_range` is zero.
    pub fn match_range_nonzero(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.match_range).ok_or_else(|| ConfigError::Invalid {
            reason: "match_range must be at least 1".to_owned(),
        })
    }

    /// The capacity as a [`NonZeroUsize`], if one is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `capacity` is `Some(0)`.
    pub fn capacity_nonzero(&self) -> Result<Option<NonZeroUsize>, ConfigError> {
        self.capacity
            .map(|cap| {
                NonZeroUsize::new(cap).ok_or_else(|| ConfigError::Invalid {
                    reason: "capacity must be at least 1 when set".to_owned(),
                })
            })
            .transpose()
    }
}

const fn default_match_range() -> usize {
    DEFAULT_MATCH_RANGE
}

const fn default_broadcast_capacity() -> usize {
    DEFAULT_BROADCAST_CAPACITY
}

const fn default_true() -> bool {
    true
}
