//! Error types for the replay binary.

/// Top-level error for the replay binary.
///
/// Each variant wraps a specific subsystem error so `main` can propagate
/// everything with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: annals_core::ConfigError,
    },

    /// The history manager refused an operation.
    #[error("history error: {source}")]
    History {
        /// The underlying history error.
        #[from]
        source: annals_core::HistoryError,
    },

    /// Advancing the simulation clock failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: annals_core::ClockError,
    },

    /// The replay file could not be read.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The replay file is not a valid JSON array of entries.
    #[error("replay parse error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },
}
