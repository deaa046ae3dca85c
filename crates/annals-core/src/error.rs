//! Error types for the annals-core crate.
//!
//! Every mutation of the history either fully succeeds or returns one of
//! these errors with the history left untouched. Listener failures are not
//! errors of the caller: they are isolated and logged during dispatch.

use crate::clock::ClockError;
use crate::config::ConfigError;

/// Errors that can occur while recording or pruning historical events.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The event is missing a required field and was not stored.
    #[error("malformed event: {field} must not be blank")]
    MalformedEvent {
        /// Name of the blank field.
        field: &'static str,
    },

    /// A removal range falls outside the current history.
    #[error("removal range [{start}, {end}] out of bounds for history of length {len}")]
    RangeOutOfBounds {
        /// First index of the requested range.
        start: usize,
        /// Last index (inclusive) of the requested range.
        end: usize,
        /// Length of the history at the time of the request.
        len: usize,
    },

    /// A removal range whose start lies after its end.
    #[error("invalid removal range: start {start} is after end {end}")]
    InvalidRange {
        /// First index of the requested range.
        start: usize,
        /// Last index (inclusive) of the requested range.
        end: usize,
    },

    /// The sequence source returned a value that does not follow the last
    /// accepted event.
    #[error("sequence {next} does not follow previous sequence {previous}")]
    NonMonotonicSequence {
        /// Sequence of the newest stored event.
        previous: u64,
        /// Sequence the source produced.
        next: u64,
    },

    /// A registration or prune was issued from inside a listener callback
    /// on the thread that is currently dispatching.
    #[error("history cannot be mutated from inside one of its own listener callbacks")]
    ReentrantMutation,

    /// The sequence source failed.
    #[error("sequence source error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// Manager construction parameters are invalid.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// An internal error that should not occur in normal operation.
    #[error("internal history error: {0}")]
    InternalError(&'static str),
}
