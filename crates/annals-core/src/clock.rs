//! Ordering sources for the event history.
//!
//! The manager does not interpret simulated time. It asks a
//! [`SequenceSource`] for a [`Stamp`] each time it accepts an event and only
//! relies on the sequence being strictly increasing. The simulation
//! scheduler supplies the source at construction time.
//!
//! Two sources are provided:
//!
//! - [`AtomicSequence`] -- a bare monotonic counter, tick always 0.
//! - [`SimulationClock`] -- a counter paired with a tick that the
//!   scheduler advances, so every record also carries the tick it was
//!   accepted in.

use std::sync::atomic::{AtomicU64, Ordering};

/// Errors that can occur when drawing the next ordering value.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Sequence counter would overflow.
    #[error("sequence counter overflow: cannot advance beyond u64::MAX")]
    SequenceOverflow,

    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Ordering information stamped on an accepted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stamp {
    /// Strictly increasing ordering value.
    pub sequence: u64,
    /// Simulation tick at the time the stamp was drawn.
    pub tick: u64,
}

/// Supplier of monotonic ordering values.
///
/// Implementations must return strictly increasing `sequence` values for
/// the lifetime of a manager. The manager checks this and refuses events
/// whose stamp does not follow the previous one.
pub trait SequenceSource: Send + Sync {
    /// Draw the next ordering value.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError`] if the source cannot produce another value.
    fn next_stamp(&self) -> Result<Stamp, ClockError>;
}

/// Advance an atomic counter by one, refusing to wrap.
fn increment(counter: &AtomicU64) -> Option<u64> {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |value| {
            value.checked_add(1)
        })
        .ok()
        .and_then(|previous| previous.checked_add(1))
}

// ---------------------------------------------------------------------------
// AtomicSequence
// ---------------------------------------------------------------------------

/// Lock-free monotonic counter. The first stamp has sequence 1.
#[derive(Debug, Default)]
pub struct AtomicSequence {
    /// Last value handed out.
    last: AtomicU64,
}

impl AtomicSequence {
    /// Create a counter whose first stamp has sequence 1.
    pub const fn new() -> Self {
        Self::starting_after(0)
    }

    /// Create a counter that resumes after `last` (useful for tests and
    /// state restoration).
    pub const fn starting_after(last: u64) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Return the last value handed out (0 if none).
    pub fn last(&self) -> u64 {
        self.last.load(Ordering::SeqCst)
    }
}

impl SequenceSource for AtomicSequence {
    fn next_stamp(&self) -> Result<Stamp, ClockError> {
        let sequence = increment(&self.last).ok_or(ClockError::SequenceOverflow)?;
        Ok(Stamp { sequence, tick: 0 })
    }
}

// ---------------------------------------------------------------------------
// SimulationClock
// ---------------------------------------------------------------------------

/// Tick counter plus ordering counter, shared between the scheduler and
/// the history.
///
/// The scheduler calls [`advance`](Self::advance) once per tick; the
/// history draws stamps concurrently. Many events may share a tick, but
/// never a sequence.
#[derive(Debug, Default)]
pub struct SimulationClock {
    /// Current tick number.
    tick: AtomicU64,
    /// Last sequence handed out.
    sequence: AtomicU64,
}

impl SimulationClock {
    /// Create a clock at tick 0 with no sequence handed out yet.
    pub const fn new() -> Self {
        Self::from_parts(0, 0)
    }

    /// Create a clock from explicit state (useful for tests and state
    /// restoration).
    pub const fn from_parts(tick: u64, last_sequence: u64) -> Self {
        Self {
            tick: AtomicU64::new(tick),
            sequence: AtomicU64::new(last_sequence),
        }
    }

    /// Advance the clock by one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick counter would exceed
    /// `u64::MAX`.
    pub fn advance(&self) -> Result<u64, ClockError> {
        increment(&self.tick).ok_or(ClockError::TickOverflow)
    }

    /// Return the current tick number.
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }
}

impl SequenceSource for SimulationClock {
    fn next_stamp(&self) -> Result<Stamp, ClockError> {
        let sequence = increment(&self.sequence).ok_or(ClockError::SequenceOverflow)?;
        Ok(Stamp {
            sequence,
            tick: self.tick(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn atomic_sequence_starts_at_one() {
        let source = AtomicSequence::new();
        assert_eq!(source.last(), 0);
        assert_eq!(source.next_stamp().unwrap().sequence, 1);
        assert_eq!(source.next_stamp().unwrap().sequence, 2);
        assert_eq!(source.last(), 2);
    }

    #[test]
    fn atomic_sequence_refuses_to_wrap() {
        let source = AtomicSequence::starting_after(u64::MAX);
        assert!(matches!(
            source.next_stamp(),
            Err(ClockError::SequenceOverflow)
        ));
        // The counter is untouched by the failed draw.
        assert_eq!(source.last(), u64::MAX);
    }

    #[test]
    fn simulation_clock_stamps_current_tick() {
        let clock = SimulationClock::new();
        let first = clock.next_stamp().unwrap();
        assert_eq!(first, Stamp { sequence: 1, tick: 0 });

        clock.advance().unwrap();
        clock.advance().unwrap();
        let second = clock.next_stamp().unwrap();
        let third = clock.next_stamp().unwrap();
        assert_eq!(second, Stamp { sequence: 2, tick: 2 });
        assert_eq!(third, Stamp { sequence: 3, tick: 2 });
    }

    #[test]
    fn simulation_clock_tick_overflow() {
        let clock = SimulationClock::from_parts(u64::MAX, 0);
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
        assert_eq!(clock.tick(), u64::MAX);
    }

    #[test]
    fn concurrent_draws_are_unique() {
        let clock = std::sync::Arc::new(SimulationClock::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let clock = std::sync::Arc::clone(&clock);
                std::thread::spawn(move || {
                    (0..250)
                        .map(|_| clock.next_stamp().unwrap().sequence)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
    }
}
