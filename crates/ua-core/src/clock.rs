//! Elapsed-time tracking toward the next flush.

use std::time::Duration;

/// Counts elapsed sample intervals and reports when a flush is due.
///
/// Every tick advances the clock, whether or not anything was recorded.
#[derive(Debug, Clone)]
pub struct FlushClock {
    flush_interval: Duration,
    elapsed: Duration,
}

impl FlushClock {
    #[must_use]
    pub const fn new(flush_interval: Duration) -> Self {
        Self {
            flush_interval,
            elapsed: Duration::ZERO,
        }
    }

    /// Adds `step` to the elapsed time.
    ///
    /// Returns true (and resets the elapsed time to zero) once the elapsed time
    /// reaches or exceeds the flush interval.
    pub fn advance(&mut self, step: Duration) -> bool {
        self.elapsed = self.elapsed.saturating_add(step);
        if self.elapsed >= self.flush_interval {
            self.elapsed = Duration::ZERO;
            return true;
        }
        false
    }

    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
