//! # Fibonacci Backoff
//!
//! Progressive retry delay for platform passes that fail fatally (an invalid
//! configuration, a BOM that cannot be resolved, a status patch that keeps failing).
//!
//! Delays follow the Fibonacci sequence in minutes and are capped at a maximum:
//! 1m, 1m, 2m, 3m, 5m, 8m, 10m, 10m, ...
//!
//! Short convergence requeues (a component that is installed but not yet ready) do
//! not go through this backoff; they use the jittered delay of the pass outcome.
//!
//! ```rust
//! use platform_operator::controller::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(1, 10);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! assert_eq!(backoff.next_backoff_seconds(), 120);
//! backoff.reset();
//! assert_eq!(backoff.next_backoff_seconds(), 60);
//! ```

use std::time::Duration;

/// Fibonacci delay calculator, tracked per platform resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    max_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
}

impl FibonacciBackoff {
    /// Create a backoff starting at `min_minutes` and capped at `max_minutes`
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        let min_minutes = min_minutes.max(1);
        Self {
            min_minutes,
            max_minutes: max_minutes.max(min_minutes),
            prev_minutes: 0,
            current_minutes: min_minutes,
        }
    }

    /// Current delay in seconds; advances the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let seconds = self.current_minutes * 60;
        let next = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next.min(self.max_minutes);
        seconds
    }

    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_secs(self.next_backoff_seconds())
    }

    /// Restart the sequence after a successful pass
    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}
