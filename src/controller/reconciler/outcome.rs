//! # Reconcile Outcome
//!
//! What a pass asks of the controller: nothing until the periodic reconcile, a short
//! jittered requeue while components converge, or the error backoff.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Every enabled component converged
    Complete,
    /// Something is still converging or hit a transient error
    Retryable(Duration),
    /// Configuration error; routed through the Fibonacci error policy
    Fatal(String),
}

impl ReconcileOutcome {
    /// `Retryable` with a delay drawn uniformly from `bounds`
    pub fn retry_within(bounds: (Duration, Duration)) -> Self {
        ReconcileOutcome::Retryable(jittered_delay(bounds.0, bounds.1))
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ReconcileOutcome::Complete)
    }
}

/// Uniform delay in `[min, max]` at millisecond granularity
pub fn jittered_delay(min: Duration, max: Duration) -> Duration {
    let min_ms = u64::try_from(min.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}
