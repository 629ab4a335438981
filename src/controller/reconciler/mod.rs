//! # Reconciler
//!
//! Reconciliation of the `Platform` resource.
//!
//! ## Reconciliation Flow
//!
//! 1. Snapshot component readiness from the current status
//! 2. Drive each component one lifecycle step, in registry order
//! 3. Record components, conditions and the installed version in the status
//! 4. Requeue: periodic when converged, jittered while converging, backoff on fatal errors

pub mod outcome;
pub mod pass;
pub mod reconcile;
pub mod status;
pub mod types;

pub use outcome::{jittered_delay, ReconcileOutcome};
pub use pass::{run_pass, PassReport};
pub use reconcile::reconcile;
pub use status::{build_status, upsert_condition};
pub use types::{BackoffState, Reconciler, ReconcilerError, TriggerSource};
