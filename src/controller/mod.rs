//! # Controller
//!
//! Core controller modules for the platform operator.
//!
//! - `backoff`: Fibonacci backoff for fatal reconciliation errors
//! - `reconciler`: the reconcile pass and status updates
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod reconciler;
pub mod server;
