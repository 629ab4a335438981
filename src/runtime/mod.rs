//! # Runtime
//!
//! Start-up and the controller watch loop.
//!
//! - `initialization`: rustls, tracing, metrics, server and reconciler setup
//! - `watch_loop`: the `Controller` run loop with restart on stream end
//! - `error_policy`: Fibonacci backoff and watch error classification

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
