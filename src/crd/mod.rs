//! # Custom Resource Definitions
//!
//! CRD types for the platform operator.
//!
//! ## Module Structure
//!
//! - `spec.rs` - Platform specification, per-component settings and user overrides
//! - `status.rs` - Platform and per-component lifecycle status
//! - `logging.rs` - Per-area log levels

mod logging;
mod spec;
mod status;

pub use logging::{LogLevel, LoggingConfig};
pub use spec::{
    default_false, ComponentSpec, DnsConfig, LogBackend, Override, Platform, PlatformSpec,
    ValueRef,
};
pub use status::{ComponentState, ComponentStatus, Condition, ConditionType, PlatformStatus};
