//! # Prelude
//!
//! Re-exports commonly used types and traits.
//!
//! ```rust
//! use platform_operator::prelude::*;
//! ```

pub use crate::crd::*;

pub use crate::bom::{Bom, BomError, ImageEnv};
pub use crate::catalog::{Catalog, CatalogError};

pub use crate::cluster::{ClusterError, ClusterOps, ReadinessObject};
pub use crate::helm::{ChartBackend, ChartRequest, HelmError, ReleaseStatus};

pub use crate::component::{Component, ComponentContext, ComponentError, HelmComponent};
pub use crate::overrides::{KeyValue, OverridePayload};
pub use crate::registry::Registry;

pub use crate::controller::reconciler::{
    reconcile, run_pass, BackoffState, PassReport, ReconcileOutcome, Reconciler,
    ReconcilerError, TriggerSource,
};

pub use crate::config::{ControllerConfig, ServerConfig};
