//! # Types
//!
//! Core types for the reconciler.

use crate::bom::{Bom, ImageEnv};
use crate::cluster::{ClusterOps, KubeCluster};
use crate::component::{ComponentContext, ComponentError, ComponentSettings};
use crate::config::ControllerConfig;
use crate::constants::{DEFAULT_ERROR_BACKOFF_MAX_MINUTES, DEFAULT_ERROR_BACKOFF_MIN_MINUTES};
use crate::controller::backoff::FibonacciBackoff;
use crate::crd::Platform;
use crate::helm::{ChartBackend, HelmCli};
use crate::registry::Registry;
use anyhow::{Context, Result};
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("Reconciliation failed: {0}")]
    ReconciliationFailed(#[from] anyhow::Error),
    #[error("Reconciliation failed: {0}")]
    Component(#[from] ComponentError),
    #[error("Reconciliation failed: {0}")]
    Fatal(String),
    #[error("Failed to update platform status: {0}")]
    Kube(#[from] kube::Error),
}

/// Why a reconcile pass was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// Reconcile annotation set on the platform resource
    ManualAnnotation,
    /// Periodic reconcile after `RECONCILE_INTERVAL_SECS`
    TimerBased,
    /// Spec change (generation bump) or a first observation
    ResourceChange,
    /// Requeue while components converge
    Convergence,
    /// Startup pass over the resources that already exist
    Startup,
}

impl TriggerSource {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::ManualAnnotation => "manual-annotation",
            TriggerSource::TimerBased => "timer-based",
            TriggerSource::ResourceChange => "resource-change",
            TriggerSource::Convergence => "convergence",
            TriggerSource::Startup => "startup",
        }
    }
}

/// Error backoff for one platform resource
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    pub fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(
                DEFAULT_ERROR_BACKOFF_MIN_MINUTES,
                DEFAULT_ERROR_BACKOFF_MAX_MINUTES,
            ),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct Reconciler {
    pub client: Client,
    pub bom: Arc<Bom>,
    pub registry: Registry,
    pub image_env: ImageEnv,
    pub settings: ComponentSettings,
    pub charts: Arc<dyn ChartBackend>,
    pub cluster: Arc<dyn ClusterOps>,
    /// Jittered requeue bounds while components converge
    pub requeue_bounds: (Duration, Duration),
    /// Requeue after a pass that converged
    pub reconcile_interval: Duration,
    /// Backoff state per resource (identified by namespace/name)
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("bom_version", &self.bom.version())
            .field("registry", &self.registry)
            .field("image_env", &self.image_env)
            .field("requeue_bounds", &self.requeue_bounds)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Load the BOM and wire the helm and Kubernetes backends
    ///
    /// A missing or invalid BOM is fatal.
    pub fn new(client: Client, config: &ControllerConfig) -> Result<Self> {
        let bom = Bom::load(&config.bom_path)
            .with_context(|| format!("Failed to load BOM from {}", config.bom_path.display()))?;
        info!(
            "Loaded BOM version {} from {} ({} components)",
            bom.version(),
            config.bom_path.display(),
            bom.components().len()
        );

        let charts: Arc<dyn ChartBackend> = Arc::new(HelmCli::from_config(config));
        let cluster: Arc<dyn ClusterOps> = Arc::new(KubeCluster::new(client.clone()));
        Ok(Self::with_backends(
            client,
            Arc::new(bom),
            Registry::platform_default(),
            charts,
            cluster,
            config,
        ))
    }

    pub fn with_backends(
        client: Client,
        bom: Arc<Bom>,
        registry: Registry,
        charts: Arc<dyn ChartBackend>,
        cluster: Arc<dyn ClusterOps>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            client,
            bom,
            registry,
            image_env: config.image_env(),
            settings: ComponentSettings::from_config(config),
            charts,
            cluster,
            requeue_bounds: config.requeue_bounds(),
            reconcile_interval: config.reconcile_interval_duration(),
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Context for one pass over `platform`
    pub fn context_for(&self, platform: Arc<Platform>) -> ComponentContext {
        ComponentContext::new(
            platform,
            Arc::clone(&self.bom),
            self.image_env.clone(),
            Arc::clone(&self.charts),
            Arc::clone(&self.cluster),
            self.settings.clone(),
        )
    }

    /// Clear the error backoff of a resource after a successful pass
    pub fn reset_backoff(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(resource_key) {
                state.reset();
            }
        }
    }
}
