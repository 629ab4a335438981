//! # Initialization
//!
//! Operator start-up: rustls, tracing, metrics, the probe server, the Kubernetes
//! client, the reconciler, and a first pass over the platforms that already exist.

use crate::config::{create_shared_config, SharedControllerConfig, SharedServerConfig};
use crate::controller::reconciler::{reconcile, Reconciler, TriggerSource};
use crate::controller::server::{start_server, ServerState};
use crate::crd::Platform;
use crate::observability;
use anyhow::{Context, Result};
use kube::{api::Api, api::ListParams, Client};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn, Instrument};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    /// API for the Platform CRD across all namespaces
    pub platforms: Api<Platform>,
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    pub controller_config: SharedControllerConfig,
    pub server_config: SharedServerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("reconciler", &self.reconciler)
            .field("server_ready", &self.server_state.is_ready.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Initialize the operator runtime
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before any rustls connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "platform_operator=info".into()),
        )
        .init();

    info!("Starting Platform Operator");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::new());
    let (controller_config, server_config) = create_shared_config();

    let server_port = server_config.read().await.metrics_port;
    let server_state_for_server = Arc::clone(&server_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_for_server).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &server_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    let platforms: Api<Platform> = Api::all(client.clone());

    let reconciler = {
        let config = controller_config.read().await;
        Arc::new(Reconciler::new(client.clone(), &config)?)
    };

    reconcile_existing_resources(&platforms, &reconciler).await;

    info!("Operator initialized, starting watch loop...");
    Ok(InitializationResult {
        client,
        platforms,
        reconciler,
        server_state,
        controller_config,
        server_config,
    })
}

/// Wait until the probe server has bound its listener
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    server_config: &SharedServerConfig,
) -> Result<()> {
    let (startup_timeout, poll_interval) = {
        let config = server_config.read().await;
        (
            Duration::from_secs(config.startup_timeout_secs),
            Duration::from_millis(config.poll_interval_ms),
        )
    };
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }
        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }
        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Reconcile the platforms that existed before the operator started
///
/// A failure to list (usually a missing CRD) is logged and the watch loop retries.
async fn reconcile_existing_resources(platforms: &Api<Platform>, reconciler: &Arc<Reconciler>) {
    let span = tracing::info_span!(
        "controller.startup.reconcile_existing",
        operation = "reconcile_existing_resources"
    );
    async {
        let list = match platforms.list(&ListParams::default()).await {
            Ok(list) => list,
            Err(e) => {
                error!("CRD is not queryable; {:?}. Is the CRD installed?", e);
                error!("Installation: cargo run --bin crdgen | kubectl apply -f -");
                warn!("Continuing despite CRD queryability check failure - operator will retry");
                return;
            }
        };

        if list.items.is_empty() {
            info!("No existing Platform resources found, watch will pick up new resources");
            return;
        }

        let mut by_namespace: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for item in &list.items {
            by_namespace
                .entry(item.metadata.namespace.as_deref().unwrap_or("default"))
                .or_default()
                .push(item.metadata.name.as_deref().unwrap_or("unknown"));
        }
        info!("Platform Operator - Startup Resource Summary");
        info!("Total Resources: {}", list.items.len());
        for (namespace, names) in &by_namespace {
            info!("Namespace: {} ({} resources): {}", namespace, names.len(), names.join(", "));
        }

        for item in &list.items {
            let name = item.metadata.name.as_deref().unwrap_or("unknown");
            let namespace = item.metadata.namespace.as_deref().unwrap_or("default");
            if item.spec.suspend {
                info!("Skipping suspended platform {}/{}", namespace, name);
                continue;
            }
            let resource_span = tracing::info_span!(
                "controller.startup.reconcile_resource",
                resource.name = name,
                resource.namespace = namespace
            );
            match reconcile(Arc::new(item.clone()), Arc::clone(reconciler), TriggerSource::Startup)
                .instrument(resource_span)
                .await
            {
                Ok(_) => info!("Reconciled existing platform {}/{}", namespace, name),
                Err(e) => error!(
                    "Failed to reconcile existing platform {}/{}: {}",
                    namespace, name, e
                ),
            }
        }
        info!("Completed reconciliation of {} existing resources", list.items.len());
    }
    .instrument(span)
    .await;
}
