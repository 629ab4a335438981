//! # Reconciliation Logic
//!
//! Entry point the watch loop calls for one `Platform` resource: run a pass, write
//! the status, and turn the outcome into a controller action.

use super::outcome::ReconcileOutcome;
use super::pass::run_pass;
use super::status::{build_status, update_status};
use super::types::{Reconciler, ReconcilerError, TriggerSource};
use crate::constants::RECONCILE_ANNOTATION;
use crate::crd::{LogLevel, Platform};
use crate::observability::metrics;
use kube::api::{Api, Patch, PatchParams};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Reconcile one platform resource
///
/// Fatal pass errors are returned so the error policy applies the Fibonacci backoff.
pub async fn reconcile(
    platform: Arc<Platform>,
    reconciler: Arc<Reconciler>,
    trigger_source: TriggerSource,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    let name = platform.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = platform.metadata.namespace.as_deref().unwrap_or("default");
    let generation = platform.metadata.generation.unwrap_or(0);
    let verbose = platform
        .logging()
        .reconciliation
        .should_log(&LogLevel::Info);

    if verbose {
        info!(
            "Reconciling Platform: {}/{} (generation: {}, trigger source: {})",
            namespace,
            name,
            generation,
            trigger_source.as_str()
        );
    }
    metrics::increment_reconciliations();

    if trigger_source == TriggerSource::ManualAnnotation {
        clear_reconcile_annotation(&reconciler, namespace, name).await;
    }

    let ctx = reconciler.context_for(Arc::clone(&platform));
    let report = run_pass(&reconciler.registry, &ctx, generation, reconciler.requeue_bounds).await;

    let status = build_status(&platform, &report);
    let update = update_status(&reconciler, &platform, &status).await;

    metrics::set_components_ready(i64::try_from(report.ready_count).unwrap_or(i64::MAX));
    metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    if let Err(e) = update {
        error!("Failed to update status for {}/{}: {}", namespace, name, e);
        return Err(ReconcilerError::Kube(e));
    }

    match report.outcome {
        ReconcileOutcome::Complete => {
            if verbose {
                info!(
                    "Platform {}/{} reconciled: {} components ready, next reconcile in {}s",
                    namespace,
                    name,
                    report.ready_count,
                    reconciler.reconcile_interval.as_secs()
                );
            }
            metrics::increment_requeues_total("periodic");
            Ok(Action::requeue(reconciler.reconcile_interval))
        }
        ReconcileOutcome::Retryable(delay) => {
            if verbose {
                info!(
                    "Platform {}/{} still converging ({} components ready), requeue in {}ms",
                    namespace,
                    name,
                    report.ready_count,
                    delay.as_millis()
                );
            }
            metrics::increment_requeues_total("convergence");
            Ok(Action::requeue(delay))
        }
        ReconcileOutcome::Fatal(cause) => {
            error!("Reconciliation of {}/{} failed: {}", namespace, name, cause);
            Err(ReconcilerError::Fatal(cause))
        }
    }
}

/// Remove the manual trigger so later status events are filtered again
async fn clear_reconcile_annotation(reconciler: &Reconciler, namespace: &str, name: &str) {
    let api: Api<Platform> = Api::namespaced(reconciler.client.clone(), namespace);
    let mut annotations = serde_json::Map::new();
    annotations.insert(RECONCILE_ANNOTATION.to_string(), serde_json::Value::Null);
    let patch = serde_json::json!({ "metadata": { "annotations": annotations } });
    if let Err(e) = api
        .patch(name, &PatchParams::default(), &Patch::Merge(patch))
        .await
    {
        warn!(
            "Failed to clear reconcile annotation on {}/{}: {}",
            namespace, name, e
        );
    }
}
