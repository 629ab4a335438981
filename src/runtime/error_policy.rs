//! # Error Policy
//!
//! Error handling and backoff for the controller watch loop: fatal reconcile errors
//! go through the per-resource Fibonacci backoff, watch stream errors are classified
//! and either restart the stream or are passed through.

use crate::controller::reconciler::{BackoffState, Reconciler, ReconcilerError};
use crate::crd::Platform;
use crate::observability;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Instrument};

/// Requeue a failed resource after its next Fibonacci delay
pub fn handle_reconciliation_error(
    obj: Arc<Platform>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let name = obj.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = obj.metadata.namespace.as_deref().unwrap_or("default");

    let error_span = tracing::error_span!(
        "controller.watch.reconciliation_error",
        resource.name = name,
        resource.namespace = namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {:?}", name, error);
    observability::metrics::increment_reconciliation_errors();

    let resource_key = format!("{namespace}/{name}");
    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(resource_key).or_insert_with(BackoffState::new);
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using default backoff", e);
            (60, 0)
        }
    };

    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::seconds(i64::try_from(backoff_seconds).unwrap_or(i64::MAX));
    info!(
        "Retrying with Fibonacci backoff: {}s (error count: {}), next retry at {}",
        backoff_seconds,
        error_count,
        next_trigger_time.to_rfc3339()
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Classes of watch stream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    /// RBAC revoked or token expired
    Unauthorized,
    /// Resource version expired, normal during API server restarts
    Expired,
    /// API server storage reinitializing or throttling
    TooManyRequests,
    /// Deleted resource or missing CRD
    NotFound,
    Other,
}

impl WatchErrorKind {
    /// Classify an error message; not-found wins over 401 since a plain-text 404
    /// body surfaces as a `WatchFailed` error that may mention other codes
    pub fn classify(error: &str) -> Self {
        let not_found =
            error.contains("ObjectNotFound") || error.contains("404") || error.contains("not found");
        if (error.contains("401") || error.contains("Unauthorized")) && !not_found {
            WatchErrorKind::Unauthorized
        } else if error.contains("410")
            || error.contains("too old resource version")
            || error.contains("Expired")
            || error.contains("Gone")
        {
            WatchErrorKind::Expired
        } else if error.contains("429")
            || error.contains("storage is (re)initializing")
            || error.contains("TooManyRequests")
        {
            WatchErrorKind::TooManyRequests
        } else if not_found {
            WatchErrorKind::NotFound
        } else {
            WatchErrorKind::Other
        }
    }
}

/// Handle one watch stream error
///
/// Returns `None` to drop the error and let the stream restart, `Some(())` to continue.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay_secs: u64,
) -> Option<()> {
    let error_span = tracing::warn_span!("controller.watch.error", error = %error_string);
    handle_classified(
        WatchErrorKind::classify(error_string),
        error_string,
        backoff,
        max_backoff_ms,
        watch_restart_delay_secs,
    )
    .instrument(error_span)
    .await
}

async fn handle_classified(
    kind: WatchErrorKind,
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay_secs: u64,
) -> Option<()> {
    match kind {
        WatchErrorKind::Unauthorized => {
            error!("Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired");
            error!("SRE Diagnostics:");
            error!("   1. Verify ClusterRole 'platform-operator' still exists:");
            error!("      kubectl get clusterrole platform-operator");
            error!("   2. Verify ClusterRoleBinding still binds ServiceAccount:");
            error!("      kubectl get clusterrolebinding platform-operator -o yaml");
            error!("   3. Verify RBAC permissions are still active:");
            error!(
                "      kubectl auth can-i list platforms.install.platform.octopilot.io --as=system:serviceaccount:verrazzano-install:platform-operator --all-namespaces"
            );
            error!("   4. If RBAC was recently changed, restart the operator pod:");
            error!("      kubectl delete pod -n verrazzano-install -l app=platform-operator");
            warn!(
                "Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                watch_restart_delay_secs
            );
            tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
            None
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired (410) - this is normal during pod restarts, watch will restart");
            None
        }
        WatchErrorKind::TooManyRequests => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms before restart...",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            backoff.store(
                current_backoff.saturating_mul(2).min(max_backoff_ms),
                Ordering::Relaxed,
            );
            None
        }
        WatchErrorKind::NotFound => {
            let resource_info = if error_string.contains("integer `404`") {
                "Platform CRD or resource may have been deleted (404 returned as plain text)"
            } else if error_string.contains("Platform") {
                "Platform resource"
            } else {
                "Resource"
            };
            warn!(
                "{} not found (404) - this may be normal if the resource was deleted or the CRD is missing. Error: {}",
                resource_info, error_string
            );
            Some(())
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(Duration::from_secs(watch_restart_delay_secs)).await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod classify_tests {
        use super::*;

        #[test]
        fn test_classify_status_codes() {
            assert_eq!(WatchErrorKind::classify("HTTP 401 Unauthorized"), WatchErrorKind::Unauthorized);
            assert_eq!(WatchErrorKind::classify("too old resource version: 123"), WatchErrorKind::Expired);
            assert_eq!(
                WatchErrorKind::classify("storage is (re)initializing"),
                WatchErrorKind::TooManyRequests
            );
            assert_eq!(WatchErrorKind::classify("ObjectNotFound"), WatchErrorKind::NotFound);
            assert_eq!(WatchErrorKind::classify("connection reset"), WatchErrorKind::Other);
        }

        #[test]
        fn test_not_found_wins_over_unauthorized() {
            assert_eq!(
                WatchErrorKind::classify("WatchFailed: invalid type: integer `404`, expected 401 body"),
                WatchErrorKind::NotFound
            );
        }
    }

    mod stream_error_tests {
        use super::*;

        #[tokio::test]
        async fn test_not_found_continues() {
            let backoff = Arc::new(AtomicU64::new(10));
            let result = handle_watch_stream_error("ObjectNotFound", &backoff, 100, 0).await;
            assert_eq!(result, Some(()));
        }

        #[tokio::test]
        async fn test_too_many_requests_doubles_backoff_up_to_max() {
            let backoff = Arc::new(AtomicU64::new(10));
            assert_eq!(handle_watch_stream_error("429", &backoff, 30, 0).await, None);
            assert_eq!(backoff.load(Ordering::Relaxed), 20);
            assert_eq!(handle_watch_stream_error("429", &backoff, 30, 0).await, None);
            assert_eq!(backoff.load(Ordering::Relaxed), 30);
        }
    }
}
