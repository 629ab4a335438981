//! # Status Updates
//!
//! Builds the platform status from a pass report and writes it back.

use super::outcome::ReconcileOutcome;
use super::pass::PassReport;
use super::types::Reconciler;
use crate::constants::FIELD_MANAGER;
use crate::crd::{Condition, ConditionType, Platform, PlatformStatus};
use kube::api::{Patch, PatchParams};
use kube::Api;
use tracing::debug;

pub const PHASE_READY: &str = "Ready";
pub const PHASE_RECONCILING: &str = "Reconciling";
pub const PHASE_FAILED: &str = "Failed";

/// Set the condition of `condition_type`, keeping one condition per type
///
/// The transition time only moves when the status value changes.
pub fn upsert_condition(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    let now = chrono::Utc::now().to_rfc3339();
    match conditions.iter_mut().find(|c| c.r#type == condition_type) {
        Some(existing) => {
            if existing.status != status {
                existing.status = status.to_string();
                existing.last_transition_time = Some(now);
            }
            existing.reason = Some(reason.to_string());
            existing.message = Some(message.to_string());
        }
        None => conditions.push(Condition {
            r#type: condition_type.to_string(),
            status: status.to_string(),
            last_transition_time: Some(now),
            reason: Some(reason.to_string()),
            message: Some(message.to_string()),
        }),
    }
}

/// Phase and description for a pass report
pub fn phase_for(report: &PassReport) -> (&'static str, String) {
    if let ReconcileOutcome::Fatal(cause) = &report.outcome {
        return (PHASE_FAILED, cause.clone());
    }
    if !report.rejections.is_empty() {
        return (PHASE_FAILED, report.rejections.join("; "));
    }
    match &report.outcome {
        ReconcileOutcome::Complete => (
            PHASE_READY,
            format!("{} components ready", report.ready_count),
        ),
        _ => (
            PHASE_RECONCILING,
            format!("{} components ready, waiting for the rest", report.ready_count),
        ),
    }
}

/// Status to write after a pass over `platform`
pub fn build_status(platform: &Platform, report: &PassReport) -> PlatformStatus {
    let (phase, description) = phase_for(report);
    let mut conditions = report.conditions.clone();
    let (ready_status, ready_reason) = match phase {
        PHASE_READY => ("True", "ReconciliationSucceeded"),
        PHASE_FAILED => ("False", "ReconciliationFailed"),
        _ => ("False", "ReconciliationInProgress"),
    };
    upsert_condition(
        &mut conditions,
        ConditionType::Ready.as_str(),
        ready_status,
        ready_reason,
        &description,
    );

    PlatformStatus {
        phase: Some(phase.to_string()),
        description: Some(description),
        conditions,
        version: report.version.clone(),
        observed_generation: platform.metadata.generation,
        last_reconcile_time: Some(chrono::Utc::now().to_rfc3339()),
        components: report.components.clone(),
    }
}

/// True when `next` differs from `current` in anything but the reconcile time
pub fn status_changed(current: Option<&PlatformStatus>, next: &PlatformStatus) -> bool {
    let Some(current) = current else {
        return true;
    };
    let mut comparable = next.clone();
    comparable.last_reconcile_time.clone_from(&current.last_reconcile_time);
    for condition in &mut comparable.conditions {
        if let Some(old) = current.conditions.iter().find(|c| c.r#type == condition.r#type) {
            condition.last_transition_time.clone_from(&old.last_transition_time);
        }
    }
    comparable != *current
}

/// Merge-patch the status subresource, skipping no-op writes
pub async fn update_status(
    reconciler: &Reconciler,
    platform: &Platform,
    status: &PlatformStatus,
) -> Result<(), kube::Error> {
    if !status_changed(platform.status.as_ref(), status) {
        debug!(
            "Skipping status update - status unchanged: phase={:?}",
            status.phase
        );
        return Ok(());
    }

    let api: Api<Platform> = Api::namespaced(
        reconciler.client.clone(),
        platform.metadata.namespace.as_deref().unwrap_or("default"),
    );
    let patch = serde_json::json!({ "status": status });
    api.patch_status(
        platform.metadata.name.as_deref().unwrap_or("unknown"),
        &PatchParams::apply(FIELD_MANAGER),
        &Patch::Merge(patch),
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn report(outcome: ReconcileOutcome) -> PassReport {
        PassReport {
            components: BTreeMap::new(),
            conditions: Vec::new(),
            version: None,
            outcome,
            rejections: Vec::new(),
            ready_count: 2,
        }
    }

    mod condition_tests {
        use super::*;

        #[test]
        fn test_upsert_keeps_one_condition_per_type() {
            let mut conditions = Vec::new();
            upsert_condition(&mut conditions, "InstallStarted", "True", "InstallStarted", "istio");
            upsert_condition(&mut conditions, "InstallStarted", "True", "InstallStarted", "keycloak");
            assert_eq!(conditions.len(), 1);
            assert_eq!(conditions[0].message.as_deref(), Some("keycloak"));
        }

        #[test]
        fn test_transition_time_moves_only_on_status_change() {
            let mut conditions = vec![Condition {
                r#type: "Ready".to_string(),
                status: "False".to_string(),
                last_transition_time: Some("2024-01-01T00:00:00+00:00".to_string()),
                reason: None,
                message: None,
            }];
            upsert_condition(&mut conditions, "Ready", "False", "ReconciliationInProgress", "x");
            assert_eq!(
                conditions[0].last_transition_time.as_deref(),
                Some("2024-01-01T00:00:00+00:00")
            );
            upsert_condition(&mut conditions, "Ready", "True", "ReconciliationSucceeded", "y");
            assert_ne!(
                conditions[0].last_transition_time.as_deref(),
                Some("2024-01-01T00:00:00+00:00")
            );
        }
    }

    mod phase_tests {
        use super::*;

        #[test]
        fn test_phase_from_outcome() {
            assert_eq!(phase_for(&report(ReconcileOutcome::Complete)).0, PHASE_READY);
            assert_eq!(
                phase_for(&report(ReconcileOutcome::Retryable(Duration::from_secs(3)))).0,
                PHASE_RECONCILING
            );
            let (phase, description) =
                phase_for(&report(ReconcileOutcome::Fatal("bad chart".to_string())));
            assert_eq!(phase, PHASE_FAILED);
            assert_eq!(description, "bad chart");
        }

        #[test]
        fn test_rejections_fail_the_phase() {
            let mut r = report(ReconcileOutcome::Complete);
            r.rejections.push("Disabling component istio is not allowed".to_string());
            let (phase, description) = phase_for(&r);
            assert_eq!(phase, PHASE_FAILED);
            assert_eq!(description, "Disabling component istio is not allowed");
        }

        #[test]
        fn test_build_status_sets_ready_condition() {
            let platform = Platform::new("platform", Default::default());
            let mut r = report(ReconcileOutcome::Complete);
            r.version = Some("1.1.0".to_string());
            let status = build_status(&platform, &r);
            assert_eq!(status.phase.as_deref(), Some(PHASE_READY));
            assert_eq!(status.version.as_deref(), Some("1.1.0"));
            let ready = status.conditions.iter().find(|c| c.r#type == "Ready").unwrap();
            assert_eq!(ready.status, "True");
            assert_eq!(ready.reason.as_deref(), Some("ReconciliationSucceeded"));
        }

        #[test]
        fn test_status_changed_ignores_timestamps() {
            let platform = Platform::new("platform", Default::default());
            let first = build_status(&platform, &report(ReconcileOutcome::Complete));
            let mut second = build_status(&platform, &report(ReconcileOutcome::Complete));
            second.last_reconcile_time = Some("later".to_string());
            assert!(!status_changed(Some(&first), &second));
            assert!(status_changed(None, &second));

            let failed = build_status(&platform, &report(ReconcileOutcome::Fatal("x".to_string())));
            assert!(status_changed(Some(&first), &failed));
        }
    }
}
