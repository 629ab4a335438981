//! # Metrics
//!
//! Prometheus metrics for monitoring the operator.
//!
//! ## Metrics Exposed
//!
//! - `platform_operator_reconciliations_total` - Total number of reconciliations
//! - `platform_operator_reconciliation_errors_total` - Total number of reconciliation errors
//! - `platform_operator_reconciliation_duration_seconds` - Duration of reconcile passes
//! - `platform_operator_component_operations_total` - Component lifecycle operations by component and operation
//! - `platform_operator_component_operation_errors_total` - Failed component lifecycle operations
//! - `platform_operator_helm_commands_total` - Helm commands run, by command
//! - `platform_operator_helm_command_duration_seconds` - Duration of helm commands
//! - `platform_operator_components_ready` - Number of components ready after the last pass
//! - `platform_operator_requeues_total` - Requeues by reason

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, IntGauge, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "platform_operator_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "platform_operator_reconciliation_errors_total",
        "Total number of reconciliation errors",
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "platform_operator_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static COMPONENT_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "platform_operator_component_operations_total",
            "Total number of component lifecycle operations",
        ),
        &["component", "operation"],
    )
    .expect("Failed to create COMPONENT_OPERATIONS_TOTAL metric - this should never happen")
});

static COMPONENT_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "platform_operator_component_operation_errors_total",
            "Total number of failed component lifecycle operations",
        ),
        &["component", "operation"],
    )
    .expect("Failed to create COMPONENT_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

static HELM_COMMANDS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "platform_operator_helm_commands_total",
            "Total number of helm commands run",
        ),
        &["command"],
    )
    .expect("Failed to create HELM_COMMANDS_TOTAL metric - this should never happen")
});

static HELM_COMMAND_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "platform_operator_helm_command_duration_seconds",
            "Duration of helm commands in seconds",
        )
        .buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 600.0]),
    )
    .expect("Failed to create HELM_COMMAND_DURATION metric - this should never happen")
});

static COMPONENTS_READY: LazyLock<IntGauge> = LazyLock::new(|| {
    IntGauge::new(
        "platform_operator_components_ready",
        "Number of components ready after the last reconcile pass",
    )
    .expect("Failed to create COMPONENTS_READY metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "platform_operator_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(COMPONENT_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(COMPONENT_OPERATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(HELM_COMMANDS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(HELM_COMMAND_DURATION.clone()))?;
    REGISTRY.register(Box::new(COMPONENTS_READY.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors() {
    RECONCILIATION_ERRORS_TOTAL.inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_component_operations(component: &str, operation: &str) {
    COMPONENT_OPERATIONS_TOTAL
        .with_label_values(&[component, operation])
        .inc();
}

pub fn increment_component_operation_errors(component: &str, operation: &str) {
    COMPONENT_OPERATION_ERRORS_TOTAL
        .with_label_values(&[component, operation])
        .inc();
}

pub fn increment_helm_commands(command: &str) {
    HELM_COMMANDS_TOTAL.with_label_values(&[command]).inc();
}

pub fn observe_helm_command_duration(duration: f64) {
    HELM_COMMAND_DURATION.observe(duration);
}

pub fn set_components_ready(count: i64) {
    COMPONENTS_READY.set(count);
}

/// Reasons: `retryable`, `error-backoff`, `periodic`
pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
