//! Prometheus operator for platform metrics.

use super::MONITORING_NAMESPACE;
use crate::cluster::ReadinessObject;
use crate::constants::DEFAULT_IMAGE_PULL_SECRET_KEY;
use crate::component::HelmComponent;

pub const COMPONENT_NAME: &str = "prometheus-operator";

pub fn component() -> HelmComponent {
    HelmComponent {
        dependencies: vec![super::cert_manager::COMPONENT_NAME.to_string()],
        image_pull_secret_key: Some(DEFAULT_IMAGE_PULL_SECRET_KEY.to_string()),
        allow_disable: true,
        readiness_objects: vec![ReadinessObject::deployment(
            MONITORING_NAMESPACE,
            "prometheus-operator-kube-p-operator",
        )],
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, MONITORING_NAMESPACE)
    }
}
