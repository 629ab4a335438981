//! NGINX ingress controller for platform endpoints.

use crate::cluster::ReadinessObject;
use crate::constants::DEFAULT_IMAGE_PULL_SECRET_KEY;
use crate::component::HelmComponent;

pub const COMPONENT_NAME: &str = "ingress-controller";
pub const COMPONENT_NAMESPACE: &str = "ingress-nginx";

pub fn component() -> HelmComponent {
    HelmComponent {
        dependencies: vec![super::istio::COMPONENT_NAME.to_string()],
        chart_dir: "ingress-nginx".into(),
        ignore_namespace_override: true,
        image_pull_secret_key: Some(DEFAULT_IMAGE_PULL_SECRET_KEY.to_string()),
        readiness_objects: vec![
            ReadinessObject::deployment(
                COMPONENT_NAMESPACE,
                "ingress-controller-ingress-nginx-controller",
            ),
            ReadinessObject::deployment(
                COMPONENT_NAMESPACE,
                "ingress-controller-ingress-nginx-defaultbackend",
            ),
        ],
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, COMPONENT_NAMESPACE)
    }
}
