//! OAM runtime, the application model controller the application operator builds on.

use super::VERRAZZANO_SYSTEM_NAMESPACE;
use crate::cluster::ReadinessObject;
use crate::component::HelmComponent;

pub const COMPONENT_NAME: &str = "oam-kubernetes-runtime";

pub fn component() -> HelmComponent {
    HelmComponent {
        image_pull_secret_key: Some("imagePullSecrets[0].name".to_string()),
        readiness_objects: vec![ReadinessObject::deployment(
            VERRAZZANO_SYSTEM_NAMESPACE,
            COMPONENT_NAME,
        )],
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, VERRAZZANO_SYSTEM_NAMESPACE)
    }
}
