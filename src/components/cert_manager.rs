//! cert-manager, issuing the certificates for platform ingresses.

use crate::cluster::ReadinessObject;
use crate::component::HelmComponent;

pub const COMPONENT_NAME: &str = "cert-manager";
pub const COMPONENT_NAMESPACE: &str = "cert-manager";

pub fn component() -> HelmComponent {
    HelmComponent {
        ignore_namespace_override: true,
        wait_for_install: true,
        readiness_objects: ["cert-manager", "cert-manager-cainjector", "cert-manager-webhook"]
            .iter()
            .map(|name| ReadinessObject::deployment(COMPONENT_NAMESPACE, name))
            .collect(),
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, COMPONENT_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_objects() {
        let component = component();
        assert_eq!(component.readiness_objects.len(), 3);
        assert!(component
            .readiness_objects
            .iter()
            .all(|o| o.namespace == "cert-manager"));
        assert_eq!(component.readiness_objects[2].name, "cert-manager-webhook");
    }
}
