//! # Registry Integration Tests
//!
//! The platform registry as shipped.

use platform_operator::crd::Platform;
use platform_operator::registry::{ReadinessSnapshot, Registry, RegistryError};

fn all_ready(registry: &Registry) -> ReadinessSnapshot {
    registry
        .names()
        .into_iter()
        .map(|name| (name.to_string(), true))
        .collect()
}

#[test]
fn test_platform_registry_order() {
    let registry = Registry::platform_default();
    assert_eq!(
        registry.names(),
        vec![
            "oam-kubernetes-runtime",
            "istio",
            "verrazzano-application-operator",
            "cert-manager",
            "external-dns",
            "ingress-controller",
            "mysql",
            "keycloak",
            "dex",
            "fluentd",
            "jaeger-operator",
            "prometheus-operator",
        ]
    );
}

#[test]
fn test_platform_dependency_graph_is_acyclic_and_known() {
    let registry = Registry::platform_default();
    let ready = all_ready(&registry);
    for component in registry.iter() {
        assert_eq!(
            registry.check_dependencies(component.as_ref(), &ready),
            Ok(()),
            "component {}",
            component.name()
        );
    }
}

#[test]
fn test_application_operator_waits_for_istio() {
    let registry = Registry::platform_default();
    let app = registry.find("verrazzano-application-operator").unwrap();
    let mut ready = all_ready(&registry);
    ready.insert("istio".to_string(), false);

    match registry.check_dependencies(app.as_ref(), &ready) {
        Err(RegistryError::NotReady { dependencies, .. }) => {
            assert_eq!(dependencies, vec!["istio".to_string()]);
        }
        other => panic!("expected NotReady, got {other:?}"),
    }
}

#[test]
fn test_optional_components_disabled_by_default() {
    let registry = Registry::platform_default();
    let platform = Platform::new("platform", Default::default());
    let jaeger = registry.find("jaeger-operator").unwrap();
    assert!(!jaeger.is_enabled(&platform));
    assert!(jaeger.is_enabled(&platform.with_component_enabled("jaeger-operator", true)));
    assert_eq!(jaeger.min_platform_version(), "1.3.0");
}
