//! # Fluentd
//!
//! Log collector. Enabled by default when the platform's log backend is fluentd; the
//! full values document is rendered from a template and passed as a values file.

use super::{bom_error, full_image_name, VERRAZZANO_SYSTEM_NAMESPACE};
use crate::cluster::ReadinessObject;
use crate::component::{ComponentContext, ComponentError, HelmComponent, HookFuture};
use crate::crd::{LogBackend, Platform};
use crate::overrides::{render_template, KeyValue, OverrideFiles};
use std::collections::BTreeMap;

pub const COMPONENT_NAME: &str = "fluentd";
pub const FLUENTD_IMAGE: &str = "fluentd-kubernetes-daemonset";

const VALUES_TEMPLATE: &str = r"logging:
  name: fluentd
  environmentName: {{ EnvironmentName }}
fluentd:
  image: {{ Image }}
  enabled: true
";

pub fn component() -> HelmComponent {
    HelmComponent {
        dependencies: vec![super::istio::COMPONENT_NAME.to_string()],
        ignore_image_overrides: true,
        allow_disable: true,
        enabled_by_default_hook: Some(Box::new(fluentd_backend)),
        readiness_objects: vec![ReadinessObject::daemon_set(
            VERRAZZANO_SYSTEM_NAMESPACE,
            COMPONENT_NAME,
        )],
        append_overrides_hook: Some(Box::new(append_overrides)),
        validate_update_hook: Some(Box::new(validate_backend)),
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, VERRAZZANO_SYSTEM_NAMESPACE)
    }
}

fn fluentd_backend(platform: &Platform) -> bool {
    platform.spec.log_backend == LogBackend::Fluentd
}

/// Fluentd and the fluent operator backend are mutually exclusive
fn validate_backend(_old: &Platform, new: &Platform) -> Result<(), ComponentError> {
    let explicitly_enabled = new
        .component_spec(COMPONENT_NAME)
        .and_then(|c| c.enabled)
        .unwrap_or(false);
    if explicitly_enabled && new.spec.log_backend == LogBackend::FluentOperator {
        return Err(ComponentError::policy(
            "Component fluentd cannot be enabled when the log backend is fluentOperator",
        ));
    }
    Ok(())
}

pub fn values_document(environment_name: &str, image: &str) -> Result<String, ComponentError> {
    let vars = BTreeMap::from([
        ("EnvironmentName", environment_name.to_string()),
        ("Image", image.to_string()),
    ]);
    render_template(VALUES_TEMPLATE, &vars)
        .map_err(|e| ComponentError::retryable(COMPONENT_NAME, e.to_string()))
}

fn append_overrides<'a>(
    ctx: &'a ComponentContext,
    files: &'a OverrideFiles,
    mut kvs: Vec<KeyValue>,
) -> HookFuture<'a, Vec<KeyValue>> {
    Box::pin(async move {
        let image = full_image_name(&ctx.bom, &ctx.image_env, COMPONENT_NAME, FLUENTD_IMAGE)
            .map_err(|e| bom_error(COMPONENT_NAME, &e))?;
        let document = values_document(ctx.platform().environment_name(), &image)?;
        let path = files.write(&document).map_err(|e| {
            ComponentError::retryable(COMPONENT_NAME, format!("failed to write values file: {e}"))
        })?;
        kvs.push(KeyValue::file(path.to_string_lossy()));
        Ok(kvs)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(yaml: &str) -> Platform {
        Platform::new("platform", serde_yaml::from_str(yaml).unwrap())
    }

    mod enablement_tests {
        use super::*;

        #[test]
        fn test_enabled_for_fluentd_backend() {
            assert!(component().is_enabled(&platform("{}")));
            assert!(!component().is_enabled(&platform("logBackend: fluentOperator\n")));
        }
    }

    mod validate_tests {
        use super::*;

        #[test]
        fn test_rejects_fluentd_with_fluent_operator() {
            let old = platform("{}");
            let new = platform(
                "logBackend: fluentOperator\ncomponents:\n  fluentd:\n    enabled: true\n",
            );
            let err = component().validate_update(&old, &new).unwrap_err();
            assert!(matches!(err, ComponentError::Policy(_)));
        }

        #[test]
        fn test_switching_backend_is_allowed() {
            let old = platform("{}");
            let new = platform("logBackend: fluentOperator\n");
            assert!(component().validate_update(&old, &new).is_ok());
        }
    }

    #[test]
    fn test_values_document() {
        let document = values_document("dev", "ghcr.io/fluentd:v1").unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&document).unwrap();
        assert_eq!(parsed["fluentd"]["image"].as_str(), Some("ghcr.io/fluentd:v1"));
        assert_eq!(parsed["logging"]["environmentName"].as_str(), Some("dev"));
    }
}
