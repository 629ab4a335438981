//! # Keycloak
//!
//! Identity provider for platform endpoints. The theme is copied in by an init
//! container whose image comes from the `keycloak-oracle-theme` subcomponent; the
//! container spec is a rendered YAML block passed as a values file.

use super::{bom_error, dns_suffix};
use crate::cluster::ReadinessObject;
use crate::component::{ComponentContext, ComponentError, HelmComponent, HookFuture};
use crate::overrides::{render_template, KeyValue, OverrideFiles};
use std::collections::BTreeMap;

pub const COMPONENT_NAME: &str = "keycloak";
pub const COMPONENT_NAMESPACE: &str = "keycloak";
pub const THEME_SUBCOMPONENT: &str = "keycloak-oracle-theme";
pub const CERTIFICATE_NAME: &str = "keycloak-tls";

const INIT_CONTAINER_TEMPLATE: &str = r#"extraInitContainers: |
  - name: theme-provider
    image: {{ Image }}
    imagePullPolicy: IfNotPresent
    command:
      - sh
    args:
      - -c
      - |
        echo "Copying theme..."
        cp -R /oracle/* /theme
    volumeMounts:
      - name: theme
        mountPath: /theme
      - name: cacerts
        mountPath: /cacerts
"#;

pub fn component() -> HelmComponent {
    HelmComponent {
        dependencies: vec![
            super::istio::COMPONENT_NAME.to_string(),
            super::ingress::COMPONENT_NAME.to_string(),
            super::cert_manager::COMPONENT_NAME.to_string(),
            super::mysql::COMPONENT_NAME.to_string(),
        ],
        ignore_namespace_override: true,
        image_pull_secret_key: Some("keycloak.imagePullSecrets[0].name".to_string()),
        readiness_objects: vec![ReadinessObject::stateful_set(
            COMPONENT_NAMESPACE,
            COMPONENT_NAME,
        )],
        append_overrides_hook: Some(Box::new(append_overrides)),
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, COMPONENT_NAMESPACE)
    }
}

/// Render the theme init container values document
pub fn init_container_values(theme_image: &str) -> Result<String, ComponentError> {
    let vars = BTreeMap::from([("Image", theme_image.to_string())]);
    render_template(INIT_CONTAINER_TEMPLATE, &vars)
        .map_err(|e| ComponentError::retryable(COMPONENT_NAME, e.to_string()))
}

fn append_overrides<'a>(
    ctx: &'a ComponentContext,
    files: &'a OverrideFiles,
    mut kvs: Vec<KeyValue>,
) -> HookFuture<'a, Vec<KeyValue>> {
    Box::pin(async move {
        let images = ctx
            .bom
            .build_image_overrides(THEME_SUBCOMPONENT, &ctx.image_env)
            .map_err(|e| bom_error(COMPONENT_NAME, &e))?;
        let [theme] = images.as_slice() else {
            return Err(ComponentError::retryable(
                COMPONENT_NAME,
                format!(
                    "expected 1 image for Keycloak theme, found {}",
                    images.len()
                ),
            ));
        };

        let values = init_container_values(&theme.value)?;
        let path = files.write(&values).map_err(|e| {
            ComponentError::retryable(COMPONENT_NAME, format!("failed to write values file: {e}"))
        })?;
        kvs.push(KeyValue::file(path.to_string_lossy()));

        let host = format!("keycloak.{}", dns_suffix(ctx.platform()));
        kvs.push(KeyValue::string("dnsTarget", host.as_str()));
        kvs.push(KeyValue::new("rulesHost", host.as_str()));
        kvs.push(KeyValue::new("tlsHosts", host.as_str()));
        kvs.push(KeyValue::new("tlsSecret", CERTIFICATE_NAME));
        Ok(kvs)
    })
}
