//! # Dex
//!
//! OIDC identity broker. Disabled unless the platform resource enables it.

use super::dns_suffix;
use crate::cluster::ReadinessObject;
use crate::component::{ComponentContext, HelmComponent, HookFuture};
use crate::overrides::{KeyValue, OverrideFiles};

pub const COMPONENT_NAME: &str = "dex";
pub const COMPONENT_NAMESPACE: &str = "dex";
pub const CERTIFICATE_NAME: &str = "dex-tls";

pub fn component() -> HelmComponent {
    HelmComponent {
        dependencies: vec![
            super::ingress::COMPONENT_NAME.to_string(),
            super::cert_manager::COMPONENT_NAME.to_string(),
        ],
        ignore_namespace_override: true,
        enabled_by_default: false,
        image_pull_secret_key: Some("imagePullSecrets[0].name".to_string()),
        readiness_objects: vec![ReadinessObject::deployment(COMPONENT_NAMESPACE, COMPONENT_NAME)],
        append_overrides_hook: Some(Box::new(append_overrides)),
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, COMPONENT_NAMESPACE)
    }
}

/// Host dex is served on
pub fn dex_host(ctx: &ComponentContext) -> String {
    format!("auth.{}", dns_suffix(ctx.platform()))
}

fn append_overrides<'a>(
    ctx: &'a ComponentContext,
    _files: &'a OverrideFiles,
    mut kvs: Vec<KeyValue>,
) -> HookFuture<'a, Vec<KeyValue>> {
    Box::pin(async move {
        let host = dex_host(ctx);
        kvs.push(KeyValue::string("config.issuer", format!("https://{host}")));
        kvs.push(KeyValue::new("ingress.hosts[0].host", host.as_str()));
        kvs.push(KeyValue::new("ingress.tls[0].hosts[0]", host.as_str()));
        kvs.push(KeyValue::new("ingress.tls[0].secretName", CERTIFICATE_NAME));
        Ok(kvs)
    })
}
