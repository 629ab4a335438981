//! # External DNS
//!
//! Publishes platform ingress hosts to an external DNS provider. Enabled by default
//! only when the platform resource asks for external DNS.

use crate::constants::DEFAULT_IMAGE_PULL_SECRET_KEY;
use crate::component::{ComponentContext, HelmComponent, HookFuture};
use crate::crd::Platform;
use crate::overrides::{KeyValue, OverrideFiles};

pub const COMPONENT_NAME: &str = "external-dns";
pub const COMPONENT_NAMESPACE: &str = "cert-manager";

pub fn component() -> HelmComponent {
    HelmComponent {
        dependencies: vec![super::cert_manager::COMPONENT_NAME.to_string()],
        ignore_namespace_override: true,
        image_pull_secret_key: Some(DEFAULT_IMAGE_PULL_SECRET_KEY.to_string()),
        enabled_by_default_hook: Some(Box::new(external_dns_requested)),
        append_overrides_hook: Some(Box::new(append_overrides)),
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, COMPONENT_NAMESPACE)
    }
}

fn external_dns_requested(platform: &Platform) -> bool {
    platform.spec.dns.as_ref().is_some_and(|dns| dns.external)
}

fn append_overrides<'a>(
    ctx: &'a ComponentContext,
    _files: &'a OverrideFiles,
    mut kvs: Vec<KeyValue>,
) -> HookFuture<'a, Vec<KeyValue>> {
    Box::pin(async move {
        let platform = ctx.platform();
        if let Some(domain) = platform.dns_domain() {
            kvs.push(KeyValue::new("domainFilters[0]", domain));
        }
        kvs.push(KeyValue::string(
            "txtOwnerId",
            format!("v8o-{}", platform.environment_name()),
        ));
        Ok(kvs)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(yaml: &str) -> Platform {
        Platform::new("platform", serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_disabled_without_external_dns() {
        assert!(!component().is_enabled(&platform("{}")));
        assert!(!component().is_enabled(&platform("dns:\n  domain: example.com\n")));
    }

    #[test]
    fn test_enabled_with_external_dns() {
        assert!(component().is_enabled(&platform("dns:\n  external: true\n")));
    }

    #[test]
    fn test_explicit_setting_wins() {
        let yaml = "dns:\n  external: true\ncomponents:\n  external-dns:\n    enabled: false\n";
        assert!(!component().is_enabled(&platform(yaml)));
    }
}
