//! # Platform Spec
//!
//! Desired state of the platform: which components are enabled and how they are
//! configured.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Platform Custom Resource Definition
///
/// One resource describes the whole platform installation.
///
/// # Example
///
/// ```yaml
/// apiVersion: install.platform.octopilot.io/v1alpha1
/// kind: Platform
/// metadata:
///   name: platform
///   namespace: default
/// spec:
///   profile: dev
///   environmentName: dev
///   dns:
///     domain: example.io
///   components:
///     keycloak:
///       enabled: true
///       overrides:
///         - values:
///             replicas: 2
///     jaeger-operator:
///       enabled: false
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Platform",
    group = "install.platform.octopilot.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::PlatformStatus",
    shortname = "plat",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Version", "type":"string", "jsonPath":".status.version"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PlatformSpec {
    /// Platform version to install or upgrade to
    /// Defaults to the version in the BOM
    #[serde(default)]
    pub version: Option<String>,
    /// Installation profile (dev, prod, managed-cluster)
    #[serde(default)]
    pub profile: Option<String>,
    /// Environment name, used in generated host names
    /// Default: "default"
    #[serde(default)]
    pub environment_name: Option<String>,
    /// Per-component settings keyed by component name
    #[serde(default)]
    pub components: BTreeMap<String, ComponentSpec>,
    /// Namespace used for components that accept a namespace override
    #[serde(default)]
    pub default_namespace: Option<String>,
    /// Suspend reconciliation
    /// Default: false
    #[serde(default = "default_false")]
    pub suspend: bool,
    /// Logging configuration for per-area verbosity
    #[serde(default)]
    pub logging: Option<crate::crd::LoggingConfig>,
    /// DNS settings for generated ingress hosts
    #[serde(default)]
    pub dns: Option<DnsConfig>,
    /// Log collection backend
    /// Default: fluentd
    #[serde(default)]
    pub log_backend: LogBackend,
}

/// Settings for one component
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    /// Explicit enablement; the component default applies when unset
    #[serde(default)]
    pub enabled: Option<bool>,
    /// User overrides in increasing precedence
    #[serde(default)]
    pub overrides: Vec<Override>,
}

/// One source of user overrides
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    /// Inline values document
    #[serde(default)]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub values: Option<serde_json::Value>,
    /// Values document stored under a ConfigMap key
    #[serde(default)]
    pub config_map_ref: Option<ValueRef>,
    /// Values document stored under a Secret key
    #[serde(default)]
    pub secret_ref: Option<ValueRef>,
}

/// Reference to a key in a ConfigMap or Secret in the platform namespace
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ValueRef {
    pub name: String,
    pub key: String,
    /// Missing references are skipped instead of failing the component
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DnsConfig {
    /// DNS domain for generated hosts, e.g. `example.io`
    #[serde(default)]
    pub domain: Option<String>,
    /// Manage records with external-dns
    #[serde(default = "default_false")]
    pub external: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum LogBackend {
    #[default]
    Fluentd,
    FluentOperator,
}

impl Platform {
    pub fn component_spec(&self, name: &str) -> Option<&ComponentSpec> {
        self.spec.components.get(name)
    }

    /// Explicit enablement when set, otherwise `default`
    pub fn component_enabled(&self, name: &str, default: bool) -> bool {
        self.component_spec(name)
            .and_then(|c| c.enabled)
            .unwrap_or(default)
    }

    /// Explicitly set `enabled` for one component
    #[must_use]
    pub fn with_component_enabled(&self, name: &str, enabled: bool) -> Self {
        let mut platform = self.clone();
        platform
            .spec
            .components
            .entry(name.to_string())
            .or_default()
            .enabled = Some(enabled);
        platform
    }

    pub fn environment_name(&self) -> &str {
        self.spec
            .environment_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("default")
    }

    pub fn dns_domain(&self) -> Option<&str> {
        self.spec
            .dns
            .as_ref()
            .and_then(|d| d.domain.as_deref())
            .filter(|d| !d.is_empty())
    }

    pub fn logging(&self) -> crate::crd::LoggingConfig {
        self.spec.logging.clone().unwrap_or_default()
    }

    /// Platform version currently installed, empty before the first install completes
    pub fn installed_version(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.version.as_deref())
            .unwrap_or("")
    }
}

fn preserve_unknown_fields(_: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}

/// Default value for boolean false
pub fn default_false() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform(yaml: &str) -> Platform {
        Platform::new("platform", serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_component_enabled_defaults() {
        let p = platform("components:\n  istio:\n    enabled: false\n");
        assert!(!p.component_enabled("istio", true));
        assert!(p.component_enabled("keycloak", true));
        assert!(!p.component_enabled("jaeger-operator", false));
    }

    #[test]
    fn test_with_component_enabled() {
        let p = platform("{}");
        let enabled = p.with_component_enabled("dex", true);
        assert!(enabled.component_enabled("dex", false));
        assert!(p.component_spec("dex").is_none());
    }

    #[test]
    fn test_overrides_parse() {
        let p = platform(
            "components:\n  keycloak:\n    overrides:\n      - values:\n          replicas: 2\n      - configMapRef:\n          name: kc\n          key: values.yaml\n",
        );
        let spec = p.component_spec("keycloak").unwrap();
        assert_eq!(spec.overrides.len(), 2);
        assert_eq!(
            spec.overrides[0].values,
            Some(serde_json::json!({"replicas": 2}))
        );
        assert_eq!(spec.overrides[1].config_map_ref.as_ref().unwrap().name, "kc");
    }

    #[test]
    fn test_defaults() {
        let p = platform("{}");
        assert_eq!(p.environment_name(), "default");
        assert_eq!(p.dns_domain(), None);
        assert_eq!(p.spec.log_backend, LogBackend::Fluentd);
        assert_eq!(p.installed_version(), "");
    }
}
