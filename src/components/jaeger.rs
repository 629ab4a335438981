//! # Jaeger Operator
//!
//! Tracing operator. Optional, and only installed once the platform is at 1.3.0 or
//! later. The operator is told the images of the Jaeger instances it manages.

use super::{bom_error, full_image_name, MONITORING_NAMESPACE};
use crate::cluster::ReadinessObject;
use crate::component::{ComponentContext, HelmComponent, HookFuture};
use crate::overrides::{KeyValue, OverrideFiles};

pub const COMPONENT_NAME: &str = "jaeger-operator";
pub const MIN_PLATFORM_VERSION: &str = "1.3.0";
const JAEGER_SUBCOMPONENT: &str = "jaeger";

/// Operator env var and BOM image for each managed Jaeger image
const MANAGED_IMAGES: [(&str, &str); 4] = [
    ("JAEGER_AGENT_IMAGE", "jaeger-agent"),
    ("JAEGER_QUERY_IMAGE", "jaeger-query"),
    ("JAEGER_COLLECTOR_IMAGE", "jaeger-collector"),
    ("JAEGER_INGESTER_IMAGE", "jaeger-ingester"),
];

pub fn component() -> HelmComponent {
    HelmComponent {
        dependencies: vec![super::cert_manager::COMPONENT_NAME.to_string()],
        min_platform_version: MIN_PLATFORM_VERSION.to_string(),
        enabled_by_default: false,
        allow_disable: true,
        readiness_objects: vec![ReadinessObject::deployment(MONITORING_NAMESPACE, COMPONENT_NAME)],
        append_overrides_hook: Some(Box::new(append_overrides)),
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, MONITORING_NAMESPACE)
    }
}

fn append_overrides<'a>(
    ctx: &'a ComponentContext,
    _files: &'a OverrideFiles,
    mut kvs: Vec<KeyValue>,
) -> HookFuture<'a, Vec<KeyValue>> {
    Box::pin(async move {
        for (index, (env_name, image)) in MANAGED_IMAGES.iter().enumerate() {
            let name = full_image_name(&ctx.bom, &ctx.image_env, JAEGER_SUBCOMPONENT, image)
                .map_err(|e| bom_error(COMPONENT_NAME, &e))?;
            kvs.push(KeyValue::new(format!("env[{index}].name"), *env_name));
            kvs.push(KeyValue::string(format!("env[{index}].value"), name));
        }
        Ok(kvs)
    })
}
