//! # Application Operator
//!
//! Runs application workloads on the platform. Besides its own image it is told the
//! images of the sidecars it injects.

use super::{bom_error, full_image_name, VERRAZZANO_SYSTEM_NAMESPACE};
use crate::bom::ImageEnv;
use crate::cluster::ReadinessObject;
use crate::constants::DEFAULT_IMAGE_PULL_SECRET_KEY;
use crate::component::{ComponentContext, HelmComponent, HookFuture};
use crate::overrides::{KeyValue, OverrideFiles};

pub const COMPONENT_NAME: &str = "verrazzano-application-operator";

/// Helm key, BOM subcomponent and image for each injected sidecar image
const SIDECAR_IMAGES: [(&str, &str, &str); 3] = [
    ("fluentdImage", "fluentd", "fluentd-kubernetes-daemonset"),
    ("istioProxyImage", super::istio::ISTIOD_SUBCOMPONENT, "proxyv2"),
    (
        "weblogicMonitoringExporterImage",
        "weblogic-operator",
        "weblogic-monitoring-exporter",
    ),
];

pub fn component() -> HelmComponent {
    HelmComponent {
        dependencies: vec![
            super::oam::COMPONENT_NAME.to_string(),
            super::istio::COMPONENT_NAME.to_string(),
        ],
        image_pull_secret_key: Some(DEFAULT_IMAGE_PULL_SECRET_KEY.to_string()),
        readiness_objects: vec![ReadinessObject::deployment(
            VERRAZZANO_SYSTEM_NAMESPACE,
            COMPONENT_NAME,
        )],
        append_overrides_hook: Some(Box::new(append_overrides)),
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, VERRAZZANO_SYSTEM_NAMESPACE)
    }
}

/// The `image` override from `APP_OPERATOR_IMAGE`, empty when it is unset
pub fn app_operator_image_overrides(env: &ImageEnv) -> Vec<KeyValue> {
    env.app_operator_image
        .as_deref()
        .filter(|image| !image.is_empty())
        .map(|image| vec![KeyValue::new("image", image)])
        .unwrap_or_default()
}

fn append_overrides<'a>(
    ctx: &'a ComponentContext,
    _files: &'a OverrideFiles,
    mut kvs: Vec<KeyValue>,
) -> HookFuture<'a, Vec<KeyValue>> {
    Box::pin(async move {
        kvs.extend(app_operator_image_overrides(&ctx.image_env));
        for (key, subcomponent, image) in SIDECAR_IMAGES {
            let name = full_image_name(&ctx.bom, &ctx.image_env, subcomponent, image)
                .map_err(|e| bom_error(COMPONENT_NAME, &e))?;
            kvs.push(KeyValue::new(key, name));
        }
        Ok(kvs)
    })
}
