//! # Istio
//!
//! The service mesh. Images come from the `istiod` subcomponent; `global.hub` is
//! only emitted when the environment moves the proxy image away from the BOM
//! registry and repository.

use super::bom_error;
use crate::bom::{Bom, BomError, ImageEnv};
use crate::cluster::ReadinessObject;
use crate::constants::DEFAULT_IMAGE_PULL_SECRET_KEY;
use crate::component::{ComponentContext, HelmComponent, HookFuture};
use crate::overrides::{KeyValue, OverrideFiles};

pub const COMPONENT_NAME: &str = "istio";
pub const COMPONENT_NAMESPACE: &str = "istio-system";
pub const ISTIOD_SUBCOMPONENT: &str = "istiod";
const PROXY_IMAGE: &str = "proxyv2";
const GLOBAL_HUB_KEY: &str = "global.hub";

pub fn component() -> HelmComponent {
    HelmComponent {
        ignore_namespace_override: true,
        ignore_image_overrides: true,
        wait_for_install: true,
        image_pull_secret_key: Some(DEFAULT_IMAGE_PULL_SECRET_KEY.to_string()),
        readiness_objects: ["istiod", "istio-ingressgateway", "istio-egressgateway"]
            .iter()
            .map(|name| ReadinessObject::deployment(COMPONENT_NAMESPACE, name))
            .collect(),
        append_overrides_hook: Some(Box::new(append_overrides)),
        ..HelmComponent::new(COMPONENT_NAME, COMPONENT_NAME, COMPONENT_NAMESPACE)
    }
}

fn append_overrides<'a>(
    ctx: &'a ComponentContext,
    _files: &'a OverrideFiles,
    mut kvs: Vec<KeyValue>,
) -> HookFuture<'a, Vec<KeyValue>> {
    Box::pin(async move {
        let images = ctx
            .bom
            .build_image_overrides(ISTIOD_SUBCOMPONENT, &ctx.image_env)
            .map_err(|e| bom_error(COMPONENT_NAME, &e))?;
        kvs.extend(images);
        if let Some(hub) =
            global_hub(&ctx.bom, &ctx.image_env).map_err(|e| bom_error(COMPONENT_NAME, &e))?
        {
            kvs.push(KeyValue::new(GLOBAL_HUB_KEY, hub));
        }
        Ok(kvs)
    })
}

/// The resolved `registry/repo` hub, when it differs from the BOM default
pub fn global_hub(bom: &Bom, env: &ImageEnv) -> Result<Option<String>, BomError> {
    let sc = bom.subcomponent(ISTIOD_SUBCOMPONENT)?;
    let image = bom.find_image(ISTIOD_SUBCOMPONENT, PROXY_IMAGE)?;
    let hub = |env: &ImageEnv| {
        let registry = bom.resolve_registry(sc, image, env);
        let repo = bom.resolve_repository(sc, image, env);
        if repo.is_empty() {
            registry
        } else {
            format!("{registry}/{repo}")
        }
    };
    let resolved = hub(env);
    Ok((resolved != hub(&ImageEnv::default())).then_some(resolved))
}
