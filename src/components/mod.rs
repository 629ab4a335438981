//! # Platform Components
//!
//! The concrete components the platform installs, each a configured
//! [`HelmComponent`]. [`platform_components`] returns them in install order.

pub mod app_operator;
pub mod cert_manager;
pub mod dex;
pub mod external_dns;
pub mod fluentd;
pub mod ingress;
pub mod istio;
pub mod jaeger;
pub mod keycloak;
pub mod mysql;
pub mod oam;
pub mod prometheus;

use crate::bom::{Bom, BomError, ImageEnv};
use crate::component::{Component, ComponentError, HelmComponent};
use crate::crd::Platform;
use std::sync::Arc;

pub const VERRAZZANO_SYSTEM_NAMESPACE: &str = "verrazzano-system";
pub const MONITORING_NAMESPACE: &str = "verrazzano-monitoring";
pub const DEFAULT_DNS_DOMAIN: &str = "nip.io";

/// Every platform component in registry order
pub fn platform_components() -> Vec<Arc<dyn Component>> {
    let components: Vec<HelmComponent> = vec![
        oam::component(),
        istio::component(),
        app_operator::component(),
        cert_manager::component(),
        external_dns::component(),
        ingress::component(),
        mysql::component(),
        keycloak::component(),
        dex::component(),
        fluentd::component(),
        jaeger::component(),
        prometheus::component(),
    ];
    components
        .into_iter()
        .map(|c| Arc::new(c) as Arc<dyn Component>)
        .collect()
}

/// `registry/repo/image:tag` of one BOM image
pub fn full_image_name(
    bom: &Bom,
    env: &ImageEnv,
    subcomponent: &str,
    image: &str,
) -> Result<String, BomError> {
    let sc = bom.subcomponent(subcomponent)?;
    let unknown = || BomError::UnknownImage {
        subcomponent: subcomponent.to_string(),
        image: image.to_string(),
    };
    let position = sc
        .images
        .iter()
        .position(|i| i.image == image)
        .ok_or_else(unknown)?;
    bom.build_image_strings(subcomponent, env)?
        .full_image_names
        .get(position)
        .cloned()
        .ok_or_else(unknown)
}

/// DNS suffix for component hosts: `<environment>.<domain>`
pub fn dns_suffix(platform: &Platform) -> String {
    format!(
        "{}.{}",
        platform.environment_name(),
        platform.dns_domain().unwrap_or(DEFAULT_DNS_DOMAIN)
    )
}

pub(crate) fn bom_error(component: &str, error: &BomError) -> ComponentError {
    ComponentError::retryable(component, error.to_string())
}
