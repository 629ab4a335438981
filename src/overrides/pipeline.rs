//! # Override Pipeline
//!
//! Builds the overrides for one component. Steps run in order, each appending to the
//! list, so a later step wins over an earlier one:
//!
//! 1. BOM image overrides for the release
//! 2. The component's append-overrides hook
//! 3. The image pull secret
//! 4. Caller overrides: the user overrides from the platform resource, then extras
//! 5. File overrides collected into the payload's file list
//!
//! Hooks write structured values (rendered YAML documents) through the
//! [`OverrideFiles`] handed to them and return them as file entries.

use super::{flatten_values, mask_sensitive, KeyValue, OverrideFiles, OverridePayload};
use crate::component::{ComponentContext, ComponentError, HelmComponent};
use crate::crd::{LogLevel, ValueRef};
use std::path::PathBuf;
use tracing::{debug, info};

pub async fn build_overrides(
    component: &HelmComponent,
    ctx: &ComponentContext,
    files: &OverrideFiles,
    extra: Vec<KeyValue>,
) -> Result<OverridePayload, ComponentError> {
    let name = component.release_name.as_str();
    let namespace = component.resolve_namespace(ctx);
    let mut kvs = Vec::new();

    if !component.ignore_image_overrides {
        if ctx.bom.has_subcomponent(name) {
            let images = ctx
                .bom
                .build_image_overrides(name, &ctx.image_env)
                .map_err(|e| ComponentError::retryable(name, e.to_string()))?;
            kvs.extend(images);
        } else {
            debug!("No BOM subcomponent for {}, skipping image overrides", name);
        }
    }

    if let Some(hook) = &component.append_overrides_hook {
        kvs = hook(ctx, files, kvs).await?;
    }

    if let Some(key) = &component.image_pull_secret_key {
        let secret = &ctx.settings.global_pull_secret_name;
        let copied = ctx
            .cluster
            .copy_secret(&ctx.settings.global_pull_secret_namespace, secret, &namespace)
            .await
            .map_err(|e| ComponentError::retryable(name, e.to_string()))?;
        if copied {
            kvs.push(KeyValue::new(key.as_str(), secret.as_str()));
        }
    }

    kvs.extend(user_overrides(name, ctx).await?);
    kvs.extend(extra);

    let payload = organize(component, ctx, kvs)?;

    let logging = ctx.logging();
    if logging.overrides.should_log(&LogLevel::Info) {
        info!(
            "Overrides for component {}: {} (files: {:?})",
            name,
            mask_sensitive(&payload.wire_string()),
            payload.files
        );
    }
    Ok(payload)
}

/// Flattened user overrides for a component, in declaration order
///
/// ConfigMap and Secret references are read from the platform namespace and parsed
/// as YAML. A missing optional reference is skipped.
pub async fn user_overrides(
    name: &str,
    ctx: &ComponentContext,
) -> Result<Vec<KeyValue>, ComponentError> {
    let Some(spec) = ctx.platform().component_spec(name) else {
        return Ok(Vec::new());
    };

    let mut kvs = Vec::new();
    for entry in &spec.overrides {
        if let Some(values) = &entry.values {
            kvs.extend(flatten_values(values));
        }
        if let Some(reference) = &entry.config_map_ref {
            let result = ctx
                .cluster
                .config_map_value(ctx.platform_namespace(), &reference.name, &reference.key)
                .await;
            if let Some(document) = referenced_document(name, "ConfigMap", reference, result)? {
                kvs.extend(parse_document(name, &document)?);
            }
        }
        if let Some(reference) = &entry.secret_ref {
            let result = ctx
                .cluster
                .secret_value(ctx.platform_namespace(), &reference.name, &reference.key)
                .await;
            if let Some(document) = referenced_document(name, "Secret", reference, result)? {
                kvs.extend(parse_document(name, &document)?);
            }
        }
    }
    Ok(kvs)
}

fn referenced_document(
    component: &str,
    kind: &str,
    reference: &ValueRef,
    result: Result<String, crate::cluster::ClusterError>,
) -> Result<Option<String>, ComponentError> {
    match result {
        Ok(document) => Ok(Some(document)),
        Err(e) if e.is_not_found() && reference.optional => {
            debug!(
                "Optional {} {} key {} for component {} not found, skipping",
                kind, reference.name, reference.key, component
            );
            Ok(None)
        }
        Err(e) => Err(ComponentError::retryable(component, e.to_string())),
    }
}

fn parse_document(component: &str, document: &str) -> Result<Vec<KeyValue>, ComponentError> {
    let values: serde_json::Value = serde_yaml::from_str(document).map_err(|e| {
        ComponentError::config(component, format!("invalid override document: {e}"))
    })?;
    Ok(flatten_values(&values))
}

/// Split file entries out of the list and inline `set_file` contents
fn organize(
    component: &HelmComponent,
    ctx: &ComponentContext,
    kvs: Vec<KeyValue>,
) -> Result<OverridePayload, ComponentError> {
    let name = component.release_name.as_str();
    let mut payload = OverridePayload::default();

    if let Some(values_file) = component.values_file_path(ctx) {
        payload.files.push(values_file);
    }

    for mut kv in kvs {
        if kv.is_file {
            payload.files.push(PathBuf::from(&kv.value));
            continue;
        }
        if kv.set_file {
            kv.value = std::fs::read_to_string(&kv.value).map_err(|e| {
                ComponentError::retryable(name, format!("could not open file {}: {e}", kv.value))
            })?;
            kv.set_file = false;
            kv.set_string = true;
        }
        payload.kvs.push(kv);
    }
    Ok(payload)
}
