//! # Reconcile Command
//!
//! Triggers reconciliation by setting the reconcile annotation. The operator watches
//! for it, reconciles, and clears it.

use anyhow::{Context, Result};
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use platform_operator::constants::RECONCILE_ANNOTATION;
use platform_operator::crd::Platform;
use std::time::{SystemTime, UNIX_EPOCH};

pub async fn reconcile_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");
    let api: Api<Platform> = Api::namespaced(client, ns);

    println!("🔄 Triggering reconciliation for Platform '{ns}/{name}'...");

    let platform = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get Platform '{ns}/{name}'"))?;

    if platform.spec.suspend {
        println!("   ⚠️  Warning: Resource is suspended. Reconciliation will be skipped.");
    }

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System time is before UNIX epoch")?
        .as_secs();

    let mut annotations = serde_json::Map::new();
    annotations.insert(
        RECONCILE_ANNOTATION.to_string(),
        serde_json::Value::String(timestamp.to_string()),
    );
    let patch = serde_json::json!({ "metadata": { "annotations": annotations } });

    api.patch(&name, &PatchParams::default(), &Patch::Merge(patch))
        .await
        .with_context(|| format!("Failed to trigger reconciliation for Platform '{ns}/{name}'"))?;

    println!("✅ Reconciliation triggered successfully");
    println!("   Annotation: {RECONCILE_ANNOTATION}={timestamp}");
    Ok(())
}
