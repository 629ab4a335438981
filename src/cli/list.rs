//! # List Command

use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use platform_operator::crd::Platform;

/// List Platform resources in one namespace, or all namespaces when none is given
pub async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<Platform> = match namespace.as_deref() {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };

    let platforms = api
        .list(&ListParams::default())
        .await
        .context("Failed to list Platform resources")?;

    if platforms.items.is_empty() {
        println!("No Platform resources found");
        return Ok(());
    }

    println!(
        "{:<20} {:<30} {:<14} {:<12} {:<10}",
        "NAMESPACE", "NAME", "PHASE", "VERSION", "SUSPENDED"
    );
    println!("{}", "-".repeat(90));
    for platform in &platforms.items {
        let status = platform.status.as_ref();
        println!(
            "{:<20} {:<30} {:<14} {:<12} {:<10}",
            platform.metadata.namespace.as_deref().unwrap_or("<unknown>"),
            platform.metadata.name.as_deref().unwrap_or("<unknown>"),
            status.and_then(|s| s.phase.as_deref()).unwrap_or("Unknown"),
            status.and_then(|s| s.version.as_deref()).unwrap_or("-"),
            platform.spec.suspend
        );
    }
    Ok(())
}
