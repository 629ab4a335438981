//! # Status Command
//!
//! Shows the status of a Platform resource and each of its components.

use anyhow::{Context, Result};
use kube::{api::Api, Client};
use platform_operator::crd::Platform;

pub async fn status_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");
    let api: Api<Platform> = Api::namespaced(client, ns);

    let platform = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get Platform '{ns}/{name}'"))?;

    println!("📊 Status for Platform '{ns}/{name}'");
    println!();
    println!("Spec:");
    println!("  Suspend: {}", platform.spec.suspend);
    println!("  Environment: {}", platform.environment_name());
    if let Some(version) = &platform.spec.version {
        println!("  Version: {version}");
    }

    let Some(status) = &platform.status else {
        println!();
        println!("Status: No status available (resource may not have been reconciled yet)");
        return Ok(());
    };

    println!();
    println!("Status:");
    if let Some(phase) = &status.phase {
        println!("  Phase: {phase}");
    }
    if let Some(description) = &status.description {
        println!("  Description: {description}");
    }
    if let Some(version) = &status.version {
        println!("  Installed Version: {version}");
    }
    if let Some(observed_generation) = status.observed_generation {
        println!("  Observed Generation: {observed_generation}");
    }
    if let Some(last_reconcile_time) = &status.last_reconcile_time {
        println!("  Last Reconcile Time: {last_reconcile_time}");
    }

    if !status.components.is_empty() {
        println!();
        println!("Components:");
        for (component, component_status) in &status.components {
            println!(
                "  {:<36} {:<20} {}",
                component,
                component_status.state.as_str(),
                component_status.version.as_deref().unwrap_or("-")
            );
            if let Some(message) = &component_status.message {
                println!("    Message: {message}");
            }
        }
    }

    if !status.conditions.is_empty() {
        println!();
        println!("Conditions:");
        for condition in &status.conditions {
            println!("  {}: {}", condition.r#type, condition.status);
            if let Some(message) = &condition.message {
                println!("    Message: {message}");
            }
        }
    }
    Ok(())
}
