//! # PLATCTL CLI
//!
//! Command-line interface for the platform operator.
//!
//! The offline commands read the BOM and catalog files directly; `reconcile`,
//! `list` and `status` talk to the cluster.
//!
//! ## Usage
//!
//! ```bash
//! # Print the helm image overrides for a subcomponent
//! platctl images istiod --registry myreg.io
//!
//! # Check the version catalog against the BOM
//! platctl catalog-check
//!
//! # Show the component install order
//! platctl components
//!
//! # Trigger reconciliation of a Platform resource
//! platctl reconcile my-platform --namespace default
//!
//! # List Platform resources
//! platctl list
//!
//! # Show status of a Platform resource
//! platctl status my-platform
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kube::Client;
use platform_operator::constants::{DEFAULT_BOM_PATH, DEFAULT_CATALOG_PATH};
use std::path::PathBuf;

mod catalog_check;
mod components;
mod images;
mod list;
mod reconcile;
mod status;

/// Platform operator CLI
#[derive(Parser)]
#[command(name = "platctl")]
#[command(
    about = "Platform operator CLI",
    long_about = None,
    after_help = "\
Examples:
  platctl images istiod --registry myreg.io
  platctl catalog-check --catalog manifests/catalog.yaml
  platctl reconcile my-platform --namespace default
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to "default")
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the helm image overrides for a BOM subcomponent
    Images {
        /// Name of the BOM subcomponent
        #[arg(value_name = "SUBCOMPONENT")]
        subcomponent: String,

        /// Path to the BOM file
        #[arg(long, default_value = DEFAULT_BOM_PATH)]
        bom: PathBuf,

        /// Registry replacing every registry in the BOM
        #[arg(long, env = "REGISTRY")]
        registry: Option<String>,

        /// Repository prefixed onto every repository in the BOM
        #[arg(long, env = "IMAGE_REPO")]
        image_repo: Option<String>,

        /// Also print the full image names
        #[arg(long)]
        full_names: bool,
    },
    /// Check that catalog module versions match the BOM
    #[command(name = "catalog-check")]
    CatalogCheck {
        /// Path to the BOM file
        #[arg(long, default_value = DEFAULT_BOM_PATH)]
        bom: PathBuf,

        /// Path to the catalog file
        #[arg(long, default_value = DEFAULT_CATALOG_PATH)]
        catalog: PathBuf,
    },
    /// List the platform components in install order
    Components,
    /// Trigger reconciliation for a Platform resource
    Reconcile {
        /// Name of the Platform resource
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// List all Platform resources
    List,
    /// Show status of a Platform resource
    Status {
        /// Name of the Platform resource
        #[arg(value_name = "NAME")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any client is built
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "platctl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Images {
            subcomponent,
            bom,
            registry,
            image_repo,
            full_names,
        } => images::images_command(&subcomponent, &bom, registry, image_repo, full_names),
        Commands::CatalogCheck { bom, catalog } => {
            catalog_check::catalog_check_command(&bom, &catalog)
        }
        Commands::Components => {
            components::components_command();
            Ok(())
        }
        Commands::Reconcile { name } => {
            reconcile::reconcile_command(kube_client().await?, name, cli.namespace).await
        }
        Commands::List => list::list_command(kube_client().await?, cli.namespace).await,
        Commands::Status { name } => {
            status::status_command(kube_client().await?, name, cli.namespace).await
        }
    }
}

async fn kube_client() -> Result<Client> {
    Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")
}
