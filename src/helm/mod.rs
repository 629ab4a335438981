//! # Chart Backend
//!
//! The chart engine the lifecycle drives. [`HelmCli`] runs the `helm` binary; tests
//! substitute an in-memory backend.

mod cli;

pub use cli::HelmCli;

use crate::crd::LogLevel;
use crate::overrides::OverridePayload;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelmError {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("helm {operation} for release {release} in namespace {namespace} failed: {stderr}")]
    CommandFailed {
        operation: String,
        release: String,
        namespace: String,
        stderr: String,
    },
    #[error("unexpected helm output for release {release}: {message}")]
    Output { release: String, message: String },
}

/// Release status as reported by the chart engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseStatus {
    Deployed,
    Failed,
    PendingInstall,
    PendingUpgrade,
    Uninstalled,
    NotFound,
    Unknown(String),
}

impl ReleaseStatus {
    /// Map a helm status string (`deployed`, `pending-install`, ...)
    pub fn from_helm_status(status: &str) -> Self {
        match status.trim() {
            "deployed" => ReleaseStatus::Deployed,
            "failed" => ReleaseStatus::Failed,
            "pending-install" => ReleaseStatus::PendingInstall,
            "pending-upgrade" => ReleaseStatus::PendingUpgrade,
            "uninstalled" => ReleaseStatus::Uninstalled,
            other => ReleaseStatus::Unknown(other.to_string()),
        }
    }

    /// A release exists in any state other than not-found or uninstalled
    pub fn is_installed(&self) -> bool {
        !matches!(self, ReleaseStatus::NotFound | ReleaseStatus::Uninstalled)
    }
}

/// One `upgrade --install`
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub release_name: String,
    pub namespace: String,
    pub chart_dir: PathBuf,
    pub wait: bool,
    pub timeout: Duration,
    pub overrides: OverridePayload,
    /// Verbosity of the command logging for this release
    pub log_level: LogLevel,
}

#[async_trait]
pub trait ChartBackend: Send + Sync {
    async fn release_status(
        &self,
        release: &str,
        namespace: &str,
    ) -> Result<ReleaseStatus, HelmError>;

    async fn upgrade_install(&self, request: &ChartRequest) -> Result<(), HelmError>;

    /// Uninstall a release; a release that does not exist is not an error
    async fn uninstall(&self, release: &str, namespace: &str) -> Result<(), HelmError>;

    /// Current user-supplied values as YAML
    async fn get_values(&self, release: &str, namespace: &str) -> Result<String, HelmError>;
}
