//! # Cluster Operations
//!
//! The cluster reads and writes the lifecycle needs beyond the chart engine:
//! namespaces, the image pull secret, override sources and workload readiness.

mod kubernetes;

pub use kubernetes::KubeCluster;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("{kind} {namespace}/{name} has no key {key}")]
    MissingKey {
        kind: String,
        namespace: String,
        name: String,
        key: String,
    },
    #[error("{0}")]
    Other(String),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        match self {
            ClusterError::NotFound { .. } | ClusterError::MissingKey { .. } => true,
            ClusterError::Api(kube::Error::Api(response)) => response.code == 404,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    DaemonSet,
}

impl WorkloadKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::DaemonSet => "DaemonSet",
        }
    }
}

/// A workload whose available replicas gate component readiness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessObject {
    pub kind: WorkloadKind,
    pub namespace: String,
    pub name: String,
}

impl ReadinessObject {
    pub fn deployment(namespace: &str, name: &str) -> Self {
        Self::new(WorkloadKind::Deployment, namespace, name)
    }

    pub fn stateful_set(namespace: &str, name: &str) -> Self {
        Self::new(WorkloadKind::StatefulSet, namespace, name)
    }

    pub fn daemon_set(namespace: &str, name: &str) -> Self {
        Self::new(WorkloadKind::DaemonSet, namespace, name)
    }

    fn new(kind: WorkloadKind, namespace: &str, name: &str) -> Self {
        Self {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Create a namespace; one that already exists is success
    async fn ensure_namespace(&self, namespace: &str) -> Result<(), ClusterError>;

    /// Copy a secret into another namespace
    ///
    /// Returns `false` when the source secret does not exist. A target that already
    /// exists is success.
    async fn copy_secret(
        &self,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> Result<bool, ClusterError>;

    async fn config_map_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<String, ClusterError>;

    async fn secret_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<String, ClusterError>;

    /// True when every object has at least `min_replicas` available
    async fn workloads_ready(
        &self,
        objects: &[ReadinessObject],
        min_replicas: i32,
    ) -> Result<bool, ClusterError>;
}
