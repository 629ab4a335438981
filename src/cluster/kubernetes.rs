//! # Kubernetes Cluster
//!
//! [`ClusterOps`] over the Kubernetes API.

use super::{ClusterError, ClusterOps, ReadinessObject, WorkloadKind};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::Client;
use tracing::{debug, info};

#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl std::fmt::Debug for KubeCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCluster").finish_non_exhaustive()
    }
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn available_replicas(
        &self,
        object: &ReadinessObject,
    ) -> Result<Option<i32>, ClusterError> {
        let result = match object.kind {
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), &object.namespace);
                api.get_opt(&object.name).await?.map(|d| {
                    d.status
                        .and_then(|s| s.available_replicas)
                        .unwrap_or(0)
                })
            }
            WorkloadKind::StatefulSet => {
                let api: Api<StatefulSet> =
                    Api::namespaced(self.client.clone(), &object.namespace);
                api.get_opt(&object.name)
                    .await?
                    .map(|s| s.status.and_then(|s| s.ready_replicas).unwrap_or(0))
            }
            WorkloadKind::DaemonSet => {
                let api: Api<DaemonSet> = Api::namespaced(self.client.clone(), &object.namespace);
                api.get_opt(&object.name)
                    .await?
                    .map(|d| d.status.and_then(|s| s.number_available).unwrap_or(0))
            }
        };
        Ok(result)
    }
}

fn is_conflict(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 409)
}

#[async_trait]
impl ClusterOps for KubeCluster {
    async fn ensure_namespace(&self, namespace: &str) -> Result<(), ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let ns = Namespace {
            metadata: ObjectMeta {
                name: Some(namespace.to_string()),
                ..ObjectMeta::default()
            },
            ..Namespace::default()
        };
        match api.create(&PostParams::default(), &ns).await {
            Ok(_) => {
                info!("Created namespace {}", namespace);
                Ok(())
            }
            Err(e) if is_conflict(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn copy_secret(
        &self,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> Result<bool, ClusterError> {
        let source_api: Api<Secret> = Api::namespaced(self.client.clone(), source_namespace);
        let Some(source) = source_api.get_opt(name).await? else {
            debug!("Secret {}/{} not found, nothing to copy", source_namespace, name);
            return Ok(false);
        };
        if source_namespace == target_namespace {
            return Ok(true);
        }

        let target = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(target_namespace.to_string()),
                ..ObjectMeta::default()
            },
            data: source.data,
            type_: source.type_,
            ..Secret::default()
        };
        let target_api: Api<Secret> = Api::namespaced(self.client.clone(), target_namespace);
        match target_api.create(&PostParams::default(), &target).await {
            Ok(_) => {
                info!(
                    "Copied secret {} from namespace {} to {}",
                    name, source_namespace, target_namespace
                );
                Ok(true)
            }
            Err(e) if is_conflict(&e) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }

    async fn config_map_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<String, ClusterError> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        let config_map = api.get_opt(name).await?.ok_or_else(|| ClusterError::NotFound {
            kind: "ConfigMap".to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })?;
        config_map
            .data
            .and_then(|mut data| data.remove(key))
            .ok_or_else(|| ClusterError::MissingKey {
                kind: "ConfigMap".to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                key: key.to_string(),
            })
    }

    async fn secret_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<String, ClusterError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api.get_opt(name).await?.ok_or_else(|| ClusterError::NotFound {
            kind: "Secret".to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })?;
        let bytes = secret
            .data
            .and_then(|mut data| data.remove(key))
            .ok_or_else(|| ClusterError::MissingKey {
                kind: "Secret".to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
                key: key.to_string(),
            })?;
        String::from_utf8(bytes.0).map_err(|e| {
            ClusterError::Other(format!(
                "Secret {namespace}/{name} key {key} is not valid UTF-8: {e}"
            ))
        })
    }

    async fn workloads_ready(
        &self,
        objects: &[ReadinessObject],
        min_replicas: i32,
    ) -> Result<bool, ClusterError> {
        for object in objects {
            match self.available_replicas(object).await? {
                Some(available) if available >= min_replicas => {}
                Some(available) => {
                    debug!(
                        "{} {}/{} has {} available replicas, expecting at least {}",
                        object.kind.as_str(),
                        object.namespace,
                        object.name,
                        available,
                        min_replicas
                    );
                    return Ok(false);
                }
                None => {
                    debug!(
                        "{} {}/{} not found",
                        object.kind.as_str(),
                        object.namespace,
                        object.name
                    );
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
