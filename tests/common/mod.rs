//! Shared fixtures for the integration tests
//!
//! In-memory chart and cluster backends that record every call, plus a fixture BOM.

#![allow(dead_code, reason = "each test binary uses a subset of the fixtures")]

use async_trait::async_trait;
use platform_operator::bom::{Bom, ImageEnv};
use platform_operator::cluster::{ClusterError, ClusterOps, ReadinessObject};
use platform_operator::component::{ComponentContext, ComponentSettings};
use platform_operator::controller::reconciler::{build_status, PassReport};
use platform_operator::crd::{Platform, PlatformSpec};
use platform_operator::helm::{ChartBackend, ChartRequest, HelmError, ReleaseStatus};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const FIXTURE_BOM: &str = r#"{
    "registry": "ghcr.io",
    "version": "1.1.0",
    "components": [
        {
            "name": "verrazzano-application-operator",
            "version": "1.1.0",
            "subcomponents": [
                {
                    "name": "verrazzano-application-operator",
                    "repository": "verrazzano",
                    "images": [
                        { "image": "verrazzano-application-operator", "tag": "1.1.0-20230405120102-f7d4b1a", "helmFullImageKey": "image" }
                    ]
                }
            ]
        },
        {
            "name": "istio",
            "version": "1.15.3",
            "subcomponents": [
                {
                    "name": "istiod",
                    "repository": "verrazzano",
                    "images": [
                        { "image": "pilot", "tag": "1.15.3", "helmFullImageKey": "values.pilot.image" },
                        { "image": "proxyv2", "tag": "1.15.3", "helmImageKey": "values.global.proxy.image", "helmTagKey": "values.global.tag", "helmRegistryAndRepoKey": "values.global.hub" }
                    ]
                }
            ]
        },
        {
            "name": "external-dns",
            "version": "0.12.2",
            "subcomponents": [
                {
                    "name": "external-dns",
                    "registry": "docker.io",
                    "repository": "bitnami",
                    "images": [
                        { "image": "external-dns", "tag": "0.12.2", "helmRegKey": "image.registry", "helmImageKey": "image.repository", "helmTagKey": "image.tag" }
                    ]
                }
            ]
        },
        {
            "name": "precedence",
            "version": "0.1.0",
            "subcomponents": [
                {
                    "name": "precedence",
                    "repository": "test",
                    "images": [
                        { "image": "precedence", "tag": "0.1.0", "helmFullImageKey": "a" }
                    ]
                }
            ]
        }
    ]
}"#;

pub fn fixture_bom() -> Arc<Bom> {
    Arc::new(Bom::from_json_str(FIXTURE_BOM).expect("fixture BOM parses"))
}

/// Chart backend keeping release state in memory
#[derive(Debug, Default)]
pub struct FakeCharts {
    releases: Mutex<BTreeMap<String, ReleaseStatus>>,
    calls: Mutex<Vec<String>>,
    requests: Mutex<Vec<ChartRequest>>,
}

impl FakeCharts {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_status(&self, release: &str, status: ReleaseStatus) {
        self.releases
            .lock()
            .unwrap()
            .insert(release.to_string(), status);
    }

    pub fn status(&self, release: &str) -> ReleaseStatus {
        self.releases
            .lock()
            .unwrap()
            .get(release)
            .cloned()
            .unwrap_or(ReleaseStatus::NotFound)
    }

    /// Every call as `operation:release`, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, release: &str) -> Vec<String> {
        let suffix = format!(":{release}");
        self.calls()
            .into_iter()
            .filter(|c| c.ends_with(&suffix))
            .collect()
    }

    pub fn requests(&self) -> Vec<ChartRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, operation: &str, release: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{operation}:{release}"));
    }
}

#[async_trait]
impl ChartBackend for FakeCharts {
    async fn release_status(
        &self,
        release: &str,
        _namespace: &str,
    ) -> Result<ReleaseStatus, HelmError> {
        Ok(self.status(release))
    }

    async fn upgrade_install(&self, request: &ChartRequest) -> Result<(), HelmError> {
        self.record("upgrade_install", &request.release_name);
        self.requests.lock().unwrap().push(request.clone());
        self.set_status(&request.release_name, ReleaseStatus::Deployed);
        Ok(())
    }

    async fn uninstall(&self, release: &str, _namespace: &str) -> Result<(), HelmError> {
        self.record("uninstall", release);
        self.set_status(release, ReleaseStatus::NotFound);
        Ok(())
    }

    async fn get_values(&self, release: &str, _namespace: &str) -> Result<String, HelmError> {
        self.record("get_values", release);
        Ok("replicas: 1\n".to_string())
    }
}

/// Cluster backend with configurable readiness and override sources
#[derive(Debug, Default)]
pub struct FakeCluster {
    not_ready: Mutex<BTreeSet<String>>,
    config_maps: Mutex<BTreeMap<(String, String), String>>,
    namespaces: Mutex<Vec<String>>,
    /// Whether the global pull secret exists to be copied
    pull_secret: Mutex<bool>,
    copied_secrets: Mutex<Vec<String>>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Keep the workload named `name` below its minimum replicas
    pub fn set_not_ready(&self, name: &str) {
        self.not_ready.lock().unwrap().insert(name.to_string());
    }

    pub fn set_ready(&self, name: &str) {
        self.not_ready.lock().unwrap().remove(name);
    }

    pub fn add_config_map(&self, name: &str, key: &str, document: &str) {
        self.config_maps
            .lock()
            .unwrap()
            .insert((name.to_string(), key.to_string()), document.to_string());
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces.lock().unwrap().clone()
    }

    pub fn set_pull_secret(&self, present: bool) {
        *self.pull_secret.lock().unwrap() = present;
    }

    /// Copies as `source_ns/name->target_ns`
    pub fn copied_secrets(&self) -> Vec<String> {
        self.copied_secrets.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterOps for FakeCluster {
    async fn ensure_namespace(&self, namespace: &str) -> Result<(), ClusterError> {
        self.namespaces.lock().unwrap().push(namespace.to_string());
        Ok(())
    }

    async fn copy_secret(
        &self,
        source_namespace: &str,
        name: &str,
        target_namespace: &str,
    ) -> Result<bool, ClusterError> {
        if !*self.pull_secret.lock().unwrap() {
            return Ok(false);
        }
        self.copied_secrets
            .lock()
            .unwrap()
            .push(format!("{source_namespace}/{name}->{target_namespace}"));
        Ok(true)
    }

    async fn config_map_value(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
    ) -> Result<String, ClusterError> {
        self.config_maps
            .lock()
            .unwrap()
            .get(&(name.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound {
                kind: "ConfigMap".to_string(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn secret_value(
        &self,
        namespace: &str,
        name: &str,
        _key: &str,
    ) -> Result<String, ClusterError> {
        Err(ClusterError::NotFound {
            kind: "Secret".to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    async fn workloads_ready(
        &self,
        objects: &[ReadinessObject],
        _min_replicas: i32,
    ) -> Result<bool, ClusterError> {
        let not_ready = self.not_ready.lock().unwrap();
        Ok(objects.iter().all(|o| !not_ready.contains(&o.name)))
    }
}

pub fn settings(tmp: &Path) -> ComponentSettings {
    ComponentSettings {
        charts_dir: tmp.join("charts"),
        overrides_tmp_dir: tmp.join("overrides"),
        ..ComponentSettings::default()
    }
}

pub fn platform(spec: PlatformSpec) -> Platform {
    let mut platform = Platform::new("platform", spec);
    platform.metadata.namespace = Some("default".to_string());
    platform.metadata.generation = Some(1);
    platform
}

pub fn context(
    platform: &Platform,
    charts: &Arc<FakeCharts>,
    cluster: &Arc<FakeCluster>,
    tmp: &Path,
) -> ComponentContext {
    let charts: Arc<dyn ChartBackend> = Arc::clone(charts) as Arc<dyn ChartBackend>;
    let cluster: Arc<dyn ClusterOps> = Arc::clone(cluster) as Arc<dyn ClusterOps>;
    ComponentContext::new(
        Arc::new(platform.clone()),
        fixture_bom(),
        ImageEnv::default(),
        charts,
        cluster,
        settings(tmp),
    )
}

/// Write a pass report back as the platform status, as the reconciler does
pub fn apply_report(platform: &mut Platform, report: &PassReport) {
    platform.status = Some(build_status(platform, report));
}
