//! # Component Context
//!
//! Everything one reconcile pass hands to a component: the desired state, the BOM,
//! the image environment and the chart and cluster backends.

use crate::bom::{Bom, ImageEnv};
use crate::cluster::ClusterOps;
use crate::config::ControllerConfig;
use crate::crd::{LogLevel, LoggingConfig, Platform};
use crate::helm::ChartBackend;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Controller settings the lifecycle reads
#[derive(Debug, Clone)]
pub struct ComponentSettings {
    /// Root that relative chart directories and values files resolve against
    pub charts_dir: PathBuf,
    /// Directory for temp override files
    pub overrides_tmp_dir: PathBuf,
    pub helm_timeout: Duration,
    pub global_pull_secret_name: String,
    pub global_pull_secret_namespace: String,
}

impl Default for ComponentSettings {
    fn default() -> Self {
        Self::from_config(&ControllerConfig::default())
    }
}

impl ComponentSettings {
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            charts_dir: config.charts_dir.clone(),
            overrides_tmp_dir: config.overrides_tmp_dir.clone(),
            helm_timeout: config.helm_timeout_duration(),
            global_pull_secret_name: config.global_pull_secret_name.clone(),
            global_pull_secret_namespace: config.global_pull_secret_namespace.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ComponentContext {
    pub platform: Arc<Platform>,
    pub bom: Arc<Bom>,
    pub image_env: ImageEnv,
    pub charts: Arc<dyn ChartBackend>,
    pub cluster: Arc<dyn ClusterOps>,
    pub settings: ComponentSettings,
}

impl std::fmt::Debug for ComponentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentContext")
            .field("platform", &self.platform.metadata.name)
            .field("bom_version", &self.bom.version())
            .field("image_env", &self.image_env)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ComponentContext {
    pub fn new(
        platform: Arc<Platform>,
        bom: Arc<Bom>,
        image_env: ImageEnv,
        charts: Arc<dyn ChartBackend>,
        cluster: Arc<dyn ClusterOps>,
        settings: ComponentSettings,
    ) -> Self {
        Self {
            platform,
            bom,
            image_env,
            charts,
            cluster,
            settings,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Namespace of the platform resource, where override ConfigMaps and Secrets live
    pub fn platform_namespace(&self) -> &str {
        self.platform
            .metadata
            .namespace
            .as_deref()
            .unwrap_or("default")
    }

    /// Version the platform should be at: `spec.version`, or the BOM version
    pub fn desired_version(&self) -> String {
        self.platform
            .spec
            .version
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.bom.version())
            .to_string()
    }

    /// Version currently installed, empty before the first install completes
    pub fn installed_version(&self) -> &str {
        self.platform.installed_version()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.platform.logging()
    }

    /// True when lifecycle transitions are logged at INFO for this platform
    pub fn logs_lifecycle(&self) -> bool {
        self.logging().components.should_log(&LogLevel::Info)
    }
}
