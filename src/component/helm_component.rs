//! # Helm Component
//!
//! The default component implementation: a helm release with optional hooks.
//!
//! Hooks are plain functions taking the context by reference and returning a boxed
//! future, e.g.
//!
//! ```rust,ignore
//! fn append_overrides<'a>(
//!     ctx: &'a ComponentContext,
//!     files: &'a OverrideFiles,
//!     kvs: Vec<KeyValue>,
//! ) -> HookFuture<'a, Vec<KeyValue>> {
//!     Box::pin(async move { Ok(kvs) })
//! }
//! ```

use super::{ComponentContext, ComponentError};
use crate::cluster::ReadinessObject;
use crate::crd::Platform;
use crate::helm::{ChartRequest, ReleaseStatus};
use crate::observability::metrics;
use crate::overrides::{build_overrides, KeyValue, OverrideFiles};
use futures::future::BoxFuture;
use std::path::PathBuf;
use tracing::{info, Instrument};

pub type HookFuture<'a, T> = BoxFuture<'a, Result<T, ComponentError>>;

pub type LifecycleHook =
    Box<dyn for<'a> Fn(&'a ComponentContext) -> HookFuture<'a, ()> + Send + Sync>;

/// Receives the accumulated overrides and returns the list to continue with
pub type AppendOverridesHook = Box<
    dyn for<'a> Fn(&'a ComponentContext, &'a OverrideFiles, Vec<KeyValue>) -> HookFuture<'a, Vec<KeyValue>>
        + Send
        + Sync,
>;

pub type ReadyCheckHook =
    Box<dyn for<'a> Fn(&'a ComponentContext) -> HookFuture<'a, bool> + Send + Sync>;

pub type ResolveNamespaceHook = Box<dyn Fn(&ComponentContext) -> String + Send + Sync>;

/// Computes the default enablement when the platform resource does not set one
pub type EnabledByDefaultHook = Box<dyn Fn(&Platform) -> bool + Send + Sync>;

pub type ValidateUpdateHook =
    Box<dyn Fn(&Platform, &Platform) -> Result<(), ComponentError> + Send + Sync>;

pub struct HelmComponent {
    pub release_name: String,
    /// Chart directory, relative to the charts root
    pub chart_dir: PathBuf,
    pub chart_namespace: String,
    /// Always install into `chart_namespace`, ignoring `spec.defaultNamespace`
    pub ignore_namespace_override: bool,
    /// Skip BOM image overrides
    pub ignore_image_overrides: bool,
    pub dependencies: Vec<String>,
    /// Minimum installed platform version before this component is installed
    pub min_platform_version: String,
    /// Base values file, relative to the charts root; lowest precedence
    pub values_file: Option<PathBuf>,
    /// Helm key that receives the image pull secret name
    pub image_pull_secret_key: Option<String>,
    pub wait_for_install: bool,
    pub skip_upgrade: bool,
    pub monitor_overrides: bool,
    pub enabled_by_default: bool,
    /// Disabling an installed component uninstalls it instead of being rejected
    pub allow_disable: bool,
    pub readiness_objects: Vec<ReadinessObject>,
    pub min_ready_replicas: i32,

    pub pre_install_hook: Option<LifecycleHook>,
    pub post_install_hook: Option<LifecycleHook>,
    pub pre_upgrade_hook: Option<LifecycleHook>,
    pub post_upgrade_hook: Option<LifecycleHook>,
    pub append_overrides_hook: Option<AppendOverridesHook>,
    pub ready_check_hook: Option<ReadyCheckHook>,
    pub resolve_namespace_hook: Option<ResolveNamespaceHook>,
    pub validate_update_hook: Option<ValidateUpdateHook>,
    pub enabled_by_default_hook: Option<EnabledByDefaultHook>,
}

impl std::fmt::Debug for HelmComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelmComponent")
            .field("release_name", &self.release_name)
            .field("chart_dir", &self.chart_dir)
            .field("chart_namespace", &self.chart_namespace)
            .field("dependencies", &self.dependencies)
            .field("readiness_objects", &self.readiness_objects)
            .finish_non_exhaustive()
    }
}

impl HelmComponent {
    pub fn new(release_name: &str, chart_dir: &str, chart_namespace: &str) -> Self {
        Self {
            release_name: release_name.to_string(),
            chart_dir: PathBuf::from(chart_dir),
            chart_namespace: chart_namespace.to_string(),
            ignore_namespace_override: false,
            ignore_image_overrides: false,
            dependencies: Vec::new(),
            min_platform_version: String::new(),
            values_file: None,
            image_pull_secret_key: None,
            wait_for_install: false,
            skip_upgrade: false,
            monitor_overrides: true,
            enabled_by_default: true,
            allow_disable: false,
            readiness_objects: Vec::new(),
            min_ready_replicas: 1,
            pre_install_hook: None,
            post_install_hook: None,
            pre_upgrade_hook: None,
            post_upgrade_hook: None,
            append_overrides_hook: None,
            ready_check_hook: None,
            resolve_namespace_hook: None,
            validate_update_hook: None,
            enabled_by_default_hook: None,
        }
    }

    pub fn resolve_namespace(&self, ctx: &ComponentContext) -> String {
        if let Some(hook) = &self.resolve_namespace_hook {
            return hook(ctx);
        }
        if !self.ignore_namespace_override {
            if let Some(ns) = ctx
                .platform
                .spec
                .default_namespace
                .as_deref()
                .filter(|ns| !ns.is_empty())
            {
                return ns.to_string();
            }
        }
        self.chart_namespace.clone()
    }

    pub fn chart_path(&self, ctx: &ComponentContext) -> PathBuf {
        ctx.settings.charts_dir.join(&self.chart_dir)
    }

    pub fn values_file_path(&self, ctx: &ComponentContext) -> Option<PathBuf> {
        self.values_file.as_ref().map(|file| {
            if file.is_absolute() {
                file.clone()
            } else {
                ctx.settings.charts_dir.join(file)
            }
        })
    }

    pub fn override_files(&self, ctx: &ComponentContext) -> OverrideFiles {
        OverrideFiles::for_release(&ctx.settings.overrides_tmp_dir, &self.release_name)
    }

    pub fn is_enabled(&self, platform: &Platform) -> bool {
        let default = match &self.enabled_by_default_hook {
            Some(hook) => hook(platform),
            None => self.enabled_by_default,
        };
        platform.component_enabled(&self.release_name, default)
    }

    pub(crate) fn retryable(&self, error: impl std::fmt::Display) -> ComponentError {
        ComponentError::retryable(&self.release_name, error.to_string())
    }

    pub async fn release_status(
        &self,
        ctx: &ComponentContext,
    ) -> Result<ReleaseStatus, ComponentError> {
        let namespace = self.resolve_namespace(ctx);
        ctx.charts
            .release_status(&self.release_name, &namespace)
            .await
            .map_err(|e| self.retryable(e))
    }

    pub async fn is_installed(&self, ctx: &ComponentContext) -> Result<bool, ComponentError> {
        Ok(self.release_status(ctx).await?.is_installed())
    }

    /// Installed, and every readiness object has its minimum replicas available
    pub async fn is_ready(&self, ctx: &ComponentContext) -> Result<bool, ComponentError> {
        if let Some(hook) = &self.ready_check_hook {
            return hook(ctx).await;
        }
        if !self.is_installed(ctx).await? {
            return Ok(false);
        }
        if self.readiness_objects.is_empty() {
            return Ok(true);
        }
        ctx.cluster
            .workloads_ready(&self.readiness_objects, self.min_ready_replicas)
            .await
            .map_err(|e| self.retryable(e))
    }

    /// Reset a failed release, create the namespace, then run the pre-install hook
    pub async fn pre_install(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        let namespace = self.resolve_namespace(ctx);
        if self.release_status(ctx).await? == ReleaseStatus::Failed {
            if ctx.logs_lifecycle() {
                info!(
                    "Release {} in namespace {} is in a failed state, uninstalling before retrying the install",
                    self.release_name, namespace
                );
            }
            ctx.charts
                .uninstall(&self.release_name, &namespace)
                .await
                .map_err(|e| self.retryable(e))?;
        }
        ctx.cluster
            .ensure_namespace(&namespace)
            .await
            .map_err(|e| self.retryable(e))?;
        run_lifecycle_hook(self.pre_install_hook.as_ref(), ctx).await
    }

    pub async fn install(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        let span = tracing::info_span!(
            "component.install",
            component = self.release_name.as_str(),
            namespace = self.resolve_namespace(ctx).as_str()
        );
        self.track("install", self.apply(ctx, self.wait_for_install, None))
            .instrument(span)
            .await
    }

    pub async fn post_install(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        run_lifecycle_hook(self.post_install_hook.as_ref(), ctx).await
    }

    pub async fn pre_upgrade(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        run_lifecycle_hook(self.pre_upgrade_hook.as_ref(), ctx).await
    }

    /// Upgrade on top of the values currently applied to the release
    pub async fn upgrade(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        if self.skip_upgrade {
            if ctx.logs_lifecycle() {
                info!(
                    "Skipping upgrade of component {} since skip_upgrade is set",
                    self.release_name
                );
            }
            return Ok(());
        }
        if !self.is_installed(ctx).await? {
            if ctx.logs_lifecycle() {
                info!(
                    "Skipping upgrade of component {} since it is not installed",
                    self.release_name
                );
            }
            return Ok(());
        }

        let namespace = self.resolve_namespace(ctx);
        let span = tracing::info_span!(
            "component.upgrade",
            component = self.release_name.as_str(),
            namespace = namespace.as_str()
        );
        let upgrade = async {
            let current_values = ctx
                .charts
                .get_values(&self.release_name, &namespace)
                .await
                .map_err(|e| self.retryable(e))?;
            self.apply(ctx, true, Some(current_values)).await
        };
        self.track("upgrade", upgrade).instrument(span).await
    }

    pub async fn post_upgrade(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        run_lifecycle_hook(self.post_upgrade_hook.as_ref(), ctx).await
    }

    /// Uninstall the release; a release that is not installed is success
    pub async fn uninstall(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        let namespace = self.resolve_namespace(ctx);
        if !self.is_installed(ctx).await? {
            if ctx.logs_lifecycle() {
                info!(
                    "Component {} is not installed in namespace {}, nothing to uninstall",
                    self.release_name, namespace
                );
            }
            return Ok(());
        }
        let uninstall = async {
            ctx.charts
                .uninstall(&self.release_name, &namespace)
                .await
                .map_err(|e| self.retryable(e))
        };
        self.track("uninstall", uninstall).await
    }

    /// Default rule: an enabled component cannot be disabled unless `allow_disable`
    pub fn validate_update(&self, old: &Platform, new: &Platform) -> Result<(), ComponentError> {
        if !self.allow_disable && self.is_enabled(old) && !self.is_enabled(new) {
            return Err(ComponentError::policy(format!(
                "Disabling component {} is not allowed",
                self.release_name
            )));
        }
        match &self.validate_update_hook {
            Some(hook) => hook(old, new),
            None => Ok(()),
        }
    }

    /// Build overrides, apply the chart, then remove the temp files
    async fn apply(
        &self,
        ctx: &ComponentContext,
        wait: bool,
        current_values: Option<String>,
    ) -> Result<(), ComponentError> {
        let files = self.override_files(ctx);
        let result = self.apply_with_files(ctx, &files, wait, current_values).await;
        files.cleanup();
        result
    }

    async fn apply_with_files(
        &self,
        ctx: &ComponentContext,
        files: &OverrideFiles,
        wait: bool,
        current_values: Option<String>,
    ) -> Result<(), ComponentError> {
        let mut overrides = build_overrides(self, ctx, files, Vec::new()).await?;
        if let Some(values) = current_values {
            let path = files.write(&values).map_err(|e| {
                self.retryable(format!("failed to write current values: {e}"))
            })?;
            overrides.files.insert(0, path);
        }

        let request = ChartRequest {
            release_name: self.release_name.clone(),
            namespace: self.resolve_namespace(ctx),
            chart_dir: self.chart_path(ctx),
            wait,
            timeout: ctx.settings.helm_timeout,
            overrides,
            log_level: ctx.logging().helm,
        };
        ctx.charts
            .upgrade_install(&request)
            .await
            .map_err(|e| self.retryable(e))
    }

    async fn track<F>(&self, operation: &str, future: F) -> Result<(), ComponentError>
    where
        F: std::future::Future<Output = Result<(), ComponentError>>,
    {
        metrics::increment_component_operations(&self.release_name, operation);
        let result = future.await;
        if result.is_err() {
            metrics::increment_component_operation_errors(&self.release_name, operation);
        }
        result
    }
}

async fn run_lifecycle_hook(
    hook: Option<&LifecycleHook>,
    ctx: &ComponentContext,
) -> Result<(), ComponentError> {
    match hook {
        Some(hook) => hook(ctx).await,
        None => Ok(()),
    }
}
