//! # Components
//!
//! A component is one separately packaged, separately versioned piece of the platform.
//! Every component is a [`HelmComponent`] configured with optional hooks; the
//! [`Component`] trait delegates to it by default so a component only overrides the
//! operations it handles differently.

mod context;
mod helm_component;

pub use context::{ComponentContext, ComponentSettings};
pub use helm_component::{
    AppendOverridesHook, EnabledByDefaultHook, HelmComponent, HookFuture, LifecycleHook, ReadyCheckHook,
    ResolveNamespaceHook, ValidateUpdateHook,
};

use crate::crd::Platform;
use async_trait::async_trait;
use thiserror::Error;

/// Component failure taxonomy
///
/// A failed helm release is not an error: it triggers the reset-before-retry path.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// Invalid configuration; fails the pass and is retried through the error backoff
    #[error("component {component}: {message}")]
    Config { component: String, message: String },
    /// Transient failure; the pass requeues with a short jittered delay
    #[error("component {component}: {message}")]
    Retryable { component: String, message: String },
    /// Rejected update; reported and not retried
    #[error("{0}")]
    Policy(String),
}

impl ComponentError {
    pub fn config(component: &str, message: impl Into<String>) -> Self {
        ComponentError::Config {
            component: component.to_string(),
            message: message.into(),
        }
    }

    pub fn retryable(component: &str, message: impl Into<String>) -> Self {
        ComponentError::Retryable {
            component: component.to_string(),
            message: message.into(),
        }
    }

    pub fn policy(message: impl Into<String>) -> Self {
        ComponentError::Policy(message.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ComponentError::Retryable { .. })
    }
}

#[async_trait]
pub trait Component: Send + Sync {
    /// The helm base every lifecycle operation delegates to
    fn helm(&self) -> &HelmComponent;

    fn name(&self) -> &str {
        &self.helm().release_name
    }

    fn namespace(&self, ctx: &ComponentContext) -> String {
        self.helm().resolve_namespace(ctx)
    }

    fn dependencies(&self) -> &[String] {
        &self.helm().dependencies
    }

    fn min_platform_version(&self) -> &str {
        &self.helm().min_platform_version
    }

    /// Re-apply when the platform resource changes after the component is ready
    fn monitor_overrides(&self) -> bool {
        self.helm().monitor_overrides
    }

    fn is_enabled(&self, platform: &Platform) -> bool {
        self.helm().is_enabled(platform)
    }

    async fn is_installed(&self, ctx: &ComponentContext) -> Result<bool, ComponentError> {
        self.helm().is_installed(ctx).await
    }

    async fn is_ready(&self, ctx: &ComponentContext) -> Result<bool, ComponentError> {
        self.helm().is_ready(ctx).await
    }

    async fn pre_install(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        self.helm().pre_install(ctx).await
    }

    async fn install(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        self.helm().install(ctx).await
    }

    async fn post_install(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        self.helm().post_install(ctx).await
    }

    async fn pre_upgrade(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        self.helm().pre_upgrade(ctx).await
    }

    async fn upgrade(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        self.helm().upgrade(ctx).await
    }

    async fn post_upgrade(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        self.helm().post_upgrade(ctx).await
    }

    async fn uninstall(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        self.helm().uninstall(ctx).await
    }

    /// Reject an update from `old` to `new`
    fn validate_update(&self, old: &Platform, new: &Platform) -> Result<(), ComponentError> {
        self.helm().validate_update(old, new)
    }
}

impl Component for HelmComponent {
    fn helm(&self) -> &HelmComponent {
        self
    }
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name())
            .field("dependencies", &self.dependencies())
            .finish_non_exhaustive()
    }
}
