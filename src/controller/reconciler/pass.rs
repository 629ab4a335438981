//! # Reconcile Pass
//!
//! One pass drives every component one step through its lifecycle, in registry
//! order. The pass only talks to the cluster through the component context, so it
//! runs the same against the helm CLI and against in-memory backends.
//!
//! ## Lifecycle
//!
//! ```text
//! NotInstalled -> Installing -> InstalledNotReady -> Ready -> Upgrading -> Ready
//!                                                     |
//!                 Disabled <- Uninstalled <- Uninstalling
//! ```
//!
//! Dependencies are checked against the readiness snapshot taken when the pass
//! starts, so a dependency that becomes ready mid-pass unblocks its dependents on
//! the next pass.

use super::outcome::ReconcileOutcome;
use super::status::upsert_condition;
use crate::component::{Component, ComponentContext, ComponentError};
use crate::crd::{ComponentState, ComponentStatus, Condition, ConditionType};
use crate::registry::{ReadinessSnapshot, Registry, RegistryError};
use crate::version;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument};

/// Result of one pass
#[derive(Debug, Clone)]
pub struct PassReport {
    /// Component statuses after the pass, keyed by component name
    pub components: BTreeMap<String, ComponentStatus>,
    /// Platform conditions after the pass
    pub conditions: Vec<Condition>,
    /// Installed platform version after the pass
    pub version: Option<String>,
    pub outcome: ReconcileOutcome,
    /// Rejected updates, reported and not retried
    pub rejections: Vec<String>,
    /// Enabled components that are Ready
    pub ready_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    Settled,
    Pending,
}

/// Run one pass over `registry` for the platform in `ctx`
pub async fn run_pass(
    registry: &Registry,
    ctx: &ComponentContext,
    generation: i64,
    requeue_bounds: (Duration, Duration),
) -> PassReport {
    let platform = ctx.platform();
    let prior = platform.status.clone().unwrap_or_default();
    let desired = ctx.desired_version();

    let snapshot: ReadinessSnapshot = registry
        .iter()
        .map(|component| {
            let ready = component.is_enabled(platform)
                && prior
                    .components
                    .get(component.name())
                    .is_some_and(|s| s.state == ComponentState::Ready);
            (component.name().to_string(), ready)
        })
        .collect();

    let mut pass = Pass {
        registry,
        ctx,
        generation,
        desired,
        snapshot,
        conditions: prior.conditions.clone(),
        gated: BTreeSet::new(),
    };

    let mut components = prior.components.clone();
    let mut rejections = Vec::new();
    let mut pending = false;
    let mut fatal = None;

    for component in registry.iter() {
        let name = component.name().to_string();
        let mut status = components.get(&name).cloned().unwrap_or_default();
        let span = tracing::info_span!(
            "component.reconcile",
            component = name.as_str(),
            state = status.state.as_str()
        );
        let result = pass
            .step(component, &mut status)
            .instrument(span)
            .await;

        match result {
            Ok(Progress::Settled) => {}
            Ok(Progress::Pending) => pending = true,
            Err(e @ ComponentError::Retryable { .. }) => {
                warn!("Component {} did not converge, will retry: {}", name, e);
                status.message = Some(e.to_string());
                pending = true;
            }
            Err(ComponentError::Policy(message)) => {
                warn!("Update rejected for component {}: {}", name, message);
                status.message = Some(message.clone());
                rejections.push(message);
            }
            Err(e @ ComponentError::Config { .. }) => {
                error!("Component {} has an invalid configuration: {}", name, e);
                status.message = Some(e.to_string());
                components.insert(name, status);
                fatal = Some(e.to_string());
                break;
            }
        }
        components.insert(name, status);
    }

    let enabled: Vec<&Arc<dyn Component>> = registry
        .iter()
        .filter(|c| c.is_enabled(platform))
        .collect();
    let ready_count = enabled
        .iter()
        .filter(|c| {
            components
                .get(c.name())
                .is_some_and(|s| s.state == ComponentState::Ready)
        })
        .count();
    let converged = fatal.is_none()
        && enabled
            .iter()
            .filter(|c| !pass.gated.contains(c.name()))
            .all(|c| {
                components.get(c.name()).is_some_and(|s| {
                    s.state == ComponentState::Ready && s.version.as_deref() == Some(pass.desired.as_str())
                })
            });

    let version = if converged {
        Some(pass.desired.clone())
    } else {
        prior.version.clone()
    };

    // Gated components can only proceed once the installed version moves
    if !pass.gated.is_empty() && version != prior.version {
        pending = true;
    }

    let outcome = match fatal {
        Some(cause) => ReconcileOutcome::Fatal(cause),
        None if pending => ReconcileOutcome::retry_within(requeue_bounds),
        None => ReconcileOutcome::Complete,
    };

    PassReport {
        components,
        conditions: pass.conditions,
        version,
        outcome,
        rejections,
        ready_count,
    }
}

struct Pass<'a> {
    registry: &'a Registry,
    ctx: &'a ComponentContext,
    generation: i64,
    desired: String,
    snapshot: ReadinessSnapshot,
    conditions: Vec<Condition>,
    /// Components held back by their minimum platform version
    gated: BTreeSet<String>,
}

impl Pass<'_> {
    async fn step(
        &mut self,
        component: &Arc<dyn Component>,
        status: &mut ComponentStatus,
    ) -> Result<Progress, ComponentError> {
        let component = component.as_ref();
        if !component.is_enabled(self.ctx.platform()) {
            return self.step_disabled(component, status).await;
        }

        match status.state {
            ComponentState::Disabled
            | ComponentState::NotInstalled
            | ComponentState::Installing
            | ComponentState::Uninstalling
            | ComponentState::Uninstalled => self.install(component, status).await,
            ComponentState::InstalledNotReady => self.await_install(component, status).await,
            ComponentState::Ready => self.step_ready(component, status).await,
            ComponentState::Upgrading => {
                if status.version.as_deref() == Some(self.desired.as_str()) {
                    self.await_upgrade(component, status).await
                } else {
                    self.upgrade(component, status).await
                }
            }
        }
    }

    async fn install(
        &mut self,
        component: &dyn Component,
        status: &mut ComponentStatus,
    ) -> Result<Progress, ComponentError> {
        let name = component.name();
        let min_version = component.min_platform_version();
        if !min_version.is_empty()
            && !version::meets_minimum(min_version, self.ctx.installed_version())
        {
            if self.ctx.logs_lifecycle() {
                info!(
                    "Component {} cannot be installed until the platform is upgraded to at least version {}",
                    name, min_version
                );
            }
            status.transition(ComponentState::NotInstalled);
            self.gated.insert(name.to_string());
            return Ok(Progress::Settled);
        }

        if !self.dependencies_ready(component)? {
            status.transition(ComponentState::NotInstalled);
            return Ok(Progress::Pending);
        }

        self.apply_install(component, status).await
    }

    async fn apply_install(
        &mut self,
        component: &dyn Component,
        status: &mut ComponentStatus,
    ) -> Result<Progress, ComponentError> {
        let name = component.name();
        if self.ctx.logs_lifecycle() {
            info!("Installing component {}", name);
        }
        status.transition(ComponentState::Installing);
        status.reconciling_generation = self.generation;
        status.message = None;
        self.record(
            ConditionType::InstallStarted,
            format!("Install started for component {name}"),
        );

        component.pre_install(self.ctx).await?;
        component.install(self.ctx).await?;
        status.transition(ComponentState::InstalledNotReady);
        self.await_install(component, status).await
    }

    async fn await_install(
        &mut self,
        component: &dyn Component,
        status: &mut ComponentStatus,
    ) -> Result<Progress, ComponentError> {
        let name = component.name();
        if !component.is_ready(self.ctx).await? {
            debug!("Component {} is installed but not ready", name);
            return Ok(Progress::Pending);
        }

        component.post_install(self.ctx).await?;
        status.transition(ComponentState::Ready);
        status.version = Some(self.desired.clone());
        status.last_reconciled_generation = status.reconciling_generation;
        status.message = None;
        if self.ctx.logs_lifecycle() {
            info!("Component {} successfully installed", name);
        }
        self.record(
            ConditionType::InstallComplete,
            format!("Install complete for component {name}"),
        );
        Ok(Progress::Settled)
    }

    async fn step_ready(
        &mut self,
        component: &dyn Component,
        status: &mut ComponentStatus,
    ) -> Result<Progress, ComponentError> {
        let name = component.name();
        if status.version.as_deref() != Some(self.desired.as_str()) {
            return self.upgrade(component, status).await;
        }

        if status.last_reconciled_generation != self.generation {
            if component.monitor_overrides() {
                if !self.dependencies_ready(component)? {
                    return Ok(Progress::Pending);
                }
                if self.ctx.logs_lifecycle() {
                    info!(
                        "Platform generation changed to {}, re-applying component {}",
                        self.generation, name
                    );
                }
                return self.apply_install(component, status).await;
            }
            status.last_reconciled_generation = self.generation;
            return Ok(Progress::Settled);
        }

        if component.is_ready(self.ctx).await? {
            return Ok(Progress::Settled);
        }
        warn!("Component {} is no longer ready", name);
        status.transition(ComponentState::InstalledNotReady);
        status.reconciling_generation = self.generation;
        Ok(Progress::Pending)
    }

    async fn upgrade(
        &mut self,
        component: &dyn Component,
        status: &mut ComponentStatus,
    ) -> Result<Progress, ComponentError> {
        let name = component.name();
        if !self.dependencies_ready(component)? {
            return Ok(Progress::Pending);
        }

        if status.state != ComponentState::Upgrading {
            if self.ctx.logs_lifecycle() {
                info!(
                    "Upgrading component {} from version {} to {}",
                    name,
                    status.version.as_deref().unwrap_or("unknown"),
                    self.desired
                );
            }
            status.transition(ComponentState::Upgrading);
            status.reconciling_generation = self.generation;
            self.record(
                ConditionType::UpgradeStarted,
                format!("Upgrade started for component {name}"),
            );
        }

        component.pre_upgrade(self.ctx).await?;
        component.upgrade(self.ctx).await?;
        component.post_upgrade(self.ctx).await?;
        status.version = Some(self.desired.clone());
        self.await_upgrade(component, status).await
    }

    async fn await_upgrade(
        &mut self,
        component: &dyn Component,
        status: &mut ComponentStatus,
    ) -> Result<Progress, ComponentError> {
        let name = component.name();
        if !component.is_ready(self.ctx).await? {
            debug!("Component {} is upgraded but not ready", name);
            return Ok(Progress::Pending);
        }
        status.transition(ComponentState::Ready);
        status.last_reconciled_generation = status.reconciling_generation;
        status.message = None;
        if self.ctx.logs_lifecycle() {
            info!("Component {} successfully upgraded", name);
        }
        self.record(
            ConditionType::UpgradeComplete,
            format!("Upgrade complete for component {name}"),
        );
        Ok(Progress::Settled)
    }

    async fn step_disabled(
        &mut self,
        component: &dyn Component,
        status: &mut ComponentStatus,
    ) -> Result<Progress, ComponentError> {
        match status.state {
            ComponentState::Installing
            | ComponentState::InstalledNotReady
            | ComponentState::Ready
            | ComponentState::Upgrading
            | ComponentState::Uninstalling => self.uninstall(component, status).await,
            ComponentState::Uninstalled => Ok(Progress::Settled),
            ComponentState::Disabled | ComponentState::NotInstalled => {
                status.transition(ComponentState::Disabled);
                Ok(Progress::Settled)
            }
        }
    }

    async fn uninstall(
        &mut self,
        component: &dyn Component,
        status: &mut ComponentStatus,
    ) -> Result<Progress, ComponentError> {
        let name = component.name();
        let platform = self.ctx.platform();
        component.validate_update(&platform.with_component_enabled(name, true), platform)?;

        if status.state != ComponentState::Uninstalling {
            if self.ctx.logs_lifecycle() {
                info!("Uninstalling disabled component {}", name);
            }
            status.transition(ComponentState::Uninstalling);
            self.record(
                ConditionType::UninstallStarted,
                format!("Uninstall started for component {name}"),
            );
        }

        component.uninstall(self.ctx).await?;
        status.transition(ComponentState::Uninstalled);
        status.version = None;
        status.message = None;
        self.record(
            ConditionType::UninstallComplete,
            format!("Uninstall complete for component {name}"),
        );
        Ok(Progress::Settled)
    }

    /// Direct dependencies ready in the snapshot; graph errors are configuration errors
    fn dependencies_ready(&self, component: &dyn Component) -> Result<bool, ComponentError> {
        match self.registry.check_dependencies(component, &self.snapshot) {
            Ok(()) => Ok(true),
            Err(RegistryError::NotReady {
                component,
                dependencies,
            }) => {
                if self.ctx.logs_lifecycle() {
                    info!(
                        "Component {} waiting for dependencies {:?} to be ready",
                        component, dependencies
                    );
                }
                Ok(false)
            }
            Err(e) => Err(ComponentError::config(component.name(), e.to_string())),
        }
    }

    fn record(&mut self, condition: ConditionType, message: String) {
        upsert_condition(
            &mut self.conditions,
            condition.as_str(),
            "True",
            condition.as_str(),
            &message,
        );
    }
}
