//! # Platform Status
//!
//! Per-component lifecycle state and platform-wide conditions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of the Platform resource
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    /// Current phase
    /// Values: Pending, Installing, Upgrading, Ready, Failed, Suspended
    #[serde(default)]
    pub phase: Option<String>,
    /// Human-readable description of the current state
    #[serde(default)]
    pub description: Option<String>,
    /// Latest lifecycle conditions, one per type
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Platform version installed once every enabled component is ready
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last reconciliation time (RFC3339)
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
    /// Lifecycle state keyed by component name
    #[serde(default)]
    pub components: BTreeMap<String, ComponentStatus>,
}

/// Lifecycle state of one component
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    pub state: ComponentState,
    /// Platform version the component was last applied at
    #[serde(default)]
    pub version: Option<String>,
    /// Generation the component last reached Ready at
    #[serde(default)]
    pub last_reconciled_generation: i64,
    /// Generation of the install or upgrade in progress
    #[serde(default)]
    pub reconciling_generation: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub last_transition_time: Option<String>,
}

impl ComponentStatus {
    /// Move to `state`, stamping the transition time when the state changes
    pub fn transition(&mut self, state: ComponentState) {
        if self.state != state {
            self.state = state;
            self.last_transition_time = Some(chrono::Utc::now().to_rfc3339());
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, Hash, schemars::JsonSchema)]
pub enum ComponentState {
    Disabled,
    #[default]
    NotInstalled,
    Installing,
    InstalledNotReady,
    Ready,
    Upgrading,
    Uninstalling,
    Uninstalled,
}

impl ComponentState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentState::Disabled => "Disabled",
            ComponentState::NotInstalled => "NotInstalled",
            ComponentState::Installing => "Installing",
            ComponentState::InstalledNotReady => "InstalledNotReady",
            ComponentState::Ready => "Ready",
            ComponentState::Upgrading => "Upgrading",
            ComponentState::Uninstalling => "Uninstalling",
            ComponentState::Uninstalled => "Uninstalled",
        }
    }
}

impl std::fmt::Display for ComponentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    #[serde(default)]
    pub last_transition_time: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Condition types recorded on the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    InstallStarted,
    InstallComplete,
    UpgradeStarted,
    UpgradeComplete,
    UninstallStarted,
    UninstallComplete,
    Ready,
}

impl ConditionType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::InstallStarted => "InstallStarted",
            ConditionType::InstallComplete => "InstallComplete",
            ConditionType::UpgradeStarted => "UpgradeStarted",
            ConditionType::UpgradeComplete => "UpgradeComplete",
            ConditionType::UninstallStarted => "UninstallStarted",
            ConditionType::UninstallComplete => "UninstallComplete",
            ConditionType::Ready => "Ready",
        }
    }
}
