//! # Controller Configuration
//!
//! Operator-level settings loaded from environment variables.

use crate::bom::ImageEnv;
use std::path::PathBuf;
use std::time::Duration;

/// Operator-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Location of the Bill of Materials
    pub bom_path: PathBuf,
    /// Location of the module catalog
    pub catalog_path: PathBuf,
    /// Directory holding component charts (chart dirs are resolved relative to it)
    pub charts_dir: PathBuf,
    /// Helm binary used by the chart backend
    pub helm_binary: String,
    /// Timeout passed to helm for install/upgrade (seconds)
    pub helm_timeout_secs: u64,
    /// Attempts per helm command
    pub helm_max_retries: u32,
    /// Registry override (`REGISTRY`), wins over every BOM registry
    pub registry_override: Option<String>,
    /// Repository prefix override (`IMAGE_REPO`)
    pub image_repo_override: Option<String>,
    /// Application operator image override (`APP_OPERATOR_IMAGE`)
    pub app_operator_image: Option<String>,
    /// Directory for generated override files
    pub overrides_tmp_dir: PathBuf,
    /// Cluster-wide image pull secret
    pub global_pull_secret_name: String,
    /// Namespace of the cluster-wide image pull secret
    pub global_pull_secret_namespace: String,
    /// Jittered requeue lower bound (seconds)
    pub requeue_min_secs: u64,
    /// Jittered requeue upper bound (seconds)
    pub requeue_max_secs: u64,
    /// Periodic reconcile interval after convergence (seconds)
    pub reconcile_interval_secs: u64,
    /// Watch stream backoff starting value (milliseconds)
    pub backoff_start_ms: u64,
    /// Watch stream backoff maximum value (milliseconds)
    pub backoff_max_ms: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after the stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Namespace the operator is deployed in
    pub controller_namespace: String,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE)
    pub log_level: String,
    /// Enable metrics collection
    pub enable_metrics: bool,
    /// Maximum concurrent reconciliations
    pub max_concurrent_reconciliations: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            bom_path: PathBuf::from(DEFAULT_BOM_PATH),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            charts_dir: PathBuf::from(DEFAULT_CHARTS_DIR),
            helm_binary: DEFAULT_HELM_BINARY.to_string(),
            helm_timeout_secs: DEFAULT_HELM_TIMEOUT_SECS,
            helm_max_retries: DEFAULT_HELM_MAX_RETRIES,
            registry_override: None,
            image_repo_override: None,
            app_operator_image: None,
            overrides_tmp_dir: std::env::temp_dir(),
            global_pull_secret_name: DEFAULT_GLOBAL_PULL_SECRET_NAME.to_string(),
            global_pull_secret_namespace: DEFAULT_GLOBAL_PULL_SECRET_NAMESPACE.to_string(),
            requeue_min_secs: DEFAULT_REQUEUE_MIN_SECS,
            requeue_max_secs: DEFAULT_REQUEUE_MAX_SECS,
            reconcile_interval_secs: DEFAULT_RECONCILE_INTERVAL_SECS,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            controller_namespace: DEFAULT_CONTROLLER_NAMESPACE.to_string(),
            log_level: "INFO".to_string(),
            enable_metrics: true,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            bom_path: PathBuf::from(env_var_or_default_str("BOM_PATH", DEFAULT_BOM_PATH)),
            catalog_path: PathBuf::from(env_var_or_default_str(
                "CATALOG_PATH",
                DEFAULT_CATALOG_PATH,
            )),
            charts_dir: PathBuf::from(env_var_or_default_str("CHARTS_DIR", DEFAULT_CHARTS_DIR)),
            helm_binary: env_var_or_default_str("HELM_BINARY", DEFAULT_HELM_BINARY),
            helm_timeout_secs: env_var_or_default("HELM_TIMEOUT_SECS", DEFAULT_HELM_TIMEOUT_SECS),
            helm_max_retries: env_var_or_default("HELM_MAX_RETRIES", DEFAULT_HELM_MAX_RETRIES),
            registry_override: env_var_non_empty("REGISTRY"),
            image_repo_override: env_var_non_empty("IMAGE_REPO"),
            app_operator_image: env_var_non_empty("APP_OPERATOR_IMAGE"),
            overrides_tmp_dir: env_var_non_empty("OVERRIDES_TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            global_pull_secret_name: env_var_or_default_str(
                "GLOBAL_PULL_SECRET_NAME",
                DEFAULT_GLOBAL_PULL_SECRET_NAME,
            ),
            global_pull_secret_namespace: env_var_or_default_str(
                "GLOBAL_PULL_SECRET_NAMESPACE",
                DEFAULT_GLOBAL_PULL_SECRET_NAMESPACE,
            ),
            requeue_min_secs: env_var_or_default("REQUEUE_MIN_SECS", DEFAULT_REQUEUE_MIN_SECS),
            requeue_max_secs: env_var_or_default("REQUEUE_MAX_SECS", DEFAULT_REQUEUE_MAX_SECS),
            reconcile_interval_secs: env_var_or_default(
                "RECONCILE_INTERVAL_SECS",
                DEFAULT_RECONCILE_INTERVAL_SECS,
            ),
            backoff_start_ms: env_var_or_default("BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: env_var_or_default("BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_restart_delay_after_end_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
            controller_namespace: env_var_or_default_str(
                "POD_NAMESPACE",
                DEFAULT_CONTROLLER_NAMESPACE,
            ),
            log_level: env_var_or_default_str("LOG_LEVEL", "INFO"),
            enable_metrics: env_var_or_default_bool("ENABLE_METRICS", true),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
        }
    }

    /// Image environment derived from the registry/repository overrides
    #[must_use]
    pub fn image_env(&self) -> ImageEnv {
        ImageEnv {
            registry: self.registry_override.clone(),
            image_repo: self.image_repo_override.clone(),
            app_operator_image: self.app_operator_image.clone(),
        }
    }

    /// Get the requeue delay bounds as durations
    pub fn requeue_bounds(&self) -> (Duration, Duration) {
        let min = self.requeue_min_secs.min(self.requeue_max_secs);
        (
            Duration::from_secs(min),
            Duration::from_secs(self.requeue_max_secs.max(min)),
        )
    }

    /// Get the periodic reconcile interval
    pub fn reconcile_interval_duration(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }

    /// Get helm timeout duration
    pub fn helm_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.helm_timeout_secs)
    }

    /// Get watch restart delay duration
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get backoff start duration
    pub fn backoff_start_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_start_ms)
    }
}

/// Read environment variable or return default value
pub(crate) fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as boolean or return default
pub(crate) fn env_var_or_default_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| {
            let v_lower = v.to_lowercase();
            v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
        })
        .unwrap_or(default)
}

/// Read environment variable as string or return default
pub(crate) fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read environment variable, treating empty values as unset
pub(crate) fn env_var_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_requeue_bounds() {
        let config = ControllerConfig::default();
        let (min, max) = config.requeue_bounds();
        assert_eq!(min, Duration::from_secs(3));
        assert_eq!(max, Duration::from_secs(5));
    }

    #[test]
    fn test_requeue_bounds_swapped_values() {
        // A misconfigured max below min collapses to a fixed delay
        let config = ControllerConfig {
            requeue_min_secs: 8,
            requeue_max_secs: 2,
            ..ControllerConfig::default()
        };
        let (min, max) = config.requeue_bounds();
        assert_eq!(min, Duration::from_secs(2));
        assert_eq!(max, Duration::from_secs(2));
    }

    #[test]
    fn test_image_env_from_config() {
        let config = ControllerConfig {
            registry_override: Some("myreg.io".to_string()),
            image_repo_override: Some("mirror".to_string()),
            ..ControllerConfig::default()
        };
        let env = config.image_env();
        assert_eq!(env.registry.as_deref(), Some("myreg.io"));
        assert_eq!(env.image_repo.as_deref(), Some("mirror"));
        assert!(env.app_operator_image.is_none());
    }
}
