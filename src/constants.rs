//! # Constants
//!
//! Shared constants used throughout the operator.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default exponential backoff starting value for watch stream errors (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value for watch stream errors (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Lower bound of the jittered requeue delay used while components converge (seconds)
pub const DEFAULT_REQUEUE_MIN_SECS: u64 = 3;

/// Upper bound of the jittered requeue delay used while components converge (seconds)
pub const DEFAULT_REQUEUE_MAX_SECS: u64 = 5;

/// Periodic reconcile interval once every component is Ready (seconds)
pub const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;

/// Fibonacci backoff bounds for fatal reconciliation errors (minutes)
pub const DEFAULT_ERROR_BACKOFF_MIN_MINUTES: u64 = 1;
pub const DEFAULT_ERROR_BACKOFF_MAX_MINUTES: u64 = 10;

/// Default Bill of Materials location inside the operator image
pub const DEFAULT_BOM_PATH: &str = "manifests/platform-bom.json";

/// Default module catalog location inside the operator image
pub const DEFAULT_CATALOG_PATH: &str = "manifests/catalog.yaml";

/// Default directory holding the component charts
pub const DEFAULT_CHARTS_DIR: &str = "charts";

/// Default helm binary
pub const DEFAULT_HELM_BINARY: &str = "helm";

/// Default helm operation timeout (seconds)
pub const DEFAULT_HELM_TIMEOUT_SECS: u64 = 600;

/// Number of attempts for a helm command before giving up
pub const DEFAULT_HELM_MAX_RETRIES: u32 = 5;

/// Cluster-wide image pull secret copied into component namespaces
pub const DEFAULT_GLOBAL_PULL_SECRET_NAME: &str = "verrazzano-container-registry";

/// Namespace holding the cluster-wide image pull secret
pub const DEFAULT_GLOBAL_PULL_SECRET_NAMESPACE: &str = "default";

/// Default helm key for the image pull secret override
pub const DEFAULT_IMAGE_PULL_SECRET_KEY: &str = "global.imagePullSecrets[0]";

/// Default namespace the operator runs in
pub const DEFAULT_CONTROLLER_NAMESPACE: &str = "verrazzano-install";

/// Default maximum concurrent reconciliations
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;


/// Sentinel catalog version meaning "use the BOM platform version"
pub const BOM_VERSION_SENTINEL: &str = "${PLATFORM_VERSION}";

/// Field manager used for status patches
pub const FIELD_MANAGER: &str = "platform-operator";

/// Annotation that forces a reconcile pass even when the generation is unchanged
pub const RECONCILE_ANNOTATION: &str = "install.platform.octopilot.io/reconcile";
