//! # Configuration
//!
//! Operator and server configuration loaded from the environment.
//!
//! - `controller`: reconciler, BOM, helm and requeue settings
//! - `server`: HTTP server for metrics and probes

mod controller;
mod server;

pub use controller::ControllerConfig;
pub use server::ServerConfig;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared operator configuration
pub type SharedControllerConfig = Arc<RwLock<ControllerConfig>>;

/// Shared server configuration
pub type SharedServerConfig = Arc<RwLock<ServerConfig>>;

/// Create shared configuration from the environment
pub fn create_shared_config() -> (SharedControllerConfig, SharedServerConfig) {
    (
        Arc::new(RwLock::new(ControllerConfig::from_env())),
        Arc::new(RwLock::new(ServerConfig::from_env())),
    )
}
