//! # Logging Configuration
//!
//! Per-area log levels for the platform operator.

use serde::{Deserialize, Serialize};

/// Log level
///
/// DEBUG includes INFO, INFO includes WARN, WARN includes ERROR.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// True when a message at `requested_level` passes this configured level
    pub fn should_log(&self, requested_level: &LogLevel) -> bool {
        matches!(
            (self, requested_level),
            (LogLevel::Debug, _)
                | (LogLevel::Info, LogLevel::Info | LogLevel::Warn | LogLevel::Error)
                | (LogLevel::Warn, LogLevel::Warn | LogLevel::Error)
                | (LogLevel::Error, LogLevel::Error)
        )
    }
}

/// Log levels for each operator area
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Component lifecycle transitions (install, upgrade, uninstall)
    /// Default: INFO
    #[serde(default = "default_info_level")]
    pub components: LogLevel,
    /// Override pipeline output (image keys, files, resolved values)
    /// Default: WARN
    #[serde(default = "default_warn_level")]
    pub overrides: LogLevel,
    /// Helm command lines and results
    /// Default: INFO
    #[serde(default = "default_info_level")]
    pub helm: LogLevel,
    /// Reconciliation start, completion and requeues
    /// Default: INFO
    #[serde(default = "default_info_level")]
    pub reconciliation: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            components: LogLevel::Info,
            overrides: LogLevel::Warn,
            helm: LogLevel::Info,
            reconciliation: LogLevel::Info,
        }
    }
}

fn default_info_level() -> LogLevel {
    LogLevel::Info
}

fn default_warn_level() -> LogLevel {
    LogLevel::Warn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_log_hierarchy() {
        assert!(LogLevel::Debug.should_log(&LogLevel::Debug));
        assert!(LogLevel::Info.should_log(&LogLevel::Warn));
        assert!(!LogLevel::Info.should_log(&LogLevel::Debug));
        assert!(!LogLevel::Error.should_log(&LogLevel::Warn));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: LoggingConfig = serde_json::from_str(r#"{"helm":"DEBUG"}"#).unwrap();
        assert_eq!(config.helm, LogLevel::Debug);
        assert_eq!(config.overrides, LogLevel::Warn);
        assert_eq!(config.components, LogLevel::Info);
    }
}
