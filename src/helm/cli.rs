//! # Helm CLI
//!
//! [`ChartBackend`] over the `helm` binary.
//!
//! `upgrade` and `uninstall` are retried: helm intermittently reports "already exists"
//! or "no deployed release" and succeeds on a later attempt. Command lines are logged
//! with password values masked.

use super::{ChartBackend, ChartRequest, HelmError, ReleaseStatus};
use crate::config::ControllerConfig;
use crate::crd::LogLevel;
use crate::observability::metrics;
use crate::overrides::{escape_value, mask_sensitive};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, error, info};

const RETRY_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: String,
    max_retries: u32,
    retry_pause: Duration,
}

struct HelmOutput {
    stdout: String,
    stderr: String,
    success: bool,
}

impl HelmCli {
    pub fn new(binary: impl Into<String>, max_retries: u32) -> Self {
        Self {
            binary: binary.into(),
            max_retries: max_retries.max(1),
            retry_pause: RETRY_PAUSE,
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(config.helm_binary.clone(), config.helm_max_retries)
    }

    /// Arguments for `helm upgrade --install`
    ///
    /// Files come first in precedence order, then one flag per scalar override so a
    /// later entry for the same key still wins.
    pub fn upgrade_args(request: &ChartRequest) -> Vec<String> {
        let mut args = vec![
            "upgrade".to_string(),
            request.release_name.clone(),
            request.chart_dir.display().to_string(),
            "--install".to_string(),
            "--namespace".to_string(),
            request.namespace.clone(),
        ];
        if request.wait {
            args.push("--wait".to_string());
        }
        args.push("--timeout".to_string());
        args.push(format!("{}s", request.timeout.as_secs()));

        for file in &request.overrides.files {
            args.push("-f".to_string());
            args.push(file.display().to_string());
        }
        for kv in &request.overrides.kvs {
            if kv.is_file {
                continue;
            }
            let flag = if kv.set_file {
                "--set-file"
            } else if kv.set_string {
                "--set-string"
            } else {
                "--set"
            };
            args.push(flag.to_string());
            args.push(format!("{}={}", kv.key, escape_value(&kv.value)));
        }
        args
    }

    async fn run_once(&self, args: &[String]) -> Result<HelmOutput, HelmError> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|source| HelmError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;
        Ok(HelmOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }

    /// Command line for logs, each argument masked on its own
    pub fn masked_command_line(&self, args: &[String]) -> String {
        std::iter::once(self.binary.clone())
            .chain(args.iter().map(|arg| mask_sensitive(arg)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run a mutating command with retries
    async fn run_with_retry(
        &self,
        operation: &str,
        release: &str,
        namespace: &str,
        args: &[String],
        ignore_not_found: bool,
        log_level: LogLevel,
    ) -> Result<HelmOutput, HelmError> {
        let start = Instant::now();
        metrics::increment_helm_commands(operation);
        let verbose = log_level.should_log(&LogLevel::Info);

        let mut attempt = 1;
        loop {
            if attempt == 1 && verbose {
                info!(
                    "Running Helm command {} for release {}",
                    self.masked_command_line(args),
                    release
                );
            } else if verbose {
                info!("Re-running Helm command for release {}", release);
            }

            let output = self.run_once(args).await?;
            if output.success || (ignore_not_found && output.stderr.contains("not found")) {
                if log_level.should_log(&LogLevel::Debug) {
                    debug!(
                        "Successfully ran Helm command for operation {} and release {}",
                        operation, release
                    );
                }
                metrics::observe_helm_command_duration(start.elapsed().as_secs_f64());
                return Ok(output);
            }

            if attempt >= self.max_retries {
                error!(
                    "Failed running Helm command for release {}: stderr {}",
                    release,
                    mask_sensitive(&output.stderr)
                );
                metrics::observe_helm_command_duration(start.elapsed().as_secs_f64());
                return Err(HelmError::CommandFailed {
                    operation: operation.to_string(),
                    release: release.to_string(),
                    namespace: namespace.to_string(),
                    stderr: mask_sensitive(output.stderr.trim()),
                });
            }

            if verbose {
                info!(
                    "Failed running Helm command for operation {} and release {}. Retrying {} of {}",
                    operation,
                    release,
                    attempt + 1,
                    self.max_retries
                );
            }
            attempt += 1;
            tokio::time::sleep(self.retry_pause).await;
        }
    }
}

#[async_trait]
impl ChartBackend for HelmCli {
    async fn release_status(
        &self,
        release: &str,
        namespace: &str,
    ) -> Result<ReleaseStatus, HelmError> {
        let args = [
            "status".to_string(),
            release.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            "-o".to_string(),
            "json".to_string(),
        ];
        metrics::increment_helm_commands("status");
        let output = self.run_once(&args).await?;
        if !output.success {
            if output.stderr.contains("not found") {
                return Ok(ReleaseStatus::NotFound);
            }
            return Err(HelmError::CommandFailed {
                operation: "status".to_string(),
                release: release.to_string(),
                namespace: namespace.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        parse_status_json(release, &output.stdout)
    }

    async fn upgrade_install(&self, request: &ChartRequest) -> Result<(), HelmError> {
        let args = Self::upgrade_args(request);
        self.run_with_retry(
            "upgrade",
            &request.release_name,
            &request.namespace,
            &args,
            false,
            request.log_level,
        )
        .await
        .map(|_| ())
    }

    async fn uninstall(&self, release: &str, namespace: &str) -> Result<(), HelmError> {
        let args = [
            "uninstall".to_string(),
            release.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
        ];
        self.run_with_retry("uninstall", release, namespace, &args, true, LogLevel::Info)
            .await
            .map(|_| ())
    }

    async fn get_values(&self, release: &str, namespace: &str) -> Result<String, HelmError> {
        let args = [
            "get".to_string(),
            "values".to_string(),
            release.to_string(),
            "--namespace".to_string(),
            namespace.to_string(),
            "-o".to_string(),
            "yaml".to_string(),
        ];
        metrics::increment_helm_commands("get-values");
        let output = self.run_once(&args).await?;
        if !output.success {
            return Err(HelmError::CommandFailed {
                operation: "get values".to_string(),
                release: release.to_string(),
                namespace: namespace.to_string(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Extract `info.status` from `helm status -o json`
fn parse_status_json(release: &str, stdout: &str) -> Result<ReleaseStatus, HelmError> {
    let value: serde_json::Value =
        serde_json::from_str(stdout).map_err(|e| HelmError::Output {
            release: release.to_string(),
            message: e.to_string(),
        })?;
    value
        .get("info")
        .and_then(|info| info.get("status"))
        .and_then(serde_json::Value::as_str)
        .map(ReleaseStatus::from_helm_status)
        .ok_or_else(|| HelmError::Output {
            release: release.to_string(),
            message: "no chart status found".to_string(),
        })
}
