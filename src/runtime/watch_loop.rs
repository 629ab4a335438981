//! # Watch Loop
//!
//! Controller watch loop that monitors `Platform` resources and triggers
//! reconciliation when changes are detected.

use crate::config::SharedControllerConfig;
use crate::constants::RECONCILE_ANNOTATION;
use crate::controller::reconciler::{reconcile, Reconciler, ReconcilerError, TriggerSource};
use crate::controller::server::ServerState;
use crate::crd::Platform;
use crate::runtime::error_policy::{handle_reconciliation_error, handle_watch_stream_error};
use futures::StreamExt;
use kube::api::Api;
use kube_runtime::{controller, controller::Action, watcher, Controller};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Instrument};

/// Run the controller watch loop
///
/// Restarts the watch when the stream ends and exits once shutdown has been
/// signalled.
pub async fn run_watch_loop(
    platforms: Api<Platform>,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    controller_config: SharedControllerConfig,
) -> Result<(), anyhow::Error> {
    let config = controller_config.read().await;
    let backoff_duration_ms = Arc::new(AtomicU64::new(config.backoff_start_ms));
    let concurrency = config.max_concurrent_reconciliations;
    drop(config);

    let shutdown_server_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_server_state.is_ready.store(false, Ordering::Relaxed);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    loop {
        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let backoff = Arc::clone(&backoff_duration_ms);
        let config_for_reconcile = controller_config.clone();
        let config_for_filter = controller_config.clone();
        let watch_span = tracing::info_span!("controller.watch", operation = "watch_loop");

        info!("Starting controller watch loop...");
        Controller::new(platforms.clone(), watcher::Config::default().any_semantic())
            .with_config(controller::Config::default().concurrency(concurrency))
            .shutdown_on_signal()
            .run(
                move |obj, ctx| create_reconcile_fn(obj, ctx, config_for_reconcile.clone()),
                |obj, error, ctx| handle_reconciliation_error(obj, error, ctx),
                Arc::clone(&reconciler),
            )
            .filter_map(move |event| {
                let backoff = Arc::clone(&backoff);
                let config = config_for_filter.clone();
                async move {
                    match &event {
                        Ok(_) => {
                            let backoff_start = config.read().await.backoff_start_ms;
                            backoff.store(backoff_start, Ordering::Relaxed);
                            debug!("watch.event.success");
                            Some(event)
                        }
                        Err(e) => {
                            let error_string = format!("{e:?}");
                            let (max_backoff, restart_delay) = {
                                let config = config.read().await;
                                (config.backoff_max_ms, config.watch_restart_delay_secs)
                            };
                            handle_watch_stream_error(
                                &error_string,
                                &backoff,
                                max_backoff,
                                restart_delay,
                            )
                            .await
                            .map(|()| event)
                        }
                    }
                }
            })
            .for_each(|_| futures::future::ready(()))
            .instrument(watch_span)
            .await;

        if !server_state.is_ready.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let delay_secs = controller_config
            .read()
            .await
            .watch_restart_delay_after_end_secs;
        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            delay_secs
        );
        tokio::time::sleep(Duration::from_secs(delay_secs)).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Why an event should be reconciled, or `None` when it should be skipped
///
/// Status-only updates of a converged platform are skipped; a platform that is
/// still converging or failed is always reconciled so requeues make progress.
pub fn trigger_for(platform: &Platform, reconcile_interval: Duration) -> Option<TriggerSource> {
    let generation = platform.metadata.generation.unwrap_or(0);
    let status = platform.status.as_ref();
    let observed_generation = status.and_then(|s| s.observed_generation).unwrap_or(0);
    let phase = status.and_then(|s| s.phase.as_deref());

    let is_manual_trigger = platform
        .metadata
        .annotations
        .as_ref()
        .is_some_and(|annotations| annotations.contains_key(RECONCILE_ANNOTATION));
    if is_manual_trigger {
        return Some(TriggerSource::ManualAnnotation);
    }
    if observed_generation == 0 || generation != observed_generation {
        return Some(TriggerSource::ResourceChange);
    }
    if phase != Some(crate::controller::reconciler::status::PHASE_READY) {
        return Some(TriggerSource::Convergence);
    }

    let is_periodic = status
        .and_then(|s| s.last_reconcile_time.as_deref())
        .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
        .is_some_and(|last| {
            let interval = chrono::Duration::from_std(reconcile_interval)
                .unwrap_or_else(|_| chrono::Duration::zero());
            // 2s tolerance for requeue timing
            chrono::Utc::now() >= last.with_timezone(&chrono::Utc) + interval - chrono::Duration::seconds(2)
        });
    is_periodic.then_some(TriggerSource::TimerBased)
}

/// Action for a filtered event
///
/// The scheduler keeps one entry per object, so the skip must carry the periodic
/// requeue forward or the next timer pass is lost.
pub fn skipped_event_action(reconcile_interval: Duration) -> Action {
    Action::requeue(reconcile_interval)
}

fn create_reconcile_fn(
    obj: Arc<Platform>,
    ctx: Arc<Reconciler>,
    controller_config: SharedControllerConfig,
) -> impl std::future::Future<Output = Result<Action, ReconcilerError>> + Send {
    let name = obj.metadata.name.clone().unwrap_or_else(|| "unknown".to_string());
    let namespace = obj
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string());
    let generation = obj.metadata.generation.unwrap_or(0);
    let observed_generation = obj
        .status
        .as_ref()
        .and_then(|s| s.observed_generation)
        .unwrap_or(0);

    let reconcile_span = tracing::info_span!(
        "controller.watch.reconcile",
        resource.name = name.as_str(),
        resource.namespace = namespace.as_str(),
        resource.version = obj.metadata.resource_version.as_deref().unwrap_or("unknown"),
        resource.generation = generation,
        resource.observed_generation = observed_generation,
        event.r#type = "watch_triggered"
    );

    async move {
        if obj.spec.suspend {
            debug!("Skipping reconciliation - platform {} is suspended", name);
            return Ok(Action::await_change());
        }

        let reconcile_interval = controller_config.read().await.reconcile_interval_duration();
        let Some(trigger_source) = trigger_for(&obj, reconcile_interval) else {
            debug!(
                generation = generation,
                observed_generation = observed_generation,
                "Skipping reconciliation - only status changed, platform is ready"
            );
            return Ok(skipped_event_action(reconcile_interval));
        };

        let result = reconcile(obj, Arc::clone(&ctx), trigger_source).await;
        match &result {
            Ok(action) => {
                ctx.reset_backoff(&format!("{namespace}/{name}"));
                debug!(action = ?action, "watch.event.reconciled");
            }
            Err(e) => error!(error = %e, "watch.event.reconciliation_failed"),
        }
        result
    }
    .instrument(reconcile_span)
}
