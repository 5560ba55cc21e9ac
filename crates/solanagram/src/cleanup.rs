// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retention and cleanup scheduler.
//!
//! One background task runs four periodic jobs; each logs on failure and
//! never takes the process down, and all of them stop on the shared
//! cancellation token:
//! - every 120 s: evict expired client handles (best-effort disconnect);
//! - every 60 s: the supervisor's reap pass;
//! - every 10 min: purge saved messages older than 30 days (and, when the
//!   operator enabled the knob, old message logs);
//! - every 15 min: age orphaned worker rows from `error` to `removed`.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use solanagram_core::traits::Store;
use solanagram_fleet::WorkerSupervisor;
use solanagram_telegram::BridgeHandle;

const REGISTRY_SWEEP_EVERY: Duration = Duration::from_secs(120);
const REAP_EVERY: Duration = Duration::from_secs(60);
const PURGE_EVERY: Duration = Duration::from_secs(600);
const ORPHAN_EVERY: Duration = Duration::from_secs(900);

const SAVED_MESSAGE_RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);
const ORPHAN_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Retention knobs resolved from configuration.
#[derive(Debug, Clone, Default)]
pub struct RetentionConfig {
    /// When set, message_logs older than this are purged too.
    pub message_log_retention: Option<Duration>,
}

/// Spawn the cleanup scheduler. Returns once spawned; the task exits when
/// the token is cancelled.
pub fn spawn(
    cancel: CancellationToken,
    store: Arc<dyn Store>,
    bridge: BridgeHandle,
    supervisor: Arc<WorkerSupervisor>,
    retention: RetentionConfig,
) {
    tokio::spawn(run(cancel, store, bridge, supervisor, retention));
    info!("cleanup scheduler started");
}

async fn run(
    cancel: CancellationToken,
    store: Arc<dyn Store>,
    bridge: BridgeHandle,
    supervisor: Arc<WorkerSupervisor>,
    retention: RetentionConfig,
) {
    let mut sweep_tick = tokio::time::interval(REGISTRY_SWEEP_EVERY);
    let mut reap_tick = tokio::time::interval(REAP_EVERY);
    let mut purge_tick = tokio::time::interval(PURGE_EVERY);
    let mut orphan_tick = tokio::time::interval(ORPHAN_EVERY);

    // Skip the immediate first firing of every interval.
    sweep_tick.tick().await;
    reap_tick.tick().await;
    purge_tick.tick().await;
    orphan_tick.tick().await;

    loop {
        tokio::select! {
            _ = sweep_tick.tick() => {
                match bridge.sweep_expired().await {
                    Ok(0) => debug!("registry sweep: nothing expired"),
                    Ok(evicted) => info!(evicted, "registry sweep evicted expired clients"),
                    Err(e) => warn!(error = %e, "registry sweep failed"),
                }
            }
            _ = reap_tick.tick() => {
                match supervisor.reap_pass().await {
                    Ok(report) if report.vanished > 0 || report.removed > 0 => {
                        info!(vanished = report.vanished, removed = report.removed, "reap pass");
                    }
                    Ok(_) => debug!("reap pass: fleet healthy"),
                    Err(e) => warn!(error = %e, "reap pass failed"),
                }
            }
            _ = purge_tick.tick() => {
                match store.purge_saved_messages_older_than(SAVED_MESSAGE_RETENTION).await {
                    Ok(0) => debug!("saved-message purge: nothing to delete"),
                    Ok(purged) => info!(purged, "purged old saved messages"),
                    Err(e) => warn!(error = %e, "saved-message purge failed"),
                }
                if let Some(age) = retention.message_log_retention {
                    match store.purge_message_logs_older_than(age).await {
                        Ok(0) => {}
                        Ok(purged) => info!(purged, "purged old message logs"),
                        Err(e) => warn!(error = %e, "message-log purge failed"),
                    }
                }
            }
            _ = orphan_tick.tick() => {
                match store.remove_error_sessions_older_than(ORPHAN_RETENTION).await {
                    Ok(0) => debug!("orphan pass: nothing to remove"),
                    Ok(removed) => info!(removed, "orphaned sessions marked removed"),
                    Err(e) => warn!(error = %e, "orphan pass failed"),
                }
            }
            _ = cancel.cancelled() => {
                info!("cleanup scheduler shutting down");
                break;
            }
        }
    }
}
