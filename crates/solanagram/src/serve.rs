// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `solanagram serve` command implementation.
//!
//! Bring-up order: tracing, config validation, credential store, Postgres
//! (with migrations), the Telegram bridge thread, the worker supervisor,
//! the cleanup scheduler, and finally the gateway. Shutdown is signal
//! driven and cancels everything through one token.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use solanagram_config::{decode_encryption_key, validate_strict, OrchestratorConfig, Severity};
use solanagram_core::traits::Store;
use solanagram_core::types::ApiCredentials;
use solanagram_core::SolanagramError;
use solanagram_fleet::{DockerCli, FleetConfig, WorkerSupervisor};
use solanagram_gateway::{AppState, JwtManager, LoginMetrics};
use solanagram_storage::{Database, PgStore};
use solanagram_telegram::{GrammersConnector, TelegramBridge, Timeouts};
use solanagram_vault::CredentialStore;

use crate::cleanup::{self, RetentionConfig};

/// Grace window given to a worker container on stop.
const GRACE_STOP: Duration = Duration::from_secs(10);

/// Runs the `solanagram serve` command.
pub async fn run_serve(config: OrchestratorConfig) -> Result<(), SolanagramError> {
    init_tracing(&config.log_level);
    info!("starting solanagram serve");

    // Fail fast on configuration problems, warn on the rest.
    let diagnostics = validate_strict(&config).map_err(SolanagramError::Config)?;
    for diagnostic in diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
    {
        warn!("{diagnostic}");
    }

    let key = decode_encryption_key(&config.encryption_key).map_err(SolanagramError::Config)?;
    let vault = CredentialStore::new(key);

    let db = Database::open(&config.database_url).await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(db));
    match store.schema_version().await {
        Ok(Some(version)) => info!(schema_version = %version, "database ready"),
        Ok(None) => warn!("db_info has no schema_version row"),
        Err(e) => return Err(e),
    }

    let fallback_creds = match (config.telegram_api_id, config.telegram_api_hash.clone()) {
        (Some(api_id), Some(api_hash)) => Some(ApiCredentials {
            api_id,
            api_hash: SecretString::from(api_hash),
        }),
        _ => None,
    };

    let timeouts = Timeouts {
        connect: config.connect_timeout(),
        request: config.request_timeout(),
        ..Timeouts::default()
    };
    let bridge = TelegramBridge::spawn(
        Box::new(GrammersConnector),
        store.clone(),
        vault.clone(),
        fallback_creds,
        config.client_ttl(),
        timeouts,
    );

    let runtime = Arc::new(DockerCli::new(config.docker_host.clone()));
    let supervisor = Arc::new(WorkerSupervisor::new(
        store.clone(),
        runtime,
        vault.clone(),
        FleetConfig {
            project_name: config.forwarder_project_name.clone(),
            configs_path: PathBuf::from(&config.solanagram_configs_path),
            logger_image: config.logger_image.clone(),
            listener_image: config.listener_image.clone(),
            forwarder_image: config.forwarder_image.clone(),
            network: config.network_name.clone(),
            database_dsn: config.database_url.clone(),
            grace_stop: GRACE_STOP,
        },
    ));

    let cancel = install_signal_handler();

    cleanup::spawn(
        cancel.clone(),
        store.clone(),
        bridge.clone(),
        supervisor.clone(),
        RetentionConfig {
            message_log_retention: config
                .message_log_retention_days
                .map(|days| Duration::from_secs(u64::from(days) * 24 * 60 * 60)),
        },
    );

    let ttl_secs = i64::try_from(config.session_timeout).unwrap_or(i64::MAX);
    let state = AppState {
        store,
        bridge: bridge.clone(),
        supervisor,
        vault,
        jwt: JwtManager::new(config.jwt_secret_key.as_bytes(), ttl_secs),
        metrics: Arc::new(LoginMetrics::new()),
        started_at: Instant::now(),
    };

    solanagram_gateway::serve(&config.http_host, config.http_port, state, cancel.clone()).await?;

    bridge.shutdown().await;
    info!("solanagram serve shutdown complete");
    Ok(())
}

/// Installs handlers for SIGTERM and SIGINT; either cancels the token.
fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Initializes the tracing subscriber with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("solanagram={log_level},warn")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init();
}
