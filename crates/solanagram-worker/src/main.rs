// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Container-side worker: reads its credential bundle, connects its own
//! Telegram client, and captures (logger) or processes (listener/forwarder)
//! messages from one source chat.
//!
//! Runs on a current-thread runtime: the client handle is `!Send` and this
//! process is its single scheduler.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use solanagram_core::bundle::{BUNDLE_ENV, BUNDLE_MOUNT};
use solanagram_core::traits::{Store, TelegramClient as _, TelegramConnector};
use solanagram_core::types::{ApiCredentials, WorkerKind};
use solanagram_core::SolanagramError;
use solanagram_storage::{Database, PgStore};
use solanagram_telegram::GrammersConnector;
use solanagram_worker::{config, listener, logger};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let outcome = tokio::select! {
        result = run() => result,
        _ = shutdown_signal() => {
            info!("termination signal received, shutting down");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        error!(error = %e, "worker exited with error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), SolanagramError> {
    let bundle_dir =
        std::env::var(BUNDLE_ENV).unwrap_or_else(|_| BUNDLE_MOUNT.to_string());
    let bundle = config::load(Path::new(&bundle_dir))?;

    info!(
        mode = %bundle.config.mode,
        chat_id = bundle.config.chat_id,
        "worker starting"
    );

    let db = Database::connect(&bundle.config.database_dsn).await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(db));

    let creds = ApiCredentials {
        api_id: bundle.config.api_id,
        api_hash: bundle.api_hash.clone(),
    };
    let connector = GrammersConnector;
    let client = connector.connect(&creds, Some(&bundle.session)).await?;

    if !client.is_authorized().await? {
        // Revoked upstream; the orchestrator surfaces this to the owner.
        return Err(SolanagramError::AuthorizationLost);
    }

    match bundle.config.mode {
        WorkerKind::Logger => logger::run(store, client, &bundle.config).await,
        WorkerKind::Listener | WorkerKind::Forwarder => {
            listener::run(store, client, &bundle.config).await
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                let _ = ctrl_c.await;
                return;
            }
        };
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("solanagram_worker=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
