// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The async bridge: one owning scheduler for every Telegram client.
//!
//! A dedicated OS thread runs a current-thread runtime with a `LocalSet`
//! that owns the [`TelegramService`] (and with it every client handle; the
//! client trait is `!Send`, so handles cannot escape). HTTP-side callers
//! hold a cloneable [`BridgeHandle`] and dispatch commands over a bounded
//! queue; a full queue is surfaced as `SystemBusy`, and every operation runs
//! under the outer wall-clock budget. An operation cancelled by that budget
//! evicts the phone's handle, so a client is always either connected or
//! gone, never half-open.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use solanagram_core::traits::{Store, TelegramConnector};
use solanagram_core::types::{ApiCredentials, DialogSummary};
use solanagram_core::{Phone, SolanagramError};
use solanagram_vault::CredentialStore;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::manager::Timeouts;
use crate::registry::SessionRegistry;
use crate::service::{SendCodeOutcome, TelegramService};

/// High-water mark for pending bridge operations.
const QUEUE_CAPACITY: usize = 100;

thread_local! {
    static IN_BRIDGE: Cell<bool> = const { Cell::new(false) };
}

type Reply<T> = oneshot::Sender<Result<T, SolanagramError>>;

enum Command {
    SendCode {
        phone: Phone,
        password: Option<String>,
        force_new: bool,
        reply: Reply<SendCodeOutcome>,
    },
    VerifyCode {
        phone: Phone,
        code: String,
        password: Option<String>,
        reply: Reply<()>,
    },
    GetChats {
        phone: Phone,
        reply: Reply<Vec<DialogSummary>>,
    },
    SessionStatus {
        phone: Phone,
        reply: Reply<bool>,
    },
    Disconnect {
        phone: Phone,
        reply: Reply<()>,
    },
    CachedCode {
        phone: Phone,
        reply: Reply<Option<String>>,
    },
    ClearCachedCode {
        phone: Phone,
        reply: Reply<()>,
    },
    SweepExpired {
        reply: Reply<usize>,
    },
    Shutdown,
}

/// Spawns and owns the bridge thread.
pub struct TelegramBridge;

impl TelegramBridge {
    /// Start the bridge thread and return a handle to it.
    pub fn spawn(
        connector: Box<dyn TelegramConnector>,
        store: Arc<dyn Store>,
        vault: CredentialStore,
        fallback_creds: Option<ApiCredentials>,
        client_ttl: Duration,
        timeouts: Timeouts,
    ) -> BridgeHandle {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let outer = timeouts.outer;

        std::thread::Builder::new()
            .name("telegram-bridge".to_string())
            .spawn(move || {
                IN_BRIDGE.with(|flag| flag.set(true));
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed to build telegram bridge runtime");
                let local = tokio::task::LocalSet::new();
                let service = Rc::new(TelegramService::new(
                    connector,
                    SessionRegistry::new(client_ttl),
                    store,
                    vault,
                    fallback_creds,
                    timeouts,
                ));
                local.block_on(&rt, worker(rx, service, outer));
                debug!("telegram bridge thread exiting");
            })
            .expect("failed to spawn telegram bridge thread");

        info!(queue = QUEUE_CAPACITY, "telegram bridge started");
        BridgeHandle { tx }
    }
}

async fn worker(mut rx: mpsc::Receiver<Command>, service: Rc<TelegramService>, outer: Duration) {
    while let Some(command) = rx.recv().await {
        if matches!(command, Command::Shutdown) {
            break;
        }
        let service = service.clone();
        tokio::task::spawn_local(handle_command(service, command, outer));
    }
}

async fn handle_command(service: Rc<TelegramService>, command: Command, outer: Duration) {
    match command {
        Command::SendCode {
            phone,
            password,
            force_new,
            reply,
        } => {
            let result = bounded(
                &service,
                &phone,
                outer,
                service.send_code(&phone, password, force_new),
            )
            .await;
            let _ = reply.send(result);
        }
        Command::VerifyCode {
            phone,
            code,
            password,
            reply,
        } => {
            let result = bounded(
                &service,
                &phone,
                outer,
                service.verify_code(&phone, &code, password),
            )
            .await;
            let _ = reply.send(result);
        }
        Command::GetChats { phone, reply } => {
            let result = bounded(&service, &phone, outer, service.get_chats(&phone)).await;
            let _ = reply.send(result);
        }
        Command::SessionStatus { phone, reply } => {
            let result = bounded(&service, &phone, outer, service.session_status(&phone)).await;
            let _ = reply.send(result);
        }
        Command::Disconnect { phone, reply } => {
            service.disconnect(&phone).await;
            let _ = reply.send(Ok(()));
        }
        Command::CachedCode { phone, reply } => {
            let _ = reply.send(Ok(service.cached_code(&phone)));
        }
        Command::ClearCachedCode { phone, reply } => {
            service.clear_cached_code(&phone);
            let _ = reply.send(Ok(()));
        }
        Command::SweepExpired { reply } => {
            let _ = reply.send(Ok(service.sweep_expired().await));
        }
        Command::Shutdown => {}
    }
}

/// Run one operation under the outer budget; on expiry the phone's handle is
/// evicted so no half-open client survives the cancellation.
async fn bounded<T>(
    service: &Rc<TelegramService>,
    phone: &Phone,
    outer: Duration,
    op: impl std::future::Future<Output = Result<T, SolanagramError>>,
) -> Result<T, SolanagramError> {
    match tokio::time::timeout(outer, op).await {
        Ok(result) => result,
        Err(_) => {
            service.evict(phone).await;
            Err(SolanagramError::Timeout { duration: outer })
        }
    }
}

/// Cloneable, thread-safe handle to the bridge.
#[derive(Clone)]
pub struct BridgeHandle {
    tx: mpsc::Sender<Command>,
}

impl BridgeHandle {
    pub async fn send_code(
        &self,
        phone: Phone,
        password: Option<String>,
        force_new: bool,
    ) -> Result<SendCodeOutcome, SolanagramError> {
        self.roundtrip(|reply| Command::SendCode {
            phone,
            password,
            force_new,
            reply,
        })
        .await
    }

    pub async fn verify_code(
        &self,
        phone: Phone,
        code: String,
        password: Option<String>,
    ) -> Result<(), SolanagramError> {
        self.roundtrip(|reply| Command::VerifyCode {
            phone,
            code,
            password,
            reply,
        })
        .await
    }

    pub async fn get_chats(&self, phone: Phone) -> Result<Vec<DialogSummary>, SolanagramError> {
        self.roundtrip(|reply| Command::GetChats { phone, reply }).await
    }

    /// Whether the stored authorization is still live (revoked blobs are
    /// cleared as a side effect).
    pub async fn session_status(&self, phone: Phone) -> Result<bool, SolanagramError> {
        self.roundtrip(|reply| Command::SessionStatus { phone, reply })
            .await
    }

    pub async fn disconnect(&self, phone: Phone) -> Result<(), SolanagramError> {
        self.roundtrip(|reply| Command::Disconnect { phone, reply })
            .await
    }

    pub async fn cached_code(&self, phone: Phone) -> Result<Option<String>, SolanagramError> {
        self.roundtrip(|reply| Command::CachedCode { phone, reply })
            .await
    }

    pub async fn clear_cached_code(&self, phone: Phone) -> Result<(), SolanagramError> {
        self.roundtrip(|reply| Command::ClearCachedCode { phone, reply })
            .await
    }

    /// Evict expired client handles (cleanup loop entry point).
    pub async fn sweep_expired(&self) -> Result<usize, SolanagramError> {
        self.roundtrip(|reply| Command::SweepExpired { reply }).await
    }

    /// Ask the bridge thread to exit. Outstanding operations finish first.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }

    async fn roundtrip<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, SolanagramError> {
        // A bridge-thread task re-entering the queue would deadlock against
        // itself; refuse outright.
        if IN_BRIDGE.with(|flag| flag.get()) {
            return Err(SolanagramError::Internal(
                "bridge operations cannot be issued from the bridge thread".to_string(),
            ));
        }

        let (tx, rx) = oneshot::channel();
        match self.tx.try_send(make(tx)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => return Err(SolanagramError::SystemBusy),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                return Err(SolanagramError::Internal(
                    "telegram bridge is not running".to_string(),
                ))
            }
        }

        rx.await.map_err(|_| {
            SolanagramError::Internal("telegram bridge dropped the reply".to_string())
        })?
    }
}
