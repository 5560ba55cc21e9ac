// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The worker supervisor: creates, tracks, stops and reaps per-(user, chat)
//! worker containers.
//!
//! Uniqueness is enforced twice: the store's reservation transaction (and
//! its partial unique index) guarantee at most one active row, and the
//! per-name lock serializes runtime calls so no two starts or stops race on
//! one container name. Worker rows are the source of truth; containers are
//! disposable.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::{info, warn};

use solanagram_core::bundle::{
    WorkerBundleConfig, BUNDLE_ENV, BUNDLE_MOUNT, LABEL_PROJECT, LABEL_SESSION_ID, LABEL_TYPE,
    LABEL_USER_ID,
};
use solanagram_core::traits::{ContainerRuntime, ContainerSpec, ResourceCaps, Store};
use solanagram_core::types::{ChatRef, LoggingSession, MessageListener, User};
use solanagram_core::{ContainerStatus, SolanagramError, WorkerKind};
use solanagram_vault::CredentialStore;

use crate::bundle;
use crate::names;

/// How long a worker row may sit in `error` before it is marked `removed`.
const ERROR_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Static supervisor configuration.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    pub project_name: String,
    /// Host root for per-worker credential bundles.
    pub configs_path: PathBuf,
    pub logger_image: String,
    pub listener_image: String,
    pub forwarder_image: String,
    pub network: String,
    /// DSN handed to workers for direct persistence access.
    pub database_dsn: String,
    /// SIGTERM grace before force-removal.
    pub grace_stop: Duration,
}

/// Result of one reap pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReapReport {
    /// Rows flipped to `error` because their container was gone or exited.
    pub vanished: usize,
    /// Rows in `error` long enough to be marked `removed`.
    pub removed: u64,
}

/// Supervises the worker fleet through the narrow runtime port.
pub struct WorkerSupervisor {
    store: Arc<dyn Store>,
    runtime: Arc<dyn ContainerRuntime>,
    vault: CredentialStore,
    config: FleetConfig,
    /// One in-flight start/stop per container name.
    name_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WorkerSupervisor {
    pub fn new(
        store: Arc<dyn Store>,
        runtime: Arc<dyn ContainerRuntime>,
        vault: CredentialStore,
        config: FleetConfig,
    ) -> Self {
        Self {
            store,
            runtime,
            vault,
            config,
            name_locks: DashMap::new(),
        }
    }

    /// Start a logging worker for (user, chat).
    ///
    /// Preflight rejects a second active session for the pair with
    /// `AlreadyActive`; failures before a successful launch delete the
    /// reserved row and wipe the bundle.
    pub async fn start_logging(
        &self,
        user_id: i64,
        chat: &ChatRef,
    ) -> Result<LoggingSession, SolanagramError> {
        let (user, api_id, api_hash, session_bytes) = self.credentials(user_id).await?;

        let name = names::container_name(WorkerKind::Logger, user_id, chat.id);
        let lock = self.name_lock(&name);
        let _guard = lock.lock().await;

        let session = self
            .store
            .reserve_logging_session(user_id, chat, &name)
            .await?;

        let bundle_config = WorkerBundleConfig {
            mode: WorkerKind::Logger,
            user_id,
            phone: user.phone.to_string(),
            api_id,
            chat_id: chat.id,
            chat_title: chat.title.clone(),
            chat_type: chat.kind.to_string(),
            database_dsn: self.config.database_dsn.clone(),
            logging_session_id: Some(session.id),
            listener_id: None,
            elaborations: vec![],
        };

        match self
            .launch_worker(
                WorkerKind::Logger,
                &name,
                &self.config.logger_image,
                user_id,
                session.id,
                &bundle_config,
                &session_bytes,
                &api_hash,
            )
            .await
        {
            Ok(container_id) => {
                self.store
                    .mark_session_running(session.id, &container_id)
                    .await?;
                info!(
                    user_id,
                    chat_id = chat.id,
                    container = %name,
                    "logging session started"
                );
                self.store
                    .logging_session(session.id)
                    .await?
                    .ok_or_else(|| {
                        SolanagramError::Internal("logging session row vanished".to_string())
                    })
            }
            Err(e) => {
                warn!(user_id, chat_id = chat.id, error = %e, "logging launch failed, rolling back");
                bundle::wipe(&self.bundle_dir(&name));
                self.store.delete_logging_session(session.id).await?;
                Err(e)
            }
        }
    }

    /// Stop a logging worker: SIGTERM, grace window, force-remove, mark the
    /// row inactive, wipe the bundle. Stopping an already-stopped session is
    /// a no-op success.
    pub async fn stop_logging(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<LoggingSession, SolanagramError> {
        let session = self.owned_session(user_id, session_id).await?;

        if !session.is_active && session.container_status == ContainerStatus::Stopped {
            return Ok(session);
        }

        if let Some(name) = session.container_name.clone() {
            let lock = self.name_lock(&name);
            let _guard = lock.lock().await;
            self.runtime.stop(&name, self.config.grace_stop).await?;
            self.runtime.remove(&name, true).await?;
            bundle::wipe(&self.bundle_dir(&name));
        }

        self.store.mark_session_stopped(session_id).await?;
        info!(user_id, session_id, "logging session stopped");
        self.owned_session(user_id, session_id).await
    }

    /// Stop the worker (if any) and delete the row and its history.
    pub async fn remove_logging(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<(), SolanagramError> {
        let session = self.owned_session(user_id, session_id).await?;
        if let Some(name) = session.container_name.clone() {
            let lock = self.name_lock(&name);
            let _guard = lock.lock().await;
            self.runtime.stop(&name, self.config.grace_stop).await?;
            self.runtime.remove(&name, true).await?;
            bundle::wipe(&self.bundle_dir(&name));
        }
        self.store.delete_logging_session(session_id).await?;
        info!(user_id, session_id, "logging session removed");
        Ok(())
    }

    /// Create and start a listener (or forwarder) worker for a source chat.
    pub async fn start_listener(
        &self,
        user_id: i64,
        source: &ChatRef,
        kind: WorkerKind,
    ) -> Result<MessageListener, SolanagramError> {
        let image = match kind {
            WorkerKind::Listener => &self.config.listener_image,
            WorkerKind::Forwarder => &self.config.forwarder_image,
            WorkerKind::Logger => {
                return Err(SolanagramError::Validation(
                    "logger workers are started through logging sessions".to_string(),
                ))
            }
        };

        let (user, api_id, api_hash, session_bytes) = self.credentials(user_id).await?;

        let name = names::container_name(kind, user_id, source.id);
        let lock = self.name_lock(&name);
        let _guard = lock.lock().await;

        let listener = self.store.create_listener(user_id, source, &name).await?;
        let elaborations = self.store.elaborations(listener.id).await?;

        let bundle_config = WorkerBundleConfig {
            mode: kind,
            user_id,
            phone: user.phone.to_string(),
            api_id,
            chat_id: source.id,
            chat_title: source.title.clone(),
            chat_type: source.kind.to_string(),
            database_dsn: self.config.database_dsn.clone(),
            logging_session_id: None,
            listener_id: Some(listener.id),
            elaborations: elaborations.iter().map(Into::into).collect(),
        };

        match self
            .launch_worker(
                kind,
                &name,
                image,
                user_id,
                listener.id,
                &bundle_config,
                &session_bytes,
                &api_hash,
            )
            .await
        {
            Ok(container_id) => {
                self.store
                    .mark_listener_running(listener.id, &container_id)
                    .await?;
                info!(user_id, source_chat = source.id, container = %name, "listener started");
                self.owned_listener(user_id, listener.id).await
            }
            Err(e) => {
                warn!(user_id, source_chat = source.id, error = %e, "listener launch failed, rolling back");
                bundle::wipe(&self.bundle_dir(&name));
                self.store.delete_listener(listener.id).await?;
                Err(e)
            }
        }
    }

    /// Stop a listener's container and mark the row stopped. Idempotent.
    pub async fn stop_listener(
        &self,
        user_id: i64,
        listener_id: i64,
    ) -> Result<MessageListener, SolanagramError> {
        let listener = self.owned_listener(user_id, listener_id).await?;

        if !listener.is_active && listener.container_status == ContainerStatus::Stopped {
            return Ok(listener);
        }

        if let Some(name) = listener.container_name.clone() {
            let lock = self.name_lock(&name);
            let _guard = lock.lock().await;
            self.runtime.stop(&name, self.config.grace_stop).await?;
            self.runtime.remove(&name, true).await?;
            bundle::wipe(&self.bundle_dir(&name));
        }

        self.store.mark_listener_stopped(listener_id).await?;
        info!(user_id, listener_id, "listener stopped");
        self.owned_listener(user_id, listener_id).await
    }

    /// Relaunch a listener worker with the current elaboration set.
    pub async fn restart_listener(
        &self,
        user_id: i64,
        listener_id: i64,
    ) -> Result<MessageListener, SolanagramError> {
        let listener = self.owned_listener(user_id, listener_id).await?;
        let (user, api_id, api_hash, session_bytes) = self.credentials(user_id).await?;

        let kind = if listener
            .container_name
            .as_deref()
            .is_some_and(|n| n.contains("-fwd-"))
        {
            WorkerKind::Forwarder
        } else {
            WorkerKind::Listener
        };
        let image = match kind {
            WorkerKind::Forwarder => &self.config.forwarder_image,
            _ => &self.config.listener_image,
        };

        let name = names::container_name(kind, user_id, listener.source_chat_id);
        let lock = self.name_lock(&name);
        let _guard = lock.lock().await;

        self.runtime.stop(&name, self.config.grace_stop).await?;
        self.runtime.remove(&name, true).await?;

        let elaborations = self.store.elaborations(listener_id).await?;
        let bundle_config = WorkerBundleConfig {
            mode: kind,
            user_id,
            phone: user.phone.to_string(),
            api_id,
            chat_id: listener.source_chat_id,
            chat_title: listener.source_chat_title.clone(),
            chat_type: listener.source_chat_type.clone(),
            database_dsn: self.config.database_dsn.clone(),
            logging_session_id: None,
            listener_id: Some(listener_id),
            elaborations: elaborations.iter().map(Into::into).collect(),
        };

        match self
            .launch_worker(
                kind,
                &name,
                image,
                user_id,
                listener_id,
                &bundle_config,
                &session_bytes,
                &api_hash,
            )
            .await
        {
            Ok(container_id) => {
                self.store
                    .mark_listener_running(listener_id, &container_id)
                    .await?;
                info!(user_id, listener_id, "listener restarted");
                self.owned_listener(user_id, listener_id).await
            }
            Err(e) => {
                bundle::wipe(&self.bundle_dir(&name));
                self.store
                    .mark_listener_error(listener_id, "relaunch failed")
                    .await?;
                Err(e)
            }
        }
    }

    /// Stop the worker (if any) and delete the listener with its children.
    pub async fn remove_listener(
        &self,
        user_id: i64,
        listener_id: i64,
    ) -> Result<(), SolanagramError> {
        let listener = self.owned_listener(user_id, listener_id).await?;
        if let Some(name) = listener.container_name.clone() {
            let lock = self.name_lock(&name);
            let _guard = lock.lock().await;
            self.runtime.stop(&name, self.config.grace_stop).await?;
            self.runtime.remove(&name, true).await?;
            bundle::wipe(&self.bundle_dir(&name));
        }
        self.store.delete_listener(listener_id).await?;
        info!(user_id, listener_id, "listener removed");
        Ok(())
    }

    /// Cross-check `running` rows against actual container presence, then
    /// age out rows stuck in `error`.
    pub async fn reap_pass(&self) -> Result<ReapReport, SolanagramError> {
        let mut report = ReapReport::default();

        for session in self.store.running_logging_sessions().await? {
            let Some(name) = session.container_name.as_deref() else {
                continue;
            };
            match self.check_worker(name).await {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    warn!(session_id = session.id, container = %name, reason, "reaping logging session");
                    self.store.mark_session_error(session.id, reason).await?;
                    bundle::wipe(&self.bundle_dir(name));
                    report.vanished += 1;
                }
                Err(e) => warn!(container = %name, error = %e, "reap inspect failed"),
            }
        }

        for listener in self.store.running_listeners().await? {
            let Some(name) = listener.container_name.as_deref() else {
                continue;
            };
            match self.check_worker(name).await {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    warn!(listener_id = listener.id, container = %name, reason, "reaping listener");
                    self.store.mark_listener_error(listener.id, reason).await?;
                    bundle::wipe(&self.bundle_dir(name));
                    report.vanished += 1;
                }
                Err(e) => warn!(container = %name, error = %e, "reap inspect failed"),
            }
        }

        report.removed = self
            .store
            .remove_error_sessions_older_than(ERROR_RETENTION)
            .await?;

        Ok(report)
    }

    // --- internals ---

    /// `Ok(None)` when the container is present and running; otherwise the
    /// reason it should be reaped.
    async fn check_worker(&self, name: &str) -> Result<Option<&'static str>, SolanagramError> {
        match self.runtime.inspect(name).await? {
            Some(state) if state.is_running() => Ok(None),
            Some(_) => Ok(Some("container exited")),
            None => Ok(Some("container vanished")),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn launch_worker(
        &self,
        kind: WorkerKind,
        name: &str,
        image: &str,
        user_id: i64,
        row_id: i64,
        bundle_config: &WorkerBundleConfig,
        session_bytes: &[u8],
        api_hash: &SecretString,
    ) -> Result<String, SolanagramError> {
        let dir = self.bundle_dir(name);
        bundle::materialize(&dir, bundle_config, session_bytes, api_hash)?;

        let spec = ContainerSpec {
            name: name.to_string(),
            image: image.to_string(),
            env: vec![(BUNDLE_ENV.to_string(), BUNDLE_MOUNT.to_string())],
            labels: vec![
                (LABEL_TYPE.to_string(), kind.to_string()),
                (LABEL_USER_ID.to_string(), user_id.to_string()),
                (LABEL_SESSION_ID.to_string(), row_id.to_string()),
                (LABEL_PROJECT.to_string(), self.config.project_name.clone()),
            ],
            bundle_mount: Some((dir, BUNDLE_MOUNT.to_string())),
            network: Some(self.config.network.clone()),
            resources: ResourceCaps::default(),
            restart_policy: "unless-stopped".to_string(),
        };

        self.runtime.launch(&spec).await
    }

    fn bundle_dir(&self, name: &str) -> PathBuf {
        bundle::bundle_dir(&self.config.configs_path, name)
    }

    fn name_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.name_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn owned_session(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<LoggingSession, SolanagramError> {
        match self.store.logging_session(session_id).await? {
            Some(session) if session.user_id == user_id => Ok(session),
            _ => Err(SolanagramError::NotFound(format!(
                "logging session {session_id}"
            ))),
        }
    }

    async fn owned_listener(
        &self,
        user_id: i64,
        listener_id: i64,
    ) -> Result<MessageListener, SolanagramError> {
        match self.store.listener(listener_id).await? {
            Some(listener) if listener.user_id == user_id => Ok(listener),
            _ => Err(SolanagramError::NotFound(format!("listener {listener_id}"))),
        }
    }

    /// Load the user row and decrypt everything a worker bundle needs.
    async fn credentials(
        &self,
        user_id: i64,
    ) -> Result<(User, i32, SecretString, Vec<u8>), SolanagramError> {
        let user = self
            .store
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| SolanagramError::NotFound(format!("user {user_id}")))?;

        let api_id = user.api_id.ok_or(SolanagramError::MissingCredentials)?;
        let api_hash_ct = user
            .api_hash
            .as_ref()
            .ok_or(SolanagramError::MissingCredentials)?;
        let api_hash = self.vault.unwrap_str(api_hash_ct)?;

        let session_ct = user
            .telegram_session
            .as_ref()
            .ok_or(SolanagramError::AuthorizationLost)?;
        let session_bytes = self.vault.unwrap(session_ct)?;

        Ok((user, api_id, api_hash, session_bytes))
    }
}
