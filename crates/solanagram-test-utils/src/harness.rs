// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness wiring a full orchestrator stack out of mocks:
//! in-memory store, scripted Telegram connector behind a real bridge, and a
//! recording container runtime behind a real supervisor.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;

use solanagram_core::traits::Store;
use solanagram_core::types::{ChatKind, ChatRef, NewUser, User};
use solanagram_core::{Phone, SolanagramError};
use solanagram_fleet::{FleetConfig, WorkerSupervisor};
use solanagram_telegram::{BridgeHandle, TelegramBridge, Timeouts};
use solanagram_vault::{crypto, CredentialStore};

use crate::memory_store::MemoryStore;
use crate::mock_runtime::MockRuntime;
use crate::mock_telegram::ScriptedTelegram;

/// Builder for the mock orchestrator stack.
pub struct TestHarnessBuilder {
    client_ttl: Duration,
    timeouts: Timeouts,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            client_ttl: Duration::from_secs(300),
            timeouts: Timeouts {
                connect: Duration::from_secs(2),
                request: Duration::from_secs(2),
                probe: Duration::from_secs(2),
                outer: Duration::from_secs(10),
            },
        }
    }

    /// Shrink the client TTL (TTL-eviction tests).
    pub fn with_client_ttl(mut self, ttl: Duration) -> Self {
        self.client_ttl = ttl;
        self
    }

    pub fn build(self) -> TestHarness {
        let store = Arc::new(MemoryStore::new());
        let vault = CredentialStore::new(
            crypto::generate_random_key().expect("test key generation"),
        );
        let telegram = ScriptedTelegram::new();
        let bridge = TelegramBridge::spawn(
            telegram.connector(),
            store.clone() as Arc<dyn Store>,
            vault.clone(),
            None,
            self.client_ttl,
            self.timeouts,
        );

        let runtime = Arc::new(MockRuntime::new());
        let configs_dir = tempfile::tempdir().expect("temp configs dir");
        let supervisor = Arc::new(WorkerSupervisor::new(
            store.clone() as Arc<dyn Store>,
            runtime.clone(),
            vault.clone(),
            FleetConfig {
                project_name: "solanagram".to_string(),
                configs_path: configs_dir.path().to_path_buf(),
                logger_image: "solanagram-logger:latest".to_string(),
                listener_image: "solanagram-listener:latest".to_string(),
                forwarder_image: "solanagram-forwarder:latest".to_string(),
                network: "solanagram-net".to_string(),
                database_dsn: "postgres://solanagram@db/solanagram".to_string(),
                grace_stop: Duration::from_secs(1),
            },
        ));

        TestHarness {
            store,
            vault,
            telegram,
            bridge,
            runtime,
            supervisor,
            _configs_dir: configs_dir,
        }
    }
}

/// A complete orchestrator stack over mocks.
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub vault: CredentialStore,
    pub telegram: ScriptedTelegram,
    pub bridge: BridgeHandle,
    pub runtime: Arc<MockRuntime>,
    pub supervisor: Arc<WorkerSupervisor>,
    _configs_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn build() -> TestHarness {
        Self::builder().build()
    }

    /// Register a user with wrapped api credentials.
    pub async fn create_user(&self, phone: &str) -> Result<User, SolanagramError> {
        let api_hash = SecretString::from("deadbeefdeadbeefdeadbeefdeadbeef".to_string());
        self.store
            .create_user(NewUser {
                phone: Phone::parse(phone)?,
                password_hash: "argon2-hash-placeholder".to_string(),
                api_id: 25128314,
                api_hash: self.vault.wrap_str(&api_hash)?,
            })
            .await
    }

    /// Give the user a stored (wrapped) Telegram session blob, as a
    /// completed login would.
    pub async fn authorize_user(&self, user_id: i64) -> Result<(), SolanagramError> {
        let wrapped = self.vault.wrap(b"mock-session-blob")?;
        self.store.set_session_blob(user_id, Some(wrapped)).await
    }

    /// A channel-shaped chat reference for worker tests.
    pub fn chat(&self, id: i64, title: &str) -> ChatRef {
        ChatRef {
            id,
            title: title.to_string(),
            username: None,
            kind: ChatKind::Channel,
        }
    }
}
