// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Telegram client port.
//!
//! The wire protocol is an external collaborator: the orchestrator only
//! depends on these traits, and the production adapter maps the client
//! library's failures onto [`SolanagramError`] at this boundary.
//!
//! [`TelegramClient`] deliberately has no `Send` bound. Client handles are
//! single-threaded objects and must live on exactly one scheduler (the
//! bridge's dedicated thread, or a worker's current-thread runtime); the
//! missing bound makes moving one across schedulers a compile error rather
//! than a race.

use async_trait::async_trait;

use crate::error::SolanagramError;
use crate::types::{AccountInfo, ApiCredentials, ChatEvent, DialogSummary, Phone, SignInOutcome};

/// A live (possibly authorized) handle to one Telegram account.
#[async_trait(?Send)]
pub trait TelegramClient {
    /// Whether the underlying transport currently reports connected.
    fn is_connected(&self) -> bool;

    /// Whether the session carries a valid authorization.
    async fn is_authorized(&self) -> Result<bool, SolanagramError>;

    /// Ask Telegram to send a login code to the phone. The wire-level code
    /// hash stays inside the handle until [`submit_code`](Self::submit_code).
    async fn request_login_code(&mut self, phone: &Phone) -> Result<(), SolanagramError>;

    /// Submit the login code received by the user.
    async fn submit_code(&mut self, code: &str) -> Result<SignInOutcome, SolanagramError>;

    /// Complete a 2FA sign-in after [`SignInOutcome::PasswordNeeded`].
    async fn submit_password(&mut self, password: &str) -> Result<(), SolanagramError>;

    /// Lightweight "who am I" probe; the canonical health check.
    async fn whoami(&self) -> Result<AccountInfo, SolanagramError>;

    /// Fetch the account's dialog list.
    async fn dialogs(&mut self) -> Result<Vec<DialogSummary>, SolanagramError>;

    /// Wait for the next update relevant to workers (new messages).
    async fn next_event(&mut self) -> Result<ChatEvent, SolanagramError>;

    /// Forward one message from a source chat into a target chat.
    async fn forward_message(
        &mut self,
        source_chat: i64,
        message_id: i64,
        target_chat: i64,
    ) -> Result<(), SolanagramError>;

    /// Export the opaque session blob that restores this authorization.
    fn export_session(&self) -> Result<Vec<u8>, SolanagramError>;

    /// Tear down the transport. Idempotent; never fails.
    async fn disconnect(&mut self);
}

/// Factory for [`TelegramClient`] handles.
///
/// The connector itself crosses threads (it is handed to the bridge thread at
/// startup), but the clients it produces do not.
#[async_trait(?Send)]
pub trait TelegramConnector: Send + Sync {
    /// Materialize and connect a client, optionally restoring a session blob.
    ///
    /// A successful return means the transport is up; it says nothing about
    /// authorization (an unauthorized client is still valid for send-code).
    async fn connect(
        &self,
        creds: &ApiCredentials,
        session: Option<&[u8]>,
    ) -> Result<Box<dyn TelegramClient>, SolanagramError>;
}
