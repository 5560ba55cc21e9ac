// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The persistence port.
//!
//! Postgres is the authoritative store; uniqueness invariants (one active
//! logging session per (user, chat), one redirect per listener, idempotent
//! message inserts) are enforced by the backing schema and re-checked by
//! implementations of this trait so callers see typed conflicts.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::SolanagramError;
use crate::types::{
    ChatRef, ExtractedValue, LoggingSession, MessageElaboration, MessageListener, MessageLog,
    NewElaboration, NewExtractedValue, NewMessageLog, NewSavedMessage, NewUser, Phone,
    SavedMessage, User,
};

/// Persistence operations used by the orchestrator and the workers.
#[async_trait]
pub trait Store: Send + Sync {
    // --- users ---

    /// Create a user; fails with `AlreadyActive` on a duplicate phone.
    async fn create_user(&self, user: NewUser) -> Result<User, SolanagramError>;

    async fn user_by_phone(&self, phone: &Phone) -> Result<Option<User>, SolanagramError>;

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, SolanagramError>;

    async fn touch_last_login(&self, user_id: i64) -> Result<(), SolanagramError>;

    async fn set_password_hash(&self, user_id: i64, hash: &str) -> Result<(), SolanagramError>;

    /// Replace the api credentials; also clears the stored session blob,
    /// since the old authorization is bound to the old credentials.
    async fn set_api_credentials(
        &self,
        user_id: i64,
        api_id: i32,
        api_hash_ct: Vec<u8>,
    ) -> Result<(), SolanagramError>;

    /// Store (or clear, with `None`) the wrapped Telegram session blob.
    async fn set_session_blob(
        &self,
        user_id: i64,
        blob: Option<Vec<u8>>,
    ) -> Result<(), SolanagramError>;

    // --- logging sessions ---

    /// Atomically reserve a logging session in `creating` for (user, chat).
    ///
    /// Runs in one transaction: any existing active row for the pair is
    /// locked `FOR UPDATE` and produces `AlreadyActive`; otherwise the new
    /// row is inserted.
    async fn reserve_logging_session(
        &self,
        user_id: i64,
        chat: &ChatRef,
        container_name: &str,
    ) -> Result<LoggingSession, SolanagramError>;

    async fn logging_session(&self, id: i64)
        -> Result<Option<LoggingSession>, SolanagramError>;

    async fn logging_sessions_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<LoggingSession>, SolanagramError>;

    async fn active_session_for_chat(
        &self,
        user_id: i64,
        chat_id: i64,
    ) -> Result<Option<LoggingSession>, SolanagramError>;

    /// Sessions claiming `status = running`, for the reap pass.
    async fn running_logging_sessions(&self) -> Result<Vec<LoggingSession>, SolanagramError>;

    async fn mark_session_running(
        &self,
        id: i64,
        container_id: &str,
    ) -> Result<(), SolanagramError>;

    async fn mark_session_stopped(&self, id: i64) -> Result<(), SolanagramError>;

    async fn mark_session_error(&self, id: i64, reason: &str) -> Result<(), SolanagramError>;

    async fn delete_logging_session(&self, id: i64) -> Result<(), SolanagramError>;

    /// Transition rows stuck in `error` longer than `age` to `removed`.
    async fn remove_error_sessions_older_than(
        &self,
        age: Duration,
    ) -> Result<u64, SolanagramError>;

    // --- message logs ---

    /// Insert one captured message. Returns `false` when the row already
    /// existed (idempotent replay), which is not an error.
    async fn insert_message_log(&self, log: NewMessageLog) -> Result<bool, SolanagramError>;

    async fn message_logs(
        &self,
        session_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageLog>, SolanagramError>;

    /// Bump `messages_logged` / error counters on the session row.
    async fn bump_session_stats(
        &self,
        session_id: i64,
        logged: u32,
        error: Option<&str>,
    ) -> Result<(), SolanagramError>;

    /// Optional operator knob; no-op unless retention is configured.
    async fn purge_message_logs_older_than(
        &self,
        age: Duration,
    ) -> Result<u64, SolanagramError>;

    // --- listeners ---

    /// Create a listener row; unique on (user, source chat) regardless of
    /// activity, so a duplicate is `AlreadyActive`.
    async fn create_listener(
        &self,
        user_id: i64,
        source: &ChatRef,
        container_name: &str,
    ) -> Result<MessageListener, SolanagramError>;

    async fn listener(&self, id: i64) -> Result<Option<MessageListener>, SolanagramError>;

    async fn listeners_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<MessageListener>, SolanagramError>;

    async fn running_listeners(&self) -> Result<Vec<MessageListener>, SolanagramError>;

    async fn mark_listener_running(
        &self,
        id: i64,
        container_id: &str,
    ) -> Result<(), SolanagramError>;

    async fn mark_listener_stopped(&self, id: i64) -> Result<(), SolanagramError>;

    async fn mark_listener_error(&self, id: i64, reason: &str) -> Result<(), SolanagramError>;

    async fn delete_listener(&self, id: i64) -> Result<(), SolanagramError>;

    /// Bump `messages_saved` / error counters on the listener row.
    async fn bump_listener_stats(
        &self,
        listener_id: i64,
        saved: u32,
        error: Option<&str>,
    ) -> Result<(), SolanagramError>;

    // --- elaborations ---

    /// Attach an elaboration. Fails with `AlreadyActive` on a duplicate name
    /// or on a second redirect for the same listener.
    async fn add_elaboration(
        &self,
        listener_id: i64,
        elaboration: NewElaboration,
    ) -> Result<MessageElaboration, SolanagramError>;

    /// All elaborations for a listener, ordered by priority then id.
    async fn elaborations(
        &self,
        listener_id: i64,
    ) -> Result<Vec<MessageElaboration>, SolanagramError>;

    async fn set_elaboration_active(
        &self,
        id: i64,
        active: bool,
    ) -> Result<(), SolanagramError>;

    async fn delete_elaboration(&self, id: i64) -> Result<(), SolanagramError>;

    async fn bump_elaboration_stats(
        &self,
        id: i64,
        processed: u32,
        error: Option<&str>,
    ) -> Result<(), SolanagramError>;

    // --- saved messages ---

    /// Save one raw listener message. Returns the new row id, or `None`
    /// when (listener, message) was already saved.
    async fn insert_saved_message(
        &self,
        msg: NewSavedMessage,
    ) -> Result<Option<i64>, SolanagramError>;

    async fn saved_messages(
        &self,
        listener_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SavedMessage>, SolanagramError>;

    /// Delete saved messages older than `age` (30-day retention loop).
    async fn purge_saved_messages_older_than(
        &self,
        age: Duration,
    ) -> Result<u64, SolanagramError>;

    // --- extracted values ---

    /// Insert one extracted value. Returns `false` on idempotent replay.
    async fn insert_extracted_value(
        &self,
        value: NewExtractedValue,
    ) -> Result<bool, SolanagramError>;

    async fn extracted_values(
        &self,
        elaboration_id: i64,
        limit: i64,
    ) -> Result<Vec<ExtractedValue>, SolanagramError>;

    // --- meta ---

    /// Current schema version string from `db_info`, if recorded.
    async fn schema_version(&self) -> Result<Option<String>, SolanagramError>;
}
