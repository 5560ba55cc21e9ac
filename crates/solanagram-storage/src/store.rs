// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Postgres implementation of the core [`Store`] port.
//!
//! A thin delegation layer: every operation lives in the typed query
//! modules; this type only carries the pool and the trait impl.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use solanagram_core::traits::Store;
use solanagram_core::types::{
    ChatRef, ExtractedValue, LoggingSession, MessageElaboration, MessageListener, MessageLog,
    NewElaboration, NewExtractedValue, NewMessageLog, NewSavedMessage, NewUser, Phone,
    SavedMessage, User,
};
use solanagram_core::SolanagramError;

use crate::database::Database;
use crate::queries::{listeners, logging, users};

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn pool(&self) -> &PgPool {
        self.db.pool()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, SolanagramError> {
        users::create_user(self.pool(), user).await
    }

    async fn user_by_phone(&self, phone: &Phone) -> Result<Option<User>, SolanagramError> {
        users::user_by_phone(self.pool(), phone).await
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, SolanagramError> {
        users::user_by_id(self.pool(), id).await
    }

    async fn touch_last_login(&self, user_id: i64) -> Result<(), SolanagramError> {
        users::touch_last_login(self.pool(), user_id).await
    }

    async fn set_password_hash(&self, user_id: i64, hash: &str) -> Result<(), SolanagramError> {
        users::set_password_hash(self.pool(), user_id, hash).await
    }

    async fn set_api_credentials(
        &self,
        user_id: i64,
        api_id: i32,
        api_hash_ct: Vec<u8>,
    ) -> Result<(), SolanagramError> {
        users::set_api_credentials(self.pool(), user_id, api_id, api_hash_ct).await
    }

    async fn set_session_blob(
        &self,
        user_id: i64,
        blob: Option<Vec<u8>>,
    ) -> Result<(), SolanagramError> {
        users::set_session_blob(self.pool(), user_id, blob).await
    }

    async fn reserve_logging_session(
        &self,
        user_id: i64,
        chat: &ChatRef,
        container_name: &str,
    ) -> Result<LoggingSession, SolanagramError> {
        logging::reserve_logging_session(self.pool(), user_id, chat, container_name).await
    }

    async fn logging_session(
        &self,
        id: i64,
    ) -> Result<Option<LoggingSession>, SolanagramError> {
        logging::logging_session(self.pool(), id).await
    }

    async fn logging_sessions_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<LoggingSession>, SolanagramError> {
        logging::logging_sessions_for_user(self.pool(), user_id).await
    }

    async fn active_session_for_chat(
        &self,
        user_id: i64,
        chat_id: i64,
    ) -> Result<Option<LoggingSession>, SolanagramError> {
        logging::active_session_for_chat(self.pool(), user_id, chat_id).await
    }

    async fn running_logging_sessions(&self) -> Result<Vec<LoggingSession>, SolanagramError> {
        logging::running_logging_sessions(self.pool()).await
    }

    async fn mark_session_running(
        &self,
        id: i64,
        container_id: &str,
    ) -> Result<(), SolanagramError> {
        logging::mark_session_running(self.pool(), id, container_id).await
    }

    async fn mark_session_stopped(&self, id: i64) -> Result<(), SolanagramError> {
        logging::mark_session_stopped(self.pool(), id).await
    }

    async fn mark_session_error(&self, id: i64, reason: &str) -> Result<(), SolanagramError> {
        logging::mark_session_error(self.pool(), id, reason).await
    }

    async fn delete_logging_session(&self, id: i64) -> Result<(), SolanagramError> {
        logging::delete_logging_session(self.pool(), id).await
    }

    async fn remove_error_sessions_older_than(
        &self,
        age: Duration,
    ) -> Result<u64, SolanagramError> {
        logging::remove_error_sessions_older_than(self.pool(), age).await
    }

    async fn insert_message_log(&self, log: NewMessageLog) -> Result<bool, SolanagramError> {
        logging::insert_message_log(self.pool(), log).await
    }

    async fn message_logs(
        &self,
        session_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageLog>, SolanagramError> {
        logging::message_logs(self.pool(), session_id, limit, offset).await
    }

    async fn bump_session_stats(
        &self,
        session_id: i64,
        logged: u32,
        error: Option<&str>,
    ) -> Result<(), SolanagramError> {
        logging::bump_session_stats(self.pool(), session_id, logged, error).await
    }

    async fn purge_message_logs_older_than(
        &self,
        age: Duration,
    ) -> Result<u64, SolanagramError> {
        logging::purge_message_logs_older_than(self.pool(), age).await
    }

    async fn create_listener(
        &self,
        user_id: i64,
        source: &ChatRef,
        container_name: &str,
    ) -> Result<MessageListener, SolanagramError> {
        listeners::create_listener(self.pool(), user_id, source, container_name).await
    }

    async fn listener(&self, id: i64) -> Result<Option<MessageListener>, SolanagramError> {
        listeners::listener(self.pool(), id).await
    }

    async fn listeners_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<MessageListener>, SolanagramError> {
        listeners::listeners_for_user(self.pool(), user_id).await
    }

    async fn running_listeners(&self) -> Result<Vec<MessageListener>, SolanagramError> {
        listeners::running_listeners(self.pool()).await
    }

    async fn mark_listener_running(
        &self,
        id: i64,
        container_id: &str,
    ) -> Result<(), SolanagramError> {
        listeners::mark_listener_running(self.pool(), id, container_id).await
    }

    async fn mark_listener_stopped(&self, id: i64) -> Result<(), SolanagramError> {
        listeners::mark_listener_stopped(self.pool(), id).await
    }

    async fn mark_listener_error(&self, id: i64, reason: &str) -> Result<(), SolanagramError> {
        listeners::mark_listener_error(self.pool(), id, reason).await
    }

    async fn delete_listener(&self, id: i64) -> Result<(), SolanagramError> {
        listeners::delete_listener(self.pool(), id).await
    }

    async fn bump_listener_stats(
        &self,
        listener_id: i64,
        saved: u32,
        error: Option<&str>,
    ) -> Result<(), SolanagramError> {
        listeners::bump_listener_stats(self.pool(), listener_id, saved, error).await
    }

    async fn add_elaboration(
        &self,
        listener_id: i64,
        elaboration: NewElaboration,
    ) -> Result<MessageElaboration, SolanagramError> {
        listeners::add_elaboration(self.pool(), listener_id, elaboration).await
    }

    async fn elaborations(
        &self,
        listener_id: i64,
    ) -> Result<Vec<MessageElaboration>, SolanagramError> {
        listeners::elaborations(self.pool(), listener_id).await
    }

    async fn set_elaboration_active(
        &self,
        id: i64,
        active: bool,
    ) -> Result<(), SolanagramError> {
        listeners::set_elaboration_active(self.pool(), id, active).await
    }

    async fn delete_elaboration(&self, id: i64) -> Result<(), SolanagramError> {
        listeners::delete_elaboration(self.pool(), id).await
    }

    async fn bump_elaboration_stats(
        &self,
        id: i64,
        processed: u32,
        error: Option<&str>,
    ) -> Result<(), SolanagramError> {
        listeners::bump_elaboration_stats(self.pool(), id, processed, error).await
    }

    async fn insert_saved_message(
        &self,
        msg: NewSavedMessage,
    ) -> Result<Option<i64>, SolanagramError> {
        listeners::insert_saved_message(self.pool(), msg).await
    }

    async fn saved_messages(
        &self,
        listener_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SavedMessage>, SolanagramError> {
        listeners::saved_messages(self.pool(), listener_id, limit, offset).await
    }

    async fn purge_saved_messages_older_than(
        &self,
        age: Duration,
    ) -> Result<u64, SolanagramError> {
        listeners::purge_saved_messages_older_than(self.pool(), age).await
    }

    async fn insert_extracted_value(
        &self,
        value: NewExtractedValue,
    ) -> Result<bool, SolanagramError> {
        listeners::insert_extracted_value(self.pool(), value).await
    }

    async fn extracted_values(
        &self,
        elaboration_id: i64,
        limit: i64,
    ) -> Result<Vec<ExtractedValue>, SolanagramError> {
        listeners::extracted_values(self.pool(), elaboration_id, limit).await
    }

    async fn schema_version(&self) -> Result<Option<String>, SolanagramError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM db_info WHERE key = 'schema_version'")
                .fetch_optional(self.pool())
                .await
                .map_err(SolanagramError::storage)?;
        Ok(row.map(|(v,)| v))
    }
}
