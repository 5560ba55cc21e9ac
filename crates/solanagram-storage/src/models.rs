// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types mirroring the Postgres schema.
//!
//! Statuses and phones are stored as text; conversion into the typed domain
//! models happens here so a corrupted row surfaces as a storage error rather
//! than a panic deep in a handler.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use solanagram_core::types::{
    ContainerStatus, ElaborationKind, ExtractedValue, LoggingSession, MessageElaboration,
    MessageListener, MessageLog, Phone, SavedMessage, User,
};
use solanagram_core::SolanagramError;

fn bad_row(what: &str, value: &str) -> SolanagramError {
    SolanagramError::Internal(format!("corrupted row: invalid {what} {value:?}"))
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub phone: String,
    pub password_hash: String,
    pub api_id: Option<i32>,
    pub api_hash: Option<Vec<u8>>,
    pub telegram_session: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl TryFrom<UserRow> for User {
    type Error = SolanagramError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            phone: Phone::parse(&row.phone).map_err(|_| bad_row("phone", &row.phone))?,
            password_hash: row.password_hash,
            api_id: row.api_id,
            api_hash: row.api_hash,
            telegram_session: row.telegram_session,
            created_at: row.created_at,
            last_login: row.last_login,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct LoggingSessionRow {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub chat_title: String,
    pub chat_username: Option<String>,
    pub chat_type: String,
    pub is_active: bool,
    pub container_name: Option<String>,
    pub container_id: Option<String>,
    pub container_status: String,
    pub messages_logged: i64,
    pub errors_count: i64,
    pub last_error: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LoggingSessionRow> for LoggingSession {
    type Error = SolanagramError;

    fn try_from(row: LoggingSessionRow) -> Result<Self, Self::Error> {
        let container_status = ContainerStatus::from_str(&row.container_status)
            .map_err(|_| bad_row("container_status", &row.container_status))?;
        Ok(LoggingSession {
            id: row.id,
            user_id: row.user_id,
            chat_id: row.chat_id,
            chat_title: row.chat_title,
            chat_username: row.chat_username,
            chat_type: row.chat_type,
            is_active: row.is_active,
            container_name: row.container_name,
            container_id: row.container_id,
            container_status,
            messages_logged: row.messages_logged,
            errors_count: row.errors_count,
            last_error: row.last_error,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct MessageLogRow {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub chat_title: String,
    pub chat_username: Option<String>,
    pub chat_type: String,
    pub message_id: i64,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub sender_username: Option<String>,
    pub message_text: Option<String>,
    pub message_type: String,
    pub media_file_id: Option<i64>,
    pub message_date: DateTime<Utc>,
    pub logged_at: DateTime<Utc>,
    pub logging_session_id: i64,
}

impl From<MessageLogRow> for MessageLog {
    fn from(row: MessageLogRow) -> Self {
        MessageLog {
            id: row.id,
            user_id: row.user_id,
            chat_id: row.chat_id,
            chat_title: row.chat_title,
            chat_username: row.chat_username,
            chat_type: row.chat_type,
            message_id: row.message_id,
            sender_id: row.sender_id,
            sender_name: row.sender_name,
            sender_username: row.sender_username,
            message_text: row.message_text,
            message_type: row.message_type,
            media_file_id: row.media_file_id,
            message_date: row.message_date,
            logged_at: row.logged_at,
            logging_session_id: row.logging_session_id,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ListenerRow {
    pub id: i64,
    pub user_id: i64,
    pub source_chat_id: i64,
    pub source_chat_title: String,
    pub source_chat_username: Option<String>,
    pub source_chat_type: String,
    pub is_active: bool,
    pub container_name: Option<String>,
    pub container_id: Option<String>,
    pub container_status: String,
    pub messages_saved: i64,
    pub errors_count: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ListenerRow> for MessageListener {
    type Error = SolanagramError;

    fn try_from(row: ListenerRow) -> Result<Self, Self::Error> {
        let container_status = ContainerStatus::from_str(&row.container_status)
            .map_err(|_| bad_row("container_status", &row.container_status))?;
        Ok(MessageListener {
            id: row.id,
            user_id: row.user_id,
            source_chat_id: row.source_chat_id,
            source_chat_title: row.source_chat_title,
            source_chat_username: row.source_chat_username,
            source_chat_type: row.source_chat_type,
            is_active: row.is_active,
            container_name: row.container_name,
            container_id: row.container_id,
            container_status,
            messages_saved: row.messages_saved,
            errors_count: row.errors_count,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct ElaborationRow {
    pub id: i64,
    pub listener_id: i64,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub name: String,
    pub config: serde_json::Value,
    pub is_active: bool,
    pub priority: i32,
    pub processed_count: i64,
    pub error_count: i64,
    pub last_error_message: Option<String>,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ElaborationRow> for MessageElaboration {
    type Error = SolanagramError;

    fn try_from(row: ElaborationRow) -> Result<Self, Self::Error> {
        let kind = ElaborationKind::from_str(&row.kind)
            .map_err(|_| bad_row("elaboration type", &row.kind))?;
        Ok(MessageElaboration {
            id: row.id,
            listener_id: row.listener_id,
            kind,
            name: row.name,
            config: row.config,
            is_active: row.is_active,
            priority: row.priority,
            processed_count: row.processed_count,
            error_count: row.error_count,
            last_error_message: row.last_error_message,
            last_processed_at: row.last_processed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct SavedMessageRow {
    pub id: i64,
    pub listener_id: i64,
    pub message_id: i64,
    pub message_text: Option<String>,
    pub data: serde_json::Value,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub message_date: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl From<SavedMessageRow> for SavedMessage {
    fn from(row: SavedMessageRow) -> Self {
        SavedMessage {
            id: row.id,
            listener_id: row.listener_id,
            message_id: row.message_id,
            message_text: row.message_text,
            data: row.data,
            sender_id: row.sender_id,
            sender_name: row.sender_name,
            message_date: row.message_date,
            saved_at: row.saved_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ExtractedValueRow {
    pub id: i64,
    pub elaboration_id: i64,
    pub saved_message_id: i64,
    pub rule_name: String,
    pub extracted_value: String,
    pub occurrence_index: i32,
    pub extracted_at: DateTime<Utc>,
}

impl From<ExtractedValueRow> for ExtractedValue {
    fn from(row: ExtractedValueRow) -> Self {
        ExtractedValue {
            id: row.id,
            elaboration_id: row.elaboration_id,
            saved_message_id: row.saved_message_id,
            rule_name: row.rule_name,
            extracted_value: row.extracted_value,
            occurrence_index: row.occurrence_index,
            extracted_at: row.extracted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_session_row_rejects_unknown_status() {
        let row = LoggingSessionRow {
            id: 1,
            user_id: 1,
            chat_id: -100,
            chat_title: "t".into(),
            chat_username: None,
            chat_type: "channel".into(),
            is_active: true,
            container_name: None,
            container_id: None,
            container_status: "launching".into(),
            messages_logged: 0,
            errors_count: 0,
            last_error: None,
            last_message_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(LoggingSession::try_from(row).is_err());
    }

    #[test]
    fn elaboration_row_parses_kind() {
        let row = ElaborationRow {
            id: 1,
            listener_id: 2,
            kind: "redirect".into(),
            name: "to-backup".into(),
            config: serde_json::json!({"target_chat_id": -100}),
            is_active: true,
            priority: 0,
            processed_count: 0,
            error_count: 0,
            last_error_message: None,
            last_processed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let elaboration = MessageElaboration::try_from(row).unwrap();
        assert_eq!(elaboration.kind, ElaborationKind::Redirect);
    }
}
