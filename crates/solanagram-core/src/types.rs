// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common domain types used across the orchestrator crates.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::SolanagramError;

/// An E.164 phone number (`+` followed by 8-15 digits).
///
/// The phone is the platform-wide user identity and the key for every
/// per-account lock, so it is normalized exactly once, here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Parse and normalize a phone number. Spaces and dashes are stripped;
    /// the result must match `+` followed by 8-15 digits.
    pub fn parse(raw: &str) -> Result<Self, SolanagramError> {
        let cleaned: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        let digits = cleaned.strip_prefix('+').ok_or_else(|| {
            SolanagramError::Validation("phone number must start with '+'".into())
        })?;
        if digits.len() < 8 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(SolanagramError::Validation(
                "phone number must be + followed by 8-15 digits".into(),
            ));
        }
        Ok(Phone(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Phone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Telegram API credentials for one user, with the hash kept out of logs.
#[derive(Clone)]
pub struct ApiCredentials {
    pub api_id: i32,
    pub api_hash: SecretString,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"[redacted]")
            .finish()
    }
}

/// Kind of Telegram chat as reported by the dialog list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Bot,
    Group,
    Supergroup,
    Channel,
}

/// A chat reference as captured from the dialog list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRef {
    pub id: i64,
    pub title: String,
    pub username: Option<String>,
    pub kind: ChatKind,
}

/// Kind of worker container; becomes the `solanagram.type` label value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    Logger,
    Listener,
    Forwarder,
}

impl WorkerKind {
    /// Short token used in container names (`solanagram-log-…`).
    pub fn name_token(self) -> &'static str {
        match self {
            WorkerKind::Logger => "log",
            WorkerKind::Listener => "listener",
            WorkerKind::Forwarder => "fwd",
        }
    }
}

/// Lifecycle state of a worker row.
///
/// `creating -> running -> stopped`, with `error` on launch failure or
/// crash/vanish and `removed` after seven days in `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Creating,
    Running,
    Error,
    Stopped,
    Removed,
}

/// Kind of listener elaboration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ElaborationKind {
    Extractor,
    Redirect,
}

/// Message content classification for logged messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Photo,
    Video,
    Document,
    Sticker,
    Voice,
    Audio,
}

// --- Persisted entities ---

/// A registered platform user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub phone: Phone,
    pub password_hash: String,
    pub api_id: Option<i32>,
    /// Wrapped ciphertext of the Telegram api_hash; never plaintext at rest.
    pub api_hash: Option<Vec<u8>>,
    /// Wrapped ciphertext of the opaque client session blob, if authorized.
    pub telegram_session: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Payload for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub phone: Phone,
    pub password_hash: String,
    pub api_id: i32,
    pub api_hash: Vec<u8>,
}

/// A logging-session row: one background worker capturing one chat.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingSession {
    pub id: i64,
    pub user_id: i64,
    pub chat_id: i64,
    pub chat_title: String,
    pub chat_username: Option<String>,
    pub chat_type: String,
    pub is_active: bool,
    pub container_name: Option<String>,
    pub container_id: Option<String>,
    pub container_status: ContainerStatus,
    pub messages_logged: i64,
    pub errors_count: i64,
    pub last_error: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A captured message belonging to a logging session.
#[derive(Debug, Clone, Serialize)]
pub struct MessageLog {
    /// Global progressive number (database sequence; monotonic, not gap-free).
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
    /// Wall clock reported by Telegram.
    pub message_date: DateTime<Utc>,
    /// Wall clock at insert.
    pub logged_at: DateTime<Utc>,
    pub logging_session_id: i64,
}

/// Payload for an idempotent message-log insert.
#[derive(Debug, Clone)]
pub struct NewMessageLog {
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
    pub message_type: MessageKind,
    pub media_file_id: Option<i64>,
    pub message_date: DateTime<Utc>,
    pub logging_session_id: i64,
}

/// A listener row: one worker forwarding/extracting from one source chat.
#[derive(Debug, Clone, Serialize)]
pub struct MessageListener {
    pub id: i64,
    pub user_id: i64,
    pub source_chat_id: i64,
    pub source_chat_title: String,
    pub source_chat_username: Option<String>,
    pub source_chat_type: String,
    pub is_active: bool,
    pub container_name: Option<String>,
    pub container_id: Option<String>,
    pub container_status: ContainerStatus,
    pub messages_saved: i64,
    pub errors_count: i64,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An elaboration attached to a listener: an extractor rule set or the
/// single redirect target.
#[derive(Debug, Clone, Serialize)]
pub struct MessageElaboration {
    pub id: i64,
    pub listener_id: i64,
    pub kind: ElaborationKind,
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

/// Payload for attaching an elaboration to a listener.
#[derive(Debug, Clone)]
pub struct NewElaboration {
    pub kind: ElaborationKind,
    pub name: String,
    pub config: serde_json::Value,
    pub priority: i32,
}

/// A raw message captured by a listener.
#[derive(Debug, Clone, Serialize)]
pub struct SavedMessage {
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

/// Payload for saving a listener message (idempotent on (listener, message)).
#[derive(Debug, Clone)]
pub struct NewSavedMessage {
    pub listener_id: i64,
    pub message_id: i64,
    pub message_text: Option<String>,
    pub data: serde_json::Value,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub message_date: DateTime<Utc>,
}

/// One value produced by an extractor rule.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedValue {
    pub id: i64,
    pub elaboration_id: i64,
    pub saved_message_id: i64,
    pub rule_name: String,
    pub extracted_value: String,
    pub occurrence_index: i32,
    pub extracted_at: DateTime<Utc>,
}

/// Payload for an idempotent extracted-value insert.
#[derive(Debug, Clone)]
pub struct NewExtractedValue {
    pub elaboration_id: i64,
    pub saved_message_id: i64,
    pub rule_name: String,
    pub extracted_value: String,
    pub occurrence_index: i32,
}

// --- Telegram port types ---

/// The account behind a connected client, from the "who am I" probe.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo {
    pub id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub phone: Option<String>,
}

/// One entry of a user's dialog list.
#[derive(Debug, Clone, Serialize)]
pub struct DialogSummary {
    #[serde(flatten)]
    pub chat: ChatRef,
    pub members_count: Option<i32>,
    pub unread_count: i32,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Outcome of submitting a login code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignInOutcome {
    Authorized,
    PasswordNeeded,
}

/// A message event observed by a worker's client.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: i64,
    pub message_id: i64,
    pub sender_id: Option<i64>,
    pub sender_name: Option<String>,
    pub sender_username: Option<String>,
    pub text: Option<String>,
    pub kind: MessageKind,
    pub media_file_id: Option<i64>,
    pub date: DateTime<Utc>,
}

/// Event stream item delivered by a connected client.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    Message(IncomingMessage),
    /// The client library reported something we do not act on.
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn phone_parse_accepts_e164() {
        let p = Phone::parse("+391234567890").unwrap();
        assert_eq!(p.as_str(), "+391234567890");
    }

    #[test]
    fn phone_parse_strips_spaces_and_dashes() {
        let p = Phone::parse("+39 123-456 7890").unwrap();
        assert_eq!(p.as_str(), "+391234567890");
    }

    #[test]
    fn phone_parse_rejects_missing_plus() {
        assert!(Phone::parse("391234567890").is_err());
    }

    #[test]
    fn phone_parse_rejects_short_and_long() {
        assert!(Phone::parse("+1234567").is_err());
        assert!(Phone::parse("+1234567890123456").is_err());
    }

    #[test]
    fn phone_parse_rejects_letters() {
        assert!(Phone::parse("+39abc4567890").is_err());
    }

    #[test]
    fn container_status_round_trips_as_snake_case() {
        assert_eq!(ContainerStatus::Creating.to_string(), "creating");
        assert_eq!(
            ContainerStatus::from_str("running").unwrap(),
            ContainerStatus::Running
        );
        assert_eq!(ContainerStatus::Removed.to_string(), "removed");
    }

    #[test]
    fn worker_kind_name_tokens() {
        assert_eq!(WorkerKind::Logger.name_token(), "log");
        assert_eq!(WorkerKind::Listener.name_token(), "listener");
        assert_eq!(WorkerKind::Forwarder.name_token(), "fwd");
    }

    #[test]
    fn api_credentials_debug_redacts_hash() {
        let creds = ApiCredentials {
            api_id: 25128314,
            api_hash: SecretString::from("deadbeef".to_string()),
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("deadbeef"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn elaboration_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ElaborationKind::Redirect).unwrap();
        assert_eq!(json, "\"redirect\"");
    }
}
