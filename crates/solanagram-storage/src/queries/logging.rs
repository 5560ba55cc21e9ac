// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging-session and message-log operations.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use solanagram_core::types::{ChatRef, LoggingSession, MessageLog, NewMessageLog};
use solanagram_core::SolanagramError;

use crate::database::map_conflict;
use crate::models::{LoggingSessionRow, MessageLogRow};

/// Reserve a new session in `creating` for (user, chat) in one transaction.
///
/// Any existing active row for the pair is locked `FOR UPDATE` so two
/// concurrent starts serialize; exactly one of them observes the conflict.
/// The partial unique index backs this up against races outside the lock.
pub async fn reserve_logging_session(
    pool: &PgPool,
    user_id: i64,
    chat: &ChatRef,
    container_name: &str,
) -> Result<LoggingSession, SolanagramError> {
    let mut tx = pool.begin().await.map_err(SolanagramError::storage)?;

    let existing: Option<(i64,)> = sqlx::query_as(
        "SELECT id FROM logging_sessions
         WHERE user_id = $1 AND chat_id = $2 AND is_active
         FOR UPDATE",
    )
    .bind(user_id)
    .bind(chat.id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(SolanagramError::storage)?;

    if existing.is_some() {
        return Err(SolanagramError::AlreadyActive(format!(
            "logging session already active for chat {}",
            chat.id
        )));
    }

    let row: LoggingSessionRow = sqlx::query_as(
        "INSERT INTO logging_sessions
             (user_id, chat_id, chat_title, chat_username, chat_type,
              container_name, container_status)
         VALUES ($1, $2, $3, $4, $5, $6, 'creating')
         RETURNING *",
    )
    .bind(user_id)
    .bind(chat.id)
    .bind(&chat.title)
    .bind(&chat.username)
    .bind(chat.kind.to_string())
    .bind(container_name)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_conflict(e, "logging session already active for this chat"))?;

    tx.commit().await.map_err(SolanagramError::storage)?;
    row.try_into()
}

pub async fn logging_session(
    pool: &PgPool,
    id: i64,
) -> Result<Option<LoggingSession>, SolanagramError> {
    let row: Option<LoggingSessionRow> =
        sqlx::query_as("SELECT * FROM logging_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(SolanagramError::storage)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn logging_sessions_for_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<LoggingSession>, SolanagramError> {
    let rows: Vec<LoggingSessionRow> = sqlx::query_as(
        "SELECT * FROM logging_sessions WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(SolanagramError::storage)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn active_session_for_chat(
    pool: &PgPool,
    user_id: i64,
    chat_id: i64,
) -> Result<Option<LoggingSession>, SolanagramError> {
    let row: Option<LoggingSessionRow> = sqlx::query_as(
        "SELECT * FROM logging_sessions WHERE user_id = $1 AND chat_id = $2 AND is_active",
    )
    .bind(user_id)
    .bind(chat_id)
    .fetch_optional(pool)
    .await
    .map_err(SolanagramError::storage)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn running_logging_sessions(
    pool: &PgPool,
) -> Result<Vec<LoggingSession>, SolanagramError> {
    let rows: Vec<LoggingSessionRow> =
        sqlx::query_as("SELECT * FROM logging_sessions WHERE container_status = 'running'")
            .fetch_all(pool)
            .await
            .map_err(SolanagramError::storage)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn mark_session_running(
    pool: &PgPool,
    id: i64,
    container_id: &str,
) -> Result<(), SolanagramError> {
    sqlx::query(
        "UPDATE logging_sessions
         SET container_status = 'running', container_id = $2
         WHERE id = $1",
    )
    .bind(id)
    .bind(container_id)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn mark_session_stopped(pool: &PgPool, id: i64) -> Result<(), SolanagramError> {
    sqlx::query(
        "UPDATE logging_sessions
         SET container_status = 'stopped', is_active = FALSE
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn mark_session_error(
    pool: &PgPool,
    id: i64,
    reason: &str,
) -> Result<(), SolanagramError> {
    sqlx::query(
        "UPDATE logging_sessions
         SET container_status = 'error', is_active = FALSE,
             errors_count = errors_count + 1, last_error = $2
         WHERE id = $1",
    )
    .bind(id)
    .bind(reason)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn delete_logging_session(pool: &PgPool, id: i64) -> Result<(), SolanagramError> {
    sqlx::query("DELETE FROM logging_sessions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn remove_error_sessions_older_than(
    pool: &PgPool,
    age: Duration,
) -> Result<u64, SolanagramError> {
    let cutoff = Utc::now() - chrono::Duration::from_std(age).unwrap_or(chrono::Duration::zero());
    let result = sqlx::query(
        "UPDATE logging_sessions
         SET container_status = 'removed'
         WHERE container_status = 'error' AND updated_at < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(result.rows_affected())
}

/// Idempotent capture insert: a replayed (chat, message, session) triple is
/// swallowed by the unique constraint, not reported as an error.
pub async fn insert_message_log(
    pool: &PgPool,
    log: NewMessageLog,
) -> Result<bool, SolanagramError> {
    let result = sqlx::query(
        "INSERT INTO message_logs
             (user_id, chat_id, chat_title, chat_username, chat_type,
              message_id, sender_id, sender_name, sender_username,
              message_text, message_type, media_file_id, message_date,
              logging_session_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
         ON CONFLICT (chat_id, message_id, logging_session_id) DO NOTHING",
    )
    .bind(log.user_id)
    .bind(log.chat_id)
    .bind(&log.chat_title)
    .bind(&log.chat_username)
    .bind(&log.chat_type)
    .bind(log.message_id)
    .bind(log.sender_id)
    .bind(&log.sender_name)
    .bind(&log.sender_username)
    .bind(&log.message_text)
    .bind(log.message_type.to_string())
    .bind(log.media_file_id)
    .bind(log.message_date)
    .bind(log.logging_session_id)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(result.rows_affected() == 1)
}

pub async fn message_logs(
    pool: &PgPool,
    session_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<MessageLog>, SolanagramError> {
    let rows: Vec<MessageLogRow> = sqlx::query_as(
        "SELECT * FROM message_logs
         WHERE logging_session_id = $1
         ORDER BY id DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(session_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn bump_session_stats(
    pool: &PgPool,
    session_id: i64,
    logged: u32,
    error: Option<&str>,
) -> Result<(), SolanagramError> {
    sqlx::query(
        "UPDATE logging_sessions
         SET messages_logged = messages_logged + $2,
             last_message_at = CASE WHEN $2 > 0 THEN now() ELSE last_message_at END,
             errors_count = errors_count + CASE WHEN $3::text IS NULL THEN 0 ELSE 1 END,
             last_error = COALESCE($3, last_error)
         WHERE id = $1",
    )
    .bind(session_id)
    .bind(i64::from(logged))
    .bind(error)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn purge_message_logs_older_than(
    pool: &PgPool,
    age: Duration,
) -> Result<u64, SolanagramError> {
    let cutoff = Utc::now() - chrono::Duration::from_std(age).unwrap_or(chrono::Duration::zero());
    let result = sqlx::query("DELETE FROM message_logs WHERE logged_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await
        .map_err(SolanagramError::storage)?;
    Ok(result.rows_affected())
}
