// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listener, elaboration, saved-message and extracted-value operations.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use solanagram_core::types::{
    ChatRef, ElaborationKind, ExtractedValue, MessageElaboration, MessageListener,
    NewElaboration, NewExtractedValue, NewSavedMessage, SavedMessage,
};
use solanagram_core::SolanagramError;

use crate::database::map_conflict;
use crate::models::{ElaborationRow, ExtractedValueRow, ListenerRow, SavedMessageRow};

pub async fn create_listener(
    pool: &PgPool,
    user_id: i64,
    source: &ChatRef,
    container_name: &str,
) -> Result<MessageListener, SolanagramError> {
    let row: ListenerRow = sqlx::query_as(
        "INSERT INTO message_listeners
             (user_id, source_chat_id, source_chat_title, source_chat_username,
              source_chat_type, container_name, container_status)
         VALUES ($1, $2, $3, $4, $5, $6, 'creating')
         RETURNING *",
    )
    .bind(user_id)
    .bind(source.id)
    .bind(&source.title)
    .bind(&source.username)
    .bind(source.kind.to_string())
    .bind(container_name)
    .fetch_one(pool)
    .await
    .map_err(|e| map_conflict(e, "a listener already exists for this source chat"))?;
    row.try_into()
}

pub async fn listener(
    pool: &PgPool,
    id: i64,
) -> Result<Option<MessageListener>, SolanagramError> {
    let row: Option<ListenerRow> = sqlx::query_as("SELECT * FROM message_listeners WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SolanagramError::storage)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn listeners_for_user(
    pool: &PgPool,
    user_id: i64,
) -> Result<Vec<MessageListener>, SolanagramError> {
    let rows: Vec<ListenerRow> = sqlx::query_as(
        "SELECT * FROM message_listeners WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(SolanagramError::storage)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn running_listeners(pool: &PgPool) -> Result<Vec<MessageListener>, SolanagramError> {
    let rows: Vec<ListenerRow> =
        sqlx::query_as("SELECT * FROM message_listeners WHERE container_status = 'running'")
            .fetch_all(pool)
            .await
            .map_err(SolanagramError::storage)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn mark_listener_running(
    pool: &PgPool,
    id: i64,
    container_id: &str,
) -> Result<(), SolanagramError> {
    sqlx::query(
        "UPDATE message_listeners
         SET container_status = 'running', is_active = TRUE, container_id = $2
         WHERE id = $1",
    )
    .bind(id)
    .bind(container_id)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn mark_listener_stopped(pool: &PgPool, id: i64) -> Result<(), SolanagramError> {
    sqlx::query(
        "UPDATE message_listeners
         SET container_status = 'stopped', is_active = FALSE
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn mark_listener_error(
    pool: &PgPool,
    id: i64,
    reason: &str,
) -> Result<(), SolanagramError> {
    sqlx::query(
        "UPDATE message_listeners
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

pub async fn delete_listener(pool: &PgPool, id: i64) -> Result<(), SolanagramError> {
    sqlx::query("DELETE FROM message_listeners WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn bump_listener_stats(
    pool: &PgPool,
    listener_id: i64,
    saved: u32,
    error: Option<&str>,
) -> Result<(), SolanagramError> {
    sqlx::query(
        "UPDATE message_listeners
         SET messages_saved = messages_saved + $2,
             errors_count = errors_count + CASE WHEN $3::text IS NULL THEN 0 ELSE 1 END,
             last_error = COALESCE($3, last_error)
         WHERE id = $1",
    )
    .bind(listener_id)
    .bind(i64::from(saved))
    .bind(error)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(())
}

/// Attach an elaboration inside a transaction that re-checks the
/// one-redirect rule under a row lock; the partial unique index is the
/// backstop for anything that slips past.
pub async fn add_elaboration(
    pool: &PgPool,
    listener_id: i64,
    elaboration: NewElaboration,
) -> Result<MessageElaboration, SolanagramError> {
    let mut tx = pool.begin().await.map_err(SolanagramError::storage)?;

    if elaboration.kind == ElaborationKind::Redirect {
        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT id FROM message_elaborations
             WHERE listener_id = $1 AND type = 'redirect'
             FOR UPDATE",
        )
        .bind(listener_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(SolanagramError::storage)?;
        if existing.is_some() {
            return Err(SolanagramError::AlreadyActive(
                "listener already has a redirect elaboration".to_string(),
            ));
        }
    }

    let row: ElaborationRow = sqlx::query_as(
        "INSERT INTO message_elaborations (listener_id, type, name, config, priority)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(listener_id)
    .bind(elaboration.kind.to_string())
    .bind(&elaboration.name)
    .bind(&elaboration.config)
    .bind(elaboration.priority)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| map_conflict(e, "elaboration name or redirect already present"))?;

    tx.commit().await.map_err(SolanagramError::storage)?;
    row.try_into()
}

pub async fn elaborations(
    pool: &PgPool,
    listener_id: i64,
) -> Result<Vec<MessageElaboration>, SolanagramError> {
    let rows: Vec<ElaborationRow> = sqlx::query_as(
        "SELECT * FROM message_elaborations
         WHERE listener_id = $1
         ORDER BY priority, id",
    )
    .bind(listener_id)
    .fetch_all(pool)
    .await
    .map_err(SolanagramError::storage)?;
    rows.into_iter().map(TryInto::try_into).collect()
}

pub async fn set_elaboration_active(
    pool: &PgPool,
    id: i64,
    active: bool,
) -> Result<(), SolanagramError> {
    let result = sqlx::query("UPDATE message_elaborations SET is_active = $2 WHERE id = $1")
        .bind(id)
        .bind(active)
        .execute(pool)
        .await
        .map_err(SolanagramError::storage)?;
    if result.rows_affected() == 0 {
        return Err(SolanagramError::NotFound(format!("elaboration {id}")));
    }
    Ok(())
}

pub async fn delete_elaboration(pool: &PgPool, id: i64) -> Result<(), SolanagramError> {
    sqlx::query("DELETE FROM message_elaborations WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn bump_elaboration_stats(
    pool: &PgPool,
    id: i64,
    processed: u32,
    error: Option<&str>,
) -> Result<(), SolanagramError> {
    sqlx::query(
        "UPDATE message_elaborations
         SET processed_count = processed_count + $2,
             last_processed_at = CASE WHEN $2 > 0 THEN now() ELSE last_processed_at END,
             error_count = error_count + CASE WHEN $3::text IS NULL THEN 0 ELSE 1 END,
             last_error_message = COALESCE($3, last_error_message)
         WHERE id = $1",
    )
    .bind(id)
    .bind(i64::from(processed))
    .bind(error)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn insert_saved_message(
    pool: &PgPool,
    msg: NewSavedMessage,
) -> Result<Option<i64>, SolanagramError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "INSERT INTO saved_messages
             (listener_id, message_id, message_text, data, sender_id, sender_name, message_date)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         ON CONFLICT (listener_id, message_id) DO NOTHING
         RETURNING id",
    )
    .bind(msg.listener_id)
    .bind(msg.message_id)
    .bind(&msg.message_text)
    .bind(&msg.data)
    .bind(msg.sender_id)
    .bind(&msg.sender_name)
    .bind(msg.message_date)
    .fetch_optional(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(row.map(|(id,)| id))
}

pub async fn saved_messages(
    pool: &PgPool,
    listener_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<SavedMessage>, SolanagramError> {
    let rows: Vec<SavedMessageRow> = sqlx::query_as(
        "SELECT * FROM saved_messages
         WHERE listener_id = $1
         ORDER BY id DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(listener_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn purge_saved_messages_older_than(
    pool: &PgPool,
    age: Duration,
) -> Result<u64, SolanagramError> {
    let cutoff = Utc::now() - chrono::Duration::from_std(age).unwrap_or(chrono::Duration::zero());
    let result = sqlx::query("DELETE FROM saved_messages WHERE saved_at < $1")
        .bind(cutoff)
        .execute(pool)
        .await
        .map_err(SolanagramError::storage)?;
    Ok(result.rows_affected())
}

pub async fn insert_extracted_value(
    pool: &PgPool,
    value: NewExtractedValue,
) -> Result<bool, SolanagramError> {
    let result = sqlx::query(
        "INSERT INTO extracted_values
             (elaboration_id, saved_message_id, rule_name, extracted_value, occurrence_index)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (elaboration_id, saved_message_id, rule_name, occurrence_index)
         DO NOTHING",
    )
    .bind(value.elaboration_id)
    .bind(value.saved_message_id)
    .bind(&value.rule_name)
    .bind(&value.extracted_value)
    .bind(value.occurrence_index)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(result.rows_affected() == 1)
}

pub async fn extracted_values(
    pool: &PgPool,
    elaboration_id: i64,
    limit: i64,
) -> Result<Vec<ExtractedValue>, SolanagramError> {
    let rows: Vec<ExtractedValueRow> = sqlx::query_as(
        "SELECT * FROM extracted_values
         WHERE elaboration_id = $1
         ORDER BY id DESC
         LIMIT $2",
    )
    .bind(elaboration_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(SolanagramError::storage)?;
    Ok(rows.into_iter().map(Into::into).collect())
}
