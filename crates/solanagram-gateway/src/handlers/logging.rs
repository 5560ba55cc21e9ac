// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging-pipeline endpoints: per-chat capture workers and their history.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use solanagram_core::traits::Store as _;
use solanagram_core::types::{ChatKind, ChatRef};
use solanagram_core::SolanagramError;

use crate::error::ApiError;
use crate::messages;
use crate::state::{AppState, AuthUser};

/// GET /api/logging/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.store.logging_sessions_for_user(user.user_id).await?;
    Ok(Json(json!({
        "success": true,
        "count": sessions.len(),
        "sessions": sessions,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StartLoggingRequest {
    #[serde(default)]
    pub chat_id: Option<i64>,
    #[serde(default)]
    pub chat_title: Option<String>,
    #[serde(default)]
    pub chat_username: Option<String>,
    #[serde(default)]
    pub chat_type: Option<String>,
}

fn chat_from_request(
    chat_id: i64,
    title: Option<String>,
    username: Option<String>,
    chat_type: Option<String>,
) -> ChatRef {
    let kind = chat_type
        .as_deref()
        .and_then(|t| t.parse().ok())
        .unwrap_or(if chat_id < 0 {
            ChatKind::Channel
        } else {
            ChatKind::Private
        });
    ChatRef {
        id: chat_id,
        title: title.unwrap_or_else(|| format!("Chat {chat_id}")),
        username,
        kind,
    }
}

/// POST /api/logging/sessions
///
/// Starts a capture worker for the chat; a second start for the same chat
/// conflicts with `AlreadyActive`.
pub async fn start_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<StartLoggingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(chat_id) = body.chat_id else {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    };
    let chat = chat_from_request(chat_id, body.chat_title, body.chat_username, body.chat_type);

    let session = state.supervisor.start_logging(user.user_id, &chat).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "session_id": session.id,
            "container_name": session.container_name,
            "container_status": session.container_status,
        })),
    ))
}

/// POST /api/logging/sessions/{id}/stop
pub async fn stop_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .supervisor
        .stop_logging(user.user_id, session_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "session_id": session.id,
        "is_active": session.is_active,
        "container_status": session.container_status,
    })))
}

/// DELETE /api/logging/sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .supervisor
        .remove_logging(user.user_id, session_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// GET /api/logging/messages/{session_id}
pub async fn session_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .store
        .logging_session(session_id)
        .await?
        .filter(|s| s.user_id == user.user_id)
        .ok_or_else(|| SolanagramError::NotFound(format!("logging session {session_id}")))?;

    let limit = page.limit.clamp(1, 200);
    let offset = page.offset.max(0);
    let logs = state.store.message_logs(session.id, limit, offset).await?;
    Ok(Json(json!({
        "success": true,
        "session_id": session.id,
        "count": logs.len(),
        "messages": logs,
    })))
}

/// GET /api/logging/chat/{chat_id}/status
pub async fn chat_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(chat_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let session = state
        .store
        .active_session_for_chat(user.user_id, chat_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "chat_id": chat_id,
        "active": session.is_some(),
        "session": session,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_kind_defaults_by_id_sign() {
        let chat = chat_from_request(-1001234567890, None, None, None);
        assert_eq!(chat.kind, ChatKind::Channel);
        assert_eq!(chat.title, "Chat -1001234567890");

        let chat = chat_from_request(42, None, None, None);
        assert_eq!(chat.kind, ChatKind::Private);
    }

    #[test]
    fn explicit_chat_type_wins() {
        let chat = chat_from_request(-100, None, None, Some("supergroup".to_string()));
        assert_eq!(chat.kind, ChatKind::Supergroup);
    }
}
