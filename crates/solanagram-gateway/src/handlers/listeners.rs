// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listener / elaboration pipeline endpoints.
//!
//! The one-redirect-per-listener rule is checked here too, before the store
//! and its partial unique index get a say, so API callers receive the
//! conflict even when racing the database would have caught it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use solanagram_core::traits::Store as _;
use solanagram_core::types::{ChatKind, ChatRef, ElaborationKind, MessageListener, NewElaboration};
use solanagram_core::{SolanagramError, WorkerKind};

use crate::error::ApiError;
use crate::handlers::logging::PageQuery;
use crate::messages;
use crate::state::{AppState, AuthUser};

async fn owned_listener(
    state: &AppState,
    user: &AuthUser,
    listener_id: i64,
) -> Result<MessageListener, ApiError> {
    state
        .store
        .listener(listener_id)
        .await?
        .filter(|l| l.user_id == user.user_id)
        .ok_or_else(|| SolanagramError::NotFound(format!("listener {listener_id}")).into())
}

/// GET /api/listeners
pub async fn list_listeners(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let listeners = state.store.listeners_for_user(user.user_id).await?;
    Ok(Json(json!({
        "success": true,
        "count": listeners.len(),
        "listeners": listeners,
    })))
}

#[derive(Debug, Deserialize)]
pub struct StartListenerRequest {
    #[serde(default)]
    pub source_chat_id: Option<i64>,
    #[serde(default)]
    pub source_chat_title: Option<String>,
    #[serde(default)]
    pub source_chat_username: Option<String>,
    #[serde(default)]
    pub source_chat_type: Option<String>,
    /// "listener" (default) or "forwarder".
    #[serde(default)]
    pub kind: Option<String>,
}

/// POST /api/listeners
pub async fn start_listener(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<StartListenerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(chat_id) = body.source_chat_id else {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    };
    let kind = match body.kind.as_deref() {
        None | Some("listener") => WorkerKind::Listener,
        Some("forwarder") => WorkerKind::Forwarder,
        Some(_) => return Err(ApiError::validation(messages::REQUIRED_FIELDS)),
    };

    let source = ChatRef {
        id: chat_id,
        title: body
            .source_chat_title
            .unwrap_or_else(|| format!("Chat {chat_id}")),
        username: body.source_chat_username,
        kind: body
            .source_chat_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or(ChatKind::Channel),
    };

    let listener = state
        .supervisor
        .start_listener(user.user_id, &source, kind)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "listener_id": listener.id,
            "container_name": listener.container_name,
            "container_status": listener.container_status,
        })),
    ))
}

/// POST /api/listeners/{id}/stop
pub async fn stop_listener(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listener_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let listener = state
        .supervisor
        .stop_listener(user.user_id, listener_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "listener_id": listener.id,
        "is_active": listener.is_active,
        "container_status": listener.container_status,
    })))
}

/// POST /api/listeners/{id}/restart
///
/// Relaunches the worker so it picks up the current elaboration set.
pub async fn restart_listener(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listener_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let listener = state
        .supervisor
        .restart_listener(user.user_id, listener_id)
        .await?;
    Ok(Json(json!({
        "success": true,
        "listener_id": listener.id,
        "container_status": listener.container_status,
    })))
}

/// DELETE /api/listeners/{id}
pub async fn delete_listener(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listener_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .supervisor
        .remove_listener(user.user_id, listener_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/listeners/{id}/elaborations
pub async fn list_elaborations(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listener_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let listener = owned_listener(&state, &user, listener_id).await?;
    let elaborations = state.store.elaborations(listener.id).await?;
    Ok(Json(json!({
        "success": true,
        "listener_id": listener.id,
        "count": elaborations.len(),
        "elaborations": elaborations,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AddElaborationRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub priority: Option<i32>,
}

/// POST /api/listeners/{id}/elaborations
pub async fn add_elaboration(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listener_id): Path<i64>,
    Json(body): Json<AddElaborationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let listener = owned_listener(&state, &user, listener_id).await?;

    let (Some(kind), Some(name)) = (body.kind, body.name) else {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    };
    let kind: ElaborationKind = kind
        .parse()
        .map_err(|_| ApiError::validation(messages::REQUIRED_FIELDS))?;

    if kind == ElaborationKind::Redirect {
        let existing = state.store.elaborations(listener.id).await?;
        if existing.iter().any(|e| e.kind == ElaborationKind::Redirect) {
            return Err(SolanagramError::AlreadyActive(
                "listener already has a redirect elaboration".to_string(),
            )
            .into());
        }
    }

    let elaboration = state
        .store
        .add_elaboration(
            listener.id,
            NewElaboration {
                kind,
                name,
                config: body.config.unwrap_or_else(|| json!({})),
                priority: body.priority.unwrap_or(0),
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "elaboration_id": elaboration.id,
            "elaboration": elaboration,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateElaborationRequest {
    pub is_active: bool,
}

/// PUT /api/listeners/{id}/elaborations/{elaboration_id}
pub async fn update_elaboration(
    State(state): State<AppState>,
    user: AuthUser,
    Path((listener_id, elaboration_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateElaborationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let listener = owned_listener(&state, &user, listener_id).await?;
    let owned = state
        .store
        .elaborations(listener.id)
        .await?
        .iter()
        .any(|e| e.id == elaboration_id);
    if !owned {
        return Err(
            SolanagramError::NotFound(format!("elaboration {elaboration_id}")).into(),
        );
    }
    state
        .store
        .set_elaboration_active(elaboration_id, body.is_active)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// DELETE /api/listeners/{id}/elaborations/{elaboration_id}
pub async fn delete_elaboration(
    State(state): State<AppState>,
    user: AuthUser,
    Path((listener_id, elaboration_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let listener = owned_listener(&state, &user, listener_id).await?;
    let owned = state
        .store
        .elaborations(listener.id)
        .await?
        .iter()
        .any(|e| e.id == elaboration_id);
    if !owned {
        return Err(
            SolanagramError::NotFound(format!("elaboration {elaboration_id}")).into(),
        );
    }
    state.store.delete_elaboration(elaboration_id).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/listeners/{id}/messages
pub async fn saved_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(listener_id): Path<i64>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let listener = owned_listener(&state, &user, listener_id).await?;
    let limit = page.limit.clamp(1, 200);
    let messages = state
        .store
        .saved_messages(listener.id, limit, page.offset.max(0))
        .await?;
    Ok(Json(json!({
        "success": true,
        "listener_id": listener.id,
        "count": messages.len(),
        "messages": messages,
    })))
}

/// GET /api/listeners/{id}/elaborations/{elaboration_id}/values
pub async fn extracted_values(
    State(state): State<AppState>,
    user: AuthUser,
    Path((listener_id, elaboration_id)): Path<(i64, i64)>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let listener = owned_listener(&state, &user, listener_id).await?;
    let owned = state
        .store
        .elaborations(listener.id)
        .await?
        .iter()
        .any(|e| e.id == elaboration_id);
    if !owned {
        return Err(
            SolanagramError::NotFound(format!("elaboration {elaboration_id}")).into(),
        );
    }
    let values = state
        .store
        .extracted_values(elaboration_id, page.limit.clamp(1, 500))
        .await?;
    Ok(Json(json!({
        "success": true,
        "elaboration_id": elaboration_id,
        "count": values.len(),
        "values": values,
    })))
}
