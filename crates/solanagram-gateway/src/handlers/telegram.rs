// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram browsing endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::ApiError;
use crate::state::{AppState, AuthUser};

/// GET /api/telegram/get-chats
///
/// Returns the caller's dialogs (groups, channels, users and bots). An
/// expired Telegram authorization surfaces as
/// `error_code=TELEGRAM_SESSION_EXPIRED`; missing api credentials as
/// `API_CREDENTIALS_NOT_SET`.
pub async fn get_chats(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let chats = state.bridge.get_chats(user.phone).await?;
    Ok(Json(json!({
        "success": true,
        "count": chats.len(),
        "chats": chats,
    })))
}
