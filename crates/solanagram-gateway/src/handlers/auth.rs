// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication and account endpoints.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use solanagram_core::traits::Store as _;
use solanagram_core::types::NewUser;
use solanagram_core::{Phone, SolanagramError};
use solanagram_telegram::SendCodeOutcome;

use crate::error::ApiError;
use crate::messages;
use crate::password;
use crate::state::{AppState, AuthUser};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_id: Option<serde_json::Value>,
    #[serde(default)]
    pub api_hash: Option<String>,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(phone), Some(pass), Some(api_id), Some(api_hash)) =
        (body.phone, body.password, body.api_id, body.api_hash)
    else {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    };
    if pass.is_empty() || api_hash.is_empty() {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    }

    let phone = Phone::parse(&phone)
        .map_err(|_| ApiError::validation(messages::INVALID_PHONE))?;
    let api_id = parse_api_id(&api_id)?;

    let password_hash = password::hash_password(&pass)?;
    let api_hash_ct = state
        .vault
        .wrap_str(&SecretString::from(api_hash))?;

    let user = state
        .store
        .create_user(NewUser {
            phone: phone.clone(),
            password_hash,
            api_id,
            api_hash: api_hash_ct,
        })
        .await
        .map_err(|e| match e {
            SolanagramError::AlreadyActive(_) => {
                ApiError::with_message(e, messages::PHONE_EXISTS)
            }
            other => ApiError::from(other),
        })?;

    info!(user_id = user.id, phone = %phone, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "user_id": user.id })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub force_new_code: bool,
}

/// POST /api/auth/login
///
/// Verifies the platform password, then triggers the Telegram send-code
/// flow (or reports that a still-valid code is cached).
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let started = Instant::now();
    let result = login_inner(&state, body).await;
    state.metrics.record(result.is_ok(), started.elapsed());
    result
}

async fn login_inner(
    state: &AppState,
    body: LoginRequest,
) -> Result<axum::response::Response, ApiError> {
    let (Some(phone), Some(pass)) = (body.phone_number, body.password) else {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    };
    let phone =
        Phone::parse(&phone).map_err(|_| ApiError::validation(messages::INVALID_PHONE))?;

    let user = state
        .store
        .user_by_phone(&phone)
        .await?
        .ok_or_else(|| SolanagramError::UnknownUser(phone.to_string()))?;
    if !user.is_active || !password::verify_password(&pass, &user.password_hash)? {
        return Err(ApiError::with_message(
            SolanagramError::Auth("password mismatch".to_string()),
            messages::INVALID_CREDENTIALS,
        ));
    }

    // The platform password doubles as the 2FA candidate during sign-in.
    let outcome = state
        .bridge
        .send_code(phone.clone(), Some(pass), body.force_new_code)
        .await?;

    let (message, cached) = match outcome {
        SendCodeOutcome::CodeSent => ("code_sent", false),
        SendCodeOutcome::CachedCodeAvailable => ("cached_code_available", true),
    };
    info!(phone = %phone, cached, "login code flow completed");
    Ok(Json(json!({ "success": true, "message": message, "cached": cached })).into_response())
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /api/auth/verify-code
pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(phone), Some(code)) = (body.phone_number, body.code) else {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    };
    let phone =
        Phone::parse(&phone).map_err(|_| ApiError::validation(messages::INVALID_PHONE))?;

    state
        .bridge
        .verify_code(phone.clone(), code, body.password)
        .await?;

    let user = state
        .store
        .user_by_phone(&phone)
        .await?
        .ok_or_else(|| SolanagramError::UnknownUser(phone.to_string()))?;
    let session_token = state.jwt.issue(user.id, &phone)?;

    Ok(Json(json!({
        "success": true,
        "session_token": session_token,
        "user": { "id": user.id, "phone": phone.as_str() },
    })))
}

#[derive(Debug, Deserialize)]
pub struct CachedCodeQuery {
    pub phone: String,
}

/// GET /api/auth/check-cached-code
pub async fn check_cached_code(
    State(state): State<AppState>,
    Query(query): Query<CachedCodeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let phone = Phone::parse(&query.phone)
        .map_err(|_| ApiError::validation(messages::INVALID_PHONE))?;
    let cached = state.bridge.cached_code(phone).await?;
    Ok(Json(json!({
        "success": true,
        "has_cached_code": cached.is_some(),
        "cached_code": cached,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ClearCachedCodeRequest {
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// POST /api/auth/clear-cached-code
pub async fn clear_cached_code(
    State(state): State<AppState>,
    Json(body): Json<ClearCachedCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(phone) = body.phone_number else {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    };
    let phone =
        Phone::parse(&phone).map_err(|_| ApiError::validation(messages::INVALID_PHONE))?;
    state.bridge.clear_cached_code(phone).await?;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/auth/validate-session
pub async fn validate_session(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let valid = state
        .store
        .user_by_id(user.user_id)
        .await?
        .map(|u| u.is_active)
        .unwrap_or(false);
    Ok(Json(json!({ "success": true, "session_valid": valid })))
}

/// POST /api/auth/reactivate-session
///
/// Requests a fresh login code for a caller whose Telegram authorization
/// has expired.
pub async fn reactivate_session(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    state.bridge.send_code(user.phone, None, true).await?;
    Ok(Json(json!({ "success": true, "message": "code_sent" })))
}

#[derive(Debug, Deserialize)]
pub struct VerifySessionCodeRequest {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// POST /api/auth/verify-session-code
pub async fn verify_session_code(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<VerifySessionCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let Some(code) = body.code else {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    };
    state
        .bridge
        .verify_code(user.phone, code, body.password)
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCredentialsRequest {
    #[serde(default)]
    pub api_id: Option<serde_json::Value>,
    #[serde(default)]
    pub api_hash: Option<String>,
}

/// PUT /api/auth/update-credentials
///
/// Replaces the api credentials and invalidates the stored session blob;
/// any cached client for the phone is evicted.
pub async fn update_credentials(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<UpdateCredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(api_id), Some(api_hash)) = (body.api_id, body.api_hash) else {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    };
    if api_hash.is_empty() {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    }
    let api_id = parse_api_id(&api_id)?;

    let api_hash_ct = state.vault.wrap_str(&SecretString::from(api_hash))?;
    state
        .store
        .set_api_credentials(user.user_id, api_id, api_hash_ct)
        .await?;
    state.bridge.disconnect(user.phone.clone()).await?;
    state.bridge.clear_cached_code(user.phone).await?;

    info!(user_id = user.user_id, "api credentials replaced");
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// POST /api/auth/change-password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(current), Some(new)) = (body.current_password, body.new_password) else {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    };
    if new.is_empty() {
        return Err(ApiError::validation(messages::REQUIRED_FIELDS));
    }

    let row = state
        .store
        .user_by_id(user.user_id)
        .await?
        .ok_or_else(|| SolanagramError::NotFound(format!("user {}", user.user_id)))?;
    if !password::verify_password(&current, &row.password_hash)? {
        return Err(ApiError::with_message(
            SolanagramError::Auth("current password mismatch".to_string()),
            messages::INVALID_CREDENTIALS,
        ));
    }

    let new_hash = password::hash_password(&new)?;
    state.store.set_password_hash(user.user_id, &new_hash).await?;
    info!(user_id = user.user_id, "password rotated");
    Ok(Json(json!({ "success": true })))
}

/// api_id arrives as a number or a numeric string.
fn parse_api_id(value: &serde_json::Value) -> Result<i32, ApiError> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| ApiError::validation(messages::INVALID_API_ID)),
        serde_json::Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ApiError::validation(messages::INVALID_API_ID)),
        _ => Err(ApiError::validation(messages::INVALID_API_ID)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_id_parses_from_number_and_string() {
        assert_eq!(parse_api_id(&json!(25128314)).unwrap(), 25128314);
        assert_eq!(parse_api_id(&json!("25128314")).unwrap(), 25128314);
        assert_eq!(parse_api_id(&json!(" 42 ")).unwrap(), 42);
    }

    #[test]
    fn api_id_rejects_garbage() {
        assert!(parse_api_id(&json!("not-a-number")).is_err());
        assert!(parse_api_id(&json!(true)).is_err());
        assert!(parse_api_id(&json!(99999999999i64)).is_err());
    }
}
