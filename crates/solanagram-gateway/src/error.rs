// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP error envelope: `{success:false, error, error_code?}` with the
//! status class fixed by the error taxonomy.
//!
//! Internal failures are logged with a correlation id and surface only the
//! id, never the cause.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use solanagram_core::SolanagramError;

use crate::messages;

/// Error type returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    inner: SolanagramError,
    /// Overrides the default localized text (endpoint-specific wording).
    message: Option<&'static str>,
}

impl ApiError {
    pub fn with_message(inner: SolanagramError, message: &'static str) -> Self {
        Self {
            inner,
            message: Some(message),
        }
    }

    pub fn validation(message: &'static str) -> Self {
        Self::with_message(SolanagramError::Validation(message.to_string()), message)
    }

    pub fn unauthorized() -> Self {
        Self::with_message(
            SolanagramError::Auth("missing or invalid bearer token".to_string()),
            messages::UNAUTHORIZED,
        )
    }

    pub fn inner(&self) -> &SolanagramError {
        &self.inner
    }
}

impl From<SolanagramError> for ApiError {
    fn from(inner: SolanagramError) -> Self {
        Self {
            inner,
            message: None,
        }
    }
}

fn status_for(err: &SolanagramError) -> StatusCode {
    match err {
        SolanagramError::Validation(_) => StatusCode::BAD_REQUEST,
        SolanagramError::Auth(_)
        | SolanagramError::UnknownUser(_)
        | SolanagramError::AuthorizationLost => StatusCode::UNAUTHORIZED,
        SolanagramError::MissingCredentials
        | SolanagramError::CredentialsInvalid
        | SolanagramError::Needs2FA
        | SolanagramError::PasswordInvalid
        | SolanagramError::CodeInvalid
        | SolanagramError::CodeExpired
        | SolanagramError::SendCodeFailed(_) => StatusCode::BAD_REQUEST,
        SolanagramError::FloodWait { .. } | SolanagramError::SystemBusy => {
            StatusCode::TOO_MANY_REQUESTS
        }
        SolanagramError::AlreadyActive(_) => StatusCode::CONFLICT,
        SolanagramError::NotFound(_) => StatusCode::NOT_FOUND,
        SolanagramError::TransportDisconnected(_) | SolanagramError::ConnectUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SolanagramError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        SolanagramError::Config(_)
        | SolanagramError::CredentialDecrypt
        | SolanagramError::ContainerLaunchFailed(_)
        | SolanagramError::ContainerVanished(_)
        | SolanagramError::Storage { .. }
        | SolanagramError::Telegram(_)
        | SolanagramError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn default_message(err: &SolanagramError) -> &'static str {
    match err {
        SolanagramError::Config(_) => messages::UNEXPECTED_ERROR,
        SolanagramError::Validation(_) => messages::REQUIRED_FIELDS,
        SolanagramError::Auth(_) | SolanagramError::UnknownUser(_) => {
            messages::INVALID_CREDENTIALS
        }
        SolanagramError::MissingCredentials => messages::API_CREDENTIALS_NOT_SET,
        SolanagramError::CredentialsInvalid => messages::API_CREDENTIALS_INVALID,
        SolanagramError::CredentialDecrypt => messages::CREDENTIAL_DECRYPT_FAILED,
        SolanagramError::AuthorizationLost => messages::UNAUTHORIZED,
        SolanagramError::Needs2FA => messages::PASSWORD_2FA_REQUIRED,
        SolanagramError::PasswordInvalid => messages::PASSWORD_2FA_INVALID,
        SolanagramError::CodeInvalid => messages::VERIFICATION_CODE_INVALID,
        SolanagramError::CodeExpired => messages::VERIFICATION_EXPIRED,
        SolanagramError::FloodWait { .. } => messages::FLOOD_WAIT,
        SolanagramError::TransportDisconnected(_) => messages::CONNECTION_PROBLEM,
        SolanagramError::ConnectUnavailable => messages::TELEGRAM_CLIENT_FAILED,
        SolanagramError::SendCodeFailed(_) => messages::SEND_CODE_FAILED,
        SolanagramError::SystemBusy => messages::SYSTEM_BUSY,
        SolanagramError::AlreadyActive(_) => messages::ALREADY_ACTIVE,
        SolanagramError::NotFound(_) => messages::NOT_FOUND,
        SolanagramError::ContainerLaunchFailed(_) => messages::WORKER_LAUNCH_FAILED,
        SolanagramError::ContainerVanished(_) => messages::WORKER_VANISHED,
        SolanagramError::Timeout { .. } => messages::OPERATION_TIMEOUT,
        SolanagramError::Storage { .. } => messages::DB_CONNECTION_FAILED,
        SolanagramError::Telegram(_) => messages::UNEXPECTED_ERROR,
        SolanagramError::Internal(_) => messages::UNEXPECTED_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.inner);

        // Flood waits carry the mandated machine-readable shape.
        if let SolanagramError::FloodWait { retry_after } = &self.inner {
            let body = json!({
                "success": false,
                "error": "FLOOD_WAIT",
                "error_code": "FLOOD_WAIT",
                "retry_after": retry_after,
            });
            return (status, Json(body)).into_response();
        }

        let message = self.message.unwrap_or_else(|| default_message(&self.inner));
        let mut body = json!({
            "success": false,
            "error": message,
        });
        if let Some(code) = self.inner.error_code() {
            body["error_code"] = json!(code);
        }

        if status.is_server_error() {
            let correlation_id = uuid::Uuid::new_v4().to_string();
            error!(
                correlation_id = %correlation_id,
                error = %self.inner,
                "request failed with internal error"
            );
            body["correlation_id"] = json!(correlation_id);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_wait_envelope_matches_contract() {
        let err = ApiError::from(SolanagramError::FloodWait { retry_after: 3600 });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn conflict_maps_to_409() {
        let err = ApiError::from(SolanagramError::AlreadyActive("session".into()));
        assert_eq!(status_for(err.inner()), StatusCode::CONFLICT);
    }

    #[test]
    fn auth_errors_map_to_401() {
        assert_eq!(
            status_for(&SolanagramError::AuthorizationLost),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&SolanagramError::UnknownUser("+39".into())),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn busy_and_flood_map_to_429() {
        assert_eq!(
            status_for(&SolanagramError::SystemBusy),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            status_for(&SolanagramError::FloodWait { retry_after: 1 }),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn internal_messages_never_leak_details() {
        let err = SolanagramError::Internal("stack trace with secrets".into());
        assert_eq!(default_message(&err), messages::UNEXPECTED_ERROR);
        let err = SolanagramError::Telegram("RPC_CALL_FAIL at line 42".into());
        assert_eq!(default_message(&err), messages::UNEXPECTED_ERROR);
    }
}
