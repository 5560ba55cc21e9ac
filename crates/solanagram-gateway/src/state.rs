// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared state and the bearer-token identity extractor.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use solanagram_core::traits::Store;
use solanagram_core::Phone;
use solanagram_fleet::WorkerSupervisor;
use solanagram_telegram::BridgeHandle;
use solanagram_vault::CredentialStore;

use crate::error::ApiError;
use crate::jwt::JwtManager;
use crate::metrics::LoginMetrics;

/// Shared state for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub bridge: BridgeHandle,
    pub supervisor: Arc<WorkerSupervisor>,
    pub vault: CredentialStore,
    pub jwt: JwtManager,
    pub metrics: Arc<LoginMetrics>,
    pub started_at: Instant,
}

/// The authenticated caller, extracted from the `Authorization` header.
///
/// Handlers that take this parameter are bearer-protected; everything else
/// is public by construction.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub phone: Phone,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(ApiError::unauthorized)?;

        let claims = state
            .jwt
            .validate(token)
            .map_err(|_| ApiError::unauthorized())?;
        let user_id = claims
            .sub
            .parse()
            .map_err(|_| ApiError::unauthorized())?;
        let phone = Phone::parse(&claims.phone).map_err(|_| ApiError::unauthorized())?;

        Ok(AuthUser { user_id, phone })
    }
}
