// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Protected routes are the ones whose handlers take the [`AuthUser`]
//! extractor; the login/registration surface and liveness endpoints stay
//! public.
//!
//! [`AuthUser`]: crate::state::AuthUser

use axum::routing::{delete, get, post, put};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use solanagram_core::SolanagramError;

use crate::handlers::{auth, listeners, logging, system, telegram};
use crate::state::AppState;

/// Assemble the full route table.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Liveness & metrics.
        .route("/health", get(system::health))
        .route(
            "/api/metrics/login-performance",
            get(system::login_performance),
        )
        // Auth & session.
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify-code", post(auth::verify_code))
        .route("/api/auth/check-cached-code", get(auth::check_cached_code))
        .route("/api/auth/clear-cached-code", post(auth::clear_cached_code))
        .route("/api/auth/validate-session", get(auth::validate_session))
        .route(
            "/api/auth/reactivate-session",
            post(auth::reactivate_session),
        )
        .route(
            "/api/auth/verify-session-code",
            post(auth::verify_session_code),
        )
        .route(
            "/api/auth/update-credentials",
            put(auth::update_credentials),
        )
        .route("/api/auth/change-password", post(auth::change_password))
        // Telegram browsing.
        .route("/api/telegram/get-chats", get(telegram::get_chats))
        // Logging pipeline.
        .route(
            "/api/logging/sessions",
            get(logging::list_sessions).post(logging::start_session),
        )
        .route("/api/logging/sessions/{id}/stop", post(logging::stop_session))
        .route(
            "/api/logging/sessions/{id}",
            delete(logging::delete_session),
        )
        .route(
            "/api/logging/messages/{session_id}",
            get(logging::session_messages),
        )
        .route(
            "/api/logging/chat/{chat_id}/status",
            get(logging::chat_status),
        )
        // Listener / elaboration pipeline.
        .route(
            "/api/listeners",
            get(listeners::list_listeners).post(listeners::start_listener),
        )
        .route(
            "/api/listeners/{id}/stop",
            post(listeners::stop_listener),
        )
        .route(
            "/api/listeners/{id}/restart",
            post(listeners::restart_listener),
        )
        .route("/api/listeners/{id}", delete(listeners::delete_listener))
        .route(
            "/api/listeners/{id}/elaborations",
            get(listeners::list_elaborations).post(listeners::add_elaboration),
        )
        .route(
            "/api/listeners/{id}/elaborations/{elaboration_id}",
            put(listeners::update_elaboration).delete(listeners::delete_elaboration),
        )
        .route(
            "/api/listeners/{id}/elaborations/{elaboration_id}/values",
            get(listeners::extracted_values),
        )
        .route("/api/listeners/{id}/messages", get(listeners::saved_messages))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the cancellation token fires.
pub async fn serve(
    host: &str,
    port: u16,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), SolanagramError> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SolanagramError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    info!(addr = %addr, "gateway listening");

    let app = build_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| SolanagramError::Internal(format!("gateway server error: {e}")))
}
