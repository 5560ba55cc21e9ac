// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end scenarios through the real HTTP router, with the bridge and
//! supervisor running against scripted mocks.

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use solanagram_core::traits::Store;
use solanagram_gateway::{build_router, AppState, JwtManager, LoginMetrics};
use solanagram_test_utils::TestHarness;

struct App {
    harness: TestHarness,
    router: Router,
    state: AppState,
}

fn app() -> App {
    let harness = TestHarness::build();
    let state = AppState {
        store: harness.store.clone() as Arc<dyn Store>,
        bridge: harness.bridge.clone(),
        supervisor: harness.supervisor.clone(),
        vault: harness.vault.clone(),
        jwt: JwtManager::new(b"e2e-test-jwt-secret", 3600),
        metrics: Arc::new(LoginMetrics::new()),
        started_at: Instant::now(),
    };
    let router = build_router(state.clone());
    App {
        harness,
        router,
        state,
    }
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.expect("router call");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

fn post(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn post_authed(path: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .body(Body::empty())
        .expect("request")
}

fn get_authed(path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .expect("request")
}

async fn register(app: &App) {
    let (status, body) = call(
        &app.router,
        post(
            "/api/auth/register",
            json!({
                "phone": "+391234567890",
                "password": "pw",
                "api_id": 25128314,
                "api_hash": "deadbeefdeadbeefdeadbeefdeadbeef"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    assert_eq!(body["success"], json!(true));
}

async fn login_and_verify(app: &App) -> String {
    let (status, body) = call(
        &app.router,
        post(
            "/api/auth/login",
            json!({ "phone_number": "+391234567890", "password": "pw" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert_eq!(body["message"], json!("code_sent"));

    let (status, body) = call(
        &app.router,
        post(
            "/api/auth/verify-code",
            json!({ "phone_number": "+391234567890", "code": "12345" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "verify failed: {body}");
    body["session_token"]
        .as_str()
        .expect("session token")
        .to_string()
}

// --- Scenario 1: happy login ---

#[tokio::test]
async fn happy_login_persists_encrypted_session() {
    let app = app();
    register(&app).await;
    let token = login_and_verify(&app).await;
    assert!(!token.is_empty());

    // users.telegram_session is non-null ciphertext.
    let user = app.harness.store.user_by_id(1).await.unwrap().unwrap();
    let blob = user.telegram_session.expect("session blob stored");
    assert_ne!(blob, b"mock-session-blob".to_vec());
    assert_eq!(
        app.harness.vault.unwrap(&blob).unwrap(),
        b"mock-session-blob"
    );

    // The issued token passes validation.
    let (status, body) = call(
        &app.router,
        get_authed("/api/auth/validate-session", &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_valid"], json!(true));
}

// --- Scenario 2: cached code reuse ---

#[tokio::test]
async fn cached_code_reuse_avoids_second_send() {
    let app = app();
    register(&app).await;
    login_and_verify(&app).await;

    let (status, body) = call(
        &app.router,
        get("/api/auth/check-cached-code?phone=%2B391234567890"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_cached_code"], json!(true));
    assert_eq!(body["cached_code"], json!("12345"));

    let sends_before = app.harness.telegram.send_code_calls();

    // Second login reports the cached code, and verifying with it completes
    // without another send-code on the library.
    let (status, body) = call(
        &app.router,
        post(
            "/api/auth/login",
            json!({ "phone_number": "+391234567890", "password": "pw" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("cached_code_available"));

    let (status, _body) = call(
        &app.router,
        post(
            "/api/auth/verify-code",
            json!({ "phone_number": "+391234567890", "code": "12345" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.harness.telegram.send_code_calls(), sends_before);
}

// --- Scenario 3: flood wait ---

#[tokio::test]
async fn flood_wait_surfaces_retry_after_and_counts_failure() {
    let app = app();
    register(&app).await;
    app.harness.telegram.set_flood_wait(3600);

    let (status, body) = call(
        &app.router,
        post(
            "/api/auth/login",
            json!({ "phone_number": "+391234567890", "password": "pw" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("FLOOD_WAIT"));
    assert_eq!(body["retry_after"], json!(3600));

    // No automatic retry happened.
    assert_eq!(app.harness.telegram.send_code_calls(), 1);

    let snapshot = app.state.metrics.snapshot();
    assert_eq!(snapshot.failed_requests, 1);
}

// --- Scenario 4: start / stop logging ---

#[tokio::test]
async fn start_and_stop_logging_through_the_api() {
    let app = app();
    register(&app).await;
    let token = login_and_verify(&app).await;

    let (status, body) = call(
        &app.router,
        post_authed(
            "/api/logging/sessions",
            &token,
            json!({ "chat_id": -1001234567890i64, "chat_title": "Solana Signals" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "start failed: {body}");
    let session_id = body["session_id"].as_i64().unwrap();
    assert_eq!(
        body["container_name"],
        json!("solanagram-log-1-1001234567890")
    );
    assert!(app
        .harness
        .runtime
        .running_names()
        .contains(&"solanagram-log-1-1001234567890".to_string()));

    // A second identical start conflicts.
    let (status, body) = call(
        &app.router,
        post_authed(
            "/api/logging/sessions",
            &token,
            json!({ "chat_id": -1001234567890i64 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], json!("ALREADY_ACTIVE"));

    // Stop removes the container and deactivates the row.
    let (status, body) = call(
        &app.router,
        post_authed(
            &format!("/api/logging/sessions/{session_id}/stop"),
            &token,
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "stop failed: {body}");
    assert_eq!(body["is_active"], json!(false));
    assert!(app.harness.runtime.running_names().is_empty());
}

// --- Scenario 5: disconnect recovery ---

#[tokio::test]
async fn send_code_recovers_from_single_disconnect() {
    let app = app();
    register(&app).await;
    app.harness.telegram.fail_next_send_codes(1);

    let (status, body) = call(
        &app.router,
        post(
            "/api/auth/login",
            json!({ "phone_number": "+391234567890", "password": "pw" }),
        ),
    )
    .await;
    // The caller observes a single successful response.
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert_eq!(body["message"], json!("code_sent"));
    assert_eq!(app.harness.telegram.send_code_calls(), 2);

    // The rolling metrics reflect the recovery latency.
    assert!(app.state.metrics.recent_average() > 0.0);
    assert_eq!(app.state.metrics.snapshot().successful_requests, 1);
}

// --- Scenario 6: auth revoked ---

#[tokio::test]
async fn revoked_authorization_surfaces_session_expired_and_clears_blob() {
    let app = app();
    register(&app).await;
    let token = login_and_verify(&app).await;

    app.harness.telegram.revoke_authorization();
    // Force a fresh client so the revocation is observed.
    app.harness.bridge.disconnect(
        solanagram_core::Phone::parse("+391234567890").unwrap(),
    )
    .await
    .unwrap();

    let (status, body) = call(&app.router, get_authed("/api/telegram/get-chats", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error_code"], json!("TELEGRAM_SESSION_EXPIRED"));

    let user = app.harness.store.user_by_id(1).await.unwrap().unwrap();
    assert!(user.telegram_session.is_none());
}

// --- Surrounding surface ---

#[tokio::test]
async fn health_endpoint_is_public() {
    let app = app();
    let (status, body) = call(&app.router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn protected_routes_reject_missing_token() {
    let app = app();
    let (status, body) = call(&app.router, get("/api/telegram/get-chats")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn register_rejects_duplicates_and_bad_input() {
    let app = app();
    register(&app).await;

    // Duplicate phone.
    let (status, _body) = call(
        &app.router,
        post(
            "/api/auth/register",
            json!({
                "phone": "+391234567890",
                "password": "pw",
                "api_id": 25128314,
                "api_hash": "deadbeef"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Malformed phone.
    let (status, _body) = call(
        &app.router,
        post(
            "/api/auth/register",
            json!({
                "phone": "12345",
                "password": "pw",
                "api_id": 1,
                "api_hash": "x"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Missing fields.
    let (status, _body) = call(
        &app.router,
        post("/api/auth/register", json!({ "phone": "+391112223334" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_platform_password_is_unauthorized() {
    let app = app();
    register(&app).await;

    let (status, body) = call(
        &app.router,
        post(
            "/api/auth/login",
            json!({ "phone_number": "+391234567890", "password": "wrong" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    // No Telegram traffic for a failed platform login.
    assert_eq!(app.harness.telegram.send_code_calls(), 0);
}

#[tokio::test]
async fn listener_redirect_uniqueness_is_enforced_at_http_layer() {
    let app = app();
    register(&app).await;
    let token = login_and_verify(&app).await;

    let (status, body) = call(
        &app.router,
        post_authed(
            "/api/listeners",
            &token,
            json!({ "source_chat_id": -100200, "source_chat_title": "Source" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "listener start failed: {body}");
    let listener_id = body["listener_id"].as_i64().unwrap();

    let (status, _body) = call(
        &app.router,
        post_authed(
            &format!("/api/listeners/{listener_id}/elaborations"),
            &token,
            json!({
                "type": "redirect",
                "name": "to-backup",
                "config": { "target_chat_id": -100300 }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(
        &app.router,
        post_authed(
            &format!("/api/listeners/{listener_id}/elaborations"),
            &token,
            json!({
                "type": "redirect",
                "name": "another",
                "config": { "target_chat_id": -100301 }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT, "second redirect allowed: {body}");
}

#[tokio::test]
async fn metrics_endpoint_reports_rolling_counters() {
    let app = app();
    register(&app).await;
    login_and_verify(&app).await;

    let (status, body) = call(&app.router, get("/api/metrics/login-performance")).await;
    assert_eq!(status, StatusCode::OK);
    let metrics = &body["metrics"];
    assert_eq!(metrics["total_requests"], json!(1));
    assert_eq!(metrics["successful_requests"], json!(1));
    assert_eq!(metrics["failed_requests"], json!(0));
    assert_eq!(metrics["last_10_times"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn update_credentials_invalidates_stored_session() {
    let app = app();
    register(&app).await;
    let token = login_and_verify(&app).await;

    let user = app.harness.store.user_by_id(1).await.unwrap().unwrap();
    assert!(user.telegram_session.is_some());

    let request = Request::builder()
        .method("PUT")
        .uri("/api/auth/update-credentials")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(
            json!({ "api_id": 777, "api_hash": "cafebabe" }).to_string(),
        ))
        .unwrap();
    let (status, _body) = call(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);

    let user = app.harness.store.user_by_id(1).await.unwrap().unwrap();
    assert_eq!(user.api_id, Some(777));
    assert!(user.telegram_session.is_none());
}
