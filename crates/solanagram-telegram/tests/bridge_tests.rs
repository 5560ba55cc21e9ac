// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bridge and auth-flow invariants, driven through the real bridge thread
//! against a scripted Telegram backend and an in-memory store.

use std::time::Duration;

use solanagram_core::traits::Store as _;
use solanagram_core::{Phone, SolanagramError};
use solanagram_telegram::SendCodeOutcome;
use solanagram_test_utils::TestHarness;

fn phone() -> Phone {
    Phone::parse("+391234567890").unwrap()
}

#[tokio::test]
async fn send_code_then_verify_persists_wrapped_session() {
    let harness = TestHarness::build();
    let user = harness.create_user("+391234567890").await.unwrap();

    let outcome = harness
        .bridge
        .send_code(phone(), Some("pw".into()), false)
        .await
        .unwrap();
    assert_eq!(outcome, SendCodeOutcome::CodeSent);

    harness
        .bridge
        .verify_code(phone(), "12345".into(), None)
        .await
        .unwrap();

    let stored = harness.store.user_by_id(user.id).await.unwrap().unwrap();
    let blob = stored.telegram_session.expect("session blob persisted");
    // Ciphertext at rest: the raw session bytes must not appear.
    assert_ne!(blob, b"mock-session-blob".to_vec());
    assert_eq!(harness.vault.unwrap(&blob).unwrap(), b"mock-session-blob");
}

#[tokio::test]
async fn single_flight_means_one_connect_for_concurrent_callers() {
    let harness = TestHarness::build();
    let user = harness.create_user("+391234567890").await.unwrap();
    harness.authorize_user(user.id).await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let bridge = harness.bridge.clone();
        tasks.push(tokio::spawn(
            async move { bridge.session_status(phone()).await },
        ));
    }
    for task in tasks {
        assert!(task.await.unwrap().unwrap());
    }

    // Contending callers waited on the gate and then observed the cached
    // handle: exactly one client was ever constructed.
    assert_eq!(harness.telegram.connect_attempts(), 1);
    assert_eq!(harness.telegram.connects_succeeded(), 1);
}

#[tokio::test]
async fn flood_wait_surfaces_seconds_and_never_retries() {
    let harness = TestHarness::build();
    harness.create_user("+391234567890").await.unwrap();
    harness.telegram.set_flood_wait(3600);

    let err = harness
        .bridge
        .send_code(phone(), None, false)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SolanagramError::FloodWait { retry_after: 3600 }
    ));
    assert_eq!(harness.telegram.send_code_calls(), 1, "flood must not retry");
}

#[tokio::test]
async fn transport_disconnect_evicts_and_retries_exactly_once() {
    let harness = TestHarness::build();
    harness.create_user("+391234567890").await.unwrap();
    harness.telegram.fail_next_send_codes(1);

    let outcome = harness
        .bridge
        .send_code(phone(), None, false)
        .await
        .unwrap();
    assert_eq!(outcome, SendCodeOutcome::CodeSent);
    // First attempt hit "cannot send while disconnected", the second one
    // (on a fresh client) succeeded.
    assert_eq!(harness.telegram.send_code_calls(), 2);
    assert!(harness.telegram.connects_succeeded() >= 2);
}

#[tokio::test]
async fn persistent_disconnects_surface_connect_unavailable() {
    let harness = TestHarness::build();
    harness.create_user("+391234567890").await.unwrap();
    harness.telegram.fail_next_send_codes(2);

    let err = harness
        .bridge
        .send_code(phone(), None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::ConnectUnavailable));
    assert_eq!(harness.telegram.send_code_calls(), 2, "exactly one retry");
}

#[tokio::test]
async fn second_send_code_within_window_reuses_pending() {
    let harness = TestHarness::build();
    harness.create_user("+391234567890").await.unwrap();

    let first = harness.bridge.send_code(phone(), None, false).await.unwrap();
    assert_eq!(first, SendCodeOutcome::CodeSent);

    let second = harness.bridge.send_code(phone(), None, false).await.unwrap();
    assert_eq!(second, SendCodeOutcome::CachedCodeAvailable);
    assert_eq!(harness.telegram.send_code_calls(), 1);
}

#[tokio::test]
async fn verify_without_pending_code_is_expired() {
    let harness = TestHarness::build();
    harness.create_user("+391234567890").await.unwrap();

    let err = harness
        .bridge
        .verify_code(phone(), "12345".into(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::CodeExpired));
}

#[tokio::test]
async fn wrong_code_surfaces_code_invalid_and_allows_retry() {
    let harness = TestHarness::build();
    harness.create_user("+391234567890").await.unwrap();
    harness.bridge.send_code(phone(), None, false).await.unwrap();

    let err = harness
        .bridge
        .verify_code(phone(), "99999".into(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::CodeInvalid));

    // The pending code survives a wrong attempt; the right code still works.
    harness
        .bridge
        .verify_code(phone(), "12345".into(), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn two_factor_flow_requires_and_accepts_password() {
    let harness = TestHarness::build();
    harness.create_user("+391234567890").await.unwrap();
    harness.telegram.require_password("hunter2");

    harness.bridge.send_code(phone(), None, false).await.unwrap();

    let err = harness
        .bridge
        .verify_code(phone(), "12345".into(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::Needs2FA));

    let err = harness
        .bridge
        .verify_code(phone(), "12345".into(), Some("wrong".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::PasswordInvalid));

    harness
        .bridge
        .verify_code(phone(), "12345".into(), Some("hunter2".into()))
        .await
        .unwrap();
}

#[tokio::test]
async fn login_password_is_used_for_two_factor() {
    let harness = TestHarness::build();
    harness.create_user("+391234567890").await.unwrap();
    harness.telegram.require_password("hunter2");

    // The password captured at send-code time is replayed at sign-in.
    harness
        .bridge
        .send_code(phone(), Some("hunter2".into()), false)
        .await
        .unwrap();
    harness
        .bridge
        .verify_code(phone(), "12345".into(), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn cached_code_round_trip_and_reuse_without_second_send() {
    let harness = TestHarness::build();
    harness.create_user("+391234567890").await.unwrap();

    harness.bridge.send_code(phone(), None, false).await.unwrap();
    harness
        .bridge
        .verify_code(phone(), "12345".into(), None)
        .await
        .unwrap();

    let cached = harness.bridge.cached_code(phone()).await.unwrap();
    assert_eq!(cached.as_deref(), Some("12345"));

    // Re-login inside the window: no new send-code on the library.
    let sends_before = harness.telegram.send_code_calls();
    let outcome = harness.bridge.send_code(phone(), None, false).await.unwrap();
    assert_eq!(outcome, SendCodeOutcome::CachedCodeAvailable);
    harness
        .bridge
        .verify_code(phone(), "12345".into(), None)
        .await
        .unwrap();
    assert_eq!(harness.telegram.send_code_calls(), sends_before);

    harness.bridge.clear_cached_code(phone()).await.unwrap();
    assert!(harness.bridge.cached_code(phone()).await.unwrap().is_none());
}

#[tokio::test]
async fn ttl_eviction_sweeps_expired_handles() {
    let harness = TestHarness::builder()
        .with_client_ttl(Duration::from_millis(0))
        .build();
    let user = harness.create_user("+391234567890").await.unwrap();
    harness.authorize_user(user.id).await.unwrap();

    assert!(harness.bridge.session_status(phone()).await.unwrap());

    let evicted = harness.bridge.sweep_expired().await.unwrap();
    assert_eq!(evicted, 1);
    assert!(harness.telegram.disconnect_calls() >= 1);

    // A later sweep has nothing left to do.
    assert_eq!(harness.bridge.sweep_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn revoked_authorization_clears_stored_blob() {
    let harness = TestHarness::build();
    let user = harness.create_user("+391234567890").await.unwrap();
    harness.authorize_user(user.id).await.unwrap();
    harness.telegram.revoke_authorization();

    let err = harness.bridge.get_chats(phone()).await.unwrap_err();
    assert!(matches!(err, SolanagramError::AuthorizationLost));

    let stored = harness.store.user_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.telegram_session.is_none(), "blob must be cleared");
}

#[tokio::test]
async fn session_status_reports_revocation_and_clears_blob() {
    let harness = TestHarness::build();
    let user = harness.create_user("+391234567890").await.unwrap();
    harness.authorize_user(user.id).await.unwrap();
    harness.telegram.revoke_authorization();

    assert!(!harness.bridge.session_status(phone()).await.unwrap());
    let stored = harness.store.user_by_id(user.id).await.unwrap().unwrap();
    assert!(stored.telegram_session.is_none());
}

#[tokio::test]
async fn get_chats_without_credentials_or_session() {
    let harness = TestHarness::build();

    // Unknown phone.
    let err = harness.bridge.get_chats(phone()).await.unwrap_err();
    assert!(matches!(err, SolanagramError::UnknownUser(_)));

    // Known user, never authorized.
    harness.create_user("+391234567890").await.unwrap();
    let err = harness.bridge.get_chats(phone()).await.unwrap_err();
    assert!(matches!(err, SolanagramError::AuthorizationLost));
}

#[tokio::test]
async fn get_chats_recovers_from_one_disconnect() {
    let harness = TestHarness::build();
    let user = harness.create_user("+391234567890").await.unwrap();
    harness.authorize_user(user.id).await.unwrap();
    harness.telegram.set_dialogs(vec![]);
    harness.telegram.fail_next_dialog_fetches(1);

    let chats = harness.bridge.get_chats(phone()).await.unwrap();
    assert!(chats.is_empty());
    assert!(harness.telegram.connects_succeeded() >= 2);
}

#[tokio::test]
async fn operations_for_different_phones_are_independent() {
    let harness = TestHarness::build();
    harness.create_user("+391234567890").await.unwrap();
    harness.create_user("+441112223334").await.unwrap();

    let a = harness.bridge.send_code(phone(), None, false).await.unwrap();
    let b = harness
        .bridge
        .send_code(Phone::parse("+441112223334").unwrap(), None, false)
        .await
        .unwrap();
    assert_eq!(a, SendCodeOutcome::CodeSent);
    assert_eq!(b, SendCodeOutcome::CodeSent);
    assert_eq!(harness.telegram.connects_succeeded(), 2);
}
