// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Supervisor behavior against the in-memory store and the recording
//! runtime: uniqueness, rollback, idempotent stops, and the reap pass.

use solanagram_core::bundle::{LABEL_SESSION_ID, LABEL_TYPE, LABEL_USER_ID};
use solanagram_core::traits::Store as _;
use solanagram_core::types::{ContainerStatus, ElaborationKind, NewElaboration};
use solanagram_core::{SolanagramError, WorkerKind};
use solanagram_test_utils::TestHarness;

async fn authorized_user(harness: &TestHarness) -> i64 {
    let user = harness.create_user("+391234567890").await.unwrap();
    harness.authorize_user(user.id).await.unwrap();
    user.id
}

#[tokio::test]
async fn start_logging_launches_named_container_with_labels_and_caps() {
    let harness = TestHarness::build();
    let user_id = authorized_user(&harness).await;
    let chat = harness.chat(-1001234567890, "Solana Signals");

    let session = harness
        .supervisor
        .start_logging(user_id, &chat)
        .await
        .unwrap();

    assert_eq!(
        session.container_name.as_deref(),
        Some("solanagram-log-1-1001234567890")
    );
    assert_eq!(session.container_status, ContainerStatus::Running);
    assert!(session.container_id.is_some());

    let specs = harness.runtime.launched_specs();
    assert_eq!(specs.len(), 1);
    let spec = &specs[0];
    assert_eq!(spec.image, "solanagram-logger:latest");
    assert_eq!(spec.restart_policy, "unless-stopped");
    assert_eq!(spec.resources.memory, "128m");
    assert_eq!(spec.resources.memory_swap, "256m");
    assert_eq!(spec.resources.pids_limit, 50);

    let label = |key: &str| {
        spec.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(label(LABEL_TYPE).as_deref(), Some("logger"));
    assert_eq!(label(LABEL_USER_ID).as_deref(), Some("1"));
    assert_eq!(label(LABEL_SESSION_ID).as_deref(), Some(session.id.to_string().as_str()));

    // The bundle directory was materialized and mounted read-only.
    let (host_dir, mount) = spec.bundle_mount.as_ref().unwrap();
    assert!(host_dir.join("config.json").exists());
    assert!(host_dir.join("session.session").exists());
    assert_eq!(mount, "/app/config");
}

#[tokio::test]
async fn second_start_for_same_chat_is_already_active() {
    let harness = TestHarness::build();
    let user_id = authorized_user(&harness).await;
    let chat = harness.chat(-100555, "Chat");

    harness.supervisor.start_logging(user_id, &chat).await.unwrap();
    let err = harness
        .supervisor
        .start_logging(user_id, &chat)
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::AlreadyActive(_)));
}

#[tokio::test]
async fn concurrent_starts_grant_exactly_one() {
    let harness = std::sync::Arc::new(TestHarness::build());
    let user_id = authorized_user(&harness).await;

    let mut tasks = Vec::new();
    for _ in 0..4 {
        let harness = harness.clone();
        tasks.push(tokio::spawn(async move {
            let chat = harness.chat(-100777, "Contested");
            harness.supervisor.start_logging(user_id, &chat).await
        }));
    }

    let mut ok = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(SolanagramError::AlreadyActive(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(ok, 1, "exactly one caller may win");
    assert_eq!(conflicts, 3);
    assert_eq!(harness.runtime.launched_specs().len(), 1);
}

#[tokio::test]
async fn launch_failure_rolls_back_row_and_bundle() {
    let harness = TestHarness::build();
    let user_id = authorized_user(&harness).await;
    harness.runtime.fail_next_launches(1);
    let chat = harness.chat(-100888, "Chat");

    let err = harness
        .supervisor
        .start_logging(user_id, &chat)
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::ContainerLaunchFailed(_)));

    // The reserved row is gone, so a retry succeeds.
    let sessions = harness
        .store
        .logging_sessions_for_user(user_id)
        .await
        .unwrap();
    assert!(sessions.is_empty());
    harness.supervisor.start_logging(user_id, &chat).await.unwrap();
}

#[tokio::test]
async fn stop_logging_is_idempotent_and_cleans_up() {
    let harness = TestHarness::build();
    let user_id = authorized_user(&harness).await;
    let chat = harness.chat(-100999, "Chat");

    let session = harness.supervisor.start_logging(user_id, &chat).await.unwrap();
    let bundle_dir = harness.runtime.launched_specs()[0]
        .bundle_mount
        .as_ref()
        .unwrap()
        .0
        .clone();

    let stopped = harness
        .supervisor
        .stop_logging(user_id, session.id)
        .await
        .unwrap();
    assert!(!stopped.is_active);
    assert_eq!(stopped.container_status, ContainerStatus::Stopped);
    assert!(harness.runtime.running_names().is_empty());
    assert!(!bundle_dir.exists(), "bundle must be wiped on stop");

    // Stopping again is a no-op success.
    let again = harness
        .supervisor
        .stop_logging(user_id, session.id)
        .await
        .unwrap();
    assert_eq!(again.container_status, ContainerStatus::Stopped);

    // The chat is free for a new session now.
    harness.supervisor.start_logging(user_id, &chat).await.unwrap();
}

#[tokio::test]
async fn stop_rejects_other_users_sessions() {
    let harness = TestHarness::build();
    let user_id = authorized_user(&harness).await;
    let chat = harness.chat(-100111, "Chat");
    let session = harness.supervisor.start_logging(user_id, &chat).await.unwrap();

    let err = harness
        .supervisor
        .stop_logging(user_id + 1, session.id)
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::NotFound(_)));
}

#[tokio::test]
async fn reap_marks_vanished_and_exited_workers() {
    let harness = TestHarness::build();
    let user_id = authorized_user(&harness).await;

    let vanished = harness
        .supervisor
        .start_logging(user_id, &harness.chat(-100001, "A"))
        .await
        .unwrap();
    let exited = harness
        .supervisor
        .start_logging(user_id, &harness.chat(-100002, "B"))
        .await
        .unwrap();
    let healthy = harness
        .supervisor
        .start_logging(user_id, &harness.chat(-100003, "C"))
        .await
        .unwrap();

    harness
        .runtime
        .vanish(vanished.container_name.as_deref().unwrap());
    harness
        .runtime
        .exit(exited.container_name.as_deref().unwrap(), 137);

    let report = harness.supervisor.reap_pass().await.unwrap();
    assert_eq!(report.vanished, 2);

    let vanished = harness
        .store
        .logging_session(vanished.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(vanished.container_status, ContainerStatus::Error);
    assert!(!vanished.is_active);
    assert_eq!(vanished.last_error.as_deref(), Some("container vanished"));

    let exited = harness
        .store
        .logging_session(exited.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exited.last_error.as_deref(), Some("container exited"));

    let healthy = harness
        .store
        .logging_session(healthy.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(healthy.container_status, ContainerStatus::Running);
}

#[tokio::test]
async fn listener_lifecycle_and_redirect_uniqueness() {
    let harness = TestHarness::build();
    let user_id = authorized_user(&harness).await;
    let source = harness.chat(-100200, "Source");

    let listener = harness
        .supervisor
        .start_listener(user_id, &source, WorkerKind::Listener)
        .await
        .unwrap();
    assert_eq!(
        listener.container_name.as_deref(),
        Some("solanagram-listener-1-100200")
    );

    // Listener uniqueness holds regardless of activity.
    let err = harness
        .supervisor
        .start_listener(user_id, &source, WorkerKind::Listener)
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::AlreadyActive(_)));

    // At most one redirect per listener.
    harness
        .store
        .add_elaboration(
            listener.id,
            NewElaboration {
                kind: ElaborationKind::Redirect,
                name: "to-backup".into(),
                config: serde_json::json!({ "target_chat_id": -100300 }),
                priority: 0,
            },
        )
        .await
        .unwrap();
    let err = harness
        .store
        .add_elaboration(
            listener.id,
            NewElaboration {
                kind: ElaborationKind::Redirect,
                name: "second-redirect".into(),
                config: serde_json::json!({ "target_chat_id": -100301 }),
                priority: 1,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::AlreadyActive(_)));

    // Extractors are not limited.
    harness
        .store
        .add_elaboration(
            listener.id,
            NewElaboration {
                kind: ElaborationKind::Extractor,
                name: "contract".into(),
                config: serde_json::json!({ "extraction_rules": [] }),
                priority: 2,
            },
        )
        .await
        .unwrap();

    let stopped = harness
        .supervisor
        .stop_listener(user_id, listener.id)
        .await
        .unwrap();
    assert!(!stopped.is_active);

    // Restart relaunches with the current elaboration set.
    let restarted = harness
        .supervisor
        .restart_listener(user_id, listener.id)
        .await
        .unwrap();
    assert_eq!(restarted.container_status, ContainerStatus::Running);

    harness
        .supervisor
        .remove_listener(user_id, listener.id)
        .await
        .unwrap();
    assert!(harness.store.listener(listener.id).await.unwrap().is_none());
}

#[tokio::test]
async fn start_logging_requires_telegram_authorization() {
    let harness = TestHarness::build();
    let user = harness.create_user("+391234567890").await.unwrap();

    let err = harness
        .supervisor
        .start_logging(user.id, &harness.chat(-100400, "Chat"))
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::AuthorizationLost));
}
