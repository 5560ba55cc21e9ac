// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Postgres-backed store tests. These need a live database and are ignored
//! by default; run them with a scratch instance via
//! `DATABASE_URL=postgres://… cargo test -p solanagram-storage -- --ignored`.

use std::time::Duration;

use chrono::Utc;
use solanagram_core::traits::Store;
use solanagram_core::types::{ChatKind, ChatRef, MessageKind, NewMessageLog, NewUser};
use solanagram_core::{Phone, SolanagramError};
use solanagram_storage::{Database, PgStore};

async fn store() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a scratch db");
    let db = Database::open(&url).await.expect("database open");
    PgStore::new(db)
}

fn chat(id: i64) -> ChatRef {
    ChatRef {
        id,
        title: format!("Chat {id}"),
        username: None,
        kind: ChatKind::Channel,
    }
}

async fn fresh_user(store: &PgStore, phone: &str) -> i64 {
    store
        .create_user(NewUser {
            phone: Phone::parse(phone).unwrap(),
            password_hash: "hash".to_string(),
            api_id: 1,
            api_hash: vec![1, 2, 3],
        })
        .await
        .expect("create user")
        .id
}

#[tokio::test]
#[ignore = "requires a postgres instance"]
async fn active_session_uniqueness_is_enforced() {
    let store = store().await;
    let user_id = fresh_user(&store, "+390000000001").await;
    let chat = chat(-9000001);

    let session = store
        .reserve_logging_session(user_id, &chat, "solanagram-log-t-1")
        .await
        .unwrap();

    let err = store
        .reserve_logging_session(user_id, &chat, "solanagram-log-t-1b")
        .await
        .unwrap_err();
    assert!(matches!(err, SolanagramError::AlreadyActive(_)));

    // After deactivation the pair is reusable; history is retained.
    store.mark_session_stopped(session.id).await.unwrap();
    store
        .reserve_logging_session(user_id, &chat, "solanagram-log-t-1c")
        .await
        .unwrap();
    assert_eq!(
        store.logging_sessions_for_user(user_id).await.unwrap().len(),
        2
    );
}

#[tokio::test]
#[ignore = "requires a postgres instance"]
async fn message_log_insert_is_idempotent() {
    let store = store().await;
    let user_id = fresh_user(&store, "+390000000002").await;
    let chat = chat(-9000002);
    let session = store
        .reserve_logging_session(user_id, &chat, "solanagram-log-t-2")
        .await
        .unwrap();

    let log = NewMessageLog {
        user_id,
        chat_id: chat.id,
        chat_title: chat.title.clone(),
        chat_username: None,
        chat_type: "channel".to_string(),
        message_id: 424242,
        sender_id: Some(7),
        sender_name: Some("Alice".to_string()),
        sender_username: None,
        message_text: Some("gm".to_string()),
        message_type: MessageKind::Text,
        media_file_id: None,
        message_date: Utc::now(),
        logging_session_id: session.id,
    };

    assert!(store.insert_message_log(log.clone()).await.unwrap());
    assert!(!store.insert_message_log(log).await.unwrap());
    assert_eq!(
        store.message_logs(session.id, 10, 0).await.unwrap().len(),
        1
    );
}

#[tokio::test]
#[ignore = "requires a postgres instance"]
async fn schema_version_and_retention_pass_run() {
    let store = store().await;
    assert_eq!(store.schema_version().await.unwrap().as_deref(), Some("1"));

    // The retention passes are safe to run on an arbitrary database.
    store
        .purge_saved_messages_older_than(Duration::from_secs(30 * 24 * 60 * 60))
        .await
        .unwrap();
    store
        .remove_error_sessions_older_than(Duration::from_secs(7 * 24 * 60 * 60))
        .await
        .unwrap();
}
