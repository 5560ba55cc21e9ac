// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker capture loops driven by scripted clients against the in-memory
//! store. The scripted update stream ends with a transport failure, which
//! is how the loops terminate deterministically here.

use std::sync::Arc;

use chrono::Utc;
use secrecy::SecretString;
use solanagram_core::bundle::WorkerBundleConfig;
use solanagram_core::traits::{Store, TelegramConnector as _};
use solanagram_core::types::{
    ApiCredentials, ChatEvent, ChatKind, ChatRef, ElaborationKind, IncomingMessage, MessageKind,
    NewElaboration,
};
use solanagram_core::WorkerKind;
use solanagram_test_utils::{MemoryStore, ScriptedTelegram};
use solanagram_worker::{listener, logger};

fn message(chat_id: i64, message_id: i64, text: &str) -> ChatEvent {
    ChatEvent::Message(IncomingMessage {
        chat_id,
        message_id,
        sender_id: Some(42),
        sender_name: Some("Alice".to_string()),
        sender_username: Some("alice".to_string()),
        text: Some(text.to_string()),
        kind: MessageKind::Text,
        media_file_id: None,
        date: Utc::now(),
    })
}

fn bundle(mode: WorkerKind, chat_id: i64, session_id: Option<i64>, listener_id: Option<i64>) -> WorkerBundleConfig {
    WorkerBundleConfig {
        mode,
        user_id: 1,
        phone: "+391234567890".to_string(),
        api_id: 25128314,
        chat_id,
        chat_title: "Signals".to_string(),
        chat_type: "channel".to_string(),
        database_dsn: "postgres://unused".to_string(),
        logging_session_id: session_id,
        listener_id,
        elaborations: vec![],
    }
}

async fn connect_client(
    telegram: &ScriptedTelegram,
) -> Box<dyn solanagram_core::traits::TelegramClient> {
    let connector = telegram.connector();
    connector
        .connect(
            &ApiCredentials {
                api_id: 25128314,
                api_hash: SecretString::from("deadbeef".to_string()),
            },
            Some(b"mock-session-blob"),
        )
        .await
        .unwrap()
}

async fn seeded_session(store: &MemoryStore) -> i64 {
    let chat = ChatRef {
        id: -100,
        title: "Signals".to_string(),
        username: None,
        kind: ChatKind::Channel,
    };
    store
        .reserve_logging_session(1, &chat, "solanagram-log-1-100")
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn logger_captures_messages_idempotently() {
    let store = Arc::new(MemoryStore::new());
    let session_id = seeded_session(&store).await;

    let telegram = ScriptedTelegram::new();
    telegram.push_event(message(-100, 1, "first"));
    telegram.push_event(message(-100, 2, "second"));
    // Replay of message 1: must be swallowed, not counted.
    telegram.push_event(message(-100, 1, "first"));
    // Noise from another chat is ignored.
    telegram.push_event(message(-999, 7, "other chat"));

    let client = connect_client(&telegram).await;
    let result = logger::run(
        store.clone(),
        client,
        &bundle(WorkerKind::Logger, -100, Some(session_id), None),
    )
    .await;
    assert!(result.is_err(), "loop ends when the stream closes");

    let logs = store.message_logs(session_id, 50, 0).await.unwrap();
    assert_eq!(logs.len(), 2);
    // message_id ordering within the chat is preserved by the id sequence.
    assert!(logs[0].id > logs[1].id);

    let session = store.logging_session(session_id).await.unwrap().unwrap();
    assert_eq!(session.messages_logged, 2);
}

#[tokio::test]
async fn listener_saves_extracts_and_forwards() {
    let store = Arc::new(MemoryStore::new());
    let source = ChatRef {
        id: -100200,
        title: "Source".to_string(),
        username: None,
        kind: ChatKind::Channel,
    };
    let listener_row = store
        .create_listener(1, &source, "solanagram-listener-1-100200")
        .await
        .unwrap();

    let extractor = store
        .add_elaboration(
            listener_row.id,
            NewElaboration {
                kind: ElaborationKind::Extractor,
                name: "contract".to_string(),
                config: serde_json::json!({
                    "extraction_rules": [
                        { "rule_name": "ca", "search_text": "CA:", "extract_length": 6 }
                    ]
                }),
                priority: 0,
            },
        )
        .await
        .unwrap();
    store
        .add_elaboration(
            listener_row.id,
            NewElaboration {
                kind: ElaborationKind::Redirect,
                name: "to-backup".to_string(),
                config: serde_json::json!({ "target_chat_id": -100300 }),
                priority: 1,
            },
        )
        .await
        .unwrap();

    let telegram = ScriptedTelegram::new();
    telegram.push_event(message(-100200, 10, "buy CA:abc123 now, also CA:def456"));
    telegram.push_event(message(-100200, 10, "duplicate replay"));

    let client = connect_client(&telegram).await;
    let result = listener::run(
        store.clone(),
        client,
        &bundle(WorkerKind::Listener, -100200, None, Some(listener_row.id)),
    )
    .await;
    assert!(result.is_err(), "loop ends when the stream closes");

    // Raw message saved once.
    let saved = store.saved_messages(listener_row.id, 50, 0).await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].message_id, 10);

    // Both occurrences extracted with distinct indices.
    let values = store.extracted_values(extractor.id, 50).await.unwrap();
    assert_eq!(values.len(), 2);
    let mut pairs: Vec<_> = values
        .iter()
        .map(|v| (v.occurrence_index, v.extracted_value.clone()))
        .collect();
    pairs.sort();
    assert_eq!(pairs, vec![(0, "abc123".to_string()), (1, "def456".to_string())]);

    // Redirect forwarded the original message to the target.
    assert_eq!(telegram.forwards(), vec![(-100200, 10, -100300)]);

    let listener_row = store.listener(listener_row.id).await.unwrap().unwrap();
    assert_eq!(listener_row.messages_saved, 1);
}

#[tokio::test]
async fn listener_missing_redirect_target_counts_errors() {
    let store = Arc::new(MemoryStore::new());
    let source = ChatRef {
        id: -100200,
        title: "Source".to_string(),
        username: None,
        kind: ChatKind::Channel,
    };
    let listener_row = store
        .create_listener(1, &source, "solanagram-listener-1-100200")
        .await
        .unwrap();
    let redirect = store
        .add_elaboration(
            listener_row.id,
            NewElaboration {
                kind: ElaborationKind::Redirect,
                name: "broken".to_string(),
                config: serde_json::json!({}),
                priority: 0,
            },
        )
        .await
        .unwrap();

    let telegram = ScriptedTelegram::new();
    telegram.push_event(message(-100200, 1, "hello"));

    let client = connect_client(&telegram).await;
    let _ = listener::run(
        store.clone(),
        client,
        &bundle(WorkerKind::Listener, -100200, None, Some(listener_row.id)),
    )
    .await;

    let rows = store.elaborations(listener_row.id).await.unwrap();
    let broken = rows.iter().find(|e| e.id == redirect.id).unwrap();
    assert_eq!(broken.error_count, 1);
    assert_eq!(broken.processed_count, 0);
    assert!(telegram.forwards().is_empty());
}
