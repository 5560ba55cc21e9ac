// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logger mode: capture every message from the source chat into
//! `message_logs`.
//!
//! Inserts are idempotent on (chat, message, session): a replayed update is
//! counted as already-logged, not as an error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use solanagram_core::bundle::WorkerBundleConfig;
use solanagram_core::traits::{Store, TelegramClient};
use solanagram_core::types::{ChatEvent, IncomingMessage, NewMessageLog};
use solanagram_core::SolanagramError;

/// Run the capture loop until the update stream fails or ends.
pub async fn run(
    store: Arc<dyn Store>,
    mut client: Box<dyn TelegramClient>,
    config: &WorkerBundleConfig,
) -> Result<(), SolanagramError> {
    let session_id = config
        .logging_session_id
        .ok_or_else(|| SolanagramError::Config("logger bundle without session id".into()))?;

    info!(
        chat_id = config.chat_id,
        session_id, "logger worker attached"
    );

    loop {
        let event = match client.next_event().await {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "update stream failed");
                store
                    .bump_session_stats(session_id, 0, Some(&e.to_string()))
                    .await?;
                client.disconnect().await;
                return Err(e);
            }
        };

        let ChatEvent::Message(message) = event else {
            continue;
        };
        if message.chat_id != config.chat_id {
            continue;
        }

        match log_message(store.as_ref(), config, session_id, &message).await {
            Ok(inserted) => {
                if inserted {
                    store.bump_session_stats(session_id, 1, None).await?;
                    debug!(message_id = message.message_id, "message logged");
                } else {
                    debug!(message_id = message.message_id, "duplicate message skipped");
                }
            }
            Err(e) => {
                warn!(message_id = message.message_id, error = %e, "failed to log message");
                store
                    .bump_session_stats(session_id, 0, Some(&e.to_string()))
                    .await?;
            }
        }
    }
}

async fn log_message(
    store: &dyn Store,
    config: &WorkerBundleConfig,
    session_id: i64,
    message: &IncomingMessage,
) -> Result<bool, SolanagramError> {
    store
        .insert_message_log(NewMessageLog {
            user_id: config.user_id,
            chat_id: config.chat_id,
            chat_title: config.chat_title.clone(),
            chat_username: None,
            chat_type: config.chat_type.clone(),
            message_id: message.message_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name.clone(),
            sender_username: message.sender_username.clone(),
            message_text: message.text.clone(),
            message_type: message.kind,
            media_file_id: message.media_file_id,
            message_date: message.date,
            logging_session_id: session_id,
        })
        .await
}
