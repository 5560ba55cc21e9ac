// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Listener mode: save every source-chat message, then apply the
//! elaborations in priority order (extractor rules and the single redirect).
//!
//! A failing elaboration updates its error counters and never stops the
//! listener; the database stays the source of truth for the elaboration
//! set, the bundle's copy is only the launch-time snapshot.

use std::sync::Arc;

use tracing::{debug, info, warn};

use solanagram_core::bundle::{BundleElaboration, WorkerBundleConfig};
use solanagram_core::traits::{Store, TelegramClient};
use solanagram_core::types::{
    ChatEvent, ElaborationKind, IncomingMessage, NewExtractedValue, NewSavedMessage,
};
use solanagram_core::SolanagramError;

use crate::elaborations::{apply_rules, parse_rules, redirect_target};

/// Run the listener loop until the update stream fails or ends.
pub async fn run(
    store: Arc<dyn Store>,
    mut client: Box<dyn TelegramClient>,
    config: &WorkerBundleConfig,
) -> Result<(), SolanagramError> {
    let listener_id = config
        .listener_id
        .ok_or_else(|| SolanagramError::Config("listener bundle without listener id".into()))?;

    // Prefer the live elaboration set; fall back to the launch snapshot.
    let elaborations = match store.elaborations(listener_id).await {
        Ok(rows) => rows.iter().map(BundleElaboration::from).collect(),
        Err(e) => {
            warn!(error = %e, "could not refresh elaborations, using bundle snapshot");
            config.elaborations.clone()
        }
    };

    info!(
        source_chat = config.chat_id,
        listener_id,
        elaborations = elaborations.len(),
        "listener worker attached"
    );

    loop {
        let event = match client.next_event().await {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "update stream failed");
                store
                    .bump_listener_stats(listener_id, 0, Some(&e.to_string()))
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

        let saved_id = match save_message(store.as_ref(), listener_id, &message).await {
            Ok(Some(id)) => {
                store.bump_listener_stats(listener_id, 1, None).await?;
                id
            }
            Ok(None) => {
                debug!(message_id = message.message_id, "duplicate message skipped");
                continue;
            }
            Err(e) => {
                warn!(message_id = message.message_id, error = %e, "failed to save message");
                store
                    .bump_listener_stats(listener_id, 0, Some(&e.to_string()))
                    .await?;
                continue;
            }
        };

        for elaboration in elaborations.iter().filter(|e| e.is_active) {
            let result = match elaboration.kind {
                ElaborationKind::Extractor => {
                    apply_extractor(store.as_ref(), elaboration, saved_id, &message).await
                }
                ElaborationKind::Redirect => {
                    apply_redirect(client.as_mut(), config, elaboration, &message).await
                }
            };
            match result {
                Ok(()) => {
                    store
                        .bump_elaboration_stats(elaboration.id, 1, None)
                        .await?;
                }
                Err(e) => {
                    warn!(
                        elaboration = %elaboration.name,
                        message_id = message.message_id,
                        error = %e,
                        "elaboration failed"
                    );
                    store
                        .bump_elaboration_stats(elaboration.id, 0, Some(&e.to_string()))
                        .await?;
                }
            }
        }
    }
}

async fn save_message(
    store: &dyn Store,
    listener_id: i64,
    message: &IncomingMessage,
) -> Result<Option<i64>, SolanagramError> {
    let data = serde_json::json!({
        "chat_id": message.chat_id,
        "kind": message.kind,
        "sender_username": message.sender_username,
        "date": message.date,
    });
    store
        .insert_saved_message(NewSavedMessage {
            listener_id,
            message_id: message.message_id,
            message_text: message.text.clone(),
            data,
            sender_id: message.sender_id,
            sender_name: message.sender_name.clone(),
            message_date: message.date,
        })
        .await
}

async fn apply_extractor(
    store: &dyn Store,
    elaboration: &BundleElaboration,
    saved_message_id: i64,
    message: &IncomingMessage,
) -> Result<(), SolanagramError> {
    let Some(text) = message.text.as_deref() else {
        return Ok(());
    };
    let rules = parse_rules(&elaboration.config);
    for capture in apply_rules(&rules, text) {
        store
            .insert_extracted_value(NewExtractedValue {
                elaboration_id: elaboration.id,
                saved_message_id,
                rule_name: capture.rule_name,
                extracted_value: capture.value,
                occurrence_index: capture.occurrence_index,
            })
            .await?;
    }
    Ok(())
}

async fn apply_redirect(
    client: &mut dyn TelegramClient,
    config: &WorkerBundleConfig,
    elaboration: &BundleElaboration,
    message: &IncomingMessage,
) -> Result<(), SolanagramError> {
    let target = redirect_target(&elaboration.config).ok_or_else(|| {
        SolanagramError::Config(format!(
            "redirect elaboration {} has no target_chat_id",
            elaboration.id
        ))
    })?;
    client
        .forward_message(config.chat_id, message.message_id, target)
        .await
}
