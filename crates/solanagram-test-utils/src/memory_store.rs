// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`Store`] implementation enforcing the same uniqueness
//! invariants as the Postgres schema, for orchestrator tests that must not
//! require a database.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use solanagram_core::traits::Store;
use solanagram_core::types::{
    ChatRef, ContainerStatus, ElaborationKind, ExtractedValue, LoggingSession,
    MessageElaboration, MessageListener, MessageLog, NewElaboration, NewExtractedValue,
    NewMessageLog, NewSavedMessage, NewUser, Phone, SavedMessage, User,
};
use solanagram_core::SolanagramError;

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: HashMap<i64, User>,
    sessions: HashMap<i64, LoggingSession>,
    logs: Vec<MessageLog>,
    listeners: HashMap<i64, MessageListener>,
    elaborations: HashMap<i64, MessageElaboration>,
    saved: Vec<SavedMessage>,
    extracted: Vec<ExtractedValue>,
}

impl Inner {
    fn next(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Fully in-memory store with Postgres-equivalent invariants.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cutoff(age: Duration) -> DateTime<Utc> {
    Utc::now() - chrono::Duration::from_std(age).unwrap_or(chrono::Duration::zero())
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, SolanagramError> {
        let mut inner = self.inner.lock().await;
        if inner.users.values().any(|u| u.phone == user.phone) {
            return Err(SolanagramError::AlreadyActive(
                "a user with this phone already exists".to_string(),
            ));
        }
        let id = inner.next();
        let row = User {
            id,
            phone: user.phone,
            password_hash: user.password_hash,
            api_id: Some(user.api_id),
            api_hash: Some(user.api_hash),
            telegram_session: None,
            created_at: Utc::now(),
            last_login: None,
            is_active: true,
        };
        inner.users.insert(id, row.clone());
        Ok(row)
    }

    async fn user_by_phone(&self, phone: &Phone) -> Result<Option<User>, SolanagramError> {
        let inner = self.inner.lock().await;
        Ok(inner.users.values().find(|u| &u.phone == phone).cloned())
    }

    async fn user_by_id(&self, id: i64) -> Result<Option<User>, SolanagramError> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn touch_last_login(&self, user_id: i64) -> Result<(), SolanagramError> {
        if let Some(user) = self.inner.lock().await.users.get_mut(&user_id) {
            user.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn set_password_hash(&self, user_id: i64, hash: &str) -> Result<(), SolanagramError> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| SolanagramError::NotFound(format!("user {user_id}")))?;
        user.password_hash = hash.to_string();
        Ok(())
    }

    async fn set_api_credentials(
        &self,
        user_id: i64,
        api_id: i32,
        api_hash_ct: Vec<u8>,
    ) -> Result<(), SolanagramError> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| SolanagramError::NotFound(format!("user {user_id}")))?;
        user.api_id = Some(api_id);
        user.api_hash = Some(api_hash_ct);
        user.telegram_session = None;
        Ok(())
    }

    async fn set_session_blob(
        &self,
        user_id: i64,
        blob: Option<Vec<u8>>,
    ) -> Result<(), SolanagramError> {
        let mut inner = self.inner.lock().await;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| SolanagramError::NotFound(format!("user {user_id}")))?;
        user.telegram_session = blob;
        Ok(())
    }

    async fn reserve_logging_session(
        &self,
        user_id: i64,
        chat: &ChatRef,
        container_name: &str,
    ) -> Result<LoggingSession, SolanagramError> {
        let mut inner = self.inner.lock().await;
        let conflict = inner
            .sessions
            .values()
            .any(|s| s.user_id == user_id && s.chat_id == chat.id && s.is_active);
        if conflict {
            return Err(SolanagramError::AlreadyActive(format!(
                "logging session already active for chat {}",
                chat.id
            )));
        }
        let id = inner.next();
        let now = Utc::now();
        let session = LoggingSession {
            id,
            user_id,
            chat_id: chat.id,
            chat_title: chat.title.clone(),
            chat_username: chat.username.clone(),
            chat_type: chat.kind.to_string(),
            is_active: true,
            container_name: Some(container_name.to_string()),
            container_id: None,
            container_status: ContainerStatus::Creating,
            messages_logged: 0,
            errors_count: 0,
            last_error: None,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn logging_session(
        &self,
        id: i64,
    ) -> Result<Option<LoggingSession>, SolanagramError> {
        Ok(self.inner.lock().await.sessions.get(&id).cloned())
    }

    async fn logging_sessions_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<LoggingSession>, SolanagramError> {
        let inner = self.inner.lock().await;
        let mut sessions: Vec<_> = inner
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.id));
        Ok(sessions)
    }

    async fn active_session_for_chat(
        &self,
        user_id: i64,
        chat_id: i64,
    ) -> Result<Option<LoggingSession>, SolanagramError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sessions
            .values()
            .find(|s| s.user_id == user_id && s.chat_id == chat_id && s.is_active)
            .cloned())
    }

    async fn running_logging_sessions(&self) -> Result<Vec<LoggingSession>, SolanagramError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sessions
            .values()
            .filter(|s| s.container_status == ContainerStatus::Running)
            .cloned()
            .collect())
    }

    async fn mark_session_running(
        &self,
        id: i64,
        container_id: &str,
    ) -> Result<(), SolanagramError> {
        if let Some(session) = self.inner.lock().await.sessions.get_mut(&id) {
            session.container_status = ContainerStatus::Running;
            session.container_id = Some(container_id.to_string());
            session.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_session_stopped(&self, id: i64) -> Result<(), SolanagramError> {
        if let Some(session) = self.inner.lock().await.sessions.get_mut(&id) {
            session.container_status = ContainerStatus::Stopped;
            session.is_active = false;
            session.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_session_error(&self, id: i64, reason: &str) -> Result<(), SolanagramError> {
        if let Some(session) = self.inner.lock().await.sessions.get_mut(&id) {
            session.container_status = ContainerStatus::Error;
            session.is_active = false;
            session.errors_count += 1;
            session.last_error = Some(reason.to_string());
            session.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_logging_session(&self, id: i64) -> Result<(), SolanagramError> {
        let mut inner = self.inner.lock().await;
        inner.sessions.remove(&id);
        inner.logs.retain(|l| l.logging_session_id != id);
        Ok(())
    }

    async fn remove_error_sessions_older_than(
        &self,
        age: Duration,
    ) -> Result<u64, SolanagramError> {
        let limit = cutoff(age);
        let mut removed = 0;
        for session in self.inner.lock().await.sessions.values_mut() {
            if session.container_status == ContainerStatus::Error && session.updated_at < limit {
                session.container_status = ContainerStatus::Removed;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn insert_message_log(&self, log: NewMessageLog) -> Result<bool, SolanagramError> {
        let mut inner = self.inner.lock().await;
        let duplicate = inner.logs.iter().any(|l| {
            l.chat_id == log.chat_id
                && l.message_id == log.message_id
                && l.logging_session_id == log.logging_session_id
        });
        if duplicate {
            return Ok(false);
        }
        let id = inner.next();
        inner.logs.push(MessageLog {
            id,
            user_id: log.user_id,
            chat_id: log.chat_id,
            chat_title: log.chat_title,
            chat_username: log.chat_username,
            chat_type: log.chat_type,
            message_id: log.message_id,
            sender_id: log.sender_id,
            sender_name: log.sender_name,
            sender_username: log.sender_username,
            message_text: log.message_text,
            message_type: log.message_type.to_string(),
            media_file_id: log.media_file_id,
            message_date: log.message_date,
            logged_at: Utc::now(),
            logging_session_id: log.logging_session_id,
        });
        Ok(true)
    }

    async fn message_logs(
        &self,
        session_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageLog>, SolanagramError> {
        let inner = self.inner.lock().await;
        let mut logs: Vec<_> = inner
            .logs
            .iter()
            .filter(|l| l.logging_session_id == session_id)
            .cloned()
            .collect();
        logs.sort_by_key(|l| std::cmp::Reverse(l.id));
        Ok(logs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn bump_session_stats(
        &self,
        session_id: i64,
        logged: u32,
        error: Option<&str>,
    ) -> Result<(), SolanagramError> {
        if let Some(session) = self.inner.lock().await.sessions.get_mut(&session_id) {
            session.messages_logged += i64::from(logged);
            if logged > 0 {
                session.last_message_at = Some(Utc::now());
            }
            if let Some(reason) = error {
                session.errors_count += 1;
                session.last_error = Some(reason.to_string());
            }
        }
        Ok(())
    }

    async fn purge_message_logs_older_than(
        &self,
        age: Duration,
    ) -> Result<u64, SolanagramError> {
        let limit = cutoff(age);
        let mut inner = self.inner.lock().await;
        let before = inner.logs.len();
        inner.logs.retain(|l| l.logged_at >= limit);
        Ok((before - inner.logs.len()) as u64)
    }

    async fn create_listener(
        &self,
        user_id: i64,
        source: &ChatRef,
        container_name: &str,
    ) -> Result<MessageListener, SolanagramError> {
        let mut inner = self.inner.lock().await;
        let conflict = inner
            .listeners
            .values()
            .any(|l| l.user_id == user_id && l.source_chat_id == source.id);
        if conflict {
            return Err(SolanagramError::AlreadyActive(
                "a listener already exists for this source chat".to_string(),
            ));
        }
        let id = inner.next();
        let now = Utc::now();
        let listener = MessageListener {
            id,
            user_id,
            source_chat_id: source.id,
            source_chat_title: source.title.clone(),
            source_chat_username: source.username.clone(),
            source_chat_type: source.kind.to_string(),
            is_active: true,
            container_name: Some(container_name.to_string()),
            container_id: None,
            container_status: ContainerStatus::Creating,
            messages_saved: 0,
            errors_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        inner.listeners.insert(id, listener.clone());
        Ok(listener)
    }

    async fn listener(&self, id: i64) -> Result<Option<MessageListener>, SolanagramError> {
        Ok(self.inner.lock().await.listeners.get(&id).cloned())
    }

    async fn listeners_for_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<MessageListener>, SolanagramError> {
        let inner = self.inner.lock().await;
        let mut listeners: Vec<_> = inner
            .listeners
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        listeners.sort_by_key(|l| std::cmp::Reverse(l.id));
        Ok(listeners)
    }

    async fn running_listeners(&self) -> Result<Vec<MessageListener>, SolanagramError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .listeners
            .values()
            .filter(|l| l.container_status == ContainerStatus::Running)
            .cloned()
            .collect())
    }

    async fn mark_listener_running(
        &self,
        id: i64,
        container_id: &str,
    ) -> Result<(), SolanagramError> {
        if let Some(listener) = self.inner.lock().await.listeners.get_mut(&id) {
            listener.container_status = ContainerStatus::Running;
            listener.is_active = true;
            listener.container_id = Some(container_id.to_string());
            listener.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_listener_stopped(&self, id: i64) -> Result<(), SolanagramError> {
        if let Some(listener) = self.inner.lock().await.listeners.get_mut(&id) {
            listener.container_status = ContainerStatus::Stopped;
            listener.is_active = false;
            listener.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_listener_error(&self, id: i64, reason: &str) -> Result<(), SolanagramError> {
        if let Some(listener) = self.inner.lock().await.listeners.get_mut(&id) {
            listener.container_status = ContainerStatus::Error;
            listener.is_active = false;
            listener.errors_count += 1;
            listener.last_error = Some(reason.to_string());
            listener.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_listener(&self, id: i64) -> Result<(), SolanagramError> {
        let mut inner = self.inner.lock().await;
        inner.listeners.remove(&id);
        let elaboration_ids: Vec<i64> = inner
            .elaborations
            .values()
            .filter(|e| e.listener_id == id)
            .map(|e| e.id)
            .collect();
        for eid in &elaboration_ids {
            inner.elaborations.remove(eid);
        }
        inner.saved.retain(|s| s.listener_id != id);
        inner
            .extracted
            .retain(|v| !elaboration_ids.contains(&v.elaboration_id));
        Ok(())
    }

    async fn bump_listener_stats(
        &self,
        listener_id: i64,
        saved: u32,
        error: Option<&str>,
    ) -> Result<(), SolanagramError> {
        if let Some(listener) = self.inner.lock().await.listeners.get_mut(&listener_id) {
            listener.messages_saved += i64::from(saved);
            if let Some(reason) = error {
                listener.errors_count += 1;
                listener.last_error = Some(reason.to_string());
            }
        }
        Ok(())
    }

    async fn add_elaboration(
        &self,
        listener_id: i64,
        elaboration: NewElaboration,
    ) -> Result<MessageElaboration, SolanagramError> {
        let mut inner = self.inner.lock().await;
        if !inner.listeners.contains_key(&listener_id) {
            return Err(SolanagramError::NotFound(format!("listener {listener_id}")));
        }
        let name_taken = inner
            .elaborations
            .values()
            .any(|e| e.listener_id == listener_id && e.name == elaboration.name);
        if name_taken {
            return Err(SolanagramError::AlreadyActive(
                "elaboration name already present".to_string(),
            ));
        }
        if elaboration.kind == ElaborationKind::Redirect {
            let redirect_exists = inner
                .elaborations
                .values()
                .any(|e| e.listener_id == listener_id && e.kind == ElaborationKind::Redirect);
            if redirect_exists {
                return Err(SolanagramError::AlreadyActive(
                    "listener already has a redirect elaboration".to_string(),
                ));
            }
        }
        let id = inner.next();
        let now = Utc::now();
        let row = MessageElaboration {
            id,
            listener_id,
            kind: elaboration.kind,
            name: elaboration.name,
            config: elaboration.config,
            is_active: true,
            priority: elaboration.priority,
            processed_count: 0,
            error_count: 0,
            last_error_message: None,
            last_processed_at: None,
            created_at: now,
            updated_at: now,
        };
        inner.elaborations.insert(id, row.clone());
        Ok(row)
    }

    async fn elaborations(
        &self,
        listener_id: i64,
    ) -> Result<Vec<MessageElaboration>, SolanagramError> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<_> = inner
            .elaborations
            .values()
            .filter(|e| e.listener_id == listener_id)
            .cloned()
            .collect();
        rows.sort_by_key(|e| (e.priority, e.id));
        Ok(rows)
    }

    async fn set_elaboration_active(
        &self,
        id: i64,
        active: bool,
    ) -> Result<(), SolanagramError> {
        let mut inner = self.inner.lock().await;
        let row = inner
            .elaborations
            .get_mut(&id)
            .ok_or_else(|| SolanagramError::NotFound(format!("elaboration {id}")))?;
        row.is_active = active;
        Ok(())
    }

    async fn delete_elaboration(&self, id: i64) -> Result<(), SolanagramError> {
        let mut inner = self.inner.lock().await;
        inner.elaborations.remove(&id);
        inner.extracted.retain(|v| v.elaboration_id != id);
        Ok(())
    }

    async fn bump_elaboration_stats(
        &self,
        id: i64,
        processed: u32,
        error: Option<&str>,
    ) -> Result<(), SolanagramError> {
        if let Some(row) = self.inner.lock().await.elaborations.get_mut(&id) {
            row.processed_count += i64::from(processed);
            if processed > 0 {
                row.last_processed_at = Some(Utc::now());
            }
            if let Some(reason) = error {
                row.error_count += 1;
                row.last_error_message = Some(reason.to_string());
            }
        }
        Ok(())
    }

    async fn insert_saved_message(
        &self,
        msg: NewSavedMessage,
    ) -> Result<Option<i64>, SolanagramError> {
        let mut inner = self.inner.lock().await;
        let duplicate = inner
            .saved
            .iter()
            .any(|s| s.listener_id == msg.listener_id && s.message_id == msg.message_id);
        if duplicate {
            return Ok(None);
        }
        let id = inner.next();
        inner.saved.push(SavedMessage {
            id,
            listener_id: msg.listener_id,
            message_id: msg.message_id,
            message_text: msg.message_text,
            data: msg.data,
            sender_id: msg.sender_id,
            sender_name: msg.sender_name,
            message_date: msg.message_date,
            saved_at: Utc::now(),
        });
        Ok(Some(id))
    }

    async fn saved_messages(
        &self,
        listener_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SavedMessage>, SolanagramError> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<_> = inner
            .saved
            .iter()
            .filter(|s| s.listener_id == listener_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse(s.id));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn purge_saved_messages_older_than(
        &self,
        age: Duration,
    ) -> Result<u64, SolanagramError> {
        let limit = cutoff(age);
        let mut inner = self.inner.lock().await;
        let before = inner.saved.len();
        inner.saved.retain(|s| s.saved_at >= limit);
        Ok((before - inner.saved.len()) as u64)
    }

    async fn insert_extracted_value(
        &self,
        value: NewExtractedValue,
    ) -> Result<bool, SolanagramError> {
        let mut inner = self.inner.lock().await;
        let duplicate = inner.extracted.iter().any(|v| {
            v.elaboration_id == value.elaboration_id
                && v.saved_message_id == value.saved_message_id
                && v.rule_name == value.rule_name
                && v.occurrence_index == value.occurrence_index
        });
        if duplicate {
            return Ok(false);
        }
        let id = inner.next();
        inner.extracted.push(ExtractedValue {
            id,
            elaboration_id: value.elaboration_id,
            saved_message_id: value.saved_message_id,
            rule_name: value.rule_name,
            extracted_value: value.extracted_value,
            occurrence_index: value.occurrence_index,
            extracted_at: Utc::now(),
        });
        Ok(true)
    }

    async fn extracted_values(
        &self,
        elaboration_id: i64,
        limit: i64,
    ) -> Result<Vec<ExtractedValue>, SolanagramError> {
        let inner = self.inner.lock().await;
        let mut rows: Vec<_> = inner
            .extracted
            .iter()
            .filter(|v| v.elaboration_id == elaboration_id)
            .cloned()
            .collect();
        rows.sort_by_key(|v| std::cmp::Reverse(v.id));
        Ok(rows.into_iter().take(limit.max(0) as usize).collect())
    }

    async fn schema_version(&self) -> Result<Option<String>, SolanagramError> {
        Ok(Some("1".to_string()))
    }
}
