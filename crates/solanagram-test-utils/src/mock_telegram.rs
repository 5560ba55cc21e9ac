// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable Telegram connector for deterministic tests.
//!
//! One [`ScriptedTelegram`] handle is shared between the test and the
//! connector it hands to the bridge: the test scripts failures (flood waits,
//! transport drops, revoked authorizations) up front and asserts on call
//! counters afterwards.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use solanagram_core::traits::{TelegramClient, TelegramConnector};
use solanagram_core::types::{
    AccountInfo, ApiCredentials, ChatEvent, DialogSummary, SignInOutcome,
};
use solanagram_core::{Phone, SolanagramError};

#[derive(Default)]
struct ScriptState {
    connect_attempts: u32,
    connects_succeeded: u32,
    fail_connects: u32,
    send_code_calls: u32,
    send_code_disconnects: u32,
    flood_wait: Option<u64>,
    accepted_code: String,
    password: Option<String>,
    revoked: bool,
    dialogs: Vec<DialogSummary>,
    dialog_disconnects: u32,
    events: VecDeque<ChatEvent>,
    sign_in_calls: u32,
    disconnect_calls: u32,
    forwards: Vec<(i64, i64, i64)>,
}

/// Scripted Telegram backend shared between a test and its mock clients.
#[derive(Clone)]
pub struct ScriptedTelegram {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTelegram {
    pub fn new() -> Self {
        let state = ScriptState {
            accepted_code: "12345".to_string(),
            ..ScriptState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// A connector handing out clients bound to this script.
    pub fn connector(&self) -> Box<dyn TelegramConnector> {
        Box::new(ScriptedConnector {
            state: self.state.clone(),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    // --- scripting ---

    pub fn set_accepted_code(&self, code: &str) {
        self.lock().accepted_code = code.to_string();
    }

    /// Require this 2FA password at sign-in.
    pub fn require_password(&self, password: &str) {
        self.lock().password = Some(password.to_string());
    }

    /// Every send-code responds with a flood wait of `seconds`.
    pub fn set_flood_wait(&self, seconds: u64) {
        self.lock().flood_wait = Some(seconds);
    }

    /// Fail the next `n` connect attempts with a transport disconnect.
    pub fn fail_next_connects(&self, n: u32) {
        self.lock().fail_connects = n;
    }

    /// Fail the next `n` send-code calls with "cannot send while disconnected".
    pub fn fail_next_send_codes(&self, n: u32) {
        self.lock().send_code_disconnects = n;
    }

    /// Fail the next `n` dialog fetches with a transport disconnect.
    pub fn fail_next_dialog_fetches(&self, n: u32) {
        self.lock().dialog_disconnects = n;
    }

    /// Treat every restored session as revoked (AUTH_KEY_UNREGISTERED).
    pub fn revoke_authorization(&self) {
        self.lock().revoked = true;
    }

    pub fn set_dialogs(&self, dialogs: Vec<DialogSummary>) {
        self.lock().dialogs = dialogs;
    }

    /// Queue an update for worker clients; when the queue drains the client
    /// reports a transport disconnect, ending worker loops deterministically.
    pub fn push_event(&self, event: ChatEvent) {
        self.lock().events.push_back(event);
    }

    // --- observations ---

    pub fn connect_attempts(&self) -> u32 {
        self.lock().connect_attempts
    }

    pub fn connects_succeeded(&self) -> u32 {
        self.lock().connects_succeeded
    }

    pub fn send_code_calls(&self) -> u32 {
        self.lock().send_code_calls
    }

    pub fn sign_in_calls(&self) -> u32 {
        self.lock().sign_in_calls
    }

    pub fn disconnect_calls(&self) -> u32 {
        self.lock().disconnect_calls
    }

    /// `(source_chat, message_id, target_chat)` triples forwarded so far.
    pub fn forwards(&self) -> Vec<(i64, i64, i64)> {
        self.lock().forwards.clone()
    }
}

impl Default for ScriptedTelegram {
    fn default() -> Self {
        Self::new()
    }
}

struct ScriptedConnector {
    state: Arc<Mutex<ScriptState>>,
}

#[async_trait(?Send)]
impl TelegramConnector for ScriptedConnector {
    async fn connect(
        &self,
        _creds: &ApiCredentials,
        session: Option<&[u8]>,
    ) -> Result<Box<dyn TelegramClient>, SolanagramError> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.connect_attempts += 1;
        if state.fail_connects > 0 {
            state.fail_connects -= 1;
            return Err(SolanagramError::TransportDisconnected(
                "connection reset by peer".to_string(),
            ));
        }
        state.connects_succeeded += 1;
        Ok(Box::new(MockClient {
            state: self.state.clone(),
            connected: true,
            has_session: session.is_some(),
            signed_in: false,
            awaiting_password: false,
            code_requested: false,
        }))
    }
}

struct MockClient {
    state: Arc<Mutex<ScriptState>>,
    connected: bool,
    has_session: bool,
    signed_in: bool,
    awaiting_password: bool,
    code_requested: bool,
}

impl MockClient {
    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn session_live(&self) -> bool {
        let state = self.lock();
        self.signed_in || (self.has_session && !state.revoked)
    }
}

#[async_trait(?Send)]
impl TelegramClient for MockClient {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn is_authorized(&self) -> Result<bool, SolanagramError> {
        Ok(self.session_live())
    }

    async fn request_login_code(&mut self, _phone: &Phone) -> Result<(), SolanagramError> {
        let mut state = self.lock();
        state.send_code_calls += 1;
        if let Some(seconds) = state.flood_wait {
            return Err(SolanagramError::FloodWait {
                retry_after: seconds,
            });
        }
        if state.send_code_disconnects > 0 {
            state.send_code_disconnects -= 1;
            drop(state);
            self.connected = false;
            return Err(SolanagramError::TransportDisconnected(
                "cannot send requests while disconnected".to_string(),
            ));
        }
        drop(state);
        self.code_requested = true;
        Ok(())
    }

    async fn submit_code(&mut self, code: &str) -> Result<SignInOutcome, SolanagramError> {
        if !self.code_requested {
            return Err(SolanagramError::CodeExpired);
        }
        let mut state = self.lock();
        state.sign_in_calls += 1;
        if code != state.accepted_code {
            return Err(SolanagramError::CodeInvalid);
        }
        if state.password.is_some() {
            drop(state);
            self.awaiting_password = true;
            return Ok(SignInOutcome::PasswordNeeded);
        }
        drop(state);
        self.signed_in = true;
        Ok(SignInOutcome::Authorized)
    }

    async fn submit_password(&mut self, password: &str) -> Result<(), SolanagramError> {
        if !self.awaiting_password {
            return Err(SolanagramError::Needs2FA);
        }
        let expected = self.lock().password.clone();
        match expected {
            Some(p) if p == password => {
                self.signed_in = true;
                self.awaiting_password = false;
                Ok(())
            }
            _ => Err(SolanagramError::PasswordInvalid),
        }
    }

    async fn whoami(&self) -> Result<AccountInfo, SolanagramError> {
        if self.session_live() {
            Ok(AccountInfo {
                id: 777,
                first_name: Some("Mock".to_string()),
                username: Some("mock_account".to_string()),
                phone: None,
            })
        } else {
            Err(SolanagramError::AuthorizationLost)
        }
    }

    async fn dialogs(&mut self) -> Result<Vec<DialogSummary>, SolanagramError> {
        let mut state = self.lock();
        if state.dialog_disconnects > 0 {
            state.dialog_disconnects -= 1;
            drop(state);
            self.connected = false;
            return Err(SolanagramError::TransportDisconnected(
                "connection reset by peer".to_string(),
            ));
        }
        if state.revoked && !self.signed_in {
            return Err(SolanagramError::AuthorizationLost);
        }
        Ok(state.dialogs.clone())
    }

    async fn next_event(&mut self) -> Result<ChatEvent, SolanagramError> {
        let mut state = self.lock();
        match state.events.pop_front() {
            Some(event) => Ok(event),
            None => Err(SolanagramError::TransportDisconnected(
                "update stream closed".to_string(),
            )),
        }
    }

    async fn forward_message(
        &mut self,
        source_chat: i64,
        message_id: i64,
        target_chat: i64,
    ) -> Result<(), SolanagramError> {
        self.lock()
            .forwards
            .push((source_chat, message_id, target_chat));
        Ok(())
    }

    fn export_session(&self) -> Result<Vec<u8>, SolanagramError> {
        Ok(b"mock-session-blob".to_vec())
    }

    async fn disconnect(&mut self) {
        self.connected = false;
        self.lock().disconnect_calls += 1;
    }
}
