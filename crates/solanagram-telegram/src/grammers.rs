// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Production Telegram adapter over grammers (MTProto user-account client).
//!
//! Maps every library failure through the classification table; the login
//! token and 2FA token never leave the handle, which is what lets the
//! orchestrator treat "pending code" as client-bound state.

use std::collections::HashMap;

use async_trait::async_trait;
use grammers_client::types::{Chat, LoginToken, Media, PasswordToken};
use grammers_client::{Client, Config, InitParams, SignInError, Update};
use grammers_mtsender::InvocationError;
use grammers_session::Session;
use secrecy::ExposeSecret;

use solanagram_core::traits::{TelegramClient, TelegramConnector};
use solanagram_core::types::{
    AccountInfo, ApiCredentials, ChatEvent, ChatKind, ChatRef, DialogSummary, IncomingMessage,
    MessageKind, SignInOutcome,
};
use solanagram_core::{Phone, SolanagramError};

use crate::classify;

fn classify_invocation(e: InvocationError) -> SolanagramError {
    if let InvocationError::Rpc(rpc) = &e {
        classify::classify_rpc(&rpc.name, rpc.value)
    } else {
        SolanagramError::TransportDisconnected(e.to_string())
    }
}

fn chat_ref(chat: &Chat) -> ChatRef {
    let kind = match chat {
        Chat::User(_) => ChatKind::Private,
        Chat::Group(_) => ChatKind::Group,
        Chat::Channel(_) => ChatKind::Channel,
    };
    ChatRef {
        id: chat.id(),
        title: chat.name().to_string(),
        username: chat.username().map(str::to_string),
        kind,
    }
}

fn message_kind(media: Option<&Media>) -> MessageKind {
    match media {
        None => MessageKind::Text,
        Some(Media::Photo(_)) => MessageKind::Photo,
        Some(Media::Sticker(_)) => MessageKind::Sticker,
        Some(_) => MessageKind::Document,
    }
}

/// Connector producing grammers-backed clients.
pub struct GrammersConnector;

#[async_trait(?Send)]
impl TelegramConnector for GrammersConnector {
    async fn connect(
        &self,
        creds: &ApiCredentials,
        session: Option<&[u8]>,
    ) -> Result<Box<dyn TelegramClient>, SolanagramError> {
        let session = match session {
            Some(bytes) => Session::load(bytes).map_err(|e| {
                SolanagramError::Internal(format!("stored session blob is unreadable: {e}"))
            })?,
            None => Session::new(),
        };

        let client = Client::connect(Config {
            session,
            api_id: creds.api_id,
            api_hash: creds.api_hash.expose_secret().to_string(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| classify::classify_message(&e.to_string()))?;

        Ok(Box::new(GrammersClient::new(client)))
    }
}

/// One live grammers client plus the login/2FA tokens bound to it.
pub struct GrammersClient {
    client: Client,
    connected: bool,
    login_token: Option<LoginToken>,
    password_token: Option<PasswordToken>,
    /// Chats seen through dialogs or updates, for forwarding by id.
    chats: HashMap<i64, Chat>,
}

impl GrammersClient {
    fn new(client: Client) -> Self {
        Self {
            client,
            connected: true,
            login_token: None,
            password_token: None,
            chats: HashMap::new(),
        }
    }
}

#[async_trait(?Send)]
impl TelegramClient for GrammersClient {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn is_authorized(&self) -> Result<bool, SolanagramError> {
        self.client.is_authorized().await.map_err(classify_invocation)
    }

    async fn request_login_code(&mut self, phone: &Phone) -> Result<(), SolanagramError> {
        let token = self
            .client
            .request_login_code(phone.as_str())
            .await
            .map_err(|e| classify::classify_message(&e.to_string()))?;
        self.login_token = Some(token);
        Ok(())
    }

    async fn submit_code(&mut self, code: &str) -> Result<SignInOutcome, SolanagramError> {
        let token = self
            .login_token
            .as_ref()
            .ok_or(SolanagramError::CodeExpired)?;
        match self.client.sign_in(token, code).await {
            Ok(_user) => Ok(SignInOutcome::Authorized),
            Err(SignInError::PasswordRequired(password_token)) => {
                self.password_token = Some(password_token);
                Ok(SignInOutcome::PasswordNeeded)
            }
            Err(SignInError::InvalidCode) => Err(SolanagramError::CodeInvalid),
            Err(SignInError::InvalidPassword) => Err(SolanagramError::PasswordInvalid),
            Err(SignInError::SignUpRequired { .. }) => Err(SolanagramError::Telegram(
                "phone number has no registered telegram account".to_string(),
            )),
            Err(SignInError::Other(e)) => Err(classify_invocation(e)),
        }
    }

    async fn submit_password(&mut self, password: &str) -> Result<(), SolanagramError> {
        let token = self
            .password_token
            .take()
            .ok_or(SolanagramError::Needs2FA)?;
        match self.client.check_password(token, password).await {
            Ok(_user) => Ok(()),
            Err(SignInError::InvalidPassword) => Err(SolanagramError::PasswordInvalid),
            Err(SignInError::InvalidCode) => Err(SolanagramError::CodeInvalid),
            Err(SignInError::PasswordRequired(t)) => {
                self.password_token = Some(t);
                Err(SolanagramError::PasswordInvalid)
            }
            Err(SignInError::SignUpRequired { .. }) => Err(SolanagramError::Telegram(
                "phone number has no registered telegram account".to_string(),
            )),
            Err(SignInError::Other(e)) => Err(classify_invocation(e)),
        }
    }

    async fn whoami(&self) -> Result<AccountInfo, SolanagramError> {
        let me = self.client.get_me().await.map_err(classify_invocation)?;
        Ok(AccountInfo {
            id: me.id(),
            first_name: Some(me.full_name()),
            username: me.username().map(str::to_string),
            phone: me.phone().map(str::to_string),
        })
    }

    async fn dialogs(&mut self) -> Result<Vec<DialogSummary>, SolanagramError> {
        let mut iter = self.client.iter_dialogs();
        let mut out = Vec::new();
        while let Some(dialog) = iter.next().await.map_err(classify_invocation)? {
            let chat = dialog.chat();
            self.chats.insert(chat.id(), chat.clone());
            out.push(DialogSummary {
                chat: chat_ref(chat),
                members_count: None,
                unread_count: 0,
                last_message_at: None,
            });
        }
        Ok(out)
    }

    async fn next_event(&mut self) -> Result<ChatEvent, SolanagramError> {
        let update = self.client.next_update().await.map_err(classify_invocation)?;
        match update {
            Update::NewMessage(message) => {
                let chat = message.chat();
                self.chats.insert(chat.id(), chat.clone());
                let (sender_id, sender_name, sender_username) = match message.sender() {
                    Some(sender) => (
                        Some(sender.id()),
                        Some(sender.name().to_string()),
                        sender.username().map(str::to_string),
                    ),
                    None => (None, None, None),
                };
                let text = message.text();
                Ok(ChatEvent::Message(IncomingMessage {
                    chat_id: chat.id(),
                    message_id: i64::from(message.id()),
                    sender_id,
                    sender_name,
                    sender_username,
                    text: if text.is_empty() {
                        None
                    } else {
                        Some(text.to_string())
                    },
                    kind: message_kind(message.media().as_ref()),
                    media_file_id: None,
                    date: message.date(),
                }))
            }
            _ => Ok(ChatEvent::Other),
        }
    }

    async fn forward_message(
        &mut self,
        source_chat: i64,
        message_id: i64,
        target_chat: i64,
    ) -> Result<(), SolanagramError> {
        let source = self
            .chats
            .get(&source_chat)
            .cloned()
            .ok_or_else(|| SolanagramError::Telegram(format!("unknown chat {source_chat}")))?;
        let target = self
            .chats
            .get(&target_chat)
            .cloned()
            .ok_or_else(|| SolanagramError::Telegram(format!("unknown chat {target_chat}")))?;

        let ids = [i32::try_from(message_id)
            .map_err(|_| SolanagramError::Validation("message id out of range".to_string()))?];
        self.client
            .forward_messages(&target, &ids, &source)
            .await
            .map_err(classify_invocation)?;
        Ok(())
    }

    fn export_session(&self) -> Result<Vec<u8>, SolanagramError> {
        Ok(self.client.session().save())
    }

    async fn disconnect(&mut self) {
        // Dropping the handle tears down the transport; marking the state
        // here keeps `is_connected` truthful for the registry.
        self.connected = false;
    }
}
