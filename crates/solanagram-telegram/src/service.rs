// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-phone auth flow and client operations.
//!
//! All methods run on the bridge thread and serialize per phone through the
//! registry gate: no two send-code / verify-code / ensure-connected
//! interleave for one phone, while different phones proceed concurrently.
//!
//! State machine per phone: idle -> code sent -> (authorized | needs 2FA |
//! code invalid) with flood-wait as a terminal rate-limit outcome; on
//! success the client's opaque session blob is wrapped and persisted, which
//! is the durable root of authorization.

use std::sync::Arc;

use solanagram_core::traits::{Store, TelegramClient as _, TelegramConnector};
use solanagram_core::types::{ApiCredentials, DialogSummary, SignInOutcome, User};
use solanagram_core::{Phone, SolanagramError};
use solanagram_vault::CredentialStore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::manager::{self, Timeouts};
use crate::pending::CodeCaches;
use crate::registry::{CachedClient, PhoneSlot, SessionRegistry};

/// Outcome of a send-code request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendCodeOutcome {
    /// A fresh code was sent through Telegram.
    CodeSent,
    /// A still-valid code exists; no Telegram call was made.
    CachedCodeAvailable,
}

/// Everything the bridge thread owns for Telegram work.
pub struct TelegramService {
    connector: Box<dyn TelegramConnector>,
    registry: SessionRegistry,
    codes: CodeCaches,
    store: Arc<dyn Store>,
    vault: CredentialStore,
    /// Platform-level fallback api credentials, used when a user row has none.
    fallback_creds: Option<ApiCredentials>,
    timeouts: Timeouts,
}

impl TelegramService {
    pub fn new(
        connector: Box<dyn TelegramConnector>,
        registry: SessionRegistry,
        store: Arc<dyn Store>,
        vault: CredentialStore,
        fallback_creds: Option<ApiCredentials>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            connector,
            registry,
            codes: CodeCaches::new(),
            store,
            vault,
            fallback_creds,
            timeouts,
        }
    }

    /// Send (or reuse) a login code for `phone`.
    pub async fn send_code(
        &self,
        phone: &Phone,
        password: Option<String>,
        force_new: bool,
    ) -> Result<SendCodeOutcome, SolanagramError> {
        let slot = self.registry.slot(phone);
        let _gate = slot.gate.lock().await;

        let (_user, creds, blob) = self.resolve(phone, &slot).await?;

        if !force_new
            && (self.codes.cached_code(phone).is_some() || self.codes.pending(phone).is_some())
        {
            debug!(phone = %phone, "valid code already pending, skipping send");
            return Ok(SendCodeOutcome::CachedCodeAvailable);
        }
        if force_new {
            self.codes.clear_all(phone);
        }
        let cached = self
            .ensure(&slot, phone, &creds, blob.as_deref())
            .await?;

        let cached = self
            .request_code_once_retried(&slot, phone, &creds, blob.as_deref(), cached)
            .await?;

        slot.put(cached);
        self.codes.put_pending(phone, password);
        info!(phone = %phone, "login code sent");
        Ok(SendCodeOutcome::CodeSent)
    }

    /// Verify a login code (and the 2FA password when required).
    pub async fn verify_code(
        &self,
        phone: &Phone,
        code: &str,
        password: Option<String>,
    ) -> Result<(), SolanagramError> {
        let slot = self.registry.slot(phone);
        let _gate = slot.gate.lock().await;

        let pending = self.codes.pending(phone);
        if pending.is_none() && self.codes.cached_code(phone).is_none() {
            return Err(SolanagramError::CodeExpired);
        }

        let (user, creds, blob) = self.resolve(phone, &slot).await?;
        let mut cached = self
            .ensure(&slot, phone, &creds, blob.as_deref())
            .await?;

        // Re-login within the code window: the cached handle may already be
        // authorized, in which case the sign-in step is a no-op.
        let already_authorized = matches!(
            timeout(self.timeouts.request, cached.client.is_authorized()).await,
            Ok(Ok(true))
        );

        if !already_authorized {
            match timeout(self.timeouts.request, cached.client.submit_code(code)).await {
                Ok(Ok(SignInOutcome::Authorized)) => {}
                Ok(Ok(SignInOutcome::PasswordNeeded)) => {
                    let stored = pending.and_then(|p| p.password);
                    let Some(pw) = password.or(stored) else {
                        slot.put(cached);
                        return Err(SolanagramError::Needs2FA);
                    };
                    match timeout(self.timeouts.request, cached.client.submit_password(&pw)).await
                    {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            slot.put(cached);
                            return Err(e);
                        }
                        Err(_) => {
                            manager::dispose(cached).await;
                            return Err(SolanagramError::Timeout {
                                duration: self.timeouts.request,
                            });
                        }
                    }
                }
                Ok(Err(SolanagramError::CodeInvalid)) => {
                    self.codes.bump_attempts(phone);
                    slot.put(cached);
                    return Err(SolanagramError::CodeInvalid);
                }
                Ok(Err(e)) if e.is_transport_disconnect() => {
                    // The login token lives inside the dropped client, so the
                    // code session cannot be resumed on a new transport.
                    warn!(phone = %phone, error = %e, "transport lost during sign-in");
                    manager::dispose(cached).await;
                    self.codes.clear_pending(phone);
                    return Err(SolanagramError::CodeExpired);
                }
                Ok(Err(e)) => {
                    slot.put(cached);
                    return Err(e);
                }
                Err(_) => {
                    manager::dispose(cached).await;
                    return Err(SolanagramError::Timeout {
                        duration: self.timeouts.request,
                    });
                }
            }
        }

        // Persist the authorization: wrap the opaque session blob at rest.
        let session = cached.client.export_session()?;
        let wrapped = self.vault.wrap(&session)?;
        self.store.set_session_blob(user.id, Some(wrapped)).await?;
        self.store.touch_last_login(user.id).await?;
        self.codes.clear_pending(phone);
        self.codes.put_cached_code(phone, code);
        cached.authorized = true;
        slot.put(cached);
        info!(phone = %phone, user_id = user.id, "telegram sign-in complete");
        Ok(())
    }

    /// Fetch the caller's dialog list.
    pub async fn get_chats(
        &self,
        phone: &Phone,
    ) -> Result<Vec<DialogSummary>, SolanagramError> {
        let slot = self.registry.slot(phone);
        let _gate = slot.gate.lock().await;

        let (user, creds, blob) = self.resolve(phone, &slot).await?;
        if blob.is_none() {
            return Err(SolanagramError::AuthorizationLost);
        }

        let mut cached = self
            .ensure(&slot, phone, &creds, blob.as_deref())
            .await?;

        if !cached.authorized {
            match timeout(self.timeouts.probe, cached.client.whoami()).await {
                Ok(Ok(_)) => cached.authorized = true,
                Ok(Err(SolanagramError::AuthorizationLost)) => {
                    return self.lose_authorization(&user, phone, cached).await;
                }
                Ok(Err(e)) if e.is_transport_disconnect() => {
                    manager::dispose(cached).await;
                    return Err(SolanagramError::ConnectUnavailable);
                }
                Ok(Err(e)) => {
                    manager::dispose(cached).await;
                    return Err(e);
                }
                Err(_) => {
                    manager::dispose(cached).await;
                    return Err(SolanagramError::Timeout {
                        duration: self.timeouts.probe,
                    });
                }
            }
        }

        match timeout(self.timeouts.request, cached.client.dialogs()).await {
            Ok(Ok(dialogs)) => {
                slot.put(cached);
                Ok(dialogs)
            }
            Ok(Err(SolanagramError::AuthorizationLost)) => {
                self.lose_authorization(&user, phone, cached).await
            }
            Ok(Err(e)) if e.is_transport_disconnect() => {
                // Evict and retry once, the only sanctioned automatic retry.
                warn!(phone = %phone, error = %e, "dialog fetch hit disconnect, retrying once");
                manager::dispose(cached).await;
                let mut fresh = self
                    .ensure(&slot, phone, &creds, blob.as_deref())
                    .await?;
                match timeout(self.timeouts.request, fresh.client.dialogs()).await {
                    Ok(Ok(dialogs)) => {
                        slot.put(fresh);
                        Ok(dialogs)
                    }
                    Ok(Err(e2)) if e2.is_transport_disconnect() => {
                        manager::dispose(fresh).await;
                        Err(SolanagramError::ConnectUnavailable)
                    }
                    Ok(Err(e2)) => {
                        manager::dispose(fresh).await;
                        Err(e2)
                    }
                    Err(_) => {
                        manager::dispose(fresh).await;
                        Err(SolanagramError::Timeout {
                            duration: self.timeouts.request,
                        })
                    }
                }
            }
            Ok(Err(e)) => {
                slot.put(cached);
                Err(e)
            }
            Err(_) => {
                manager::dispose(cached).await;
                Err(SolanagramError::Timeout {
                    duration: self.timeouts.request,
                })
            }
        }
    }

    /// Whether the stored session blob still carries a live authorization.
    ///
    /// Revoked authorizations clear the stored blob (re-auth required).
    pub async fn session_status(&self, phone: &Phone) -> Result<bool, SolanagramError> {
        let slot = self.registry.slot(phone);
        let _gate = slot.gate.lock().await;

        let (user, creds, blob) = self.resolve(phone, &slot).await?;
        if blob.is_none() {
            return Ok(false);
        }

        let mut cached = self
            .ensure(&slot, phone, &creds, blob.as_deref())
            .await?;

        match timeout(self.timeouts.probe, cached.client.whoami()).await {
            Ok(Ok(_)) => {
                cached.authorized = true;
                slot.put(cached);
                Ok(true)
            }
            Ok(Err(SolanagramError::AuthorizationLost)) => {
                self.store.set_session_blob(user.id, None).await?;
                manager::dispose(cached).await;
                info!(phone = %phone, "stored telegram authorization revoked, blob cleared");
                Ok(false)
            }
            Ok(Err(e)) if e.is_transport_disconnect() => {
                manager::dispose(cached).await;
                Err(SolanagramError::ConnectUnavailable)
            }
            Ok(Err(e)) => {
                manager::dispose(cached).await;
                Err(e)
            }
            Err(_) => {
                manager::dispose(cached).await;
                Err(SolanagramError::Timeout {
                    duration: self.timeouts.probe,
                })
            }
        }
    }

    /// Explicitly drop the cached client for a phone.
    pub async fn disconnect(&self, phone: &Phone) {
        let slot = self.registry.slot(phone);
        let _gate = slot.gate.lock().await;
        if let Some(cached) = slot.take() {
            manager::dispose(cached).await;
            debug!(phone = %phone, "client handle evicted on request");
        }
    }

    /// Evict expired handles; returns how many were disposed.
    pub async fn sweep_expired(&self) -> usize {
        let evicted = self.registry.sweep_expired();
        let count = evicted.len();
        for (_phone, cached) in evicted {
            manager::dispose(cached).await;
        }
        count
    }

    /// The reusable verified code for a phone, if still valid.
    pub fn cached_code(&self, phone: &Phone) -> Option<String> {
        self.codes.cached_code(phone)
    }

    /// Drop both code caches for a phone.
    pub fn clear_cached_code(&self, phone: &Phone) {
        self.codes.clear_all(phone);
    }

    /// Evict whatever handle a phone has cached (used on outer timeouts, to
    /// never leave a half-open client behind).
    pub async fn evict(&self, phone: &Phone) {
        let slot = self.registry.slot(phone);
        let Ok(_gate) = slot.gate.try_lock() else {
            return;
        };
        if let Some(cached) = slot.take() {
            manager::dispose(cached).await;
        }
    }

    // --- internals ---

    async fn ensure(
        &self,
        slot: &PhoneSlot,
        phone: &Phone,
        creds: &ApiCredentials,
        blob: Option<&[u8]>,
    ) -> Result<CachedClient, SolanagramError> {
        manager::ensure_connected(
            self.connector.as_ref(),
            slot,
            phone,
            creds,
            blob,
            self.registry.ttl(),
            &self.timeouts,
        )
        .await
    }

    /// Resolve the user row, api credentials and decrypted session blob.
    async fn resolve(
        &self,
        phone: &Phone,
        slot: &PhoneSlot,
    ) -> Result<(User, ApiCredentials, Option<Vec<u8>>), SolanagramError> {
        let user = self
            .store
            .user_by_phone(phone)
            .await?
            .ok_or_else(|| SolanagramError::UnknownUser(phone.to_string()))?;

        let creds = match (user.api_id, user.api_hash.as_ref()) {
            (Some(api_id), Some(hash_ct)) => match self.vault.unwrap_str(hash_ct) {
                Ok(api_hash) => ApiCredentials { api_id, api_hash },
                Err(e) => {
                    // A dead key makes every derived handle suspect.
                    if let Some(cached) = slot.take() {
                        manager::dispose(cached).await;
                    }
                    return Err(e);
                }
            },
            _ => self
                .fallback_creds
                .clone()
                .ok_or(SolanagramError::MissingCredentials)?,
        };

        let blob = match user.telegram_session.as_ref() {
            Some(ct) => match self.vault.unwrap(ct) {
                Ok(plain) => Some(plain),
                Err(e) => {
                    if let Some(cached) = slot.take() {
                        manager::dispose(cached).await;
                    }
                    return Err(e);
                }
            },
            None => None,
        };

        Ok((user, creds, blob))
    }

    /// Clear the stored blob and surface `AuthorizationLost`.
    async fn lose_authorization<T>(
        &self,
        user: &User,
        phone: &Phone,
        cached: CachedClient,
    ) -> Result<T, SolanagramError> {
        self.store.set_session_blob(user.id, None).await?;
        manager::dispose(cached).await;
        info!(phone = %phone, "telegram authorization revoked, session blob cleared");
        Err(SolanagramError::AuthorizationLost)
    }

    /// Send the code, with the single sanctioned eviction + retry on a
    /// transport disconnect.
    async fn request_code_once_retried(
        &self,
        slot: &PhoneSlot,
        phone: &Phone,
        creds: &ApiCredentials,
        blob: Option<&[u8]>,
        mut cached: CachedClient,
    ) -> Result<CachedClient, SolanagramError> {
        match timeout(
            self.timeouts.request,
            cached.client.request_login_code(phone),
        )
        .await
        {
            Ok(Ok(())) => Ok(cached),
            Ok(Err(e)) if e.is_transport_disconnect() => {
                warn!(phone = %phone, error = %e, "send-code hit disconnect, evicting and retrying once");
                manager::dispose(cached).await;
                let mut fresh = self.ensure(slot, phone, creds, blob).await?;
                match timeout(
                    self.timeouts.request,
                    fresh.client.request_login_code(phone),
                )
                .await
                {
                    Ok(Ok(())) => Ok(fresh),
                    Ok(Err(e2)) if e2.is_transport_disconnect() => {
                        manager::dispose(fresh).await;
                        Err(SolanagramError::ConnectUnavailable)
                    }
                    Ok(Err(e2)) => {
                        manager::dispose(fresh).await;
                        Err(Self::map_send_failure(e2))
                    }
                    Err(_) => {
                        manager::dispose(fresh).await;
                        Err(SolanagramError::Timeout {
                            duration: self.timeouts.request,
                        })
                    }
                }
            }
            Ok(Err(e @ SolanagramError::FloodWait { .. })) => {
                // Rate limited, never retried; the handle itself is healthy.
                slot.put(cached);
                Err(e)
            }
            Ok(Err(e)) => {
                manager::dispose(cached).await;
                Err(Self::map_send_failure(e))
            }
            Err(_) => {
                manager::dispose(cached).await;
                Err(SolanagramError::Timeout {
                    duration: self.timeouts.request,
                })
            }
        }
    }

    /// Classified failures pass through; anything generic becomes
    /// `SendCodeFailed` with the reason.
    fn map_send_failure(e: SolanagramError) -> SolanagramError {
        match e {
            SolanagramError::Telegram(reason) => SolanagramError::SendCodeFailed(reason),
            other => other,
        }
    }
}
