// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Solanagram orchestrator.

use thiserror::Error;

/// The primary error type used across the orchestrator, the worker fleet
/// and all adapter ports.
///
/// Variants are grouped by the recovery policy they imply: only
/// [`TransportDisconnected`](SolanagramError::TransportDisconnected) may ever
/// trigger an automatic retry (exactly one, after evicting the client).
/// Everything else is surfaced to the caller.
#[derive(Debug, Error)]
pub enum SolanagramError {
    /// Configuration errors (missing env keys, malformed values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Request validation errors (malformed phone, missing fields).
    #[error("validation error: {0}")]
    Validation(String),

    /// Platform authentication failures (bad password, bad or expired JWT).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The phone number is not registered on the platform.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// The user has no stored Telegram API credentials.
    #[error("api credentials not set for this user")]
    MissingCredentials,

    /// Telegram rejected the stored api_id / api_hash pair.
    #[error("telegram api credentials rejected")]
    CredentialsInvalid,

    /// Stored ciphertext failed authentication on decrypt (wrong key or tamper).
    #[error("credential decryption failed")]
    CredentialDecrypt,

    /// The stored Telegram authorization has been revoked server-side.
    #[error("telegram authorization lost")]
    AuthorizationLost,

    /// Sign-in requires the account's 2FA password.
    #[error("two-factor password required")]
    Needs2FA,

    /// The supplied 2FA password was rejected.
    #[error("two-factor password invalid")]
    PasswordInvalid,

    /// The supplied login code was rejected.
    #[error("login code invalid")]
    CodeInvalid,

    /// No pending login code exists, or it expired.
    #[error("login code expired")]
    CodeExpired,

    /// Telegram-imposed cool-down; do not retry before `retry_after` seconds.
    #[error("flood wait: retry after {retry_after}s")]
    FloodWait { retry_after: u64 },

    /// The transport dropped mid-operation ("cannot send while disconnected").
    #[error("telegram transport disconnected: {0}")]
    TransportDisconnected(String),

    /// All connect attempts exhausted; no usable client could be produced.
    #[error("telegram connection unavailable")]
    ConnectUnavailable,

    /// send-code failed for a reason outside the classified set.
    #[error("send code failed: {0}")]
    SendCodeFailed(String),

    /// The async bridge queue hit its high-water mark.
    #[error("system busy: too many pending telegram operations")]
    SystemBusy,

    /// A conflicting active worker already exists for this (user, chat).
    #[error("already active: {0}")]
    AlreadyActive(String),

    /// The referenced entity does not exist (or is not owned by the caller).
    #[error("not found: {0}")]
    NotFound(String),

    /// The container runtime refused or failed to launch the worker.
    #[error("container launch failed: {0}")]
    ContainerLaunchFailed(String),

    /// A worker row claims `running` but its container is gone.
    #[error("container vanished: {0}")]
    ContainerVanished(String),

    /// A bounded operation exceeded its wall-clock budget.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Persistence layer errors (connection, query, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Any other Telegram protocol error, surfaced verbatim and never retried.
    #[error("telegram error: {0}")]
    Telegram(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SolanagramError {
    /// Wrap an arbitrary error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SolanagramError::Storage {
            source: Box::new(source),
        }
    }

    /// True for the single error class the client manager is allowed to
    /// recover from locally (evict + one retry).
    pub fn is_transport_disconnect(&self) -> bool {
        matches!(self, SolanagramError::TransportDisconnected(_))
    }

    /// Machine-readable code carried in HTTP error envelopes, where one exists.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            SolanagramError::FloodWait { .. } => Some("FLOOD_WAIT"),
            SolanagramError::AuthorizationLost => Some("TELEGRAM_SESSION_EXPIRED"),
            SolanagramError::MissingCredentials => Some("API_CREDENTIALS_NOT_SET"),
            SolanagramError::CredentialsInvalid => Some("API_CREDENTIALS_INVALID"),
            SolanagramError::Needs2FA => Some("PASSWORD_2FA_REQUIRED"),
            SolanagramError::PasswordInvalid => Some("PASSWORD_2FA_INVALID"),
            SolanagramError::CodeInvalid => Some("VERIFICATION_CODE_INVALID"),
            SolanagramError::CodeExpired => Some("VERIFICATION_EXPIRED"),
            SolanagramError::AlreadyActive(_) => Some("ALREADY_ACTIVE"),
            SolanagramError::SystemBusy => Some("SYSTEM_BUSY"),
            _ => None,
        }
    }
}
