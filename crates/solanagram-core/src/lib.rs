// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Solanagram session orchestrator.
//!
//! This crate provides the error taxonomy, the shared domain types, and the
//! adapter ports (Telegram client, container runtime, persistence store)
//! implemented by the other workspace crates.

pub mod bundle;
pub mod error;
pub mod traits;
pub mod types;

pub use error::SolanagramError;
pub use traits::{ContainerRuntime, Store, TelegramClient, TelegramConnector};
pub use types::{ChatRef, ContainerStatus, ElaborationKind, Phone, WorkerKind};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_cover_the_surfaced_protocol_failures() {
        for (err, code) in [
            (SolanagramError::FloodWait { retry_after: 5 }, "FLOOD_WAIT"),
            (SolanagramError::AuthorizationLost, "TELEGRAM_SESSION_EXPIRED"),
            (SolanagramError::MissingCredentials, "API_CREDENTIALS_NOT_SET"),
            (SolanagramError::CodeInvalid, "VERIFICATION_CODE_INVALID"),
            (SolanagramError::CodeExpired, "VERIFICATION_EXPIRED"),
            (SolanagramError::Needs2FA, "PASSWORD_2FA_REQUIRED"),
            (SolanagramError::PasswordInvalid, "PASSWORD_2FA_INVALID"),
        ] {
            assert_eq!(err.error_code(), Some(code));
        }
    }

    #[test]
    fn phone_is_reexported_at_crate_root() {
        let phone = Phone::parse("+391234567890").unwrap();
        assert_eq!(phone.to_string(), "+391234567890");
    }
}
