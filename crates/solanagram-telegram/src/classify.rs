// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error classification for the Telegram client library.
//!
//! The rest of the orchestrator never inspects library errors; everything is
//! mapped here into [`SolanagramError`] variants, which fix the recovery
//! policy (transport disconnects are the only retryable class).

use solanagram_core::SolanagramError;

/// Classify an RPC failure by its wire-level error name.
pub fn classify_rpc(name: &str, value: Option<u32>) -> SolanagramError {
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit() || c == '_');
    match base {
        "FLOOD_WAIT" | "FLOOD_PREMIUM_WAIT" => SolanagramError::FloodWait {
            retry_after: u64::from(value.unwrap_or_else(|| trailing_number(name).unwrap_or(60))),
        },
        "PHONE_CODE_INVALID" => SolanagramError::CodeInvalid,
        "PHONE_CODE_EXPIRED" | "PHONE_CODE_EMPTY" => SolanagramError::CodeExpired,
        "SESSION_PASSWORD_NEEDED" => SolanagramError::Needs2FA,
        "PASSWORD_HASH_INVALID" => SolanagramError::PasswordInvalid,
        "AUTH_KEY_UNREGISTERED" | "AUTH_KEY_INVALID" | "SESSION_REVOKED" | "SESSION_EXPIRED"
        | "USER_DEACTIVATED" | "USER_DEACTIVATED_BAN" => SolanagramError::AuthorizationLost,
        "API_ID_INVALID" | "API_ID_PUBLISHED_FLOOD" | "API_HASH_INVALID" => {
            SolanagramError::CredentialsInvalid
        }
        "PHONE_NUMBER_INVALID" | "PHONE_NUMBER_BANNED" => {
            SolanagramError::Validation(format!("telegram rejected the phone number: {name}"))
        }
        _ => SolanagramError::Telegram(name.to_string()),
    }
}

/// Classify a library failure from its rendered message.
///
/// Used where the library's error type does not expose structured RPC fields
/// (connect and send-code paths). The wire error name is always embedded in
/// the message, so matching on the canonical names is stable.
pub fn classify_message(message: &str) -> SolanagramError {
    if let Some(pos) = message.find("FLOOD_WAIT").or_else(|| message.find("FLOOD_PREMIUM_WAIT")) {
        let retry_after = trailing_number(&message[pos..]).unwrap_or(60);
        return SolanagramError::FloodWait {
            retry_after: u64::from(retry_after),
        };
    }

    for (needle, make) in NAME_TABLE {
        if message.contains(needle) {
            return make();
        }
    }

    let lowered = message.to_ascii_lowercase();
    if ["not connected", "disconnected", "connection reset", "broken pipe", "read error",
        "io error", "timed out", "connection refused", "end of file"]
        .iter()
        .any(|needle| lowered.contains(needle))
    {
        return SolanagramError::TransportDisconnected(message.to_string());
    }

    SolanagramError::Telegram(message.to_string())
}

type ErrorCtor = fn() -> SolanagramError;

const NAME_TABLE: &[(&str, ErrorCtor)] = &[
    ("PHONE_CODE_INVALID", || SolanagramError::CodeInvalid),
    ("PHONE_CODE_EXPIRED", || SolanagramError::CodeExpired),
    ("SESSION_PASSWORD_NEEDED", || SolanagramError::Needs2FA),
    ("PASSWORD_HASH_INVALID", || SolanagramError::PasswordInvalid),
    ("AUTH_KEY_UNREGISTERED", || SolanagramError::AuthorizationLost),
    ("AUTH_KEY_INVALID", || SolanagramError::AuthorizationLost),
    ("SESSION_REVOKED", || SolanagramError::AuthorizationLost),
    ("USER_DEACTIVATED", || SolanagramError::AuthorizationLost),
    ("API_ID_INVALID", || SolanagramError::CredentialsInvalid),
    ("API_HASH_INVALID", || SolanagramError::CredentialsInvalid),
];

/// First run of digits after the start of `text`, used to pull the seconds
/// out of names like `FLOOD_WAIT_3600`.
fn trailing_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_wait_by_name_and_value() {
        let err = classify_rpc("FLOOD_WAIT", Some(3600));
        assert!(matches!(err, SolanagramError::FloodWait { retry_after: 3600 }));
    }

    #[test]
    fn flood_wait_with_seconds_in_name() {
        let err = classify_rpc("FLOOD_WAIT_120", None);
        assert!(matches!(err, SolanagramError::FloodWait { retry_after: 120 }));
    }

    #[test]
    fn flood_wait_from_message_text() {
        let err = classify_message("rpc error 420: FLOOD_WAIT_3600 (caused by auth.SendCode)");
        assert!(matches!(err, SolanagramError::FloodWait { retry_after: 3600 }));
    }

    #[test]
    fn auth_key_unregistered_is_authorization_lost() {
        assert!(matches!(
            classify_rpc("AUTH_KEY_UNREGISTERED", None),
            SolanagramError::AuthorizationLost
        ));
        assert!(matches!(
            classify_message("rpc error 401: AUTH_KEY_UNREGISTERED"),
            SolanagramError::AuthorizationLost
        ));
    }

    #[test]
    fn code_errors_map_to_typed_variants() {
        assert!(matches!(
            classify_rpc("PHONE_CODE_INVALID", None),
            SolanagramError::CodeInvalid
        ));
        assert!(matches!(
            classify_rpc("PHONE_CODE_EXPIRED", None),
            SolanagramError::CodeExpired
        ));
        assert!(matches!(
            classify_rpc("SESSION_PASSWORD_NEEDED", None),
            SolanagramError::Needs2FA
        ));
        assert!(matches!(
            classify_rpc("PASSWORD_HASH_INVALID", None),
            SolanagramError::PasswordInvalid
        ));
    }

    #[test]
    fn api_id_invalid_is_credentials_invalid() {
        assert!(matches!(
            classify_rpc("API_ID_INVALID", None),
            SolanagramError::CredentialsInvalid
        ));
    }

    #[test]
    fn transport_phrases_classify_as_disconnect() {
        for msg in [
            "cannot send requests while disconnected",
            "read error: connection reset by peer",
            "io error: broken pipe",
            "client not connected",
        ] {
            assert!(
                classify_message(msg).is_transport_disconnect(),
                "expected transport classification for {msg:?}"
            );
        }
    }

    #[test]
    fn unknown_errors_surface_verbatim() {
        match classify_rpc("CHAT_WRITE_FORBIDDEN", None) {
            SolanagramError::Telegram(name) => assert_eq!(name, "CHAT_WRITE_FORBIDDEN"),
            other => panic!("expected Telegram variant, got {other:?}"),
        }
    }

    #[test]
    fn flood_wait_without_seconds_defaults() {
        let err = classify_message("rpc error: FLOOD_WAIT");
        assert!(matches!(err, SolanagramError::FloodWait { retry_after: 60 }));
    }
}
