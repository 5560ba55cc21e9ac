// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic, docker-compliant container naming.

use solanagram_core::WorkerKind;

/// Chat ids are used in names with the sign stripped (Telegram channel ids
/// are negative).
pub fn sanitize_chat_id(chat_id: i64) -> String {
    chat_id.unsigned_abs().to_string()
}

/// Replace anything outside `[a-zA-Z0-9_-]` with underscores, collapse runs,
/// and trim the ends.
pub fn sanitize_component(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_filler = false;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '-' {
            out.push(c);
            last_was_filler = false;
        } else if !last_was_filler {
            out.push('_');
            last_was_filler = true;
        }
    }
    out.trim_matches('_').to_string()
}

/// The deterministic worker container name:
/// `solanagram-{log|listener|fwd}-{user_id}-{safe_chat_id}`.
pub fn container_name(kind: WorkerKind, user_id: i64, chat_id: i64) -> String {
    format!(
        "solanagram-{}-{}-{}",
        kind.name_token(),
        user_id,
        sanitize_chat_id(chat_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_name_matches_contract() {
        assert_eq!(
            container_name(WorkerKind::Logger, 1, -1001234567890),
            "solanagram-log-1-1001234567890"
        );
    }

    #[test]
    fn listener_and_forwarder_tokens() {
        assert_eq!(
            container_name(WorkerKind::Listener, 42, -100555),
            "solanagram-listener-42-100555"
        );
        assert_eq!(
            container_name(WorkerKind::Forwarder, 42, 555),
            "solanagram-fwd-42-555"
        );
    }

    #[test]
    fn name_is_deterministic() {
        let a = container_name(WorkerKind::Logger, 7, -42);
        let b = container_name(WorkerKind::Logger, 7, -42);
        assert_eq!(a, b);
    }

    #[test]
    fn sanitize_component_strips_unsafe_chars() {
        assert_eq!(sanitize_component("Solana Signals!"), "Solana_Signals");
        assert_eq!(sanitize_component("__weird__ name__"), "weird_name");
        assert_eq!(sanitize_component("ok-name_1"), "ok-name_1");
    }
}
