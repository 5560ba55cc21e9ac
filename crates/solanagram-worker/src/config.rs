// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bundle loading: the worker side of the container contract.

use std::path::Path;

use secrecy::SecretString;
use solanagram_core::bundle::{WorkerBundleConfig, API_HASH_FILE, CONFIG_FILE, SESSION_FILE};
use solanagram_core::SolanagramError;

/// Everything a worker reads at startup.
pub struct LoadedBundle {
    pub config: WorkerBundleConfig,
    pub session: Vec<u8>,
    pub api_hash: SecretString,
}

/// Read `config.json`, `session.session` and the api hash from the bundle
/// directory. The api hash may alternatively arrive via the `API_HASH`
/// environment variable.
pub fn load(dir: &Path) -> Result<LoadedBundle, SolanagramError> {
    let config_bytes = std::fs::read(dir.join(CONFIG_FILE))
        .map_err(|e| SolanagramError::Config(format!("bundle config.json: {e}")))?;
    let config: WorkerBundleConfig = serde_json::from_slice(&config_bytes)
        .map_err(|e| SolanagramError::Config(format!("bundle config.json: {e}")))?;

    let session = std::fs::read(dir.join(SESSION_FILE))
        .map_err(|e| SolanagramError::Config(format!("bundle session.session: {e}")))?;

    let api_hash = match std::env::var("API_HASH") {
        Ok(value) if !value.is_empty() => SecretString::from(value),
        _ => {
            let bytes = std::fs::read(dir.join(API_HASH_FILE))
                .map_err(|e| SolanagramError::Config(format!("bundle api_hash: {e}")))?;
            let value = String::from_utf8(bytes)
                .map_err(|_| SolanagramError::Config("bundle api_hash is not UTF-8".into()))?;
            SecretString::from(value.trim().to_string())
        }
    };

    Ok(LoadedBundle {
        config,
        session,
        api_hash,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use solanagram_core::types::WorkerKind;

    fn write_bundle(dir: &Path) {
        let config = serde_json::json!({
            "mode": "logger",
            "user_id": 1,
            "phone": "+391234567890",
            "api_id": 25128314,
            "chat_id": -1001234567890i64,
            "chat_title": "Signals",
            "chat_type": "channel",
            "database_dsn": "postgres://solanagram@db/solanagram",
            "logging_session_id": 3
        });
        std::fs::write(dir.join(CONFIG_FILE), config.to_string()).unwrap();
        std::fs::write(dir.join(SESSION_FILE), b"session-bytes").unwrap();
        std::fs::write(dir.join(API_HASH_FILE), b"deadbeef\n").unwrap();
    }

    #[test]
    fn load_reads_all_parts() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path());

        let bundle = load(dir.path()).unwrap();
        assert!(matches!(bundle.config.mode, WorkerKind::Logger));
        assert_eq!(bundle.config.logging_session_id, Some(3));
        assert_eq!(bundle.session, b"session-bytes");
        assert_eq!(bundle.api_hash.expose_secret(), "deadbeef");
    }

    #[test]
    fn missing_config_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(dir.path()),
            Err(SolanagramError::Config(_))
        ));
    }
}
