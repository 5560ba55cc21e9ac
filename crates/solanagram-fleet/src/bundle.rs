// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential bundle materialization.
//!
//! One directory per worker under the configured bundles root, owner-only
//! permissions, wiped on stop and on failed launches. The orchestrator
//! never reads a bundle back after writing it.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use solanagram_core::bundle::{WorkerBundleConfig, API_HASH_FILE, CONFIG_FILE, SESSION_FILE};
use solanagram_core::SolanagramError;
use tracing::{debug, warn};

fn io_err(what: &str, e: std::io::Error) -> SolanagramError {
    SolanagramError::ContainerLaunchFailed(format!("bundle {what}: {e}"))
}

/// Write a complete bundle directory. Fails if anything cannot be written
/// with restrictive permissions.
pub fn materialize(
    dir: &Path,
    config: &WorkerBundleConfig,
    session: &[u8],
    api_hash: &SecretString,
) -> Result<(), SolanagramError> {
    std::fs::create_dir_all(dir).map_err(|e| io_err("create dir", e))?;
    set_owner_only(dir, 0o700)?;

    let config_json = serde_json::to_vec_pretty(config)
        .map_err(|e| SolanagramError::Internal(format!("bundle config serialization: {e}")))?;
    write_private(&dir.join(CONFIG_FILE), &config_json)?;
    write_private(&dir.join(SESSION_FILE), session)?;
    write_private(
        &dir.join(API_HASH_FILE),
        api_hash.expose_secret().as_bytes(),
    )?;

    debug!(dir = %dir.display(), "worker bundle materialized");
    Ok(())
}

/// Remove a bundle directory. Best-effort and idempotent.
pub fn wipe(dir: &Path) {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!(dir = %dir.display(), "worker bundle wiped"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %dir.display(), error = %e, "failed to wipe worker bundle"),
    }
}

/// The bundle directory for a container name under the configured root.
pub fn bundle_dir(root: &Path, container_name: &str) -> PathBuf {
    root.join(container_name)
}

fn write_private(path: &Path, contents: &[u8]) -> Result<(), SolanagramError> {
    std::fs::write(path, contents).map_err(|e| io_err("write file", e))?;
    set_owner_only(path, 0o600)
}

#[cfg(unix)]
fn set_owner_only(path: &Path, mode: u32) -> Result<(), SolanagramError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .map_err(|e| io_err("set permissions", e))
}

#[cfg(not(unix))]
fn set_owner_only(_path: &Path, _mode: u32) -> Result<(), SolanagramError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solanagram_core::WorkerKind;

    fn test_config() -> WorkerBundleConfig {
        WorkerBundleConfig {
            mode: WorkerKind::Logger,
            user_id: 1,
            phone: "+391234567890".into(),
            api_id: 25128314,
            chat_id: -1001234567890,
            chat_title: "Signals".into(),
            chat_type: "channel".into(),
            database_dsn: "postgres://solanagram@db/solanagram".into(),
            logging_session_id: Some(3),
            listener_id: None,
            elaborations: vec![],
        }
    }

    #[test]
    fn materialize_writes_all_files() {
        let root = tempfile::tempdir().unwrap();
        let dir = bundle_dir(root.path(), "solanagram-log-1-1001234567890");
        let api_hash = SecretString::from("deadbeef".to_string());

        materialize(&dir, &test_config(), b"session-bytes", &api_hash).unwrap();

        assert!(dir.join(CONFIG_FILE).exists());
        assert_eq!(
            std::fs::read(dir.join(SESSION_FILE)).unwrap(),
            b"session-bytes"
        );
        assert_eq!(std::fs::read(dir.join(API_HASH_FILE)).unwrap(), b"deadbeef");

        let parsed: WorkerBundleConfig =
            serde_json::from_slice(&std::fs::read(dir.join(CONFIG_FILE)).unwrap()).unwrap();
        assert_eq!(parsed.logging_session_id, Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn bundle_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let dir = bundle_dir(root.path(), "solanagram-log-1-42");
        materialize(
            &dir,
            &test_config(),
            b"s",
            &SecretString::from("h".to_string()),
        )
        .unwrap();

        let dir_mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
        let file_mode = std::fs::metadata(dir.join(SESSION_FILE))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(file_mode, 0o600);
    }

    #[test]
    fn wipe_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let dir = bundle_dir(root.path(), "solanagram-log-1-7");
        materialize(
            &dir,
            &test_config(),
            b"s",
            &SecretString::from("h".to_string()),
        )
        .unwrap();

        wipe(&dir);
        assert!(!dir.exists());
        wipe(&dir);
    }
}
