// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The worker bundle contract: what a container finds in its mounted
//! credential bundle.
//!
//! A bundle directory holds `config.json`, the opaque `session.session`
//! bytes, and the `api_hash` file. Each container mounts exactly its own
//! bundle, read-only; bundles are owner-only on the host and are wiped when
//! the worker stops.

use serde::{Deserialize, Serialize};

use crate::types::{ElaborationKind, MessageElaboration, WorkerKind};

/// File name of the JSON config inside a bundle.
pub const CONFIG_FILE: &str = "config.json";
/// File name of the opaque session blob inside a bundle.
pub const SESSION_FILE: &str = "session.session";
/// File name of the api hash inside a bundle (alternative to env delivery).
pub const API_HASH_FILE: &str = "api_hash";
/// Environment variable pointing the worker at its bundle directory.
pub const BUNDLE_ENV: &str = "SOLANAGRAM_BUNDLE";
/// Container-side mount point of the bundle.
pub const BUNDLE_MOUNT: &str = "/app/config";

/// Label namespace stamped on every worker container.
pub const LABEL_TYPE: &str = "solanagram.type";
pub const LABEL_USER_ID: &str = "solanagram.user_id";
pub const LABEL_SESSION_ID: &str = "solanagram.session_id";
pub const LABEL_PROJECT: &str = "solanagram.project";

/// `config.json` contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerBundleConfig {
    pub mode: WorkerKind,
    pub user_id: i64,
    pub phone: String,
    pub api_id: i32,
    /// Source chat the worker attaches to.
    pub chat_id: i64,
    pub chat_title: String,
    pub chat_type: String,
    pub database_dsn: String,
    /// Set for logger workers.
    #[serde(default)]
    pub logging_session_id: Option<i64>,
    /// Set for listener/forwarder workers.
    #[serde(default)]
    pub listener_id: Option<i64>,
    /// Ordered elaborations at launch time; the listener refreshes from the
    /// database, which stays the source of truth.
    #[serde(default)]
    pub elaborations: Vec<BundleElaboration>,
}

/// One elaboration as shipped in the bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleElaboration {
    pub id: i64,
    pub kind: ElaborationKind,
    pub name: String,
    pub config: serde_json::Value,
    pub is_active: bool,
    pub priority: i32,
}

impl From<&MessageElaboration> for BundleElaboration {
    fn from(e: &MessageElaboration) -> Self {
        BundleElaboration {
            id: e.id,
            kind: e.kind,
            name: e.name.clone(),
            config: e.config.clone(),
            is_active: e.is_active,
            priority: e.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_config_round_trips_as_json() {
        let config = WorkerBundleConfig {
            mode: WorkerKind::Logger,
            user_id: 1,
            phone: "+391234567890".into(),
            api_id: 25128314,
            chat_id: -1001234567890,
            chat_title: "Solana Signals".into(),
            chat_type: "channel".into(),
            database_dsn: "postgres://solanagram@db/solanagram".into(),
            logging_session_id: Some(7),
            listener_id: None,
            elaborations: vec![],
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: WorkerBundleConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.chat_id, -1001234567890);
        assert_eq!(parsed.logging_session_id, Some(7));
        assert!(matches!(parsed.mode, WorkerKind::Logger));
    }

    #[test]
    fn elaborations_default_to_empty_when_absent() {
        let json = r#"{
            "mode": "listener",
            "user_id": 2,
            "phone": "+391112223334",
            "api_id": 1,
            "chat_id": -100,
            "chat_title": "t",
            "chat_type": "group",
            "database_dsn": "postgres://x"
        }"#;
        let parsed: WorkerBundleConfig = serde_json::from_str(json).unwrap();
        assert!(parsed.elaborations.is_empty());
        assert_eq!(parsed.listener_id, None);
    }
}
