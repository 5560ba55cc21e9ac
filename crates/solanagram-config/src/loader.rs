// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment over the process environment.
//!
//! The orchestrator's interface contract is environment keys, so the loader
//! merges compiled defaults with a raw `Env` provider restricted to the
//! recognized variable names (no prefix, exact key match).

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use figment::{
    providers::{Env, Serialized},
    Figment,
};

use crate::model::OrchestratorConfig;

/// The recognized environment keys, lowercased to match the model fields.
const RECOGNIZED_KEYS: &[&str] = &[
    "database_url",
    "redis_host",
    "redis_port",
    "redis_db",
    "telegram_api_id",
    "telegram_api_hash",
    "encryption_key",
    "jwt_secret_key",
    "session_timeout",
    "telegram_connection_timeout",
    "telegram_request_timeout",
    "client_cache_ttl",
    "forwarder_project_name",
    "solanagram_configs_path",
    "docker_host",
    "message_log_retention_days",
    "http_host",
    "http_port",
    "log_level",
    "logger_image",
    "listener_image",
    "forwarder_image",
    "network_name",
];

/// Load configuration from the process environment over compiled defaults.
pub fn load_config() -> Result<OrchestratorConfig, figment::Error> {
    build_figment().extract()
}

/// The Figment used for loading (exposed so `doctor` can report provenance).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(OrchestratorConfig::default()))
        .merge(Env::raw().only(RECOGNIZED_KEYS))
}
