// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model for the orchestrator process.
//!
//! Fields map one-to-one onto the recognized environment keys (lowercased).
//! Everything has a compiled default except the secrets, which are validated
//! at startup.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Orchestrator configuration, loaded from the environment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Postgres DSN. Required.
    #[serde(default)]
    pub database_url: String,

    /// Optional external cache host. The orchestrator runs fully without it;
    /// the pending-code caches are process-local either way.
    #[serde(default)]
    pub redis_host: Option<String>,
    #[serde(default)]
    pub redis_port: Option<u16>,
    #[serde(default)]
    pub redis_db: Option<u32>,

    /// Platform-level fallback Telegram api credentials (per-user credentials
    /// always win when present).
    #[serde(default)]
    pub telegram_api_id: Option<i32>,
    #[serde(default)]
    pub telegram_api_hash: Option<String>,

    /// Base64-encoded 32-byte key for the credential store. Required.
    #[serde(default)]
    pub encryption_key: String,

    /// HMAC secret for gateway JWTs. Required.
    #[serde(default)]
    pub jwt_secret_key: String,

    /// Gateway JWT lifetime in seconds.
    #[serde(default = "default_session_timeout")]
    pub session_timeout: u64,

    /// Telegram connect timeout in seconds.
    #[serde(default = "default_telegram_timeout")]
    pub telegram_connection_timeout: u64,

    /// Telegram per-request timeout in seconds.
    #[serde(default = "default_telegram_timeout")]
    pub telegram_request_timeout: u64,

    /// TTL of cached client handles in seconds.
    #[serde(default = "default_client_cache_ttl")]
    pub client_cache_ttl: u64,

    /// Compose-style project name stamped on worker containers.
    #[serde(default = "default_project_name")]
    pub forwarder_project_name: String,

    /// Host directory holding per-worker credential bundles.
    #[serde(default = "default_configs_path")]
    pub solanagram_configs_path: String,

    /// Passed through to the container runtime when set.
    #[serde(default)]
    pub docker_host: Option<String>,

    /// Optional retention for message_logs, in days. Unset = keep forever.
    #[serde(default)]
    pub message_log_retention_days: Option<u32>,

    /// Gateway bind address.
    #[serde(default = "default_http_host")]
    pub http_host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Worker images.
    #[serde(default = "default_logger_image")]
    pub logger_image: String,
    #[serde(default = "default_listener_image")]
    pub listener_image: String,
    #[serde(default = "default_forwarder_image")]
    pub forwarder_image: String,

    /// Bridge network joined by every worker container.
    #[serde(default = "default_network_name")]
    pub network_name: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            redis_host: None,
            redis_port: None,
            redis_db: None,
            telegram_api_id: None,
            telegram_api_hash: None,
            encryption_key: String::new(),
            jwt_secret_key: String::new(),
            session_timeout: default_session_timeout(),
            telegram_connection_timeout: default_telegram_timeout(),
            telegram_request_timeout: default_telegram_timeout(),
            client_cache_ttl: default_client_cache_ttl(),
            forwarder_project_name: default_project_name(),
            solanagram_configs_path: default_configs_path(),
            docker_host: None,
            message_log_retention_days: None,
            http_host: default_http_host(),
            http_port: default_http_port(),
            log_level: default_log_level(),
            logger_image: default_logger_image(),
            listener_image: default_listener_image(),
            forwarder_image: default_forwarder_image(),
            network_name: default_network_name(),
        }
    }
}

impl OrchestratorConfig {
    /// Telegram connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram_connection_timeout)
    }

    /// Telegram per-request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.telegram_request_timeout)
    }

    /// Client handle TTL as a [`Duration`].
    pub fn client_ttl(&self) -> Duration {
        Duration::from_secs(self.client_cache_ttl)
    }

    /// Gateway JWT lifetime as a [`Duration`].
    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_timeout)
    }
}

fn default_session_timeout() -> u64 {
    86_400
}

fn default_telegram_timeout() -> u64 {
    8
}

fn default_client_cache_ttl() -> u64 {
    300
}

fn default_project_name() -> String {
    "solanagram".to_string()
}

fn default_configs_path() -> String {
    "/var/lib/solanagram/configs".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_logger_image() -> String {
    "solanagram-logger:latest".to_string()
}

fn default_listener_image() -> String {
    "solanagram-listener:latest".to_string()
}

fn default_forwarder_image() -> String {
    "solanagram-forwarder:latest".to_string()
}

fn default_network_name() -> String {
    "solanagram-net".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_timeouts() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.telegram_connection_timeout, 8);
        assert_eq!(config.telegram_request_timeout, 8);
        assert_eq!(config.client_cache_ttl, 300);
        assert_eq!(config.client_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn defaults_use_solanagram_naming() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.forwarder_project_name, "solanagram");
        assert_eq!(config.network_name, "solanagram-net");
        assert_eq!(config.logger_image, "solanagram-logger:latest");
    }

    #[test]
    fn secrets_default_empty_and_redis_optional() {
        let config = OrchestratorConfig::default();
        assert!(config.database_url.is_empty());
        assert!(config.encryption_key.is_empty());
        assert!(config.redis_host.is_none());
    }
}
