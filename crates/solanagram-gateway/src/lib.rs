// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the Solanagram orchestrator: JSON endpoints for auth,
//! Telegram browsing, and the logging/listener pipelines, with JWT bearer
//! sessions and Italian-localized error envelopes.

pub mod error;
pub mod handlers;
pub mod jwt;
pub mod messages;
pub mod metrics;
pub mod password;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use jwt::JwtManager;
pub use metrics::LoginMetrics;
pub use server::{build_router, serve};
pub use state::{AppState, AuthUser};
