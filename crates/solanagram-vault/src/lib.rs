// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store for the Solanagram orchestrator.
//!
//! Per-user Telegram api hashes and session blobs are wrapped with
//! AES-256-GCM under a process-scoped key from the environment; only
//! ciphertext ever reaches Postgres.

pub mod credentials;
pub mod crypto;

pub use credentials::{CredentialStore, FORMAT_V1};
