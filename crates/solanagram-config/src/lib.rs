// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment-driven configuration for the Solanagram orchestrator.

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::load_config;
pub use model::OrchestratorConfig;
pub use validation::{decode_encryption_key, validate, validate_strict, Diagnostic, Severity};
