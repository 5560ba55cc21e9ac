// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Postgres persistence for the Solanagram orchestrator.
//!
//! Uniqueness invariants live in the schema (partial unique indexes, plain
//! unique constraints); the query layer translates constraint violations
//! into typed conflicts and keeps idempotent inserts silent.

pub mod database;
pub mod models;
pub mod queries;
pub mod store;

pub use database::Database;
pub use store::PgStore;
