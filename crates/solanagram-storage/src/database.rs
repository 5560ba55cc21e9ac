// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Postgres connection pool and migration lifecycle.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use tracing::info;

use solanagram_core::SolanagramError;

/// Owns the Postgres pool; cloning is cheap and shares the pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    /// Connect to Postgres and apply pending migrations.
    pub async fn open(database_url: &str) -> Result<Self, SolanagramError> {
        let db = Self::connect(database_url).await?;
        db.run_migrations().await?;
        info!("database opened and migrated");
        Ok(db)
    }

    /// Connect without touching migrations (workers assume an up-to-date
    /// schema; only the orchestrator migrates).
    pub async fn connect(database_url: &str) -> Result<Self, SolanagramError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
            .map_err(SolanagramError::storage)?;
        Ok(Self { pool })
    }

    /// Apply embedded migrations in order. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> Result<(), SolanagramError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(SolanagramError::storage)?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a sqlx error, folding unique-constraint violations into the typed
/// conflict the caller supplies.
pub(crate) fn map_conflict(e: sqlx::Error, conflict: &str) -> SolanagramError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return SolanagramError::AlreadyActive(conflict.to_string());
        }
    }
    SolanagramError::storage(e)
}
