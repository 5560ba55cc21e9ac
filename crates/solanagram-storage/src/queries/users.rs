// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User CRUD operations.

use sqlx::PgPool;

use solanagram_core::types::{NewUser, Phone, User};
use solanagram_core::SolanagramError;

use crate::database::map_conflict;
use crate::models::UserRow;

pub async fn create_user(pool: &PgPool, user: NewUser) -> Result<User, SolanagramError> {
    let row: UserRow = sqlx::query_as(
        "INSERT INTO users (phone, password_hash, api_id, api_hash)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(user.phone.as_str())
    .bind(&user.password_hash)
    .bind(user.api_id)
    .bind(&user.api_hash)
    .fetch_one(pool)
    .await
    .map_err(|e| map_conflict(e, "a user with this phone already exists"))?;

    row.try_into()
}

pub async fn user_by_phone(
    pool: &PgPool,
    phone: &Phone,
) -> Result<Option<User>, SolanagramError> {
    let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE phone = $1")
        .bind(phone.as_str())
        .fetch_optional(pool)
        .await
        .map_err(SolanagramError::storage)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn user_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, SolanagramError> {
    let row: Option<UserRow> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(SolanagramError::storage)?;
    row.map(TryInto::try_into).transpose()
}

pub async fn touch_last_login(pool: &PgPool, user_id: i64) -> Result<(), SolanagramError> {
    sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(SolanagramError::storage)?;
    Ok(())
}

pub async fn set_password_hash(
    pool: &PgPool,
    user_id: i64,
    hash: &str,
) -> Result<(), SolanagramError> {
    let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user_id)
        .bind(hash)
        .execute(pool)
        .await
        .map_err(SolanagramError::storage)?;
    if result.rows_affected() == 0 {
        return Err(SolanagramError::NotFound(format!("user {user_id}")));
    }
    Ok(())
}

/// New api credentials invalidate the old authorization, so the stored
/// session blob is cleared in the same statement.
pub async fn set_api_credentials(
    pool: &PgPool,
    user_id: i64,
    api_id: i32,
    api_hash_ct: Vec<u8>,
) -> Result<(), SolanagramError> {
    let result = sqlx::query(
        "UPDATE users SET api_id = $2, api_hash = $3, telegram_session = NULL WHERE id = $1",
    )
    .bind(user_id)
    .bind(api_id)
    .bind(&api_hash_ct)
    .execute(pool)
    .await
    .map_err(SolanagramError::storage)?;
    if result.rows_affected() == 0 {
        return Err(SolanagramError::NotFound(format!("user {user_id}")));
    }
    Ok(())
}

pub async fn set_session_blob(
    pool: &PgPool,
    user_id: i64,
    blob: Option<Vec<u8>>,
) -> Result<(), SolanagramError> {
    let result = sqlx::query("UPDATE users SET telegram_session = $2 WHERE id = $1")
        .bind(user_id)
        .bind(&blob)
        .execute(pool)
        .await
        .map_err(SolanagramError::storage)?;
    if result.rows_affected() == 0 {
        return Err(SolanagramError::NotFound(format!("user {user_id}")));
    }
    Ok(())
}
