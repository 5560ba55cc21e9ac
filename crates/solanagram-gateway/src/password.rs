// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Platform password hashing with argon2id.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use solanagram_core::SolanagramError;

/// Hash a password with argon2id and a random salt.
pub fn hash_password(password: &str) -> Result<String, SolanagramError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| SolanagramError::Internal(format!("password hashing: {e}")))
}

/// Verify a password against a stored argon2id hash.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, SolanagramError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| SolanagramError::Internal(format!("stored hash unreadable: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("la-mia-password").unwrap();
        assert!(verify_password("la-mia-password", &hash).unwrap());
        assert!(!verify_password("sbagliata", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let h1 = hash_password("same").unwrap();
        let h2 = hash_password("same").unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn corrupted_stored_hash_errors() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }
}
