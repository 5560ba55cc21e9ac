// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JWT issuance and validation for the gateway session tokens.

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use solanagram_core::{Phone, SolanagramError};

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Unique token id.
    pub jti: String,
    /// User id.
    pub sub: String,
    /// The user's phone number.
    pub phone: String,
    /// Issued-at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Manages session token creation and validation.
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl JwtManager {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    /// Issue a session token for the given user.
    pub fn issue(&self, user_id: i64, phone: &Phone) -> Result<String, SolanagramError> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id.to_string(),
            phone: phone.to_string(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| SolanagramError::Internal(format!("jwt encode: {e}")))
    }

    /// Validate a token and return its claims.
    pub fn validate(&self, token: &str) -> Result<Claims, SolanagramError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| SolanagramError::Auth(format!("invalid token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(b"test-jwt-secret-key", 3600)
    }

    fn phone() -> Phone {
        Phone::parse("+391234567890").unwrap()
    }

    #[test]
    fn issue_and_validate_round_trip() {
        let jwt = manager();
        let token = jwt.issue(42, &phone()).unwrap();
        let claims = jwt.validate(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.phone, "+391234567890");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(
            manager().validate("not-a-token"),
            Err(SolanagramError::Auth(_))
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = manager().issue(1, &phone()).unwrap();
        let other = JwtManager::new(b"different-secret-key", 3600);
        assert!(other.validate(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let jwt = JwtManager::new(b"test-jwt-secret-key", -120);
        let token = jwt.issue(1, &phone()).unwrap();
        assert!(jwt.validate(&token).is_err());
    }
}
