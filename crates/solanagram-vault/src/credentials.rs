// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The credential store: versioned wrapping of secrets at rest.
//!
//! Wrapped values use the envelope `[version | nonce(12) | ciphertext+tag]`.
//! The version byte exists so a future key rotation can introduce a second
//! format without guessing; today only [`FORMAT_V1`] is produced or accepted.
//!
//! Plaintext only ever exists in memory. Nothing in this module logs secret
//! material, and the process key is zeroized on drop.

use secrecy::{ExposeSecret, SecretString};
use solanagram_core::SolanagramError;
use zeroize::Zeroizing;

use crate::crypto;

/// Envelope version produced by [`CredentialStore::wrap`].
pub const FORMAT_V1: u8 = 0x01;

/// Process-scoped symmetric credential store.
///
/// Debug output intentionally omits the key.
#[derive(Clone)]
pub struct CredentialStore {
    key: std::sync::Arc<Zeroizing<[u8; 32]>>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl CredentialStore {
    /// Build a store from a raw 32-byte key (decoded from `ENCRYPTION_KEY`).
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            key: std::sync::Arc::new(Zeroizing::new(key)),
        }
    }

    /// Encrypt a secret for storage.
    pub fn wrap(&self, plaintext: &[u8]) -> Result<Vec<u8>, SolanagramError> {
        let (ciphertext, nonce) = crypto::seal(&self.key, plaintext)?;
        let mut envelope = Vec::with_capacity(1 + nonce.len() + ciphertext.len());
        envelope.push(FORMAT_V1);
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    /// Decrypt a stored envelope back into plaintext bytes.
    ///
    /// Fails with [`SolanagramError::CredentialDecrypt`] on an unknown
    /// version, a truncated envelope, a wrong key, or tampered ciphertext.
    pub fn unwrap(&self, envelope: &[u8]) -> Result<Vec<u8>, SolanagramError> {
        let (&version, rest) = envelope
            .split_first()
            .ok_or(SolanagramError::CredentialDecrypt)?;
        if version != FORMAT_V1 || rest.len() < 12 {
            return Err(SolanagramError::CredentialDecrypt);
        }
        let (nonce_bytes, ciphertext) = rest.split_at(12);
        let nonce: [u8; 12] = nonce_bytes
            .try_into()
            .map_err(|_| SolanagramError::CredentialDecrypt)?;
        crypto::open(&self.key, &nonce, ciphertext)
    }

    /// Wrap a UTF-8 secret string (api hashes).
    pub fn wrap_str(&self, secret: &SecretString) -> Result<Vec<u8>, SolanagramError> {
        self.wrap(secret.expose_secret().as_bytes())
    }

    /// Unwrap into a [`SecretString`]; fails if the plaintext is not UTF-8.
    pub fn unwrap_str(&self, envelope: &[u8]) -> Result<SecretString, SolanagramError> {
        let plaintext = self.unwrap(envelope)?;
        let value =
            String::from_utf8(plaintext).map_err(|_| SolanagramError::CredentialDecrypt)?;
        Ok(SecretString::from(value))
    }
}
