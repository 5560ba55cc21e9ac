// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Short-lived login-code caches, keyed by phone.
//!
//! Two distinct records share the 120 s validity window Telegram gives its
//! codes:
//! - a *pending* entry marks that a code was sent and is awaiting
//!   verification (the wire-level code hash stays inside the live client);
//! - a *cached code* remembers the code value after a successful
//!   verification, enabling re-login within the window without a second
//!   send-code call.
//!
//! At most one of each per phone; a new send replaces the old entry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use solanagram_core::Phone;

/// Telegram login codes are treated as valid for at most this long.
pub const CODE_TTL: Duration = Duration::from_secs(120);

/// A code has been sent and awaits verification.
#[derive(Debug, Clone)]
pub struct PendingCode {
    pub requested_at: Instant,
    pub expires_at: Instant,
    pub attempts: u32,
    /// 2FA password supplied at login time, used if sign-in asks for it.
    pub password: Option<String>,
}

/// A code that already verified once and can be reused within the window.
#[derive(Debug, Clone)]
pub struct CachedCode {
    pub code: String,
    pub expires_at: Instant,
}

/// Both caches; bridge-thread local.
pub struct CodeCaches {
    ttl: Duration,
    pending: RefCell<HashMap<String, PendingCode>>,
    cached: RefCell<HashMap<String, CachedCode>>,
}

impl CodeCaches {
    pub fn new() -> Self {
        Self::with_ttl(CODE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: RefCell::new(HashMap::new()),
            cached: RefCell::new(HashMap::new()),
        }
    }

    /// Record a fresh send-code, replacing any previous pending entry.
    pub fn put_pending(&self, phone: &Phone, password: Option<String>) {
        let now = Instant::now();
        self.pending.borrow_mut().insert(
            phone.as_str().to_string(),
            PendingCode {
                requested_at: now,
                expires_at: now + self.ttl,
                attempts: 0,
                password,
            },
        );
    }

    /// The pending entry for a phone, pruning it if expired.
    pub fn pending(&self, phone: &Phone) -> Option<PendingCode> {
        let mut map = self.pending.borrow_mut();
        match map.get(phone.as_str()) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.clone()),
            Some(_) => {
                map.remove(phone.as_str());
                None
            }
            None => None,
        }
    }

    /// Count one failed verification attempt.
    pub fn bump_attempts(&self, phone: &Phone) {
        if let Some(entry) = self.pending.borrow_mut().get_mut(phone.as_str()) {
            entry.attempts += 1;
        }
    }

    pub fn clear_pending(&self, phone: &Phone) {
        self.pending.borrow_mut().remove(phone.as_str());
    }

    /// Remember a successfully verified code for the reuse window.
    pub fn put_cached_code(&self, phone: &Phone, code: &str) {
        self.cached.borrow_mut().insert(
            phone.as_str().to_string(),
            CachedCode {
                code: code.to_string(),
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// The reusable code for a phone, pruning it if expired.
    pub fn cached_code(&self, phone: &Phone) -> Option<String> {
        let mut map = self.cached.borrow_mut();
        match map.get(phone.as_str()) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.code.clone()),
            Some(_) => {
                map.remove(phone.as_str());
                None
            }
            None => None,
        }
    }

    pub fn clear_cached_code(&self, phone: &Phone) {
        self.cached.borrow_mut().remove(phone.as_str());
    }

    /// Clear everything for a phone (full cleanup on hard errors).
    pub fn clear_all(&self, phone: &Phone) {
        self.clear_pending(phone);
        self.clear_cached_code(phone);
    }
}

impl Default for CodeCaches {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> Phone {
        Phone::parse("+391234567890").unwrap()
    }

    #[test]
    fn pending_round_trip() {
        let caches = CodeCaches::new();
        assert!(caches.pending(&phone()).is_none());

        caches.put_pending(&phone(), Some("2fa-pass".into()));
        let entry = caches.pending(&phone()).unwrap();
        assert_eq!(entry.attempts, 0);
        assert_eq!(entry.password.as_deref(), Some("2fa-pass"));
    }

    #[test]
    fn expired_pending_is_pruned() {
        let caches = CodeCaches::with_ttl(Duration::from_millis(0));
        caches.put_pending(&phone(), None);
        assert!(caches.pending(&phone()).is_none());
    }

    #[test]
    fn attempts_accumulate() {
        let caches = CodeCaches::new();
        caches.put_pending(&phone(), None);
        caches.bump_attempts(&phone());
        caches.bump_attempts(&phone());
        assert_eq!(caches.pending(&phone()).unwrap().attempts, 2);
    }

    #[test]
    fn new_send_replaces_pending() {
        let caches = CodeCaches::new();
        caches.put_pending(&phone(), None);
        caches.bump_attempts(&phone());
        caches.put_pending(&phone(), None);
        assert_eq!(caches.pending(&phone()).unwrap().attempts, 0);
    }

    #[test]
    fn cached_code_round_trip() {
        let caches = CodeCaches::new();
        assert!(caches.cached_code(&phone()).is_none());
        caches.put_cached_code(&phone(), "12345");
        assert_eq!(caches.cached_code(&phone()).as_deref(), Some("12345"));

        caches.clear_cached_code(&phone());
        assert!(caches.cached_code(&phone()).is_none());
    }

    #[test]
    fn expired_cached_code_is_pruned() {
        let caches = CodeCaches::with_ttl(Duration::from_millis(0));
        caches.put_cached_code(&phone(), "12345");
        assert!(caches.cached_code(&phone()).is_none());
    }
}
