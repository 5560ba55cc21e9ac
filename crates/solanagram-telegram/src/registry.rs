// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-local session registry: phone -> live client handle.
//!
//! The registry lives entirely on the bridge thread; handles are `!Send`
//! and never leave it. Per-phone serialization is provided by each slot's
//! async gate: an operation holds the gate for its whole client interaction,
//! so contending callers for the same phone queue up and then observe the
//! freshly cached handle instead of racing a second connect.
//!
//! Restarting the process forfeits every cached handle. The persistent root
//! of authorization is the wrapped session blob in Postgres.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use solanagram_core::traits::TelegramClient;
use solanagram_core::Phone;
use tracing::debug;

/// A cached, possibly authorized client handle.
pub struct CachedClient {
    pub client: Box<dyn TelegramClient>,
    pub created_at: Instant,
    pub last_used: Instant,
    pub authorized: bool,
}

impl CachedClient {
    pub fn new(client: Box<dyn TelegramClient>, authorized: bool) -> Self {
        let now = Instant::now();
        Self {
            client,
            created_at: now,
            last_used: now,
            authorized,
        }
    }

    /// Valid iff younger than `ttl` and the transport still reports connected.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() <= ttl && self.client.is_connected()
    }
}

/// Per-phone slot: the single-flight gate plus the cached handle.
pub struct PhoneSlot {
    /// Serializes every Telegram operation for this phone.
    pub gate: tokio::sync::Mutex<()>,
    cached: RefCell<Option<CachedClient>>,
}

impl PhoneSlot {
    fn new() -> Self {
        Self {
            gate: tokio::sync::Mutex::new(()),
            cached: RefCell::new(None),
        }
    }

    /// Remove and return the cached handle, fresh or not.
    ///
    /// Callers must hold the gate; the handle is either put back via
    /// [`put`](Self::put) or disposed.
    pub fn take(&self) -> Option<CachedClient> {
        self.cached.borrow_mut().take()
    }

    /// Cache a handle, replacing whatever was there.
    pub fn put(&self, mut cached: CachedClient) {
        cached.last_used = Instant::now();
        *self.cached.borrow_mut() = Some(cached);
    }

    /// Whether a handle is currently cached (fresh or not).
    pub fn is_occupied(&self) -> bool {
        self.cached.borrow().is_some()
    }
}

/// The registry proper. One instance per bridge.
pub struct SessionRegistry {
    ttl: Duration,
    slots: RefCell<HashMap<String, Rc<PhoneSlot>>>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: RefCell::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The slot for a phone, created on first use.
    pub fn slot(&self, phone: &Phone) -> Rc<PhoneSlot> {
        self.slots
            .borrow_mut()
            .entry(phone.as_str().to_string())
            .or_insert_with(|| Rc::new(PhoneSlot::new()))
            .clone()
    }

    /// Remove and return every expired handle for disposal.
    ///
    /// Slots whose gate is currently held are skipped; the operation holding
    /// the gate owns the client's fate.
    pub fn sweep_expired(&self) -> Vec<(String, CachedClient)> {
        let mut evicted = Vec::new();
        for (phone, slot) in self.slots.borrow().iter() {
            let Ok(_gate) = slot.gate.try_lock() else {
                continue;
            };
            let stale = {
                let cached = slot.cached.borrow();
                matches!(&*cached, Some(c) if !c.is_fresh(self.ttl))
            };
            if stale {
                if let Some(cached) = slot.take() {
                    debug!(phone = %phone, "evicting expired client handle");
                    evicted.push((phone.clone(), cached));
                }
            }
        }
        evicted
    }

    /// Count of currently cached handles (expired or not).
    pub fn cached_count(&self) -> usize {
        self.slots
            .borrow()
            .values()
            .filter(|slot| slot.is_occupied())
            .count()
    }
}
