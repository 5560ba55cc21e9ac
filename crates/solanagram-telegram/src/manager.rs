// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The client manager: the single entry point for "give me a usable client".
//!
//! `ensure_connected` either returns the cached fresh handle or builds a new
//! one under bounded timeouts, with a health probe and classified retries.
//! The caller must already hold the phone's gate.

use std::time::Duration;

use solanagram_core::traits::{TelegramClient, TelegramConnector};
use solanagram_core::types::ApiCredentials;
use solanagram_core::{Phone, SolanagramError};
use tracing::{debug, warn};

use crate::registry::{CachedClient, PhoneSlot};

/// Wall-clock budgets for client operations.
#[derive(Debug, Clone)]
pub struct Timeouts {
    /// Per transport connect.
    pub connect: Duration,
    /// Per Telegram request.
    pub request: Duration,
    /// Per health probe ("who am I").
    pub probe: Duration,
    /// Outer budget for one bridge operation.
    pub outer: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(8),
            request: Duration::from_secs(8),
            probe: Duration::from_secs(5),
            outer: Duration::from_secs(30),
        }
    }
}

/// Connect attempts before giving up with `ConnectUnavailable`.
const MAX_ATTEMPTS: u32 = 3;

/// Pause between failed attempts.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Produce a connected client for `phone`, reusing the cached handle when
/// it is fresh.
///
/// The probe outcome is advisory: a probe that reports "unauthorized" still
/// yields a usable client (send-code is valid on it); only transport
/// failures consume an attempt.
pub async fn ensure_connected(
    connector: &dyn TelegramConnector,
    slot: &PhoneSlot,
    phone: &Phone,
    creds: &ApiCredentials,
    session_blob: Option<&[u8]>,
    ttl: Duration,
    timeouts: &Timeouts,
) -> Result<CachedClient, SolanagramError> {
    // Step 1: a fresh connected handle wins.
    if let Some(cached) = slot.take() {
        if cached.is_fresh(ttl) {
            debug!(phone = %phone, "reusing cached client handle");
            return Ok(cached);
        }
        dispose(cached).await;
    }

    let mut last_transport_error: Option<SolanagramError> = None;

    for attempt in 1..=MAX_ATTEMPTS {
        if attempt > 1 {
            tokio::time::sleep(RETRY_PAUSE).await;
        }

        // Step 2+3: materialize and connect under the connect budget.
        let client = match tokio::time::timeout(
            timeouts.connect,
            connector.connect(creds, session_blob),
        )
        .await
        {
            Ok(Ok(client)) => client,
            Ok(Err(e)) if e.is_transport_disconnect() => {
                warn!(phone = %phone, attempt, error = %e, "connect attempt failed");
                last_transport_error = Some(e);
                continue;
            }
            // Flood waits, bad credentials and protocol errors are surfaced
            // immediately; retrying cannot fix them.
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                warn!(phone = %phone, attempt, "connect attempt timed out");
                last_transport_error = Some(SolanagramError::Timeout {
                    duration: timeouts.connect,
                });
                continue;
            }
        };

        // Step 4: advisory health probe.
        match tokio::time::timeout(timeouts.probe, client.whoami()).await {
            Ok(Ok(me)) => {
                debug!(phone = %phone, account_id = me.id, "client probe ok, authorized");
                return Ok(CachedClient::new(client, true));
            }
            Ok(Err(SolanagramError::AuthorizationLost)) => {
                debug!(phone = %phone, "client connected but unauthorized");
                return Ok(CachedClient::new(client, false));
            }
            Ok(Err(e)) if e.is_transport_disconnect() => {
                warn!(phone = %phone, attempt, error = %e, "probe hit transport failure");
                dispose_client(client).await;
                last_transport_error = Some(e);
                continue;
            }
            Ok(Err(e)) => {
                // Any other probe outcome is advisory; the client is usable.
                debug!(phone = %phone, error = %e, "probe inconclusive, proceeding unauthorized");
                return Ok(CachedClient::new(client, false));
            }
            Err(_) => {
                warn!(phone = %phone, attempt, "probe timed out");
                dispose_client(client).await;
                last_transport_error = Some(SolanagramError::Timeout {
                    duration: timeouts.probe,
                });
                continue;
            }
        }
    }

    if let Some(e) = last_transport_error {
        warn!(phone = %phone, error = %e, "all connect attempts exhausted");
    }
    Err(SolanagramError::ConnectUnavailable)
}

/// Fully disconnect and drop a cached handle.
pub async fn dispose(mut cached: CachedClient) {
    cached.client.disconnect().await;
}

/// Fully disconnect and drop a bare client.
pub async fn dispose_client(mut client: Box<dyn TelegramClient>) {
    client.disconnect().await;
}
