// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram session orchestration: the session registry, the per-phone auth
//! flow, the client manager, and the async bridge that gives the rest of
//! the process a thread-safe handle onto a single owning scheduler.

pub mod bridge;
pub mod classify;
pub mod grammers;
pub mod manager;
pub mod pending;
pub mod registry;
pub mod service;

pub use bridge::{BridgeHandle, TelegramBridge};
pub use grammers::GrammersConnector;
pub use manager::Timeouts;
pub use service::SendCodeOutcome;
