// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test doubles for the Solanagram workspace: a scripted Telegram
//! backend, an in-memory store, a recording container runtime, and a
//! harness that assembles the whole orchestrator out of them.

pub mod harness;
pub mod memory_store;
pub mod mock_runtime;
pub mod mock_telegram;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use memory_store::MemoryStore;
pub use mock_runtime::MockRuntime;
pub use mock_telegram::ScriptedTelegram;
