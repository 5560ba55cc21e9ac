// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter ports: the seams between the orchestrator and its collaborators.

pub mod runtime;
pub mod store;
pub mod telegram;

pub use runtime::{ContainerRuntime, ContainerSpec, ContainerState, ContainerSummary, ResourceCaps};
pub use store::Store;
pub use telegram::{TelegramClient, TelegramConnector};
