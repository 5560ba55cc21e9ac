// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker logic: bundle loading, elaboration semantics, and the logger /
//! listener capture loops. The binary in `main.rs` wires these to a real
//! grammers client; tests drive them with scripted clients.

pub mod config;
pub mod elaborations;
pub mod listener;
pub mod logger;
