// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers, grouped by API area.

pub mod auth;
pub mod listeners;
pub mod logging;
pub mod system;
pub mod telegram;
