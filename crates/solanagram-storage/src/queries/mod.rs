// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, grouped by aggregate.

pub mod listeners;
pub mod logging;
pub mod users;
