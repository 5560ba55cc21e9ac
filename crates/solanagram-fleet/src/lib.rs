// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker fleet control: container naming, credential bundles, the docker
//! CLI runtime adapter, and the supervisor that ties them together.

pub mod bundle;
pub mod docker;
pub mod names;
pub mod supervisor;

pub use docker::DockerCli;
pub use supervisor::{FleetConfig, ReapReport, WorkerSupervisor};
