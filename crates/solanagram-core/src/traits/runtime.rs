// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The container runtime port.
//!
//! The supervisor talks to whatever runtime satisfies this narrow contract:
//! create with labels, start, inspect, stop, remove. The shipped adapter
//! drives the docker CLI; tests use a recording fake.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::SolanagramError;

/// Resource caps applied to every worker container.
#[derive(Debug, Clone)]
pub struct ResourceCaps {
    /// Hard memory limit, docker syntax (e.g. "128m").
    pub memory: String,
    /// Memory + swap ceiling (e.g. "256m").
    pub memory_swap: String,
    /// Relative CPU weight (1024 = one full share).
    pub cpu_shares: u32,
    /// Hard CPU ceiling in cores.
    pub cpus: f64,
    /// Maximum processes inside the container.
    pub pids_limit: u32,
}

impl Default for ResourceCaps {
    fn default() -> Self {
        // 128 MiB soft / 256 MiB hard, 0.25 CPU soft / 0.5 hard, <= 50 pids.
        Self {
            memory: "128m".to_string(),
            memory_swap: "256m".to_string(),
            cpu_shares: 256,
            cpus: 0.5,
            pids_limit: 50,
        }
    }
}

/// Everything needed to launch one worker container.
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<(String, String)>,
    pub labels: Vec<(String, String)>,
    /// Host bundle directory mounted read-only at the given container path.
    pub bundle_mount: Option<(PathBuf, String)>,
    pub network: Option<String>,
    pub resources: ResourceCaps,
    /// Docker restart policy name ("unless-stopped").
    pub restart_policy: String,
}

/// Observed state of a container.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerState {
    Created,
    Running,
    Exited { code: Option<i32> },
    Dead,
    Unknown(String),
}

impl ContainerState {
    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }
}

/// Summary row from a label-filtered listing.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub state: ContainerState,
}

/// Narrow port over the container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create and start a container; returns the runtime's container id.
    async fn launch(&self, spec: &ContainerSpec) -> Result<String, SolanagramError>;

    /// Signal the container and wait up to `grace` before the runtime kills it.
    /// Succeeds if the container is already gone.
    async fn stop(&self, name: &str, grace: Duration) -> Result<(), SolanagramError>;

    /// Remove the container. Succeeds if it is already gone.
    async fn remove(&self, name: &str, force: bool) -> Result<(), SolanagramError>;

    /// Inspect by name; `None` when no such container exists.
    async fn inspect(&self, name: &str) -> Result<Option<ContainerState>, SolanagramError>;

    /// List containers carrying the given `key=value` label.
    async fn list_labeled(&self, label: &str) -> Result<Vec<ContainerSummary>, SolanagramError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_caps_match_worker_budget() {
        let caps = ResourceCaps::default();
        assert_eq!(caps.memory, "128m");
        assert_eq!(caps.memory_swap, "256m");
        assert_eq!(caps.cpu_shares, 256);
        assert!((caps.cpus - 0.5).abs() < f64::EPSILON);
        assert_eq!(caps.pids_limit, 50);
    }

    #[test]
    fn running_state_predicate() {
        assert!(ContainerState::Running.is_running());
        assert!(!ContainerState::Exited { code: Some(1) }.is_running());
        assert!(!ContainerState::Created.is_running());
    }
}
