// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Docker CLI adapter for the [`ContainerRuntime`] port.
//!
//! The supervisor's runtime contract is narrow (create with labels, start,
//! inspect, stop, remove), so the adapter shells out to the docker CLI
//! rather than binding an API client. `DOCKER_HOST` is passed through when
//! configured.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use solanagram_core::traits::{ContainerRuntime, ContainerSpec, ContainerState, ContainerSummary};
use solanagram_core::SolanagramError;

/// Runs `docker …` commands against the local daemon (or `DOCKER_HOST`).
pub struct DockerCli {
    docker_host: Option<String>,
}

impl DockerCli {
    pub fn new(docker_host: Option<String>) -> Self {
        Self { docker_host }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("docker");
        if let Some(host) = &self.docker_host {
            cmd.env("DOCKER_HOST", host);
        }
        cmd.stdin(Stdio::null());
        cmd
    }

    async fn run(&self, mut cmd: Command) -> Result<String, DockerFailure> {
        let output = cmd
            .output()
            .await
            .map_err(|e| DockerFailure::Spawn(e.to_string()))?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(DockerFailure::Command(stderr))
        }
    }
}

enum DockerFailure {
    /// The docker binary could not be executed at all.
    Spawn(String),
    /// Docker ran and refused.
    Command(String),
}

impl DockerFailure {
    fn message(&self) -> &str {
        match self {
            DockerFailure::Spawn(m) | DockerFailure::Command(m) => m,
        }
    }

    fn is_not_found(&self) -> bool {
        matches!(self, DockerFailure::Command(m) if m.contains("No such container") || m.contains("No such object"))
    }
}

fn parse_state(status: &str, exit_code: Option<i32>) -> ContainerState {
    match status {
        "running" | "restarting" | "paused" => ContainerState::Running,
        "created" => ContainerState::Created,
        "exited" => ContainerState::Exited { code: exit_code },
        "dead" => ContainerState::Dead,
        other => ContainerState::Unknown(other.to_string()),
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn launch(&self, spec: &ContainerSpec) -> Result<String, SolanagramError> {
        let mut cmd = self.command();
        cmd.args(["run", "--detach", "--name", &spec.name]);
        cmd.args(["--restart", &spec.restart_policy]);

        let caps = &spec.resources;
        cmd.args(["--memory", &caps.memory]);
        cmd.args(["--memory-swap", &caps.memory_swap]);
        cmd.args(["--cpu-shares", &caps.cpu_shares.to_string()]);
        cmd.args(["--cpus", &caps.cpus.to_string()]);
        cmd.args(["--pids-limit", &caps.pids_limit.to_string()]);

        cmd.args(["--security-opt", "no-new-privileges"]);
        cmd.args(["--log-driver", "json-file"]);
        cmd.args(["--log-opt", "max-size=10m", "--log-opt", "max-file=3"]);

        if let Some(network) = &spec.network {
            cmd.args(["--network", network]);
        }
        for (key, value) in &spec.labels {
            cmd.args(["--label", &format!("{key}={value}")]);
        }
        for (key, value) in &spec.env {
            cmd.args(["--env", &format!("{key}={value}")]);
        }
        if let Some((host_dir, mount_point)) = &spec.bundle_mount {
            cmd.args([
                "--volume",
                &format!("{}:{}:ro", host_dir.display(), mount_point),
            ]);
        }
        cmd.arg(&spec.image);

        match self.run(cmd).await {
            Ok(container_id) => {
                debug!(name = %spec.name, id = %container_id, "container launched");
                Ok(container_id)
            }
            Err(e) => Err(SolanagramError::ContainerLaunchFailed(
                e.message().to_string(),
            )),
        }
    }

    async fn stop(&self, name: &str, grace: Duration) -> Result<(), SolanagramError> {
        let mut cmd = self.command();
        cmd.args(["stop", "--time", &grace.as_secs().to_string(), name]);
        match self.run(cmd).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(SolanagramError::Internal(format!(
                "docker stop {name}: {}",
                e.message()
            ))),
        }
    }

    async fn remove(&self, name: &str, force: bool) -> Result<(), SolanagramError> {
        let mut cmd = self.command();
        cmd.arg("rm");
        if force {
            cmd.arg("--force");
        }
        cmd.arg(name);
        match self.run(cmd).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(SolanagramError::Internal(format!(
                "docker rm {name}: {}",
                e.message()
            ))),
        }
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerState>, SolanagramError> {
        let mut cmd = self.command();
        cmd.args([
            "inspect",
            "--format",
            "{{.State.Status}} {{.State.ExitCode}}",
            name,
        ]);
        match self.run(cmd).await {
            Ok(line) => {
                let mut parts = line.split_whitespace();
                let status = parts.next().unwrap_or("unknown");
                let exit_code = parts.next().and_then(|c| c.parse().ok());
                Ok(Some(parse_state(status, exit_code)))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(SolanagramError::Internal(format!(
                "docker inspect {name}: {}",
                e.message()
            ))),
        }
    }

    async fn list_labeled(&self, label: &str) -> Result<Vec<ContainerSummary>, SolanagramError> {
        let mut cmd = self.command();
        cmd.args([
            "ps",
            "--all",
            "--filter",
            &format!("label={label}"),
            "--format",
            "{{.ID}}\t{{.Names}}\t{{.State}}",
        ]);
        let output = self.run(cmd).await.map_err(|e| {
            SolanagramError::Internal(format!("docker ps: {}", e.message()))
        })?;

        let mut out = Vec::new();
        for line in output.lines().filter(|l| !l.is_empty()) {
            let mut fields = line.split('\t');
            let (Some(id), Some(name), Some(state)) =
                (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            out.push(ContainerSummary {
                id: id.to_string(),
                name: name.to_string(),
                state: parse_state(state, None),
            });
        }
        Ok(out)
    }
}
