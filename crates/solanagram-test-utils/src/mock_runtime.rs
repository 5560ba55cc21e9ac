// SPDX-FileCopyrightText: 2026 Solanagram Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording container runtime for supervisor tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use solanagram_core::traits::{ContainerRuntime, ContainerSpec, ContainerState, ContainerSummary};
use solanagram_core::SolanagramError;

#[derive(Default)]
struct RuntimeState {
    next_id: u64,
    containers: HashMap<String, (String, ContainerState)>,
    launched_specs: Vec<ContainerSpec>,
    fail_launches: u32,
    stop_calls: Vec<String>,
    remove_calls: Vec<String>,
}

/// Fake runtime: records every call and lets tests fake crashes.
#[derive(Default)]
pub struct MockRuntime {
    state: Mutex<RuntimeState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RuntimeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Make the next `n` launches fail.
    pub fn fail_next_launches(&self, n: u32) {
        self.lock().fail_launches = n;
    }

    /// Simulate a container disappearing out from under the supervisor.
    pub fn vanish(&self, name: &str) {
        self.lock().containers.remove(name);
    }

    /// Simulate a container exiting with the given code.
    pub fn exit(&self, name: &str, code: i32) {
        if let Some(entry) = self.lock().containers.get_mut(name) {
            entry.1 = ContainerState::Exited { code: Some(code) };
        }
    }

    pub fn running_names(&self) -> Vec<String> {
        self.lock()
            .containers
            .iter()
            .filter(|(_, (_, state))| state.is_running())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn launched_specs(&self) -> Vec<ContainerSpec> {
        self.lock().launched_specs.clone()
    }

    pub fn stop_calls(&self) -> Vec<String> {
        self.lock().stop_calls.clone()
    }

    pub fn remove_calls(&self) -> Vec<String> {
        self.lock().remove_calls.clone()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn launch(&self, spec: &ContainerSpec) -> Result<String, SolanagramError> {
        let mut state = self.lock();
        if state.fail_launches > 0 {
            state.fail_launches -= 1;
            return Err(SolanagramError::ContainerLaunchFailed(
                "image pull refused".to_string(),
            ));
        }
        if state.containers.contains_key(&spec.name) {
            return Err(SolanagramError::ContainerLaunchFailed(format!(
                "container name {} already in use",
                spec.name
            )));
        }
        state.next_id += 1;
        let id = format!("mock-container-{}", state.next_id);
        state
            .containers
            .insert(spec.name.clone(), (id.clone(), ContainerState::Running));
        state.launched_specs.push(spec.clone());
        Ok(id)
    }

    async fn stop(&self, name: &str, _grace: Duration) -> Result<(), SolanagramError> {
        let mut state = self.lock();
        state.stop_calls.push(name.to_string());
        if let Some(entry) = state.containers.get_mut(name) {
            entry.1 = ContainerState::Exited { code: Some(0) };
        }
        Ok(())
    }

    async fn remove(&self, name: &str, _force: bool) -> Result<(), SolanagramError> {
        let mut state = self.lock();
        state.remove_calls.push(name.to_string());
        state.containers.remove(name);
        Ok(())
    }

    async fn inspect(&self, name: &str) -> Result<Option<ContainerState>, SolanagramError> {
        Ok(self
            .lock()
            .containers
            .get(name)
            .map(|(_, state)| state.clone()))
    }

    async fn list_labeled(
        &self,
        _label: &str,
    ) -> Result<Vec<ContainerSummary>, SolanagramError> {
        Ok(self
            .lock()
            .containers
            .iter()
            .map(|(name, (id, state))| ContainerSummary {
                id: id.clone(),
                name: name.clone(),
                state: state.clone(),
            })
            .collect())
    }
}
