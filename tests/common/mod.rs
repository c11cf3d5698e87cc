//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use fleet_status::collectors::ssh::ContainerSource;
use fleet_status::collectors::{CollectError, CollectorContext, RESOURCE_LABEL};
use fleet_status::config::watcher;
use fleet_status::config::{ApplicationConfig, FleetConfig, ServerConfig, ServiceConfig};
use fleet_status::status::{ContainerObservation, HealthState, LifecycleState};
use fleet_status::StatusStore;

/// Container source serving canned observations per server. Servers without
/// an entry time out.
#[derive(Default)]
pub struct FakeSource {
    servers: Mutex<HashMap<String, Vec<ContainerObservation>>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, server: &str, containers: Vec<ContainerObservation>) {
        self.servers
            .lock()
            .unwrap()
            .insert(server.to_string(), containers);
    }

    pub fn fail(&self, server: &str) {
        self.servers.lock().unwrap().remove(server);
    }
}

impl ContainerSource for FakeSource {
    async fn inspect(
        &self,
        server: &ServerConfig,
        timeout: Duration,
    ) -> Result<Vec<ContainerObservation>, CollectError> {
        let found = self.servers.lock().unwrap().get(&server.name).cloned();
        found.ok_or_else(|| CollectError::Timeout {
            server: server.name.clone(),
            secs: timeout.as_secs(),
        })
    }
}

pub fn server(name: &str) -> ServerConfig {
    ServerConfig {
        name: name.to_string(),
        host: format!("{}.internal", name),
        user: "root".to_string(),
        port: 22,
        identity_file: None,
    }
}

pub fn application(id: &str, server: &str, additional: &[&str]) -> ApplicationConfig {
    ApplicationConfig {
        id: id.to_string(),
        server: server.to_string(),
        additional_servers: additional.iter().map(|s| s.to_string()).collect(),
        compose_path: None,
    }
}

pub fn service(id: &str, server: &str, compose_path: &Path) -> ServiceConfig {
    ServiceConfig {
        id: id.to_string(),
        server: server.to_string(),
        compose_path: compose_path.to_string_lossy().into_owned(),
    }
}

pub fn context(config: FleetConfig) -> CollectorContext {
    CollectorContext::new(watcher::shared(config), StatusStore::new(None))
}

/// A running container of `resource`.
pub fn running(name: &str, resource: &str, health: Option<HealthState>) -> ContainerObservation {
    let container = ContainerObservation::new(name, LifecycleState::Running).with_label(RESOURCE_LABEL, resource);
    match health {
        Some(health) => container.with_health(health),
        None => container,
    }
}

/// A container of `resource` in any state.
pub fn container(name: &str, resource: &str, state: LifecycleState) -> ContainerObservation {
    ContainerObservation::new(name, state).with_label(RESOURCE_LABEL, resource)
}

pub fn write_compose(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("docker-compose.yml");
    std::fs::write(&path, content).unwrap();
    path
}
