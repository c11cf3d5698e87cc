//! Per-container observations.
//!
//! An observation is built fresh on every collection cycle from either a
//! `docker inspect` object or an agent-reported record, and is dropped once
//! the aggregate has been computed.

use std::collections::{BTreeSet, HashMap};

use serde::Deserialize;

/// Compose label carrying the service name of a container.
pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";

/// Coarse runtime phase of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Running,
    Restarting,
    Exited,
    Dead,
    Removing,
    Paused,
    Created,
    Starting,
}

impl LifecycleState {
    /// Parse a lifecycle token, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "running" => Some(LifecycleState::Running),
            "restarting" => Some(LifecycleState::Restarting),
            "exited" => Some(LifecycleState::Exited),
            "dead" => Some(LifecycleState::Dead),
            "removing" => Some(LifecycleState::Removing),
            "paused" => Some(LifecycleState::Paused),
            "created" => Some(LifecycleState::Created),
            "starting" => Some(LifecycleState::Starting),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Running => "running",
            LifecycleState::Restarting => "restarting",
            LifecycleState::Exited => "exited",
            LifecycleState::Dead => "dead",
            LifecycleState::Removing => "removing",
            LifecycleState::Paused => "paused",
            LifecycleState::Created => "created",
            LifecycleState::Starting => "starting",
        }
    }
}

/// Result of a configured container health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthState {
    Healthy,
    Unhealthy,
    /// Docker reports this during the health check grace period.
    Starting,
}

impl HealthState {
    /// Parse a health token. Anything else (including Docker's `none`) means
    /// no health check is configured.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "healthy" => Some(HealthState::Healthy),
            "unhealthy" => Some(HealthState::Unhealthy),
            "starting" => Some(HealthState::Starting),
            _ => None,
        }
    }
}

/// One snapshot of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerObservation {
    /// Container name, without Docker's leading slash.
    pub name: String,
    /// Compose service the container belongs to, if labelled.
    pub service: Option<String>,
    pub state: LifecycleState,
    /// `None` when no health check is configured.
    pub health: Option<HealthState>,
    pub exit_code: Option<i64>,
    pub restart_count: Option<u32>,
    /// All container labels, used by collectors to map containers to resources.
    pub labels: HashMap<String, String>,
}

impl ContainerObservation {
    pub fn new(name: impl Into<String>, state: LifecycleState) -> Self {
        Self {
            name: name.into(),
            service: None,
            state,
            health: None,
            exit_code: None,
            restart_count: None,
            labels: HashMap::new(),
        }
    }

    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        let service = service.into();
        self.labels
            .insert(COMPOSE_SERVICE_LABEL.to_string(), service.clone());
        self.service = Some(service);
        self
    }

    pub fn with_restart_count(mut self, count: u32) -> Self {
        self.restart_count = Some(count);
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Name used for exclusion lookups: the Compose service when labelled,
    /// the container name otherwise.
    pub fn exclusion_key(&self) -> &str {
        self.service.as_deref().unwrap_or(&self.name)
    }

    pub fn is_excluded(&self, excluded: &BTreeSet<String>) -> bool {
        excluded.contains(self.exclusion_key())
    }

    /// Build an observation from one element of `docker inspect` output.
    ///
    /// Returns `None` when the lifecycle state is missing or unrecognized.
    pub fn from_inspect(record: InspectRecord) -> Option<Self> {
        let raw_state = record.state.status.as_deref().unwrap_or_default();
        let Some(state) = LifecycleState::parse(raw_state) else {
            tracing::warn!(
                container = %record.name,
                state = %raw_state,
                "Ignoring container with unrecognized lifecycle state"
            );
            return None;
        };

        let labels = record.config.and_then(|c| c.labels).unwrap_or_default();
        let service = labels.get(COMPOSE_SERVICE_LABEL).cloned();

        Some(Self {
            name: record.name.trim_start_matches('/').to_string(),
            service,
            state,
            health: record
                .state
                .health
                .and_then(|h| h.status)
                .and_then(|s| HealthState::parse(&s)),
            exit_code: record.state.exit_code,
            restart_count: record.restart_count,
            labels,
        })
    }
}

/// Largest restart count observed across the given containers.
///
/// Collectors pass this as the crash-loop threshold so the aggregator itself
/// never reads runtime state.
pub fn max_restart_count(observations: &[ContainerObservation]) -> i64 {
    observations
        .iter()
        .filter_map(|o| o.restart_count)
        .max()
        .map(i64::from)
        .unwrap_or(0)
}

/// Subset of a `docker inspect` object that the engine reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: InspectState,
    #[serde(default)]
    pub restart_count: Option<u32>,
    #[serde(default)]
    pub config: Option<InspectConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectState {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub health: Option<InspectHealth>,
    #[serde(default)]
    pub exit_code: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectHealth {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectConfig {
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
}

/// Decode `docker inspect` JSON output into observations.
///
/// Containers with unusable state are skipped rather than failing the batch.
pub fn parse_inspect_output(json: &str) -> Result<Vec<ContainerObservation>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Vec<InspectRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .filter_map(ContainerObservation::from_inspect)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSPECT: &str = r#"[
        {
            "Name": "/web-abc123",
            "RestartCount": 2,
            "State": {
                "Status": "Running",
                "ExitCode": 0,
                "Health": { "Status": "healthy", "FailingStreak": 0 }
            },
            "Config": { "Labels": { "com.docker.compose.service": "web", "fleet.resource": "shop" } }
        },
        {
            "Name": "/worker-abc123",
            "State": { "Status": "exited", "ExitCode": 137 },
            "Config": { "Labels": null }
        },
        {
            "Name": "/mystery",
            "State": { "Status": "teleporting" }
        }
    ]"#;

    #[test]
    fn test_parse_inspect_output() {
        let observations = parse_inspect_output(INSPECT).unwrap();
        assert_eq!(observations.len(), 2);

        let web = &observations[0];
        assert_eq!(web.name, "web-abc123");
        assert_eq!(web.state, LifecycleState::Running);
        assert_eq!(web.health, Some(HealthState::Healthy));
        assert_eq!(web.service.as_deref(), Some("web"));
        assert_eq!(web.label("fleet.resource"), Some("shop"));
        assert_eq!(web.restart_count, Some(2));

        let worker = &observations[1];
        assert_eq!(worker.state, LifecycleState::Exited);
        assert_eq!(worker.health, None);
        assert_eq!(worker.exit_code, Some(137));
        assert_eq!(worker.exclusion_key(), "worker-abc123");
    }

    #[test]
    fn test_empty_inspect_output() {
        assert!(parse_inspect_output("  \n").unwrap().is_empty());
        assert!(parse_inspect_output("[]").unwrap().is_empty());
        assert!(parse_inspect_output("not json").is_err());
    }

    #[test]
    fn test_health_none_is_absent() {
        assert_eq!(HealthState::parse("none"), None);
        assert_eq!(HealthState::parse("STARTING"), Some(HealthState::Starting));
    }

    #[test]
    fn test_max_restart_count() {
        let observations = vec![
            ContainerObservation::new("a", LifecycleState::Running).with_restart_count(1),
            ContainerObservation::new("b", LifecycleState::Exited).with_restart_count(7),
            ContainerObservation::new("c", LifecycleState::Exited),
        ];
        assert_eq!(max_restart_count(&observations), 7);
        assert_eq!(max_restart_count(&[]), 0);
    }
}
