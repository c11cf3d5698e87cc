//! Containers seen on one server during one collection cycle.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::collectors::RESOURCE_LABEL;
use crate::status::evaluate::NamedStatus;
use crate::status::excluded::calculate_excluded_with_restarts;
use crate::status::observation::COMPOSE_SERVICE_LABEL;
use crate::status::{
    calculate_excluded, evaluate_observations, evaluate_statuses, AggregateStatus, ContainerObservation,
};

/// One container as reported by an on-host agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContainer {
    pub name: String,
    /// Flattened status, `base:qualifier` or legacy `base (qualifier)`.
    pub status: String,
    #[serde(default)]
    pub restart_count: Option<u32>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl AgentContainer {
    fn named_status(&self) -> NamedStatus {
        let name = self
            .labels
            .get(COMPOSE_SERVICE_LABEL)
            .cloned()
            .unwrap_or_else(|| self.name.clone());
        NamedStatus {
            name,
            status: self.status.clone(),
            restart_count: self.restart_count,
        }
    }
}

/// Containers of one resource, in whichever shape the collector produced.
#[derive(Debug, Clone)]
pub enum Containers {
    Observed(Vec<ContainerObservation>),
    Reported(Vec<NamedStatus>),
}

impl Default for Containers {
    fn default() -> Self {
        Containers::Observed(Vec::new())
    }
}

impl Containers {
    pub fn len(&self) -> usize {
        match self {
            Containers::Observed(o) => o.len(),
            Containers::Reported(r) => r.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate as one resource under the given exclusions.
    pub fn evaluate(&self, excluded: &BTreeSet<String>) -> AggregateStatus {
        match self {
            Containers::Observed(o) => evaluate_observations(o, excluded),
            Containers::Reported(r) => evaluate_statuses(r, excluded),
        }
    }

    /// Evaluate a resource whose containers are all excluded.
    pub fn evaluate_excluded(&self, excluded: &BTreeSet<String>) -> AggregateStatus {
        match self {
            Containers::Observed(o) => calculate_excluded(o, excluded),
            Containers::Reported(r) => {
                let tagged: Vec<&NamedStatus> = r.iter().filter(|s| excluded.contains(&s.name)).collect();
                let restarts = tagged
                    .iter()
                    .filter_map(|s| s.restart_count)
                    .max()
                    .map(i64::from)
                    .unwrap_or(0);
                calculate_excluded_with_restarts(tagged.iter().map(|s| s.status.as_str()), restarts)
            }
        }
    }

    /// True when there is at least one container and every one is excluded.
    pub fn all_excluded(&self, excluded: &BTreeSet<String>) -> bool {
        match self {
            Containers::Observed(o) => !o.is_empty() && o.iter().all(|c| c.is_excluded(excluded)),
            Containers::Reported(r) => !r.is_empty() && r.iter().all(|s| excluded.contains(&s.name)),
        }
    }

    /// Containers belonging to one sub-resource. A container is keyed by its
    /// Compose service, or by its own name when it carries no service label.
    /// Both shapes use the same key so they split a service identically.
    pub fn for_sub_resource(&self, sub: &str) -> Containers {
        match self {
            Containers::Observed(o) => Containers::Observed(
                o.iter()
                    .filter(|c| c.exclusion_key() == sub)
                    .cloned()
                    .collect(),
            ),
            Containers::Reported(r) => {
                Containers::Reported(r.iter().filter(|s| s.name == sub).cloned().collect())
            }
        }
    }

    /// Sub-resource keys present among the containers.
    pub fn sub_resources(&self) -> BTreeSet<String> {
        match self {
            Containers::Observed(o) => o.iter().map(|c| c.exclusion_key().to_string()).collect(),
            Containers::Reported(r) => r.iter().map(|s| s.name.clone()).collect(),
        }
    }
}

/// A server's containers grouped by the resource they belong to.
#[derive(Debug, Clone, Default)]
pub struct ServerSnapshot {
    by_resource: HashMap<String, Containers>,
}

impl ServerSnapshot {
    /// Group inspected containers by their `fleet.resource` label.
    pub fn from_observations(observations: Vec<ContainerObservation>) -> Self {
        let mut grouped: HashMap<String, Vec<ContainerObservation>> = HashMap::new();
        for observation in observations {
            match observation.label(RESOURCE_LABEL) {
                Some(resource) => grouped.entry(resource.to_string()).or_default().push(observation),
                None => tracing::trace!(container = %observation.name, "Skipping unmanaged container"),
            }
        }
        Self {
            by_resource: grouped
                .into_iter()
                .map(|(id, containers)| (id, Containers::Observed(containers)))
                .collect(),
        }
    }

    /// Group agent-reported containers by their `fleet.resource` label.
    pub fn from_reports(reports: &[AgentContainer]) -> Self {
        let mut grouped: HashMap<String, Vec<NamedStatus>> = HashMap::new();
        for report in reports {
            match report.labels.get(RESOURCE_LABEL) {
                Some(resource) => grouped.entry(resource.clone()).or_default().push(report.named_status()),
                None => tracing::trace!(container = %report.name, "Skipping unmanaged container"),
            }
        }
        Self {
            by_resource: grouped
                .into_iter()
                .map(|(id, containers)| (id, Containers::Reported(containers)))
                .collect(),
        }
    }

    /// Containers of a resource; empty when none were seen.
    pub fn containers(&self, resource_id: &str) -> Containers {
        self.by_resource.get(resource_id).cloned().unwrap_or_default()
    }

    pub fn resource_count(&self) -> usize {
        self.by_resource.len()
    }
}
