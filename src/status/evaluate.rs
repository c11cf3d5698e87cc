//! Resource-level evaluation shared by every collector.
//!
//! Collectors never branch on exclusion themselves; they hand their
//! observations to these functions so the SSH poller, the agent push job and
//! the multi-server check reach the same answer for the same containers.

use std::collections::BTreeSet;

use super::aggregate::{aggregate, aggregate_strings};
use super::excluded::{calculate_excluded, calculate_excluded_with_restarts};
use super::observation::{max_restart_count, ContainerObservation};
use super::types::{AggregateStatus, Qualifier, StatusBase};

/// Status reported while a resource is mid-deployment, evaluated before the
/// engine is invoked.
pub const fn starting_override() -> AggregateStatus {
    AggregateStatus::new(StatusBase::Starting, Some(Qualifier::Unhealthy))
}

/// A container reported as a flattened status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStatus {
    /// Compose service name when known, container name otherwise.
    pub name: String,
    pub status: String,
    pub restart_count: Option<u32>,
}

impl NamedStatus {
    pub fn new(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            restart_count: None,
        }
    }

    pub fn with_restart_count(mut self, count: u32) -> Self {
        self.restart_count = Some(count);
        self
    }
}

fn max_reported_restarts(statuses: &[&NamedStatus]) -> i64 {
    statuses
        .iter()
        .filter_map(|s| s.restart_count)
        .max()
        .map(i64::from)
        .unwrap_or(0)
}

/// Evaluate full observations of one resource.
///
/// Non-excluded containers decide the status. When every container is
/// excluded the excluded calculator runs instead of skipping the update.
pub fn evaluate_observations(
    observations: &[ContainerObservation],
    excluded: &BTreeSet<String>,
) -> AggregateStatus {
    let (tagged, counted): (Vec<_>, Vec<_>) = observations
        .iter()
        .cloned()
        .partition(|o| o.is_excluded(excluded));

    if !counted.is_empty() {
        return aggregate(&counted, max_restart_count(&counted));
    }
    if !tagged.is_empty() {
        return calculate_excluded(&tagged, excluded);
    }
    AggregateStatus::exited()
}

/// Evaluate flattened statuses of one resource with the same policy as
/// [`evaluate_observations`].
pub fn evaluate_statuses(statuses: &[NamedStatus], excluded: &BTreeSet<String>) -> AggregateStatus {
    let (tagged, counted): (Vec<&NamedStatus>, Vec<&NamedStatus>) = statuses
        .iter()
        .partition(|s| excluded.contains(&s.name));

    if !counted.is_empty() {
        return aggregate_strings(
            counted.iter().map(|s| s.status.as_str()),
            max_reported_restarts(&counted),
        );
    }
    if !tagged.is_empty() {
        return calculate_excluded_with_restarts(
            tagged.iter().map(|s| s.status.as_str()),
            max_reported_restarts(&tagged),
        );
    }
    AggregateStatus::exited()
}
