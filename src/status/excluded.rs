//! Status of resources whose containers are all excluded from health checks.
//!
//! An all-excluded resource still gets a real, fully computed status. The
//! excluded containers run through the normal aggregator and the result is
//! tagged so consumers skip alerting and auto-heal.

use std::collections::BTreeSet;

use super::aggregate::{aggregate, aggregate_strings, StatusToken};
use super::observation::{max_restart_count, ContainerObservation};
use super::types::{AggregateStatus, StatusBase};

/// Aggregate only the excluded containers and tag the result.
pub fn calculate_excluded(
    observations: &[ContainerObservation],
    excluded: &BTreeSet<String>,
) -> AggregateStatus {
    let subset: Vec<ContainerObservation> = observations
        .iter()
        .filter(|o| o.is_excluded(excluded))
        .cloned()
        .collect();

    if subset.is_empty() {
        return AggregateStatus::unknown_excluded();
    }
    append_excluded_suffix(aggregate(&subset, max_restart_count(&subset)))
}

/// String-based variant for callers holding flattened statuses of excluded
/// containers.
pub fn calculate_excluded_from_strings<I, S>(statuses: I) -> AggregateStatus
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    calculate_excluded_with_restarts(statuses, 0)
}

/// [`calculate_excluded_from_strings`] for callers that also know the
/// observed restart counts.
pub fn calculate_excluded_with_restarts<I, S>(statuses: I, max_restart_count: i64) -> AggregateStatus
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let statuses: Vec<S> = statuses
        .into_iter()
        .filter(|s| StatusToken::parse(s.as_ref()).is_some())
        .collect();
    if statuses.is_empty() {
        return AggregateStatus::unknown_excluded();
    }
    append_excluded_suffix(aggregate_strings(statuses, max_restart_count))
}

/// Tag a computed status as excluded.
///
/// `exited` is left alone: the terminal state has no qualifier to tag.
pub fn append_excluded_suffix(status: AggregateStatus) -> AggregateStatus {
    if status.is_excluded() {
        return status;
    }
    match status.base() {
        StatusBase::Exited => status,
        StatusBase::Degraded | StatusBase::Paused | StatusBase::Starting => {
            AggregateStatus::new(status.base(), None).with_excluded()
        }
        StatusBase::Running => status.with_excluded(),
        StatusBase::Unknown => AggregateStatus::unknown_excluded(),
    }
}
