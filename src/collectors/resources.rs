//! Turning a server snapshot into stored resource statuses.
//!
//! # Ordering
//! ```text
//! service:
//!     evaluate every sub-resource
//!     → store all sub-resource records as one batch
//!     → read them back
//!     → roll up to the service status
//! ```
//! The rollup never sees a half-updated set of siblings because the batch is
//! written before it is read within the same cycle.

use std::collections::BTreeSet;

use crate::collectors::compose::ComposeFile;
use crate::collectors::snapshot::{Containers, ServerSnapshot};
use crate::collectors::CollectorContext;
use crate::config::{ApplicationConfig, FleetConfig, ServiceConfig};
use crate::status::{
    aggregate_strings, calculate_excluded_from_strings, starting_override, AggregateStatus, StatusBase,
};
use crate::store::{ResourceKey, StatusRecord, StatusSource};

/// Evaluate every single-server resource placed on `server`.
///
/// Returns the number of resources updated. Multi-server applications belong
/// to the complex check and are skipped.
pub fn apply_server_snapshot(
    ctx: &CollectorContext,
    config: &FleetConfig,
    server: &str,
    snapshot: &ServerSnapshot,
    source: StatusSource,
) -> usize {
    let mut updated = 0;

    for app in config
        .applications
        .iter()
        .filter(|a| a.server == server && !a.is_multi_server())
    {
        let key = ResourceKey::application(&app.id);
        let containers = snapshot.containers(&app.id);
        let record = if ctx.deployments.is_deploying(&key) {
            StatusRecord::new(starting_override(), StatusSource::Deployment, containers.len())
        } else {
            StatusRecord::new(evaluate_application(app, &containers), source, containers.len())
        };
        ctx.store.record(key, record);
        updated += 1;
    }

    for service in config.services.iter().filter(|s| s.server == server) {
        evaluate_service(ctx, service, &snapshot.containers(&service.id), source);
        updated += 1;
    }

    updated
}

/// Status of one application placement. Callers apply the deployment
/// override first.
pub fn evaluate_application(app: &ApplicationConfig, containers: &Containers) -> AggregateStatus {
    let compose = ComposeFile::load_optional(app.compose_path.as_deref());
    containers.evaluate(&compose.excluded)
}

/// Evaluate and store a service's sub-resources, then its rollup.
pub fn evaluate_service(
    ctx: &CollectorContext,
    service: &ServiceConfig,
    containers: &Containers,
    source: StatusSource,
) -> AggregateStatus {
    let key = ResourceKey::service(&service.id);
    if ctx.deployments.is_deploying(&key) {
        let status = starting_override();
        ctx.store
            .record(key, StatusRecord::new(status, StatusSource::Deployment, containers.len()));
        return status;
    }

    let compose = ComposeFile::load(std::path::Path::new(&service.compose_path));
    let mut subs: BTreeSet<String> = compose.services.iter().cloned().collect();
    subs.extend(containers.sub_resources());

    let batch: Vec<(ResourceKey, StatusRecord)> = subs
        .iter()
        .map(|sub| {
            let subset = containers.for_sub_resource(sub);
            let status = if compose.excluded.contains(sub) {
                subset.evaluate_excluded(&compose.excluded)
            } else {
                subset.evaluate(&compose.excluded)
            };
            (
                ResourceKey::sub_resource(&service.id, sub),
                StatusRecord::new(status, source, subset.len()),
            )
        })
        .collect();

    let keep: Vec<ResourceKey> = batch.iter().map(|(k, _)| k.clone()).collect();
    ctx.store.record_batch(batch);
    ctx.store.retain_children(&key, &keep);

    let children: Vec<(String, AggregateStatus)> = ctx
        .store
        .children(&key)
        .into_iter()
        .filter_map(|(k, record)| k.sub_resource.map(|sub| (sub, record.status)))
        .collect();
    let status = rollup(&children, &compose.excluded);

    tracing::debug!(
        service = %service.id,
        sub_resources = children.len(),
        status = %status,
        "Service rollup computed"
    );
    ctx.store
        .record(key, StatusRecord::new(status, source, children.len()));
    status
}

/// Service-level status from named sub-resource statuses.
///
/// Non-excluded sub-resources decide; when every sub-resource is excluded
/// their statuses run through the excluded calculator.
pub fn rollup(children: &[(String, AggregateStatus)], excluded: &BTreeSet<String>) -> AggregateStatus {
    let (tagged, counted): (Vec<_>, Vec<_>) = children
        .iter()
        .partition(|(name, _)| excluded.contains(name));

    if !counted.is_empty() {
        return aggregate_strings(counted.iter().map(|(_, s)| s.to_string()), 0);
    }
    if tagged.is_empty() {
        return AggregateStatus::exited();
    }
    calculate_excluded_from_strings(
        tagged
            .iter()
            .filter(|(_, s)| s.base() != StatusBase::Unknown)
            .map(|(_, s)| s.to_string()),
    )
}
