//! Agent push collector.
//!
//! On-host agents post their server's container list with pre-flattened
//! status strings. The report goes through the same resource evaluation as
//! the SSH poller, using the string entry points of the engine.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collectors::resources::apply_server_snapshot;
use crate::collectors::snapshot::{AgentContainer, ServerSnapshot};
use crate::collectors::CollectorContext;
use crate::observability::metrics;
use crate::store::StatusSource;

/// Payload sent by an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    /// Name of the reporting server as configured in `[[servers]]`.
    pub server: String,
    #[serde(default)]
    pub containers: Vec<AgentContainer>,
}

/// Outcome of an accepted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushSummary {
    pub server: String,
    pub containers: usize,
    pub resources_updated: usize,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("unknown server: {0}")]
    UnknownServer(String),
}

/// Apply one agent report.
pub fn handle_report(ctx: &CollectorContext, report: &AgentReport) -> Result<PushSummary, PushError> {
    let started = Instant::now();
    let config = ctx.config.load_full();

    if config.server(&report.server).is_none() {
        metrics::record_agent_report("unknown_server");
        tracing::warn!(server = %report.server, "Rejecting agent report from unknown server");
        return Err(PushError::UnknownServer(report.server.clone()));
    }

    let snapshot = ServerSnapshot::from_reports(&report.containers);
    let resources_updated =
        apply_server_snapshot(ctx, &config, &report.server, &snapshot, StatusSource::Agent);

    metrics::record_agent_report("accepted");
    metrics::record_collection("agent", "success", started.elapsed());
    tracing::debug!(
        server = %report.server,
        containers = report.containers.len(),
        resources_updated,
        "Agent report applied"
    );

    Ok(PushSummary {
        server: report.server.clone(),
        containers: report.containers.len(),
        resources_updated,
    })
}
