//! Status collectors.
//!
//! # Data Flow
//! ```text
//! SSH poller (ssh.rs, ~60s):
//!     docker inspect over SSH → observations → ServerSnapshot
//!
//! Agent push (push.rs, agents report ~30s):
//!     POST /api/agent/push → flattened statuses → ServerSnapshot
//!
//! Multi-server check (complex.rs, ~60s):
//!     docker inspect on every placement → per-server status → rollup
//!
//! All three:
//!     ServerSnapshot → resources.rs → status::evaluate → StatusStore
//! ```
//!
//! # Design Decisions
//! - No collector evaluates containers itself; they all go through
//!   `resources.rs` and the status engine, so they cannot drift apart
//! - A resource marked as deploying reports `starting:unhealthy` without
//!   touching the engine
//! - Collectors read the shared config once per cycle

pub mod complex;
pub mod compose;
pub mod push;
pub mod resources;
pub mod snapshot;
pub mod ssh;

use std::sync::Arc;

use dashmap::DashSet;
use thiserror::Error;

use crate::config::SharedConfig;
use crate::store::{ResourceKey, StatusRecord, StatusSource, StatusStore};
use crate::status::starting_override;

/// Container label that maps a container to its application or service id.
pub const RESOURCE_LABEL: &str = "fleet.resource";

/// Errors raised while gathering container state from a server.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to run ssh for {server}: {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("remote command on {server} exited with {code:?}: {stderr}")]
    Command {
        server: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("remote command on {server} timed out after {secs} seconds")]
    Timeout { server: String, secs: u64 },

    #[error("invalid docker inspect output from {server}: {source}")]
    Decode {
        server: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Resources currently being deployed.
#[derive(Debug, Clone, Default)]
pub struct DeploymentTracker {
    inner: Arc<DashSet<ResourceKey>>,
}

impl DeploymentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_deploying(&self, key: &ResourceKey) -> bool {
        self.inner.contains(key)
    }

    /// Returns true when the flag changed.
    pub fn set(&self, key: ResourceKey, deploying: bool) -> bool {
        if deploying {
            self.inner.insert(key)
        } else {
            self.inner.remove(&key).is_some()
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// State shared by all collectors and the API.
#[derive(Clone)]
pub struct CollectorContext {
    pub config: SharedConfig,
    pub store: StatusStore,
    pub deployments: DeploymentTracker,
}

impl CollectorContext {
    pub fn new(config: SharedConfig, store: StatusStore) -> Self {
        Self {
            config,
            store,
            deployments: DeploymentTracker::new(),
        }
    }

    /// Mark a resource as deploying (or done). Starting a deployment records
    /// the override immediately instead of waiting for the next cycle.
    pub fn set_deploying(&self, key: ResourceKey, deploying: bool) {
        let changed = self.deployments.set(key.clone(), deploying);
        if deploying {
            let count = self.store.get(&key).map(|r| r.container_count).unwrap_or(0);
            self.store.record(
                key.clone(),
                StatusRecord::new(starting_override(), StatusSource::Deployment, count),
            );
        }
        if changed {
            tracing::info!(resource = %key, deploying, "Deployment flag updated");
        }
    }
}
