//! Resource status storage and persistence.
//!
//! # Responsibilities
//! - Hold the latest aggregate status of every resource
//! - Apply a service's sub-resource results as one batch
//! - Save to / load from a JSON file across restarts
//!
//! # Design Decisions
//! - Last writer wins; collectors compute identical answers for identical
//!   container state, so ordering between collectors does not matter
//! - Records are replaced whole, never mutated in place

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::observability::metrics;
use crate::status::{format_status, AggregateStatus};

/// Kind of resource a status belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Application,
    Service,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Application => "application",
            ResourceKind::Service => "service",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "application" | "applications" => Some(ResourceKind::Application),
            "service" | "services" => Some(ResourceKind::Service),
            _ => None,
        }
    }
}

/// Identifier of a stored status.
///
/// Rendered as `application/<id>`, `service/<id>`, `service/<id>/<sub>` or
/// `application/<id>@<server>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    pub kind: ResourceKind,
    pub id: String,
    /// Compose service of a multi-container service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_resource: Option<String>,
    /// Server of one placement of a multi-server application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

impl ResourceKey {
    pub fn application(id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Application,
            id: id.into(),
            sub_resource: None,
            server: None,
        }
    }

    pub fn application_on(id: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            server: Some(server.into()),
            ..Self::application(id)
        }
    }

    pub fn service(id: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Service,
            id: id.into(),
            sub_resource: None,
            server: None,
        }
    }

    pub fn sub_resource(id: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            sub_resource: Some(sub.into()),
            ..Self::service(id)
        }
    }

    /// True for top-level application and service keys.
    pub fn is_top_level(&self) -> bool {
        self.sub_resource.is_none() && self.server.is_none()
    }

    /// True when `self` is a sub-resource or placement of `parent`.
    pub fn is_child_of(&self, parent: &ResourceKey) -> bool {
        !self.is_top_level() && self.kind == parent.kind && self.id == parent.id
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind.as_str(), self.id)?;
        if let Some(sub) = &self.sub_resource {
            write!(f, "/{}", sub)?;
        }
        if let Some(server) = &self.server {
            write!(f, "@{}", server)?;
        }
        Ok(())
    }
}

/// Which collection path produced a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    Ssh,
    Agent,
    Complex,
    Deployment,
}

impl StatusSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusSource::Ssh => "ssh",
            StatusSource::Agent => "agent",
            StatusSource::Complex => "complex",
            StatusSource::Deployment => "deployment",
        }
    }
}

/// Latest known status of one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: AggregateStatus,
    pub source: StatusSource,
    /// Containers (or sub-resources, for rollups) the status was computed from.
    pub container_count: usize,
    /// Seconds since epoch.
    pub updated_at: u64,
    /// Every container the status was computed from is excluded from health
    /// checks. An all-excluded `exited` carries no tag, so rollups read this.
    #[serde(default)]
    pub all_excluded: bool,
}

impl StatusRecord {
    pub fn new(status: AggregateStatus, source: StatusSource, container_count: usize) -> Self {
        Self {
            status,
            source,
            container_count,
            updated_at: now_secs(),
            all_excluded: false,
        }
    }

    pub fn with_all_excluded(mut self, all_excluded: bool) -> Self {
        self.all_excluded = all_excluded;
        self
    }

    /// Display label for UIs.
    pub fn label(&self) -> String {
        format_status(&self.status.to_string())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    key: ResourceKey,
    record: StatusRecord,
}

/// Thread-safe store of resource statuses.
#[derive(Clone, Default)]
pub struct StatusStore {
    inner: Arc<DashMap<ResourceKey, StatusRecord>>,
    persistence_path: Option<String>,
}

impl StatusStore {
    /// Create a new empty store.
    pub fn new(persistence_path: Option<String>) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            persistence_path,
        }
    }

    /// Load from file if it exists.
    pub fn load_from_file(path: &str) -> std::io::Result<Self> {
        let store = Self::new(Some(path.to_string()));
        if Path::new(path).exists() {
            let reader = BufReader::new(File::open(path)?);
            let entries: Vec<PersistedEntry> = serde_json::from_reader(reader)?;
            for entry in entries {
                store.inner.insert(entry.key, entry.record);
            }
            metrics::record_tracked_resources(store.inner.len());
            tracing::info!(count = store.inner.len(), path = %path, "Loaded resource statuses");
        }
        Ok(store)
    }

    /// Save to the persistence file, if one is configured.
    pub fn save_to_file(&self) -> std::io::Result<()> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };
        let entries: Vec<PersistedEntry> = self
            .snapshot()
            .into_iter()
            .map(|(key, record)| PersistedEntry { key, record })
            .collect();

        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, &entries)?;
        tracing::info!(count = entries.len(), path = %path, "Saved resource statuses");
        Ok(())
    }

    /// Record the status of one resource.
    pub fn record(&self, key: ResourceKey, record: StatusRecord) {
        metrics::record_resource_status(key.kind.as_str(), &record.status);
        let previous = self.inner.insert(key.clone(), record.clone());
        match previous {
            Some(prev) if prev.status != record.status => {
                tracing::info!(
                    resource = %key,
                    from = %prev.status,
                    to = %record.status,
                    source = record.source.as_str(),
                    "Resource status changed"
                );
            }
            None => {
                tracing::debug!(resource = %key, status = %record.status, "Resource status recorded");
            }
            _ => {}
        }
        metrics::record_tracked_resources(self.inner.len());
    }

    /// Record several statuses before any of them is read back.
    pub fn record_batch(&self, batch: Vec<(ResourceKey, StatusRecord)>) {
        for (key, record) in batch {
            self.record(key, record);
        }
    }

    pub fn get(&self, key: &ResourceKey) -> Option<StatusRecord> {
        self.inner.get(key).map(|r| r.value().clone())
    }

    /// Sub-resource or per-server records belonging to `parent`, ordered by key.
    pub fn children(&self, parent: &ResourceKey) -> Vec<(ResourceKey, StatusRecord)> {
        let mut children: Vec<_> = self
            .inner
            .iter()
            .filter(|r| r.key().is_child_of(parent))
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        children.sort_by(|a, b| a.0.cmp(&b.0));
        children
    }

    /// Drop sub-resource or per-server records of `parent` not listed in `keep`.
    pub fn retain_children(&self, parent: &ResourceKey, keep: &[ResourceKey]) {
        self.inner
            .retain(|key, _| !key.is_child_of(parent) || keep.contains(key));
    }

    /// All records ordered by key.
    pub fn snapshot(&self) -> BTreeMap<ResourceKey, StatusRecord> {
        self.inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
