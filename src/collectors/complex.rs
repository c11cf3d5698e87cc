//! Multi-server application check.
//!
//! # Responsibilities
//! - Inspect every server an application is placed on
//! - Store a status per placement under `application/<id>@<server>`
//! - Roll the placements up into the application status
//!
//! # Design Decisions
//! - Each server is inspected at most once per cycle, however many
//!   applications share it
//! - An unreachable server keeps its previous placement status; the rollup
//!   still runs over what is stored

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time;
use uuid::Uuid;

use crate::collectors::compose::ComposeFile;
use crate::collectors::resources::rollup;
use crate::collectors::snapshot::ServerSnapshot;
use crate::collectors::ssh::ContainerSource;
use crate::collectors::CollectorContext;
use crate::config::{ApplicationConfig, FleetConfig};
use crate::observability::metrics;
use crate::status::{starting_override, AggregateStatus};
use crate::store::{ResourceKey, StatusRecord, StatusSource};

/// Periodic check of applications with `additional_servers`.
pub struct ComplexChecker<S> {
    ctx: CollectorContext,
    source: Arc<S>,
}

impl<S: ContainerSource> ComplexChecker<S> {
    pub fn new(ctx: CollectorContext, source: Arc<S>) -> Self {
        Self { ctx, source }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let collectors = self.ctx.config.load().collectors.clone();
        if !collectors.complex_enabled {
            tracing::info!("Multi-server check disabled");
            return;
        }

        tracing::info!(interval = collectors.complex_interval_secs, "Multi-server check starting");
        let mut ticker = time::interval(Duration::from_secs(collectors.complex_interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Multi-server check received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Check every multi-server application once. Returns the number of
    /// applications updated.
    pub async fn check_once(&self) -> usize {
        let config = self.ctx.config.load_full();
        let apps: Vec<&ApplicationConfig> =
            config.applications.iter().filter(|a| a.is_multi_server()).collect();
        if apps.is_empty() {
            return 0;
        }

        let started = Instant::now();
        let cycle = Uuid::new_v4();
        let wanted: BTreeSet<&str> = apps
            .iter()
            .filter(|a| !self.ctx.deployments.is_deploying(&ResourceKey::application(&a.id)))
            .flat_map(|a| a.all_servers())
            .collect();
        let snapshots = self.fetch(&config, &wanted).await;

        for app in &apps {
            self.check_application(app, &snapshots);
        }

        let outcome = if snapshots.len() == wanted.len() { "success" } else { "partial" };
        metrics::record_collection("complex", outcome, started.elapsed());
        tracing::debug!(
            cycle = %cycle,
            applications = apps.len(),
            servers = wanted.len(),
            reachable = snapshots.len(),
            "Multi-server check finished"
        );
        apps.len()
    }

    /// Inspect the given servers concurrently. Unreachable servers are
    /// missing from the result.
    async fn fetch(&self, config: &FleetConfig, servers: &BTreeSet<&str>) -> HashMap<String, ServerSnapshot> {
        let timeout = Duration::from_secs(config.collectors.ssh_timeout_secs);
        let mut tasks = JoinSet::new();
        for name in servers {
            let Some(server) = config.server(name).cloned() else {
                tracing::warn!(server = %name, "Application placed on unknown server");
                continue;
            };
            let source = self.source.clone();
            tasks.spawn(async move {
                let result = source.inspect(&server, timeout).await;
                (server.name, result)
            });
        }

        let mut snapshots = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((server, Ok(observations))) => {
                    snapshots.insert(server, ServerSnapshot::from_observations(observations));
                }
                Ok((server, Err(e))) => {
                    tracing::warn!(server = %server, error = %e, "Failed to collect container state");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Multi-server collection task panicked");
                }
            }
        }
        snapshots
    }

    fn check_application(&self, app: &ApplicationConfig, snapshots: &HashMap<String, ServerSnapshot>) {
        let key = ResourceKey::application(&app.id);
        if self.ctx.deployments.is_deploying(&key) {
            let count = self.ctx.store.get(&key).map(|r| r.container_count).unwrap_or(0);
            self.ctx
                .store
                .record(key, StatusRecord::new(starting_override(), StatusSource::Deployment, count));
            return;
        }

        let compose = ComposeFile::load_optional(app.compose_path.as_deref());
        let servers: Vec<&str> = app.all_servers().collect();
        let mut batch = Vec::with_capacity(servers.len());
        for server in &servers {
            let Some(snapshot) = snapshots.get(*server) else {
                continue;
            };
            let containers = snapshot.containers(&app.id);
            let record = StatusRecord::new(containers.evaluate(&compose.excluded), StatusSource::Complex, containers.len())
                .with_all_excluded(containers.all_excluded(&compose.excluded));
            batch.push((ResourceKey::application_on(&app.id, *server), record));
        }
        self.ctx.store.record_batch(batch);

        let keep: Vec<ResourceKey> = servers
            .iter()
            .map(|server| ResourceKey::application_on(&app.id, *server))
            .collect();
        self.ctx.store.retain_children(&key, &keep);

        let children = self.ctx.store.children(&key);
        let container_count = children.iter().map(|(_, r)| r.container_count).sum();
        // Placement exclusion comes from the record flag, never the status tag.
        let mut excluded = BTreeSet::new();
        let mut placements: Vec<(String, AggregateStatus)> = Vec::with_capacity(children.len());
        for (k, record) in children {
            let Some(server) = k.server else {
                continue;
            };
            if record.all_excluded {
                excluded.insert(server.clone());
            }
            placements.push((server, record.status));
        }
        if placements.is_empty() {
            tracing::warn!(application = %app.id, "No placement reachable, keeping previous status");
            return;
        }

        let status = rollup(&placements, &excluded);
        self.ctx
            .store
            .record(key, StatusRecord::new(status, StatusSource::Complex, container_count));
    }
}
