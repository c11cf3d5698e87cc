//! Configuration file watcher for hot reload of the inventory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::config::loader::load_config;
use crate::config::schema::FleetConfig;

/// Configuration shared with every collector. Readers call `load_full()` once
/// per cycle and keep that snapshot for the whole cycle.
pub type SharedConfig = Arc<ArcSwap<FleetConfig>>;

pub fn shared(config: FleetConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<FleetConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<FleetConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!(path = ?path, "Config file change detected, reloading");
                    match load_config(&path) {
                        Ok(new_config) => {
                            let _ = tx.send(new_config);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Swap reloaded configurations into the shared handle until shutdown.
///
/// Listener and observability settings only apply on restart; the inventory
/// and collector settings take effect on the next collection cycle.
pub async fn apply_updates(
    shared: SharedConfig,
    mut updates: mpsc::UnboundedReceiver<FleetConfig>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(config) => {
                    tracing::info!(
                        servers = config.servers.len(),
                        applications = config.applications.len(),
                        services = config.services.len(),
                        "Configuration reloaded"
                    );
                    shared.store(Arc::new(config));
                }
                None => break,
            },
            _ = shutdown.recv() => break,
        }
    }
}
