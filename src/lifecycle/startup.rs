//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging, metrics and the status store
//! - Spawn the collectors and the config watcher
//! - Bind the API listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The listener binds last, after every collector is running
//! - The store is saved after the API and collectors have stopped

use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::api::{self, AppState};
use crate::collectors::complex::ComplexChecker;
use crate::collectors::ssh::{SshPoller, SshSource};
use crate::collectors::CollectorContext;
use crate::config::watcher::{self, ConfigWatcher};
use crate::config::{load_config, FleetConfig};
use crate::lifecycle::Shutdown;
use crate::observability::{logging, metrics};
use crate::store::StatusStore;

/// Run the service until SIGINT or SIGTERM.
///
/// Without a config path the built-in defaults apply and hot reload is off.
pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => FleetConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fleet-status starting");
    tracing::info!(
        bind_address = %config.api.bind_address,
        servers = config.servers.len(),
        applications = config.applications.len(),
        services = config.services.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = match &config.store.persistence_path {
        Some(path) => StatusStore::load_from_file(path)?,
        None => StatusStore::new(None),
    };

    let shutdown = Shutdown::new();
    let bind_address = config.api.bind_address.clone();
    let ssh_binary = config.collectors.ssh_binary.clone();
    let shared = watcher::shared(config);
    let ctx = CollectorContext::new(shared.clone(), store.clone());

    // Dropping the watcher stops it, so keep it alive until shutdown.
    let _watcher = match config_path {
        Some(path) => {
            let (config_watcher, updates) = ConfigWatcher::new(path);
            let handle = config_watcher.run()?;
            tokio::spawn(watcher::apply_updates(shared.clone(), updates, shutdown.subscribe()));
            Some(handle)
        }
        None => None,
    };

    let source = Arc::new(SshSource::new(ssh_binary));
    let mut tasks = Vec::new();
    tasks.push(tokio::spawn(
        SshPoller::new(ctx.clone(), source.clone()).run(shutdown.subscribe()),
    ));
    tasks.push(tokio::spawn(
        ComplexChecker::new(ctx.clone(), source).run(shutdown.subscribe()),
    ));

    let signal_handle = shutdown.clone();
    tokio::spawn(async move { signal_handle.trigger_on_signal().await });

    let listener = TcpListener::bind(&bind_address).await?;
    api::serve(listener, AppState::new(ctx), shutdown.subscribe()).await?;

    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Collector task failed");
        }
    }

    if let Err(e) = store.save_to_file() {
        tracing::error!(error = %e, "Failed to save resource statuses");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
