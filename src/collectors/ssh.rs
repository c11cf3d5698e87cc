//! SSH polling collector.
//!
//! # Responsibilities
//! - Periodically run `docker inspect` on every server over SSH
//! - Feed the inspected containers through the shared resource evaluation
//!
//! # Design Decisions
//! - Servers are polled concurrently; one slow server does not delay the rest
//! - A failed server keeps its previous statuses instead of reporting `exited`
//! - The remote command is fixed; only connection parameters vary per server

use std::future::Future;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time;
use uuid::Uuid;

use crate::collectors::resources::apply_server_snapshot;
use crate::collectors::snapshot::ServerSnapshot;
use crate::collectors::{CollectError, CollectorContext, RESOURCE_LABEL};
use crate::config::ServerConfig;
use crate::observability::metrics;
use crate::status::observation::parse_inspect_output;
use crate::status::ContainerObservation;
use crate::store::StatusSource;

/// Source of inspected containers for a server.
pub trait ContainerSource: Send + Sync + 'static {
    fn inspect(
        &self,
        server: &ServerConfig,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<ContainerObservation>, CollectError>> + Send;
}

/// Runs `docker inspect` through the system SSH client.
#[derive(Debug, Clone)]
pub struct SshSource {
    binary: String,
}

impl SshSource {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn remote_command() -> String {
        format!(
            "docker ps -aq --no-trunc --filter label={} | xargs -r docker inspect",
            RESOURCE_LABEL
        )
    }

    fn command(&self, server: &ServerConfig) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("ConnectTimeout=10")
            .arg("-p")
            .arg(server.port.to_string());
        if let Some(identity) = &server.identity_file {
            cmd.arg("-i").arg(identity);
        }
        cmd.arg(format!("{}@{}", server.user, server.host))
            .arg(Self::remote_command())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl ContainerSource for SshSource {
    async fn inspect(
        &self,
        server: &ServerConfig,
        timeout: Duration,
    ) -> Result<Vec<ContainerObservation>, CollectError> {
        let output = match time::timeout(timeout, self.command(server).output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(CollectError::Spawn {
                    server: server.name.clone(),
                    source,
                })
            }
            Err(_) => {
                return Err(CollectError::Timeout {
                    server: server.name.clone(),
                    secs: timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(CollectError::Command {
                server: server.name.clone(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_inspect_output(&String::from_utf8_lossy(&output.stdout)).map_err(|source| {
            CollectError::Decode {
                server: server.name.clone(),
                source,
            }
        })
    }
}

/// Periodic SSH collector.
pub struct SshPoller<S> {
    ctx: CollectorContext,
    source: Arc<S>,
}

impl<S: ContainerSource> SshPoller<S> {
    pub fn new(ctx: CollectorContext, source: Arc<S>) -> Self {
        Self { ctx, source }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let collectors = self.ctx.config.load().collectors.clone();
        if !collectors.ssh_enabled {
            tracing::info!("SSH collector disabled");
            return;
        }

        tracing::info!(interval = collectors.ssh_interval_secs, "SSH collector starting");
        let mut ticker = time::interval(Duration::from_secs(collectors.ssh_interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("SSH collector received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Poll every server once. Returns the number of resources updated.
    pub async fn poll_once(&self) -> usize {
        let config = self.ctx.config.load_full();
        let timeout = Duration::from_secs(config.collectors.ssh_timeout_secs);
        let started = Instant::now();
        let cycle = Uuid::new_v4();

        let mut tasks = JoinSet::new();
        for server in config.servers.iter().cloned() {
            let source = self.source.clone();
            tasks.spawn(async move {
                let result = source.inspect(&server, timeout).await;
                (server.name, result)
            });
        }

        let mut updated = 0;
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((server, Ok(observations))) => {
                    let snapshot = ServerSnapshot::from_observations(observations);
                    updated +=
                        apply_server_snapshot(&self.ctx, &config, &server, &snapshot, StatusSource::Ssh);
                }
                Ok((server, Err(e))) => {
                    failed += 1;
                    tracing::warn!(cycle = %cycle, server = %server, error = %e, "Failed to collect container state");
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(error = %e, "SSH collection task panicked");
                }
            }
        }

        let outcome = if failed == 0 { "success" } else { "partial" };
        metrics::record_collection("ssh", outcome, started.elapsed());
        tracing::debug!(cycle = %cycle, updated, failed, elapsed_ms = started.elapsed().as_millis() as u64, "SSH collection finished");
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssh_command_line() {
        let server = ServerConfig {
            name: "edge-1".to_string(),
            host: "10.0.0.5".to_string(),
            user: "deploy".to_string(),
            port: 2222,
            identity_file: Some("/keys/edge".to_string()),
        };
        let cmd = SshSource::new("ssh").command(&server);
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert!(args.windows(2).any(|w| w == ["-p", "2222"]));
        assert!(args.windows(2).any(|w| w == ["-i", "/keys/edge"]));
        assert!(args.contains(&"deploy@10.0.0.5".to_string()));
        assert!(args.last().unwrap().contains("label=fleet.resource"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let server = ServerConfig {
            name: "edge-1".to_string(),
            host: "127.0.0.1".to_string(),
            user: "root".to_string(),
            port: 22,
            identity_file: None,
        };
        let err = SshSource::new("/nonexistent/ssh-binary")
            .inspect(&server, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, CollectError::Spawn { .. }));
    }
}
