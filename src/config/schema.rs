//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure of the status
//! service, including the inventory of servers and resources it watches.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the status service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FleetConfig {
    /// HTTP API settings.
    pub api: ApiConfig,

    /// Collector schedules and SSH settings.
    pub collectors: CollectorConfig,

    /// Status store persistence.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Servers reachable over SSH.
    pub servers: Vec<ServerConfig>,

    /// Single-container-group applications.
    pub applications: Vec<ApplicationConfig>,

    /// Multi-container Compose services.
    pub services: Vec<ServiceConfig>,
}

impl FleetConfig {
    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name == name)
    }
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,

    /// Bearer token for management endpoints.
    pub api_key: String,

    /// Bearer token on-host agents use to push container state.
    pub agent_token: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
            // WARNING: placeholders, override both in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            agent_token: "CHANGE_ME_IN_PRODUCTION".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Collector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Enable the SSH polling collector.
    pub ssh_enabled: bool,

    /// SSH polling interval in seconds.
    pub ssh_interval_secs: u64,

    /// Enable the multi-server check.
    pub complex_enabled: bool,

    /// Multi-server check interval in seconds.
    pub complex_interval_secs: u64,

    /// Timeout for a single remote `docker inspect` in seconds.
    pub ssh_timeout_secs: u64,

    /// SSH client binary.
    pub ssh_binary: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            ssh_enabled: true,
            ssh_interval_secs: 60,
            complex_enabled: true,
            complex_interval_secs: 60,
            ssh_timeout_secs: 30,
            ssh_binary: "ssh".to_string(),
        }
    }
}

/// Status store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file the store is loaded from on startup and saved to on shutdown.
    pub persistence_path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A managed server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Unique server identifier.
    pub name: String,

    /// Hostname or IP address.
    pub host: String,

    /// SSH user (default: root).
    #[serde(default = "default_user")]
    pub user: String,

    /// SSH port (default: 22).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Private key passed to the SSH client.
    #[serde(default)]
    pub identity_file: Option<String>,
}

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

/// An application deployed to one or more servers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApplicationConfig {
    /// Unique application identifier, matched against the `fleet.resource` label.
    pub id: String,

    /// Primary server.
    pub server: String,

    /// Further servers the application is deployed to.
    #[serde(default)]
    pub additional_servers: Vec<String>,

    /// Compose file for Compose-based applications.
    #[serde(default)]
    pub compose_path: Option<String>,
}

impl ApplicationConfig {
    pub fn is_multi_server(&self) -> bool {
        !self.additional_servers.is_empty()
    }

    /// Primary server followed by additional servers.
    pub fn all_servers(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.server.as_str()).chain(self.additional_servers.iter().map(String::as_str))
    }
}

/// A multi-container Compose service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique service identifier, matched against the `fleet.resource` label.
    pub id: String,

    /// Server the service runs on.
    pub server: String,

    /// Compose file declaring the sub-resources.
    pub compose_path: String,
}
