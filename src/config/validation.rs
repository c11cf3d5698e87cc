//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (resources reference existing servers)
//! - Validate value ranges (intervals > 0, addresses parse)
//! - Detect duplicate identifiers
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FleetConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::FleetConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must not be empty")]
    EmptyToken { field: &'static str },

    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },

    #[error("duplicate {kind} identifier: {id}")]
    Duplicate { kind: &'static str, id: String },

    #[error("{kind} {id} references unknown server {server}")]
    UnknownServer {
        kind: &'static str,
        id: String,
        server: String,
    },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &FleetConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.api.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "api.bind_address",
            value: config.api.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    for (field, value) in [("api.api_key", &config.api.api_key), ("api.agent_token", &config.api.agent_token)] {
        if value.trim().is_empty() {
            errors.push(ValidationError::EmptyToken { field });
        }
    }

    for (field, value) in [
        ("collectors.ssh_interval_secs", config.collectors.ssh_interval_secs),
        ("collectors.complex_interval_secs", config.collectors.complex_interval_secs),
        ("collectors.ssh_timeout_secs", config.collectors.ssh_timeout_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroInterval { field });
        }
    }

    check_unique("server", config.servers.iter().map(|s| s.name.as_str()), &mut errors);
    check_unique("application", config.applications.iter().map(|a| a.id.as_str()), &mut errors);
    check_unique("service", config.services.iter().map(|s| s.id.as_str()), &mut errors);

    let known: HashSet<&str> = config.servers.iter().map(|s| s.name.as_str()).collect();
    for app in &config.applications {
        for server in app.all_servers() {
            if !known.contains(server) {
                errors.push(ValidationError::UnknownServer {
                    kind: "application",
                    id: app.id.clone(),
                    server: server.to_string(),
                });
            }
        }
    }
    for service in &config.services {
        if !known.contains(service.server.as_str()) {
            errors.push(ValidationError::UnknownServer {
                kind: "service",
                id: service.id.clone(),
                server: service.server.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::Duplicate {
                kind,
                id: id.to_string(),
            });
        }
    }
}
