//! Compose files of watched resources.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde_yaml::Value;

use crate::status::resolve_excluded;

/// What the collectors need from a Compose file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeFile {
    /// Declared service names, in file order.
    pub services: Vec<String>,
    /// Services opted out of health influence.
    pub excluded: BTreeSet<String>,
}

impl ComposeFile {
    /// Read and interpret a Compose file. Unreadable files behave like an
    /// empty file: no declared services and no exclusions.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to read compose file");
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Self {
        Self {
            services: declared_services(text),
            excluded: resolve_excluded(text),
        }
    }

    /// Load when a path is configured.
    pub fn load_optional(path: Option<&str>) -> Self {
        path.map(|p| Self::load(Path::new(p))).unwrap_or_default()
    }
}

// Parse failures are already reported by `resolve_excluded`.
fn declared_services(text: &str) -> Vec<String> {
    let Ok(document) = serde_yaml::from_str::<Value>(text) else {
        return Vec::new();
    };
    document
        .get("services")
        .and_then(Value::as_mapping)
        .map(|services| {
            services
                .keys()
                .filter_map(|k| k.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
