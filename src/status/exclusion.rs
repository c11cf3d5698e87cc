//! Health-check exclusion policy.
//!
//! A Compose service is excluded from health-driven side effects when it sets
//! `exclude_from_hc: true` or `restart: no`. The set is recomputed from the raw
//! Compose text on every call; parse problems yield an empty set.

use std::collections::BTreeSet;

use serde_yaml::{Mapping, Value};

/// Names of the Compose services that are opted out of health influence.
pub fn resolve_excluded(compose_yaml: &str) -> BTreeSet<String> {
    let document: Value = match serde_yaml::from_str(compose_yaml) {
        Ok(document) => document,
        Err(e) => {
            let line = e.location().map(|l| l.line());
            let snippet = line
                .and_then(|n| compose_yaml.lines().nth(n.saturating_sub(1)))
                .unwrap_or_default();
            tracing::warn!(
                error = %e,
                line = ?line,
                snippet = %snippet.trim(),
                "Failed to parse compose file, assuming no health check exclusions"
            );
            return BTreeSet::new();
        }
    };

    let Some(root) = document.as_mapping() else {
        if !document.is_null() {
            tracing::warn!(
                kind = value_kind(&document),
                "Compose top level is not a mapping, assuming no health check exclusions"
            );
        }
        return BTreeSet::new();
    };

    let services = match root.get("services") {
        None | Some(Value::Null) => return BTreeSet::new(),
        Some(Value::Mapping(services)) => services,
        Some(other) => {
            tracing::warn!(
                kind = value_kind(other),
                "Compose `services` is not a mapping, assuming no health check exclusions"
            );
            return BTreeSet::new();
        }
    };

    services
        .iter()
        .filter_map(|(name, definition)| {
            let name = name.as_str()?;
            let definition = definition.as_mapping()?;
            is_excluded(definition).then(|| name.to_string())
        })
        .collect()
}

fn is_excluded(service: &Mapping) -> bool {
    let exclude_from_hc = match service.get("exclude_from_hc") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };

    // YAML 1.1 authors write `restart: no` unquoted, which some tools emit as `false`.
    let restart_no = match service.get("restart") {
        Some(Value::String(policy)) => policy.trim() == "no",
        Some(Value::Bool(false)) => true,
        _ => false,
    };

    exclude_from_hc || restart_no
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_excluded() {
        let compose = r#"
services:
  web:
    image: nginx
  migrate:
    image: app
    restart: "no"
  backup:
    image: restic
    exclude_from_hc: true
  worker:
    image: app
    restart: unless-stopped
    exclude_from_hc: false
"#;
        let excluded = resolve_excluded(compose);
        assert_eq!(
            excluded.into_iter().collect::<Vec<_>>(),
            vec!["backup".to_string(), "migrate".to_string()]
        );
    }

    #[test]
    fn test_unquoted_no_is_excluded() {
        let compose = "services:\n  seed:\n    restart: no\n";
        assert!(resolve_excluded(compose).contains("seed"));
    }

    #[test]
    fn test_defaults_are_not_excluded() {
        let compose = "services:\n  db:\n    image: postgres\n  cache: {}\n";
        assert!(resolve_excluded(compose).is_empty());
    }

    #[test]
    fn test_malformed_yaml_yields_empty_set() {
        assert!(resolve_excluded("services:\n  web: [unclosed\n").is_empty());
    }

    #[test]
    fn test_wrong_shapes_yield_empty_set() {
        assert!(resolve_excluded("- just\n- a list\n").is_empty());
        assert!(resolve_excluded("services: [web, db]\n").is_empty());
        assert!(resolve_excluded("version: '3'\n").is_empty());
        assert!(resolve_excluded("").is_empty());
    }
}
