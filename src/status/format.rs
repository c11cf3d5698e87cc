//! Display labels for aggregate statuses. Presentation only.

use super::types::EXCLUDED_TAG;

/// Prefix of an externally defined status namespace that is never re-parsed.
const PROXY_PREFIX: &str = "Proxy:";

/// Render a status string as a human-readable label.
///
/// `running:unhealthy:excluded` becomes `Running (unhealthy, excluded)`.
pub fn format_status(status: &str) -> String {
    if status.starts_with(PROXY_PREFIX) || status.is_empty() {
        return status.to_string();
    }

    let mut parts = status.split(':');
    let base = parts.next().unwrap_or_default();
    let qualifier = parts.next();
    let excluded = parts.next() == Some(EXCLUDED_TAG);

    let mut label = headline(base);
    if let Some(qualifier) = qualifier {
        label.push_str(" (");
        label.push_str(qualifier);
        if excluded {
            label.push_str(", excluded");
        }
        label.push(')');
    }
    label
}

/// Space before every non-leading uppercase letter, then capitalize the
/// first character. All-caps input spreads out one letter per word.
fn headline(word: &str) -> String {
    let mut spaced = String::with_capacity(word.len() * 2);
    for (i, c) in word.chars().enumerate() {
        if i > 0 && c.is_uppercase() {
            spaced.push(' ');
        }
        spaced.push(c);
    }

    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_status() {
        assert_eq!(format_status("running:healthy"), "Running (healthy)");
        assert_eq!(format_status("running:unhealthy:excluded"), "Running (unhealthy, excluded)");
        assert_eq!(format_status("degraded:excluded"), "Degraded (excluded)");
        assert_eq!(format_status("exited"), "Exited");
        assert_eq!(format_status("unknown:unknown:excluded"), "Unknown (unknown, excluded)");
    }

    #[test]
    fn test_proxy_passthrough() {
        assert_eq!(format_status("Proxy:running"), "Proxy:running");
        assert_eq!(format_status("Proxy:exited:whatever"), "Proxy:exited:whatever");
        assert_eq!(format_status("proxy:running"), "Proxy (running)");
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(format_status(""), "");
        assert_eq!(format_status("running:"), "Running ()");
        assert_eq!(format_status("running:healthy:other:more"), "Running (healthy)");
        assert_eq!(format_status("RUNNING"), "R U N N I N G");
        assert_eq!(format_status("notRunning:unknown"), "Not Running (unknown)");
    }
}
