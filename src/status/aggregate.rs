//! Status aggregation.
//!
//! # Decision table
//! ```text
//! 1  any input already degraded          → degraded:unhealthy
//! 2  any restarting                      → degraded:unhealthy
//! 3  any exited, max restart count > 0   → degraded:unhealthy
//! 4  any dead / removing                 → degraded:unhealthy
//! 5  running + exited                    → degraded:unhealthy
//! 6  running + starting/created          → starting:unknown
//! 7  paused, nothing running             → paused:unknown
//! 8  starting/created                    → starting:unknown
//! 9  running                             → running:{unhealthy|unknown|healthy}
//! 10 exited                              → exited
//! 11 empty                               → exited
//! ```
//! First matching rule wins.
//!
//! Both entry points normalize into [`StatusToken`] so the table above is
//! implemented once.

use super::observation::{ContainerObservation, HealthState, LifecycleState};
use super::types::{AggregateStatus, Qualifier};

/// Normalized per-container input to the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusToken {
    /// A sub-resource that already aggregated to `degraded`.
    Degraded,
    Container {
        state: LifecycleState,
        health: Option<HealthState>,
    },
}

impl StatusToken {
    pub fn from_observation(observation: &ContainerObservation) -> Self {
        StatusToken::Container {
            state: observation.state,
            health: observation.health,
        }
    }

    /// Parse a flattened status string.
    ///
    /// Accepts `base`, `base:qualifier[:excluded]` and the legacy
    /// `base (qualifier)` form. A recognized base with an unrecognized
    /// qualifier yields unknown health. Returns `None` for strings with no
    /// recognized base, and for `unknown`, which carries no container data.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        let (base, qualifier) = split_status(&normalized);

        if base == "degraded" {
            return Some(StatusToken::Degraded);
        }
        let state = LifecycleState::parse(base)?;
        Some(StatusToken::Container {
            state,
            health: qualifier.and_then(HealthState::parse),
        })
    }
}

/// Split `base:qualifier` or `base (qualifier)` into its two tokens.
fn split_status(raw: &str) -> (&str, Option<&str>) {
    if let Some((base, rest)) = raw.split_once('(') {
        let inner = rest.trim_end().trim_end_matches(')');
        let qualifier = inner.split(',').next().unwrap_or_default().trim();
        return (base.trim(), Some(qualifier));
    }
    let mut parts = raw.split(':');
    let base = parts.next().unwrap_or_default().trim();
    (base, parts.next().map(str::trim))
}

/// Aggregate full container observations.
pub fn aggregate(observations: &[ContainerObservation], max_restart_count: i64) -> AggregateStatus {
    resolve(
        observations.iter().map(StatusToken::from_observation),
        max_restart_count,
    )
}

/// Aggregate pre-flattened status strings.
///
/// Produces the same result as [`aggregate`] for equivalent input.
pub fn aggregate_strings<I, S>(statuses: I, max_restart_count: i64) -> AggregateStatus
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tokens = statuses.into_iter().filter_map(|raw| {
        let token = StatusToken::parse(raw.as_ref());
        if token.is_none() {
            tracing::debug!(status = %raw.as_ref(), "Ignoring unrecognized container status");
        }
        token
    });
    resolve(tokens, max_restart_count)
}

#[derive(Debug, Default)]
struct Tally {
    degraded: bool,
    restarting: bool,
    exited: bool,
    dead: bool,
    paused: bool,
    starting: bool,
    running: bool,
    unhealthy: bool,
    unknown_health: bool,
}

impl Tally {
    fn record(&mut self, token: StatusToken) {
        let (state, health) = match token {
            StatusToken::Degraded => {
                self.degraded = true;
                return;
            }
            StatusToken::Container { state, health } => (state, health),
        };
        match state {
            LifecycleState::Running => {
                self.running = true;
                match health {
                    Some(HealthState::Unhealthy) => self.unhealthy = true,
                    Some(HealthState::Healthy) => {}
                    // A warming-up check is not a pass.
                    Some(HealthState::Starting) | None => self.unknown_health = true,
                }
            }
            LifecycleState::Restarting => self.restarting = true,
            LifecycleState::Exited => self.exited = true,
            LifecycleState::Dead | LifecycleState::Removing => self.dead = true,
            LifecycleState::Paused => self.paused = true,
            LifecycleState::Created | LifecycleState::Starting => self.starting = true,
        }
    }
}

fn resolve<I>(tokens: I, max_restart_count: i64) -> AggregateStatus
where
    I: IntoIterator<Item = StatusToken>,
{
    let max_restart_count = clamp_restart_count(max_restart_count);

    let mut tally = Tally::default();
    for token in tokens {
        tally.record(token);
    }

    if tally.degraded || tally.restarting {
        return AggregateStatus::degraded();
    }
    if tally.exited && max_restart_count > 0 {
        return AggregateStatus::degraded();
    }
    if tally.dead {
        return AggregateStatus::degraded();
    }
    if tally.running && tally.exited {
        return AggregateStatus::degraded();
    }
    if tally.running && tally.starting {
        return AggregateStatus::starting();
    }
    if tally.paused && !tally.running {
        return AggregateStatus::paused();
    }
    if tally.starting {
        return AggregateStatus::starting();
    }
    if tally.running {
        // A paused sibling is not serving, so it cannot count as healthy.
        return if tally.unhealthy {
            AggregateStatus::running(Qualifier::Unhealthy)
        } else if tally.unknown_health || tally.paused {
            AggregateStatus::running(Qualifier::Unknown)
        } else {
            AggregateStatus::running(Qualifier::Healthy)
        };
    }
    AggregateStatus::exited()
}

fn clamp_restart_count(max_restart_count: i64) -> i64 {
    if max_restart_count < 0 {
        tracing::warn!(
            max_restart_count,
            "Negative max restart count, crash-loop detection disabled"
        );
        return 0;
    }
    max_restart_count
}
