//! Container status aggregation engine.
//!
//! # Data Flow
//! ```text
//! docker inspect JSON ──▶ observation.rs ──┐
//!                                          ├─▶ StatusToken ──▶ aggregate.rs ──▶ AggregateStatus
//! "base:qualifier" strings ────────────────┘                        ▲
//!                                                                    │
//! compose YAML ──▶ exclusion.rs ──▶ excluded set ──▶ evaluate.rs ────┤
//!                                                        │           │
//!                                                        └─▶ excluded.rs (all excluded)
//!
//! AggregateStatus ──▶ format.rs (display only)
//! ```
//!
//! # Design Decisions
//! - Everything here is a pure function of its input; no locks, no I/O
//! - Thresholds arrive as parameters, never from global config
//! - Bad input degrades toward `unknown` or `exited`, it never errors

pub mod aggregate;
pub mod evaluate;
pub mod excluded;
pub mod exclusion;
pub mod format;
pub mod observation;
pub mod types;

pub use aggregate::{aggregate, aggregate_strings};
pub use evaluate::{evaluate_observations, evaluate_statuses, starting_override, NamedStatus};
pub use excluded::{append_excluded_suffix, calculate_excluded, calculate_excluded_from_strings};
pub use exclusion::resolve_excluded;
pub use format::format_status;
pub use observation::{max_restart_count, ContainerObservation, HealthState, LifecycleState};
pub use types::{AggregateStatus, Qualifier, StatusBase};
