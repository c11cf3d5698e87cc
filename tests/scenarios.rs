//! Engine behavior through the public API only.

use std::collections::BTreeSet;

use fleet_status::status::{
    aggregate, aggregate_strings, append_excluded_suffix, calculate_excluded, calculate_excluded_from_strings,
    format_status, resolve_excluded, AggregateStatus, ContainerObservation, HealthState, LifecycleState,
    Qualifier,
};

fn running(name: &str, health: HealthState) -> ContainerObservation {
    ContainerObservation::new(name, LifecycleState::Running).with_health(health)
}

#[test]
fn test_scenario_a_unhealthy_beats_healthy() {
    let containers = [running("a", HealthState::Unhealthy), running("b", HealthState::Healthy)];
    assert_eq!(aggregate(&containers, 0).to_string(), "running:unhealthy");
}

#[test]
fn test_scenario_b_running_and_exited_is_degraded() {
    let containers = [
        ContainerObservation::new("a", LifecycleState::Running),
        ContainerObservation::new("b", LifecycleState::Exited),
    ];
    assert_eq!(aggregate(&containers, 0).to_string(), "degraded:unhealthy");
}

#[test]
fn test_scenario_c_empty_is_exited() {
    assert_eq!(aggregate(&[], 0), AggregateStatus::exited());
    assert_eq!(aggregate_strings(Vec::<String>::new(), 0), AggregateStatus::exited());
}

#[test]
fn test_scenario_d_excluded_container() {
    let containers = [running("backup", HealthState::Healthy)];
    let excluded = BTreeSet::from(["backup".to_string()]);
    assert_eq!(
        calculate_excluded(&containers, &excluded).to_string(),
        "running:healthy:excluded"
    );
}

#[test]
fn test_scenario_e_format_excluded() {
    assert_eq!(
        format_status("running:unhealthy:excluded"),
        "Running (unhealthy, excluded)"
    );
}

#[test]
fn test_restarting_dominates_any_mix() {
    let others = [
        LifecycleState::Running,
        LifecycleState::Exited,
        LifecycleState::Paused,
        LifecycleState::Created,
        LifecycleState::Dead,
    ];
    for other in others {
        let containers = [
            ContainerObservation::new("a", other),
            ContainerObservation::new("b", LifecycleState::Restarting),
        ];
        assert_eq!(aggregate(&containers, 0), AggregateStatus::degraded(), "{:?}", other);
    }
}

#[test]
fn test_crash_loop_gating() {
    let exited = [ContainerObservation::new("a", LifecycleState::Exited)];
    assert_eq!(aggregate(&exited, 0), AggregateStatus::exited());
    assert_eq!(aggregate(&exited, 1), AggregateStatus::degraded());
    assert_eq!(aggregate_strings(["exited"], 3), AggregateStatus::degraded());
}

#[test]
fn test_order_does_not_matter() {
    let forward = ["running:healthy", "starting", "running:unhealthy"];
    let mut backward = forward;
    backward.reverse();
    assert_eq!(aggregate_strings(forward, 0), aggregate_strings(backward, 0));
    assert_eq!(aggregate_strings(forward, 0).to_string(), "starting:unknown");
}

#[test]
fn test_exclusion_round_trip() {
    assert_eq!(
        append_excluded_suffix(AggregateStatus::running(Qualifier::Healthy)).to_string(),
        "running:healthy:excluded"
    );
    assert_eq!(
        calculate_excluded_from_strings(Vec::<&str>::new()).to_string(),
        "unknown:unknown:excluded"
    );
    assert_eq!(append_excluded_suffix(AggregateStatus::exited()).to_string(), "exited");
}

#[test]
fn test_proxy_status_passes_through() {
    assert_eq!(format_status("Proxy:running"), "Proxy:running");
}

#[test]
fn test_resolver_feeds_calculator() {
    let compose = r#"
services:
  app:
    image: app
  migrate:
    image: app
    restart: "no"
"#;
    let excluded = resolve_excluded(compose);
    assert_eq!(excluded, BTreeSet::from(["migrate".to_string()]));

    let containers = [
        running("app-1", HealthState::Healthy).with_service("app"),
        ContainerObservation::new("migrate-1", LifecycleState::Exited).with_service("migrate"),
    ];
    assert_eq!(calculate_excluded(&containers, &excluded), AggregateStatus::exited());
}
