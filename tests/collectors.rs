//! End-to-end collector tests against a fake container source.

use std::collections::HashMap;
use std::sync::Arc;

use fleet_status::collectors::complex::ComplexChecker;
use fleet_status::collectors::push::{handle_report, AgentReport};
use fleet_status::collectors::snapshot::AgentContainer;
use fleet_status::collectors::ssh::SshPoller;
use fleet_status::collectors::RESOURCE_LABEL;
use fleet_status::config::FleetConfig;
use fleet_status::status::observation::COMPOSE_SERVICE_LABEL;
use fleet_status::status::{ContainerObservation, HealthState, LifecycleState};
use fleet_status::store::{ResourceKey, StatusSource};

mod common;
use common::{application, container, context, running, server, service, write_compose, FakeSource};

fn agent(name: &str, resource: &str, status: &str) -> AgentContainer {
    AgentContainer {
        name: name.to_string(),
        status: status.to_string(),
        restart_count: None,
        labels: HashMap::from([(RESOURCE_LABEL.to_string(), resource.to_string())]),
    }
}

fn single_app_config() -> FleetConfig {
    let mut config = FleetConfig::default();
    config.servers.push(server("edge-1"));
    config.applications.push(application("shop", "edge-1", &[]));
    config
}

#[tokio::test]
async fn test_ssh_and_push_agree() {
    let cases: Vec<(Vec<ContainerObservation>, Vec<AgentContainer>)> = vec![
        (
            vec![
                running("a", "shop", Some(HealthState::Healthy)),
                running("b", "shop", Some(HealthState::Unhealthy)),
            ],
            vec![agent("a", "shop", "running:healthy"), agent("b", "shop", "running:unhealthy")],
        ),
        (
            vec![running("a", "shop", None), container("b", "shop", LifecycleState::Exited)],
            vec![agent("a", "shop", "running"), agent("b", "shop", "exited")],
        ),
        (
            vec![
                running("a", "shop", Some(HealthState::Healthy)),
                container("b", "shop", LifecycleState::Paused),
            ],
            vec![agent("a", "shop", "running (healthy)"), agent("b", "shop", "paused")],
        ),
        (
            vec![container("a", "shop", LifecycleState::Exited).with_restart_count(4)],
            vec![AgentContainer {
                restart_count: Some(4),
                ..agent("a", "shop", "exited")
            }],
        ),
        (Vec::new(), Vec::new()),
    ];

    for (observed, reported) in cases {
        let ssh_ctx = context(single_app_config());
        let source = Arc::new(FakeSource::new());
        source.set("edge-1", observed);
        SshPoller::new(ssh_ctx.clone(), source).poll_once().await;

        let push_ctx = context(single_app_config());
        handle_report(
            &push_ctx,
            &AgentReport {
                server: "edge-1".to_string(),
                containers: reported,
            },
        )
        .unwrap();

        let key = ResourceKey::application("shop");
        let via_ssh = ssh_ctx.store.get(&key).unwrap();
        let via_push = push_ctx.store.get(&key).unwrap();
        assert_eq!(via_ssh.status, via_push.status);
        assert_eq!(via_ssh.source, StatusSource::Ssh);
        assert_eq!(via_push.source, StatusSource::Agent);
    }
}

#[tokio::test]
async fn test_service_rollup_skips_excluded_sub_resource() {
    let dir = tempfile::tempdir().unwrap();
    let compose = write_compose(
        dir.path(),
        r#"
services:
  web:
    image: nginx
  db:
    image: postgres
  backup:
    image: restic
    exclude_from_hc: true
"#,
    );

    let mut config = FleetConfig::default();
    config.servers.push(server("edge-1"));
    config.services.push(service("crm", "edge-1", &compose));
    let ctx = context(config);

    let source = Arc::new(FakeSource::new());
    source.set(
        "edge-1",
        vec![
            running("crm-web-1", "crm", Some(HealthState::Healthy)).with_service("web"),
            running("crm-db-1", "crm", Some(HealthState::Unhealthy)).with_service("db"),
            container("crm-backup-1", "crm", LifecycleState::Exited).with_service("backup"),
        ],
    );
    SshPoller::new(ctx.clone(), source).poll_once().await;

    let status = |key: ResourceKey| ctx.store.get(&key).unwrap().status.to_string();
    assert_eq!(status(ResourceKey::sub_resource("crm", "web")), "running:healthy");
    assert_eq!(status(ResourceKey::sub_resource("crm", "db")), "running:unhealthy");
    assert_eq!(status(ResourceKey::sub_resource("crm", "backup")), "exited");
    assert_eq!(status(ResourceKey::service("crm")), "running:unhealthy");
    assert_eq!(ctx.store.get(&ResourceKey::service("crm")).unwrap().container_count, 3);
}

#[tokio::test]
async fn test_all_excluded_service_still_reports() {
    let dir = tempfile::tempdir().unwrap();
    let compose = write_compose(
        dir.path(),
        r#"
services:
  backup:
    image: restic
    restart: "no"
  cron:
    image: cron
    exclude_from_hc: true
"#,
    );

    let mut config = FleetConfig::default();
    config.servers.push(server("edge-1"));
    config.services.push(service("jobs", "edge-1", &compose));
    let ctx = context(config);

    let source = Arc::new(FakeSource::new());
    source.set(
        "edge-1",
        vec![running("jobs-backup-1", "jobs", Some(HealthState::Healthy)).with_service("backup")],
    );
    SshPoller::new(ctx.clone(), source).poll_once().await;

    let status = |key: ResourceKey| ctx.store.get(&key).unwrap().status.to_string();
    assert_eq!(status(ResourceKey::sub_resource("jobs", "backup")), "running:healthy:excluded");
    assert_eq!(status(ResourceKey::sub_resource("jobs", "cron")), "unknown:unknown:excluded");
    assert_eq!(status(ResourceKey::service("jobs")), "running:healthy:excluded");
}

#[tokio::test]
async fn test_pushed_service_matches_polled_service() {
    let dir = tempfile::tempdir().unwrap();
    let compose = write_compose(
        dir.path(),
        r#"
services:
  web: {}
  worker:
    restart: no
"#,
    );

    let mut config = FleetConfig::default();
    config.servers.push(server("edge-1"));
    config.services.push(service("crm", "edge-1", &compose));

    let polled = context(config.clone());
    let source = Arc::new(FakeSource::new());
    source.set(
        "edge-1",
        vec![
            running("crm-web-1", "crm", Some(HealthState::Starting)).with_service("web"),
            container("crm-worker-1", "crm", LifecycleState::Restarting).with_service("worker"),
        ],
    );
    SshPoller::new(polled.clone(), source).poll_once().await;

    let pushed = context(config);
    let report = |name: &str, sub: &str, status: &str| {
        let mut c = agent(name, "crm", status);
        c.labels.insert(COMPOSE_SERVICE_LABEL.to_string(), sub.to_string());
        c
    };
    handle_report(
        &pushed,
        &AgentReport {
            server: "edge-1".to_string(),
            containers: vec![
                report("crm-web-1", "web", "running:starting"),
                report("crm-worker-1", "worker", "restarting"),
            ],
        },
    )
    .unwrap();

    for key in [
        ResourceKey::service("crm"),
        ResourceKey::sub_resource("crm", "web"),
        ResourceKey::sub_resource("crm", "worker"),
    ] {
        assert_eq!(
            polled.store.get(&key).unwrap().status,
            pushed.store.get(&key).unwrap().status,
            "{}",
            key
        );
    }
    assert_eq!(
        polled.store.get(&ResourceKey::service("crm")).unwrap().status.to_string(),
        "running:unknown"
    );
}

#[tokio::test]
async fn test_unreachable_server_keeps_previous_status() {
    let ctx = context(single_app_config());
    let source = Arc::new(FakeSource::new());
    source.set("edge-1", vec![running("shop-1", "shop", Some(HealthState::Healthy))]);

    let poller = SshPoller::new(ctx.clone(), source.clone());
    assert_eq!(poller.poll_once().await, 1);
    source.fail("edge-1");
    assert_eq!(poller.poll_once().await, 0);

    let record = ctx.store.get(&ResourceKey::application("shop")).unwrap();
    assert_eq!(record.status.to_string(), "running:healthy");
}

#[tokio::test]
async fn test_multi_server_application_left_to_complex_check() {
    let mut config = FleetConfig::default();
    config.servers = vec![server("edge-1"), server("edge-2")];
    config.applications.push(application("shop", "edge-1", &["edge-2"]));
    let ctx = context(config);

    let source = Arc::new(FakeSource::new());
    source.set("edge-1", vec![running("shop-1", "shop", Some(HealthState::Healthy))]);
    source.set("edge-2", vec![running("shop-2", "shop", Some(HealthState::Healthy))]);

    SshPoller::new(ctx.clone(), source.clone()).poll_once().await;
    assert!(ctx.store.get(&ResourceKey::application("shop")).is_none());

    ComplexChecker::new(ctx.clone(), source.clone()).check_once().await;
    let record = ctx.store.get(&ResourceKey::application("shop")).unwrap();
    assert_eq!(record.status.to_string(), "running:healthy");
    assert_eq!(record.source, StatusSource::Complex);
    assert_eq!(ctx.store.children(&ResourceKey::application("shop")).len(), 2);

    source.set("edge-2", vec![container("shop-2", "shop", LifecycleState::Restarting)]);
    ComplexChecker::new(ctx.clone(), source).check_once().await;
    assert_eq!(
        ctx.store.get(&ResourceKey::application("shop")).unwrap().status.to_string(),
        "degraded:unhealthy"
    );
}

#[tokio::test]
async fn test_deploying_override_wins_over_containers() {
    let ctx = context(single_app_config());
    ctx.set_deploying(ResourceKey::application("shop"), true);

    let source = Arc::new(FakeSource::new());
    source.set("edge-1", vec![container("shop-1", "shop", LifecycleState::Dead)]);
    SshPoller::new(ctx.clone(), source.clone()).poll_once().await;
    assert_eq!(
        ctx.store.get(&ResourceKey::application("shop")).unwrap().status.to_string(),
        "starting:unhealthy"
    );

    ctx.set_deploying(ResourceKey::application("shop"), false);
    SshPoller::new(ctx.clone(), source).poll_once().await;
    assert_eq!(
        ctx.store.get(&ResourceKey::application("shop")).unwrap().status.to_string(),
        "degraded:unhealthy"
    );
}

#[tokio::test]
async fn test_unlabeled_service_container_agrees_across_paths() {
    let dir = tempfile::tempdir().unwrap();
    let compose = write_compose(dir.path(), "services:\n  web: {}\n");

    let mut config = FleetConfig::default();
    config.servers.push(server("edge-1"));
    config.services.push(service("crm", "edge-1", &compose));

    let polled = context(config.clone());
    let source = Arc::new(FakeSource::new());
    source.set(
        "edge-1",
        vec![
            running("crm-web-1", "crm", Some(HealthState::Healthy)).with_service("web"),
            container("crm-sidecar", "crm", LifecycleState::Exited),
        ],
    );
    SshPoller::new(polled.clone(), source).poll_once().await;

    let pushed = context(config);
    let mut web = agent("crm-web-1", "crm", "running:healthy");
    web.labels.insert(COMPOSE_SERVICE_LABEL.to_string(), "web".to_string());
    handle_report(
        &pushed,
        &AgentReport {
            server: "edge-1".to_string(),
            containers: vec![web, agent("crm-sidecar", "crm", "exited")],
        },
    )
    .unwrap();

    let sidecar = ResourceKey::sub_resource("crm", "crm-sidecar");
    assert_eq!(
        polled.store.get(&sidecar).unwrap().status,
        pushed.store.get(&sidecar).unwrap().status
    );
    let keys = |ctx: &fleet_status::collectors::CollectorContext| -> Vec<String> {
        ctx.store
            .children(&ResourceKey::service("crm"))
            .into_iter()
            .map(|(k, _)| k.to_string())
            .collect()
    };
    assert_eq!(keys(&polled), keys(&pushed));
    for ctx in [&polled, &pushed] {
        assert_eq!(
            ctx.store.get(&ResourceKey::service("crm")).unwrap().status.to_string(),
            "degraded:unhealthy"
        );
    }
}

#[tokio::test]
async fn test_all_excluded_placements_roll_up_as_excluded() {
    let dir = tempfile::tempdir().unwrap();
    let compose = write_compose(dir.path(), "services:\n  shop:\n    restart: \"no\"\n");

    let mut config = FleetConfig::default();
    config.servers = vec![server("edge-1"), server("edge-2")];
    let mut app = application("shop", "edge-1", &["edge-2"]);
    app.compose_path = Some(compose.to_string_lossy().into_owned());
    config.applications.push(app);
    let ctx = context(config);

    let source = Arc::new(FakeSource::new());
    source.set(
        "edge-1",
        vec![running("shop-1", "shop", Some(HealthState::Healthy)).with_service("shop")],
    );
    source.set(
        "edge-2",
        vec![container("shop-2", "shop", LifecycleState::Exited).with_service("shop")],
    );
    ComplexChecker::new(ctx.clone(), source).check_once().await;

    let edge2 = ctx.store.get(&ResourceKey::application_on("shop", "edge-2")).unwrap();
    assert_eq!(edge2.status.to_string(), "exited");
    assert!(edge2.all_excluded);
    assert_eq!(
        ctx.store.get(&ResourceKey::application("shop")).unwrap().status.to_string(),
        "degraded:excluded"
    );
}
