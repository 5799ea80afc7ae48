mod support;

use chrono::{DateTime, TimeDelta, Utc};
use librhoas::Error;
use librhoas::config::{ServiceKind, ServiceRef};
use librhoas::service::{InstanceSelector, use_command};
use librhoas::status::{status_command, status_report};
use support::MockServer;

#[tokio::test]
async fn test_use_kafka_by_name() {
    let server = MockServer::start().await;
    server.add_instance("kafkas", "k-dev", "kafka-dev");
    server.add_instance("kafkas", "k-1", "kafka");
    let (ctx, _dir) = support::test_ctx();
    support::store_config(
        &ctx.config_path,
        &support::logged_in_config(&server, TimeDelta::hours(1)),
    );

    use_command(
        &ctx,
        ServiceKind::Kafka,
        InstanceSelector::Name("kafka".to_string()),
    )
    .await
    .expect("use kafka");

    let config = support::load_config(&ctx.config_path);
    assert_eq!(
        config.services.kafka,
        Some(ServiceRef {
            instance_id: "k-1".to_string(),
            name: "kafka".to_string(),
        })
    );
    assert!(config.services.service_registry.is_none());
}

#[tokio::test]
async fn test_use_registry_by_id() {
    let server = MockServer::start().await;
    server.add_instance("registries", "r-1", "schemas");
    let (ctx, _dir) = support::test_ctx();
    support::store_config(
        &ctx.config_path,
        &support::logged_in_config(&server, TimeDelta::hours(1)),
    );

    use_command(
        &ctx,
        ServiceKind::ServiceRegistry,
        InstanceSelector::Id("r-1".to_string()),
    )
    .await
    .expect("use registry");

    let config = support::load_config(&ctx.config_path);
    assert_eq!(
        config.bookmark(ServiceKind::ServiceRegistry).map(|r| r.name.as_str()),
        Some("schemas")
    );
}

#[tokio::test]
async fn test_use_unknown_id_maps_not_found() {
    let server = MockServer::start().await;
    let (ctx, _dir) = support::test_ctx();
    support::store_config(
        &ctx.config_path,
        &support::logged_in_config(&server, TimeDelta::hours(1)),
    );

    let result = use_command(
        &ctx,
        ServiceKind::Kafka,
        InstanceSelector::Id("missing".to_string()),
    )
    .await;

    match result {
        Err(Error::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Kafka instance not found");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert!(support::load_config(&ctx.config_path).services.kafka.is_none());
}

#[tokio::test]
async fn test_use_requires_login() {
    let server = MockServer::start().await;
    server.add_instance("kafkas", "k-1", "kafka");
    let (ctx, _dir) = support::test_ctx();

    let result = use_command(
        &ctx,
        ServiceKind::Kafka,
        InstanceSelector::Id("k-1".to_string()),
    )
    .await;
    assert!(matches!(result, Err(Error::NotLoggedIn(_))));
}

#[tokio::test]
async fn test_status_clears_stale_bookmark() {
    let server = MockServer::start().await;
    server.add_instance("registries", "r-1", "schemas");
    let (ctx, _dir) = support::test_ctx();

    let mut config = support::logged_in_config(&server, TimeDelta::hours(1));
    config.services.kafka = Some(ServiceRef {
        instance_id: "deleted".to_string(),
        name: "old-kafka".to_string(),
    });
    config.services.service_registry = Some(ServiceRef {
        instance_id: "r-1".to_string(),
        name: "schemas".to_string(),
    });
    support::store_config(&ctx.config_path, &config);

    status_command(&ctx).await.expect("status");

    let saved = support::load_config(&ctx.config_path);
    assert!(saved.services.kafka.is_none());
    assert_eq!(saved.services.service_registry, config.services.service_registry);
    assert_eq!(saved.access_token, config.access_token);
}

#[tokio::test]
async fn test_status_when_logged_out() {
    let (ctx, _dir) = support::test_ctx();
    status_command(&ctx).await.expect("status");
    assert!(ctx.config_path.exists());
}

#[tokio::test]
async fn test_status_reports_refreshed_token() {
    let server = MockServer::start().await;
    server.add_instance("kafkas", "k-1", "kafka");
    let (ctx, _dir) = support::test_ctx();

    let mut config = support::logged_in_config(&server, -TimeDelta::minutes(5));
    config.services.kafka = Some(ServiceRef {
        instance_id: "k-1".to_string(),
        name: "kafka".to_string(),
    });
    support::store_config(&ctx.config_path, &config);

    let report = status_report(&ctx).await.expect("status");
    assert_eq!(server.count_grants("refresh_token"), 1);
    assert_eq!(report.kafka.map(|i| i.id).as_deref(), Some("k-1"));

    let expires_at = report.sso.expires_at.expect("access token expiry");
    let expires_at = DateTime::parse_from_rfc3339(&expires_at).unwrap();
    assert!(expires_at > Utc::now());
}
