#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! Integration tests for bootstrap, the endpoint service and the command
//! handlers.

use bifrost_core::db::open_pool_in_memory;
use bifrost_core::{Config, StoreConfig};
use bifrost_server::{EndpointService, ServiceFactory, bootstrap_with_pool, cmd};
use bifrost_store::{Endpoint, StoreError};

async fn test_service() -> EndpointService {
    let pool = open_pool_in_memory().await.unwrap();
    EndpointService::new(
        bootstrap_with_pool(pool, &StoreConfig::default())
            .await
            .unwrap(),
    )
}

fn endpoint(name: &str, owner: &str) -> Endpoint {
    Endpoint {
        name: name.into(),
        owner: owner.into(),
        tags: Vec::new(),
    }
}

#[tokio::test]
async fn create_endpoint_acknowledges_owner() {
    let service = test_service().await;
    let details = service.create_endpoint(endpoint("demo", "odin")).await.unwrap();
    assert_eq!(details, "odin is a winner");
}

#[tokio::test]
async fn list_endpoints_returns_tagged_endpoints() {
    let service = test_service().await;
    service.create_endpoint(endpoint("a", "u1")).await.unwrap();
    service.create_endpoint(endpoint("b", "u2")).await.unwrap();

    let listed = service.list_endpoints().await.unwrap();
    assert_eq!(listed.len(), 2);
    for e in &listed {
        assert_eq!(e.tags.len(), 1);
        let tag = &e.tags[0];
        assert!(
            tag.starts_with(&format!("bifrost:api:bifrost:v1:{}:kv:kv-", e.owner)),
            "{tag}"
        );
    }
}

#[tokio::test]
async fn unnamed_endpoint_is_rejected() {
    let service = test_service().await;
    let err = service.create_endpoint(endpoint("", "u1")).await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[tokio::test]
async fn bootstrap_rejects_unknown_isolation_level() {
    let pool = open_pool_in_memory().await.unwrap();
    let config = StoreConfig {
        isolation_level: "snapshot".into(),
        ..StoreConfig::default()
    };
    assert!(bootstrap_with_pool(pool, &config).await.is_err());
}

#[tokio::test]
async fn bootstrap_rejects_unsupported_isolation_level() {
    let pool = open_pool_in_memory().await.unwrap();
    let config = StoreConfig {
        isolation_level: "repeatable-read".into(),
        ..StoreConfig::default()
    };
    let err = bootstrap_with_pool(pool, &config).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::UnsupportedIsolation(_))
    ));
}

#[tokio::test]
async fn custom_realm_flows_into_tags() {
    let pool = open_pool_in_memory().await.unwrap();
    let config = StoreConfig {
        realm: "hackday".into(),
        ..StoreConfig::default()
    };
    let service = EndpointService::new(bootstrap_with_pool(pool, &config).await.unwrap());
    service.create_endpoint(endpoint("a", "u1")).await.unwrap();

    let listed = service.list_endpoints().await.unwrap();
    assert!(listed[0].tags[0].starts_with("hackday:api:"));
}

#[tokio::test]
async fn factory_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        store: StoreConfig {
            database_path: Some(dir.path().join("bifrost.db")),
            ..StoreConfig::default()
        },
    };

    let service = ServiceFactory::create(&config).await.unwrap();
    service.create_endpoint(endpoint("kept", "u1")).await.unwrap();
    drop(service);

    let service = ServiceFactory::create(&config).await.unwrap();
    let listed = service.list_endpoints().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "kept");
}

#[tokio::test]
async fn commands_write_output() {
    let service = test_service().await;
    let mut out = Vec::new();

    cmd::init(&service, &mut out).unwrap();
    cmd::list_endpoints(&service, &mut out).await.unwrap();
    cmd::create_endpoint(&service, "demo", "u1", &mut out)
        .await
        .unwrap();
    cmd::list_endpoints(&service, &mut out).await.unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Schema ready: bifrost_v1_key_value");
    assert_eq!(lines[1], "No endpoints");
    assert_eq!(lines[2], "u1 is a winner");
    assert!(lines[3].starts_with("demo\tu1\tbifrost:api:"));
}
