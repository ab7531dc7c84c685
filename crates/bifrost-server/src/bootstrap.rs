//! Process bootstrap.
//!
//! Registers the built-in models once, opens the pool, and makes sure every
//! registered table exists before the store is handed out.

use anyhow::Context;
use sqlx::{Pool, Sqlite};
use tracing::info;

use bifrost_core::StoreConfig;
use bifrost_core::db::open_pool;
use bifrost_store::model::{package_metadata, register_builtin_models};
use bifrost_store::store::ensure_schema;
use bifrost_store::{
    EnvelopeStore, IsolationLevel, ResourceIdScheme, SchemaRegistry, SessionFactory,
};

/// Open the configured database and return a ready store.
pub async fn bootstrap(config: &StoreConfig) -> anyhow::Result<EnvelopeStore> {
    let path = config.resolved_database_path()?;
    info!(path = %path.display(), "Opening bifrost database");
    let pool = open_pool(&path, config).await?;
    bootstrap_with_pool(pool, config).await
}

/// Build a ready store over an existing pool.
///
/// Isolation level and registry problems surface here, at startup, rather
/// than on the first request.
pub async fn bootstrap_with_pool(
    pool: Pool<Sqlite>,
    config: &StoreConfig,
) -> anyhow::Result<EnvelopeStore> {
    let isolation: IsolationLevel = config
        .isolation_level
        .parse()
        .context("invalid store.isolation_level")?;

    let mut registry = SchemaRegistry::new();
    let key_value = register_builtin_models(&mut registry, package_metadata()?)
        .context("failed to register built-in models")?;

    let sessions = SessionFactory::new(pool, isolation);
    // Opening one session up front rejects an unsupported isolation level.
    sessions.create_session().await?.close().await?;
    ensure_schema(&sessions, &registry).await?;

    info!(
        table = %key_value.table_name(),
        isolation = %isolation,
        "Store ready"
    );
    Ok(EnvelopeStore::new(
        sessions,
        key_value,
        ResourceIdScheme::new(&config.realm, &config.api_version),
    ))
}
