//! Envelope store: put / get / list-by-type over one key-value table.
//!
//! Every operation takes an optional caller session. Without one, the
//! operation opens and closes its own; with one, it runs inside the
//! caller's session and, for `put`, inside the caller's transaction when
//! one is active.

use std::sync::Arc;

use bifrost_core::db::unix_timestamp;
use tracing::{debug, info, warn};

use crate::envelope::{Envelope, pack, unpack};
use crate::error::StoreError;
use crate::id::{MAX_KEY_BYTES, ResourceIdScheme, key_for, prefix_for, storage_key_for};
use crate::model::{KeyValueRow, Record, StoredRecord};
use crate::registry::{ModelDescriptor, SchemaRegistry};
use crate::session::{Session, SessionFactory, SessionScope};

/// Create every registered model's table if it does not exist yet.
pub async fn ensure_schema(
    sessions: &SessionFactory,
    registry: &SchemaRegistry,
) -> Result<(), StoreError> {
    let mut session = sessions.create_session().await?;
    for descriptor in registry.descriptors() {
        for statement in descriptor.create_table_sql() {
            sqlx::query(&statement)
                .execute(session.connection()?)
                .await?;
        }
        info!(table = %descriptor.table_name(), "Ensured table");
    }
    session.close().await
}

/// Typed CRUD surface over the shared key-value table.
///
/// Append/lookup only: there is no update or delete.
#[derive(Debug, Clone)]
pub struct EnvelopeStore {
    sessions: SessionFactory,
    model: Arc<ModelDescriptor>,
    scheme: ResourceIdScheme,
    select_by_key: String,
    select_by_prefix: String,
    insert: String,
}

impl EnvelopeStore {
    pub fn new(
        sessions: SessionFactory,
        model: Arc<ModelDescriptor>,
        scheme: ResourceIdScheme,
    ) -> Self {
        let table = model.table_name();
        let columns = "key, value, owner_id, resource_tag, created_at, updated_at";
        Self {
            select_by_key: format!("SELECT {columns} FROM {table} WHERE key = ?"),
            select_by_prefix: format!(
                "SELECT {columns} FROM {table} WHERE substr(key, 1, length(?)) = ? ORDER BY key"
            ),
            insert: format!("INSERT INTO {table} ({columns}) VALUES (?, ?, ?, ?, ?, ?)"),
            sessions,
            model,
            scheme,
        }
    }

    pub const fn sessions(&self) -> &SessionFactory {
        &self.sessions
    }

    pub fn model(&self) -> &ModelDescriptor {
        &self.model
    }

    pub const fn scheme(&self) -> &ResourceIdScheme {
        &self.scheme
    }

    /// Store `record` under `key` and return the inserted row.
    ///
    /// The storage key is `"{prefix}-{key}"`; an empty `key` gets a
    /// generated id. Exactly one row is inserted. Nothing is retried: a
    /// failed put may be repeated by the caller, and a repeat generates a
    /// different resource tag.
    pub async fn put<T: Record>(
        &self,
        key: &str,
        record: &T,
        session: Option<&mut Session>,
    ) -> Result<StoredRecord, StoreError> {
        let owner_id = record.owner();
        if owner_id.trim().is_empty() {
            return Err(StoreError::Validation(format!(
                "{} record has no owner",
                T::type_tag()
            )));
        }
        let value = pack(record)?;
        let storage_key = key_for::<T>(key)?;

        let mut scope = self.sessions.create_context(session).await?;
        let own_transaction = !scope.in_transaction();
        if own_transaction {
            scope.begin().await?;
        }

        match self.insert_row(&mut scope, storage_key, value, owner_id).await {
            Ok(stored) => {
                if own_transaction {
                    scope.commit().await?;
                }
                debug!(
                    key = %stored.key,
                    resource_tag = %stored.resource_tag,
                    table = %self.model.table_name(),
                    "Record stored"
                );
                Ok(stored)
            }
            Err(e) => {
                if own_transaction {
                    if let Err(rollback_err) = scope.rollback().await {
                        warn!(error = %rollback_err, "Rollback after failed put failed");
                    }
                }
                Err(e)
            }
        }
    }

    /// Look up a record by the key it was put under.
    ///
    /// Returns `Ok(None)` when no row exists, including for keys `put` can
    /// never write (empty or over the size limit). The row's resource tag
    /// is appended to the record's tags.
    pub async fn get<T: Record>(
        &self,
        key: &str,
        session: Option<&mut Session>,
    ) -> Result<Option<T>, StoreError> {
        let storage_key = storage_key_for::<T>(key);
        if key.is_empty() || storage_key.len() > MAX_KEY_BYTES {
            debug!(key_len = key.len(), "Lookup of unwritable key");
            return Ok(None);
        }
        match self.get_record(&storage_key, session).await? {
            Some(stored) => Ok(Some(Self::unpack_tagged(&stored)?)),
            None => Ok(None),
        }
    }

    /// Look up the raw row under an exact storage key.
    pub async fn get_record(
        &self,
        storage_key: &str,
        session: Option<&mut Session>,
    ) -> Result<Option<StoredRecord>, StoreError> {
        let mut scope = self.sessions.create_context(session).await?;
        let row = sqlx::query_as::<_, KeyValueRow>(&self.select_by_key)
            .bind(storage_key)
            .fetch_optional(scope.connection()?)
            .await?;
        debug!(key = storage_key, found = row.is_some(), "Record lookup");
        row.map(StoredRecord::try_from).transpose()
    }

    /// All records of type `T`, ordered by storage key.
    ///
    /// Only rows whose key carries `T`'s prefix are returned; each record's
    /// tags gain its row's resource tag.
    pub async fn list_by_type<T: Record>(
        &self,
        session: Option<&mut Session>,
    ) -> Result<Vec<T>, StoreError> {
        let prefix = format!("{}-", prefix_for::<T>());
        let mut scope = self.sessions.create_context(session).await?;
        let rows = sqlx::query_as::<_, KeyValueRow>(&self.select_by_prefix)
            .bind(&prefix)
            .bind(&prefix)
            .fetch_all(scope.connection()?)
            .await?;
        debug!(prefix = %prefix, count = rows.len(), "Listed records");

        rows.into_iter()
            .map(|row| Self::unpack_tagged(&StoredRecord::try_from(row)?))
            .collect()
    }

    async fn insert_row(
        &self,
        scope: &mut SessionScope<'_>,
        key: String,
        value: Envelope,
        owner_id: &str,
    ) -> Result<StoredRecord, StoreError> {
        let resource_tag = self.model.generate_resource_tag(&self.scheme, owner_id)?;
        let encoded = serde_json::to_string(&value)
            .map_err(|e| StoreError::Validation(format!("cannot encode envelope: {e}")))?;
        let now = unix_timestamp();

        sqlx::query(&self.insert)
            .bind(&key)
            .bind(&encoded)
            .bind(owner_id)
            .bind(resource_tag.to_string())
            .bind(now)
            .bind(now)
            .execute(scope.connection()?)
            .await?;

        Ok(StoredRecord {
            key,
            value,
            owner_id: owner_id.to_string(),
            resource_tag,
            created_at: now,
            updated_at: now,
        })
    }

    fn unpack_tagged<T: Record>(stored: &StoredRecord) -> Result<T, StoreError> {
        let mut record: T = unpack(&stored.value)?;
        record.tags_mut().push(stored.resource_tag.to_string());
        Ok(record)
    }
}
