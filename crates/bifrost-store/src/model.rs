//! Record trait, the stored row shape, and the built-in models.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::error::StoreError;
use crate::id::ResourceId;
use crate::registry::{
    ModelDescriptor, ModelMetadata, PackageMetadata, SchemaRegistry, TypeDefinition,
};
use crate::version::Version;

/// Package every built-in model belongs to.
pub const PACKAGE_NAME: &str = "bifrost";

/// A logical record type that can be stored in an envelope.
///
/// Ownership is explicit: every record names its owner, and the owner ends
/// up in both the `owner_id` column and the generated resource tag.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Short type name; lowercased it becomes the storage key prefix.
    const NAME: &'static str;

    /// Dotted package the type belongs to, e.g. `"bifrost.v1"`.
    const PACKAGE: &'static str;

    fn owner(&self) -> &str;

    /// Tags collection that reads extend with the row's resource tag.
    fn tags_mut(&mut self) -> &mut Vec<String>;

    /// Fully qualified type tag recorded in envelopes.
    fn type_tag() -> String {
        format!("{}.{}", Self::PACKAGE, Self::NAME)
    }
}

/// A named tunnel endpoint registered with the control service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Record for Endpoint {
    const NAME: &'static str = "Endpoint";
    const PACKAGE: &'static str = "bifrost.v1";

    fn owner(&self) -> &str {
        &self.owner
    }

    fn tags_mut(&mut self) -> &mut Vec<String> {
        &mut self.tags
    }
}

/// One key-value row as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub key: String,
    pub value: Envelope,
    pub owner_id: String,
    pub resource_tag: ResourceId,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Raw row as it comes back from `SQLite`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct KeyValueRow {
    pub key: String,
    pub value: String,
    pub owner_id: String,
    pub resource_tag: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<KeyValueRow> for StoredRecord {
    type Error = StoreError;

    fn try_from(row: KeyValueRow) -> Result<Self, Self::Error> {
        let value: Envelope = serde_json::from_str(&row.value).map_err(|e| {
            StoreError::Validation(format!("row {} holds a malformed envelope: {e}", row.key))
        })?;
        Ok(Self {
            resource_tag: ResourceId::parse(&row.resource_tag)?,
            key: row.key,
            value,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Package metadata for the built-in models, versioned with this crate.
pub fn package_metadata() -> Result<PackageMetadata, StoreError> {
    Ok(PackageMetadata::new(
        PACKAGE_NAME,
        Version::parse(env!("CARGO_PKG_VERSION"))?,
    ))
}

/// Register the built-in model hierarchy and return the key-value model.
///
/// `PkgBaseModel` is an abstract base carrying the package metadata;
/// `KeyValue` inherits it and names the shared table.
pub fn register_builtin_models(
    registry: &mut SchemaRegistry,
    package: PackageMetadata,
) -> Result<Arc<ModelDescriptor>, StoreError> {
    registry.register_base(TypeDefinition::new("PkgBaseModel").package(package))?;
    registry.register_type(
        TypeDefinition::new("KeyValue")
            .extends("PkgBaseModel")
            .model(ModelMetadata::new("key_value", "kv")),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_type_tag() {
        assert_eq!(Endpoint::type_tag(), "bifrost.v1.Endpoint");
    }

    #[test]
    fn builtin_key_value_table() {
        let mut registry = SchemaRegistry::new();
        let pkg = PackageMetadata::new("bifrost", Version::parse("1.0.0").unwrap());
        let kv = register_builtin_models(&mut registry, pkg).unwrap();
        assert_eq!(kv.table_name(), "bifrost_v1_key_value");
        assert_eq!(kv.model().resource_type, "kv");
    }

    #[test]
    fn crate_package_metadata_parses() {
        let pkg = package_metadata().unwrap();
        assert_eq!(pkg.package, "bifrost");
        assert!(!pkg.version.major.is_empty());
    }

    #[test]
    fn row_with_bad_tag_is_rejected() {
        let row = KeyValueRow {
            key: "endpoint-a".into(),
            value: r#"{"@type":"bifrost.v1.Endpoint","payload":{}}"#.into(),
            owner_id: "u1".into(),
            resource_tag: "not-a-tag".into(),
            created_at: 0,
            updated_at: 0,
        };
        assert!(matches!(
            StoredRecord::try_from(row),
            Err(StoreError::Format(_))
        ));
    }
}
