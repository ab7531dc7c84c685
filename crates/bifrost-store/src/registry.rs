//! Schema registry: versioned table naming for logical record types.
//!
//! Every concrete type is registered once at startup. Registration resolves
//! its package metadata (declared directly or inherited from the nearest
//! registered ancestor), validates its model metadata, and computes the
//! physical table name `{package}_v{major}_{table}`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::StoreError;
use crate::id::{ResourceId, ResourceIdScheme, generate_short_id};
use crate::version::Version;

/// Package name and version shared by a family of types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    pub package: String,
    pub version: Version,
}

impl PackageMetadata {
    pub fn new(package: impl Into<String>, version: Version) -> Self {
        Self {
            package: package.into(),
            version,
        }
    }
}

/// Logical table and resource-type tag of one concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMetadata {
    pub table: String,
    pub resource_type: String,
}

impl ModelMetadata {
    pub fn new(table: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            resource_type: resource_type.into(),
        }
    }
}

/// Extra, type-specific column. Created nullable; the envelope store does
/// not populate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }
}

/// Declaration of a logical type, built up before registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    name: String,
    parent: Option<String>,
    package: Option<PackageMetadata>,
    model: Option<ModelMetadata>,
    columns: Vec<ColumnDef>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            package: None,
            model: None,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn package(mut self, package: PackageMetadata) -> Self {
        self.package = Some(package);
        self
    }

    #[must_use]
    pub fn model(mut self, model: ModelMetadata) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Validated, immutable result of registering a concrete type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    name: String,
    table_name: String,
    package: PackageMetadata,
    model: ModelMetadata,
    columns: Vec<ColumnDef>,
}

impl ModelDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub const fn package(&self) -> &PackageMetadata {
        &self.package
    }

    pub const fn model(&self) -> &ModelMetadata {
        &self.model
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Generate the resource tag for a row about to be inserted.
    ///
    /// `owner_id` is the row's own, not yet committed, owner column.
    pub fn generate_resource_tag(
        &self,
        scheme: &ResourceIdScheme,
        owner_id: &str,
    ) -> Result<ResourceId, StoreError> {
        let resource_type = &self.model.resource_type;
        scheme.resource_id(
            &self.package.package,
            &format!("v{}", self.package.version.major),
            owner_id,
            resource_type,
            &format!("{resource_type}-{}", generate_short_id()),
        )
    }

    /// Idempotent DDL for this model's table and its resource tag index.
    pub fn create_table_sql(&self) -> Vec<String> {
        let table = &self.table_name;
        let extra: String = self
            .columns
            .iter()
            .map(|c| format!(",\n    {} {}", c.name, c.sql_type))
            .collect();

        vec![
            format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n    \
                 key TEXT PRIMARY KEY NOT NULL CHECK (length(key) <= 2048),\n    \
                 value TEXT NOT NULL,\n    \
                 owner_id TEXT NOT NULL,\n    \
                 resource_tag TEXT NOT NULL CHECK (length(resource_tag) <= 4096),\n    \
                 created_at INTEGER NOT NULL,\n    \
                 updated_at INTEGER NOT NULL{extra}\n)"
            ),
            format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS ix_{table}_resource_tag ON {table} (resource_tag)"
            ),
        ]
    }
}

/// Physical table name for a package, major version and logical table.
pub fn table_name(package: &str, major: &str, table: &str) -> String {
    format!("{package}_v{major}_{table}").to_lowercase()
}

/// Table and column names are interpolated into DDL, so they are limited
/// to ASCII identifiers.
fn check_identifier(kind: &str, ident: &str) -> Result<(), StoreError> {
    let mut chars = ident.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(StoreError::Validation(format!(
            "{kind} {ident:?} is not a valid SQL identifier"
        )))
    }
}

/// Column types a registered type may declare; `SQLite` storage classes.
const COLUMN_TYPES: [&str; 4] = ["TEXT", "INTEGER", "REAL", "BLOB"];

const RESERVED_COLUMNS: [&str; 6] = [
    "key",
    "value",
    "owner_id",
    "resource_tag",
    "created_at",
    "updated_at",
];

#[derive(Debug, Clone)]
struct Entry {
    definition: TypeDefinition,
    is_abstract: bool,
    descriptor: Option<Arc<ModelDescriptor>>,
}

/// Registry of logical types, filled once at startup.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: BTreeMap<String, Entry>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an abstract base type.
    ///
    /// Bases carry package metadata for their descendants and produce no
    /// table, so model metadata is optional.
    pub fn register_base(&mut self, definition: TypeDefinition) -> Result<(), StoreError> {
        if self.check_existing(&definition, true)?.is_some() {
            return Ok(());
        }
        if let Some(parent) = &definition.parent {
            self.require_known(&definition.name, parent)?;
        }

        debug!(name = %definition.name, "Registered base type");
        self.entries.insert(
            definition.name.clone(),
            Entry {
                definition,
                is_abstract: true,
                descriptor: None,
            },
        );
        Ok(())
    }

    /// Register a concrete type and compute its table name.
    ///
    /// Registering an identical definition again returns the cached
    /// descriptor; a different definition under the same name is rejected.
    pub fn register_type(
        &mut self,
        definition: TypeDefinition,
    ) -> Result<Arc<ModelDescriptor>, StoreError> {
        if let Some(descriptor) = self
            .check_existing(&definition, false)?
            .and_then(|e| e.descriptor.clone())
        {
            return Ok(descriptor);
        }

        let name = definition.name.clone();
        let model = definition.model.clone().ok_or_else(|| {
            StoreError::MissingRegistryEntry(format!("model metadata for type {name}"))
        })?;
        let package = self.resolve_package(&definition)?;

        check_identifier("package", &package.package)?;
        check_identifier("table", &model.table)?;
        if model.resource_type.is_empty() {
            return Err(StoreError::Validation(format!(
                "type {name} declares an empty resource type"
            )));
        }
        for column in &definition.columns {
            check_identifier("column", &column.name)?;
            if RESERVED_COLUMNS.contains(&column.name.to_lowercase().as_str()) {
                return Err(StoreError::Validation(format!(
                    "type {name} redeclares built-in column {}",
                    column.name
                )));
            }
            if !COLUMN_TYPES
                .iter()
                .any(|t| t.eq_ignore_ascii_case(&column.sql_type))
            {
                return Err(StoreError::Validation(format!(
                    "column {} has unsupported type {:?}",
                    column.name, column.sql_type
                )));
            }
        }

        let descriptor = Arc::new(ModelDescriptor {
            table_name: table_name(&package.package, &package.version.major, &model.table),
            name: name.clone(),
            package,
            model,
            columns: definition.columns.clone(),
        });
        for entry in self.entries.values() {
            if let Some(other) = &entry.descriptor {
                if other.table_name == descriptor.table_name {
                    return Err(StoreError::Validation(format!(
                        "types {} and {name} both map to table {}",
                        other.name, other.table_name
                    )));
                }
            }
        }

        debug!(name = %name, table = %descriptor.table_name, "Registered model");
        self.entries.insert(
            name,
            Entry {
                definition,
                is_abstract: false,
                descriptor: Some(Arc::clone(&descriptor)),
            },
        );
        Ok(descriptor)
    }

    /// Descriptor of a registered concrete type.
    pub fn descriptor(&self, name: &str) -> Option<Arc<ModelDescriptor>> {
        self.entries.get(name).and_then(|e| e.descriptor.clone())
    }

    /// All concrete model descriptors, ordered by type name.
    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<ModelDescriptor>> {
        self.entries.values().filter_map(|e| e.descriptor.as_ref())
    }

    /// Looks up a previous registration under the same name.
    ///
    /// `Ok(Some(_))` means the identical definition is already registered.
    fn check_existing(
        &self,
        definition: &TypeDefinition,
        is_abstract: bool,
    ) -> Result<Option<&Entry>, StoreError> {
        let Some(entry) = self.entries.get(&definition.name) else {
            return Ok(None);
        };
        if entry.definition != *definition || entry.is_abstract != is_abstract {
            return Err(StoreError::Validation(format!(
                "type {} is already registered with a different definition",
                definition.name
            )));
        }
        Ok(Some(entry))
    }

    fn require_known(&self, child: &str, parent: &str) -> Result<&Entry, StoreError> {
        self.entries.get(parent).ok_or_else(|| {
            StoreError::MissingRegistryEntry(format!(
                "type {child} extends unregistered type {parent}"
            ))
        })
    }

    /// Explicit declaration wins, then the nearest ancestor that has one.
    fn resolve_package(&self, definition: &TypeDefinition) -> Result<PackageMetadata, StoreError> {
        if let Some(package) = &definition.package {
            return Ok(package.clone());
        }

        let mut current = definition;
        while let Some(parent) = &current.parent {
            let entry = self.require_known(&current.name, parent)?;
            if let Some(package) = &entry.definition.package {
                return Ok(package.clone());
            }
            current = &entry.definition;
        }

        Err(StoreError::MissingRegistryEntry(format!(
            "package metadata for type {} or any of its base types",
            definition.name
        )))
    }
}
