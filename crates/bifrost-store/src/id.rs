//! Resource identifiers and storage keys.
//!
//! A resource id is seven colon-separated segments:
//! `realm:api_version:service:version:owner:type:id`, for example
//! `bifrost:api:bifrost:v1:u1:ep:ep-3F2A9C01B7D4`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::Record;

pub const SEPARATOR: char = ':';
pub const SEGMENT_COUNT: usize = 7;

/// Random bytes in a short id; rendered as twice as many hex characters.
pub const UID_BYTES_SIZE: usize = 6;

/// Upper bound on a storage key, enforced before insert.
pub const MAX_KEY_BYTES: usize = 2 * 1024;

/// Structured, globally-addressable record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    segments: [String; SEGMENT_COUNT],
}

impl ResourceId {
    /// Build an id from its seven segments.
    ///
    /// Every segment must be non-empty and free of the separator.
    pub fn from_segments(segments: [String; SEGMENT_COUNT]) -> Result<Self, StoreError> {
        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(StoreError::Format(format!("segment {i} is empty")));
            }
            if segment.contains(SEPARATOR) {
                return Err(StoreError::Format(format!(
                    "segment {i} ({segment:?}) contains '{SEPARATOR}'"
                )));
            }
        }
        Ok(Self { segments })
    }

    /// Parse the serialized form. Exact inverse of `Display`.
    pub fn parse(s: &str) -> Result<Self, StoreError> {
        let separators = s.matches(SEPARATOR).count();
        if separators != SEGMENT_COUNT - 1 {
            return Err(StoreError::Format(format!(
                "expected {} separators, found {separators} in {s:?}",
                SEGMENT_COUNT - 1
            )));
        }

        let mut segments: [String; SEGMENT_COUNT] = Default::default();
        for (slot, part) in segments.iter_mut().zip(s.split(SEPARATOR)) {
            part.clone_into(slot);
        }
        Self::from_segments(segments)
    }

    pub fn realm(&self) -> &str {
        &self.segments[0]
    }

    pub fn api_version(&self) -> &str {
        &self.segments[1]
    }

    pub fn service(&self) -> &str {
        &self.segments[2]
    }

    pub fn version(&self) -> &str {
        &self.segments[3]
    }

    pub fn owner(&self) -> &str {
        &self.segments[4]
    }

    pub fn resource_type(&self) -> &str {
        &self.segments[5]
    }

    pub fn id(&self) -> &str {
        &self.segments[6]
    }

    pub fn segments(&self) -> &[String; SEGMENT_COUNT] {
        &self.segments
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join(":"))
    }
}

impl FromStr for ResourceId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}

/// Deployment-wide realm and api-version segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdScheme {
    realm: String,
    api_version: String,
}

impl ResourceIdScheme {
    pub fn new(realm: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            realm: realm.into(),
            api_version: api_version.into(),
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Build an id under this scheme from the five per-record segments.
    pub fn resource_id(
        &self,
        service: &str,
        version: &str,
        owner: &str,
        resource_type: &str,
        id: &str,
    ) -> Result<ResourceId, StoreError> {
        ResourceId::from_segments([
            self.realm.clone(),
            self.api_version.clone(),
            service.to_string(),
            version.to_string(),
            owner.to_string(),
            resource_type.to_string(),
            id.to_string(),
        ])
    }

    /// Parse an id and require it to belong to this deployment.
    pub fn parse(&self, s: &str) -> Result<ResourceId, StoreError> {
        let id = ResourceId::parse(s)?;
        if id.realm() != self.realm || id.api_version() != self.api_version {
            return Err(StoreError::Format(format!(
                "{s:?} is not under {}:{}",
                self.realm, self.api_version
            )));
        }
        Ok(id)
    }
}

impl Default for ResourceIdScheme {
    fn default() -> Self {
        Self::new("bifrost", "api")
    }
}

/// Fixed-width random suffix: 6 random bytes as 12 uppercase hex chars.
///
/// Uniqueness is only birthday-bound; ids combine it with type, owner and
/// version segments.
pub fn generate_short_id() -> String {
    let bytes: [u8; UID_BYTES_SIZE] = rand::random();
    hex::encode_upper(bytes)
}

/// Lowercase lookup prefix for a record type.
pub fn prefix_for<T: Record>() -> String {
    T::NAME.to_lowercase()
}

/// Storage key under which `key` is looked up for type `T`.
///
/// Unlike [`key_for`] this neither generates ids nor checks the size limit.
pub fn storage_key_for<T: Record>(key: &str) -> String {
    format!("{}-{key}", prefix_for::<T>())
}

/// Storage key for a record of type `T`: `"{prefix}-{key}"`.
///
/// An empty `key` gets a generated short id instead.
pub fn key_for<T: Record>(key: &str) -> Result<String, StoreError> {
    let storage_key = if key.is_empty() {
        storage_key_for::<T>(&generate_short_id())
    } else {
        storage_key_for::<T>(key)
    };
    if storage_key.len() > MAX_KEY_BYTES {
        return Err(StoreError::Validation(format!(
            "key is {} bytes, limit is {MAX_KEY_BYTES}",
            storage_key.len()
        )));
    }
    Ok(storage_key)
}
