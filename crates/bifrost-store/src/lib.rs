//! Bifrost persistence layer.
//!
//! A generic key-value store that multiplexes arbitrary typed records onto
//! one physical table per registered model:
//! - [`id`]: colon-delimited resource identifiers
//! - [`registry`]: versioned table naming and metadata validation
//! - [`envelope`]: type-tagged structural encoding of records
//! - [`session`]: scoped transactional handles with isolation levels
//! - [`store`]: put / get / list-by-type

pub mod envelope;
pub mod error;
pub mod id;
pub mod model;
pub mod registry;
pub mod session;
pub mod store;
pub mod version;

pub use envelope::Envelope;
pub use error::{Result, StoreError};
pub use id::{ResourceId, ResourceIdScheme};
pub use model::{Endpoint, Record, StoredRecord};
pub use registry::{
    ModelDescriptor, ModelMetadata, PackageMetadata, SchemaRegistry, TypeDefinition,
};
pub use session::{IsolationLevel, Session, SessionFactory, SessionScope, SessionState};
pub use store::EnvelopeStore;
pub use version::Version;
