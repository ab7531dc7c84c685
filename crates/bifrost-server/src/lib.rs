//! Bifrost Control Service Library
//!
//! - Process bootstrap: pool, model registry, table creation
//! - Endpoint service on top of the envelope store
//! - Command handlers for the `bifrost-server` binary

pub mod bootstrap;
pub mod cmd;
pub mod service;

pub use bootstrap::{bootstrap, bootstrap_with_pool};
pub use service::{EndpointService, ServiceFactory};
