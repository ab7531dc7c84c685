//! `Bifrost` Core Library
//!
//! Shared functionality for `Bifrost` components:
//! - Configuration resolution and hierarchy
//! - `SQLite` connection pool helpers
//! - Tracing initialization
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::{Config, StoreConfig};
pub use error::{Error, Result};
