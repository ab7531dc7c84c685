//! Configuration resolution for Bifrost.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`<config dir>/bifrost/settings.json`)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables
//! 5. CLI arguments (applied by the binary, highest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Bifrost configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
}

/// Persistence layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `SQLite` database file. `None` resolves to [`database_path`].
    pub database_path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
    /// One of `read-uncommitted`, `read-committed`, `repeatable-read`,
    /// `serializable`, `engine-default`.
    pub isolation_level: String,
    /// Leading resource id segment, fixed per deployment.
    pub realm: String,
    /// Second resource id segment, fixed per deployment.
    pub api_version: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            max_connections: 5,
            busy_timeout_secs: 5,
            isolation_level: "engine-default".to_string(),
            realm: "bifrost".to_string(),
            api_version: "api".to_string(),
        }
    }
}

impl StoreConfig {
    /// The configured database path, or the platform default.
    pub fn resolved_database_path(&self) -> Result<PathBuf> {
        self.database_path
            .clone()
            .or_else(database_path)
            .ok_or_else(|| Error::Config("Cannot determine database path".to_string()))
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config = load_config_file(&global_path)?;
        }
    }

    if let Some(path) = explicit {
        config = load_config_file(path)?;
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("bifrost").join("settings.json"))
}

/// Get the default database path.
pub fn database_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("bifrost").join("bifrost.db"))
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("BIFROST_DATABASE_PATH") {
        config.store.database_path = Some(PathBuf::from(val));
    }
    if let Some(val) = var("BIFROST_MAX_CONNECTIONS") {
        if let Ok(n) = val.parse() {
            config.store.max_connections = n;
        }
    }
    if let Some(val) = var("BIFROST_BUSY_TIMEOUT_SECS") {
        if let Ok(n) = val.parse() {
            config.store.busy_timeout_secs = n;
        }
    }
    if let Some(val) = var("BIFROST_ISOLATION_LEVEL") {
        config.store.isolation_level = val;
    }
    if let Some(val) = var("BIFROST_REALM") {
        config.store.realm = val;
    }
    if let Some(val) = var("BIFROST_API_VERSION") {
        config.store.api_version = val;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_store_config() {
        let config = Config::default();
        assert_eq!(config.store.realm, "bifrost");
        assert_eq!(config.store.api_version, "api");
        assert_eq!(config.store.isolation_level, "engine-default");
        assert_eq!(config.store.max_connections, 5);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"store": {"realm": "hackday"}}"#).unwrap();

        let config = load_config_file(&path).unwrap();
        assert_eq!(config.store.realm, "hackday");
        assert_eq!(config.store.api_version, "api");
        assert_eq!(config.store.busy_timeout_secs, 5);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BIFROST_DATABASE_PATH", "/tmp/bifrost-test.db"),
            ("BIFROST_MAX_CONNECTIONS", "9"),
            ("BIFROST_ISOLATION_LEVEL", "serializable"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(ToString::to_string));

        assert_eq!(
            config.store.database_path,
            Some(PathBuf::from("/tmp/bifrost-test.db"))
        );
        assert_eq!(config.store.max_connections, 9);
        assert_eq!(config.store.isolation_level, "serializable");
        assert_eq!(config.store.realm, "bifrost");
    }

    #[test]
    fn env_overrides_cover_scheme_and_timeout() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("BIFROST_REALM", "hackday"),
            ("BIFROST_API_VERSION", "api2"),
            ("BIFROST_BUSY_TIMEOUT_SECS", "30"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(ToString::to_string));

        assert_eq!(config.store.realm, "hackday");
        assert_eq!(config.store.api_version, "api2");
        assert_eq!(config.store.busy_timeout_secs, 30);
    }

    #[test]
    fn unparsable_env_number_is_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| {
            matches!(k, "BIFROST_MAX_CONNECTIONS" | "BIFROST_BUSY_TIMEOUT_SECS")
                .then(|| "many".to_string())
        });
        assert_eq!(config.store.max_connections, 5);
        assert_eq!(config.store.busy_timeout_secs, 5);
    }
}
