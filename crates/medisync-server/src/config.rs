//! Server configuration.
//!
//! Sources, later wins: built-in defaults, the TOML file named by
//! `MEDISYNC_CONFIG`, then `MEDISYNC_BIND` / `MEDISYNC_DB`.

use std::path::{Path, PathBuf};

use medisync_core::config::{ConfigError, ConfigResult};
use medisync_core::ImportConfig;
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH_VAR: &str = "MEDISYNC_CONFIG";
pub const BIND_VAR: &str = "MEDISYNC_BIND";
pub const DATABASE_VAR: &str = "MEDISYNC_DB";

/// Multipart uploads above this size are rejected.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub max_upload_bytes: usize,
    pub import: ImportConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            database_path: PathBuf::from("medisync.db"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            import: ImportConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: ServerConfig = toml::from_str(s)?;
        config.import.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Build from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = match lookup(CONFIG_PATH_VAR).filter(|p| !p.trim().is_empty()) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(bind) = lookup(BIND_VAR).filter(|v| !v.trim().is_empty()) {
            config.bind_addr = bind;
        }
        if let Some(db) = lookup(DATABASE_VAR).filter(|v| !v.trim().is_empty()) {
            config.database_path = PathBuf::from(db);
        }

        if config.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be at least 1".into(),
            ));
        }
        Ok(config)
    }
}
