//! Configuration management for salescache

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Warehouse connection settings
    #[serde(default)]
    pub warehouse: WarehouseConfig,

    /// Cache behavior settings
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Warehouse connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Base URL of the warehouse service, e.g. `https://dbc-xyz.cloud.example.com`
    #[serde(default)]
    pub host: String,

    /// Warehouse identifier the statements run on
    #[serde(default)]
    pub warehouse_id: String,

    /// Access token for bearer auth
    #[serde(default)]
    pub token: String,

    /// Request timeout for a statement round trip, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            warehouse_id: String::new(),
            token: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Cache behavior settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default TTL for cached results, in seconds
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Optional ceiling on stored entries; oldest-created evicted first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,

    /// Context tag separating this report's entries from other reports
    #[serde(default = "default_context")]
    pub context: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            max_entries: None,
            context: default_context(),
        }
    }
}

fn default_ttl_secs() -> u64 {
    30 * 60
}

fn default_context() -> String {
    "sales".to_string()
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;
        Ok(home.join(".salescache").join("config.yaml"))
    }

    /// Load configuration from the default path, then apply env overrides
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        std::fs::write(path, contents)?;

        // The token lives in this file
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Environment variables win over the config file
    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("SALESCACHE_HOST") {
            self.warehouse.host = host;
        }
        if let Ok(id) = std::env::var("SALESCACHE_WAREHOUSE_ID") {
            self.warehouse.warehouse_id = id;
        }
        if let Ok(token) = std::env::var("SALESCACHE_TOKEN") {
            self.warehouse.token = token;
        }
    }

    /// Validate that a warehouse connection is actually configured
    pub fn validate_warehouse(&self) -> Result<()> {
        if self.warehouse.host.is_empty() {
            return Err(ConfigError::MissingHost.into());
        }
        if self.warehouse.token.is_empty() {
            return Err(ConfigError::MissingToken.into());
        }
        Ok(())
    }
}
