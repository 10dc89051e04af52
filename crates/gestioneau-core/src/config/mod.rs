//! Configuration management with file persistence
//!
//! Settings live in `config.toml` under the config directory and can be
//! overridden by `GESTIONEAU_*` environment variables.

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::page::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::storage::{DatabaseConfig, default_database_path, default_search_path};

/// Environment variables that override file settings
pub const ENV_CONFIG_DIR: &str = "GESTIONEAU_CONFIG_DIR";
pub const ENV_DATABASE_PATH: &str = "GESTIONEAU_DATABASE_PATH";
pub const ENV_SEARCH_PATH: &str = "GESTIONEAU_SEARCH_PATH";
pub const ENV_HOST: &str = "GESTIONEAU_HOST";
pub const ENV_PORT: &str = "GESTIONEAU_PORT";

/// Gestioneau configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: StoreConfig,
    pub search: StoreConfig,
    pub application: ApplicationConfig,
    pub paging: PagingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// One SQLite file: the relational store or the search mirror
///
/// An omitted `path` is resolved to the store's default location on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Name used in alert headers (`X-{name}-alert`)
    pub name: String,
    /// Prefix of entity names in alert messages (`gestioneauProvince`)
    pub entity_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagingConfig {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: StoreConfig {
                path: default_database_path(),
                max_connections: 5,
            },
            search: StoreConfig {
                path: default_search_path(),
                max_connections: 2,
            },
            application: ApplicationConfig::default(),
            paging: PagingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            max_connections: 5,
        }
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "gestioneauApp".to_string(),
            entity_prefix: "gestioneau".to_string(),
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_PAGE_SIZE,
            max_size: MAX_PAGE_SIZE,
        }
    }
}

impl StoreConfig {
    fn or_path(&mut self, default: impl FnOnce() -> PathBuf) {
        if self.path.as_os_str().is_empty() {
            self.path = default();
        }
    }

    /// Pool settings for this store
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::with_path(&self.path).max_connections(self.max_connections)
    }
}

/// Every key accepted by [`Config::get`] and [`Config::set`]
pub const KEYS: &[&str] = &[
    "server.host",
    "server.port",
    "database.path",
    "database.max_connections",
    "search.path",
    "search.max_connections",
    "application.name",
    "application.entity_prefix",
    "paging.default_size",
    "paging.max_size",
];

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(ENV_CONFIG_DIR) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("gestioneau")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load the config file (defaults if absent), then apply the environment
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.resolve_store_paths();
        config.validate()?;
        Ok(config)
    }

    fn resolve_store_paths(&mut self) {
        self.database.or_path(default_database_path);
        self.search.or_path(default_search_path);
    }

    /// Save configuration to the config directory
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        let overrides = [
            (ENV_DATABASE_PATH, "database.path"),
            (ENV_SEARCH_PATH, "search.path"),
            (ENV_HOST, "server.host"),
            (ENV_PORT, "server.port"),
        ];
        for (var, key) in overrides {
            if let Some(value) = lookup(var) {
                self.set(key, &value)
                    .with_context(|| format!("Invalid value in {}", var))?;
            }
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must not be 0"));
        }
        if self.database.max_connections == 0 || self.search.max_connections == 0 {
            return Err(anyhow!("max_connections must be at least 1"));
        }
        if self.database.path == self.search.path {
            return Err(anyhow!(
                "database.path and search.path must be different files"
            ));
        }
        if self.application.name.trim().is_empty() {
            return Err(anyhow!("application.name must not be empty"));
        }
        if self.paging.max_size == 0 {
            return Err(anyhow!("paging.max_size must be at least 1"));
        }
        if self.paging.default_size == 0 || self.paging.default_size > self.paging.max_size {
            return Err(anyhow!(
                "paging.default_size must be between 1 and paging.max_size ({})",
                self.paging.max_size
            ));
        }
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "server.host" => Ok(self.server.host.clone()),
            "server.port" => Ok(self.server.port.to_string()),
            "database.path" => Ok(self.database.path.display().to_string()),
            "database.max_connections" => Ok(self.database.max_connections.to_string()),
            "search.path" => Ok(self.search.path.display().to_string()),
            "search.max_connections" => Ok(self.search.max_connections.to_string()),
            "application.name" => Ok(self.application.name.clone()),
            "application.entity_prefix" => Ok(self.application.entity_prefix.clone()),
            "paging.default_size" => Ok(self.paging.default_size.to_string()),
            "paging.max_size" => Ok(self.paging.max_size.to_string()),
            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `gestioneau config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> anyhow::Result<T> {
            value
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid {} value: {}", key, value))
        }

        match key {
            "server.host" => self.server.host = value.to_string(),
            "server.port" => self.server.port = number(key, value)?,
            "database.path" => self.database.path = PathBuf::from(value),
            "database.max_connections" => self.database.max_connections = number(key, value)?,
            "search.path" => self.search.path = PathBuf::from(value),
            "search.max_connections" => self.search.max_connections = number(key, value)?,
            "application.name" => self.application.name = value.to_string(),
            "application.entity_prefix" => self.application.entity_prefix = value.to_string(),
            "paging.default_size" => self.paging.default_size = number(key, value)?,
            "paging.max_size" => self.paging.max_size = number(key, value)?,
            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `gestioneau config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }
}
