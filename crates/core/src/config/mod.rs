//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHUTTER_*)
//! 2. TOML config file (if SHUTTER_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::store::photos::SCHEMA_VERSION;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHUTTER_*)
/// 2. TOML config file (if SHUTTER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite photo database.
    ///
    /// Set via SHUTTER_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Path to the SQLite asset cache database.
    ///
    /// Set via SHUTTER_CACHE_DB_PATH environment variable.
    #[serde(default = "default_cache_db_path")]
    pub cache_db_path: PathBuf,

    /// Origin the application's assets are served from. Relative asset paths
    /// resolve against it and only responses from it are cached.
    ///
    /// Set via SHUTTER_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Name of the current cache generation. Changing it forces every
    /// client to re-download the asset list.
    ///
    /// Set via SHUTTER_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Assets that must be cached for the application to work offline.
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,

    /// Photo schema version to open the store with.
    ///
    /// Set via SHUTTER_SCHEMA_VERSION environment variable.
    #[serde(default = "default_schema_version")]
    pub schema_version: i64,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SHUTTER_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to accept per response.
    ///
    /// Set via SHUTTER_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via SHUTTER_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shutter-photos.sqlite")
}

fn default_cache_db_path() -> PathBuf {
    PathBuf::from("./shutter-assets.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_cache_name() -> String {
    "shutter-v1".into()
}

fn default_assets() -> Vec<String> {
    [".", "index.html", "app.js", "manifest.json", "icon-192.png", "icon-512.png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_schema_version() -> i64 {
    SCHEMA_VERSION
}

fn default_user_agent() -> String {
    "shutter/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_db_path: default_cache_db_path(),
            origin: default_origin(),
            cache_name: default_cache_name(),
            assets: default_assets(),
            schema_version: default_schema_version(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHUTTER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHUTTER_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
