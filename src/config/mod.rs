//! Configuration

use crate::tracking::TrackingOptions;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration for the task manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which storage backend to use
    pub storage_backend: BackendKind,

    /// SQLite database file
    pub database_path: String,

    /// JSON file used by the key-value backend
    pub kv_path: String,

    /// Keep a JSON snapshot of the SQLite collection
    pub enable_mirror: bool,

    /// JSON file holding the snapshot
    pub mirror_path: String,

    /// Preferred delay between position fixes, in milliseconds
    pub tracking_interval_ms: u64,

    /// Lower bound on the delay between position fixes, in milliseconds
    pub tracking_fastest_interval_ms: u64,

    /// Delay between tracking notifications, in seconds
    pub notification_interval_secs: u64,

    /// Ask the position source for high accuracy fixes
    pub high_accuracy: bool,
}

/// Storage backend types supported by the task manager
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite when it opens, otherwise the key-value file, otherwise memory
    #[default]
    Auto,
    /// Embedded SQLite database
    #[serde(alias = "sqlite3")]
    Sqlite,
    /// JSON key-value file
    #[serde(alias = "kv")]
    KeyValue,
    /// In-memory key-value store (non-persistent)
    Memory,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_backend: BackendKind::Auto,
            database_path: "tasks.db".to_string(),
            kv_path: "tasks.kv.json".to_string(),
            enable_mirror: true,
            mirror_path: "tasks.cache.json".to_string(),
            tracking_interval_ms: 5000,
            tracking_fastest_interval_ms: 2000,
            notification_interval_secs: 60,
            high_accuracy: true,
        }
    }
}

impl Config {
    /// Load configuration from file, environment variables, or defaults
    pub fn load() -> crate::Result<Self> {
        if let Ok(config_path) = env::var("TASK_MANAGER_CONFIG") {
            info!("Loading config from TASK_MANAGER_CONFIG: {}", config_path);
            return Self::from_file(&config_path);
        }

        let default_paths = [
            "config.yaml",
            "config.toml",
            "config/config.yaml",
            "config/config.toml",
        ];

        for path in default_paths {
            if Path::new(path).exists() {
                info!("Loading config from: {}", path);
                return Self::from_file(path);
            }
        }

        if let Ok(config) = Self::from_env() {
            info!("Loaded config from environment variables");
            return Ok(config);
        }

        warn!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a file (YAML or TOML)
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .map_err(|e| {
                crate::TaskManagerError::ConfigError(format!("Failed to load config file: {}", e))
            })?;

        let config: Config = settings.try_deserialize().map_err(|e| {
            crate::TaskManagerError::ConfigError(format!("Failed to parse config: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Self::default();
        let mut found_any = false;

        if let Ok(val) = env::var("TASK_MANAGER_STORAGE_BACKEND") {
            config.storage_backend = match val.to_lowercase().as_str() {
                "auto" => BackendKind::Auto,
                "sqlite" | "sqlite3" => BackendKind::Sqlite,
                "keyvalue" | "kv" => BackendKind::KeyValue,
                "memory" => BackendKind::Memory,
                _ => {
                    return Err(crate::TaskManagerError::ConfigError(format!(
                        "Invalid STORAGE_BACKEND: {}",
                        val
                    )))
                }
            };
            found_any = true;
        }

        for (name, field) in [
            ("TASK_MANAGER_DATABASE_PATH", &mut config.database_path),
            ("TASK_MANAGER_KV_PATH", &mut config.kv_path),
            ("TASK_MANAGER_MIRROR_PATH", &mut config.mirror_path),
        ] {
            if let Ok(val) = env::var(name) {
                *field = val;
                found_any = true;
            }
        }

        if let Ok(val) = env::var("TASK_MANAGER_ENABLE_MIRROR") {
            config.enable_mirror = val.parse().map_err(|e| {
                crate::TaskManagerError::ConfigError(format!("Invalid ENABLE_MIRROR: {}", e))
            })?;
            found_any = true;
        }

        if let Ok(val) = env::var("TASK_MANAGER_TRACKING_INTERVAL_MS") {
            config.tracking_interval_ms = val.parse().map_err(|e| {
                crate::TaskManagerError::ConfigError(format!("Invalid TRACKING_INTERVAL_MS: {}", e))
            })?;
            found_any = true;
        }

        if let Ok(val) = env::var("TASK_MANAGER_TRACKING_FASTEST_INTERVAL_MS") {
            config.tracking_fastest_interval_ms = val.parse().map_err(|e| {
                crate::TaskManagerError::ConfigError(format!(
                    "Invalid TRACKING_FASTEST_INTERVAL_MS: {}",
                    e
                ))
            })?;
            found_any = true;
        }

        if let Ok(val) = env::var("TASK_MANAGER_NOTIFICATION_INTERVAL_SECS") {
            config.notification_interval_secs = val.parse().map_err(|e| {
                crate::TaskManagerError::ConfigError(format!(
                    "Invalid NOTIFICATION_INTERVAL_SECS: {}",
                    e
                ))
            })?;
            found_any = true;
        }

        if !found_any {
            return Err(crate::TaskManagerError::ConfigError(
                "No environment variables found".to_string(),
            ));
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        for (name, value) in [
            ("database_path", &self.database_path),
            ("kv_path", &self.kv_path),
            ("mirror_path", &self.mirror_path),
        ] {
            if value.trim().is_empty() {
                return Err(crate::TaskManagerError::ConfigError(format!(
                    "{} must not be empty",
                    name
                )));
            }
        }

        if self.tracking_interval_ms == 0 || self.tracking_fastest_interval_ms == 0 {
            return Err(crate::TaskManagerError::ConfigError(
                "Tracking intervals must be greater than 0".to_string(),
            ));
        }

        if self.notification_interval_secs == 0 {
            return Err(crate::TaskManagerError::ConfigError(
                "Notification interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Location tracking settings derived from this configuration
    pub fn tracking_options(&self) -> TrackingOptions {
        TrackingOptions {
            interval: Duration::from_millis(self.tracking_interval_ms),
            fastest_interval: Duration::from_millis(self.tracking_fastest_interval_ms),
            notification_interval: Duration::from_secs(self.notification_interval_secs),
            high_accuracy: self.high_accuracy,
        }
    }
}
