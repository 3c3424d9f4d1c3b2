//! Configuration loading and management
//!
//! Handles parsing of `.tasktrack.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analytics::DEFAULT_ACTIVITY_LIMIT;
use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::storage::{Storage, DEFAULT_DATA_DIR, DEFAULT_TASKS_FILE};

/// Config file looked up in the working directory
pub const CONFIG_FILE: &str = ".tasktrack.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where the snapshot lives and how writers coordinate
    #[serde(default)]
    pub storage: StorageConfig,

    /// Report settings
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// Storage-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the snapshot, relative to the working directory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Snapshot file name inside `data_dir`
    #[serde(default = "default_tasks_file")]
    pub tasks_file: String,

    /// How long a writer waits for the snapshot lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_DIR)
}

fn default_tasks_file() -> String {
    DEFAULT_TASKS_FILE.to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            tasks_file: default_tasks_file(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Entries shown by `activity` and the stats report
    #[serde(default = "default_recent_activity_limit")]
    pub recent_activity_limit: usize,
}

fn default_recent_activity_limit() -> usize {
    DEFAULT_ACTIVITY_LIMIT
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            recent_activity_limit: default_recent_activity_limit(),
        }
    }
}

impl Config {
    /// Load configuration from a `.tasktrack.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            Error::InvalidConfig(format!("cannot read {}: {err}", path.display()))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.tasktrack.toml` from `dir`, or return defaults when absent
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Storage layout for this config, with relative data dirs under `base`
    pub fn storage(&self, base: &Path) -> Storage {
        let data_dir = if self.storage.data_dir.is_absolute() {
            self.storage.data_dir.clone()
        } else {
            base.join(&self.storage.data_dir)
        };
        Storage::new(data_dir, self.storage.tasks_file.clone())
    }

    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.analytics.validate()?;
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "storage.data_dir cannot be empty".to_string(),
            ));
        }

        let tasks_file = self.tasks_file.trim();
        if tasks_file.is_empty() {
            return Err(Error::InvalidConfig(
                "storage.tasks_file cannot be empty".to_string(),
            ));
        }
        if tasks_file.contains(['/', '\\']) {
            return Err(Error::InvalidConfig(format!(
                "storage.tasks_file must be a file name, not a path: '{tasks_file}'"
            )));
        }

        if self.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl AnalyticsConfig {
    fn validate(&self) -> Result<()> {
        if self.recent_activity_limit == 0 {
            return Err(Error::InvalidConfig(
                "analytics.recent_activity_limit must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
