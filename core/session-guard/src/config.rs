//! Runtime configuration loaded from `~/.session-guard/config.toml`.
//!
//! A missing file yields defaults. A file that exists but cannot be read or
//! parsed is an error so that a typo never silently changes the logout window.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{GuardError, Result};
use crate::storage::StorageConfig;

pub const DEFAULT_THRESHOLD_SECS: u64 = 5 * 60;
pub const DEFAULT_STORAGE_KEY: &str = "@appBackgroundedTime";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InactivityConfig {
    #[serde(default = "default_threshold_secs")]
    pub threshold_secs: u64,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

impl Default for InactivityConfig {
    fn default() -> Self {
        Self {
            threshold_secs: default_threshold_secs(),
            storage_key: default_storage_key(),
        }
    }
}

impl InactivityConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_secs(self.threshold_secs)
    }

    pub fn threshold_millis(&self) -> i64 {
        i64::try_from(self.threshold().as_millis()).unwrap_or(i64::MAX)
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct StorageSection {
    /// Overrides the timestamp file location.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct LoggingSection {
    /// When set, logs are also written to a daily-rolling file here.
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct GuardConfig {
    #[serde(default)]
    pub inactivity: InactivityConfig,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl GuardConfig {
    /// Timestamp file to use, honouring the `[storage] path` override.
    pub fn timestamps_file(&self, storage: &StorageConfig) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| storage.timestamps_file())
    }
}

fn default_threshold_secs() -> u64 {
    DEFAULT_THRESHOLD_SECS
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

pub fn load_config(path: Option<PathBuf>) -> Result<GuardConfig> {
    let config_path = match path {
        Some(path) => path,
        None => StorageConfig::from_home()?.config_file(),
    };

    if !config_path.exists() {
        return Ok(GuardConfig::default());
    }

    let content = fs_err::read_to_string(&config_path).map_err(|source| GuardError::Io {
        context: format!("Failed to read config {}", config_path.display()),
        source,
    })?;
    toml::from_str::<GuardConfig>(&content).map_err(|err| GuardError::ConfigMalformed {
        path: config_path,
        details: err.to_string(),
    })
}
