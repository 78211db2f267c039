//! Storage configuration and path management.
//!
//! All on-disk locations used by session-guard are decided here so tests can
//! redirect them with [`StorageConfig::with_root`].

use std::path::{Path, PathBuf};

use crate::error::{GuardError, Result};

/// Central configuration for session-guard storage paths.
///
/// Production code uses [`StorageConfig::from_home`] which points to `~/.session-guard/`.
/// Tests use `StorageConfig::with_root(temp_dir)` for isolation.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(GuardError::HomeDirNotFound)?;
        Ok(Self {
            root: home.join(".session-guard"),
        })
    }

    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to timestamps.json (persisted key-value cells).
    pub fn timestamps_file(&self) -> PathBuf {
        self.root.join("timestamps.json")
    }

    /// Path to config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to logs/ directory.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}
