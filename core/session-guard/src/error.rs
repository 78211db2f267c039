//! Error types for session-guard operations.
//!
//! Store and recovery failures never escape the state machines; they are logged
//! and folded into outcomes. `GuardError` covers the ambient surface (config,
//! files) that callers do need to see.

use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// Store Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure reported by a [`KeyValueStore`](crate::store::KeyValueStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store read failed for key {key}: {details}")]
    Read { key: String, details: String },

    #[error("Store write failed for key {key}: {details}")]
    Write { key: String, details: String },

    #[error("Store delete failed for key {key}: {details}")]
    Delete { key: String, details: String },

    #[error("Store file I/O failed: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Store serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Store worker task failed: {0}")]
    Worker(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
// Recovery Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Failure returned by a recovery action. Only its message is kept; the retry
/// panel does not surface it to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RecoveryError {
    pub message: String,
}

impl RecoveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for RecoveryError {
    fn from(message: String) -> Self {
        RecoveryError { message }
    }
}

impl From<&str> for RecoveryError {
    fn from(message: &str) -> Self {
        RecoveryError::new(message)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Crate Errors
// ═══════════════════════════════════════════════════════════════════════════════

/// Errors from configuration and setup.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience type alias for Results using GuardError.
pub type Result<T> = std::result::Result<T, GuardError>;
