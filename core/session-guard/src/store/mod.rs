//! Persistent key-value cells.
//!
//! The inactivity monitor only needs one cell (the backgrounded timestamp), but
//! the store is keyed so hosts can share a single backend with other features.
//!
//! - [`MemoryStore`]: process-local map; tests and hosts without persistence
//! - [`FileStore`]: JSON file with atomic writes; survives process termination

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::StoreError;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Asynchronous, fallible string store.
///
/// Implementations must make each call atomic with respect to the others.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }
}
