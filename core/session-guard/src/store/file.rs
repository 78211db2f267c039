//! File-backed key-value store.
//!
//! # File Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "@appBackgroundedTime": "1767225600000"
//!   }
//! }
//! ```
//!
//! # Defensive Loading
//!
//! The file may be truncated by a process kill mid-write on platforms without
//! atomic rename, or edited by hand. Empty files, corrupt JSON and unknown
//! versions all load as an empty map with a warning. Only genuine I/O errors
//! (permissions, disk) are reported.
//!
//! # Atomic Writes
//!
//! Uses temp file + rename so a reader never sees a partial file.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use super::KeyValueStore;
use crate::error::StoreError;

const FILE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    entries: HashMap<String, String>,
}

/// Store that persists every mutation to a JSON file.
///
/// Each call reads the file fresh so external writers (another build of the
/// app sharing the file) are observed. Calls from one `FileStore` are
/// serialized.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    io_lock: Arc<Mutex<()>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn with_entries<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut HashMap<String, String>) -> (T, bool) + Send + 'static,
    {
        let path = self.path.clone();
        let io_lock = Arc::clone(&self.io_lock);
        tokio::task::spawn_blocking(move || {
            let _guard = io_lock
                .lock()
                .map_err(|_| StoreError::Worker("file store lock poisoned".to_string()))?;
            let mut entries = load_entries(&path)?;
            let (value, dirty) = op(&mut entries);
            if dirty {
                save_entries(&path, &entries)?;
            }
            Ok(value)
        })
        .await
        .map_err(|err| StoreError::Worker(err.to_string()))?
    }
}

fn load_entries(path: &Path) -> Result<HashMap<String, String>, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if content.trim().is_empty() {
        warn!(path = %path.display(), "Empty store file, starting fresh");
        return Ok(HashMap::new());
    }

    match serde_json::from_str::<StoreFile>(&content) {
        Ok(file) if file.version == FILE_VERSION => Ok(file.entries),
        Ok(file) => {
            warn!(
                path = %path.display(),
                version = file.version,
                expected = FILE_VERSION,
                "Unsupported store file version, starting fresh"
            );
            Ok(HashMap::new())
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "Corrupt store file, starting fresh"
            );
            Ok(HashMap::new())
        }
    }
}

fn save_entries(path: &Path, entries: &HashMap<String, String>) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err)?;

    let file = StoreFile {
        version: FILE_VERSION,
        entries: entries.clone(),
    };
    let content = serde_json::to_string_pretty(&file).map_err(StoreError::Serialize)?;

    let mut temp_file = NamedTempFile::new_in(parent).map_err(io_err)?;
    temp_file.write_all(content.as_bytes()).map_err(io_err)?;
    temp_file.flush().map_err(io_err)?;
    temp_file.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = key.to_string();
        self.with_entries(move |entries| (entries.get(&key).cloned(), false))
            .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        let value = value.to_string();
        self.with_entries(move |entries| {
            entries.insert(key, value);
            ((), true)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let key = key.to_string();
        self.with_entries(move |entries| {
            let removed = entries.remove(&key).is_some();
            ((), removed)
        })
        .await
    }
}
