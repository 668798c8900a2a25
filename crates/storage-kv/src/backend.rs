//! # Key/Value Backends
//!
//! The narrow persistence contract behind the key/value stores: string
//! keys to string values, with a full key scan for prefix listing. The
//! in-memory adapter backs tests; the file adapter persists as a single
//! JSON document written atomically (write to a temp file, then rename).

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the persistence layer.
#[derive(Debug, Error)]
pub enum KvError {
    /// Filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted document is not readable.
    #[error("corrupt store: {0}")]
    Corrupt(String),
}

/// String key/value persistence with whole-store key scans.
pub trait KeyValueBackend: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    fn put(&self, key: &str, value: &str) -> Result<(), KvError>;
    fn remove(&self, key: &str) -> Result<bool, KvError>;
    /// All keys with the given prefix, in ascending order.
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError>;
}

/// In-memory backend for unit tests.
#[derive(Default)]
pub struct MemoryKv {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.data.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, KvError> {
        Ok(self.data.write().remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        Ok(self
            .data
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

/// File-backed backend.
///
/// Loads the whole document at open and writes it back through a temp
/// file + rename on every mutation, so a crash mid-write leaves the
/// previous document intact.
pub struct FileKv {
    data: RwLock<BTreeMap<String, String>>,
    path: PathBuf,
}

impl FileKv {
    /// Open or create the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, KvError> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<BTreeMap<String, String>>(&bytes)
                .map_err(|e| KvError::Corrupt(e.to_string()))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %path.display(), keys = data.len(), "opened key/value store");
        Ok(Self {
            data: RwLock::new(data),
            path,
        })
    }

    fn persist(&self, data: &BTreeMap<String, String>) -> Result<(), KvError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(data).expect("string maps serialize"))?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueBackend for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), KvError> {
        let mut data = self.data.write();
        data.insert(key.to_string(), value.to_string());
        self.persist(&data)
    }

    fn remove(&self, key: &str) -> Result<bool, KvError> {
        let mut data = self.data.write();
        let removed = data.remove(key).is_some();
        if removed {
            self.persist(&data)?;
        }
        Ok(removed)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        Ok(self
            .data
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
