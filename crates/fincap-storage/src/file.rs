//! JSON-file-backed key-value store.
//!
//! The whole store lives in one file shaped as
//! `{"<namespace>": {"<key>": <json value>}}`. It is read once by
//! [`FileKvStore::open`] and rewritten on every mutation through a
//! temporary file in the same directory followed by a rename, so a crash
//! mid-write never leaves a truncated file behind.
//!
//! The in-memory view only changes once the file has been written, so a
//! failed mutation leaves both untouched.
//!
//! Values must be valid JSON; anything else is rejected with
//! [`StorageError::Serialization`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::kv::{KvStore, validate_key, validate_namespace};

type Namespaces = BTreeMap<String, BTreeMap<String, Value>>;

/// Persistent store backed by a single JSON file.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    data: RwLock<Namespaces>,
}

fn io_err(path: &Path, e: impl std::fmt::Display) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

impl FileKvStore {
    /// Open the store at `path`, loading any existing contents.
    ///
    /// A missing file is treated as an empty store; it is created on the
    /// first write. Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = if path.exists() {
            let raw = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            if raw.trim().is_empty() {
                Namespaces::new()
            } else {
                serde_json::from_str(&raw)
                    .map_err(|e| StorageError::Serialization(format!("{}: {e}", path.display())))?
            }
        } else {
            Namespaces::new()
        };

        let key_count: usize = data.values().map(BTreeMap::len).sum();
        info!(path = %path.display(), keys = key_count, "Opened file store");

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, data: &Namespaces) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

        let body = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| io_err(&dir, e))?;
        tmp.write_all(body.as_bytes())
            .map_err(|e| io_err(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| io_err(tmp.path(), e))?;
        tmp.persist(&self.path).map_err(|e| io_err(&self.path, e))?;

        debug!(path = %self.path.display(), "Flushed file store");
        Ok(())
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Internal(e.to_string())
}

#[async_trait]
impl KvStore for FileKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let data = self.data.read().map_err(poisoned)?;
        data.get(namespace)
            .and_then(|ns| ns.get(key))
            .map(|v| serde_json::to_vec(v).map_err(|e| StorageError::Serialization(e.to_string())))
            .transpose()
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let value: Value = serde_json::from_slice(&value).map_err(|e| {
            StorageError::Serialization(format!("file store only holds JSON values: {e}"))
        })?;

        let mut data = self.data.write().map_err(poisoned)?;
        let mut next = data.clone();
        next.entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.flush(&next)?;
        *data = next;
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut data = self.data.write().map_err(poisoned)?;
        if !data.get(namespace).is_some_and(|ns| ns.contains_key(key)) {
            return Ok(false);
        }
        let mut next = data.clone();
        if let Some(ns) = next.get_mut(namespace) {
            ns.remove(key);
            if ns.is_empty() {
                next.remove(namespace);
            }
        }
        self.flush(&next)?;
        *data = next;
        Ok(true)
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        validate_namespace(namespace)?;
        let data = self.data.read().map_err(poisoned)?;
        Ok(data
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }
}
