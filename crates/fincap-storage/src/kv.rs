//! Key-value store trait and the in-memory implementation.
//!
//! All operations are scoped to a namespace. The plugin registry writes its
//! per-plugin configuration documents under `plugin_config`, one key per
//! plugin name.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{StorageError, StorageResult};

/// Validate that a namespace is usable as a key prefix.
///
/// Namespaces must be non-empty and must not contain the null byte.
pub(crate) fn validate_namespace(namespace: &str) -> StorageResult<()> {
    if namespace.is_empty() {
        return Err(StorageError::InvalidKey(
            "namespace must not be empty".into(),
        ));
    }
    if namespace.contains('\0') {
        return Err(StorageError::InvalidKey(
            "namespace must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Validate that a key is usable for storage.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key must not be empty".into()));
    }
    if key.contains('\0') {
        return Err(StorageError::InvalidKey(
            "key must not contain null bytes".into(),
        ));
    }
    Ok(())
}

/// Namespaced key-value store.
///
/// Values are opaque bytes. Implementations must make a successful `set`
/// or `delete` durable before returning.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get a value by namespace and key.
    ///
    /// Returns `None` if the key does not exist.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Set a value, overwriting any existing one.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Delete a key. Returns `true` if the key existed.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// List all keys in a namespace, sorted.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;
}

impl std::fmt::Debug for dyn KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").finish_non_exhaustive()
    }
}

/// In-memory key-value store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: RwLock<HashMap<String, BTreeMap<String, Vec<u8>>>>,
}

impl MemoryKvStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Internal(e.to_string())
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let data = self.data.read().map_err(poisoned)?;
        Ok(data.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut data = self.data.write().map_err(poisoned)?;
        data.entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        let mut data = self.data.write().map_err(poisoned)?;
        Ok(data
            .get_mut(namespace)
            .is_some_and(|ns| ns.remove(key).is_some()))
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

/// A [`KvStore`] bound to a single namespace, with JSON helpers.
#[derive(Debug, Clone)]
pub struct ScopedKvStore {
    inner: Arc<dyn KvStore>,
    namespace: String,
}

impl ScopedKvStore {
    /// Bind `inner` to `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] if the namespace is invalid.
    pub fn new(inner: Arc<dyn KvStore>, namespace: impl Into<String>) -> StorageResult<Self> {
        let namespace = namespace.into();
        validate_namespace(&namespace)?;
        Ok(Self { inner, namespace })
    }

    /// The bound namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Read and decode a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails or the stored bytes are not JSON.
    pub async fn get_json(&self, key: &str) -> StorageResult<Option<Value>> {
        match self.inner.get(&self.namespace, key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Encode and write a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the write fails.
    pub async fn set_json(&self, key: &str, value: &Value) -> StorageResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.inner.set(&self.namespace, key, bytes).await
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn delete(&self, key: &str) -> StorageResult<bool> {
        self.inner.delete(&self.namespace, key).await
    }

    /// List keys in the bound namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub async fn list_keys(&self) -> StorageResult<Vec<String>> {
        self.inner.list_keys(&self.namespace).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_store_roundtrip_and_delete() {
        let store = MemoryKvStore::new();
        store.set("ns", "a", b"1".to_vec()).await.unwrap();
        assert_eq!(store.get("ns", "a").await.unwrap(), Some(b"1".to_vec()));
        assert!(store.get("other", "a").await.unwrap().is_none());

        assert!(store.delete("ns", "a").await.unwrap());
        assert!(!store.delete("ns", "a").await.unwrap());
        assert!(store.get("ns", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_keys_is_sorted_and_scoped() {
        let store = MemoryKvStore::new();
        store.set("ns", "b", vec![]).await.unwrap();
        store.set("ns", "a", vec![]).await.unwrap();
        store.set("other", "z", vec![]).await.unwrap();
        assert_eq!(store.list_keys("ns").await.unwrap(), vec!["a", "b"]);
        assert!(store.list_keys("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_invalid_keys() {
        let store = MemoryKvStore::new();
        assert!(matches!(
            store.set("", "k", vec![]).await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get("ns", "bad\0key").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn scoped_store_json_helpers() {
        let scoped = ScopedKvStore::new(Arc::new(MemoryKvStore::new()), "cfg").unwrap();
        let doc = serde_json::json!({"strict_mode": false});
        scoped.set_json("compliance", &doc).await.unwrap();
        assert_eq!(scoped.get_json("compliance").await.unwrap(), Some(doc));
        assert_eq!(scoped.list_keys().await.unwrap(), vec!["compliance"]);
        assert!(scoped.get_json("missing").await.unwrap().is_none());
    }

    #[test]
    fn scoped_store_rejects_empty_namespace() {
        assert!(ScopedKvStore::new(Arc::new(MemoryKvStore::new()), "").is_err());
    }
}
