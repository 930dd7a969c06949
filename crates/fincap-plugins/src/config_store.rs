//! Durable per-plugin configuration documents.

use std::collections::BTreeMap;
use std::sync::Arc;

use fincap_storage::{KvStore, MemoryKvStore, ScopedKvStore};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::PluginResult;
use crate::plugin::ConfigDocument;

/// Storage namespace holding plugin configuration.
pub const CONFIG_NAMESPACE: &str = "plugin_config";

/// Plugin name to configuration document, backed by a [`KvStore`].
///
/// Every document is read once when the store is opened. Updates are
/// written through to the backing store before the cache changes, so a
/// failed write leaves the previous document in effect.
#[derive(Debug)]
pub struct ConfigStore {
    backend: ScopedKvStore,
    cache: RwLock<BTreeMap<String, ConfigDocument>>,
}

impl ConfigStore {
    /// Open the store and load every persisted document.
    ///
    /// Entries that are not JSON objects are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backend cannot be listed or read.
    pub async fn open(store: Arc<dyn KvStore>) -> PluginResult<Self> {
        let backend = ScopedKvStore::new(store, CONFIG_NAMESPACE)?;
        let mut cache = BTreeMap::new();
        for name in backend.list_keys().await? {
            match backend.get_json(&name).await? {
                Some(Value::Object(doc)) => {
                    cache.insert(name, doc);
                },
                Some(other) => {
                    warn!(plugin = %name, found = %other, "Ignoring non-object plugin config");
                },
                None => {},
            }
        }
        info!(count = cache.len(), "Loaded plugin configurations");
        Ok(Self {
            backend,
            cache: RwLock::new(cache),
        })
    }

    /// A store that lives only as long as the process.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches [`open`](Self::open).
    pub async fn in_memory() -> PluginResult<Self> {
        Self::open(Arc::new(MemoryKvStore::new())).await
    }

    /// The document for `name`, or an empty one.
    pub async fn get(&self, name: &str) -> ConfigDocument {
        self.cache.read().await.get(name).cloned().unwrap_or_default()
    }

    /// Whether a document is stored for `name`.
    pub async fn contains(&self, name: &str) -> bool {
        self.cache.read().await.contains_key(name)
    }

    /// Persist `document` for `name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the write fails.
    pub async fn set(&self, name: &str, document: ConfigDocument) -> PluginResult<()> {
        let mut cache = self.cache.write().await;
        self.backend
            .set_json(name, &Value::Object(document.clone()))
            .await?;
        cache.insert(name.to_string(), document);
        debug!(plugin = %name, "Persisted plugin configuration");
        Ok(())
    }

    /// Forget the document for `name`. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the delete fails.
    pub async fn remove(&self, name: &str) -> PluginResult<bool> {
        let mut cache = self.cache.write().await;
        self.backend.delete(name).await?;
        Ok(cache.remove(name).is_some())
    }

    /// Names with a stored document, sorted.
    pub async fn names(&self) -> Vec<String> {
        self.cache.read().await.keys().cloned().collect()
    }
}
