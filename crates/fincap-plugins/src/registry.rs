//! Plugin registry.
//!
//! Owns the plugin records, runs the discover/load/unload/reload/configure
//! lifecycle, and aggregates tools by category.
//!
//! # Concurrency
//!
//! Records sit behind a Tokio `RwLock`, so the registry is `Send + Sync`
//! and can be shared through an `Arc`. Mutation is nonetheless
//! single-writer by contract: two concurrent `load`/`unload`/`reload`
//! calls for the same name race, and the last one to store its record
//! wins. Callers that mutate concurrently must serialize per name, as
//! [`PluginManager`](crate::PluginManager) does.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use fincap_mcp::RemoteClient;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::adapter::ProtocolAdapterProvider;
use crate::bridge::{InvocationBridge, RuntimeBridge};
use crate::config_store::ConfigStore;
use crate::discovery::{Candidate, CandidateKind, discover_candidates};
use crate::error::{PluginError, PluginResult};
use crate::native::NativeCatalog;
use crate::plugin::{ConfigDocument, PluginCategory, PluginMetadata, PluginRecord, PluginStatus};
use crate::provider::CapabilityProvider;
use crate::tool::Tool;

/// Default bound on `initialize`, `list_tools` and `cleanup`.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a bridged remote call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Counts computed from the current records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Records of any status.
    pub total: usize,
    /// Active records.
    pub active: usize,
    /// Error records.
    pub error: usize,
    /// Tools across active records.
    pub total_tools: usize,
    /// Tools across active records, per category.
    pub per_category_counts: BTreeMap<PluginCategory, usize>,
}

/// Marks a name as loading until dropped, including when the load future
/// is cancelled.
struct LoadingMarker<'a> {
    loading: &'a DashSet<String>,
    name: String,
}

impl<'a> LoadingMarker<'a> {
    fn set(loading: &'a DashSet<String>, name: &str) -> Self {
        loading.insert(name.to_string());
        Self {
            loading,
            name: name.to_string(),
        }
    }
}

impl Drop for LoadingMarker<'_> {
    fn drop(&mut self) {
        self.loading.remove(&self.name);
    }
}

struct Entry {
    record: PluginRecord,
    provider: Option<Box<dyn CapabilityProvider>>,
}

impl Entry {
    fn failed(metadata: PluginMetadata, error: &PluginError) -> Self {
        Self {
            record: PluginRecord::failed(metadata, error.to_string()),
            provider: None,
        }
    }
}

/// Registry of loaded plugins.
pub struct PluginRegistry {
    catalog: NativeCatalog,
    client: Arc<RemoteClient>,
    bridge: InvocationBridge,
    config_store: Arc<ConfigStore>,
    plugins_dir: Option<PathBuf>,
    init_timeout: Duration,
    candidates: RwLock<Vec<Candidate>>,
    entries: RwLock<Vec<Entry>>,
    loading: DashSet<String>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("catalog", &self.catalog)
            .field("plugins_dir", &self.plugins_dir)
            .field("init_timeout", &self.init_timeout)
            .finish_non_exhaustive()
    }
}

impl PluginRegistry {
    /// A registry with the built-in native catalog, no plugins directory,
    /// and default timeouts.
    #[must_use]
    pub fn new(client: Arc<RemoteClient>, config_store: Arc<ConfigStore>) -> Self {
        let bridge = InvocationBridge::new(
            Arc::clone(&client),
            RuntimeBridge::new(DEFAULT_CALL_TIMEOUT),
        );
        Self {
            catalog: NativeCatalog::with_builtins(),
            client,
            bridge,
            config_store,
            plugins_dir: None,
            init_timeout: DEFAULT_INIT_TIMEOUT,
            candidates: RwLock::new(Vec::new()),
            entries: RwLock::new(Vec::new()),
            loading: DashSet::new(),
        }
    }

    /// Replace the native catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: NativeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Scan `dir` for `*.toml` manifests during discovery.
    #[must_use]
    pub fn with_plugins_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plugins_dir = Some(dir.into());
        self
    }

    /// Bound on provider `initialize`, `list_tools` and `cleanup`.
    #[must_use]
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// Runtime strategy for bridged remote calls.
    #[must_use]
    pub fn with_runtime_bridge(mut self, runtime: RuntimeBridge) -> Self {
        self.bridge = InvocationBridge::new(Arc::clone(&self.client), runtime);
        self
    }

    /// The shared remote client.
    #[must_use]
    pub fn client(&self) -> &Arc<RemoteClient> {
        &self.client
    }

    /// The configuration store.
    #[must_use]
    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config_store
    }

    // -----------------------------------------------------------------
    // Discovery
    // -----------------------------------------------------------------

    /// Enumerate candidates and remember their kinds. Loads nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Discovery`] if the plugins directory exists
    /// but cannot be read.
    pub async fn discover(&self) -> PluginResult<Vec<String>> {
        let candidates = discover_candidates(
            self.catalog.names(),
            self.plugins_dir.as_deref(),
            self.client.categories(),
        )?;
        let names = candidates.iter().map(|c| c.name.clone()).collect();
        *self.candidates.write().await = candidates;
        Ok(names)
    }

    async fn discover_without_manifests(&self) -> Vec<String> {
        let candidates =
            match discover_candidates(self.catalog.names(), None, self.client.categories()) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(error = %e, "Plugin discovery failed");
                    return Vec::new();
                },
            };
        let names = candidates.iter().map(|c| c.name.clone()).collect();
        *self.candidates.write().await = candidates;
        names
    }

    /// Candidates from the last discovery.
    pub async fn candidates(&self) -> Vec<Candidate> {
        self.candidates.read().await.clone()
    }

    async fn resolve(&self, name: &str) -> PluginResult<Candidate> {
        if let Some(candidate) = self.find_candidate(name).await {
            return Ok(candidate);
        }
        debug!(plugin = %name, "Unknown candidate, re-running discovery");
        self.discover().await?;
        self.find_candidate(name)
            .await
            .ok_or_else(|| PluginError::NotFound(name.to_string()))
    }

    async fn find_candidate(&self, name: &str) -> Option<Candidate> {
        self.candidates
            .read()
            .await
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Discover, then load every candidate in order. Failures become
    /// `Error` records.
    pub async fn initialize_all(&self) {
        info!("Initializing all plugins");
        let names = match self.discover().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "Manifest discovery failed; loading built-in and remote plugins only");
                self.discover_without_manifests().await
            },
        };
        for name in names {
            self.load(&name).await;
        }
        let stats = self.stats().await;
        info!(
            total = stats.total,
            active = stats.active,
            error = stats.error,
            total_tools = stats.total_tools,
            "Plugin initialization completed"
        );
    }

    /// Load `name`, replacing any existing record.
    ///
    /// Returns `true` if the plugin is now active. Any failure is stored as
    /// an `Error` record and reported as `false`.
    pub async fn load(&self, name: &str) -> bool {
        info!(plugin = %name, "Loading plugin");
        let in_flight = LoadingMarker::set(&self.loading, name);

        let entry = match self.build_entry(name).await {
            Ok(entry) => entry,
            Err((metadata, e)) => {
                warn!(plugin = %name, error = %e, "Plugin failed to load");
                Entry::failed(metadata, &e)
            },
        };
        let loaded = entry.record.is_active();
        if loaded {
            self.warn_on_shadowing(&entry.record).await;
            info!(
                plugin = %name,
                tool_count = entry.record.tools_count(),
                "Plugin loaded"
            );
        }

        let displaced = self.store(entry).await;
        drop(in_flight);
        if let Some(provider) = displaced {
            self.cleanup_provider(name, provider).await;
        }
        loaded
    }

    /// Remove `name`, cleaning up its provider. Returns `false` if absent.
    pub async fn unload(&self, name: &str) -> bool {
        let removed = {
            let mut entries = self.entries.write().await;
            entries
                .iter()
                .position(|e| e.record.name() == name)
                .map(|i| entries.remove(i))
        };
        let Some(entry) = removed else {
            debug!(plugin = %name, "Unload requested for unknown plugin");
            return false;
        };
        if let Some(provider) = entry.provider {
            self.cleanup_provider(name, provider).await;
        }
        info!(plugin = %name, "Plugin unloaded");
        true
    }

    /// Unload then load. A failed load leaves `name` as an `Error` record;
    /// the previous record is not restored.
    pub async fn reload(&self, name: &str) -> bool {
        self.unload(name).await;
        self.load(name).await
    }

    /// Persist a configuration document for `name`. Does not reload.
    ///
    /// # Errors
    ///
    /// Returns the live provider's validation error, or a storage error.
    pub async fn configure(&self, name: &str, document: ConfigDocument) -> PluginResult<()> {
        {
            let entries = self.entries.read().await;
            if let Some(provider) = entries
                .iter()
                .find(|e| e.record.name() == name)
                .and_then(|e| e.provider.as_deref())
            {
                provider.validate_config(&document)?;
            }
        }
        self.config_store.set(name, document).await?;
        info!(plugin = %name, "Plugin configuration updated");
        Ok(())
    }

    /// Unload everything, then shut the remote client down.
    pub async fn shutdown(&self) {
        let entries = std::mem::take(&mut *self.entries.write().await);
        for entry in entries.into_iter().rev() {
            if let Some(provider) = entry.provider {
                self.cleanup_provider(entry.record.name(), provider).await;
            }
        }
        if let Err(e) = self.client.shutdown().await {
            warn!(error = %e, "Remote client shutdown failed");
        }
        info!("Plugin registry shut down");
    }

    async fn build_entry(&self, name: &str) -> Result<Entry, (PluginMetadata, PluginError)> {
        let candidate = self
            .resolve(name)
            .await
            .map_err(|e| (PluginMetadata::placeholder(name), e))?;

        let (mut provider, keep_instance): (Box<dyn CapabilityProvider>, bool) =
            match &candidate.kind {
                CandidateKind::Native { factory } => {
                    let provider = self.catalog.create(factory).ok_or_else(|| {
                        (
                            PluginMetadata::placeholder(name),
                            PluginError::NotFound(format!("native factory {factory}")),
                        )
                    })?;
                    (provider, true)
                },
                CandidateKind::Adapter { category } => (
                    Box::new(ProtocolAdapterProvider::new(
                        name,
                        category.clone(),
                        Arc::clone(&self.client),
                        self.bridge.clone(),
                    )),
                    false,
                ),
            };

        let mut metadata = provider.describe();
        metadata.name = name.to_string();

        let config = candidate.effective_config(self.config_store.get(name).await);
        match self.start(name, &mut *provider, &config).await {
            Ok(tools) => Ok(Entry {
                record: PluginRecord::active(metadata, tools, keep_instance),
                provider: keep_instance.then_some(provider),
            }),
            Err(e) => {
                self.cleanup_provider(name, provider).await;
                Err((metadata, e))
            },
        }
    }

    async fn start(
        &self,
        name: &str,
        provider: &mut dyn CapabilityProvider,
        config: &ConfigDocument,
    ) -> PluginResult<Vec<Tool>> {
        let timed_out = |stage: &str| PluginError::Initialization {
            plugin: name.to_string(),
            message: format!(
                "{stage} timed out after {}s",
                self.init_timeout.as_secs_f64()
            ),
        };

        let ready = tokio::time::timeout(self.init_timeout, provider.initialize(config))
            .await
            .map_err(|_| timed_out("initialize"))??;
        if !ready {
            return Err(PluginError::Initialization {
                plugin: name.to_string(),
                message: "initialize returned false".to_string(),
            });
        }

        tokio::time::timeout(self.init_timeout, provider.list_tools())
            .await
            .map_err(|_| timed_out("list_tools"))?
    }

    async fn cleanup_provider(&self, name: &str, mut provider: Box<dyn CapabilityProvider>) {
        match tokio::time::timeout(self.init_timeout, provider.cleanup()).await {
            Ok(Ok(())) => debug!(plugin = %name, "Provider cleaned up"),
            Ok(Err(e)) => warn!(plugin = %name, error = %e, "Provider cleanup failed"),
            Err(_) => warn!(plugin = %name, "Provider cleanup timed out"),
        }
    }

    async fn store(&self, entry: Entry) -> Option<Box<dyn CapabilityProvider>> {
        let mut entries = self.entries.write().await;
        let existing = entries
            .iter()
            .position(|e| e.record.name() == entry.record.name());
        if let Some(slot) = existing.and_then(|i| entries.get_mut(i)) {
            return std::mem::replace(slot, entry).provider;
        }
        entries.push(entry);
        None
    }

    async fn warn_on_shadowing(&self, record: &PluginRecord) {
        let entries = self.entries.read().await;
        for other in entries
            .iter()
            .map(|e| &e.record)
            .filter(|r| r.is_active() && r.name() != record.name())
        {
            for tool in &record.tools {
                if other.tools.iter().any(|t| t.name() == tool.name()) {
                    warn!(
                        tool = %tool.name(),
                        plugin = %record.name(),
                        other_plugin = %other.name(),
                        "Tool name collision across plugins"
                    );
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Snapshot of the record for `name`.
    pub async fn get(&self, name: &str) -> Option<PluginRecord> {
        self.entries
            .read()
            .await
            .iter()
            .find(|e| e.record.name() == name)
            .map(|e| e.record.clone())
    }

    /// `Loading` while a load is in flight, else the stored record's status.
    pub async fn status(&self, name: &str) -> Option<PluginStatus> {
        if self.loading.contains(name) {
            return Some(PluginStatus::Loading);
        }
        self.get(name).await.map(|r| r.status)
    }

    /// Every record, in registration order.
    pub async fn records(&self) -> Vec<PluginRecord> {
        self.entries
            .read()
            .await
            .iter()
            .map(|e| e.record.clone())
            .collect()
    }

    /// Records of any status in `category`.
    pub async fn plugins_by_category(&self, category: PluginCategory) -> Vec<PluginRecord> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.record.metadata.category == category)
            .map(|e| e.record.clone())
            .collect()
    }

    /// Tools of active records in registration order, optionally filtered
    /// by category.
    pub async fn available_tools(&self, category: Option<PluginCategory>) -> Vec<Tool> {
        self.entries
            .read()
            .await
            .iter()
            .map(|e| &e.record)
            .filter(|r| r.is_active())
            .filter(|r| category.is_none_or(|c| r.metadata.category == c))
            .flat_map(|r| r.tools.iter().cloned())
            .collect()
    }

    /// The active tool named `tool`. When several plugins expose the same
    /// name, the one registered last wins.
    pub async fn find_tool(&self, tool: &str) -> Option<Tool> {
        self.entries
            .read()
            .await
            .iter()
            .rev()
            .filter(|e| e.record.is_active())
            .find_map(|e| e.record.tools.iter().find(|t| t.name() == tool).cloned())
    }

    /// Counts recomputed from the current records.
    pub async fn stats(&self) -> RegistryStats {
        let entries = self.entries.read().await;
        let mut stats = RegistryStats {
            total: entries.len(),
            ..RegistryStats::default()
        };
        for record in entries.iter().map(|e| &e.record) {
            match record.status {
                PluginStatus::Active => {
                    stats.active = stats.active.saturating_add(1);
                    stats.total_tools = stats.total_tools.saturating_add(record.tools_count());
                    let count = stats
                        .per_category_counts
                        .entry(record.metadata.category)
                        .or_insert(0);
                    *count = count.saturating_add(record.tools_count());
                },
                PluginStatus::Error => stats.error = stats.error.saturating_add(1),
                PluginStatus::Loading => {},
            }
        }
        stats
    }
}
