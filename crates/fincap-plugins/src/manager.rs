//! Operator-facing plugin management.
//!
//! [`PluginManager`] is the single entry point for load/unload/reload/
//! configure requests. It serializes requests per plugin name with an
//! async mutex, since the registry itself is single-writer per name, and
//! refreshes every registered [`ToolConsumer`] after each executed action.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::consumer::{ToolConsumer, refresh_consumer};
use crate::error::PluginError;
use crate::plugin::{ConfigDocument, PluginCategory, PluginRecord, PluginStatus, PluginSummary};
use crate::registry::PluginRegistry;

/// Errors returned by [`PluginManager::manage`].
#[derive(Debug, thiserror::Error)]
pub enum ManageError {
    /// No record exists for the plugin after the action.
    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    /// `configure` was requested without a configuration document.
    #[error("configuration required to configure {0}")]
    ConfigurationRequired(String),

    /// The action string is not one of load, unload, reload, configure.
    #[error("invalid action: {0}")]
    InvalidAction(String),

    /// Validation or persistence failed.
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

/// Result type for management requests.
pub type ManageResult<T> = Result<T, ManageError>;

/// A management action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManageAction {
    /// Load or replace the plugin.
    Load,
    /// Remove the plugin.
    Unload,
    /// Unload then load.
    Reload,
    /// Persist a new configuration, then reload.
    Configure,
}

impl fmt::Display for ManageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Unload => "unload",
            Self::Reload => "reload",
            Self::Configure => "configure",
        })
    }
}

impl FromStr for ManageAction {
    type Err = ManageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "load" => Ok(Self::Load),
            "unload" => Ok(Self::Unload),
            "reload" => Ok(Self::Reload),
            "configure" => Ok(Self::Configure),
            _ => Err(ManageError::InvalidAction(s.to_string())),
        }
    }
}

/// A management request as received from an operator surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManageRequest {
    /// Target plugin.
    pub plugin_name: String,
    /// `load`, `unload`, `reload` or `configure`.
    pub action: String,
    /// Document for `configure`.
    #[serde(default)]
    pub config: Option<ConfigDocument>,
}

impl ManageRequest {
    /// A request without a configuration body.
    #[must_use]
    pub fn new(plugin_name: impl Into<String>, action: ManageAction) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            action: action.to_string(),
            config: None,
        }
    }

    /// A `configure` request carrying `config`.
    #[must_use]
    pub fn configure(plugin_name: impl Into<String>, config: ConfigDocument) -> Self {
        Self {
            config: Some(config),
            ..Self::new(plugin_name, ManageAction::Configure)
        }
    }
}

/// The plugin's state after a successful request.
///
/// For `unload` the plugin is gone once the request succeeds, so the
/// response describes the record as it was just before removal: `status`
/// is the status it was unloaded from, not a live one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManageResponse {
    /// Target plugin.
    pub plugin_name: String,
    /// Status after the action; for `unload`, the status before removal.
    pub status: PluginStatus,
    /// Number of tools served.
    pub tools_count: usize,
    /// Plugin category.
    pub category: PluginCategory,
    /// Plugin version.
    pub version: String,
    /// When the record was last (re)loaded.
    pub last_updated: DateTime<Utc>,
}

impl From<&PluginRecord> for ManageResponse {
    fn from(record: &PluginRecord) -> Self {
        Self {
            plugin_name: record.metadata.name.clone(),
            status: record.status,
            tools_count: record.tools_count(),
            category: record.metadata.category,
            version: record.metadata.version.clone(),
            last_updated: record.load_time,
        }
    }
}

/// Serializes operator actions per plugin and keeps consumers current.
pub struct PluginManager {
    registry: Arc<PluginRegistry>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    consumers: RwLock<Vec<Arc<dyn ToolConsumer>>>,
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl PluginManager {
    /// Manage `registry`.
    #[must_use]
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            locks: DashMap::new(),
            consumers: RwLock::new(Vec::new()),
        }
    }

    /// The managed registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Register a consumer and bind it to the current tool list.
    pub async fn register_consumer(&self, consumer: Arc<dyn ToolConsumer>) {
        refresh_consumer(consumer.as_ref(), &self.registry).await;
        self.consumers.write().await.push(consumer);
    }

    /// Rebind every registered consumer.
    pub async fn refresh_consumers(&self) {
        let consumers = self.consumers.read().await.clone();
        join_all(
            consumers
                .iter()
                .map(|c| refresh_consumer(c.as_ref(), &self.registry)),
        )
        .await;
    }

    /// Listing rows for every record.
    pub async fn available(&self) -> Vec<PluginSummary> {
        self.registry
            .records()
            .await
            .iter()
            .map(PluginSummary::from)
            .collect()
    }

    fn lock_for(&self, name: &str) -> Arc<Mutex<()>> {
        Arc::clone(
            self.locks
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Execute a management request.
    ///
    /// `configure` persists the document and then reloads. `unload`
    /// responds with the record as it was just before removal.
    ///
    /// # Errors
    ///
    /// See [`ManageError`].
    pub async fn manage(&self, request: ManageRequest) -> ManageResult<ManageResponse> {
        let action: ManageAction = request.action.parse()?;
        let name = request.plugin_name.as_str();
        if action == ManageAction::Configure && request.config.is_none() {
            return Err(ManageError::ConfigurationRequired(name.to_string()));
        }
        info!(plugin = %name, %action, "Plugin management request");

        let lock = self.lock_for(name);
        let record = {
            let _guard = lock.lock().await;
            match action {
                ManageAction::Load => {
                    self.registry.load(name).await;
                    self.registry.get(name).await
                },
                ManageAction::Unload => {
                    let before = self.registry.get(name).await;
                    let removed = self.registry.unload(name).await;
                    before.filter(|_| removed)
                },
                ManageAction::Reload => {
                    self.registry.reload(name).await;
                    self.registry.get(name).await
                },
                ManageAction::Configure => {
                    let config = request.config.unwrap_or_default();
                    self.registry.configure(name, config).await?;
                    self.registry.reload(name).await;
                    self.registry.get(name).await
                },
            }
        };

        self.refresh_consumers().await;
        let record = record.ok_or_else(|| ManageError::PluginNotFound(name.to_string()))?;
        debug!(plugin = %name, status = %record.status, "Plugin management request completed");
        Ok(ManageResponse::from(&record))
    }
}
