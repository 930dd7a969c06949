//! The capability provider trait every plugin implements.

use async_trait::async_trait;

use crate::error::PluginResult;
use crate::plugin::{ConfigDocument, PluginMetadata};
use crate::tool::Tool;

/// A unit that, once initialized, exposes a set of tools under one category.
///
/// The registry calls [`initialize`](Self::initialize) exactly once per
/// instance and builds a fresh instance for every load.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Plugin identity. Must work before `initialize`.
    fn describe(&self) -> PluginMetadata;

    /// Prepare the provider with its stored configuration.
    ///
    /// `Ok(false)` and `Err` both mean the load failed.
    async fn initialize(&mut self, config: &ConfigDocument) -> PluginResult<bool>;

    /// Tools in the order they should be offered.
    async fn list_tools(&self) -> PluginResult<Vec<Tool>>;

    /// Release resources. Must tolerate an instance whose `initialize`
    /// never completed.
    async fn cleanup(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Check a configuration document before it is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Configuration`](crate::PluginError::Configuration)
    /// if the document is not acceptable.
    fn validate_config(&self, _config: &ConfigDocument) -> PluginResult<()> {
        Ok(())
    }
}

impl std::fmt::Debug for dyn CapabilityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityProvider")
            .field("name", &self.describe().name)
            .finish_non_exhaustive()
    }
}
