//! Protocol-adapter plugins: one remote category exposed as local tools.

use std::sync::Arc;

use async_trait::async_trait;
use fincap_mcp::RemoteClient;
use tracing::{debug, info};

use crate::bridge::InvocationBridge;
use crate::error::PluginResult;
use crate::plugin::{ConfigDocument, PluginCategory, PluginMetadata};
use crate::provider::CapabilityProvider;
use crate::tool::Tool;

/// Forwards one remote category's tools through the shared client.
///
/// Holds no per-instance connection; the registry drops the instance once
/// its tools are listed.
#[derive(Debug)]
pub struct ProtocolAdapterProvider {
    name: String,
    remote_category: String,
    client: Arc<RemoteClient>,
    bridge: InvocationBridge,
}

impl ProtocolAdapterProvider {
    /// Adapter `name` for the remote `category`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        client: Arc<RemoteClient>,
        bridge: InvocationBridge,
    ) -> Self {
        Self {
            name: name.into(),
            remote_category: category.into(),
            client,
            bridge,
        }
    }

    /// The local category for the remote one; unknown categories are `custom`.
    #[must_use]
    pub fn category(&self) -> PluginCategory {
        self.remote_category
            .parse()
            .unwrap_or(PluginCategory::Custom)
    }
}

#[async_trait]
impl CapabilityProvider for ProtocolAdapterProvider {
    fn describe(&self) -> PluginMetadata {
        PluginMetadata::new(
            self.name.clone(),
            "1.0.0",
            format!("Remote {} tools", self.remote_category),
            self.category(),
            "fincap",
        )
    }

    async fn initialize(&mut self, _config: &ConfigDocument) -> PluginResult<bool> {
        self.client.ensure_connected().await?;
        debug!(plugin = %self.name, category = %self.remote_category, "Adapter ready");
        Ok(true)
    }

    async fn list_tools(&self) -> PluginResult<Vec<Tool>> {
        self.client.ensure_connected().await?;
        let remote = self.client.list_tools(&self.remote_category).await?;
        let tools: Vec<Tool> = remote.iter().map(|t| self.bridge.bridge(t)).collect();
        info!(
            plugin = %self.name,
            category = %self.remote_category,
            tool_count = tools.len(),
            "Bridged remote tools"
        );
        Ok(tools)
    }
}
