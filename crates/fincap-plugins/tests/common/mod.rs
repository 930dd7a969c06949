//! Shared fixtures for the plugin integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use fincap_mcp::RemoteClient;
use fincap_plugins::{
    CapabilityProvider, ConfigDocument, ConfigStore, EchoPlugin, NativeCatalog, PluginCategory,
    PluginError, PluginMetadata, PluginRegistry, PluginResult, Tool,
};
use fincap_test::MockToolServer;
use serde_json::{Value, json};

/// A mock remote server with two `market_data` tools.
#[allow(dead_code)]
pub fn market_server() -> MockToolServer {
    MockToolServer::new()
        .with_schema_tool(
            "market_data",
            "get_stock_quote",
            json!({
                "type": "object",
                "properties": {"symbol": {"type": "string"}},
                "required": ["symbol"]
            }),
        )
        .with_tool("market_data", "get_market_summary")
}

/// Build a registry over `server` with only the given native plugins.
#[allow(dead_code)]
pub async fn registry_with(server: &MockToolServer, catalog: NativeCatalog) -> PluginRegistry {
    let client = Arc::new(RemoteClient::new(Arc::new(server.clone())));
    let store = Arc::new(ConfigStore::in_memory().await.unwrap());
    PluginRegistry::new(client, store).with_catalog(catalog)
}

/// Catalog holding just `echo`.
#[allow(dead_code)]
pub fn echo_catalog() -> NativeCatalog {
    NativeCatalog::new().with("echo", || Box::new(EchoPlugin::new()))
}

/// A plugin whose `initialize` always fails.
#[derive(Debug, Default)]
pub struct BrokenPlugin;

#[async_trait]
impl CapabilityProvider for BrokenPlugin {
    fn describe(&self) -> PluginMetadata {
        PluginMetadata::new(
            "broken_plugin",
            "0.1.0",
            "Never initializes",
            PluginCategory::Custom,
            "tests",
        )
    }

    async fn initialize(&mut self, _config: &ConfigDocument) -> PluginResult<bool> {
        Err(PluginError::Initialization {
            plugin: "broken_plugin".into(),
            message: "bad config".into(),
        })
    }

    async fn list_tools(&self) -> PluginResult<Vec<Tool>> {
        Ok(Vec::new())
    }
}

/// A plugin whose `initialize` takes longer than any test timeout.
#[derive(Debug, Default)]
pub struct SlowPlugin;

#[async_trait]
impl CapabilityProvider for SlowPlugin {
    fn describe(&self) -> PluginMetadata {
        PluginMetadata::new("slow", "0.1.0", "Sleeps", PluginCategory::Custom, "tests")
    }

    async fn initialize(&mut self, _config: &ConfigDocument) -> PluginResult<bool> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(true)
    }

    async fn list_tools(&self) -> PluginResult<Vec<Tool>> {
        Ok(Vec::new())
    }
}

/// Shared switches observed by [`FlakyPlugin`] instances.
#[derive(Debug, Clone, Default)]
pub struct FlakyControl {
    /// When set, `initialize` fails.
    pub fail: Arc<AtomicBool>,
    /// Number of `cleanup` calls across instances.
    pub cleanups: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FlakyControl {
    /// Make subsequent initializations fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Cleanups seen so far.
    pub fn cleanup_count(&self) -> usize {
        self.cleanups.load(Ordering::SeqCst)
    }

    /// Register a `flaky` factory bound to these switches.
    pub fn register(&self, catalog: NativeCatalog) -> NativeCatalog {
        let control = self.clone();
        catalog.with("flaky", move || {
            Box::new(FlakyPlugin {
                control: control.clone(),
            })
        })
    }
}

/// Serves one `ping` tool in the `ai_analysis` category unless told to fail.
#[derive(Debug)]
pub struct FlakyPlugin {
    control: FlakyControl,
}

#[async_trait]
impl CapabilityProvider for FlakyPlugin {
    fn describe(&self) -> PluginMetadata {
        PluginMetadata::new("flaky", "2.0.0", "Fails on demand", PluginCategory::AiAnalysis, "tests")
    }

    async fn initialize(&mut self, _config: &ConfigDocument) -> PluginResult<bool> {
        if self.control.fail.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(true)
    }

    async fn list_tools(&self) -> PluginResult<Vec<Tool>> {
        Ok(vec![Tool::new("ping", "Answers pong", |_| {
            Ok(Value::String("pong".into()))
        })])
    }

    async fn cleanup(&mut self) -> PluginResult<()> {
        self.control.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
