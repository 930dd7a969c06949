//! Consumers of the aggregated tool list.
//!
//! An agent that offers tools to an LLM holds its own copy of the tool
//! list. [`refresh_consumer`] pulls the current list for the consumer's
//! categories from the registry and hands it over through
//! [`ToolConsumer::rebind`]; calling it twice without registry changes
//! yields the same list.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::plugin::PluginCategory;
use crate::registry::PluginRegistry;
use crate::tool::Tool;

/// Something that holds a tool list sourced from the registry.
#[async_trait]
pub trait ToolConsumer: Send + Sync {
    /// Label for logs.
    fn name(&self) -> &str;

    /// Categories to pull. Empty means every category.
    fn categories(&self) -> Vec<PluginCategory>;

    /// Replace the held tool list.
    async fn rebind(&self, tools: Vec<Tool>);
}

impl std::fmt::Debug for dyn ToolConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolConsumer")
            .field("name", &self.name())
            .field("categories", &self.categories())
            .finish_non_exhaustive()
    }
}

/// Pull the consumer's tools from `registry` and rebind it. Returns the
/// number of tools bound.
pub async fn refresh_consumer(consumer: &dyn ToolConsumer, registry: &PluginRegistry) -> usize {
    let mut categories = Vec::new();
    for category in consumer.categories() {
        if !categories.contains(&category) {
            categories.push(category);
        }
    }

    let tools = if categories.is_empty() {
        registry.available_tools(None).await
    } else {
        let mut tools = Vec::new();
        for category in categories {
            tools.extend(registry.available_tools(Some(category)).await);
        }
        tools
    };

    let count = tools.len();
    consumer.rebind(tools).await;
    debug!(consumer = consumer.name(), tool_count = count, "Refreshed tool consumer");
    count
}

/// Stock [`ToolConsumer`] that simply keeps the last bound list.
#[derive(Debug)]
pub struct ToolBelt {
    name: String,
    categories: Vec<PluginCategory>,
    tools: RwLock<Vec<Tool>>,
    rebinds: AtomicUsize,
}

impl ToolBelt {
    /// A belt pulling `categories` (empty for all).
    #[must_use]
    pub fn new(name: impl Into<String>, categories: Vec<PluginCategory>) -> Self {
        Self {
            name: name.into(),
            categories,
            tools: RwLock::new(Vec::new()),
            rebinds: AtomicUsize::new(0),
        }
    }

    /// The currently bound tools.
    pub async fn tools(&self) -> Vec<Tool> {
        self.tools.read().await.clone()
    }

    /// Names of the currently bound tools.
    pub async fn tool_names(&self) -> Vec<String> {
        self.tools
            .read()
            .await
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    /// The bound tool called `name`.
    pub async fn tool(&self, name: &str) -> Option<Tool> {
        self.tools
            .read()
            .await
            .iter()
            .rev()
            .find(|t| t.name() == name)
            .cloned()
    }

    /// How many times the belt has been rebound.
    #[must_use]
    pub fn rebind_count(&self) -> usize {
        self.rebinds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolConsumer for ToolBelt {
    fn name(&self) -> &str {
        &self.name
    }

    fn categories(&self) -> Vec<PluginCategory> {
        self.categories.clone()
    }

    async fn rebind(&self, tools: Vec<Tool>) {
        *self.tools.write().await = tools;
        self.rebinds.fetch_add(1, Ordering::SeqCst);
    }
}
