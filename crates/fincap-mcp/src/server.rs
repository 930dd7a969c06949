//! The transport-agnostic remote tool server seam.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::McpResult;
use crate::types::{RemoteTool, ToolResult};

/// A source of remote tools grouped by category.
///
/// [`RemoteClient`](crate::RemoteClient) guarantees `connect` is called at
/// most once successfully and `shutdown` at most once.
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Short label for logs (`"stdio"`, `"simulated"`, ...).
    fn kind(&self) -> &'static str;

    /// Categories this server can serve. Available before `connect`.
    fn categories(&self) -> Vec<String>;

    /// Establish connections.
    async fn connect(&self) -> McpResult<()>;

    /// Catalog for one category, in server order.
    async fn list_tools(&self, category: &str) -> McpResult<Vec<RemoteTool>>;

    /// Invoke `tool` in `category` with JSON `args`.
    async fn call_tool(&self, category: &str, tool: &str, args: Value) -> McpResult<ToolResult>;

    /// Close all connections.
    async fn shutdown(&self) -> McpResult<()>;
}

impl std::fmt::Debug for dyn ToolServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServer")
            .field("kind", &self.kind())
            .field("categories", &self.categories())
            .finish_non_exhaustive()
    }
}
