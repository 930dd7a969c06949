//! Process-wide remote tool client.
//!
//! One [`RemoteClient`] is constructed per process and shared (behind an
//! `Arc`) by every protocol-adapter plugin. It connects lazily: the first
//! caller of [`ensure_connected`](RemoteClient::ensure_connected) performs the
//! connect, concurrent callers wait for that same attempt, and a failed
//! attempt leaves the client unconnected so a later caller retries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{McpError, McpResult};
use crate::server::ToolServer;
use crate::types::{RemoteTool, ToolResult};

/// Shared, connect-once client over a [`ToolServer`].
#[derive(Debug)]
pub struct RemoteClient {
    server: Arc<dyn ToolServer>,
    connected: OnceCell<()>,
    shut_down: AtomicBool,
}

impl RemoteClient {
    /// Wrap a server. Nothing is connected yet.
    #[must_use]
    pub fn new(server: Arc<dyn ToolServer>) -> Self {
        Self {
            server,
            connected: OnceCell::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Categories the underlying server can serve.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.server.categories()
    }

    /// Whether a connection is established and not shut down.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.initialized() && !self.shut_down.load(Ordering::SeqCst)
    }

    fn check_open(&self) -> McpResult<()> {
        if self.shut_down.load(Ordering::SeqCst) {
            Err(McpError::ShutDown)
        } else {
            Ok(())
        }
    }

    /// Connect if not already connected.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::ShutDown`] after [`shutdown`](Self::shutdown), or
    /// the server's connect error.
    pub async fn ensure_connected(&self) -> McpResult<()> {
        self.check_open()?;
        self.connected
            .get_or_try_init(|| async {
                info!(kind = self.server.kind(), "Connecting remote tool client");
                self.server.connect().await
            })
            .await
            .map(|_| ())
    }

    /// Catalog for `category`, connecting first if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting or listing fails.
    pub async fn list_tools(&self, category: &str) -> McpResult<Vec<RemoteTool>> {
        self.ensure_connected().await?;
        let tools = self.server.list_tools(category).await?;
        debug!(category, tool_count = tools.len(), "Listed remote tools");
        Ok(tools)
    }

    /// Call a tool, connecting first if needed.
    ///
    /// A remote-reported failure is returned as `Ok` with
    /// [`ToolResult::is_error`] set; transport failures are `Err`.
    ///
    /// # Errors
    ///
    /// Returns an error if connecting or the call itself fails.
    pub async fn call_tool(&self, category: &str, tool: &str, args: Value) -> McpResult<ToolResult> {
        self.ensure_connected().await?;
        self.server.call_tool(category, tool, args).await
    }

    /// Shut the server down. Idempotent; later calls on this client fail
    /// with [`McpError::ShutDown`].
    ///
    /// # Errors
    ///
    /// Returns the server's shutdown error.
    pub async fn shutdown(&self) -> McpResult<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.connected.initialized() {
            self.server.shutdown().await?;
        }
        info!(kind = self.server.kind(), "Remote tool client shut down");
        Ok(())
    }
}
