//! Mock implementations for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fincap_mcp::{McpError, McpResult, RemoteTool, ToolResult, ToolServer};
use serde_json::{Value, json};

/// A scripted reply to a tool call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Successful result with this payload.
    Value(Value),
    /// The server answers with `is_error` and this message.
    RemoteError(String),
    /// The transport fails with this reason.
    TransportError(String),
}

/// A recorded tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Category the call was routed to.
    pub category: String,
    /// Tool name.
    pub tool: String,
    /// Arguments as received.
    pub args: Value,
}

/// Mock implementation of [`ToolServer`].
///
/// Uses `std::sync::Mutex` internally so builders work without a runtime
/// and calls work from any runtime, including short-lived ones.
#[derive(Debug, Clone, Default)]
pub struct MockToolServer {
    catalog: Arc<Mutex<Vec<RemoteTool>>>,
    replies: Arc<Mutex<HashMap<String, MockReply>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    connects: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
    connect_error: Arc<Mutex<Option<String>>>,
    call_delay: Option<Duration>,
}

impl MockToolServer {
    /// Create an empty mock server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool with an open object schema.
    #[must_use]
    pub fn with_tool(self, category: &str, name: &str) -> Self {
        self.with_schema_tool(category, name, json!({"type": "object"}))
    }

    /// Add a tool with an explicit input schema.
    #[must_use]
    pub fn with_schema_tool(self, category: &str, name: &str, schema: Value) -> Self {
        if let Ok(mut guard) = self.catalog.lock() {
            guard.push(RemoteTool::new(
                category,
                name,
                format!("mock {name}"),
                schema,
            ));
        }
        self
    }

    /// Script the reply for a tool. Unscripted tools echo their arguments.
    #[must_use]
    pub fn with_reply(self, tool: &str, reply: MockReply) -> Self {
        if let Ok(mut guard) = self.replies.lock() {
            guard.insert(tool.to_string(), reply);
        }
        self
    }

    /// Script a successful reply.
    #[must_use]
    pub fn with_response(self, tool: &str, value: Value) -> Self {
        self.with_reply(tool, MockReply::Value(value))
    }

    /// Make every `connect` fail with `message`.
    #[must_use]
    pub fn with_connect_error(self, message: &str) -> Self {
        if let Ok(mut guard) = self.connect_error.lock() {
            *guard = Some(message.to_string());
        }
        self
    }

    /// Sleep this long inside every call.
    #[must_use]
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Number of `connect` calls seen.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of `shutdown` calls seen.
    #[must_use]
    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    /// All calls seen so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ToolServer for MockToolServer {
    fn kind(&self) -> &'static str {
        "mock"
    }

    fn categories(&self) -> Vec<String> {
        let mut categories: Vec<String> = Vec::new();
        if let Ok(guard) = self.catalog.lock() {
            for tool in guard.iter() {
                if !categories.contains(&tool.category) {
                    categories.push(tool.category.clone());
                }
            }
        }
        categories
    }

    async fn connect(&self) -> McpResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let error = self.connect_error.lock().ok().and_then(|g| g.clone());
        match error {
            Some(message) => Err(McpError::ConnectionFailed(message)),
            None => Ok(()),
        }
    }

    async fn list_tools(&self, category: &str) -> McpResult<Vec<RemoteTool>> {
        let tools: Vec<RemoteTool> = self
            .catalog
            .lock()
            .map(|g| g.iter().filter(|t| t.category == category).cloned().collect())
            .unwrap_or_default();
        if tools.is_empty() {
            return Err(McpError::ServerNotFound {
                category: category.to_string(),
            });
        }
        Ok(tools)
    }

    async fn call_tool(&self, category: &str, tool: &str, args: Value) -> McpResult<ToolResult> {
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(RecordedCall {
                category: category.to_string(),
                tool: tool.to_string(),
                args: args.clone(),
            });
        }

        let reply = self.replies.lock().ok().and_then(|g| g.get(tool).cloned());
        match reply {
            Some(MockReply::Value(value)) => Ok(ToolResult::success(value)),
            Some(MockReply::RemoteError(message)) => Ok(ToolResult::error(message)),
            Some(MockReply::TransportError(reason)) => Err(McpError::ToolCallFailed {
                category: category.to_string(),
                tool: tool.to_string(),
                reason,
            }),
            None => Ok(ToolResult::success(json!({"tool": tool, "echo": args}))),
        }
    }

    async fn shutdown(&self) -> McpResult<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
