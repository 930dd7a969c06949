//! fincap MCP - the shared remote tool client.
//!
//! Protocol-adapter plugins reach their tools through one process-wide
//! [`RemoteClient`], which wraps a [`ToolServer`]:
//!
//! - [`StdioToolServer`] spawns one MCP server child process per category
//!   through the official `rmcp` SDK.
//! - [`SimulatedToolServer`] serves the `market_data` and `ai_analysis`
//!   catalogs in-process with canned responses.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fincap_mcp::{RemoteClient, SimulatedToolServer};
//!
//! # async fn example() -> Result<(), fincap_mcp::McpError> {
//! let client = RemoteClient::new(Arc::new(SimulatedToolServer::new()));
//! for tool in client.list_tools("market_data").await? {
//!     println!("{}: {}", tool.name, tool.description);
//! }
//! let quote = client
//!     .call_tool("market_data", "get_stock_quote", serde_json::json!({"symbol": "MSFT"}))
//!     .await?;
//! println!("{}", quote.content);
//! client.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod simulated;
pub mod stdio;
pub mod types;

pub use client::RemoteClient;
pub use config::ServerConfig;
pub use error::{McpError, McpResult};
pub use server::ToolServer;
pub use simulated::{AI_ANALYSIS, MARKET_DATA, SimulatedToolServer};
pub use stdio::StdioToolServer;
pub use types::{RemoteTool, ToolResult};
