//! Remote tool client errors.

use thiserror::Error;

/// Errors from the remote tool layer.
#[derive(Debug, Error)]
pub enum McpError {
    /// No server is configured for the category.
    #[error("no remote server for category: {category}")]
    ServerNotFound {
        /// The category that was requested.
        category: String,
    },

    /// Failed to start a server process.
    #[error("failed to start remote server {name}: {reason}")]
    ServerStartFailed {
        /// The server name.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// Connecting or handshaking failed.
    #[error("remote connection failed: {0}")]
    ConnectionFailed(String),

    /// An operation needed a connection that was never established.
    #[error("remote client is not connected")]
    NotConnected,

    /// The client was shut down.
    #[error("remote client has been shut down")]
    ShutDown,

    /// The category does not offer the tool.
    #[error("tool not found: {category}:{tool}")]
    ToolNotFound {
        /// Category name.
        category: String,
        /// Tool name.
        tool: String,
    },

    /// The call itself failed.
    #[error("tool call failed: {category}:{tool} - {reason}")]
    ToolCallFailed {
        /// Category name.
        category: String,
        /// Tool name.
        tool: String,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid server configuration.
    #[error("remote configuration error: {0}")]
    ConfigError(String),
}

/// Result type for remote tool operations.
pub type McpResult<T> = Result<T, McpError>;
