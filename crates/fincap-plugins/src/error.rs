//! Plugin error types.

use std::path::PathBuf;

use fincap_mcp::McpError;
use fincap_storage::StorageError;

/// Errors from plugin operations.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    /// No plugin, candidate, or tool by this name.
    #[error("plugin not found: {0}")]
    NotFound(String),

    /// The provider's `initialize` failed, returned `false`, or timed out.
    #[error("plugin initialization failed: {plugin} - {message}")]
    Initialization {
        /// The plugin that failed to initialize.
        plugin: String,
        /// Failure reason.
        message: String,
    },

    /// A configuration document was rejected.
    #[error("invalid configuration for {plugin}: {message}")]
    Configuration {
        /// The plugin being configured.
        plugin: String,
        /// Why the document was rejected.
        message: String,
    },

    /// Free-text input could not produce a field the tool requires.
    #[error("cannot synthesize required field '{field}' for tool {tool}")]
    ArgumentSynthesis {
        /// The tool being invoked.
        tool: String,
        /// The required field that is missing.
        field: String,
    },

    /// A tool call failed, timed out, or the remote side reported an error.
    #[error("tool {tool} failed: {cause}")]
    ToolInvocation {
        /// The tool that failed.
        tool: String,
        /// Underlying cause.
        cause: String,
    },

    /// Candidate enumeration failed.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Failed to parse a plugin manifest file.
    #[error("manifest parse error in {path}: {message}")]
    ManifestParse {
        /// Path to the manifest file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// Configuration persistence failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The shared remote client failed.
    #[error("remote error: {0}")]
    Remote(#[from] McpError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Shorthand for [`PluginError::ToolInvocation`].
    pub fn invocation(tool: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;
