//! Configuration struct definitions.
//!
//! Every section derives `Default` with the same values as the embedded
//! `defaults.toml`, so a partially written file still deserializes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingSection,
    /// Plugin discovery and lifecycle settings.
    pub plugins: PluginsSection,
    /// Remote tool server settings.
    pub remote: RemoteSection,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Level filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Extra per-target directives, e.g. `fincap_mcp=debug`.
    pub directives: Vec<String>,
    /// Write rolling log files here instead of stderr.
    pub file_dir: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            file_dir: None,
        }
    }
}

/// `[plugins]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsSection {
    /// Directory scanned for `*.toml` plugin manifests.
    pub dir: PathBuf,
    /// JSON file holding per-plugin configuration documents.
    pub config_store: PathBuf,
    /// Upper bound on a single plugin's `initialize`.
    pub init_timeout_secs: u64,
}

impl Default for PluginsSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("plugins"),
            config_store: PathBuf::from("plugin_config.json"),
            init_timeout_secs: 30,
        }
    }
}

/// How remote tool categories are served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteMode {
    /// Built-in in-process catalog with canned responses.
    #[default]
    Simulated,
    /// One MCP server child process per configured category.
    Stdio,
}

impl std::fmt::Display for RemoteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simulated => f.write_str("simulated"),
            Self::Stdio => f.write_str("stdio"),
        }
    }
}

/// `[remote]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    /// Transport mode.
    pub mode: RemoteMode,
    /// Upper bound on a single bridged tool call.
    pub call_timeout_secs: u64,
    /// Grace period for closing server sessions.
    pub shutdown_timeout_secs: u64,
    /// Servers keyed by the tool category they serve.
    pub servers: BTreeMap<String, ServerSection>,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            mode: RemoteMode::default(),
            call_timeout_secs: 30,
            shutdown_timeout_secs: 5,
            servers: BTreeMap::new(),
        }
    }
}

/// `[remote.servers.<category>]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Executable to spawn.
    pub command: String,
    /// Arguments passed to the executable.
    pub args: Vec<String>,
    /// Extra environment for the child.
    pub env: BTreeMap<String, String>,
    /// Working directory for the child.
    pub cwd: Option<PathBuf>,
}

/// A loaded configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The merged, validated configuration.
    pub config: Config,
    /// The fincap home directory relative paths resolve against.
    pub home: PathBuf,
    /// Files that contributed, in merge order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.home.join(path)
        }
    }

    /// Absolute plugin manifest directory.
    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        self.resolve(&self.config.plugins.dir)
    }

    /// Absolute path of the plugin configuration store.
    #[must_use]
    pub fn config_store_path(&self) -> PathBuf {
        self.resolve(&self.config.plugins.config_store)
    }
}
