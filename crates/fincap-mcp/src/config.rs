//! Remote server definitions.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// How to spawn the MCP server that serves one tool category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Category this server's tools belong to.
    pub category: String,
    /// Executable to spawn.
    pub command: String,
    /// Command-line arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl ServerConfig {
    /// A stdio server for `category` launched with `command`.
    #[must_use]
    pub fn stdio(category: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    /// Set command-line arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let config = ServerConfig::stdio("market_data", "python3")
            .with_args(["-m", "servers.market_data"])
            .with_env("API_KEY", "demo")
            .with_cwd("/srv");
        assert_eq!(config.category, "market_data");
        assert_eq!(config.args, vec!["-m", "servers.market_data"]);
        assert_eq!(config.env.get("API_KEY").map(String::as_str), Some("demo"));
        assert_eq!(config.cwd, Some(PathBuf::from("/srv")));
    }
}
