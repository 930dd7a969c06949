//! fincap CLI - plugin registry operator tool.
//!
//! Builds the plugin registry from configuration, runs one command against
//! it, and shuts it down again.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fincap_plugins::{ManageAction, PluginManager, PluginRegistry};

mod commands;
mod config_bridge;
mod theme;

use commands::{OutputFormat, invoke, plugins};

/// fincap - plugin registry and dynamic tool discovery
#[derive(Parser)]
#[command(name = "fincap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Additional configuration file, merged over the defaults
    #[arg(short, long, global = true, env = "FINCAP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List plugin candidates without loading them
    Discover,
    /// Load every discovered plugin and report the result
    Init,
    /// List plugins and their status
    List,
    /// Show registry statistics
    Stats,
    /// List available tools
    Tools {
        /// Only tools in this category (e.g. `market_data`)
        #[arg(long)]
        category: Option<String>,
    },
    /// Load a plugin
    Load {
        /// Plugin name
        name: String,
    },
    /// Unload a plugin
    Unload {
        /// Plugin name
        name: String,
    },
    /// Reload a plugin
    Reload {
        /// Plugin name
        name: String,
    },
    /// Store a plugin's configuration and reload it
    Configure {
        /// Plugin name
        name: String,
        /// Set a configuration key (repeatable)
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
        /// Full configuration document as a JSON object
        #[arg(long, conflicts_with = "set")]
        json: Option<String>,
    },
    /// Invoke a tool
    Invoke {
        /// Tool name
        tool: String,
        /// Free-text request
        text: Option<String>,
        /// Structured arguments as JSON
        #[arg(long, conflicts_with = "text")]
        json: Option<String>,
    },
}

impl Commands {
    /// Whether the command works on loaded plugins.
    fn needs_plugins(&self) -> bool {
        !matches!(self, Self::Discover | Self::Load { .. })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = fincap_config::load(cli.config.as_deref(), None);

    // Set up logging from config, with --verbose override.
    let mut log_config = match &resolved {
        Ok(r) => config_bridge::to_log_config(&r.config),
        Err(_) => fincap_telemetry::LogConfig::new("info"),
    };
    if cli.verbose {
        "debug".clone_into(&mut log_config.level);
    }
    if let Err(e) = fincap_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let resolved = resolved.context("failed to load configuration")?;
    for file in &resolved.loaded_files {
        tracing::debug!(file = %file, "Loaded configuration file");
    }

    let registry = Arc::new(config_bridge::build_registry(&resolved).await?);
    if cli.command.needs_plugins() {
        registry.initialize_all().await;
    }

    let result = run(cli.command, &registry, cli.format).await;
    registry.shutdown().await;
    result
}

async fn run(command: Commands, registry: &Arc<PluginRegistry>, format: OutputFormat) -> Result<()> {
    let manager = PluginManager::new(Arc::clone(registry));

    match command {
        Commands::Discover => plugins::discover(registry, format).await,
        Commands::Init | Commands::List => plugins::list(&manager, format).await,
        Commands::Stats => plugins::stats(registry, format).await,
        Commands::Tools { category } => plugins::tools(registry, category.as_deref(), format).await,
        Commands::Load { name } => {
            registry.discover().await?;
            plugins::manage(&manager, &name, ManageAction::Load, None, format).await
        },
        Commands::Unload { name } => {
            plugins::manage(&manager, &name, ManageAction::Unload, None, format).await
        },
        Commands::Reload { name } => {
            plugins::manage(&manager, &name, ManageAction::Reload, None, format).await
        },
        Commands::Configure { name, set, json } => {
            let config = plugins::configuration_document(&set, json.as_deref())?;
            plugins::manage(&manager, &name, ManageAction::Configure, config, format).await
        },
        Commands::Invoke { tool, text, json } => {
            let input = invoke::tool_input(text, json.as_deref())?;
            invoke::run(registry, &tool, input, format).await
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn configure_accepts_repeated_set() {
        let cli = Cli::try_parse_from([
            "fincap",
            "configure",
            "compliance",
            "--set",
            "strict_mode=false",
            "--set",
            "regulatory_jurisdiction=EU",
        ])
        .unwrap();
        let Commands::Configure { name, set, json } = cli.command else {
            panic!("expected configure");
        };
        assert_eq!(name, "compliance");
        assert_eq!(set.len(), 2);
        assert!(json.is_none());
    }

    #[test]
    fn invoke_rejects_text_and_json_together() {
        let parsed = Cli::try_parse_from(["fincap", "invoke", "say", "hi", "--json", "{}"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn only_discover_and_load_skip_initialization() {
        let cli = Cli::try_parse_from(["fincap", "discover"]).unwrap();
        assert!(!cli.command.needs_plugins());
        let cli = Cli::try_parse_from(["fincap", "load", "echo"]).unwrap();
        assert!(!cli.command.needs_plugins());
        let cli = Cli::try_parse_from(["fincap", "--format", "json", "tools", "--category", "custom"])
            .unwrap();
        assert!(cli.command.needs_plugins());
        assert_eq!(cli.format, OutputFormat::Json);
    }

    #[test]
    fn short_c_is_the_config_flag() {
        let cli = Cli::try_parse_from(["fincap", "tools", "-c", "alt.toml"]).unwrap();
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("alt.toml")));
        let Commands::Tools { category } = cli.command else {
            panic!("expected tools");
        };
        assert!(category.is_none());
    }
}
