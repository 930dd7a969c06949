//! Bridge from `fincap_config::Config` to runtime types.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use fincap_config::{Config, RemoteMode, RemoteSection, ResolvedConfig};
use fincap_mcp::{RemoteClient, ServerConfig, SimulatedToolServer, StdioToolServer, ToolServer};
use fincap_plugins::{ConfigStore, PluginRegistry, RuntimeBridge};
use fincap_storage::FileKvStore;
use fincap_telemetry::{FileRotation, LogConfig, LogFormat};
use tracing::info;

/// Convert the `[logging]` section to a [`LogConfig`].
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    let format = match cfg.logging.format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        "full" => LogFormat::Full,
        _ => LogFormat::Compact,
    };

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);

    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    if let Some(dir) = &cfg.logging.file_dir {
        log_config = log_config.with_file_logging(dir, FileRotation::Daily);
    }

    log_config
}

/// One [`ServerConfig`] per `[remote.servers.<category>]` table.
pub(crate) fn to_server_configs(remote: &RemoteSection) -> Vec<ServerConfig> {
    remote
        .servers
        .iter()
        .map(|(category, section)| {
            let mut server = ServerConfig::stdio(category, &section.command)
                .with_args(section.args.iter().cloned());
            for (key, value) in &section.env {
                server = server.with_env(key, value);
            }
            if let Some(cwd) = &section.cwd {
                server = server.with_cwd(cwd);
            }
            server
        })
        .collect()
}

fn build_tool_server(remote: &RemoteSection) -> anyhow::Result<Arc<dyn ToolServer>> {
    Ok(match remote.mode {
        RemoteMode::Simulated => Arc::new(SimulatedToolServer::new()),
        RemoteMode::Stdio => Arc::new(
            StdioToolServer::new(
                to_server_configs(remote),
                Duration::from_secs(remote.shutdown_timeout_secs),
            )
            .context("failed to set up remote tool servers")?,
        ),
    })
}

/// Build the plugin registry described by `resolved`. Nothing is loaded.
pub(crate) async fn build_registry(resolved: &ResolvedConfig) -> anyhow::Result<PluginRegistry> {
    let cfg = &resolved.config;
    let client = Arc::new(RemoteClient::new(build_tool_server(&cfg.remote)?));

    let store_path = resolved.config_store_path();
    let kv = FileKvStore::open(&store_path)
        .with_context(|| format!("failed to open {}", store_path.display()))?;
    let config_store = ConfigStore::open(Arc::new(kv))
        .await
        .context("failed to load plugin configuration")?;

    info!(
        mode = %cfg.remote.mode,
        plugins_dir = %resolved.plugins_dir().display(),
        config_store = %store_path.display(),
        "Building plugin registry"
    );

    Ok(PluginRegistry::new(client, Arc::new(config_store))
        .with_plugins_dir(resolved.plugins_dir())
        .with_init_timeout(Duration::from_secs(cfg.plugins.init_timeout_secs))
        .with_runtime_bridge(RuntimeBridge::new(Duration::from_secs(
            cfg.remote.call_timeout_secs,
        ))))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use fincap_config::ServerSection;
    use fincap_telemetry::LogTarget;

    use super::*;

    #[test]
    fn log_config_from_logging_section() {
        let mut cfg = Config::default();
        cfg.logging.level = "warn".into();
        cfg.logging.format = "json".into();
        cfg.logging.directives = vec!["fincap_plugins=debug".into()];

        let lc = to_log_config(&cfg);
        assert_eq!(lc.level, "warn");
        assert_eq!(lc.format, LogFormat::Json);
        assert_eq!(lc.directives, vec!["fincap_plugins=debug"]);
        assert_eq!(lc.target, LogTarget::Stderr);

        cfg.logging.format = "bogus".into();
        cfg.logging.file_dir = Some(PathBuf::from("/var/log/fincap"));
        let lc = to_log_config(&cfg);
        assert_eq!(lc.format, LogFormat::Compact);
        assert_eq!(lc.target, LogTarget::File(PathBuf::from("/var/log/fincap")));
        assert!(!lc.ansi);
    }

    #[test]
    fn server_configs_per_category() {
        let mut remote = RemoteSection::default();
        remote.servers.insert(
            "market_data".into(),
            ServerSection {
                command: "python3".into(),
                args: vec!["market_server.py".into()],
                env: [("API_KEY".to_string(), "k".to_string())].into(),
                cwd: Some(PathBuf::from("/srv")),
            },
        );

        let servers = to_server_configs(&remote);
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].category, "market_data");
        assert_eq!(servers[0].command, "python3");
        assert_eq!(servers[0].args, vec!["market_server.py"]);
        assert_eq!(servers[0].env.get("API_KEY").map(String::as_str), Some("k"));
        assert_eq!(servers[0].cwd, Some(PathBuf::from("/srv")));
    }

    #[tokio::test]
    async fn registry_from_simulated_config() {
        let home = tempfile::tempdir().unwrap();
        let resolved = ResolvedConfig {
            config: Config::default(),
            home: home.path().to_path_buf(),
            loaded_files: Vec::new(),
        };

        let registry = build_registry(&resolved).await.unwrap();
        let names = registry.discover().await.unwrap();

        assert_eq!(
            names,
            vec!["echo", "compliance", "market_data_adapter", "ai_analysis_adapter"]
        );
        registry.shutdown().await;
    }
}
