//! Manifest-declared plugins and persisted configuration.

mod common;

use std::sync::Arc;

use common::{market_server, registry_with};
use fincap_mcp::RemoteClient;
use fincap_plugins::{
    CandidateKind, ConfigStore, NativeCatalog, PluginCategory, PluginRegistry, PluginStatus,
};
use fincap_storage::FileKvStore;
use serde_json::{Map, json};
use tempfile::TempDir;

const STRICT_OFF: &str = r#"
name = "lenient_compliance"
description = "Compliance checks without the disclaimer rule"

[source]
kind = "native"
factory = "compliance"

[config]
strict_mode = false
"#;

const QUOTES: &str = r#"
name = "quotes"

[source]
kind = "adapter"
category = "market_data"
"#;

fn plugins_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("10-lenient.toml"), STRICT_OFF).unwrap();
    std::fs::write(dir.path().join("20-quotes.toml"), QUOTES).unwrap();
    std::fs::write(dir.path().join("30-broken.toml"), "name = ").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    dir
}

#[tokio::test]
async fn manifests_sit_between_native_and_adapters() {
    let dir = plugins_dir();
    let registry = registry_with(&market_server(), NativeCatalog::with_builtins())
        .await
        .with_plugins_dir(dir.path());

    let names = registry.discover().await.unwrap();

    assert_eq!(
        names,
        vec![
            "echo",
            "compliance",
            "lenient_compliance",
            "quotes",
            "market_data_adapter"
        ]
    );
    let candidates = registry.candidates().await;
    assert_eq!(
        candidates[2].kind,
        CandidateKind::Native {
            factory: "compliance".into()
        }
    );
    assert!(candidates[2].manifest.is_some());
    assert_eq!(candidates[2].defaults.get("strict_mode"), Some(&json!(false)));
}

#[tokio::test]
async fn manifest_plugins_load_under_their_own_names() {
    let dir = plugins_dir();
    let registry = registry_with(&market_server(), NativeCatalog::with_builtins())
        .await
        .with_plugins_dir(dir.path());

    registry.initialize_all().await;

    let lenient = registry.get("lenient_compliance").await.unwrap();
    assert_eq!(lenient.status, PluginStatus::Active);
    assert_eq!(lenient.metadata.name, "lenient_compliance");
    assert_eq!(lenient.metadata.category, PluginCategory::Compliance);

    let quotes = registry.get("quotes").await.unwrap();
    assert_eq!(quotes.metadata.category, PluginCategory::MarketData);
    assert_eq!(quotes.tools_count(), 2);

    let stats = registry.stats().await;
    assert_eq!(stats.total, 5);
    assert_eq!(stats.error, 0);
    assert_eq!(stats.per_category_counts[&PluginCategory::Compliance], 8);
}

#[tokio::test]
async fn manifest_defaults_configure_the_provider() {
    let dir = plugins_dir();
    let registry = registry_with(&market_server(), NativeCatalog::with_builtins())
        .await
        .with_plugins_dir(dir.path());
    registry.discover().await.unwrap();
    assert!(registry.load("lenient_compliance").await);

    let tools = registry
        .available_tools(Some(PluginCategory::Compliance))
        .await;
    let check = tools
        .iter()
        .find(|t| t.name() == "check_compliance")
        .unwrap();
    let verdict = check.invoke("Diversify across index funds.").unwrap();

    assert!(
        !verdict
            .as_str()
            .unwrap()
            .contains("Missing required financial disclaimers")
    );
}

#[tokio::test]
async fn stored_config_overrides_manifest_defaults() {
    let dir = plugins_dir();
    let registry = registry_with(&market_server(), NativeCatalog::with_builtins())
        .await
        .with_plugins_dir(dir.path());
    registry.discover().await.unwrap();

    let mut doc = Map::new();
    doc.insert("strict_mode".into(), json!(true));
    registry.configure("lenient_compliance", doc).await.unwrap();
    assert!(registry.load("lenient_compliance").await);

    let check = registry.find_tool("check_compliance").await.unwrap();
    let verdict = check.invoke("Diversify across index funds.").unwrap();
    assert!(
        verdict
            .as_str()
            .unwrap()
            .contains("Missing required financial disclaimers")
    );
}

#[tokio::test]
async fn configuration_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plugin_config.json");
    let server = market_server();

    {
        let kv = Arc::new(FileKvStore::open(&path).unwrap());
        let store = Arc::new(ConfigStore::open(kv).await.unwrap());
        let registry = PluginRegistry::new(
            Arc::new(RemoteClient::new(Arc::new(server.clone()))),
            store,
        );
        let mut doc = Map::new();
        doc.insert("prefix".into(), json!("[saved] "));
        registry.configure("echo", doc).await.unwrap();
    }

    let kv = Arc::new(FileKvStore::open(&path).unwrap());
    let store = Arc::new(ConfigStore::open(kv).await.unwrap());
    let registry = PluginRegistry::new(
        Arc::new(RemoteClient::new(Arc::new(server.clone()))),
        store,
    );
    registry.initialize_all().await;

    let say = registry.find_tool("say").await.unwrap();
    assert_eq!(say.invoke("hello").unwrap(), json!("[saved] hello"));
}
