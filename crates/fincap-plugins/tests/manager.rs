//! Operator management requests and consumer refresh.

mod common;

use std::sync::Arc;

use common::{FlakyControl, echo_catalog, market_server, registry_with};
use fincap_plugins::{
    ManageAction, ManageError, ManageRequest, PluginCategory, PluginError, PluginManager,
    PluginStatus, ToolBelt, refresh_consumer,
};
use fincap_test::MockToolServer;
use serde_json::{Map, Value, json};

async fn manager() -> PluginManager {
    let registry = registry_with(&market_server(), echo_catalog()).await;
    registry.initialize_all().await;
    PluginManager::new(Arc::new(registry))
}

fn doc(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn load_reports_active_record() {
    let manager = manager().await;

    let response = manager
        .manage(ManageRequest::new("market_data_adapter", ManageAction::Reload))
        .await
        .unwrap();

    assert_eq!(response.plugin_name, "market_data_adapter");
    assert_eq!(response.status, PluginStatus::Active);
    assert_eq!(response.tools_count, 2);
    assert_eq!(response.category, PluginCategory::MarketData);
    assert_eq!(response.version, "1.0.0");
}

#[tokio::test]
async fn unload_reports_removed_record_then_not_found() {
    let manager = manager().await;

    let response = manager
        .manage(ManageRequest::new("echo", ManageAction::Unload))
        .await
        .unwrap();
    assert_eq!(response.plugin_name, "echo");
    assert_eq!(response.tools_count, 1);
    assert_eq!(response.status, PluginStatus::Active);
    assert!(manager.registry().get("echo").await.is_none());
    assert_eq!(manager.registry().status("echo").await, None);

    let err = manager
        .manage(ManageRequest::new("echo", ManageAction::Unload))
        .await
        .unwrap_err();
    assert!(matches!(err, ManageError::PluginNotFound(ref name) if name == "echo"));
}

#[tokio::test]
async fn invalid_action_is_rejected() {
    let manager = manager().await;
    let request = ManageRequest {
        plugin_name: "echo".into(),
        action: "explode".into(),
        config: None,
    };

    let err = manager.manage(request).await.unwrap_err();

    assert!(matches!(err, ManageError::InvalidAction(ref a) if a == "explode"));
    assert_eq!("RELOAD".parse::<ManageAction>().unwrap(), ManageAction::Reload);
}

#[tokio::test]
async fn configure_requires_a_document() {
    let manager = manager().await;

    let err = manager
        .manage(ManageRequest::new("echo", ManageAction::Configure))
        .await
        .unwrap_err();

    assert!(matches!(err, ManageError::ConfigurationRequired(_)));
}

#[tokio::test]
async fn configure_persists_and_reloads() {
    let manager = manager().await;

    let response = manager
        .manage(ManageRequest::configure("echo", doc(json!({"prefix": ">> "}))))
        .await
        .unwrap();
    assert_eq!(response.status, PluginStatus::Active);

    let stored = manager.registry().config_store().get("echo").await;
    assert_eq!(stored.get("prefix"), Some(&json!(">> ")));

    let say = manager.registry().find_tool("say").await.unwrap();
    assert_eq!(say.invoke("hi").unwrap(), json!(">> hi"));
}

#[tokio::test]
async fn invalid_configuration_is_not_persisted() {
    let manager = manager().await;

    let err = manager
        .manage(ManageRequest::configure("echo", doc(json!({"prefix": 5}))))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ManageError::Plugin(PluginError::Configuration { .. })
    ));
    assert!(!manager.registry().config_store().contains("echo").await);
    assert_eq!(
        manager.registry().status("echo").await,
        Some(PluginStatus::Active)
    );
}

#[tokio::test]
async fn request_deserializes_from_json() {
    let request: ManageRequest = serde_json::from_value(json!({
        "plugin_name": "echo",
        "action": "configure",
        "config": {"prefix": "!"}
    }))
    .unwrap();

    assert_eq!(request, ManageRequest::configure("echo", doc(json!({"prefix": "!"}))));
}

#[tokio::test]
async fn consumers_follow_registry_changes() {
    let manager = manager().await;
    let all = Arc::new(ToolBelt::new("advisor", Vec::new()));
    let market = Arc::new(ToolBelt::new("quotes", vec![PluginCategory::MarketData]));

    manager.register_consumer(all.clone()).await;
    manager.register_consumer(market.clone()).await;
    assert_eq!(
        all.tool_names().await,
        vec!["say", "get_stock_quote", "get_market_summary"]
    );
    assert_eq!(market.tool_names().await, vec!["get_stock_quote", "get_market_summary"]);

    manager
        .manage(ManageRequest::new("market_data_adapter", ManageAction::Unload))
        .await
        .unwrap();

    assert_eq!(all.tool_names().await, vec!["say"]);
    assert!(market.tools().await.is_empty());
    assert_eq!(market.rebind_count(), 2);
}

#[tokio::test]
async fn refresh_is_idempotent() {
    let registry = registry_with(&market_server(), echo_catalog()).await;
    registry.initialize_all().await;
    let belt = ToolBelt::new(
        "dup",
        vec![PluginCategory::Custom, PluginCategory::Custom],
    );

    let first = refresh_consumer(&belt, &registry).await;
    let names = belt.tool_names().await;
    let second = refresh_consumer(&belt, &registry).await;

    assert_eq!(first, 1);
    assert_eq!(first, second);
    assert_eq!(names, belt.tool_names().await);
    assert!(belt.tool("say").await.is_some());
}

#[tokio::test]
async fn failed_reload_still_refreshes_consumers() {
    let control = FlakyControl::default();
    let registry = registry_with(&MockToolServer::new(), control.register(echo_catalog())).await;
    registry.initialize_all().await;
    let manager = PluginManager::new(Arc::new(registry));
    let belt = Arc::new(ToolBelt::new("analysis", vec![PluginCategory::AiAnalysis]));
    manager.register_consumer(belt.clone()).await;
    assert_eq!(belt.tool_names().await, vec!["ping"]);

    control.set_failing(true);
    let response = manager
        .manage(ManageRequest::new("flaky", ManageAction::Reload))
        .await
        .unwrap();

    assert_eq!(response.status, PluginStatus::Error);
    assert_eq!(response.tools_count, 0);
    assert!(belt.tools().await.is_empty());
}

#[tokio::test]
async fn available_lists_every_record() {
    let control = FlakyControl::default();
    control.set_failing(true);
    let registry = registry_with(&market_server(), control.register(echo_catalog())).await;
    registry.initialize_all().await;
    let manager = PluginManager::new(Arc::new(registry));

    let rows = manager.available().await;

    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["echo", "flaky", "market_data_adapter"]);
    let flaky = &rows[1];
    assert_eq!(flaky.status, PluginStatus::Error);
    assert!(flaky.error_message.is_some());
    assert_eq!(rows[2].tools_count, 2);
}
