//! Invoking bridged remote tools from synchronous and asynchronous callers.

mod common;

use std::time::Duration;

use common::{echo_catalog, market_server, registry_with};
use fincap_plugins::{PluginError, RuntimeBridge, ToolInput};
use fincap_test::{MockReply, MockToolServer};
use serde_json::{Map, json};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invoke_from_inside_a_running_task() {
    let server = market_server().with_response("get_stock_quote", json!({"price": 101.5}));
    let registry = registry_with(&server, echo_catalog()).await;
    registry.initialize_all().await;
    let tool = registry.find_tool("get_stock_quote").await.unwrap();

    let result = tokio::spawn(async move { tool.invoke("How is $MSFT doing?") })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result, json!({"price": 101.5}));
    // The call is recorded before `invoke` returns: the bridge thread was joined.
    let calls = server.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].category, "market_data");
    assert_eq!(calls[0].args["symbol"], "MSFT");
    assert_eq!(calls[0].args["query"], "How is $MSFT doing?");
}

#[tokio::test]
async fn invoke_inside_current_thread_runtime() {
    let server = market_server();
    let registry = registry_with(&server, echo_catalog()).await;
    registry.initialize_all().await;
    let tool = registry.find_tool("get_market_summary").await.unwrap();

    let result = tool.invoke("summary please").unwrap();

    assert_eq!(result["tool"], "get_market_summary");
    assert_eq!(result["echo"], json!({"query": "summary please"}));
}

#[test]
fn invoke_from_plain_synchronous_code() {
    let server = market_server();
    let rt = tokio::runtime::Runtime::new().unwrap();
    let tool = rt.block_on(async {
        let registry = registry_with(&server, echo_catalog()).await;
        registry.initialize_all().await;
        registry.find_tool("get_stock_quote").await.unwrap()
    });

    // No runtime on this thread: the bridge runs the call on a fresh one.
    let handle = std::thread::spawn(move || tool.invoke("quote for NVDA"));
    let result = handle.join().unwrap().unwrap();

    assert_eq!(result["echo"]["symbol"], "NVDA");
    assert_eq!(server.calls().len(), 1);
}

#[tokio::test]
async fn structured_input_is_passed_through() {
    let server = market_server();
    let registry = registry_with(&server, echo_catalog()).await;
    registry.initialize_all().await;
    let tool = registry.find_tool("get_stock_quote").await.unwrap();

    let mut args = Map::new();
    args.insert("symbol".into(), json!("TSLA"));
    args.insert("interval".into(), json!("1d"));
    tool.invoke(ToolInput::Structured(args)).unwrap();

    assert_eq!(
        server.calls()[0].args,
        json!({"symbol": "TSLA", "interval": "1d"})
    );
}

#[tokio::test]
async fn missing_required_field_fails_before_the_call() {
    let server = MockToolServer::new().with_schema_tool(
        "risk_assessment",
        "score",
        json!({
            "type": "object",
            "properties": {"portfolio_id": {"type": "string"}},
            "required": ["portfolio_id"]
        }),
    );
    let registry = registry_with(&server, echo_catalog()).await;
    registry.initialize_all().await;
    let tool = registry.find_tool("score").await.unwrap();

    let err = tool.invoke("score my portfolio").unwrap_err();

    assert!(matches!(
        err,
        PluginError::ArgumentSynthesis { ref field, .. } if field == "portfolio_id"
    ));
    assert!(server.calls().is_empty());
}

#[tokio::test]
async fn remote_failures_surface_as_invocation_errors() {
    let server = market_server()
        .with_reply("get_stock_quote", MockReply::RemoteError("symbol delisted".into()))
        .with_reply(
            "get_market_summary",
            MockReply::TransportError("pipe closed".into()),
        );
    let registry = registry_with(&server, echo_catalog()).await;
    registry.initialize_all().await;

    let quote = registry.find_tool("get_stock_quote").await.unwrap();
    let err = quote.invoke("$ABC").unwrap_err();
    assert!(matches!(err, PluginError::ToolInvocation { .. }));
    assert!(err.to_string().contains("symbol delisted"));

    let summary = registry.find_tool("get_market_summary").await.unwrap();
    let err = summary.invoke("anything").unwrap_err();
    assert!(matches!(err, PluginError::ToolInvocation { .. }));
    assert!(err.to_string().contains("pipe closed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn slow_remote_call_times_out() {
    let server = market_server().with_call_delay(Duration::from_secs(5));
    let registry = registry_with(&server, echo_catalog())
        .await
        .with_runtime_bridge(RuntimeBridge::new(Duration::from_millis(50)));
    registry.initialize_all().await;
    let tool = registry.find_tool("get_market_summary").await.unwrap();

    let err = tool.invoke("slow").unwrap_err();

    assert!(matches!(err, PluginError::ToolInvocation { .. }));
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn calls_fail_after_shutdown() {
    let server = market_server();
    let registry = registry_with(&server, echo_catalog()).await;
    registry.initialize_all().await;
    let tool = registry.find_tool("get_market_summary").await.unwrap();

    registry.shutdown().await;

    assert!(tool.invoke("after").is_err());
    assert!(server.calls().is_empty());
}
