//! In-process tool server with canned market-data and analysis responses.
//!
//! Serves the `market_data` and `ai_analysis` catalogs without spawning
//! anything, so the registry can be exercised end to end on a machine with
//! no MCP servers installed.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::error::{McpError, McpResult};
use crate::server::ToolServer;
use crate::types::{RemoteTool, ToolResult};

/// Category served with quote and market-summary tools.
pub const MARKET_DATA: &str = "market_data";
/// Category served with portfolio and risk analysis tools.
pub const AI_ANALYSIS: &str = "ai_analysis";

/// Simulated remote server.
#[derive(Debug, Default)]
pub struct SimulatedToolServer {
    connected: AtomicBool,
}

impl SimulatedToolServer {
    /// Create a disconnected simulated server.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn catalog(category: &str) -> McpResult<Vec<RemoteTool>> {
        let open = || json!({"type": "object"});
        match category {
            MARKET_DATA => Ok(vec![
                RemoteTool::new(
                    MARKET_DATA,
                    "get_stock_quote",
                    "Get real-time stock quote for a symbol",
                    json!({
                        "type": "object",
                        "properties": {
                            "symbol": {"type": "string"},
                            "source": {"type": "string", "enum": ["alpha_vantage", "yahoo"]}
                        },
                        "required": ["symbol"]
                    }),
                ),
                RemoteTool::new(
                    MARKET_DATA,
                    "get_historical_data",
                    "Get historical market data for a symbol",
                    json!({
                        "type": "object",
                        "properties": {
                            "symbol": {"type": "string"},
                            "period": {"type": "string"},
                            "interval": {"type": "string"}
                        },
                        "required": ["symbol"]
                    }),
                ),
                RemoteTool::new(
                    MARKET_DATA,
                    "get_market_indices",
                    "Get data for major market indices",
                    open(),
                ),
                RemoteTool::new(
                    MARKET_DATA,
                    "get_market_summary",
                    "Get comprehensive market summary",
                    open(),
                ),
            ]),
            AI_ANALYSIS => Ok(vec![
                RemoteTool::new(
                    AI_ANALYSIS,
                    "analyze_portfolio",
                    "Generate comprehensive portfolio analysis",
                    json!({
                        "type": "object",
                        "properties": {
                            "user_profile": {"type": "object"},
                            "market_data": {"type": "object"},
                            "analysis_type": {"type": "string"}
                        },
                        "required": ["user_profile"]
                    }),
                ),
                RemoteTool::new(
                    AI_ANALYSIS,
                    "assess_risk",
                    "Perform detailed risk assessment",
                    open(),
                ),
                RemoteTool::new(
                    AI_ANALYSIS,
                    "generate_market_insights",
                    "Generate AI-powered market insights",
                    open(),
                ),
                RemoteTool::new(
                    AI_ANALYSIS,
                    "generate_investment_proposal",
                    "Generate investment proposals",
                    open(),
                ),
            ]),
            other => Err(McpError::ServerNotFound {
                category: other.to_string(),
            }),
        }
    }

    fn market_data_call(tool: &str, args: &Value) -> Value {
        let now = Utc::now().to_rfc3339();
        match tool {
            "get_stock_quote" => json!({
                "symbol": args.get("symbol").and_then(Value::as_str).unwrap_or("SPY"),
                "price": 450.25,
                "change": 2.15,
                "change_percent": 0.48,
                "volume": 1_250_000,
                "timestamp": now,
                "source": "mcp_simulation"
            }),
            "get_market_summary" => json!({
                "symbols": {
                    "SPY": {"price": 450.25, "change": 2.15, "change_percent": 0.48}
                },
                "market_sentiment": "Slightly Positive",
                "timestamp": now
            }),
            _ => json!({
                "tool": tool,
                "result": "Simulated result",
                "timestamp": now
            }),
        }
    }

    fn ai_analysis_call(tool: &str, args: &Value) -> Value {
        let now = Utc::now().to_rfc3339();
        if tool != "analyze_portfolio" {
            return json!({
                "tool": tool,
                "result": "Simulated AI analysis result",
                "timestamp": now
            });
        }

        let profile = args.get("user_profile").cloned().unwrap_or_else(|| json!({}));
        let risk = profile
            .get("risk_tolerance")
            .and_then(Value::as_str)
            .unwrap_or("Moderate")
            .to_string();

        let [stocks, bonds, cash, real_estate, commodities, crypto, etfs, reits] =
            match risk.to_lowercase().as_str() {
                "conservative" => [25, 45, 10, 8, 5, 2, 3, 2],
                "aggressive" => [65, 15, 5, 8, 3, 2, 1, 1],
                _ => [50, 25, 8, 8, 4, 2, 2, 1],
            };

        json!({
            "analysis_type": args.get("analysis_type").and_then(Value::as_str).unwrap_or("comprehensive"),
            "user_profile": profile,
            "portfolio_allocation": {
                "Stocks": stocks,
                "Bonds": bonds,
                "Cash": cash,
                "Real Estate": real_estate,
                "Commodities": commodities,
                "Cryptocurrency": crypto,
                "ETFs": etfs,
                "REITs": reits
            },
            "analysis_result": format!(
                "Based on your {risk} risk tolerance, here's your recommended allocation..."
            ),
            "timestamp": now,
            "source": "mcp_simulation"
        })
    }
}

#[async_trait]
impl ToolServer for SimulatedToolServer {
    fn kind(&self) -> &'static str {
        "simulated"
    }

    fn categories(&self) -> Vec<String> {
        vec![MARKET_DATA.to_string(), AI_ANALYSIS.to_string()]
    }

    async fn connect(&self) -> McpResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        info!("Simulated tool server connected");
        Ok(())
    }

    async fn list_tools(&self, category: &str) -> McpResult<Vec<RemoteTool>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(McpError::NotConnected);
        }
        Self::catalog(category)
    }

    async fn call_tool(&self, category: &str, tool: &str, args: Value) -> McpResult<ToolResult> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(McpError::NotConnected);
        }
        if !Self::catalog(category)?.iter().any(|t| t.name == tool) {
            return Err(McpError::ToolNotFound {
                category: category.to_string(),
                tool: tool.to_string(),
            });
        }

        debug!(category, tool, %args, "Simulating remote tool call");
        let content = match category {
            MARKET_DATA => Self::market_data_call(tool, &args),
            _ => Self::ai_analysis_call(tool, &args),
        };
        Ok(ToolResult::success(content))
    }

    async fn shutdown(&self) -> McpResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        info!("Simulated tool server shut down");
        Ok(())
    }
}
