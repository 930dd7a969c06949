//! Structured arguments from free text.
//!
//! LLM agents usually call tools with a single string. Remote tools expect
//! JSON objects, so known analysis tools get a default profile shaped from
//! the text and everything else gets `{"query": text}`. Optional fields are
//! filled best-effort; only a missing *required* field is an error.

use std::sync::LazyLock;

use fincap_mcp::{AI_ANALYSIS, RemoteTool};
use regex::Regex;
use serde_json::{Map, Value, json};

use crate::error::{PluginError, PluginResult};

/// Symbol used when the text names no ticker.
pub const DEFAULT_SYMBOL: &str = "SPY";

const DEFAULT_AGE: u32 = 35;
const DEFAULT_INCOME: u32 = 75_000;

static CASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z]{1,5})\b").expect("invalid regex"));
static BARE_TICKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z]{2,5})\b").expect("invalid regex"));

/// Uppercase words that look like tickers but are not.
const NOT_TICKERS: &[&str] = &[
    "AI", "CEO", "CFO", "ETF", "ETFS", "FAQ", "GDP", "IPO", "IRA", "LLC", "OK", "REIT", "ROI",
    "SEC", "US", "USA", "USD",
];

/// Risk tolerance mentioned in `text`, defaulting to `moderate`.
#[must_use]
pub fn detect_risk_tolerance(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if lower.contains("conservative") {
        "conservative"
    } else if lower.contains("aggressive") {
        "aggressive"
    } else {
        "moderate"
    }
}

/// First ticker-like token in `text`: a `$CASHTAG`, else a bare 2-5 letter
/// uppercase word that is not a common acronym.
#[must_use]
pub fn detect_symbol(text: &str) -> Option<String> {
    if let Some(caps) = CASHTAG.captures(text) {
        return Some(caps[1].to_uppercase());
    }
    BARE_TICKER
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .find(|word| !NOT_TICKERS.contains(&word.as_str()))
}

/// The investor name: the first comma-separated segment when the text has
/// a comma, else `"User"`.
#[must_use]
pub fn detect_name(text: &str) -> String {
    match text.split_once(',') {
        Some((head, _)) if !head.trim().is_empty() => head.trim().to_string(),
        _ => "User".to_string(),
    }
}

fn base_profile(text: &str) -> Map<String, Value> {
    let mut profile = Map::new();
    profile.insert("name".into(), json!(detect_name(text)));
    profile.insert("risk_tolerance".into(), json!(detect_risk_tolerance(text)));
    profile.insert("age".into(), json!(DEFAULT_AGE));
    profile.insert("income".into(), json!(DEFAULT_INCOME));
    profile
}

fn schema_has_property(tool: &RemoteTool, property: &str) -> bool {
    tool.input_schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|props| props.contains_key(property))
}

fn analysis_arguments(tool: &str, text: &str) -> Option<Value> {
    let args = match tool {
        "analyze_portfolio" => {
            let mut profile = base_profile(text);
            profile.insert("investment_goal".into(), json!("long-term growth"));
            profile.insert("investment_horizon".into(), json!("long-term"));
            json!({
                "user_profile": profile,
                "analysis_type": "comprehensive"
            })
        },
        "assess_risk" => json!({ "user_profile": base_profile(text) }),
        "generate_market_insights" => json!({
            "market_data": {"analysis_request": text},
            "symbol": detect_symbol(text).unwrap_or_else(|| DEFAULT_SYMBOL.to_string()),
            "analysis_focus": "comprehensive"
        }),
        "generate_investment_proposal" => json!({
            "user_profile": base_profile(text),
            "portfolio_allocation": {"stocks": 60, "bonds": 30, "cash": 10},
            "proposal_type": "initial"
        }),
        _ => return None,
    };
    Some(args)
}

/// Build the argument object for `tool` from free text.
///
/// # Errors
///
/// Returns [`PluginError::ArgumentSynthesis`] naming the first field in the
/// schema's `required` list that the synthesized object lacks.
pub fn synthesize(tool: &RemoteTool, text: &str) -> PluginResult<Value> {
    let known = if tool.category == AI_ANALYSIS {
        analysis_arguments(&tool.name, text)
    } else {
        None
    };

    let args = known.unwrap_or_else(|| {
        let mut args = Map::new();
        args.insert("query".into(), json!(text));
        if schema_has_property(tool, "symbol") {
            let symbol = detect_symbol(text).unwrap_or_else(|| DEFAULT_SYMBOL.to_string());
            args.insert("symbol".into(), json!(symbol));
        }
        Value::Object(args)
    });

    if let Some(missing) = tool
        .required_fields()
        .into_iter()
        .find(|field| args.get(*field).is_none())
    {
        return Err(PluginError::ArgumentSynthesis {
            tool: tool.name.clone(),
            field: missing.to_string(),
        });
    }
    Ok(args)
}
