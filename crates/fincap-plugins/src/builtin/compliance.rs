//! The `compliance` plugin: keyword checks for financial advice text.
//!
//! These are heuristics for flagging text to a human reviewer, not a
//! regulatory engine.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Value, json};
use tracing::info;

use crate::error::{PluginError, PluginResult};
use crate::plugin::{ConfigDocument, PluginCategory, PluginMetadata};
use crate::provider::CapabilityProvider;
use crate::tool::{Tool, ToolInput};

const PLUGIN: &str = "compliance";

const DISCLAIMER_PHRASES: &[&str] = &[
    "not financial advice",
    "not investment advice",
    "consult with a financial advisor",
    "past performance",
    "investment involves risk",
];

const PROHIBITED_TERMS: &[&str] = &[
    "guaranteed profit",
    "risk-free investment",
    "sure thing",
    "cannot lose",
    "guaranteed returns",
];

const ADVICE_PHRASES: &[&str] = &["you should buy", "i recommend purchasing", "best investment"];

const MANIPULATION_TERMS: &[&str] = &["pump and dump", "insider information", "hot tip"];

struct Guidance {
    topic: &'static str,
    summary: &'static str,
    requirements: &'static [&'static str],
    references: &'static [&'static str],
}

const GUIDANCE: &[Guidance] = &[
    Guidance {
        topic: "investment advice",
        summary: "Investment advice must include appropriate disclaimers and suitability assessments",
        requirements: &[
            "Suitability determination",
            "Risk disclosure",
            "Fiduciary duty consideration",
        ],
        references: &["Investment Advisers Act of 1940", "SEC Release IA-1092"],
    },
    Guidance {
        topic: "securities",
        summary: "Securities recommendations must comply with FINRA rules and SEC regulations",
        requirements: &["Know Your Customer", "Suitability", "Best execution"],
        references: &["FINRA Rule 2111", "Securities Act of 1933"],
    },
    Guidance {
        topic: "portfolio management",
        summary: "Portfolio management services require proper registration and disclosure",
        requirements: &["ADV filing", "Client agreements", "Performance reporting"],
        references: &["Investment Advisers Act", "SEC Form ADV"],
    },
];

const DISCLOSURES: &[(&str, &[&str])] = &[
    (
        "investment recommendation",
        &[
            "Investment involves risk and may result in loss of principal",
            "Past performance does not guarantee future results",
            "This is not personalized investment advice",
            "Consult with a qualified financial advisor",
        ],
    ),
    (
        "portfolio allocation",
        &[
            "Asset allocation does not guarantee profit or protection against loss",
            "Diversification does not eliminate risk",
            "Consider your risk tolerance and investment objectives",
            "Rebalancing may have tax consequences",
        ],
    ),
    (
        "market analysis",
        &[
            "Market analysis is based on current conditions which may change",
            "Forecasts are not guaranteed and should not be relied upon",
            "Economic factors may impact investment performance",
            "Past market performance does not predict future results",
        ],
    ),
];

static AGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)age[:\s]*(\d+)").expect("invalid regex"));
static INCOME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)income[:\s]*\$?(\d+(?:,\d+)*)").expect("invalid regex"));

#[derive(Debug, Clone)]
struct Settings {
    strict_mode: bool,
    jurisdiction: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strict_mode: true,
            jurisdiction: "US".to_string(),
        }
    }
}

/// Regulatory guidance and content checks.
#[derive(Debug, Default)]
pub struct CompliancePlugin {
    settings: Arc<Settings>,
}

impl CompliancePlugin {
    /// A fresh, uninitialized instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn bullets<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    items
        .into_iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn text_arg(input: &ToolInput, key: &str) -> String {
    match input {
        ToolInput::Text(text) => text.clone(),
        ToolInput::Structured(map) => map
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn check_compliance(settings: &Settings, content: &str) -> String {
    let lower = content.to_lowercase();
    let mut issues = Vec::new();

    if settings.strict_mode && !DISCLAIMER_PHRASES.iter().any(|p| lower.contains(p)) {
        issues.push("Missing required financial disclaimers".to_string());
    }
    for term in PROHIBITED_TERMS.iter().filter(|t| lower.contains(*t)) {
        issues.push(format!("Inappropriate term detected: '{term}'"));
    }
    if ADVICE_PHRASES.iter().any(|p| lower.contains(p))
        && !lower.contains("licensed")
        && !lower.contains("registered")
    {
        issues.push("Potential unlicensed investment advice".to_string());
    }
    for term in MANIPULATION_TERMS.iter().filter(|t| lower.contains(*t)) {
        issues.push(format!("Potential market manipulation language: '{term}'"));
    }

    if issues.is_empty() {
        "Content appears to be compliant with financial regulations.".to_string()
    } else {
        format!(
            "Compliance Issues Found:\n{}",
            bullets(issues.iter().map(String::as_str))
        )
    }
}

fn regulatory_guidance(topic: &str) -> String {
    let lower = topic.to_lowercase();
    match GUIDANCE.iter().find(|g| lower.contains(g.topic)) {
        Some(g) => format!(
            "Regulatory Guidance for '{topic}':\n\n{}\n\nRequirements:\n{}\n\nRelevant Regulations:\n{}",
            g.summary,
            bullets(g.requirements.iter().copied()),
            bullets(g.references.iter().copied()),
        ),
        None => format!(
            "No specific regulatory guidance found for '{topic}'. Consult with a compliance officer for detailed requirements."
        ),
    }
}

fn first_match<'a>(text: &str, patterns: &[&'a str]) -> Option<&'a str> {
    let lower = text.to_lowercase();
    patterns.iter().copied().find(|p| lower.contains(p))
}

fn investment_risk(recommendation: &str) -> &'static str {
    let lower = recommendation.to_lowercase();
    let mentions = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));
    if mentions(&["bonds", "treasury", "cd"]) {
        "Low"
    } else if mentions(&["mutual fund", "etf", "index"]) {
        "Moderate"
    } else if mentions(&["individual stocks", "options", "crypto"]) {
        "High"
    } else {
        "Unknown"
    }
}

fn investment_suitability(profile: &str, recommendation: &str) -> String {
    let age = AGE.captures(profile).map(|c| c[1].to_string());
    let risk_tolerance = first_match(
        profile,
        &["conservative", "moderate", "aggressive", "high risk", "low risk"],
    );
    let horizon = first_match(profile, &["short term", "long term", "retirement", "years"]);
    let income = INCOME.captures(profile).map(|c| format!("${}", &c[1]));
    let risk_level = investment_risk(recommendation);

    let age_years: u32 = age.as_deref().and_then(|a| a.parse().ok()).unwrap_or(0);
    let high_risk = risk_level == "High";
    let mut rationale = Vec::new();
    let mut recommendations = Vec::new();

    if age_years > 65 && high_risk {
        rationale.push("High-risk investments may not be suitable for older investors");
        recommendations.push("Consider more conservative investments approaching retirement");
    }
    if risk_tolerance == Some("conservative") && high_risk {
        rationale.push("Investment risk level exceeds client's risk tolerance");
        recommendations.push("Recommend lower-risk alternatives aligned with conservative profile");
    }

    let (determination, rationale) = if rationale.is_empty() {
        (
            "SUITABLE",
            "Investment recommendation appears suitable based on available client information"
                .to_string(),
        )
    } else {
        ("UNSUITABLE", rationale.join("; "))
    };
    if recommendations.is_empty() {
        recommendations = vec![
            "Ensure comprehensive suitability review with client",
            "Document suitability rationale",
        ];
    }

    let unspecified = "Not specified";
    format!(
        "Suitability Assessment:\n\n\
         Client Profile Analysis:\n\
         - Age: {}\n\
         - Risk Tolerance: {}\n\
         - Investment Horizon: {}\n\
         - Financial Situation: {}\n\n\
         Investment Analysis:\n\
         - Risk Level: {risk_level}\n\
         - Liquidity: Variable\n\
         - Complexity: Moderate\n\n\
         Suitability Determination: {determination}\n\n\
         Rationale: {rationale}\n\n\
         Recommendations:\n{}",
        age.as_deref().unwrap_or(unspecified),
        risk_tolerance.unwrap_or(unspecified),
        horizon.unwrap_or(unspecified),
        income.as_deref().unwrap_or(unspecified),
        bullets(recommendations),
    )
}

fn disclosure_requirements(settings: &Settings, advice_type: &str) -> String {
    let lower = advice_type.to_lowercase();
    let mut required: Vec<&str> = DISCLOSURES
        .iter()
        .filter(|(key, _)| lower.contains(key))
        .flat_map(|(_, items)| items.iter().copied())
        .collect();
    if required.is_empty() {
        required = DISCLOSURES[0].1.to_vec();
    }
    format!(
        "Required Disclosures for '{advice_type}':\n\n{}\n\nNote: Additional disclosures may be required based on specific circumstances and regulatory jurisdiction ({}).",
        bullets(required),
        settings.jurisdiction,
    )
}

/// Split `"profile | recommendation"` free text into its two halves.
fn suitability_args(input: &ToolInput) -> (String, String) {
    match input {
        ToolInput::Text(text) => match text.split_once('|') {
            Some((profile, rec)) => (profile.trim().to_string(), rec.trim().to_string()),
            None => (text.clone(), text.clone()),
        },
        ToolInput::Structured(_) => (
            text_arg(input, "client_profile"),
            text_arg(input, "investment_recommendation"),
        ),
    }
}

fn string_schema(field: &str) -> Value {
    json!({
        "type": "object",
        "properties": {field: {"type": "string"}}
    })
}

#[async_trait]
impl CapabilityProvider for CompliancePlugin {
    fn describe(&self) -> PluginMetadata {
        PluginMetadata::new(
            PLUGIN,
            "1.0.0",
            "Financial compliance checking and regulatory guidance plugin",
            PluginCategory::Compliance,
            "fincap",
        )
        .with_config_schema(json!({
            "strict_mode": {"type": "boolean", "default": true},
            "regulatory_jurisdiction": {"type": "string", "default": "US"}
        }))
    }

    async fn initialize(&mut self, config: &ConfigDocument) -> PluginResult<bool> {
        self.validate_config(config)?;
        let defaults = Settings::default();
        let settings = Settings {
            strict_mode: config
                .get("strict_mode")
                .and_then(Value::as_bool)
                .unwrap_or(defaults.strict_mode),
            jurisdiction: config
                .get("regulatory_jurisdiction")
                .and_then(Value::as_str)
                .map_or(defaults.jurisdiction, str::to_string),
        };
        info!(
            strict_mode = settings.strict_mode,
            jurisdiction = %settings.jurisdiction,
            "Compliance plugin initialized"
        );
        self.settings = Arc::new(settings);
        Ok(true)
    }

    async fn list_tools(&self) -> PluginResult<Vec<Tool>> {
        let check = Arc::clone(&self.settings);
        let disclose = Arc::clone(&self.settings);
        Ok(vec![
            Tool::new(
                "check_compliance",
                "Check if investment advice or content complies with financial regulations",
                move |input| {
                    Ok(Value::String(check_compliance(
                        &check,
                        &text_arg(&input, "content"),
                    )))
                },
            )
            .with_schema(string_schema("content")),
            Tool::new(
                "get_regulatory_guidance",
                "Get regulatory guidance for specific financial topics",
                |input| Ok(Value::String(regulatory_guidance(&text_arg(&input, "topic")))),
            )
            .with_schema(string_schema("topic")),
            Tool::new(
                "validate_investment_suitability",
                "Validate if an investment recommendation is suitable for a client profile",
                |input| {
                    let (profile, recommendation) = suitability_args(&input);
                    Ok(Value::String(investment_suitability(
                        &profile,
                        &recommendation,
                    )))
                },
            )
            .with_schema(json!({
                "type": "object",
                "properties": {
                    "client_profile": {"type": "string"},
                    "investment_recommendation": {"type": "string"}
                }
            })),
            Tool::new(
                "check_disclosure_requirements",
                "Check what disclosures are required for specific financial advice",
                move |input| {
                    Ok(Value::String(disclosure_requirements(
                        &disclose,
                        &text_arg(&input, "advice_type"),
                    )))
                },
            )
            .with_schema(string_schema("advice_type")),
        ])
    }

    fn validate_config(&self, config: &ConfigDocument) -> PluginResult<()> {
        let invalid = |message: String| PluginError::Configuration {
            plugin: PLUGIN.into(),
            message,
        };
        if let Some(value) = config.get("strict_mode") {
            if !value.is_boolean() {
                return Err(invalid(format!("strict_mode must be a boolean, got {value}")));
            }
        }
        if let Some(value) = config.get("regulatory_jurisdiction") {
            match value.as_str() {
                Some(s) if !s.trim().is_empty() => {},
                _ => {
                    return Err(invalid(format!(
                        "regulatory_jurisdiction must be a non-empty string, got {value}"
                    )));
                },
            }
        }
        Ok(())
    }
}
