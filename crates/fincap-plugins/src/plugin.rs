//! Plugin identity, lifecycle status, and registry records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tool::Tool;

/// A plugin configuration document.
pub type ConfigDocument = Map<String, Value>;

/// Closed classification used to group and filter plugins and tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginCategory {
    /// Quotes, history, indices.
    MarketData,
    /// Portfolio analysis and insights.
    AiAnalysis,
    /// Risk scoring.
    RiskAssessment,
    /// Allocation and rebalancing.
    PortfolioManagement,
    /// Regulatory checks.
    Compliance,
    /// Alerts and messaging.
    Notifications,
    /// Anything else.
    Custom,
}

impl PluginCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::MarketData,
        Self::AiAnalysis,
        Self::RiskAssessment,
        Self::PortfolioManagement,
        Self::Compliance,
        Self::Notifications,
        Self::Custom,
    ];

    /// The wire spelling (`market_data`, `ai_analysis`, ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MarketData => "market_data",
            Self::AiAnalysis => "ai_analysis",
            Self::RiskAssessment => "risk_assessment",
            Self::PortfolioManagement => "portfolio_management",
            Self::Compliance => "compliance",
            Self::Notifications => "notifications",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for PluginCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A category string that is not one of [`PluginCategory::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown plugin category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for PluginCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Lifecycle status of a plugin.
///
/// `Loading` is only ever reported while a load is in flight; stored
/// records are `Active` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    /// A load is in progress.
    Loading,
    /// Initialized and serving tools.
    Active,
    /// The last load attempt failed.
    Error,
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loading => "loading",
            Self::Active => "active",
            Self::Error => "error",
        })
    }
}

fn default_min_version() -> String {
    "1.0.0".to_string()
}

/// Identity and declared contract of a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Unique plugin name.
    pub name: String,
    /// Semver version string.
    pub version: String,
    /// Human-readable description.
    pub description: String,
    /// Category the plugin's tools belong to.
    pub category: PluginCategory,
    /// Author or team.
    pub author: String,
    /// Other plugins this one expects. Informational only.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Accepted configuration keys, as a JSON object.
    #[serde(default)]
    pub config_schema: Value,
    /// External credentials or services the plugin needs.
    #[serde(default)]
    pub api_requirements: Vec<String>,
    /// Minimum host version the plugin supports.
    #[serde(default = "default_min_version")]
    pub min_version: String,
}

impl PluginMetadata {
    /// Metadata with the given identity and empty contract fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
        category: PluginCategory,
        author: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
            category,
            author: author.into(),
            dependencies: Vec::new(),
            config_schema: Value::Object(Map::new()),
            api_requirements: Vec::new(),
            min_version: default_min_version(),
        }
    }

    /// Stand-in for a plugin that could not describe itself.
    #[must_use]
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name, "", "", PluginCategory::Custom, "")
    }

    /// Replace the config schema.
    #[must_use]
    pub fn with_config_schema(mut self, schema: Value) -> Self {
        self.config_schema = schema;
        self
    }

    /// Replace the API requirements.
    #[must_use]
    pub fn with_api_requirements(mut self, requirements: Vec<String>) -> Self {
        self.api_requirements = requirements;
        self
    }
}

/// Snapshot of one registry entry.
///
/// After a load attempt a record is either `Active` with its tools, or
/// `Error` with no tools and a message.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    /// Plugin identity.
    pub metadata: PluginMetadata,
    /// `Active` or `Error`.
    pub status: PluginStatus,
    /// Tools in discovery order. Empty for `Error` records.
    pub tools: Vec<Tool>,
    /// Whether the registry holds a live provider for this plugin.
    pub has_instance: bool,
    /// When the load attempt finished.
    pub load_time: DateTime<Utc>,
    /// Failure message for `Error` records.
    pub error_message: Option<String>,
}

impl PluginRecord {
    /// A successfully loaded plugin.
    #[must_use]
    pub fn active(metadata: PluginMetadata, tools: Vec<Tool>, has_instance: bool) -> Self {
        Self {
            metadata,
            status: PluginStatus::Active,
            tools,
            has_instance,
            load_time: Utc::now(),
            error_message: None,
        }
    }

    /// A failed load attempt.
    #[must_use]
    pub fn failed(metadata: PluginMetadata, message: impl Into<String>) -> Self {
        Self {
            metadata,
            status: PluginStatus::Error,
            tools: Vec::new(),
            has_instance: false,
            load_time: Utc::now(),
            error_message: Some(message.into()),
        }
    }

    /// Plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Whether the plugin is serving tools.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PluginStatus::Active
    }

    /// Number of tools.
    #[must_use]
    pub fn tools_count(&self) -> usize {
        self.tools.len()
    }
}

/// Serializable listing row for a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginSummary {
    /// Plugin name.
    pub name: String,
    /// Current status.
    pub status: PluginStatus,
    /// Category.
    pub category: PluginCategory,
    /// Version, empty for placeholders.
    pub version: String,
    /// Description.
    pub description: String,
    /// Number of tools served.
    pub tools_count: usize,
    /// When the last load attempt finished.
    pub load_time: DateTime<Utc>,
    /// Failure message, if any.
    pub error_message: Option<String>,
}

impl From<&PluginRecord> for PluginSummary {
    fn from(record: &PluginRecord) -> Self {
        Self {
            name: record.metadata.name.clone(),
            status: record.status,
            category: record.metadata.category,
            version: record.metadata.version.clone(),
            description: record.metadata.description.clone(),
            tools_count: record.tools_count(),
            load_time: record.load_time,
            error_message: record.error_message.clone(),
        }
    }
}
