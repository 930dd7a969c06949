//! Remote tool catalog entries and call results.

use rmcp::model::{self as rmcp_model, RawContent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool advertised by a remote server for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTool {
    /// Tool name, unique within its category.
    pub name: String,
    /// Category the serving server is registered under.
    pub category: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema of the arguments.
    pub input_schema: Value,
}

impl RemoteTool {
    /// Create a catalog entry.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Create from an rmcp `Tool` served for `category`.
    #[must_use]
    pub fn from_rmcp(tool: &rmcp_model::Tool, category: &str) -> Self {
        Self {
            name: tool.name.to_string(),
            category: category.to_string(),
            description: tool.description.as_deref().unwrap_or("").to_string(),
            input_schema: serde_json::to_value(&*tool.input_schema)
                .unwrap_or_else(|_| serde_json::json!({"type": "object"})),
        }
    }

    /// Names listed under the schema's `required` key.
    #[must_use]
    pub fn required_fields(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Result of a remote tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Payload. Text content that parses as JSON is returned as JSON,
    /// anything else as a JSON string.
    pub content: Value,
    /// Error message when the server reported failure.
    pub error: Option<String>,
    /// Whether the server reported failure.
    pub is_error: bool,
}

impl ToolResult {
    /// A successful result.
    #[must_use]
    pub fn success(content: Value) -> Self {
        Self {
            content,
            error: None,
            is_error: false,
        }
    }

    /// A remote-reported failure.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let msg = message.into();
        Self {
            content: Value::String(msg.clone()),
            error: Some(msg),
            is_error: true,
        }
    }
}

impl From<rmcp_model::CallToolResult> for ToolResult {
    fn from(result: rmcp_model::CallToolResult) -> Self {
        let is_error = result.is_error.unwrap_or(false);
        let text = result
            .content
            .iter()
            .filter_map(|c| match &**c {
                RawContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if is_error {
            return Self::error(if text.is_empty() {
                "Unknown error".to_string()
            } else {
                text
            });
        }

        let content = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Self::success(content)
    }
}
