//! Invocable tools surfaced by plugins.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::error::PluginResult;

/// Arguments passed to [`Tool::invoke`].
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    /// Free text, as an LLM agent typically supplies.
    Text(String),
    /// Keyword arguments.
    Structured(Map<String, Value>),
}

impl ToolInput {
    /// Interpret a JSON value: objects are structured, strings are text,
    /// anything else is its JSON text.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Structured(map),
            Value::String(text) => Self::Text(text),
            other => Self::Text(other.to_string()),
        }
    }

    /// The free-text form, if any.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }
}

impl From<&str> for ToolInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ToolInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Map<String, Value>> for ToolInput {
    fn from(map: Map<String, Value>) -> Self {
        Self::Structured(map)
    }
}

type Invoker = dyn Fn(ToolInput) -> PluginResult<Value> + Send + Sync;

/// A named, described, invocable capability.
///
/// Invocation is synchronous; remote tools reach their async server through
/// the [`InvocationBridge`](crate::bridge::InvocationBridge). Clones share
/// the invoker.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    input_schema: Value,
    invoker: Arc<Invoker>,
}

impl Tool {
    /// Create a tool with an open object schema.
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, invoker: F) -> Self
    where
        F: Fn(ToolInput) -> PluginResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: json!({"type": "object"}),
            invoker: Arc::new(invoker),
        }
    }

    /// Replace the input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// JSON Schema of the structured arguments.
    #[must_use]
    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Invoke the tool.
    ///
    /// # Errors
    ///
    /// Returns whatever the tool reports; bridged tools return
    /// [`PluginError::ArgumentSynthesis`](crate::PluginError::ArgumentSynthesis)
    /// or [`PluginError::ToolInvocation`](crate::PluginError::ToolInvocation).
    pub fn invoke(&self, input: impl Into<ToolInput>) -> PluginResult<Value> {
        (self.invoker)(input.into())
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Tool {
    /// Two handles are equal when they share the same invoker.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.invoker, &other.invoker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_value_classifies_input() {
        assert_eq!(
            ToolInput::from_value(json!("hi")),
            ToolInput::Text("hi".into())
        );
        assert_eq!(ToolInput::from_value(json!(42)), ToolInput::Text("42".into()));
        assert!(matches!(
            ToolInput::from_value(json!({"a": 1})),
            ToolInput::Structured(_)
        ));
    }

    #[test]
    fn clones_share_the_invoker() {
        let tool = Tool::new("len", "length of text", |input| {
            Ok(json!(input.as_text().map_or(0, str::len)))
        });
        let copy = tool.clone();
        assert_eq!(tool, copy);
        assert_eq!(copy.invoke("abcd").unwrap(), json!(4));
        assert_eq!(tool.input_schema()["type"], "object");

        let other = Tool::new("len", "length of text", |_| Ok(Value::Null));
        assert_ne!(tool, other);
    }
}
