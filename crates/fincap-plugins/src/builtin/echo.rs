//! The `echo` plugin: a single tool that repeats its input.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{PluginError, PluginResult};
use crate::plugin::{ConfigDocument, PluginCategory, PluginMetadata};
use crate::provider::CapabilityProvider;
use crate::tool::{Tool, ToolInput};

/// Repeats text back, optionally behind a configured `prefix`.
#[derive(Debug, Default)]
pub struct EchoPlugin {
    prefix: String,
}

impl EchoPlugin {
    /// A fresh, uninitialized instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn text_of(input: ToolInput) -> String {
    match input {
        ToolInput::Text(text) => text,
        ToolInput::Structured(mut map) => match map.remove("text") {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => Value::Object(map).to_string(),
        },
    }
}

#[async_trait]
impl CapabilityProvider for EchoPlugin {
    fn describe(&self) -> PluginMetadata {
        PluginMetadata::new(
            "echo",
            "1.0.0",
            "Repeats its input",
            PluginCategory::Custom,
            "fincap",
        )
        .with_config_schema(json!({
            "prefix": {"type": "string", "default": ""}
        }))
    }

    async fn initialize(&mut self, config: &ConfigDocument) -> PluginResult<bool> {
        self.validate_config(config)?;
        self.prefix = config
            .get("prefix")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        debug!(prefix = %self.prefix, "Echo plugin initialized");
        Ok(true)
    }

    async fn list_tools(&self) -> PluginResult<Vec<Tool>> {
        let prefix = self.prefix.clone();
        let say = Tool::new("say", "Repeat the given text", move |input| {
            Ok(Value::String(format!("{prefix}{}", text_of(input))))
        })
        .with_schema(json!({
            "type": "object",
            "properties": {"text": {"type": "string"}}
        }));
        Ok(vec![say])
    }

    fn validate_config(&self, config: &ConfigDocument) -> PluginResult<()> {
        match config.get("prefix") {
            None | Some(Value::String(_)) => Ok(()),
            Some(other) => Err(PluginError::Configuration {
                plugin: "echo".into(),
                message: format!("prefix must be a string, got {other}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn say_applies_prefix() {
        let mut plugin = EchoPlugin::new();
        let mut config = ConfigDocument::new();
        config.insert("prefix".into(), json!("> "));
        assert!(plugin.initialize(&config).await.unwrap());

        let tools = plugin.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].invoke("hello").unwrap(), json!("> hello"));

        let mut args = serde_json::Map::new();
        args.insert("text".into(), json!("structured"));
        assert_eq!(tools[0].invoke(args).unwrap(), json!("> structured"));
    }

    #[tokio::test]
    async fn non_string_prefix_is_rejected() {
        let mut plugin = EchoPlugin::new();
        let mut config = ConfigDocument::new();
        config.insert("prefix".into(), json!(3));
        assert!(matches!(
            plugin.initialize(&config).await,
            Err(PluginError::Configuration { .. })
        ));
    }
}
