//! `fincap invoke` - call a tool the way an agent would.

use anyhow::{Context, anyhow};
use fincap_plugins::{PluginRegistry, ToolInput};
use serde_json::Value;

use super::{OutputFormat, print_json};
use crate::theme::Theme;

/// Build the tool input from positional text or `--json` arguments.
pub(crate) fn tool_input(text: Option<String>, json: Option<&str>) -> anyhow::Result<ToolInput> {
    match json {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw).context("invalid --json arguments")?;
            Ok(ToolInput::from_value(value))
        },
        None => Ok(ToolInput::Text(text.unwrap_or_default())),
    }
}

pub(crate) async fn run(
    registry: &PluginRegistry,
    name: &str,
    input: ToolInput,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let tool = registry
        .find_tool(name)
        .await
        .ok_or_else(|| anyhow!("tool not found: {name}"))?;

    // Tools block; keep them off the async workers.
    let output = tokio::task::spawn_blocking(move || tool.invoke(input))
        .await
        .context("tool invocation task failed")??;

    match (format, &output) {
        (OutputFormat::Json, _) => print_json(&output)?,
        (OutputFormat::Pretty, Value::String(text)) => {
            println!("{}", Theme::header(name));
            println!("{text}");
        },
        (OutputFormat::Pretty, other) => {
            println!("{}", Theme::header(name));
            println!("{}", serde_json::to_string_pretty(other)?);
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_from_text_or_json() {
        assert_eq!(
            tool_input(Some("How is $AAPL?".into()), None).unwrap(),
            ToolInput::Text("How is $AAPL?".into())
        );
        assert_eq!(tool_input(None, None).unwrap(), ToolInput::Text(String::new()));
        assert!(matches!(
            tool_input(None, Some(r#"{"symbol": "AAPL"}"#)).unwrap(),
            ToolInput::Structured(map) if map["symbol"] == "AAPL"
        ));
        assert!(tool_input(None, Some("{oops")).is_err());
    }
}
