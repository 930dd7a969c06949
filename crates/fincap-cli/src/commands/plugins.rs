//! Plugin commands - discover, list, stats, tools, and lifecycle actions.

use anyhow::{Context, bail};
use fincap_plugins::{
    ConfigDocument, ManageAction, ManageRequest, ManageResponse, PluginCategory, PluginManager,
    PluginRegistry, PluginStatus,
};
use serde_json::{Value, json};

use super::{OutputFormat, print_json};
use crate::theme::Theme;

pub(crate) async fn discover(registry: &PluginRegistry, format: OutputFormat) -> anyhow::Result<()> {
    registry.discover().await?;
    let candidates = registry.candidates().await;
    if format == OutputFormat::Json {
        return print_json(&candidates);
    }

    if candidates.is_empty() {
        println!("{}", Theme::info("No plugin candidates found"));
        return Ok(());
    }
    println!("{}", Theme::header("Plugin Candidates"));
    println!("  {:<28} {:<28} SOURCE", "NAME", "KIND");
    println!("{}", Theme::separator());
    for candidate in &candidates {
        let source = candidate
            .manifest
            .as_ref()
            .map_or_else(|| "built-in".to_string(), |p| p.display().to_string());
        println!(
            "  {:<28} {:<28} {}",
            candidate.name,
            candidate.kind.to_string(),
            Theme::dimmed(&source)
        );
    }
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} candidate(s)", candidates.len()))
    );
    Ok(())
}

pub(crate) async fn list(manager: &PluginManager, format: OutputFormat) -> anyhow::Result<()> {
    let rows = manager.available().await;
    if format == OutputFormat::Json {
        return print_json(&rows);
    }

    if rows.is_empty() {
        println!("{}", Theme::info("No plugins loaded"));
        return Ok(());
    }
    println!("{}", Theme::header("Plugins"));
    println!(
        "  {:<24} {:<22} {:<10} {:<8} {:>5}",
        "NAME", "CATEGORY", "VERSION", "STATUS", "TOOLS"
    );
    println!("{}", Theme::separator());
    for row in &rows {
        println!(
            "  {:<24} {:<22} {:<10} {} {:>5}",
            row.name,
            row.category.as_str(),
            row.version,
            Theme::status(row.status, 8),
            row.tools_count
        );
        if let Some(message) = &row.error_message {
            println!("    {}", Theme::dimmed(message));
        }
    }
    let failed = rows
        .iter()
        .filter(|r| r.status == PluginStatus::Error)
        .count();
    println!(
        "\n{}",
        Theme::dimmed(&format!("{} plugin(s), {failed} failed", rows.len()))
    );
    Ok(())
}

pub(crate) async fn stats(registry: &PluginRegistry, format: OutputFormat) -> anyhow::Result<()> {
    let stats = registry.stats().await;
    if format == OutputFormat::Json {
        return print_json(&stats);
    }

    println!("{}", Theme::header("Registry Statistics"));
    println!("{}", Theme::separator());
    println!("  {}", Theme::kv("Plugins", &stats.total.to_string()));
    println!("  {}", Theme::kv("Active", &stats.active.to_string()));
    println!("  {}", Theme::kv("Failed", &stats.error.to_string()));
    println!("  {}", Theme::kv("Tools", &stats.total_tools.to_string()));
    for (category, count) in &stats.per_category_counts {
        println!("    {}", Theme::kv(category.as_str(), &count.to_string()));
    }
    Ok(())
}

pub(crate) async fn tools(
    registry: &PluginRegistry,
    category: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let category: Option<PluginCategory> = category.map(str::parse::<PluginCategory>).transpose()?;
    let tools = registry.available_tools(category).await;
    if format == OutputFormat::Json {
        let listing: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name(),
                    "description": t.description(),
                    "input_schema": t.input_schema(),
                })
            })
            .collect();
        return print_json(&listing);
    }

    if tools.is_empty() {
        println!("{}", Theme::info("No tools available"));
        return Ok(());
    }
    let title = match category {
        Some(c) => format!("Tools ({c})"),
        None => "Tools".to_string(),
    };
    println!("{}", Theme::header(&title));
    println!("{}", Theme::separator());
    for tool in &tools {
        println!("  {:<32} {}", tool.name(), Theme::dimmed(tool.description()));
    }
    println!("\n{}", Theme::dimmed(&format!("{} tool(s)", tools.len())));
    Ok(())
}

/// Parse `key=value` assignments into a configuration document. Values
/// that parse as JSON keep their type; anything else is a string.
pub(crate) fn parse_assignments(assignments: &[String]) -> anyhow::Result<ConfigDocument> {
    let mut doc = ConfigDocument::new();
    for assignment in assignments {
        let Some((key, raw)) = assignment.split_once('=') else {
            bail!("expected KEY=VALUE, got '{assignment}'");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("empty key in '{assignment}'");
        }
        let value =
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        doc.insert(key.to_string(), value);
    }
    Ok(doc)
}

/// The document for `configure`, from `--json` or `--set` pairs.
pub(crate) fn configuration_document(
    assignments: &[String],
    json: Option<&str>,
) -> anyhow::Result<Option<ConfigDocument>> {
    if let Some(raw) = json {
        let value: Value = serde_json::from_str(raw).context("invalid --json document")?;
        let Value::Object(doc) = value else {
            bail!("--json must be a JSON object");
        };
        return Ok(Some(doc));
    }
    if assignments.is_empty() {
        return Ok(None);
    }
    parse_assignments(assignments).map(Some)
}

pub(crate) async fn manage(
    manager: &PluginManager,
    name: &str,
    action: ManageAction,
    config: Option<ConfigDocument>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let request = ManageRequest {
        plugin_name: name.to_string(),
        action: action.to_string(),
        config,
    };
    let response = manager.manage(request).await?;
    if format == OutputFormat::Json {
        return print_json(&response);
    }
    print_response(action, &response, manager).await;
    Ok(())
}

async fn print_response(action: ManageAction, response: &ManageResponse, manager: &PluginManager) {
    let summary = format!(
        "{action} {} ({} v{}, {} tool(s))",
        response.plugin_name, response.category, response.version, response.tools_count
    );
    match response.status {
        PluginStatus::Active => println!("{}", Theme::success(&summary)),
        PluginStatus::Loading => println!("{}", Theme::warning(&summary)),
        PluginStatus::Error => {
            println!("{}", Theme::error(&summary));
            let message = manager
                .registry()
                .get(&response.plugin_name)
                .await
                .and_then(|r| r.error_message);
            if let Some(message) = message {
                println!("  {}", Theme::dimmed(&message));
            }
        },
    }
    println!(
        "  {}",
        Theme::kv("Updated", &Theme::timestamp(&response.last_updated))
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_keep_json_types() {
        let doc = parse_assignments(&[
            "strict_mode=false".into(),
            "regulatory_jurisdiction=EU".into(),
            "limit=5".into(),
            "prefix=a=b".into(),
        ])
        .unwrap();

        assert_eq!(doc["strict_mode"], json!(false));
        assert_eq!(doc["regulatory_jurisdiction"], json!("EU"));
        assert_eq!(doc["limit"], json!(5));
        assert_eq!(doc["prefix"], json!("a=b"));
    }

    #[test]
    fn malformed_assignments_are_rejected() {
        assert!(parse_assignments(&["novalue".into()]).is_err());
        assert!(parse_assignments(&["=1".into()]).is_err());
    }

    #[test]
    fn json_document_takes_precedence() {
        let doc = configuration_document(&["a=1".into()], Some(r#"{"b": 2}"#))
            .unwrap()
            .unwrap();
        assert_eq!(doc.get("b"), Some(&json!(2)));
        assert!(doc.get("a").is_none());

        assert!(configuration_document(&[], Some("[1, 2]")).is_err());
        assert!(configuration_document(&[], None).unwrap().is_none());
    }
}
