//! CLI theme and styling.

use colored::Colorize;
use fincap_plugins::PluginStatus;

/// CLI theme configuration.
pub(crate) struct Theme;

impl Theme {
    /// Format a header.
    pub(crate) fn header(text: &str) -> String {
        format!("{}", text.bold().cyan())
    }

    /// Format a success message.
    pub(crate) fn success(text: &str) -> String {
        format!("{} {}", "✓".green(), text)
    }

    /// Format an error message.
    pub(crate) fn error(text: &str) -> String {
        format!("{} {}", "✗".red(), text.red())
    }

    /// Format a warning message.
    pub(crate) fn warning(text: &str) -> String {
        format!("{} {}", "!".yellow(), text.yellow())
    }

    /// Format an info message.
    pub(crate) fn info(text: &str) -> String {
        format!("{} {}", "i".blue(), text)
    }

    /// Format a dimmed message.
    pub(crate) fn dimmed(text: &str) -> String {
        format!("{}", text.dimmed())
    }

    /// Format a separator line.
    pub(crate) fn separator() -> String {
        "━".repeat(60).dimmed().to_string()
    }

    /// Format a key-value pair.
    pub(crate) fn kv(key: &str, value: &str) -> String {
        format!("{}: {}", key.bold(), value)
    }

    /// Format a plugin status, padded to `width` before coloring.
    pub(crate) fn status(status: PluginStatus, width: usize) -> String {
        let text = format!("{:<width$}", status.to_string());
        match status {
            PluginStatus::Active => text.green().to_string(),
            PluginStatus::Loading => text.yellow().to_string(),
            PluginStatus::Error => text.red().to_string(),
        }
    }

    /// Format a timestamp.
    pub(crate) fn timestamp(dt: &chrono::DateTime<chrono::Utc>) -> String {
        dt.format("%Y-%m-%d %H:%M:%S").to_string().dimmed().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_pads_before_coloring() {
        colored::control::set_override(false);
        assert_eq!(Theme::status(PluginStatus::Active, 8), "active  ");
        assert_eq!(Theme::status(PluginStatus::Error, 3), "error");
        colored::control::unset_override();
    }
}
