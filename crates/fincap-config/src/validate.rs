//! Post-merge validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, RemoteMode};

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first offending field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_logging(config)?;
    validate_timeouts(config)?;
    validate_remote(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !matches!(
        l.level.as_str(),
        "error" | "warn" | "info" | "debug" | "trace"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported level '{}'; expected one of: error, warn, info, debug, trace",
                l.level
            ),
        ));
    }
    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }
    Ok(())
}

fn validate_timeouts(config: &Config) -> ConfigResult<()> {
    if config.plugins.init_timeout_secs == 0 {
        return Err(invalid("plugins.init_timeout_secs", "must be greater than 0"));
    }
    if config.remote.call_timeout_secs == 0 {
        return Err(invalid("remote.call_timeout_secs", "must be greater than 0"));
    }
    Ok(())
}

fn validate_remote(config: &Config) -> ConfigResult<()> {
    let r = &config.remote;
    for (category, server) in &r.servers {
        if category.trim().is_empty() {
            return Err(invalid("remote.servers", "category name must not be empty"));
        }
        if server.command.trim().is_empty() {
            return Err(invalid(
                format!("remote.servers.{category}.command"),
                "command must not be empty",
            ));
        }
    }
    if r.mode == RemoteMode::Stdio && r.servers.is_empty() {
        return Err(invalid(
            "remote.servers",
            "stdio mode requires at least one [remote.servers.<category>] entry",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ServerSection;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn rejects_unknown_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn rejects_zero_timeouts() {
        let mut config = Config::default();
        config.remote.call_timeout_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn stdio_mode_needs_servers() {
        let mut config = Config::default();
        config.remote.mode = RemoteMode::Stdio;
        assert!(validate(&config).is_err());

        config.remote.servers.insert(
            "market_data".to_owned(),
            ServerSection {
                command: "python3".to_owned(),
                ..ServerSection::default()
            },
        );
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_server_without_command() {
        let mut config = Config::default();
        config
            .remote
            .servers
            .insert("market_data".to_owned(), ServerSection::default());
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("remote.servers.market_data.command"));
    }
}
