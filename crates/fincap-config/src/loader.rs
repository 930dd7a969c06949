//! Config file discovery and layered loading.
//!
//! 1. Parse embedded `defaults.toml` → base
//! 2. Merge `{home}/config.toml` (user)
//! 3. Merge the explicit `--config` file, if any
//! 4. Apply `FINCAP_*` environment overrides
//! 5. Deserialize and validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, ResolvedConfig};
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Environment variable selecting the fincap home directory.
pub const HOME_ENV_VAR: &str = "FINCAP_HOME";

/// Environment variable → dotted config path.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("FINCAP_LOG_LEVEL", "logging.level"),
    ("FINCAP_LOG_FORMAT", "logging.format"),
    ("FINCAP_PLUGINS_DIR", "plugins.dir"),
    ("FINCAP_CONFIG_STORE", "plugins.config_store"),
    ("FINCAP_INIT_TIMEOUT_SECS", "plugins.init_timeout_secs"),
    ("FINCAP_REMOTE_MODE", "remote.mode"),
    ("FINCAP_CALL_TIMEOUT_SECS", "remote.call_timeout_secs"),
];

/// Load configuration using the process environment.
///
/// `explicit` is an additional file merged last (e.g. `--config`).
/// `home_override` replaces the fincap home directory (default
/// `~/.fincap`, or `$FINCAP_HOME`).
///
/// # Errors
///
/// Returns a [`ConfigError`] if any file is malformed or the merged
/// configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_with_env(explicit, home_override, &collect_env_vars())
}

/// Load configuration against an explicit environment map.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: std::hash::BuildHasher>(
    explicit: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let home = match home_override {
        Some(h) => h.to_path_buf(),
        None => match env_vars.get(HOME_ENV_VAR) {
            Some(h) => PathBuf::from(h),
            None => default_home()?,
        },
    };

    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;
    let mut loaded_files = Vec::new();

    let user_path = home.join("config.toml");
    if let Some(overlay) = try_load_file(&user_path)? {
        deep_merge(&mut merged, &overlay);
        loaded_files.push(user_path.display().to_string());
        info!(path = %user_path.display(), "loaded user config");
    }

    if let Some(path) = explicit {
        let overlay = try_load_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        })?;
        deep_merge(&mut merged, &overlay);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded explicit config");
    }

    let applied = apply_env_overrides(&mut merged, env_vars)?;
    if applied > 0 {
        debug!(count = applied, "applied environment overrides");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        home,
        loaded_files,
    })
}

/// Snapshot of the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

fn default_home() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".fincap"))
        .ok_or(ConfigError::NoHomeDir)
}

/// Read a TOML file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })
}

/// Deep-merge `overlay` into `base`. Tables merge key by key; any other
/// value in `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
        },
    }
}

fn apply_env_overrides<S: std::hash::BuildHasher>(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;
    for (var_name, field_path) in ENV_OVERRIDES {
        if let Some(raw) = env_vars.get(*var_name) {
            debug!(var = var_name, field = field_path, "applying env override");
            set_field(merged, field_path, raw).map_err(|message| ConfigError::EnvError {
                var_name: (*var_name).to_owned(),
                message,
            })?;
            count = count.saturating_add(1);
        }
    }
    Ok(count)
}

/// Set a dotted path from a string, keeping the type of an existing
/// integer or boolean leaf.
fn set_field(root: &mut toml::Value, field_path: &str, raw: &str) -> Result<(), String> {
    let mut node = root;
    let mut parts = field_path.split('.').peekable();
    while let Some(part) = parts.next() {
        let table = node
            .as_table_mut()
            .ok_or_else(|| format!("'{part}' is not inside a table"))?;
        if parts.peek().is_none() {
            let value = match table.get(part) {
                Some(toml::Value::Integer(_)) => raw
                    .parse::<i64>()
                    .map(toml::Value::Integer)
                    .map_err(|e| format!("expected an integer: {e}"))?,
                Some(toml::Value::Boolean(_)) => raw
                    .parse::<bool>()
                    .map(toml::Value::Boolean)
                    .map_err(|e| format!("expected a boolean: {e}"))?,
                _ => toml::Value::String(raw.to_owned()),
            };
            table.insert(part.to_owned(), value);
            return Ok(());
        }
        node = table
            .entry(part.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemoteMode;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn test_defaults_deserialize_to_config() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_without_files() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load_with_env(None, Some(home.path()), &env(&[])).unwrap();
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(resolved.config.remote.mode, RemoteMode::Simulated);
        assert_eq!(resolved.plugins_dir(), home.path().join("plugins"));
        assert_eq!(
            resolved.config_store_path(),
            home.path().join("plugin_config.json")
        );
    }

    #[test]
    fn test_layering_user_then_explicit() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            "[logging]\nlevel = \"debug\"\n[plugins]\ninit_timeout_secs = 5\n",
        )
        .unwrap();
        let explicit = home.path().join("override.toml");
        std::fs::write(&explicit, "[logging]\nlevel = \"warn\"\n").unwrap();

        let resolved = load_with_env(Some(&explicit), Some(home.path()), &env(&[])).unwrap();
        assert_eq!(resolved.config.logging.level, "warn");
        assert_eq!(resolved.config.plugins.init_timeout_secs, 5);
        assert_eq!(resolved.config.remote.call_timeout_secs, 30);
        assert_eq!(resolved.loaded_files.len(), 2);
    }

    #[test]
    fn test_env_overrides_win() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(home.path().join("config.toml"), "[logging]\nlevel = \"debug\"\n").unwrap();

        let resolved = load_with_env(
            None,
            Some(home.path()),
            &env(&[
                ("FINCAP_LOG_LEVEL", "error"),
                ("FINCAP_CALL_TIMEOUT_SECS", "7"),
                ("FINCAP_CONFIG_STORE", "/var/lib/fincap/cfg.json"),
            ]),
        )
        .unwrap();
        assert_eq!(resolved.config.logging.level, "error");
        assert_eq!(resolved.config.remote.call_timeout_secs, 7);
        assert_eq!(
            resolved.config_store_path(),
            PathBuf::from("/var/lib/fincap/cfg.json")
        );
    }

    #[test]
    fn test_env_override_type_mismatch() {
        let home = tempfile::tempdir().unwrap();
        let err = load_with_env(
            None,
            Some(home.path()),
            &env(&[("FINCAP_INIT_TIMEOUT_SECS", "soon")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvError { .. }));
    }

    #[test]
    fn test_home_from_env() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load_with_env(
            None,
            None,
            &env(&[(HOME_ENV_VAR, home.path().to_str().unwrap())]),
        )
        .unwrap();
        assert_eq!(resolved.home, home.path());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let home = tempfile::tempdir().unwrap();
        let missing = home.path().join("nope.toml");
        assert!(matches!(
            load_with_env(Some(&missing), Some(home.path()), &env(&[])),
            Err(ConfigError::ReadError { .. })
        ));
    }

    #[test]
    fn test_stdio_servers_parse() {
        let home = tempfile::tempdir().unwrap();
        std::fs::write(
            home.path().join("config.toml"),
            r#"
[remote]
mode = "stdio"

[remote.servers.market_data]
command = "python3"
args = ["-m", "servers.market_data"]
env = { MARKET_API = "demo" }
"#,
        )
        .unwrap();
        let resolved = load_with_env(None, Some(home.path()), &env(&[])).unwrap();
        let server = &resolved.config.remote.servers["market_data"];
        assert_eq!(server.command, "python3");
        assert_eq!(server.args, vec!["-m", "servers.market_data"]);
        assert_eq!(server.env["MARKET_API"], "demo");
    }

    #[test]
    fn test_deep_merge_nested() {
        let mut base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\nz = 4\n").unwrap();
        deep_merge(&mut base, &overlay);
        let a = base.get("a").unwrap();
        assert_eq!(a.get("x").unwrap().as_integer(), Some(1));
        assert_eq!(a.get("y").unwrap().as_integer(), Some(3));
        assert_eq!(a.get("z").unwrap().as_integer(), Some(4));
    }
}
