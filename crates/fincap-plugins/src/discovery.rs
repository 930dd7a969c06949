//! Plugin candidates and manifest loading.
//!
//! A candidate is a plugin name plus a [`CandidateKind`] tag recorded at
//! discovery time; the registry never infers a plugin's kind from its name.
//! Candidates come from three places, in this order:
//!
//! 1. the [`NativeCatalog`](crate::NativeCatalog),
//! 2. `*.toml` manifests in the plugins directory,
//! 3. one `{category}_adapter` per category the remote client serves.
//!
//! When two sources produce the same name the first one wins.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{PluginError, PluginResult};
use crate::plugin::ConfigDocument;

/// Extension of manifest files in the plugins directory.
pub const MANIFEST_EXTENSION: &str = "toml";

/// Suffix of adapter plugin names.
pub const ADAPTER_SUFFIX: &str = "_adapter";

/// Canonical adapter plugin name for a remote category.
#[must_use]
pub fn adapter_name(category: &str) -> String {
    format!("{category}{ADAPTER_SUFFIX}")
}

/// How a candidate is turned into a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateKind {
    /// Build from the native catalog entry named `factory`.
    Native {
        /// Catalog entry name.
        factory: String,
    },
    /// Forward to the remote server for `category`.
    Adapter {
        /// Remote category.
        category: String,
    },
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native { factory } => write!(f, "native({factory})"),
            Self::Adapter { category } => write!(f, "adapter({category})"),
        }
    }
}

/// A discovered, not yet loaded, plugin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Plugin name.
    pub name: String,
    /// Provider variant.
    pub kind: CandidateKind,
    /// Configuration applied beneath the stored document.
    pub defaults: ConfigDocument,
    /// Manifest file, for manifest-declared candidates.
    pub manifest: Option<PathBuf>,
}

impl Candidate {
    /// A candidate for a native catalog entry under its own name.
    #[must_use]
    pub fn native(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            kind: CandidateKind::Native {
                factory: name.clone(),
            },
            name,
            defaults: ConfigDocument::new(),
            manifest: None,
        }
    }

    /// The adapter candidate for a remote category.
    #[must_use]
    pub fn adapter(category: &str) -> Self {
        Self {
            name: adapter_name(category),
            kind: CandidateKind::Adapter {
                category: category.to_string(),
            },
            defaults: ConfigDocument::new(),
            manifest: None,
        }
    }

    /// `defaults` overlaid with `stored`, key by key.
    #[must_use]
    pub fn effective_config(&self, stored: ConfigDocument) -> ConfigDocument {
        let mut merged = self.defaults.clone();
        merged.extend(stored);
        merged
    }
}

/// An operator-declared plugin.
///
/// ```toml
/// name = "strict_compliance"
/// description = "Compliance checks with strict mode forced on"
///
/// [source]
/// kind = "native"
/// factory = "compliance"
///
/// [config]
/// strict_mode = true
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PluginManifest {
    /// Plugin name.
    pub name: String,
    /// Optional note for operators.
    #[serde(default)]
    pub description: Option<String>,
    /// Provider variant.
    pub source: CandidateKind,
    /// Default configuration.
    #[serde(default)]
    pub config: toml::Table,
}

impl PluginManifest {
    /// Convert to a candidate.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ManifestParse`] if the name is empty or the
    /// `[config]` table cannot be expressed as JSON.
    pub fn into_candidate(self, path: &Path) -> PluginResult<Candidate> {
        if self.name.trim().is_empty() {
            return Err(PluginError::ManifestParse {
                path: path.to_path_buf(),
                message: "plugin name must not be empty".into(),
            });
        }
        let defaults = match serde_json::to_value(&self.config) {
            Ok(Value::Object(map)) => map,
            Ok(_) => ConfigDocument::new(),
            Err(e) => {
                return Err(PluginError::ManifestParse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                });
            },
        };
        Ok(Candidate {
            name: self.name,
            kind: self.source,
            defaults,
            manifest: Some(path.to_path_buf()),
        })
    }
}

/// Load a single manifest.
///
/// # Errors
///
/// Returns [`PluginError::ManifestParse`] if the file cannot be read or
/// parsed.
pub fn load_manifest(path: &Path) -> PluginResult<PluginManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| PluginError::ManifestParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    toml::from_str(&content).map_err(|e| PluginError::ManifestParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Candidates declared by `*.toml` files directly inside `dir`, in file
/// name order.
///
/// A missing directory yields nothing. Individual bad manifests are logged
/// and skipped.
///
/// # Errors
///
/// Returns [`PluginError::Discovery`] if `dir` exists but cannot be read.
pub fn load_manifests_from_dir(dir: &Path) -> PluginResult<Vec<Candidate>> {
    if !dir.exists() {
        debug!(path = %dir.display(), "Plugins directory does not exist");
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(dir)
        .map_err(|e| PluginError::Discovery(format!("cannot read {}: {e}", dir.display())))?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| PluginError::Discovery(format!("cannot read {}: {e}", dir.display())))?
            .path();
        if path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == MANIFEST_EXTENSION)
        {
            paths.push(path);
        }
    }
    paths.sort();

    let mut candidates = Vec::new();
    for path in paths {
        match load_manifest(&path).and_then(|m| m.into_candidate(&path)) {
            Ok(candidate) => {
                debug!(
                    path = %path.display(),
                    plugin = %candidate.name,
                    kind = %candidate.kind,
                    "Loaded plugin manifest"
                );
                candidates.push(candidate);
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping plugin manifest");
            },
        }
    }
    Ok(candidates)
}

/// Enumerate candidates from every source, first name wins.
///
/// # Errors
///
/// Returns [`PluginError::Discovery`] if the plugins directory exists but
/// cannot be read.
pub fn discover_candidates(
    native: impl IntoIterator<Item = String>,
    plugins_dir: Option<&Path>,
    remote_categories: impl IntoIterator<Item = String>,
) -> PluginResult<Vec<Candidate>> {
    let mut found: Vec<Candidate> = native.into_iter().map(Candidate::native).collect();

    if let Some(dir) = plugins_dir {
        found.extend(load_manifests_from_dir(dir)?);
    }
    found.extend(
        remote_categories
            .into_iter()
            .map(|category| Candidate::adapter(&category)),
    );

    let mut candidates: Vec<Candidate> = Vec::with_capacity(found.len());
    for candidate in found {
        if candidates.iter().any(|c| c.name == candidate.name) {
            warn!(plugin = %candidate.name, kind = %candidate.kind, "Duplicate plugin name; keeping the first");
            continue;
        }
        candidates.push(candidate);
    }

    info!(count = candidates.len(), "Plugin discovery completed");
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn adapter_names_follow_category() {
        assert_eq!(adapter_name("market_data"), "market_data_adapter");
        let candidate = Candidate::adapter("ai_analysis");
        assert_eq!(candidate.name, "ai_analysis_adapter");
        assert_eq!(
            candidate.kind,
            CandidateKind::Adapter {
                category: "ai_analysis".into()
            }
        );
    }

    #[test]
    fn manifests_are_read_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "b.toml",
            "name = \"strict_compliance\"\n[source]\nkind = \"native\"\nfactory = \"compliance\"\n[config]\nstrict_mode = true\n",
        );
        write(
            dir.path(),
            "a.toml",
            "name = \"risk_adapter\"\n[source]\nkind = \"adapter\"\ncategory = \"risk_assessment\"\n",
        );
        write(dir.path(), "notes.txt", "ignored");

        let candidates = load_manifests_from_dir(dir.path()).unwrap();
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["risk_adapter", "strict_compliance"]);
        assert_eq!(candidates[1].defaults["strict_mode"], true);
        assert!(candidates[1].manifest.is_some());
    }

    #[test]
    fn bad_manifest_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "bad.toml", "name = \"x\"\n[source]\nkind = \"wasm\"\n");
        write(dir.path(), "empty.toml", "name = \"\"\n[source]\nkind = \"native\"\nfactory = \"echo\"\n");
        assert!(load_manifests_from_dir(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(load_manifests_from_dir(&missing).unwrap().is_empty());
    }

    #[test]
    fn first_source_wins_on_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "echo.toml",
            "name = \"echo\"\n[source]\nkind = \"adapter\"\ncategory = \"custom\"\n",
        );
        let candidates = discover_candidates(
            vec!["echo".to_string()],
            Some(dir.path()),
            vec!["market_data".to_string()],
        )
        .unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], Candidate::native("echo"));
        assert_eq!(candidates[1].name, "market_data_adapter");
    }

    #[test]
    fn stored_config_overrides_defaults() {
        let mut candidate = Candidate::native("compliance");
        candidate.defaults.insert("strict_mode".into(), true.into());
        candidate.defaults.insert("regulatory_jurisdiction".into(), "US".into());
        let mut stored = ConfigDocument::new();
        stored.insert("strict_mode".into(), false.into());

        let merged = candidate.effective_config(stored);
        assert_eq!(merged["strict_mode"], false);
        assert_eq!(merged["regulatory_jurisdiction"], "US");
    }
}
