#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for the fincap plugin runtime.
//!
//! # Usage
//!
//! ```rust,no_run
//! let resolved = fincap_config::load(None, None).unwrap();
//! println!("plugins dir: {}", resolved.plugins_dir().display());
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment** (`FINCAP_LOG_LEVEL`, `FINCAP_PLUGINS_DIR`, ...)
//! 2. **Explicit file** passed by the caller (`--config`)
//! 3. **User** (`~/.fincap/config.toml`, or `$FINCAP_HOME/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate depends on no other fincap crate. Conversion into runtime
//! types (log config, remote server definitions) happens in the CLI.

/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Post-merge validation.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_with_env};
pub use types::{
    Config, LoggingSection, PluginsSection, RemoteMode, RemoteSection, ResolvedConfig,
    ServerSection,
};
