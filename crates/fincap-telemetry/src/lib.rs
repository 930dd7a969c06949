//! fincap Telemetry - logging for the plugin runtime.
//!
//! Builds a `tracing` subscriber from a [`LogConfig`]: an `EnvFilter` from
//! the configured level and per-target directives, and one fmt layer in the
//! requested format writing to stdout, stderr or a rolling file.
//!
//! # Example
//!
//! ```rust,no_run
//! use fincap_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), fincap_telemetry::TelemetryError> {
//! let config = LogConfig::new("debug")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("fincap_mcp=trace");
//!
//! setup_logging(&config)?;
//! tracing::info!("Registry starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
