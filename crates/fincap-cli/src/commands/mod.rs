//! CLI command implementations.

pub(crate) mod invoke;
pub(crate) mod plugins;

use clap::ValueEnum;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Colored tables and messages.
    Pretty,
    /// Pretty-printed JSON on stdout.
    Json,
}

/// Print `value` as pretty JSON.
pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
