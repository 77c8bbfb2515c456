//! CLI commands
//!
//! Thin adapters from parsed arguments to services. Results are written to
//! stdout as pretty JSON.

pub mod overview;
pub mod stock;

use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Write `value` to stdout as pretty JSON
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", json)?;
    Ok(())
}
