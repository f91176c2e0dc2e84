//! Command implementations for the `edm` tool
//!
//! Each command takes a configuration struct built from the command line and
//! returns an error when the tool should exit unsuccessfully.

pub mod evaluate;
pub mod output;
pub mod roundtrip;
pub mod validate;

use anyhow::{Context, Result};
use odata_edm_csdl::{ParsedModel, parse_edmx};
use std::fs;
use std::path::Path;

/// Read and parse a CSDL or Edmx document
///
/// Only hard failures are errors; recoverable parse errors stay in the result.
pub(crate) fn load_model(file: &Path) -> Result<ParsedModel> {
    let text = fs::read_to_string(file).with_context(|| format!("Failed to read file: {}", file.display()))?;
    parse_edmx(&text).with_context(|| format!("Failed to parse file: {}", file.display()))
}
