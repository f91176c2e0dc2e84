//! Round-trip command implementation

use super::{load_model, output};
use anyhow::{Context, Result};
use odata_edm_csdl::{CsdlWriterSettings, write_edmx};
use odata_edm_model::EdmVersion;
use std::path::PathBuf;

/// Configuration for roundtrip command
pub struct RoundTripConfig {
    pub file: PathBuf,
    pub output_file: Option<PathBuf>,
    pub compact: bool,
    /// Version to write instead of the document's own
    pub version: Option<EdmVersion>,
}

/// Read a document and write it back as Edmx
///
/// Read and write errors are reported but do not stop the output.
pub fn roundtrip(config: RoundTripConfig) -> Result<()> {
    let parsed = load_model(&config.file)?;
    for error in &parsed.errors {
        eprintln!("{}", output::format_diagnostic(&config.file, error));
    }

    let mut settings = if config.compact {
        CsdlWriterSettings::compact()
    } else {
        CsdlWriterSettings::default()
    };
    if let Some(version) = config.version {
        settings = settings.with_version(version);
    }

    let document = write_edmx(&parsed.model, &settings)
        .with_context(|| format!("Failed to write {}", config.file.display()))?;
    for error in &document.errors {
        eprintln!("{}", output::format_diagnostic(&config.file, error));
    }

    output::write_output(&document.text, config.output_file.as_deref())
}
