//! Validate command implementation

use super::{load_model, output};
use anyhow::Result;
use colored::Colorize;
use log::debug;
use odata_edm_diagnostics::{EdmError, Severity};
use odata_edm_model::EdmVersion;
use odata_edm_validation::{RuleSet, validate as validate_with};
use std::path::{Path, PathBuf};

/// Configuration for validate command
pub struct ValidateConfig {
    pub files: Vec<PathBuf>,
    /// Rule set to apply instead of the one for each document's version
    pub version: Option<EdmVersion>,
    pub verbose: bool,
}

/// Diagnostics collected for one file
#[derive(Debug)]
pub struct FileReport {
    pub file: PathBuf,
    pub diagnostics: Vec<EdmError>,
}

impl FileReport {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }
}

/// Validate CSDL documents
///
/// Fails when any file has an error-severity diagnostic.
pub fn validate(config: ValidateConfig) -> Result<Vec<FileReport>> {
    if config.files.is_empty() {
        anyhow::bail!("No files specified for validation");
    }

    let mut reports = Vec::with_capacity(config.files.len());
    for file in &config.files {
        let report = validate_file(file, config.version, config.verbose)?;
        print_report(&report);
        reports.push(report);
    }

    let errors: usize = reports.iter().map(FileReport::error_count).sum();
    let warnings: usize = reports.iter().map(FileReport::warning_count).sum();
    println!();
    if errors > 0 {
        anyhow::bail!("Validation failed: {} error(s), {} warning(s)", errors, warnings);
    }
    println!(
        "{}",
        output::format_success(&format!("All {} file(s) validated successfully", config.files.len()))
    );
    Ok(reports)
}

/// Parse and validate a single file
fn validate_file(file: &Path, version: Option<EdmVersion>, verbose: bool) -> Result<FileReport> {
    if verbose {
        eprintln!("Validating: {}", file.display());
    }

    let parsed = load_model(file)?;
    let rules = RuleSet::for_version(version.unwrap_or(parsed.model.version()));
    let validation = validate_with(&parsed.model, &rules);
    debug!(
        "{}: {} parse error(s), {} validation error(s) under {}",
        file.display(),
        parsed.errors.len(),
        validation.errors.len(),
        rules.version()
    );

    let mut diagnostics = parsed.errors;
    diagnostics.extend(validation.errors);
    Ok(FileReport {
        file: file.to_path_buf(),
        diagnostics,
    })
}

fn print_report(report: &FileReport) {
    let status = if report.error_count() == 0 {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{} {}", status, report.file.display().to_string().cyan());
    for diagnostic in &report.diagnostics {
        println!("  {}", output::format_diagnostic(&report.file, diagnostic));
    }
}
