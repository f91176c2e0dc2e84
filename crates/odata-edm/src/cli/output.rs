//! Output formatting utilities

use anyhow::{Context, Result};
use colored::Colorize;
use odata_edm_diagnostics::{EdmError, Severity};
use std::fs;
use std::io::IsTerminal;
use std::path::Path;

/// Set up color output based on user preference
pub fn setup_colors(mode: &str) {
    match mode.to_lowercase().as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => colored::control::set_override(std::io::stdout().is_terminal()),
    }
}

/// Format an error for display
pub fn format_error(error: &anyhow::Error) -> String {
    format!("{} {:#}", "Error:".red().bold(), error)
}

/// Format a success message for display
pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Format diagnostic information (file:line:col)
pub fn format_location(file: &str, line: usize, col: usize) -> String {
    format!("{}:{}:{}", file.cyan(), line, col)
}

/// One diagnostic line, prefixed with its text position when known
pub fn format_diagnostic(file: &Path, error: &EdmError) -> String {
    let level = match error.severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
    };
    let code = format!("[{}]", error.code);
    match error.source_location() {
        Some(loc) => format!(
            "{} {} {}: {}",
            level,
            code.dimmed(),
            format_location(&file.display().to_string(), loc.line, loc.column),
            error.message
        ),
        None => match &error.location {
            Some(location) => format!("{} {} {}: {}", level, code.dimmed(), location, error.message),
            None => format!("{} {}: {}", level, code.dimmed(), error.message),
        },
    }
}

/// Write output to a file or stdout
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    if let Some(path) = output_file {
        fs::write(path, content).with_context(|| format!("Failed to write output file: {}", path.display()))?;
        eprintln!("{}", format_success(&format!("Output written to {}", path.display())));
    } else {
        println!("{}", content);
    }
    Ok(())
}
