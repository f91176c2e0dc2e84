//! Evaluate command implementation

use super::{load_model, output};
use anyhow::{Context, Result};
use log::debug;
use odata_edm_eval::{ExpressionEvaluator, Value};
use std::path::PathBuf;

/// Configuration for evaluate command
pub struct EvaluateConfig {
    pub file: PathBuf,
    /// Qualified term name
    pub term: String,
    /// Target path as written in the document, such as `NS.Customer/Name`
    pub target: String,
    pub qualifier: Option<String>,
    pub output_file: Option<PathBuf>,
}

/// Evaluate the annotation of a term on a target without a context value
pub fn evaluate(config: EvaluateConfig) -> Result<Value> {
    let parsed = load_model(&config.file)?;
    for error in &parsed.errors {
        eprintln!("{}", output::format_diagnostic(&config.file, error));
    }
    let model = &parsed.model;

    let term = model
        .find_term(&config.term)
        .with_context(|| format!("Unknown term '{}'", config.term))?;
    let target = model
        .vocabulary_annotations()
        .iter()
        .map(|a| &a.target)
        .find(|t| model.target_path(t) == config.target)
        .with_context(|| format!("No annotations on '{}'", config.target))?;
    debug!("Evaluating {} on {}", config.term, model.target_path(target));

    let value = ExpressionEvaluator::new(model)
        .element_term_value(target, term, config.qualifier.as_deref(), None)
        .with_context(|| format!("Failed to evaluate {} on {}", config.term, config.target))?;
    output::write_output(&value.to_string(), config.output_file.as_deref())?;
    Ok(value)
}
