//! EDM error types

use crate::{EdmErrorCode, EdmLocation, SourceLocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Error - the model is invalid
    Error,
    /// Warning - potential issue but the model is usable
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A located, collected model diagnostic
///
/// Produced by the validator, the CSDL reader and the CSDL writer. These are
/// never raised; callers receive them as lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdmError {
    /// Severity level
    pub severity: Severity,
    /// Error code
    pub code: EdmErrorCode,
    /// Human-readable message
    pub message: String,
    /// Where the error applies
    pub location: Option<EdmLocation>,
}

impl EdmError {
    /// Create a new error diagnostic
    pub fn new(code: EdmErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Create a new warning diagnostic
    pub fn warning(code: EdmErrorCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            location: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<EdmLocation>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the location if one is known
    pub fn with_optional_location(mut self, location: Option<EdmLocation>) -> Self {
        self.location = location;
        self
    }

    /// Line and column, if the error came from a parsed document
    pub fn source_location(&self) -> Option<SourceLocation> {
        self.location.as_ref().and_then(EdmLocation::source_location)
    }
}

impl fmt::Display for EdmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.severity, self.code, self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        Ok(())
    }
}

/// Construction-time contract violation
///
/// Returned immediately by builder calls on a model; these are not collected
/// and never appear in validator output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Generic invalid operation
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Property already declared by another type
    #[error("Property '{property}' is already declared by type '{declaring_type}'")]
    PropertyAlreadyBound {
        property: String,
        declaring_type: String,
    },

    /// Operation requires an entity type
    #[error("'{name}' is not an entity type")]
    NotAnEntityType { name: String },

    /// Operation requires a structured type
    #[error("'{name}' is not a structured type")]
    NotAStructuredType { name: String },

    /// Operation requires an enum type
    #[error("'{name}' is not an enum type")]
    NotAnEnumType { name: String },

    /// Operation requires a navigation property
    #[error("'{name}' is not a navigation property")]
    NotANavigationProperty { name: String },

    /// Referenced element does not exist
    #[error("Unknown {kind}: {name}")]
    UnknownElement { kind: String, name: String },

    /// Typed direct-value access with the wrong type
    #[error("Direct value annotation {namespace}:{name} does not hold a value of type {expected}")]
    DirectValueTypeMismatch {
        namespace: String,
        name: String,
        expected: &'static str,
    },
}

impl ModelError {
    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create an unknown element error
    pub fn unknown(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::UnknownElement {
            kind: kind.into(),
            name: name.into(),
        }
    }
}
