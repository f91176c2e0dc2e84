//! Evaluation errors

use thiserror::Error;

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Reason an evaluation produced no value
///
/// Every variant is terminal for the call that raised it; there is no
/// partial result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// A path segment named a property the value does not have
    #[error("Path '{path}' cannot be evaluated: no property '{segment}'")]
    PathNotFound { path: String, segment: String },

    /// A path segment was applied to a value without properties
    #[error("Path '{path}' cannot be evaluated: '{segment}' applied to a {kind} value")]
    NotStructured {
        path: String,
        segment: String,
        kind: &'static str,
    },

    /// A value does not fit the asserted type
    #[error("Cannot cast {from} to {to}: {message}")]
    CastFailed {
        from: String,
        to: String,
        message: String,
    },

    /// Constant text that is not a valid literal
    #[error("'{text}' is not a valid {kind} literal")]
    InvalidLiteral { kind: String, text: String },

    /// No implementation for an applied operation
    #[error("No implementation for operation '{name}'")]
    UnboundOperation { name: String },

    /// `If` condition did not evaluate to a boolean
    #[error("If condition evaluated to a {kind} value, expected Boolean")]
    ConditionNotBoolean { kind: &'static str },

    /// A labeled element depends on its own value
    #[error("Labeled element '{name}' refers to itself")]
    LabelCycle { name: String },

    /// A path was evaluated without a context value
    #[error("Path '{path}' needs a context value")]
    MissingContext { path: String },

    /// No term with this qualified name
    #[error("Unknown term '{name}'")]
    UnknownTerm { name: String },

    /// A value cannot be turned into the requested host type
    #[error("Cannot project {kind} value into {target}: {message}")]
    ProjectionFailed {
        kind: &'static str,
        target: &'static str,
        message: String,
    },

    /// A host operation reported a failure
    #[error("Operation '{name}' failed: {message}")]
    OperationFailed { name: String, message: String },
}

impl EvalError {
    /// Create a cast failure
    pub fn cast_failed(from: impl Into<String>, to: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CastFailed {
            from: from.into(),
            to: to.into(),
            message: message.into(),
        }
    }

    /// Create an invalid literal error
    pub fn invalid_literal(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self::InvalidLiteral {
            kind: kind.into(),
            text: text.into(),
        }
    }

    /// Create an operation failure; for use by host operations
    pub fn operation_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a projection failure
    pub fn projection_failed(kind: &'static str, target: &'static str, message: impl Into<String>) -> Self {
        Self::ProjectionFailed {
            kind,
            target,
            message: message.into(),
        }
    }

    /// Check if this is a coercion mismatch rather than a failure to produce the value
    pub fn is_cast_failure(&self) -> bool {
        matches!(self, Self::CastFailed { .. })
    }
}
