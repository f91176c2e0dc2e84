//! Hard failures of the CSDL text boundary

use odata_edm_diagnostics::SourceLocation;

/// Errors that stop reading or writing a document
///
/// Recoverable schema problems are never reported through this type; they
/// are collected as [`EdmError`](odata_edm_diagnostics::EdmError)s instead.
#[derive(Debug, thiserror::Error)]
pub enum CsdlError {
    /// Input is not well-formed XML
    #[error("XML error at {location}: {message}")]
    Syntax {
        message: String,
        location: SourceLocation,
    },

    /// Malformed attribute
    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// Bad escape sequence or entity reference
    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    /// Root element is neither `edmx:Edmx` nor `Schema`
    #[error("Unexpected document root '{0}'")]
    UnexpectedRoot(String),

    /// Writing XML text failed
    #[error("XML write error: {0}")]
    Write(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CsdlError {
    pub(crate) fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::Syntax {
            message: message.into(),
            location,
        }
    }
}
