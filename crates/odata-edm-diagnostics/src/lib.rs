//! EDM diagnostics and error handling
//!
//! This crate provides the error handling infrastructure shared by the EDM
//! crates: error codes, element and source locations, collected diagnostics
//! and construction-time errors.

mod error;
mod error_code;
mod location;

pub use error::*;
pub use error_code::*;
pub use location::*;

/// Result type for model construction operations
pub type Result<T> = std::result::Result<T, ModelError>;
