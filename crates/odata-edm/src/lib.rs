//! OData Entity Data Model for Rust
//!
//! This crate bundles the EDM crates:
//! - Building and querying models of types, containers and vocabularies
//! - Validation under version-keyed rule sets
//! - Reading and writing CSDL XML
//! - Evaluating annotation expressions
//!
//! # Example
//!
//! ```
//! use odata_edm::csdl::{CsdlWriterSettings, parse_edmx, write_edmx};
//! use odata_edm::{Model, TypeReference, validate_model};
//!
//! let mut model = Model::new();
//! let customer = model.add_entity_type("Sales", "Customer");
//! let id = model.add_structural_property(customer, "Id", TypeReference::int32(false)).unwrap();
//! model.add_keys(customer, &[id]).unwrap();
//! assert!(validate_model(&model).is_valid());
//!
//! let document = write_edmx(&model, &CsdlWriterSettings::default()).unwrap();
//! let parsed = parse_edmx(&document.text).unwrap();
//! assert!(parsed.model.find_type("Sales.Customer").is_some());
//! ```

pub use odata_edm_csdl as csdl;
pub use odata_edm_diagnostics as diagnostics;
pub use odata_edm_eval as eval;
pub use odata_edm_model as model;
pub use odata_edm_validation as validation;

// Convenience re-exports
pub use odata_edm_diagnostics::{EdmError, EdmErrorCode, ModelError};
pub use odata_edm_eval::{EvalError, ExpressionEvaluator, Value};
pub use odata_edm_model::{EdmVersion, Expression, Model, TypeReference};
pub use odata_edm_validation::{RuleSet, ValidationResult, validate, validate_model};

#[cfg(feature = "cli")]
pub mod cli;
