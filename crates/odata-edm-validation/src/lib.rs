//! EDM model validation
//!
//! Walks a [`Model`](odata_edm_model::Model) under a version-keyed
//! [`RuleSet`] and collects every applicable [`EdmError`]. Validation never
//! mutates the model and never stops at the first error.
//!
//! Errors come out in a deterministic order: schema elements in model order,
//! rules in rule-set order for each element, then vocabulary annotations.

mod annotation;
mod container;
mod context;
mod rules;
mod structure;
mod validator;

pub use rules::{Rule, RuleScope, RuleSet};
pub use validator::{ValidationResult, Validator, validate, validate_model};

pub use odata_edm_diagnostics::{EdmError, EdmErrorCode};
