//! Evaluation of EDM annotation expressions
//!
//! This crate provides:
//! - Runtime values with identity-shared structured instances
//! - Coercion of values to type references, including facet checks
//! - The expression evaluator with host-supplied operations
//! - Projection of values into host types
//!
//! ```
//! use odata_edm_eval::{ExpressionEvaluator, Value};
//! use odata_edm_model::{Expression, Model, TypeReference};
//!
//! let mut model = Model::new();
//! let person = model.add_entity_type("Sales", "Person");
//! let label = model.add_term("Vocab", "Label", TypeReference::string(true));
//! model.add_vocabulary_annotation(odata_edm_model::VocabularyAnnotation::new(
//!     person,
//!     label,
//!     Expression::path("Name"),
//! ));
//!
//! let ada = Value::structured(Some(TypeReference::schema(person, false)), [("Name", Value::string("Ada"))]);
//! let evaluator = ExpressionEvaluator::new(&model);
//! assert_eq!(evaluator.term_value(&ada, label, None).unwrap(), Value::string("Ada"));
//! ```

pub mod coerce;
pub mod error;
pub mod evaluator;
pub mod projection;
pub mod value;

pub use coerce::{coerce, is_of};
pub use error::{EvalError, EvalResult};
pub use evaluator::{ExpressionEvaluator, LastChanceFn, OperationFn};
pub use projection::{Converter, FromEdmValue, Projectable, Projector};
pub use value::{CollectionValue, EnumValue, PropertyValue, StructuredValue, Value};
