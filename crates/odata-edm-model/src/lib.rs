//! Entity Data Model graph
//!
//! This crate provides the in-memory EDM:
//! - Primitive types and type references with facets
//! - Entity, complex and enum types with inheritance and navigation
//! - Entity containers, actions and functions
//! - Terms, vocabulary annotations, direct-value annotations and the
//!   annotation expression tree
//!
//! Everything is owned by a [`Model`] and addressed through typed handles.

pub mod container;
pub mod expression;
pub mod ids;
pub mod literal;
pub mod model;
pub mod names;
pub mod operation;
pub mod primitive;
pub mod schema;
pub mod type_ref;
pub mod version;
pub mod vocabulary;

pub use container::*;
pub use expression::*;
pub use ids::*;
pub use model::*;
pub use operation::*;
pub use primitive::*;
pub use schema::*;
pub use type_ref::*;
pub use version::*;
pub use vocabulary::*;

pub use odata_edm_diagnostics as diagnostics;
