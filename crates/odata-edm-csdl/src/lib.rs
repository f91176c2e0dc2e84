//! CSDL XML reader and writer
//!
//! This crate provides:
//! - A generic element tree and a `quick-xml` text adapter for it
//! - The CSDL writer: model to one `Schema` element per namespace
//! - The CSDL reader: `Schema` elements to a model plus recoverable errors
//! - The Edmx envelope used for whole documents
//!
//! ```
//! use odata_edm_csdl::{parse_edmx, write_edmx, CsdlWriterSettings};
//! use odata_edm_model::{Model, TypeReference};
//!
//! let mut model = Model::new();
//! let address = model.add_complex_type("Sales", "Address");
//! model.add_structural_property(address, "City", TypeReference::string(true)).unwrap();
//!
//! let document = write_edmx(&model, &CsdlWriterSettings::default()).unwrap();
//! let parsed = parse_edmx(&document.text).unwrap();
//! assert!(parsed.is_success());
//! assert!(parsed.model.find_type("Sales.Address").is_some());
//! ```

pub mod edmx;
pub mod element;
pub mod error;
pub mod reader;
pub mod settings;
pub mod writer;
pub mod xml;

pub use edmx::{EdmxContent, EdmxDocument, edmx_element, parse_edmx, read_edmx, write_edmx};
pub use element::{XmlAttribute, XmlElement};
pub use error::CsdlError;
pub use reader::{CsdlReader, ParsedModel, try_parse, try_parse_with_references};
pub use settings::CsdlWriterSettings;
pub use writer::{CsdlWriter, SerializedModel, serialize};
