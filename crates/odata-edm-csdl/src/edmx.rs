//! Edmx envelope around CSDL schemas
//!
//! ```xml
//! <edmx:Edmx Version="4.0" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
//!   <edmx:DataServices>
//!     <Schema Namespace="..." xmlns="http://docs.oasis-open.org/odata/ns/edm">...</Schema>
//!   </edmx:DataServices>
//! </edmx:Edmx>
//! ```

use crate::element::XmlElement;
use crate::error::CsdlError;
use crate::reader::{CsdlReader, ParsedModel};
use crate::settings::CsdlWriterSettings;
use crate::writer::serialize;
use crate::xml::{parse_document, write_document};
use log::debug;
use odata_edm_diagnostics::{EdmError, EdmErrorCode};
use odata_edm_model::{CSDL_NAMESPACE, EDMX_NAMESPACE, EdmVersion, Model};

/// Text of a written document plus serialization errors
#[derive(Debug, Clone)]
pub struct EdmxDocument {
    pub text: String,
    pub errors: Vec<EdmError>,
}

/// Schemas found in one document, before they are read into a model
#[derive(Debug, Clone, Default)]
pub struct EdmxContent {
    /// `Version` of an Edmx root; bare `Schema` documents have none
    pub version: Option<EdmVersion>,
    pub schemas: Vec<XmlElement>,
    pub errors: Vec<EdmError>,
}

impl EdmxContent {
    /// Append another document's schemas
    ///
    /// The first version seen wins.
    pub fn merge(&mut self, other: EdmxContent) {
        self.version = self.version.or(other.version);
        self.schemas.extend(other.schemas);
        self.errors.extend(other.errors);
    }

    /// Read the collected schemas into a model
    pub fn into_model(self) -> ParsedModel {
        let mut model = Model::new();
        if let Some(version) = self.version {
            model.set_version(version);
        }
        let mut parsed = CsdlReader::with_model(model).read(&self.schemas, &[]);
        let mut errors = self.errors;
        errors.append(&mut parsed.errors);
        parsed.errors = errors;
        parsed
    }
}

/// Wrap a model's schemas in an `edmx:Edmx` element
pub fn edmx_element(model: &Model, settings: &CsdlWriterSettings) -> (XmlElement, Vec<EdmError>) {
    let version = settings.version.unwrap_or(model.version());
    let serialized = serialize(model);
    let mut data_services = XmlElement::new("DataServices").in_namespace(version.edmx_namespace());
    data_services.children = serialized.schemas;
    let root = XmlElement::new("Edmx")
        .in_namespace(version.edmx_namespace())
        .with_attr("Version", version.as_str())
        .with_child(data_services);
    (root, serialized.errors)
}

/// Write a model as an Edmx document
///
/// Serialization errors do not fail the call; a model with a base-type
/// cycle produces an envelope without schemas.
pub fn write_edmx(model: &Model, settings: &CsdlWriterSettings) -> Result<EdmxDocument, CsdlError> {
    let (root, errors) = edmx_element(model, settings);
    let text = write_document(&root, settings)?;
    debug!("Wrote Edmx document: {} bytes, {} error(s)", text.len(), errors.len());
    Ok(EdmxDocument { text, errors })
}

/// Collect the schemas of an Edmx or bare `Schema` document
pub fn read_edmx(text: &str) -> Result<EdmxContent, CsdlError> {
    let root = parse_document(text)?;
    let mut content = EdmxContent::default();

    match (root.namespace.as_deref(), root.name.as_str()) {
        (Some(EDMX_NAMESPACE), "Edmx") => {
            match root.attr("Version") {
                Some(text) => match text.parse::<EdmVersion>() {
                    Ok(version) => content.version = Some(version),
                    Err(err) => content.errors.push(
                        EdmError::new(EdmErrorCode::InvalidVersionNumber, err.to_string())
                            .with_location(root.edm_location()),
                    ),
                },
                None => content.errors.push(
                    EdmError::new(EdmErrorCode::MissingAttribute, "'Edmx' element requires a 'Version' attribute")
                        .with_location(root.edm_location()),
                ),
            }
            for child in root.children {
                match (child.namespace.as_deref(), child.name.as_str()) {
                    (Some(EDMX_NAMESPACE), "DataServices") => {
                        content.schemas.extend(child.children.into_iter().filter(|s| s.name == "Schema"));
                    }
                    // External documents are resolved by the caller
                    (Some(EDMX_NAMESPACE), "Reference") => {}
                    _ => content.errors.push(
                        EdmError::new(
                            EdmErrorCode::UnexpectedXmlElement,
                            format!("Unexpected '{}' element in 'Edmx'", child.name),
                        )
                        .with_location(child.edm_location()),
                    ),
                }
            }
        }
        (Some(CSDL_NAMESPACE) | None, "Schema") => content.schemas.push(root),
        _ => return Err(CsdlError::UnexpectedRoot(root.name)),
    }
    Ok(content)
}

/// Parse an Edmx or bare `Schema` document into a model
pub fn parse_edmx(text: &str) -> Result<ParsedModel, CsdlError> {
    Ok(read_edmx(text)?.into_model())
}
