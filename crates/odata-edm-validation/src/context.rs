//! Shared state for one validation run

use log::trace;
use odata_edm_diagnostics::{EdmError, EdmErrorCode, EdmLocation};
use odata_edm_model::{AnnotationTarget, Model, PropertyId, SchemaElement, TypeId};
use std::collections::HashMap;

pub(crate) struct ValidationContext<'m> {
    pub(crate) model: &'m Model,
    errors: Vec<EdmError>,
    by_name: HashMap<String, Vec<SchemaElement>>,
}

impl<'m> ValidationContext<'m> {
    pub(crate) fn new(model: &'m Model) -> Self {
        let mut by_name: HashMap<String, Vec<SchemaElement>> = HashMap::new();
        for element in model.schema_elements() {
            by_name
                .entry(model.element_qualified_name(element))
                .or_default()
                .push(element);
        }
        Self {
            model,
            errors: Vec::new(),
            by_name,
        }
    }

    pub(crate) fn report(&mut self, code: EdmErrorCode, message: impl Into<String>, location: EdmLocation) {
        let error = EdmError::new(code, message).with_location(location);
        trace!("{}", error);
        self.errors.push(error);
    }

    /// Elements sharing the qualified name of `element`, in model order
    pub(crate) fn same_name(&self, element: SchemaElement) -> &[SchemaElement] {
        self.by_name
            .get(&self.model.element_qualified_name(element))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub(crate) fn type_location(&self, id: TypeId) -> EdmLocation {
        self.model.location_of(&AnnotationTarget::Type(id))
    }

    pub(crate) fn property_location(&self, id: PropertyId) -> EdmLocation {
        self.model.location_of(&AnnotationTarget::Property(id))
    }

    pub(crate) fn type_name(&self, id: TypeId) -> String {
        self.model.schema_type(id).qualified_name()
    }

    pub(crate) fn into_errors(self) -> Vec<EdmError> {
        self.errors
    }
}
