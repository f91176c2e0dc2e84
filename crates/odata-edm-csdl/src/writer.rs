//! Model to CSDL element trees
//!
//! One `Schema` element is produced per namespace, in the order namespaces
//! are first seen among the model's top-level elements. Annotations marked
//! inline are written inside their target when the target is written;
//! everything else goes into `Annotations` blocks keyed by target path.

use crate::element::{XmlAttribute, XmlElement};
use indexmap::IndexMap;
use log::{debug, warn};
use odata_edm_diagnostics::{EdmError, EdmErrorCode};
use odata_edm_model::literal::format_constant;
use odata_edm_model::names::split_qualified_name;
use odata_edm_model::{
    AnnotationPlacement, AnnotationTarget, CSDL_NAMESPACE, ContainerElementKind, ContainerId,
    EnumMemberRef, Expression, ExpressionKind, Facets, MaxLength, Model, OperationId, OperationKind,
    OperationRef, PrimitiveKind, PropertyId, PropertyKind, Scale, SchemaElement, SchemaTypeKind, Srid, TermId,
    TermRef, TypeId, TypeReference, VocabularyAnnotation,
};
use std::collections::{HashMap, HashSet};

/// Schemas produced from a model plus serialization errors
#[derive(Debug, Clone, Default)]
pub struct SerializedModel {
    pub schemas: Vec<XmlElement>,
    pub errors: Vec<EdmError>,
}

impl SerializedModel {
    /// Check if the model was written without errors
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Serialize a model into one `Schema` element per namespace
pub fn serialize(model: &Model) -> SerializedModel {
    CsdlWriter::new(model).serialize()
}

/// Writes a model as CSDL element trees
///
/// The model does not have to be valid. The only refusal is a base-type
/// cycle, which has no finite CSDL rendering that reads back the same way.
pub struct CsdlWriter<'m> {
    model: &'m Model,
    inline: HashMap<&'m AnnotationTarget, Vec<&'m VocabularyAnnotation>>,
    decorated: HashSet<AnnotationTarget>,
}

impl<'m> CsdlWriter<'m> {
    pub fn new(model: &'m Model) -> Self {
        let mut inline: HashMap<&AnnotationTarget, Vec<&VocabularyAnnotation>> = HashMap::new();
        for annotation in model.vocabulary_annotations() {
            if annotation.placement == AnnotationPlacement::Inline {
                inline.entry(&annotation.target).or_default().push(annotation);
            }
        }
        Self {
            model,
            inline,
            decorated: HashSet::new(),
        }
    }

    pub fn serialize(mut self) -> SerializedModel {
        let errors = self.cycle_errors();
        if !errors.is_empty() {
            debug!(
                "Refusing to serialize model: {} type(s) in base type cycles",
                errors.len()
            );
            return SerializedModel {
                schemas: Vec::new(),
                errors,
            };
        }

        let model = self.model;
        let mut schemas: IndexMap<String, XmlElement> = IndexMap::new();
        for element in model.schema_elements() {
            let namespace = model.element_namespace(element).to_string();
            let written = self.write_element(element);
            self.schema_entry(&mut schemas, &namespace).children.push(written);
        }

        let mut blocks: IndexMap<(String, String), Vec<XmlElement>> = IndexMap::new();
        for annotation in self.model.vocabulary_annotations() {
            if annotation.placement == AnnotationPlacement::Inline
                && self.decorated.contains(&annotation.target)
            {
                continue;
            }
            let host = annotation
                .hosting_namespace
                .clone()
                .unwrap_or_else(|| default_host_namespace(self.model, annotation));
            let target = self.model.target_path(&annotation.target);
            blocks
                .entry((host, target))
                .or_default()
                .push(self.annotation_element(annotation));
        }
        let block_count = blocks.len();
        for ((host, target), annotations) in blocks {
            let mut block = csdl("Annotations").with_attr("Target", target);
            block.children = annotations;
            self.schema_entry(&mut schemas, &host).children.push(block);
        }

        debug!(
            "Serialized {} element(s) into {} schema(s) with {} out-of-line annotation block(s)",
            self.model.schema_elements().len(),
            schemas.len(),
            block_count
        );
        SerializedModel {
            schemas: schemas.into_values().collect(),
            errors: Vec::new(),
        }
    }

    fn cycle_errors(&self) -> Vec<EdmError> {
        self.model
            .types()
            .filter(|id| self.model.is_in_cycle(*id))
            .map(|id| {
                let target = AnnotationTarget::Type(id);
                EdmError::new(
                    EdmErrorCode::InterfaceCriticalCycleInTypeHierarchy,
                    format!(
                        "Cannot serialize '{}': its base type hierarchy is cyclic",
                        self.model.schema_type(id).qualified_name()
                    ),
                )
                .with_location(self.model.location_of(&target))
            })
            .collect()
    }

    fn schema_entry<'s>(
        &self,
        schemas: &'s mut IndexMap<String, XmlElement>,
        namespace: &str,
    ) -> &'s mut XmlElement {
        schemas.entry(namespace.to_string()).or_insert_with(|| {
            csdl("Schema")
                .with_attr("Namespace", namespace)
                .with_optional_attr("Alias", self.model.namespace_alias(namespace))
        })
    }

    /// Attach direct values and inline annotations of `target`
    fn decorate(&mut self, element: &mut XmlElement, target: AnnotationTarget) {
        for direct in self.model.direct_value_annotations(&target) {
            // Unqualified attributes belong to CSDL itself
            if direct.namespace.is_empty() {
                continue;
            }
            if let Some(value) = direct.value::<String>() {
                element.attributes.push(XmlAttribute::qualified(
                    direct.namespace,
                    direct.name,
                    value.as_str(),
                ));
            }
        }
        if let Some(annotations) = self.inline.get(&target) {
            for annotation in annotations {
                element.children.push(self.annotation_element(annotation));
            }
        }
        self.decorated.insert(target);
    }

    fn write_element(&mut self, element: SchemaElement) -> XmlElement {
        match element {
            SchemaElement::Type(id) => self.write_type(id),
            SchemaElement::Operation(id) => self.write_operation(id),
            SchemaElement::Term(id) => self.write_term(id),
            SchemaElement::Container(id) => self.write_container(id),
        }
    }

    fn write_type(&mut self, id: TypeId) -> XmlElement {
        let model = self.model;
        let ty = model.schema_type(id);
        let mut element = csdl(ty.kind_name()).with_attr("Name", ty.name.as_str());

        match &ty.kind {
            SchemaTypeKind::Entity(structured) | SchemaTypeKind::Complex(structured) => {
                if let Some(base) = structured.base_type {
                    element = element.with_attr("BaseType", model.schema_type(base).qualified_name());
                }
                if structured.is_abstract {
                    element = element.with_attr("Abstract", "true");
                }
                if structured.is_open {
                    element = element.with_attr("OpenType", "true");
                }
                if structured.has_stream {
                    element = element.with_attr("HasStream", "true");
                }
                if !structured.declared_key().is_empty() {
                    let mut key = csdl("Key");
                    for property in structured.declared_key() {
                        key.children.push(
                            csdl("PropertyRef").with_attr("Name", model.property(*property).name.as_str()),
                        );
                    }
                    element.children.push(key);
                }
                for property in structured.declared_properties() {
                    let written = self.write_property(*property);
                    element.children.push(written);
                }
            }
            SchemaTypeKind::Enum(enum_type) => {
                if enum_type.underlying_type != PrimitiveKind::Int32 {
                    element = element.with_attr("UnderlyingType", enum_type.underlying_type.qualified_name());
                }
                if enum_type.is_flags {
                    element = element.with_attr("IsFlags", "true");
                }
                for member in enum_type.members_by_name() {
                    let mut written = csdl("Member")
                        .with_attr("Name", member.name.as_str())
                        .with_attr("Value", member.value.to_string());
                    self.decorate(
                        &mut written,
                        AnnotationTarget::EnumMember {
                            enum_type: id,
                            member: member.name.clone(),
                        },
                    );
                    element.children.push(written);
                }
            }
        }

        self.decorate(&mut element, AnnotationTarget::Type(id));
        element
    }

    fn write_property(&mut self, id: PropertyId) -> XmlElement {
        let model = self.model;
        let property = model.property(id);
        let mut element = match &property.kind {
            PropertyKind::Structural(structural) => {
                let mut element = csdl("Property").with_attr("Name", property.name.as_str());
                self.type_attributes(&mut element, &structural.type_ref);
                element.with_optional_attr("DefaultValue", structural.default_value.as_deref())
            }
            PropertyKind::Navigation(nav) => {
                let mut element = csdl("NavigationProperty")
                    .with_attr("Name", property.name.as_str())
                    .with_attr("Type", model.type_reference_name(&nav.target));
                if !nav.target.is_collection() && !nav.target.nullable {
                    element = element.with_attr("Nullable", "false");
                }
                if let Some(partner) = nav.partner {
                    element = element.with_attr("Partner", model.property(partner).name.as_str());
                }
                if nav.contains_target {
                    element = element.with_attr("ContainsTarget", "true");
                }
                if nav.dependent_properties.len() != nav.principal_properties.len() {
                    warn!(
                        "Navigation property '{}' pairs {} dependent with {} principal properties; writing {} constraint(s)",
                        property.name,
                        nav.dependent_properties.len(),
                        nav.principal_properties.len(),
                        nav.dependent_properties.len().min(nav.principal_properties.len())
                    );
                }
                for (dependent, principal) in nav
                    .dependent_properties
                    .iter()
                    .zip(nav.principal_properties.iter())
                {
                    element.children.push(
                        csdl("ReferentialConstraint")
                            .with_attr("Property", model.property(*dependent).name.as_str())
                            .with_attr("ReferencedProperty", model.property(*principal).name.as_str()),
                    );
                }
                if let Some(action) = nav.on_delete {
                    element
                        .children
                        .push(csdl("OnDelete").with_attr("Action", action.as_str()));
                }
                element
            }
        };
        self.decorate(&mut element, AnnotationTarget::Property(id));
        element
    }

    fn write_operation(&mut self, id: OperationId) -> XmlElement {
        let model = self.model;
        let operation = model.operation(id);
        let mut element = csdl(operation.kind_name()).with_attr("Name", operation.name.as_str());
        if operation.is_bound {
            element = element.with_attr("IsBound", "true");
        }
        if let OperationKind::Function { is_composable: true } = operation.kind {
            element = element.with_attr("IsComposable", "true");
        }
        element = element.with_optional_attr("EntitySetPath", operation.entity_set_path.as_deref());

        for parameter in operation.parameters() {
            let mut written = csdl("Parameter").with_attr("Name", parameter.name.as_str());
            self.type_attributes(&mut written, &parameter.type_ref);
            self.decorate(
                &mut written,
                AnnotationTarget::Parameter {
                    operation: id,
                    parameter: parameter.name.clone(),
                },
            );
            element.children.push(written);
        }
        if let Some(return_type) = &operation.return_type {
            let mut written = csdl("ReturnType");
            self.type_attributes(&mut written, return_type);
            self.decorate(&mut written, AnnotationTarget::ReturnType(id));
            element.children.push(written);
        }

        self.decorate(&mut element, AnnotationTarget::Operation(id));
        element
    }

    fn write_term(&mut self, id: TermId) -> XmlElement {
        let model = self.model;
        let term = model.term(id);
        let mut element = csdl("Term").with_attr("Name", term.name.as_str());
        self.type_attributes(&mut element, &term.type_ref);
        element = element
            .with_optional_attr("DefaultValue", term.default_value.as_deref())
            .with_optional_attr("AppliesTo", term.applies_to.as_deref());
        self.decorate(&mut element, AnnotationTarget::Term(id));
        element
    }

    fn write_container(&mut self, id: ContainerId) -> XmlElement {
        let model = self.model;
        let container = model.container(id);
        let mut element = csdl("EntityContainer").with_attr("Name", container.name.as_str());

        for entry in container.elements() {
            let mut written = csdl(entry.kind_name()).with_attr("Name", entry.name.as_str());
            match &entry.kind {
                ContainerElementKind::EntitySet(set) => {
                    written = written.with_attr("EntityType", model.type_reference_name(&set.entity_type));
                    if !set.include_in_service_document {
                        written = written.with_attr("IncludeInServiceDocument", "false");
                    }
                }
                ContainerElementKind::Singleton(singleton) => {
                    written = written.with_attr("Type", model.type_reference_name(&singleton.entity_type));
                }
                ContainerElementKind::ActionImport(import) => {
                    written = written
                        .with_attr("Action", self.operation_ref_name(&import.operation))
                        .with_optional_attr("EntitySet", import.entity_set.as_deref());
                }
                ContainerElementKind::FunctionImport(import) => {
                    written = written
                        .with_attr("Function", self.operation_ref_name(&import.operation))
                        .with_optional_attr("EntitySet", import.entity_set.as_deref());
                    if import.include_in_service_document {
                        written = written.with_attr("IncludeInServiceDocument", "true");
                    }
                }
            }
            for binding in entry.bindings() {
                written.children.push(
                    csdl("NavigationPropertyBinding")
                        .with_attr("Path", binding.path.as_str())
                        .with_attr("Target", binding.target.as_str()),
                );
            }
            self.decorate(
                &mut written,
                AnnotationTarget::ContainerElement {
                    container: id,
                    element: entry.name.clone(),
                },
            );
            element.children.push(written);
        }

        self.decorate(&mut element, AnnotationTarget::Container(id));
        element
    }

    /// `Type`, `Nullable` and facet attributes of a type reference
    fn type_attributes(&self, element: &mut XmlElement, type_ref: &TypeReference) {
        element
            .attributes
            .push(XmlAttribute::new("Type", self.model.type_reference_name(type_ref)));
        let inner = type_ref.element_or_self();
        if !inner.nullable {
            element.attributes.push(XmlAttribute::new("Nullable", "false"));
        }
        facet_attributes(element, &inner.facets);
    }

    fn operation_ref_name(&self, operation: &OperationRef) -> String {
        match operation {
            OperationRef::Resolved(id) => self.model.operation(*id).qualified_name(),
            OperationRef::Unresolved(name) => name.clone(),
        }
    }

    fn annotation_element(&self, annotation: &VocabularyAnnotation) -> XmlElement {
        let term = match &annotation.term {
            TermRef::Resolved(id) => self.model.term(*id).qualified_name(),
            TermRef::Unresolved(name) => name.clone(),
        };
        let mut element = csdl("Annotation")
            .with_attr("Term", term)
            .with_optional_attr("Qualifier", annotation.qualifier.as_deref());
        self.attach_expression(&mut element, &annotation.expression);
        element
    }

    /// Write `expression` as a shorthand attribute if it has one, else as a child
    fn attach_expression(&self, element: &mut XmlElement, expression: &Expression) {
        match self.shorthand(expression) {
            Some((name, value)) => element.attributes.push(XmlAttribute::new(name, value)),
            None => element.children.push(self.expression_element(expression)),
        }
    }

    fn shorthand(&self, expression: &Expression) -> Option<(&'static str, String)> {
        match &expression.kind {
            ExpressionKind::Constant(constant) => {
                Some((constant.kind().element_name(), format_constant(constant)))
            }
            ExpressionKind::Malformed { kind, text } => Some((kind.element_name(), text.clone())),
            ExpressionKind::Path(segments) => Some(("Path", segments.join("/"))),
            ExpressionKind::EnumMember(members) => Some(("EnumMember", self.enum_members_text(members))),
            _ => None,
        }
    }

    fn enum_members_text(&self, members: &[EnumMemberRef]) -> String {
        members
            .iter()
            .map(|m| format!("{}/{}", self.model.type_definition_name(&m.enum_type), m.member))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn expression_element(&self, expression: &Expression) -> XmlElement {
        let element = csdl(expression.element_name());
        match &expression.kind {
            ExpressionKind::Null => element,
            ExpressionKind::Constant(constant) => element.with_text(format_constant(constant)),
            ExpressionKind::Malformed { text, .. } => element.with_text(text.as_str()),
            ExpressionKind::Path(segments) => element.with_text(segments.join("/")),
            ExpressionKind::Apply { function, arguments } => {
                let mut element = element.with_attr("Function", self.operation_ref_name(function));
                for argument in arguments {
                    element.children.push(self.expression_element(argument));
                }
                element
            }
            ExpressionKind::If {
                condition,
                then_branch,
                else_branch,
            } => element
                .with_child(self.expression_element(condition))
                .with_child(self.expression_element(then_branch))
                .with_child(self.expression_element(else_branch)),
            ExpressionKind::IsOf { operand, type_ref } | ExpressionKind::Cast { operand, type_ref } => {
                let mut element = element;
                self.type_attributes(&mut element, type_ref);
                element.with_child(self.expression_element(operand))
            }
            ExpressionKind::Record { type_ref, properties } => {
                let mut element = element.with_optional_attr(
                    "Type",
                    type_ref.as_ref().map(|t| self.model.type_reference_name(t)),
                );
                for property in properties {
                    let mut value = csdl("PropertyValue").with_attr("Property", property.name.as_str());
                    self.attach_expression(&mut value, &property.value);
                    element.children.push(value);
                }
                element
            }
            // The optional element type has no CSDL attribute
            ExpressionKind::Collection { elements, .. } => {
                let mut element = element;
                for item in elements {
                    element.children.push(self.expression_element(item));
                }
                element
            }
            ExpressionKind::LabeledElement { name, operand } => element
                .with_attr("Name", name.as_str())
                .with_child(self.expression_element(operand)),
            ExpressionKind::LabeledElementReference(name) => element.with_text(name.as_str()),
            ExpressionKind::EnumMember(members) => element.with_text(self.enum_members_text(members)),
        }
    }
}

/// Namespace an out-of-line annotation is written to without an override
///
/// The namespace of the annotated element, else the namespace of the term.
pub(crate) fn default_host_namespace(model: &Model, annotation: &VocabularyAnnotation) -> String {
    let target_namespace = match &annotation.target {
        AnnotationTarget::Unresolved(path) => {
            let head = path.split('/').next().unwrap_or(path);
            let head = head.split('(').next().unwrap_or(head);
            Some(split_qualified_name(head).0.to_string())
        }
        target => model
            .target_element(target)
            .map(|element| model.element_namespace(element).to_string()),
    };
    match target_namespace.filter(|ns| !ns.is_empty()) {
        Some(namespace) => namespace,
        None => match &annotation.term {
            TermRef::Resolved(id) => model.term(*id).namespace.clone(),
            TermRef::Unresolved(name) => split_qualified_name(name).0.to_string(),
        },
    }
}

/// Element in the CSDL namespace
pub(crate) fn csdl(name: &str) -> XmlElement {
    XmlElement::new(name).in_namespace(CSDL_NAMESPACE)
}

fn facet_attributes(element: &mut XmlElement, facets: &Facets) {
    if let Some(max_length) = facets.max_length {
        let value = match max_length {
            MaxLength::Bounded(n) => n.to_string(),
            MaxLength::Max => "max".to_string(),
        };
        element.attributes.push(XmlAttribute::new("MaxLength", value));
    }
    if let Some(precision) = facets.precision {
        element
            .attributes
            .push(XmlAttribute::new("Precision", precision.to_string()));
    }
    if let Some(scale) = facets.scale {
        let value = match scale {
            Scale::Fixed(n) => n.to_string(),
            Scale::Variable => "variable".to_string(),
        };
        element.attributes.push(XmlAttribute::new("Scale", value));
    }
    if let Some(srid) = facets.srid {
        let value = match srid {
            Srid::Value(n) => n.to_string(),
            Srid::Variable => "variable".to_string(),
        };
        element.attributes.push(XmlAttribute::new("SRID", value));
    }
    if let Some(unicode) = facets.unicode {
        element
            .attributes
            .push(XmlAttribute::new("Unicode", unicode.to_string()));
    }
}
