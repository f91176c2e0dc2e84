//! CSDL element trees to a model
//!
//! Reading is tolerant: schema problems become located [`EdmError`]s and
//! the offending element is skipped or kept in a degraded form, so a model
//! is always produced. Names are resolved only after every schema has been
//! declared, which makes forward references and cross-schema references
//! work regardless of document order.

use crate::element::XmlElement;
use crate::writer::default_host_namespace;
use log::{debug, trace};
use odata_edm_diagnostics::{EdmError, EdmErrorCode};
use odata_edm_model::literal::literal_expression;
use odata_edm_model::{
    AnnotationPlacement, AnnotationTarget, CSDL_NAMESPACE, ConstantKind, ContainerElementKind,
    ContainerId, EnumMemberRef, Expression, Facets, MaxLength, Model, OnDeleteAction, OperationId,
    OperationRef, PrimitiveKind, PropertyConstructor, PropertyId, Scale, SchemaElement, Srid, TermId,
    TermRef, TypeDefinition, TypeId, TypeReference, VocabularyAnnotation,
};
use std::str::FromStr;

/// Outcome of reading CSDL: always a model, plus any recoverable errors
#[derive(Debug, Default)]
pub struct ParsedModel {
    pub model: Model,
    pub errors: Vec<EdmError>,
}

impl ParsedModel {
    /// Check if the documents were read without errors
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Read `Schema` elements into a new model
pub fn try_parse(schemas: &[XmlElement]) -> ParsedModel {
    CsdlReader::new().read(schemas, &[])
}

/// Read `Schema` elements, resolving names against referenced schemas too
///
/// Elements of `references` are registered as referenced: they take part in
/// lookups but are not serialized or validated, and their annotations are
/// not read.
pub fn try_parse_with_references(schemas: &[XmlElement], references: &[XmlElement]) -> ParsedModel {
    CsdlReader::new().read(schemas, references)
}

#[derive(Debug, Clone, Copy)]
enum Declared {
    Type(TypeId),
    Operation(OperationId),
    Term(TermId),
    Container(ContainerId),
}

struct Declaration<'a> {
    declared: Declared,
    element: &'a XmlElement,
    referenced: bool,
}

struct SchemaScope<'a> {
    namespace: String,
    element: &'a XmlElement,
    referenced: bool,
}

/// Multi-pass CSDL reader
pub struct CsdlReader<'a> {
    model: Model,
    errors: Vec<EdmError>,
    schemas: Vec<SchemaScope<'a>>,
    declarations: Vec<Declaration<'a>>,
    navigations: Vec<(PropertyId, &'a XmlElement)>,
    /// Targets whose elements may carry inline annotations, in reading order
    annotatable: Vec<(AnnotationTarget, &'a XmlElement)>,
}

impl Default for CsdlReader<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CsdlReader<'a> {
    pub fn new() -> Self {
        Self {
            model: Model::new(),
            errors: Vec::new(),
            schemas: Vec::new(),
            declarations: Vec::new(),
            navigations: Vec::new(),
            annotatable: Vec::new(),
        }
    }

    /// Read into an existing model, e.g. one with a version already set
    pub fn with_model(model: Model) -> Self {
        Self {
            model,
            ..Self::new()
        }
    }

    pub fn read(mut self, schemas: &'a [XmlElement], references: &'a [XmlElement]) -> ParsedModel {
        for schema in schemas {
            self.declare_schema(schema, false);
        }
        for schema in references {
            self.declare_schema(schema, true);
        }

        let declarations = std::mem::take(&mut self.declarations);
        for declaration in &declarations {
            match declaration.declared {
                Declared::Type(id) => self.read_type_body(id, declaration),
                Declared::Operation(id) => self.read_operation_body(id, declaration),
                Declared::Term(id) => self.read_term_body(id, declaration.element),
                Declared::Container(_) => {}
            }
        }
        for declaration in &declarations {
            if let Declared::Type(id) = declaration.declared {
                self.read_key(id, declaration.element);
            }
        }
        let navigations = std::mem::take(&mut self.navigations);
        for &(id, element) in &navigations {
            self.read_partner_and_constraints(id, element);
        }
        for declaration in &declarations {
            if let Declared::Container(id) = declaration.declared {
                self.read_container_body(id, declaration);
            }
        }

        let annotatable = std::mem::take(&mut self.annotatable);
        for (target, element) in annotatable.iter() {
            let element: &'a XmlElement = element;
            for child in csdl_children(element).filter(|c| c.name == "Annotation") {
                if let Some(annotation) = self.read_annotation(target.clone(), child) {
                    self.model.add_vocabulary_annotation(annotation.inline());
                }
            }
        }
        let schemas = std::mem::take(&mut self.schemas);
        for scope in schemas.iter().filter(|s| !s.referenced) {
            for block in csdl_children(scope.element).filter(|c| c.name == "Annotations") {
                self.read_annotations_block(&scope.namespace, block);
            }
        }

        debug!(
            "Read {} schema(s): {} element(s), {} annotation(s), {} error(s)",
            schemas.len(),
            self.model.schema_elements().len(),
            self.model.vocabulary_annotations().len(),
            self.errors.len()
        );
        ParsedModel {
            model: self.model,
            errors: self.errors,
        }
    }

    // ---------------------------------------------------------------------
    // Error helpers
    // ---------------------------------------------------------------------

    fn error(&mut self, code: EdmErrorCode, message: impl Into<String>, element: &XmlElement) {
        self.errors
            .push(EdmError::new(code, message).with_location(element.edm_location()));
    }

    fn required(&mut self, element: &'a XmlElement, name: &str) -> Option<&'a str> {
        let value = element.attr(name);
        if value.is_none() {
            self.error(
                EdmErrorCode::MissingAttribute,
                format!("'{}' element requires a '{}' attribute", element.name, name),
                element,
            );
        }
        value
    }

    fn bool_attr(&mut self, element: &XmlElement, name: &str) -> Option<bool> {
        match element.attr(name)? {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            other => {
                self.error(
                    EdmErrorCode::InvalidBoolean,
                    format!("'{}' is not a valid value for '{}'", other, name),
                    element,
                );
                None
            }
        }
    }

    fn unexpected(&mut self, element: &XmlElement, parent: &str) {
        self.error(
            EdmErrorCode::UnexpectedXmlElement,
            format!("Unexpected '{}' element in '{}'", element.name, parent),
            element,
        );
    }

    /// Record location and foreign attributes of a target
    fn attach(&mut self, target: AnnotationTarget, element: &'a XmlElement, referenced: bool) {
        if let Some(location) = element.location {
            self.model.set_location(&target, location);
        }
        for attribute in element.qualified_attributes() {
            if let Some(namespace) = &attribute.namespace {
                self.model.set_direct_value(
                    target.clone(),
                    namespace.as_str(),
                    attribute.name.as_str(),
                    attribute.value.clone(),
                );
            }
        }
        if !referenced {
            self.annotatable.push((target, element));
        }
    }

    // ---------------------------------------------------------------------
    // Declarations
    // ---------------------------------------------------------------------

    fn declare_schema(&mut self, schema: &'a XmlElement, referenced: bool) {
        if schema.name != "Schema" {
            self.unexpected(schema, "document");
            return;
        }
        let Some(namespace) = self.required(schema, "Namespace") else {
            return;
        };
        if let Some(alias) = schema.attr("Alias") {
            self.model.set_namespace_alias(namespace, alias);
        }
        trace!("Declaring schema '{}'", namespace);

        for child in csdl_children(schema) {
            let declared = match child.name.as_str() {
                "EntityType" | "ComplexType" | "EnumType" => {
                    self.declare_type(namespace, child).map(Declared::Type)
                }
                "Action" | "Function" => self.declare_operation(namespace, child).map(Declared::Operation),
                "Term" => self
                    .required(child, "Name")
                    .map(|name| Declared::Term(self.model.create_term(namespace, name, TypeReference::string(true)))),
                "EntityContainer" => self
                    .required(child, "Name")
                    .map(|name| Declared::Container(self.model.create_entity_container(namespace, name))),
                "Annotations" => None,
                _ => {
                    self.unexpected(child, "Schema");
                    None
                }
            };
            let Some(declared) = declared else {
                continue;
            };
            let element = match declared {
                Declared::Type(id) => SchemaElement::Type(id),
                Declared::Operation(id) => SchemaElement::Operation(id),
                Declared::Term(id) => SchemaElement::Term(id),
                Declared::Container(id) => SchemaElement::Container(id),
            };
            if referenced {
                self.model.add_referenced_element(element);
            } else {
                self.model.add_element(element);
            }
            self.attach(element.into(), child, referenced);
            self.declarations.push(Declaration {
                declared,
                element: child,
                referenced,
            });
        }

        self.schemas.push(SchemaScope {
            namespace: namespace.to_string(),
            element: schema,
            referenced,
        });
    }

    fn declare_type(&mut self, namespace: &str, element: &'a XmlElement) -> Option<TypeId> {
        let name = self.required(element, "Name")?;
        let id = match element.name.as_str() {
            "EntityType" => self.model.create_entity_type(namespace, name),
            "ComplexType" => self.model.create_complex_type(namespace, name),
            _ => {
                let underlying = match element.attr("UnderlyingType") {
                    None => PrimitiveKind::Int32,
                    Some(text) => match PrimitiveKind::from_qualified_name(text) {
                        Some(kind) => kind,
                        None => {
                            self.error(
                                EdmErrorCode::InvalidTypeName,
                                format!("'{}' is not a primitive type", text),
                                element,
                            );
                            PrimitiveKind::Int32
                        }
                    },
                };
                let is_flags = self.bool_attr(element, "IsFlags").unwrap_or(false);
                self.model.create_enum_type(namespace, name, underlying, is_flags)
            }
        };

        let is_abstract = self.bool_attr(element, "Abstract").unwrap_or(false);
        let is_open = self.bool_attr(element, "OpenType").unwrap_or(false);
        let has_stream = self.bool_attr(element, "HasStream").unwrap_or(false);
        if let Some(structured) = self.model.structured_type_mut(id) {
            structured.is_abstract = is_abstract;
            structured.is_open = is_open;
            structured.has_stream = has_stream;
        }
        Some(id)
    }

    fn declare_operation(&mut self, namespace: &str, element: &'a XmlElement) -> Option<OperationId> {
        let name = self.required(element, "Name")?;
        let is_bound = self.bool_attr(element, "IsBound").unwrap_or(false);
        let id = if element.name == "Action" {
            self.model.create_action(namespace, name, is_bound, None)
        } else {
            let is_composable = self.bool_attr(element, "IsComposable").unwrap_or(false);
            let id = self.model.create_function(
                namespace,
                name,
                is_bound,
                is_composable,
                TypeReference::string(true),
            );
            // Filled in from ReturnType once every type is declared
            self.model.operation_mut(id).return_type = None;
            id
        };
        self.model.operation_mut(id).entity_set_path = element.attr("EntitySetPath").map(str::to_string);
        Some(id)
    }

    // ---------------------------------------------------------------------
    // Types and properties
    // ---------------------------------------------------------------------

    fn read_type_body(&mut self, id: TypeId, declaration: &Declaration<'a>) {
        let element = declaration.element;
        let referenced = declaration.referenced;

        if let Some(base_name) = element.attr("BaseType") {
            match self.model.find_type(base_name) {
                Some(base) => {
                    if let Err(err) = self.model.set_base_type(id, Some(base)) {
                        self.error(EdmErrorCode::BaseTypeKindMismatch, err.to_string(), element);
                    }
                }
                None => self.error(
                    EdmErrorCode::BadUnresolvedType,
                    format!("Base type '{}' cannot be found", base_name),
                    element,
                ),
            }
        }

        let mut next_value = 0i64;
        for child in csdl_children(element) {
            match child.name.as_str() {
                "Property" => self.read_structural_property(id, child, referenced),
                "NavigationProperty" => self.read_navigation_property(id, child, referenced),
                "Member" => {
                    let Some(name) = self.required(child, "Name") else {
                        continue;
                    };
                    let value = match child.attr("Value") {
                        None => next_value,
                        Some(text) => match text.trim().parse::<i64>() {
                            Ok(value) => value,
                            Err(_) => {
                                self.error(
                                    EdmErrorCode::InvalidInteger,
                                    format!("Enum member value '{}' is not an integer", text),
                                    child,
                                );
                                next_value
                            }
                        },
                    };
                    next_value = value.saturating_add(1);
                    if let Err(err) = self.model.add_enum_member(id, name, value) {
                        self.error(EdmErrorCode::UnexpectedXmlElement, err.to_string(), child);
                        continue;
                    }
                    let target = AnnotationTarget::EnumMember {
                        enum_type: id,
                        member: name.to_string(),
                    };
                    self.attach(target, child, referenced);
                }
                "Key" | "Annotation" => {}
                _ => {
                    let parent = self.model.schema_type(id).kind_name();
                    self.unexpected(child, parent);
                }
            }
        }
    }

    fn read_structural_property(&mut self, owner: TypeId, element: &'a XmlElement, referenced: bool) {
        let Some(name) = self.required(element, "Name") else {
            return;
        };
        let Some(type_name) = element.attr("Type") else {
            self.error(
                EdmErrorCode::MissingType,
                format!("Property '{}' has no type", name),
                element,
            );
            return;
        };
        let type_ref = self.type_reference(element, type_name);
        let id = self.model.create_structural_property(name, type_ref);
        if let Some(structural) = self.model.property_mut(id).as_structural_mut() {
            structural.default_value = element.attr("DefaultValue").map(str::to_string);
        }
        self.declare_property(owner, id, element, referenced);
    }

    fn read_navigation_property(&mut self, owner: TypeId, element: &'a XmlElement, referenced: bool) {
        let Some(name) = self.required(element, "Name") else {
            return;
        };
        let Some(type_name) = element.attr("Type") else {
            self.error(
                EdmErrorCode::MissingType,
                format!("Navigation property '{}' has no type", name),
                element,
            );
            return;
        };
        let target = match collection_element(type_name) {
            Some(inner) => TypeReference::collection(TypeReference::new(self.model.resolve_type_name(inner), false)),
            None => {
                let nullable = self.bool_attr(element, "Nullable").unwrap_or(true);
                TypeReference::new(self.model.resolve_type_name(type_name), nullable)
            }
        };
        let contains_target = self.bool_attr(element, "ContainsTarget").unwrap_or(false);
        let on_delete = match element.child("OnDelete").map(|c| (c, c.attr("Action"))) {
            None => None,
            Some((child, None)) => {
                self.required(child, "Action");
                None
            }
            Some((child, Some(action))) => match OnDeleteAction::from_str(action) {
                Ok(action) => Some(action),
                Err(text) => {
                    self.error(
                        EdmErrorCode::InvalidOnDelete,
                        format!("'{}' is not a valid OnDelete action", text),
                        child,
                    );
                    None
                }
            },
        };

        let id = self.model.create_navigation_property(name, target);
        if let Some(nav) = self.model.property_mut(id).as_navigation_mut() {
            nav.contains_target = contains_target;
            nav.on_delete = on_delete;
        }
        self.declare_property(owner, id, element, referenced);
        self.navigations.push((id, element));
    }

    fn declare_property(&mut self, owner: TypeId, id: PropertyId, element: &'a XmlElement, referenced: bool) {
        if let Err(err) = self.model.add_property(owner, id) {
            self.error(EdmErrorCode::UnexpectedXmlElement, err.to_string(), element);
            return;
        }
        self.attach(AnnotationTarget::Property(id), element, referenced);
    }

    fn read_key(&mut self, id: TypeId, element: &'a XmlElement) {
        for key in csdl_children(element).filter(|c| c.name == "Key") {
            let mut properties = Vec::new();
            for reference in csdl_children(key) {
                if reference.name != "PropertyRef" {
                    self.unexpected(reference, "Key");
                    continue;
                }
                let Some(name) = self.required(reference, "Name") else {
                    continue;
                };
                match self.model.find_property(id, name) {
                    Some(property) => properties.push(property),
                    None => self.error(
                        EdmErrorCode::InvalidKey,
                        format!("Key property '{}' is not declared", name),
                        reference,
                    ),
                }
            }
            if let Err(err) = self.model.add_keys(id, &properties) {
                self.error(EdmErrorCode::InvalidKey, err.to_string(), key);
            }
        }
    }

    fn read_partner_and_constraints(&mut self, id: PropertyId, element: &'a XmlElement) {
        let target = self.model.to_entity_type(id);
        let declaring = self.model.property(id).declaring_type();

        if let Some(partner_name) = element.attr("Partner") {
            match target.and_then(|t| self.model.find_property(t, partner_name)) {
                Some(partner) => {
                    if let Err(err) = self.model.set_navigation_partner(id, Some(partner)) {
                        self.error(EdmErrorCode::NavigationPartnerMismatch, err.to_string(), element);
                    }
                }
                None => self.error(
                    EdmErrorCode::NavigationPartnerMismatch,
                    format!("Partner '{}' cannot be found on the target type", partner_name),
                    element,
                ),
            }
        }

        for constraint in csdl_children(element).filter(|c| c.name == "ReferentialConstraint") {
            let (Some(dependent), Some(principal)) = (
                self.required(constraint, "Property"),
                self.required(constraint, "ReferencedProperty"),
            ) else {
                continue;
            };
            let dependent_id = declaring.and_then(|t| self.model.find_property(t, dependent));
            let principal_id = target.and_then(|t| self.model.find_property(t, principal));
            match (dependent_id, principal_id) {
                (Some(dependent_id), Some(principal_id)) => {
                    if let Some(nav) = self.model.property_mut(id).as_navigation_mut() {
                        nav.dependent_properties.push(dependent_id);
                        nav.principal_properties.push(principal_id);
                    }
                }
                _ => self.error(
                    EdmErrorCode::ReferentialConstraintPropertyMismatch,
                    format!(
                        "Referential constraint '{}' -> '{}' names an unknown property",
                        dependent, principal
                    ),
                    constraint,
                ),
            }
        }
    }

    // ---------------------------------------------------------------------
    // Operations and terms
    // ---------------------------------------------------------------------

    fn read_operation_body(&mut self, id: OperationId, declaration: &Declaration<'a>) {
        let element = declaration.element;
        for child in csdl_children(element) {
            match child.name.as_str() {
                "Parameter" => {
                    let Some(name) = self.required(child, "Name") else {
                        continue;
                    };
                    let Some(type_name) = child.attr("Type") else {
                        self.error(
                            EdmErrorCode::MissingType,
                            format!("Parameter '{}' has no type", name),
                            child,
                        );
                        continue;
                    };
                    let type_ref = self.type_reference(child, type_name);
                    self.model.add_parameter(id, name, type_ref);
                    let target = AnnotationTarget::Parameter {
                        operation: id,
                        parameter: name.to_string(),
                    };
                    self.attach(target, child, declaration.referenced);
                }
                "ReturnType" => {
                    let Some(type_name) = child.attr("Type") else {
                        self.error(EdmErrorCode::MissingType, "Return type has no type", child);
                        continue;
                    };
                    let type_ref = self.type_reference(child, type_name);
                    self.model.operation_mut(id).return_type = Some(type_ref);
                    if !declaration.referenced {
                        self.annotatable.push((AnnotationTarget::ReturnType(id), child));
                    }
                }
                "Annotation" => {}
                _ => {
                    let parent = self.model.operation(id).kind_name();
                    self.unexpected(child, parent);
                }
            }
        }
    }

    fn read_term_body(&mut self, id: TermId, element: &'a XmlElement) {
        let type_ref = match element.attr("Type") {
            Some(type_name) => self.type_reference(element, type_name),
            None => {
                self.error(EdmErrorCode::MissingType, "Term has no type", element);
                TypeReference::unresolved("", true)
            }
        };
        let term = self.model.term_mut(id);
        term.type_ref = type_ref;
        term.applies_to = element.attr("AppliesTo").map(str::to_string);
        term.default_value = element.attr("DefaultValue").map(str::to_string);
    }

    // ---------------------------------------------------------------------
    // Containers
    // ---------------------------------------------------------------------

    fn read_container_body(&mut self, id: ContainerId, declaration: &Declaration<'a>) {
        for child in csdl_children(declaration.element) {
            let kind = match child.name.as_str() {
                "EntitySet" | "Singleton" => {
                    let attribute = if child.name == "EntitySet" { "EntityType" } else { "Type" };
                    let (Some(name), Some(type_name)) =
                        (self.required(child, "Name"), self.required(child, attribute))
                    else {
                        continue;
                    };
                    let entity_type = TypeReference::new(self.model.resolve_type_name(type_name), false);
                    if child.name == "EntitySet" {
                        let include = self.bool_attr(child, "IncludeInServiceDocument").unwrap_or(true);
                        self.model.add_entity_set(id, name, entity_type);
                        if let Some(ContainerElementKind::EntitySet(set)) =
                            self.model.container_element_mut(id, name).map(|e| &mut e.kind)
                        {
                            set.include_in_service_document = include;
                        }
                    } else {
                        self.model.add_singleton(id, name, entity_type);
                    }
                    self.read_bindings(id, name, child);
                    name
                }
                "ActionImport" => {
                    let (Some(name), Some(action)) = (self.required(child, "Name"), self.required(child, "Action"))
                    else {
                        continue;
                    };
                    let operation = self.operation_ref(action);
                    let entity_set = child.attr("EntitySet").map(str::to_string);
                    self.model.add_action_import(id, name, operation, entity_set);
                    name
                }
                "FunctionImport" => {
                    let (Some(name), Some(function)) =
                        (self.required(child, "Name"), self.required(child, "Function"))
                    else {
                        continue;
                    };
                    let operation = self.operation_ref(function);
                    let entity_set = child.attr("EntitySet").map(str::to_string);
                    let include = self.bool_attr(child, "IncludeInServiceDocument").unwrap_or(false);
                    self.model.add_function_import(id, name, operation, entity_set, include);
                    name
                }
                "Annotation" => continue,
                _ => {
                    self.unexpected(child, "EntityContainer");
                    continue;
                }
            };
            let target = AnnotationTarget::ContainerElement {
                container: id,
                element: kind.to_string(),
            };
            self.attach(target, child, declaration.referenced);
        }
    }

    fn read_bindings(&mut self, container: ContainerId, name: &str, element: &'a XmlElement) {
        let entity_type = self
            .model
            .container(container)
            .element(name)
            .and_then(|e| e.entity_type())
            .and_then(TypeReference::as_schema_type);
        for binding in csdl_children(element).filter(|c| c.name == "NavigationPropertyBinding") {
            let (Some(path), Some(target)) = (self.required(binding, "Path"), self.required(binding, "Target")) else {
                continue;
            };
            let navigation = entity_type.and_then(|t| self.binding_navigation(t, path));
            if let Err(err) =
                self.model
                    .add_navigation_binding_with_path(container, name, navigation, path, target)
            {
                self.error(EdmErrorCode::InvalidNavigationBinding, err.to_string(), binding);
            }
        }
    }

    /// Navigation property a binding path ends in
    ///
    /// Segments may step through complex or contained properties and
    /// qualified type casts.
    fn binding_navigation(&self, entity_type: TypeId, path: &str) -> Option<PropertyId> {
        let mut current = entity_type;
        let mut segments = path.split('/').peekable();
        while let Some(segment) = segments.next() {
            if segment.contains('.') {
                current = self.model.find_type(segment)?;
                continue;
            }
            let property = self.model.find_property(current, segment)?;
            if segments.peek().is_none() {
                return self.model.property(property).is_navigation().then_some(property);
            }
            current = self.model.property(property).type_ref().element_or_self().as_schema_type()?;
        }
        None
    }

    fn operation_ref(&self, name: &str) -> OperationRef {
        match self.model.find_operations(name).first() {
            Some(id) => OperationRef::Resolved(*id),
            None => OperationRef::Unresolved(self.model.resolve_alias(name).into_owned()),
        }
    }

    // ---------------------------------------------------------------------
    // Type references
    // ---------------------------------------------------------------------

    /// Type reference from a `Type` value plus the element's nullability and facets
    ///
    /// For collections the facets and nullability describe the element type.
    fn type_reference(&mut self, element: &XmlElement, type_name: &str) -> TypeReference {
        let nullable = self.bool_attr(element, "Nullable").unwrap_or(true);
        let facets = self.facets(element);
        match collection_element(type_name) {
            Some(inner) => {
                let mut reference = TypeReference::new(self.model.resolve_type_name(inner), nullable);
                reference.facets = facets;
                TypeReference::collection(reference)
            }
            None => {
                let mut reference = TypeReference::new(self.model.resolve_type_name(type_name), nullable);
                reference.facets = facets;
                reference
            }
        }
    }

    fn facets(&mut self, element: &XmlElement) -> Facets {
        let mut facets = Facets::default();
        if let Some(text) = element.attr("MaxLength") {
            facets.max_length = if text.eq_ignore_ascii_case("max") {
                Some(MaxLength::Max)
            } else {
                match text.trim().parse() {
                    Ok(n) => Some(MaxLength::Bounded(n)),
                    Err(_) => {
                        self.error(
                            EdmErrorCode::InvalidMaxLength,
                            format!("'{}' is not a valid MaxLength", text),
                            element,
                        );
                        None
                    }
                }
            };
        }
        if let Some(text) = element.attr("Precision") {
            facets.precision = self.unsigned_facet(element, "Precision", text);
        }
        if let Some(text) = element.attr("Scale") {
            facets.scale = if text == "variable" || text == "floating" {
                Some(Scale::Variable)
            } else {
                self.unsigned_facet(element, "Scale", text).map(Scale::Fixed)
            };
        }
        if let Some(text) = element.attr("SRID") {
            facets.srid = if text.eq_ignore_ascii_case("variable") {
                Some(Srid::Variable)
            } else {
                match text.trim().parse() {
                    Ok(n) => Some(Srid::Value(n)),
                    Err(_) => {
                        self.error(
                            EdmErrorCode::InvalidSrid,
                            format!("'{}' is not a valid SRID", text),
                            element,
                        );
                        None
                    }
                }
            };
        }
        facets.unicode = self.bool_attr(element, "Unicode");
        facets
    }

    fn unsigned_facet(&mut self, element: &XmlElement, name: &str, text: &str) -> Option<u32> {
        match text.trim().parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.error(
                    EdmErrorCode::InvalidInteger,
                    format!("'{}' is not a valid {}", text, name),
                    element,
                );
                None
            }
        }
    }

    // ---------------------------------------------------------------------
    // Annotations
    // ---------------------------------------------------------------------

    fn read_annotations_block(&mut self, namespace: &str, block: &'a XmlElement) {
        let Some(path) = self.required(block, "Target") else {
            return;
        };
        let target = self.resolve_target(path);
        let block_qualifier = block.attr("Qualifier");
        for child in csdl_children(block) {
            if child.name != "Annotation" {
                self.unexpected(child, "Annotations");
                continue;
            }
            let Some(mut annotation) = self.read_annotation(target.clone(), child) else {
                continue;
            };
            if annotation.qualifier.is_none() {
                annotation.qualifier = block_qualifier.map(str::to_string);
            }
            if default_host_namespace(&self.model, &annotation) != namespace {
                annotation = annotation.hosted_in(namespace);
            }
            self.model.add_vocabulary_annotation(annotation);
        }
    }

    fn read_annotation(&mut self, target: AnnotationTarget, element: &'a XmlElement) -> Option<VocabularyAnnotation> {
        let term_name = self.required(element, "Term")?;
        let term = match self.model.find_term(term_name) {
            Some(id) => TermRef::Resolved(id),
            None => TermRef::Unresolved(self.model.resolve_alias(term_name).into_owned()),
        };
        let expression = match self.value_expression(element) {
            Some(expression) => expression,
            None => self.absent_value(&term),
        };
        let mut annotation = VocabularyAnnotation::new(target, term, expression);
        annotation.qualifier = element.attr("Qualifier").map(str::to_string);
        annotation.placement = AnnotationPlacement::OutOfLine;
        annotation.location = element.location;
        Some(annotation)
    }

    /// Value of an annotation without an expression
    ///
    /// Boolean terms default to true; others use the term's default value.
    fn absent_value(&self, term: &TermRef) -> Expression {
        let TermRef::Resolved(id) = term else {
            return Expression::null();
        };
        let term = self.model.term(*id);
        let kind = term.type_ref.as_primitive();
        match (&term.default_value, kind) {
            (Some(text), Some(kind)) => literal_expression(constant_kind_for(kind), text),
            (None, Some(PrimitiveKind::Boolean)) => Expression::bool(true),
            _ => Expression::null(),
        }
    }

    /// Shorthand attribute or single child expression of an element
    fn value_expression(&mut self, element: &'a XmlElement) -> Option<Expression> {
        if let Some(expression) = self.shorthand(element) {
            return Some(expression);
        }
        let child = csdl_children(element).find(|c| c.name != "Annotation")?;
        Some(self.expression(child))
    }

    fn shorthand(&mut self, element: &XmlElement) -> Option<Expression> {
        for attribute in element.attributes.iter().filter(|a| a.namespace.is_none()) {
            let expression = if let Some(kind) = ConstantKind::from_element_name(&attribute.name) {
                literal_expression(kind, &attribute.value)
            } else if attribute.name == "Path" {
                Expression::path(attribute.value.trim())
            } else if attribute.name == "EnumMember" {
                self.enum_members(&attribute.value)
            } else {
                continue;
            };
            return Some(located(expression, element));
        }
        None
    }

    fn operands(&mut self, element: &'a XmlElement) -> Vec<Expression> {
        csdl_children(element)
            .filter(|c| c.name != "Annotation")
            .collect::<Vec<_>>()
            .into_iter()
            .map(|child| self.expression(child))
            .collect()
    }

    fn expression(&mut self, element: &'a XmlElement) -> Expression {
        let name = element.name.as_str();
        let expression = if let Some(kind) = ConstantKind::from_element_name(name) {
            literal_expression(kind, element.text_or_empty())
        } else {
            match name {
                "Null" => Expression::null(),
                "Path" => Expression::path(element.text_or_empty().trim()),
                "Apply" => {
                    let function = match self.required(element, "Function") {
                        Some(function) => self.operation_ref(function),
                        None => OperationRef::Unresolved(String::new()),
                    };
                    let arguments = self.operands(element);
                    Expression::apply(function, arguments)
                }
                "If" => {
                    let operands = self.operands(element);
                    if operands.len() != 3 {
                        self.error(
                            EdmErrorCode::InvalidIfExpression,
                            format!("If expression has {} operands", operands.len()),
                            element,
                        );
                    }
                    let mut operands = operands.into_iter();
                    let condition = operands.next().unwrap_or_else(Expression::null);
                    let then_branch = operands.next().unwrap_or_else(Expression::null);
                    let else_branch = operands.next().unwrap_or_else(Expression::null);
                    Expression::if_else(condition, then_branch, else_branch)
                }
                "IsOf" | "Cast" => {
                    let type_ref = match element.attr("Type") {
                        Some(type_name) => self.type_reference(element, type_name),
                        None => {
                            self.error(
                                EdmErrorCode::MissingType,
                                format!("'{}' expression has no type", name),
                                element,
                            );
                            TypeReference::unresolved("", true)
                        }
                    };
                    let operands = self.operands(element);
                    if operands.len() != 1 {
                        self.error(
                            EdmErrorCode::InvalidCastExpression,
                            format!("'{}' expression has {} operands", name, operands.len()),
                            element,
                        );
                    }
                    let operand = operands.into_iter().next().unwrap_or_else(Expression::null);
                    if name == "IsOf" {
                        Expression::is_of(operand, type_ref)
                    } else {
                        Expression::cast(operand, type_ref)
                    }
                }
                "Record" => {
                    let type_ref = element
                        .attr("Type")
                        .map(|type_name| self.type_reference(element, type_name));
                    let mut properties = Vec::new();
                    for child in csdl_children(element).filter(|c| c.name != "Annotation") {
                        if child.name != "PropertyValue" {
                            self.unexpected(child, "Record");
                            continue;
                        }
                        let Some(property) = self.required(child, "Property") else {
                            continue;
                        };
                        let value = self.value_expression(child).unwrap_or_else(Expression::null);
                        let mut constructor = PropertyConstructor::new(property, value);
                        constructor.location = child.location;
                        properties.push(constructor);
                    }
                    Expression::record(type_ref, properties)
                }
                "Collection" => {
                    let elements = self.operands(element);
                    Expression::collection(None, elements)
                }
                "LabeledElement" => {
                    let label = self.required(element, "Name").unwrap_or_default();
                    let operand = match self.shorthand(element) {
                        Some(operand) => operand,
                        None => {
                            let operands = self.operands(element);
                            if operands.len() != 1 {
                                self.error(
                                    EdmErrorCode::InvalidLabeledElement,
                                    format!("Labeled element '{}' has {} operands", label, operands.len()),
                                    element,
                                );
                            }
                            operands.into_iter().next().unwrap_or_else(Expression::null)
                        }
                    };
                    Expression::labeled(label, operand)
                }
                "LabeledElementReference" => Expression::labeled_reference(element.text_or_empty().trim()),
                "EnumMember" => self.enum_members(element.text_or_empty()),
                _ => {
                    self.unexpected(element, "expression");
                    Expression::null()
                }
            }
        };
        located(expression, element)
    }

    fn enum_members(&self, text: &str) -> Expression {
        let members = text
            .split_whitespace()
            .map(|reference| {
                let (type_name, member) = reference.split_once('/').unwrap_or((reference, ""));
                let enum_type = match self.model.find_type(type_name) {
                    Some(id) => TypeDefinition::Schema(id),
                    None => TypeDefinition::Unresolved(self.model.resolve_alias(type_name).into_owned()),
                };
                EnumMemberRef {
                    enum_type,
                    member: member.to_string(),
                }
            })
            .collect();
        Expression::enum_member(members)
    }

    // ---------------------------------------------------------------------
    // Target paths
    // ---------------------------------------------------------------------

    /// Resolve a CSDL target path; unknown paths stay textual
    fn resolve_target(&self, path: &str) -> AnnotationTarget {
        self.try_resolve_target(path)
            .unwrap_or_else(|| AnnotationTarget::Unresolved(path.to_string()))
    }

    fn try_resolve_target(&self, path: &str) -> Option<AnnotationTarget> {
        let (head, rest) = split_target_path(path);

        if let Some((name, signature)) = head.split_once('(') {
            let signature = signature.strip_suffix(')')?;
            let operation = self.find_overload(name, signature)?;
            return self.operation_member(operation, rest);
        }

        if let Some(id) = self.model.find_type(head) {
            let Some(member) = rest else {
                return Some(AnnotationTarget::Type(id));
            };
            if let Some(enum_type) = self.model.schema_type(id).as_enum() {
                return enum_type.member(member).map(|m| AnnotationTarget::EnumMember {
                    enum_type: id,
                    member: m.name.clone(),
                });
            }
            return self.model.find_property(id, member).map(AnnotationTarget::Property);
        }
        if let Some(id) = self.model.find_term(head) {
            return rest.is_none().then_some(AnnotationTarget::Term(id));
        }
        if let Some(id) = self.model.find_entity_container(head) {
            return match rest {
                None => Some(AnnotationTarget::Container(id)),
                Some(element) => self.model.container(id).element(element).map(|e| {
                    AnnotationTarget::ContainerElement {
                        container: id,
                        element: e.name.clone(),
                    }
                }),
            };
        }
        let operation = self.model.find_operations(head).first().copied()?;
        self.operation_member(operation, rest)
    }

    fn operation_member(&self, operation: OperationId, rest: Option<&str>) -> Option<AnnotationTarget> {
        match rest {
            None => Some(AnnotationTarget::Operation(operation)),
            Some("$ReturnType") => self
                .model
                .operation(operation)
                .return_type
                .is_some()
                .then_some(AnnotationTarget::ReturnType(operation)),
            Some(parameter) => self
                .model
                .operation(operation)
                .parameter(parameter)
                .map(|p| AnnotationTarget::Parameter {
                    operation,
                    parameter: p.name.clone(),
                }),
        }
    }

    /// Overload whose signature lists `signature`'s parameter types
    fn find_overload(&self, name: &str, signature: &str) -> Option<OperationId> {
        let parameters: Vec<String> = signature
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| self.canonical_type_name(t))
            .collect();
        self.model.find_operations(name).into_iter().find(|id| {
            let expected = format!(
                "{}({})",
                self.model.operation(*id).qualified_name(),
                parameters.join(",")
            );
            self.model.operation_signature(*id) == expected
        })
    }

    fn canonical_type_name(&self, type_name: &str) -> String {
        match collection_element(type_name) {
            Some(inner) => format!("Collection({})", self.model.resolve_alias(inner)),
            None => self.model.resolve_alias(type_name).into_owned(),
        }
    }
}

/// Children in the CSDL namespace; unqualified children are accepted too
fn csdl_children(element: &XmlElement) -> impl Iterator<Item = &XmlElement> {
    element
        .children
        .iter()
        .filter(|c| matches!(c.namespace.as_deref(), None | Some(CSDL_NAMESPACE)))
}

fn collection_element(type_name: &str) -> Option<&str> {
    type_name
        .trim()
        .strip_prefix("Collection(")
        .and_then(|rest| rest.strip_suffix(')'))
        .map(str::trim)
}

/// Split a target path into its head and the remaining member path
///
/// A `/` inside an operation signature does not split.
fn split_target_path(path: &str) -> (&str, Option<&str>) {
    let search_from = path.find(')').unwrap_or(0);
    match path[search_from..].find('/') {
        Some(offset) => {
            let slash = search_from + offset;
            (&path[..slash], Some(&path[slash + 1..]))
        }
        None => (path, None),
    }
}

fn located(expression: Expression, element: &XmlElement) -> Expression {
    match element.location {
        Some(location) => expression.at(location),
        None => expression,
    }
}

/// Literal kind used for a term default of primitive type `kind`
fn constant_kind_for(kind: PrimitiveKind) -> ConstantKind {
    match kind {
        PrimitiveKind::Binary => ConstantKind::Binary,
        PrimitiveKind::Boolean => ConstantKind::Bool,
        PrimitiveKind::Date => ConstantKind::Date,
        PrimitiveKind::DateTimeOffset => ConstantKind::DateTimeOffset,
        PrimitiveKind::Decimal => ConstantKind::Decimal,
        PrimitiveKind::Duration => ConstantKind::Duration,
        PrimitiveKind::Double | PrimitiveKind::Single => ConstantKind::Float,
        PrimitiveKind::Guid => ConstantKind::Guid,
        PrimitiveKind::TimeOfDay => ConstantKind::TimeOfDay,
        kind if kind.is_integer() => ConstantKind::Int,
        _ => ConstantKind::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::csdl;
    use pretty_assertions::assert_eq;

    fn schema(namespace: &str) -> XmlElement {
        csdl("Schema").with_attr("Namespace", namespace)
    }

    fn keyed_entity(name: &str) -> XmlElement {
        csdl("EntityType")
            .with_attr("Name", name)
            .with_child(csdl("Key").with_child(csdl("PropertyRef").with_attr("Name", "Id")))
            .with_child(
                csdl("Property")
                    .with_attr("Name", "Id")
                    .with_attr("Type", "Edm.Int32")
                    .with_attr("Nullable", "false"),
            )
    }

    #[test]
    fn test_forward_base_type_reference() {
        let document = schema("NS")
            .with_child(csdl("EntityType").with_attr("Name", "Derived").with_attr("BaseType", "NS.Base"))
            .with_child(keyed_entity("Base"));

        let parsed = try_parse(&[document]);
        assert!(parsed.is_success(), "{:?}", parsed.errors);
        let derived = parsed.model.find_type("NS.Derived").unwrap();
        let base = parsed.model.find_type("NS.Base").unwrap();
        assert_eq!(parsed.model.base_type(derived), Some(base));
        assert_eq!(parsed.model.key(derived).len(), 1);
    }

    #[test]
    fn test_alias_resolution() {
        let document = schema("Org.Sales")
            .with_attr("Alias", "S")
            .with_child(keyed_entity("Customer"))
            .with_child(
                csdl("ComplexType").with_attr("Name", "Wrapper").with_child(
                    csdl("Property")
                        .with_attr("Name", "Customers")
                        .with_attr("Type", "Collection(S.Customer)"),
                ),
            );

        let parsed = try_parse(&[document]);
        let wrapper = parsed.model.find_type("S.Wrapper").unwrap();
        let property = parsed.model.find_property(wrapper, "Customers").unwrap();
        let customer = parsed.model.find_type("Org.Sales.Customer").unwrap();
        assert_eq!(
            parsed.model.property(property).type_ref().element_type().and_then(|t| t.as_schema_type()),
            Some(customer)
        );
    }

    #[test]
    fn test_missing_name_is_reported_with_location() {
        let mut entity = csdl("EntityType");
        entity.location = Some(odata_edm_diagnostics::SourceLocation::new(3, 5, 40));
        let parsed = try_parse(&[schema("NS").with_child(entity)]);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].code, EdmErrorCode::MissingAttribute);
        assert_eq!(parsed.errors[0].source_location().map(|l| l.line), Some(3));
    }

    #[test]
    fn test_enum_member_values_auto_increment() {
        let document = schema("NS").with_child(
            csdl("EnumType")
                .with_attr("Name", "Level")
                .with_child(csdl("Member").with_attr("Name", "Low"))
                .with_child(csdl("Member").with_attr("Name", "High").with_attr("Value", "10"))
                .with_child(csdl("Member").with_attr("Name", "Higher")),
        );
        let parsed = try_parse(&[document]);
        let level = parsed.model.find_type("NS.Level").unwrap();
        let values: Vec<_> = parsed.model.schema_type(level).as_enum().unwrap().members().iter().map(|m| m.value).collect();
        assert_eq!(values, vec![0, 10, 11]);
    }

    #[test]
    fn test_invalid_facets_are_recoverable() {
        let document = schema("NS").with_child(
            csdl("ComplexType").with_attr("Name", "T").with_child(
                csdl("Property")
                    .with_attr("Name", "P")
                    .with_attr("Type", "Edm.String")
                    .with_attr("MaxLength", "lots"),
            ),
        );
        let parsed = try_parse(&[document]);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].code, EdmErrorCode::InvalidMaxLength);
        let t = parsed.model.find_type("NS.T").unwrap();
        assert!(parsed.model.find_property(t, "P").is_some());
    }

    #[test]
    fn test_operation_target_paths() {
        let document = schema("NS")
            .with_child(
                csdl("Function")
                    .with_attr("Name", "Count")
                    .with_child(csdl("Parameter").with_attr("Name", "x").with_attr("Type", "Edm.Int32"))
                    .with_child(csdl("ReturnType").with_attr("Type", "Edm.Int32")),
            )
            .with_child(
                csdl("Function")
                    .with_attr("Name", "Count")
                    .with_child(csdl("Parameter").with_attr("Name", "s").with_attr("Type", "Edm.String"))
                    .with_child(csdl("ReturnType").with_attr("Type", "Edm.Int32")),
            )
            .with_child(csdl("Term").with_attr("Name", "Note").with_attr("Type", "Edm.String"))
            .with_child(
                csdl("Annotations")
                    .with_attr("Target", "NS.Count(Edm.String)/s")
                    .with_child(csdl("Annotation").with_attr("Term", "NS.Note").with_attr("String", "text")),
            );

        let parsed = try_parse(&[document]);
        assert!(parsed.is_success(), "{:?}", parsed.errors);
        let overloads = parsed.model.find_operations("NS.Count");
        assert_eq!(
            parsed.model.vocabulary_annotations()[0].target,
            AnnotationTarget::Parameter {
                operation: overloads[1],
                parameter: "s".to_string()
            }
        );
    }

    #[test]
    fn test_boolean_term_without_value_defaults_to_true() {
        let document = schema("NS")
            .with_child(csdl("Term").with_attr("Name", "Flag").with_attr("Type", "Edm.Boolean"))
            .with_child(keyed_entity("E").with_child(csdl("Annotation").with_attr("Term", "NS.Flag")));

        let parsed = try_parse(&[document]);
        let annotation = &parsed.model.vocabulary_annotations()[0];
        assert_eq!(annotation.placement, AnnotationPlacement::Inline);
        assert_eq!(*annotation.expression, Expression::bool(true));
    }

    #[test]
    fn test_unknown_target_stays_textual() {
        let document = schema("NS").with_child(
            csdl("Annotations")
                .with_attr("Target", "NS.Nowhere/Thing")
                .with_child(csdl("Annotation").with_attr("Term", "Other.Term").with_attr("Int", "1")),
        );
        let parsed = try_parse(&[document]);
        assert!(parsed.is_success());
        let annotation = &parsed.model.vocabulary_annotations()[0];
        assert_eq!(annotation.target, AnnotationTarget::Unresolved("NS.Nowhere/Thing".to_string()));
        assert_eq!(annotation.hosting_namespace, None);
    }

    #[test]
    fn test_if_with_two_operands() {
        let document = schema("NS")
            .with_child(csdl("Term").with_attr("Name", "T").with_attr("Type", "Edm.Int32"))
            .with_child(
                keyed_entity("E").with_child(
                    csdl("Annotation").with_attr("Term", "NS.T").with_child(
                        csdl("If")
                            .with_child(csdl("Bool").with_text("true"))
                            .with_child(csdl("Int").with_text("1")),
                    ),
                ),
            );
        let parsed = try_parse(&[document]);
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].code, EdmErrorCode::InvalidIfExpression);
    }

    #[test]
    fn test_referenced_schemas_resolve_but_are_not_elements() {
        let main = schema("App").with_child(
            csdl("EntityType")
                .with_attr("Name", "Order")
                .with_attr("BaseType", "Shared.Entity"),
        );
        let shared = schema("Shared").with_child(keyed_entity("Entity"));

        let parsed = try_parse_with_references(&[main], &[shared]);
        assert!(parsed.is_success(), "{:?}", parsed.errors);
        assert_eq!(parsed.model.schema_elements().len(), 1);
        assert_eq!(parsed.model.referenced_elements().len(), 1);
        let order = parsed.model.find_type("App.Order").unwrap();
        assert_eq!(parsed.model.key(order).len(), 1);
    }

    #[test]
    fn test_split_target_path() {
        assert_eq!(split_target_path("NS.T"), ("NS.T", None));
        assert_eq!(split_target_path("NS.T/P"), ("NS.T", Some("P")));
        assert_eq!(split_target_path("NS.F(NS.A,Edm.Int32)/$ReturnType"), ("NS.F(NS.A,Edm.Int32)", Some("$ReturnType")));
    }
}
