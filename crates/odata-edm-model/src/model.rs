//! The model: an arena of schema elements plus annotation associations
//!
//! Every definitional element lives in a per-kind arena and is addressed by a
//! typed handle. The schema element list records which top-level elements
//! belong to the model and in what order. Graph queries such as
//! [`Model::properties`] walk the base-type chain at each call, so edits are
//! visible immediately and cycles end the walk instead of looping.

use crate::container::{
    ContainerElement, ContainerElementKind, EntityContainer, EntitySet, NavigationBinding,
    OperationImport, OperationRef, Singleton,
};
use crate::names::{qualified_name, split_qualified_name};
use crate::operation::{Operation, OperationKind, Parameter};
use crate::primitive::PrimitiveKind;
use crate::schema::{
    EnumMember, EnumType, NavigationProperty, NavigationPropertyInfo, Property, PropertyKind,
    SchemaType, SchemaTypeKind, StructuralProperty, StructuredType,
};
use crate::version::EdmVersion;
use crate::vocabulary::{
    DirectValue, DirectValueAnnotation, DirectValueKey, Term, VocabularyAnnotation,
};
use crate::{
    AnnotationTarget, ContainerId, OperationId, PropertyId, SchemaElement, TermId, TypeDefinition,
    TypeId, TypeReference,
};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use odata_edm_diagnostics::{EdmLocation, ModelError, Result, SourceLocation};
use std::any::Any;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Outcome of resolving a type's base type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseTypeResolution {
    /// No base type
    None,
    /// Base type, not part of a cycle through this type
    Resolved(TypeId),
    /// This type's base chain leads back to itself
    Cyclic(TypeCycle),
}

/// Members of a base-type cycle, starting at the type that was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCycle {
    pub members: Vec<TypeId>,
}

/// Root aggregate of an entity data model
#[derive(Default)]
pub struct Model {
    version: EdmVersion,
    types: Vec<SchemaType>,
    properties: Vec<Property>,
    operations: Vec<Operation>,
    terms: Vec<Term>,
    containers: Vec<EntityContainer>,
    elements: IndexSet<SchemaElement>,
    referenced: IndexSet<SchemaElement>,
    aliases: IndexMap<String, String>,
    annotations: Vec<VocabularyAnnotation>,
    direct_values: IndexMap<DirectValueKey, DirectValue>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("version", &self.version)
            .field("elements", &self.elements)
            .field("referenced", &self.referenced)
            .field("aliases", &self.aliases)
            .field("annotations", &self.annotations.len())
            .field("direct_values", &self.direct_values.len())
            .finish()
    }
}

impl Model {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Target EDM version
    pub fn version(&self) -> EdmVersion {
        self.version
    }

    /// Set the target EDM version
    pub fn set_version(&mut self, version: EdmVersion) {
        self.version = version;
    }

    // ---------------------------------------------------------------------
    // Arena access
    // ---------------------------------------------------------------------

    /// Get a schema type
    ///
    /// Handles are only valid for the model that created them.
    pub fn schema_type(&self, id: TypeId) -> &SchemaType {
        &self.types[id.index()]
    }

    pub fn schema_type_mut(&mut self, id: TypeId) -> &mut SchemaType {
        &mut self.types[id.index()]
    }

    /// Structured body of an entity or complex type
    pub fn structured_type(&self, id: TypeId) -> Option<&StructuredType> {
        self.schema_type(id).as_structured()
    }

    pub fn structured_type_mut(&mut self, id: TypeId) -> Option<&mut StructuredType> {
        self.schema_type_mut(id).as_structured_mut()
    }

    pub fn property(&self, id: PropertyId) -> &Property {
        &self.properties[id.index()]
    }

    pub fn property_mut(&mut self, id: PropertyId) -> &mut Property {
        &mut self.properties[id.index()]
    }

    pub fn operation(&self, id: OperationId) -> &Operation {
        &self.operations[id.index()]
    }

    pub fn operation_mut(&mut self, id: OperationId) -> &mut Operation {
        &mut self.operations[id.index()]
    }

    pub fn term(&self, id: TermId) -> &Term {
        &self.terms[id.index()]
    }

    pub fn term_mut(&mut self, id: TermId) -> &mut Term {
        &mut self.terms[id.index()]
    }

    pub fn container(&self, id: ContainerId) -> &EntityContainer {
        &self.containers[id.index()]
    }

    pub fn container_mut(&mut self, id: ContainerId) -> &mut EntityContainer {
        &mut self.containers[id.index()]
    }

    // ---------------------------------------------------------------------
    // Schema elements
    // ---------------------------------------------------------------------

    /// Top-level elements in insertion order
    pub fn schema_elements(&self) -> impl ExactSizeIterator<Item = SchemaElement> + '_ {
        self.elements.iter().copied()
    }

    /// Elements registered as referenced
    ///
    /// Referenced elements are found by lookups but are neither serialized
    /// nor validated.
    pub fn referenced_elements(&self) -> impl ExactSizeIterator<Item = SchemaElement> + '_ {
        self.referenced.iter().copied()
    }

    /// Schema types in element order
    pub fn types(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.elements.iter().filter_map(|e| match e {
            SchemaElement::Type(id) => Some(*id),
            _ => None,
        })
    }

    /// Operations in element order
    pub fn operations(&self) -> impl Iterator<Item = OperationId> + '_ {
        self.elements.iter().filter_map(|e| match e {
            SchemaElement::Operation(id) => Some(*id),
            _ => None,
        })
    }

    /// Terms in element order
    pub fn terms(&self) -> impl Iterator<Item = TermId> + '_ {
        self.elements.iter().filter_map(|e| match e {
            SchemaElement::Term(id) => Some(*id),
            _ => None,
        })
    }

    /// Entity containers in element order
    pub fn containers(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.elements.iter().filter_map(|e| match e {
            SchemaElement::Container(id) => Some(*id),
            _ => None,
        })
    }

    /// Add a top-level element
    ///
    /// Adding an element that is already present is a no-op. An element with
    /// a colliding qualified name is accepted.
    pub fn add_element(&mut self, element: impl Into<SchemaElement>) -> bool {
        let element = element.into();
        self.referenced.shift_remove(&element);
        self.elements.insert(element)
    }

    /// Add several elements in order
    pub fn add_elements<I, E>(&mut self, elements: I)
    where
        I: IntoIterator<Item = E>,
        E: Into<SchemaElement>,
    {
        for element in elements {
            self.add_element(element);
        }
    }

    /// Register an element as referenced
    pub fn add_referenced_element(&mut self, element: impl Into<SchemaElement>) -> bool {
        let element = element.into();
        if self.elements.contains(&element) {
            return false;
        }
        self.referenced.insert(element)
    }

    /// Check if an element belongs to the model's own schemas
    pub fn contains_element(&self, element: impl Into<SchemaElement>) -> bool {
        self.elements.contains(&element.into())
    }

    /// Remove a top-level element together with its annotations
    ///
    /// Handles to the element stay valid; the element is only detached.
    pub fn remove_element(&mut self, element: impl Into<SchemaElement>) -> bool {
        let element = element.into();
        let removed = self.elements.shift_remove(&element) || self.referenced.shift_remove(&element);
        if removed {
            let before = self.annotations.len();
            self.annotations
                .retain(|a| target_owner(&a.target, &self.properties) != Some(element));
            let properties = &self.properties;
            self.direct_values
                .retain(|key, _| target_owner(&key.target, properties) != Some(element));
            debug!(
                "Removed {:?} and {} annotation(s)",
                element,
                before - self.annotations.len()
            );
        }
        removed
    }

    /// Namespace of a top-level element
    pub fn element_namespace(&self, element: SchemaElement) -> &str {
        match element {
            SchemaElement::Type(id) => &self.schema_type(id).namespace,
            SchemaElement::Operation(id) => &self.operation(id).namespace,
            SchemaElement::Term(id) => &self.term(id).namespace,
            SchemaElement::Container(id) => &self.container(id).namespace,
        }
    }

    /// Simple name of a top-level element
    pub fn element_name(&self, element: SchemaElement) -> &str {
        match element {
            SchemaElement::Type(id) => &self.schema_type(id).name,
            SchemaElement::Operation(id) => &self.operation(id).name,
            SchemaElement::Term(id) => &self.term(id).name,
            SchemaElement::Container(id) => &self.container(id).name,
        }
    }

    /// `Namespace.Name` of a top-level element
    pub fn element_qualified_name(&self, element: SchemaElement) -> String {
        qualified_name(self.element_namespace(element), self.element_name(element))
    }

    /// Source location of a top-level element, if it was parsed
    pub fn element_location(&self, element: SchemaElement) -> Option<SourceLocation> {
        match element {
            SchemaElement::Type(id) => self.schema_type(id).location,
            SchemaElement::Operation(id) => self.operation(id).location,
            SchemaElement::Term(id) => self.term(id).location,
            SchemaElement::Container(id) => self.container(id).location,
        }
    }

    // ---------------------------------------------------------------------
    // Aliases and lookups
    // ---------------------------------------------------------------------

    /// Declare `alias` for `namespace`
    pub fn set_namespace_alias(&mut self, namespace: impl Into<String>, alias: impl Into<String>) {
        self.aliases.insert(namespace.into(), alias.into());
    }

    /// Alias declared for a namespace
    pub fn namespace_alias(&self, namespace: &str) -> Option<&str> {
        self.aliases.get(namespace).map(String::as_str)
    }

    /// Namespace declared under an alias
    pub fn alias_namespace(&self, alias: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(_, a)| a.as_str() == alias)
            .map(|(ns, _)| ns.as_str())
    }

    /// Replace a leading alias with its namespace
    pub fn resolve_alias<'a>(&self, qualified: &'a str) -> Cow<'a, str> {
        let (namespace, name) = split_qualified_name(qualified);
        match self.alias_namespace(namespace) {
            Some(ns) => Cow::Owned(qualified_name(ns, name)),
            None => Cow::Borrowed(qualified),
        }
    }

    fn find_element<T>(
        &self,
        qualified: &str,
        select: impl Fn(SchemaElement) -> Option<T>,
    ) -> Vec<T> {
        let qualified = self.resolve_alias(qualified);
        let (namespace, name) = split_qualified_name(&qualified);
        self.elements
            .iter()
            .chain(self.referenced.iter())
            .copied()
            .filter(|e| self.element_name(*e) == name && self.element_namespace(*e) == namespace)
            .filter_map(select)
            .collect()
    }

    /// Find a schema type by qualified name or alias-qualified name
    pub fn find_type(&self, qualified: &str) -> Option<TypeId> {
        self.find_element(qualified, |e| match e {
            SchemaElement::Type(id) => Some(id),
            _ => None,
        })
        .into_iter()
        .next()
    }

    /// Find a term by qualified name
    pub fn find_term(&self, qualified: &str) -> Option<TermId> {
        self.find_element(qualified, |e| match e {
            SchemaElement::Term(id) => Some(id),
            _ => None,
        })
        .into_iter()
        .next()
    }

    /// All overloads of an operation
    pub fn find_operations(&self, qualified: &str) -> Vec<OperationId> {
        self.find_element(qualified, |e| match e {
            SchemaElement::Operation(id) => Some(id),
            _ => None,
        })
    }

    /// Find an entity container by qualified name
    pub fn find_entity_container(&self, qualified: &str) -> Option<ContainerId> {
        self.find_element(qualified, |e| match e {
            SchemaElement::Container(id) => Some(id),
            _ => None,
        })
        .into_iter()
        .next()
    }

    /// Resolve a qualified type name to a definition
    ///
    /// Understands primitive names and `Collection(...)`; names that match
    /// nothing come back as [`TypeDefinition::Unresolved`].
    pub fn resolve_type_name(&self, name: &str) -> TypeDefinition {
        let name = name.trim();
        if let Some(inner) = name
            .strip_prefix("Collection(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let element = TypeReference::new(self.resolve_type_name(inner), true);
            return TypeDefinition::Collection(Box::new(element));
        }
        if let Some(kind) = PrimitiveKind::from_qualified_name(name) {
            return TypeDefinition::Primitive(kind);
        }
        match self.find_type(name) {
            Some(id) => TypeDefinition::Schema(id),
            None => TypeDefinition::Unresolved(name.to_string()),
        }
    }

    // ---------------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------------

    fn push_type(&mut self, namespace: String, name: String, kind: SchemaTypeKind) -> TypeId {
        let id = TypeId::from_index(self.types.len());
        self.types.push(SchemaType {
            namespace,
            name,
            kind,
            location: None,
        });
        id
    }

    /// Create an entity type without adding it to the schema elements
    pub fn create_entity_type(&mut self, namespace: impl Into<String>, name: impl Into<String>) -> TypeId {
        self.push_type(
            namespace.into(),
            name.into(),
            SchemaTypeKind::Entity(StructuredType::default()),
        )
    }

    /// Create a complex type without adding it to the schema elements
    pub fn create_complex_type(&mut self, namespace: impl Into<String>, name: impl Into<String>) -> TypeId {
        self.push_type(
            namespace.into(),
            name.into(),
            SchemaTypeKind::Complex(StructuredType::default()),
        )
    }

    /// Create an enum type without adding it to the schema elements
    pub fn create_enum_type(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        underlying_type: PrimitiveKind,
        is_flags: bool,
    ) -> TypeId {
        self.push_type(
            namespace.into(),
            name.into(),
            SchemaTypeKind::Enum(EnumType {
                underlying_type,
                is_flags,
                members: Vec::new(),
            }),
        )
    }

    /// Create and add an entity type
    pub fn add_entity_type(&mut self, namespace: impl Into<String>, name: impl Into<String>) -> TypeId {
        let id = self.create_entity_type(namespace, name);
        self.add_element(id);
        id
    }

    /// Create and add a complex type
    pub fn add_complex_type(&mut self, namespace: impl Into<String>, name: impl Into<String>) -> TypeId {
        let id = self.create_complex_type(namespace, name);
        self.add_element(id);
        id
    }

    /// Create and add an enum type
    pub fn add_enum_type(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        underlying_type: PrimitiveKind,
        is_flags: bool,
    ) -> TypeId {
        let id = self.create_enum_type(namespace, name, underlying_type, is_flags);
        self.add_element(id);
        id
    }

    fn require_structured(&mut self, id: TypeId) -> Result<&mut StructuredType> {
        let name = self.schema_type(id).qualified_name();
        self.structured_type_mut(id)
            .ok_or(ModelError::NotAStructuredType { name })
    }

    /// Set or clear the base type of an entity or complex type
    pub fn set_base_type(&mut self, id: TypeId, base: Option<TypeId>) -> Result<()> {
        self.require_structured(id)?.base_type = base;
        Ok(())
    }

    /// Add an enum member; values need not be distinct
    pub fn add_enum_member(&mut self, id: TypeId, name: impl Into<String>, value: i64) -> Result<()> {
        let type_name = self.schema_type(id).qualified_name();
        let enum_type = self
            .schema_type_mut(id)
            .as_enum_mut()
            .ok_or(ModelError::NotAnEnumType { name: type_name })?;
        enum_type.members.push(EnumMember {
            name: name.into(),
            value,
            location: None,
        });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------------

    fn push_property(&mut self, name: String, kind: PropertyKind) -> PropertyId {
        let id = PropertyId::from_index(self.properties.len());
        self.properties.push(Property {
            name,
            declaring_type: None,
            kind,
            location: None,
        });
        id
    }

    /// Create an unbound structural property
    pub fn create_structural_property(&mut self, name: impl Into<String>, type_ref: TypeReference) -> PropertyId {
        self.push_property(
            name.into(),
            PropertyKind::Structural(StructuralProperty {
                type_ref,
                default_value: None,
            }),
        )
    }

    /// Create an unbound navigation property
    pub fn create_navigation_property(&mut self, name: impl Into<String>, target: TypeReference) -> PropertyId {
        self.push_property(
            name.into(),
            PropertyKind::Navigation(NavigationProperty {
                target,
                partner: None,
                contains_target: false,
                on_delete: None,
                dependent_properties: Vec::new(),
                principal_properties: Vec::new(),
            }),
        )
    }

    /// Declare `property` on type `id`
    ///
    /// Fails if the property is already declared by another type. A property
    /// whose name duplicates an existing one is accepted.
    pub fn add_property(&mut self, id: TypeId, property: PropertyId) -> Result<()> {
        if let Some(owner) = self.property(property).declaring_type {
            if owner != id {
                return Err(ModelError::PropertyAlreadyBound {
                    property: self.property(property).name.clone(),
                    declaring_type: self.schema_type(owner).qualified_name(),
                });
            }
        }
        let structured = self.require_structured(id)?;
        if !structured.declared_properties.contains(&property) {
            structured.declared_properties.push(property);
        }
        self.property_mut(property).declaring_type = Some(id);
        Ok(())
    }

    /// Create a structural property and declare it on `id`
    pub fn add_structural_property(
        &mut self,
        id: TypeId,
        name: impl Into<String>,
        type_ref: TypeReference,
    ) -> Result<PropertyId> {
        self.require_structured(id)?;
        let property = self.create_structural_property(name, type_ref);
        self.add_property(id, property)?;
        Ok(property)
    }

    /// Append key properties without deduplication
    pub fn add_keys(&mut self, id: TypeId, keys: &[PropertyId]) -> Result<()> {
        let name = self.schema_type(id).qualified_name();
        match &mut self.schema_type_mut(id).kind {
            SchemaTypeKind::Entity(entity) => {
                entity.declared_key.extend_from_slice(keys);
                Ok(())
            }
            _ => Err(ModelError::NotAnEntityType { name }),
        }
    }

    fn navigation_from_info(&mut self, info: &NavigationPropertyInfo) -> PropertyId {
        let id = self.create_navigation_property(info.name.clone(), info.target_reference());
        if let PropertyKind::Navigation(nav) = &mut self.property_mut(id).kind {
            nav.contains_target = info.contains_target;
            nav.on_delete = info.on_delete;
            nav.dependent_properties = info.dependent_properties.clone();
            nav.principal_properties = info.principal_properties.clone();
        }
        id
    }

    /// Declare a navigation property without a partner
    pub fn add_unidirectional_navigation(
        &mut self,
        source: TypeId,
        info: NavigationPropertyInfo,
    ) -> Result<PropertyId> {
        self.require_structured(source)?;
        let id = self.navigation_from_info(&info);
        self.add_property(source, id)?;
        Ok(id)
    }

    /// Declare a navigation property on `source` and its partner on the target
    ///
    /// Returns `(forward, partner)`; the two reference each other.
    pub fn add_bidirectional_navigation(
        &mut self,
        source: TypeId,
        info: NavigationPropertyInfo,
        partner_info: NavigationPropertyInfo,
    ) -> Result<(PropertyId, PropertyId)> {
        self.require_structured(source)?;
        self.require_structured(info.target)?;
        let forward = self.navigation_from_info(&info);
        let partner = self.navigation_from_info(&partner_info);
        self.add_property(source, forward)?;
        self.add_property(info.target, partner)?;
        self.set_navigation_partners(forward, partner)?;
        Ok((forward, partner))
    }

    fn navigation_mut(&mut self, id: PropertyId) -> Result<&mut NavigationProperty> {
        let name = self.property(id).name.clone();
        self.property_mut(id)
            .as_navigation_mut()
            .ok_or(ModelError::NotANavigationProperty { name })
    }

    /// Set the partner of one navigation property
    pub fn set_navigation_partner(&mut self, id: PropertyId, partner: Option<PropertyId>) -> Result<()> {
        if let Some(partner) = partner {
            if !self.property(partner).is_navigation() {
                return Err(ModelError::NotANavigationProperty {
                    name: self.property(partner).name.clone(),
                });
            }
        }
        self.navigation_mut(id)?.partner = partner;
        Ok(())
    }

    /// Make two navigation properties partners of each other
    pub fn set_navigation_partners(&mut self, a: PropertyId, b: PropertyId) -> Result<()> {
        self.set_navigation_partner(a, Some(b))?;
        self.set_navigation_partner(b, Some(a))
    }

    /// Entity type a navigation property reaches, unwrapping collections
    pub fn to_entity_type(&self, property: PropertyId) -> Option<TypeId> {
        let nav = self.property(property).as_navigation()?;
        nav.target.element_or_self().as_schema_type()
    }

    // ---------------------------------------------------------------------
    // Terms and operations
    // ---------------------------------------------------------------------

    /// Create a term without adding it
    pub fn create_term(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        type_ref: TypeReference,
    ) -> TermId {
        let id = TermId::from_index(self.terms.len());
        self.terms.push(Term {
            namespace: namespace.into(),
            name: name.into(),
            type_ref,
            applies_to: None,
            default_value: None,
            location: None,
        });
        id
    }

    /// Create and add a term
    pub fn add_term(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        type_ref: TypeReference,
    ) -> TermId {
        let id = self.create_term(namespace, name, type_ref);
        self.add_element(id);
        id
    }

    fn push_operation(
        &mut self,
        namespace: String,
        name: String,
        kind: OperationKind,
        is_bound: bool,
        return_type: Option<TypeReference>,
    ) -> OperationId {
        let id = OperationId::from_index(self.operations.len());
        self.operations.push(Operation {
            namespace,
            name,
            kind,
            is_bound,
            entity_set_path: None,
            return_type,
            parameters: Vec::new(),
            location: None,
        });
        id
    }

    /// Create an action without adding it
    pub fn create_action(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        is_bound: bool,
        return_type: Option<TypeReference>,
    ) -> OperationId {
        self.push_operation(namespace.into(), name.into(), OperationKind::Action, is_bound, return_type)
    }

    /// Create a function without adding it
    pub fn create_function(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        is_bound: bool,
        is_composable: bool,
        return_type: TypeReference,
    ) -> OperationId {
        self.push_operation(
            namespace.into(),
            name.into(),
            OperationKind::Function { is_composable },
            is_bound,
            Some(return_type),
        )
    }

    /// Create and add an action
    pub fn add_action(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        is_bound: bool,
        return_type: Option<TypeReference>,
    ) -> OperationId {
        let id = self.create_action(namespace, name, is_bound, return_type);
        self.add_element(id);
        id
    }

    /// Create and add a function
    pub fn add_function(
        &mut self,
        namespace: impl Into<String>,
        name: impl Into<String>,
        is_bound: bool,
        is_composable: bool,
        return_type: TypeReference,
    ) -> OperationId {
        let id = self.create_function(namespace, name, is_bound, is_composable, return_type);
        self.add_element(id);
        id
    }

    /// Append a parameter
    pub fn add_parameter(&mut self, operation: OperationId, name: impl Into<String>, type_ref: TypeReference) {
        self.operation_mut(operation).parameters.push(Parameter {
            name: name.into(),
            type_ref,
            location: None,
        });
    }

    /// Bound operations whose binding parameter accepts `binding_type`
    pub fn bound_operations(&self, binding_type: TypeId) -> Vec<OperationId> {
        self.operations()
            .filter(|op| {
                self.operation(*op)
                    .binding_parameter()
                    .and_then(|p| p.type_ref.element_or_self().as_schema_type())
                    .is_some_and(|bound| self.is_or_inherits_from(binding_type, bound))
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Containers
    // ---------------------------------------------------------------------

    /// Create an entity container without adding it
    pub fn create_entity_container(&mut self, namespace: impl Into<String>, name: impl Into<String>) -> ContainerId {
        let id = ContainerId::from_index(self.containers.len());
        self.containers.push(EntityContainer {
            namespace: namespace.into(),
            name: name.into(),
            elements: Vec::new(),
            location: None,
        });
        id
    }

    /// Create and add an entity container
    pub fn add_entity_container(&mut self, namespace: impl Into<String>, name: impl Into<String>) -> ContainerId {
        let id = self.create_entity_container(namespace, name);
        self.add_element(id);
        id
    }

    /// Append a container element
    pub fn add_container_element(&mut self, container: ContainerId, element: ContainerElement) {
        self.container_mut(container).elements.push(element);
    }

    fn push_container_element(&mut self, container: ContainerId, name: String, kind: ContainerElementKind) {
        self.add_container_element(
            container,
            ContainerElement {
                name,
                kind,
                location: None,
            },
        );
    }

    /// Add an entity set of `entity_type`
    pub fn add_entity_set(&mut self, container: ContainerId, name: impl Into<String>, entity_type: TypeReference) {
        self.push_container_element(
            container,
            name.into(),
            ContainerElementKind::EntitySet(EntitySet {
                entity_type,
                include_in_service_document: true,
                bindings: Vec::new(),
            }),
        );
    }

    /// Add a singleton of `entity_type`
    pub fn add_singleton(&mut self, container: ContainerId, name: impl Into<String>, entity_type: TypeReference) {
        self.push_container_element(
            container,
            name.into(),
            ContainerElementKind::Singleton(Singleton {
                entity_type,
                bindings: Vec::new(),
            }),
        );
    }

    /// Add an action import
    pub fn add_action_import(
        &mut self,
        container: ContainerId,
        name: impl Into<String>,
        action: OperationRef,
        entity_set: Option<String>,
    ) {
        self.push_container_element(
            container,
            name.into(),
            ContainerElementKind::ActionImport(OperationImport {
                operation: action,
                entity_set,
                include_in_service_document: false,
            }),
        );
    }

    /// Add a function import
    pub fn add_function_import(
        &mut self,
        container: ContainerId,
        name: impl Into<String>,
        function: OperationRef,
        entity_set: Option<String>,
        include_in_service_document: bool,
    ) {
        self.push_container_element(
            container,
            name.into(),
            ContainerElementKind::FunctionImport(OperationImport {
                operation: function,
                entity_set,
                include_in_service_document,
            }),
        );
    }

    /// Bind a navigation property of a set or singleton to a target
    ///
    /// The binding path is the navigation property name.
    pub fn add_navigation_binding(
        &mut self,
        container: ContainerId,
        element: &str,
        navigation_property: PropertyId,
        target: impl Into<String>,
    ) -> Result<()> {
        let path = self.property(navigation_property).name.clone();
        self.add_navigation_binding_with_path(container, element, Some(navigation_property), path, target)
    }

    /// Bind a navigation property reached through an explicit path
    pub fn add_navigation_binding_with_path(
        &mut self,
        container: ContainerId,
        element: &str,
        navigation_property: Option<PropertyId>,
        path: impl Into<String>,
        target: impl Into<String>,
    ) -> Result<()> {
        let container_name = self.container(container).qualified_name();
        let entry = self
            .container_mut(container)
            .element_mut(element)
            .ok_or_else(|| ModelError::unknown("container element", format!("{}/{}", container_name, element)))?;
        let bindings = entry.bindings_mut().ok_or_else(|| {
            ModelError::invalid_operation(format!(
                "'{}' is not an entity set or singleton",
                element
            ))
        })?;
        bindings.push(NavigationBinding {
            navigation_property,
            path: path.into(),
            target: target.into(),
            location: None,
        });
        Ok(())
    }

    /// Resolve a binding target such as `Orders` or `NS.Container/Orders`
    pub fn resolve_binding_target(&self, container: ContainerId, target: &str) -> Option<(ContainerId, &ContainerElement)> {
        let (owner, name) = match target.split_once('/') {
            Some((qualified, name)) => (self.find_entity_container(qualified)?, name),
            None => (container, target),
        };
        self.container(owner)
            .element(name)
            .filter(|e| e.entity_type().is_some())
            .map(|e| (owner, e))
    }

    /// Target set or singleton a navigation property is bound to
    ///
    /// With `path` set only the binding with that path matches; otherwise the
    /// first binding of the property wins.
    pub fn find_navigation_target(
        &self,
        container: ContainerId,
        element: &str,
        navigation_property: PropertyId,
        path: Option<&str>,
    ) -> Option<(ContainerId, &ContainerElement)> {
        let source = self.container(container).element(element)?;
        let binding = source.bindings().iter().find(|b| {
            b.navigation_property == Some(navigation_property) && path.is_none_or(|p| b.path == p)
        })?;
        self.resolve_binding_target(container, &binding.target)
    }

    // ---------------------------------------------------------------------
    // Inheritance and property queries
    // ---------------------------------------------------------------------

    fn raw_base(&self, id: TypeId) -> Option<TypeId> {
        self.structured_type(id).and_then(|s| s.base_type)
    }

    /// Resolve the base type, detecting cycles through `id`
    ///
    /// Total: the walk visits each type at most once.
    pub fn resolve_base_type(&self, id: TypeId) -> BaseTypeResolution {
        let Some(base) = self.raw_base(id) else {
            return BaseTypeResolution::None;
        };
        let mut members = vec![id];
        let mut visited = HashSet::from([id]);
        let mut current = Some(base);
        while let Some(ty) = current {
            if ty == id {
                return BaseTypeResolution::Cyclic(TypeCycle { members });
            }
            if !visited.insert(ty) {
                break;
            }
            members.push(ty);
            current = self.raw_base(ty);
        }
        BaseTypeResolution::Resolved(base)
    }

    /// Base type, treated as absent for cycle members
    pub fn base_type(&self, id: TypeId) -> Option<TypeId> {
        match self.resolve_base_type(id) {
            BaseTypeResolution::Resolved(base) => Some(base),
            BaseTypeResolution::None | BaseTypeResolution::Cyclic(_) => None,
        }
    }

    /// Check if `id` is part of a base-type cycle
    pub fn is_in_cycle(&self, id: TypeId) -> bool {
        matches!(self.resolve_base_type(id), BaseTypeResolution::Cyclic(_))
    }

    /// Ancestors nearest first
    ///
    /// A single walk of the declared chain. A chain that runs into a cycle
    /// stops at the first cycle member, which has no base of its own.
    pub fn ancestors(&self, id: TypeId) -> Vec<TypeId> {
        let mut result = Vec::new();
        let mut positions = HashMap::new();
        let mut current = self.raw_base(id);
        while let Some(ty) = current {
            if ty == id {
                return Vec::new();
            }
            if let Some(&position) = positions.get(&ty) {
                result.truncate(position + 1);
                break;
            }
            positions.insert(ty, result.len());
            result.push(ty);
            current = self.raw_base(ty);
        }
        result
    }

    /// Check if `id` is `ancestor` or derives from it
    pub fn is_or_inherits_from(&self, id: TypeId, ancestor: TypeId) -> bool {
        id == ancestor || self.ancestors(id).contains(&ancestor)
    }

    /// Types in the model whose base type is `id`
    pub fn derived_types(&self, id: TypeId) -> Vec<TypeId> {
        self.types()
            .filter(|t| *t != id && self.raw_base(*t) == Some(id))
            .collect()
    }

    /// Properties declared directly on `id`
    pub fn declared_properties(&self, id: TypeId) -> &[PropertyId] {
        self.structured_type(id)
            .map(StructuredType::declared_properties)
            .unwrap_or(&[])
    }

    /// All properties of `id`: ancestors' declared properties root first,
    /// followed by its own
    ///
    /// Computed from the current base chain on every call.
    pub fn properties(&self, id: TypeId) -> Vec<PropertyId> {
        let chain = self.ancestors(id);
        let mut result = Vec::new();
        for ty in chain.iter().rev().chain(std::iter::once(&id)) {
            result.extend_from_slice(self.declared_properties(*ty));
        }
        trace!("{} has {} properties", self.schema_type(id).name, result.len());
        result
    }

    /// Find a property by name, most derived declaration first
    pub fn find_property(&self, id: TypeId, name: &str) -> Option<PropertyId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .flat_map(|ty| self.declared_properties(ty).iter().copied())
            .find(|p| self.property(*p).name == name)
    }

    /// Effective key: the nearest non-empty declared key up the chain
    pub fn key(&self, id: TypeId) -> Vec<PropertyId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter_map(|ty| self.structured_type(ty))
            .map(StructuredType::declared_key)
            .find(|key| !key.is_empty())
            .map(<[PropertyId]>::to_vec)
            .unwrap_or_default()
    }

    /// Name the inverse of a navigation property is known by
    ///
    /// Unpartnered properties get `{DeclaringType}_{Property}`.
    pub fn partner_name(&self, id: PropertyId) -> Option<String> {
        let property = self.property(id);
        let nav = property.as_navigation()?;
        match nav.partner {
            Some(partner) => Some(self.property(partner).name.clone()),
            None => {
                let declaring = property.declaring_type.map(|t| self.schema_type(t).name.as_str())?;
                Some(format!("{}_{}", declaring, property.name))
            }
        }
    }

    // ---------------------------------------------------------------------
    // Names and paths
    // ---------------------------------------------------------------------

    /// Qualified type name, e.g. `Edm.Int32` or `Collection(NS.Order)`
    pub fn type_definition_name(&self, definition: &TypeDefinition) -> String {
        match definition {
            TypeDefinition::Primitive(kind) => kind.qualified_name().to_string(),
            TypeDefinition::Schema(id) | TypeDefinition::EntityReference(id) => {
                self.schema_type(*id).qualified_name()
            }
            TypeDefinition::Collection(element) => {
                format!("Collection({})", self.type_definition_name(&element.definition))
            }
            TypeDefinition::Unresolved(name) => name.clone(),
        }
    }

    /// Qualified name of a type reference's definition
    pub fn type_reference_name(&self, type_ref: &TypeReference) -> String {
        self.type_definition_name(&type_ref.definition)
    }

    /// Overload signature, e.g. `NS.GetOrders(NS.Customer,Edm.Int32)`
    ///
    /// Functions list every parameter type; actions only the binding
    /// parameter.
    pub fn operation_signature(&self, id: OperationId) -> String {
        let op = self.operation(id);
        let parameters: Vec<String> = if op.is_function() {
            op.parameters
                .iter()
                .map(|p| self.type_reference_name(&p.type_ref))
                .collect()
        } else {
            op.binding_parameter()
                .map(|p| self.type_reference_name(&p.type_ref))
                .into_iter()
                .collect()
        };
        format!("{}({})", op.qualified_name(), parameters.join(","))
    }

    /// Stable textual identifier of an annotation target
    pub fn target_path(&self, target: &AnnotationTarget) -> String {
        match target {
            AnnotationTarget::Type(id) => self.schema_type(*id).qualified_name(),
            AnnotationTarget::Property(id) => {
                let property = self.property(*id);
                match property.declaring_type {
                    Some(owner) => format!("{}/{}", self.schema_type(owner).qualified_name(), property.name),
                    None => property.name.clone(),
                }
            }
            AnnotationTarget::EnumMember { enum_type, member } => {
                format!("{}/{}", self.schema_type(*enum_type).qualified_name(), member)
            }
            AnnotationTarget::Term(id) => self.term(*id).qualified_name(),
            AnnotationTarget::Operation(id) => self.operation_signature(*id),
            AnnotationTarget::Parameter { operation, parameter } => {
                format!("{}/{}", self.operation_signature(*operation), parameter)
            }
            AnnotationTarget::ReturnType(id) => format!("{}/$ReturnType", self.operation_signature(*id)),
            AnnotationTarget::Container(id) => self.container(*id).qualified_name(),
            AnnotationTarget::ContainerElement { container, element } => {
                format!("{}/{}", self.container(*container).qualified_name(), element)
            }
            AnnotationTarget::Unresolved(path) => path.clone(),
        }
    }

    /// Source position of a target, if it was parsed
    pub fn target_source_location(&self, target: &AnnotationTarget) -> Option<SourceLocation> {
        match target {
            AnnotationTarget::Type(id) => self.schema_type(*id).location,
            AnnotationTarget::Property(id) => self.property(*id).location,
            AnnotationTarget::EnumMember { enum_type, member } => self
                .schema_type(*enum_type)
                .as_enum()
                .and_then(|e| e.member(member))
                .and_then(|m| m.location),
            AnnotationTarget::Term(id) => self.term(*id).location,
            AnnotationTarget::Operation(id) | AnnotationTarget::ReturnType(id) => self.operation(*id).location,
            AnnotationTarget::Parameter { operation, parameter } => self
                .operation(*operation)
                .parameter(parameter)
                .and_then(|p| p.location),
            AnnotationTarget::Container(id) => self.container(*id).location,
            AnnotationTarget::ContainerElement { container, element } => {
                self.container(*container).element(element).and_then(|e| e.location)
            }
            AnnotationTarget::Unresolved(_) => None,
        }
    }

    /// Location of a target: its parsed position, else its path
    pub fn location_of(&self, target: &AnnotationTarget) -> EdmLocation {
        match self.target_source_location(target) {
            Some(location) => EdmLocation::Text(location),
            None => EdmLocation::element(self.target_path(target)),
        }
    }

    /// Record where a target was read from
    ///
    /// Unknown members, parameters and container elements are ignored.
    pub fn set_location(&mut self, target: &AnnotationTarget, location: SourceLocation) {
        match target {
            AnnotationTarget::Type(id) => self.schema_type_mut(*id).location = Some(location),
            AnnotationTarget::Property(id) => self.property_mut(*id).location = Some(location),
            AnnotationTarget::EnumMember { enum_type, member } => {
                if let Some(m) = self
                    .schema_type_mut(*enum_type)
                    .as_enum_mut()
                    .and_then(|e| e.members.iter_mut().find(|m| m.name == *member))
                {
                    m.location = Some(location);
                }
            }
            AnnotationTarget::Term(id) => self.term_mut(*id).location = Some(location),
            AnnotationTarget::Operation(id) | AnnotationTarget::ReturnType(id) => {
                self.operation_mut(*id).location = Some(location)
            }
            AnnotationTarget::Parameter { operation, parameter } => {
                if let Some(p) = self
                    .operation_mut(*operation)
                    .parameters
                    .iter_mut()
                    .find(|p| p.name == *parameter)
                {
                    p.location = Some(location);
                }
            }
            AnnotationTarget::Container(id) => self.container_mut(*id).location = Some(location),
            AnnotationTarget::ContainerElement { container, element } => {
                if let Some(e) = self.container_mut(*container).element_mut(element) {
                    e.location = Some(location);
                }
            }
            AnnotationTarget::Unresolved(_) => {}
        }
    }

    /// Top-level element that owns `target`
    pub fn target_element(&self, target: &AnnotationTarget) -> Option<SchemaElement> {
        target_owner(target, &self.properties)
    }

    /// Mutable container element by name
    pub fn container_element_mut(&mut self, container: ContainerId, name: &str) -> Option<&mut ContainerElement> {
        self.container_mut(container).element_mut(name)
    }

    // ---------------------------------------------------------------------
    // Vocabulary annotations
    // ---------------------------------------------------------------------

    /// Attach a vocabulary annotation
    pub fn add_vocabulary_annotation(&mut self, annotation: VocabularyAnnotation) {
        trace!(
            "Annotating {} with {:?}",
            self.target_path(&annotation.target),
            annotation.term
        );
        self.annotations.push(annotation);
    }

    /// All vocabulary annotations in insertion order
    pub fn vocabulary_annotations(&self) -> &[VocabularyAnnotation] {
        &self.annotations
    }

    /// Annotations attached to `target`
    pub fn annotations_for<'a>(&'a self, target: &'a AnnotationTarget) -> impl Iterator<Item = &'a VocabularyAnnotation> + 'a {
        self.annotations.iter().filter(move |a| &a.target == target)
    }

    /// Annotations of `term` on `target`, any qualifier
    pub fn find_vocabulary_annotations(&self, target: &AnnotationTarget, term: TermId) -> Vec<&VocabularyAnnotation> {
        self.annotations
            .iter()
            .filter(|a| &a.target == target && a.term_id() == Some(term))
            .collect()
    }

    /// Annotation of `term` on `target` with exactly `qualifier`
    pub fn find_vocabulary_annotation(
        &self,
        target: &AnnotationTarget,
        term: TermId,
        qualifier: Option<&str>,
    ) -> Option<&VocabularyAnnotation> {
        self.annotations
            .iter()
            .find(|a| &a.target == target && a.term_id() == Some(term) && a.qualifier.as_deref() == qualifier)
    }

    // ---------------------------------------------------------------------
    // Direct-value annotations
    // ---------------------------------------------------------------------

    /// Store an opaque value under (`namespace`, `name`) on `target`
    pub fn set_direct_value<T: Any + Send + Sync>(
        &mut self,
        target: impl Into<AnnotationTarget>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        value: T,
    ) {
        let key = DirectValueKey {
            target: target.into(),
            namespace: namespace.into(),
            name: name.into(),
        };
        self.direct_values.insert(key, DirectValue(Box::new(value)));
    }

    /// Typed access to a direct value
    ///
    /// A value stored under another type is an error, not a miss.
    pub fn direct_value<T: Any>(&self, target: &AnnotationTarget, namespace: &str, name: &str) -> Result<Option<&T>> {
        let key = DirectValueKey {
            target: target.clone(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        match self.direct_values.get(&key) {
            None => Ok(None),
            Some(DirectValue(value)) => {
                value
                    .downcast_ref::<T>()
                    .map(Some)
                    .ok_or_else(|| ModelError::DirectValueTypeMismatch {
                        namespace: namespace.to_string(),
                        name: name.to_string(),
                        expected: std::any::type_name::<T>(),
                    })
            }
        }
    }

    /// Remove a direct value, reporting whether one was present
    pub fn remove_direct_value(&mut self, target: &AnnotationTarget, namespace: &str, name: &str) -> bool {
        let key = DirectValueKey {
            target: target.clone(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        };
        self.direct_values.shift_remove(&key).is_some()
    }

    /// Direct values attached to `target`, in insertion order
    pub fn direct_value_annotations<'a>(&'a self, target: &'a AnnotationTarget) -> impl Iterator<Item = DirectValueAnnotation<'a>> + 'a {
        self.direct_values
            .iter()
            .filter(move |(key, _)| &key.target == target)
            .map(|(key, DirectValue(value))| DirectValueAnnotation {
                target: &key.target,
                namespace: &key.namespace,
                name: &key.name,
                value: value.as_ref(),
            })
    }
}

/// Top-level element an annotation target belongs to
fn target_owner(target: &AnnotationTarget, properties: &[Property]) -> Option<SchemaElement> {
    match target {
        AnnotationTarget::Type(id) | AnnotationTarget::EnumMember { enum_type: id, .. } => {
            Some(SchemaElement::Type(*id))
        }
        AnnotationTarget::Property(id) => properties
            .get(id.index())
            .and_then(|p| p.declaring_type)
            .map(SchemaElement::Type),
        AnnotationTarget::Term(id) => Some(SchemaElement::Term(*id)),
        AnnotationTarget::Operation(id)
        | AnnotationTarget::Parameter { operation: id, .. }
        | AnnotationTarget::ReturnType(id) => Some(SchemaElement::Operation(*id)),
        AnnotationTarget::Container(id) | AnnotationTarget::ContainerElement { container: id, .. } => {
            Some(SchemaElement::Container(*id))
        }
        AnnotationTarget::Unresolved(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Multiplicity;
    use crate::Expression;
    use pretty_assertions::assert_eq;

    fn names(model: &Model, properties: &[PropertyId]) -> Vec<String> {
        properties.iter().map(|p| model.property(*p).name.clone()).collect()
    }

    #[test]
    fn test_re_adding_element_is_no_op() {
        let mut model = Model::new();
        let t = model.create_entity_type("NS", "T");
        assert!(model.add_element(t));
        assert!(!model.add_element(t));
        assert_eq!(model.schema_elements().len(), 1);
    }

    #[test]
    fn test_colliding_names_are_accepted() {
        let mut model = Model::new();
        let a = model.add_entity_type("NS", "T");
        let b = model.add_complex_type("NS", "T");
        assert_eq!(model.schema_elements().len(), 2);
        assert_eq!(model.find_type("NS.T"), Some(a));
        assert_ne!(a, b);
    }

    #[test]
    fn test_lookup_is_case_sensitive_and_alias_aware() {
        let mut model = Model::new();
        let t = model.add_entity_type("Org.Sales", "Order");
        model.set_namespace_alias("Org.Sales", "S");
        assert_eq!(model.find_type("Org.Sales.Order"), Some(t));
        assert_eq!(model.find_type("S.Order"), Some(t));
        assert_eq!(model.find_type("org.sales.order"), None);
        assert!(model.find_operations("Org.Sales.Missing").is_empty());
    }

    #[test]
    fn test_properties_follow_base_chain_live() {
        let mut model = Model::new();
        let t1 = model.add_entity_type("NS", "T1");
        let t2 = model.add_entity_type("NS", "T2");
        let t3 = model.add_entity_type("NS", "T3");
        model.add_structural_property(t1, "A", TypeReference::int32(false)).unwrap();
        model.add_structural_property(t2, "B", TypeReference::int32(false)).unwrap();
        model.add_structural_property(t3, "C", TypeReference::int32(false)).unwrap();
        model.set_base_type(t2, Some(t1)).unwrap();
        model.set_base_type(t3, Some(t2)).unwrap();
        assert_eq!(names(&model, &model.properties(t3)), vec!["A", "B", "C"]);

        let replacement = model.add_entity_type("NS", "T2");
        model.add_structural_property(replacement, "X", TypeReference::int32(false)).unwrap();
        model.set_base_type(t3, Some(replacement)).unwrap();
        assert_eq!(names(&model, &model.properties(t3)), vec!["X", "C"]);
    }

    #[test]
    fn test_cycle_resolution_is_bounded() {
        let mut model = Model::new();
        let a = model.add_entity_type("NS", "A");
        let b = model.add_entity_type("NS", "B");
        let c = model.add_entity_type("NS", "C");
        model.set_base_type(a, Some(b)).unwrap();
        model.set_base_type(b, Some(a)).unwrap();
        model.set_base_type(c, Some(a)).unwrap();

        assert!(model.is_in_cycle(a));
        assert!(model.is_in_cycle(b));
        assert!(!model.is_in_cycle(c));
        assert_eq!(
            model.resolve_base_type(a),
            BaseTypeResolution::Cyclic(TypeCycle { members: vec![a, b] })
        );
        assert_eq!(model.ancestors(c), vec![a]);
        assert!(model.properties(a).is_empty());
    }

    #[test]
    fn test_self_cycle() {
        let mut model = Model::new();
        let a = model.add_complex_type("NS", "A");
        model.set_base_type(a, Some(a)).unwrap();
        assert!(model.is_in_cycle(a));
        assert_eq!(model.base_type(a), None);
    }

    #[test]
    fn test_add_property_rejects_other_owner() {
        let mut model = Model::new();
        let a = model.add_entity_type("NS", "A");
        let b = model.add_entity_type("NS", "B");
        let p = model.add_structural_property(a, "Id", TypeReference::int32(false)).unwrap();
        assert!(model.add_property(a, p).is_ok());
        assert_eq!(model.declared_properties(a).len(), 1);
        let err = model.add_property(b, p).unwrap_err();
        assert!(matches!(err, ModelError::PropertyAlreadyBound { .. }));
    }

    #[test]
    fn test_add_keys_appends_duplicates() {
        let mut model = Model::new();
        let t = model.add_entity_type("NS", "T");
        let id = model.add_structural_property(t, "Id", TypeReference::int32(false)).unwrap();
        model.add_keys(t, &[id, id]).unwrap();
        model.add_keys(t, &[id]).unwrap();
        assert_eq!(model.key(t), vec![id, id, id]);

        let complex = model.add_complex_type("NS", "C");
        assert!(matches!(model.add_keys(complex, &[id]), Err(ModelError::NotAnEntityType { .. })));
    }

    #[test]
    fn test_key_and_find_property_walk_inheritance() {
        let mut model = Model::new();
        let base = model.add_entity_type("NS", "Base");
        let derived = model.add_entity_type("NS", "Derived");
        let id = model.add_structural_property(base, "Id", TypeReference::int32(false)).unwrap();
        let shadow = model.add_structural_property(derived, "Id", TypeReference::string(true)).unwrap();
        model.add_keys(base, &[id]).unwrap();
        model.set_base_type(derived, Some(base)).unwrap();

        assert_eq!(model.key(derived), vec![id]);
        assert_eq!(model.find_property(derived, "Id"), Some(shadow));
        assert_eq!(model.derived_types(base), vec![derived]);
        assert!(model.is_or_inherits_from(derived, base));
    }

    #[test]
    fn test_bidirectional_navigation() {
        let mut model = Model::new();
        let customer = model.add_entity_type("NS", "Customer");
        let order = model.add_entity_type("NS", "Order");
        let (orders, customer_nav) = model
            .add_bidirectional_navigation(
                customer,
                NavigationPropertyInfo::new("Orders", order, Multiplicity::Many),
                NavigationPropertyInfo::new("Customer", customer, Multiplicity::One),
            )
            .unwrap();

        assert_eq!(model.property(orders).as_navigation().unwrap().partner, Some(customer_nav));
        assert_eq!(model.property(customer_nav).as_navigation().unwrap().partner, Some(orders));
        assert_eq!(model.to_entity_type(orders), Some(order));
        assert!(model.property(orders).type_ref().is_collection());
        assert_eq!(model.property(customer_nav).declaring_type(), Some(order));
        assert_eq!(model.partner_name(orders).as_deref(), Some("Customer"));
    }

    #[test]
    fn test_self_partner_and_synthesized_name() {
        let mut model = Model::new();
        let person = model.add_entity_type("NS", "Person");
        let spouse = model
            .add_unidirectional_navigation(person, NavigationPropertyInfo::new("Spouse", person, Multiplicity::ZeroOrOne))
            .unwrap();
        assert_eq!(model.partner_name(spouse).as_deref(), Some("Person_Spouse"));
        model.set_navigation_partners(spouse, spouse).unwrap();
        assert_eq!(model.partner_name(spouse).as_deref(), Some("Spouse"));
    }

    #[test]
    fn test_remove_element_drops_annotations() {
        let mut model = Model::new();
        let t = model.add_entity_type("NS", "T");
        let p = model.add_structural_property(t, "P", TypeReference::int32(true)).unwrap();
        let term = model.add_term("NS", "Label", TypeReference::string(true));
        model.add_vocabulary_annotation(VocabularyAnnotation::new(t, term, Expression::string("t")));
        model.add_vocabulary_annotation(VocabularyAnnotation::new(p, term, Expression::string("p")));
        model.add_vocabulary_annotation(VocabularyAnnotation::new(term, term, Expression::string("term")));
        model.set_direct_value(p, "urn:x", "Note", "hello".to_string());

        assert!(model.remove_element(t));
        assert_eq!(model.vocabulary_annotations().len(), 1);
        assert_eq!(model.direct_value::<String>(&p.into(), "urn:x", "Note"), Ok(None));
        assert!(!model.remove_element(t));
    }

    #[test]
    fn test_direct_value_checked_downcast() {
        let mut model = Model::new();
        let t = model.add_entity_type("NS", "T");
        let target = AnnotationTarget::from(t);
        model.set_direct_value(t, "urn:x", "Weight", 42i32);
        assert_eq!(model.direct_value::<i32>(&target, "urn:x", "Weight"), Ok(Some(&42)));
        assert!(matches!(
            model.direct_value::<String>(&target, "urn:x", "Weight"),
            Err(ModelError::DirectValueTypeMismatch { .. })
        ));
        assert_eq!(model.direct_value::<i32>(&target, "urn:x", "Height"), Ok(None));
    }

    #[test]
    fn test_qualified_annotation_lookup() {
        let mut model = Model::new();
        let t = model.add_entity_type("NS", "T");
        let term = model.add_term("NS", "Size", TypeReference::int32(true));
        model.add_vocabulary_annotation(VocabularyAnnotation::new(t, term, Expression::int(1)));
        model.add_vocabulary_annotation(VocabularyAnnotation::new(t, term, Expression::int(2)).with_qualifier("q"));

        let target = AnnotationTarget::from(t);
        assert_eq!(model.find_vocabulary_annotations(&target, term).len(), 2);
        let qualified = model.find_vocabulary_annotation(&target, term, Some("q")).unwrap();
        assert_eq!(*qualified.expression, Expression::int(2));
        let plain = model.find_vocabulary_annotation(&target, term, None).unwrap();
        assert_eq!(*plain.expression, Expression::int(1));
    }

    #[test]
    fn test_operation_signature_and_target_paths() {
        let mut model = Model::new();
        let customer = model.add_entity_type("NS", "Customer");
        let f = model.add_function("NS", "TopOrders", true, true, TypeReference::int32(false));
        model.add_parameter(f, "customer", TypeReference::schema(customer, false));
        model.add_parameter(f, "count", TypeReference::int32(false));
        let a = model.add_action("NS", "Reset", true, None);
        model.add_parameter(a, "customer", TypeReference::schema(customer, false));
        model.add_parameter(a, "hard", TypeReference::boolean(false));

        assert_eq!(model.operation_signature(f), "NS.TopOrders(NS.Customer,Edm.Int32)");
        assert_eq!(model.operation_signature(a), "NS.Reset(NS.Customer)");
        assert_eq!(
            model.target_path(&AnnotationTarget::Parameter {
                operation: f,
                parameter: "count".to_string()
            }),
            "NS.TopOrders(NS.Customer,Edm.Int32)/count"
        );
        assert_eq!(model.bound_operations(customer), vec![f, a]);
        assert_eq!(
            model.location_of(&AnnotationTarget::Type(customer)),
            EdmLocation::element("NS.Customer")
        );
    }

    #[test]
    fn test_navigation_bindings() {
        let mut model = Model::new();
        let customer = model.add_entity_type("NS", "Customer");
        let order = model.add_entity_type("NS", "Order");
        let orders = model
            .add_unidirectional_navigation(customer, NavigationPropertyInfo::new("Orders", order, Multiplicity::Many))
            .unwrap();
        let c = model.add_entity_container("NS", "Default");
        model.add_entity_set(c, "Customers", TypeReference::schema(customer, false));
        model.add_entity_set(c, "Orders", TypeReference::schema(order, false));
        model.add_entity_set(c, "ArchivedOrders", TypeReference::schema(order, false));
        model.add_navigation_binding(c, "Customers", orders, "Orders").unwrap();
        model
            .add_navigation_binding_with_path(c, "Customers", Some(orders), "NS.VipCustomer/Orders", "NS.Default/ArchivedOrders")
            .unwrap();

        let (_, target) = model.find_navigation_target(c, "Customers", orders, None).unwrap();
        assert_eq!(target.name, "Orders");
        let (_, target) = model
            .find_navigation_target(c, "Customers", orders, Some("NS.VipCustomer/Orders"))
            .unwrap();
        assert_eq!(target.name, "ArchivedOrders");
        assert!(model.add_navigation_binding(c, "Missing", orders, "Orders").is_err());
    }

    #[test]
    fn test_resolve_type_name() {
        let mut model = Model::new();
        let t = model.add_complex_type("NS", "Address");
        assert_eq!(model.resolve_type_name("Edm.String"), TypeDefinition::Primitive(PrimitiveKind::String));
        assert_eq!(model.resolve_type_name("NS.Address"), TypeDefinition::Schema(t));
        let collection = model.resolve_type_name("Collection(NS.Address)");
        assert_eq!(model.type_definition_name(&collection), "Collection(NS.Address)");
        assert_eq!(model.resolve_type_name("NS.Nope"), TypeDefinition::Unresolved("NS.Nope".to_string()));
    }
}
