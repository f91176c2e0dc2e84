//! Entity containers and their elements

use crate::names::qualified_name;
use crate::{OperationId, PropertyId, TypeReference};
use odata_edm_diagnostics::SourceLocation;

/// An entity container
#[derive(Debug, Clone)]
pub struct EntityContainer {
    pub namespace: String,
    pub name: String,
    pub(crate) elements: Vec<ContainerElement>,
    pub location: Option<SourceLocation>,
}

impl EntityContainer {
    /// `Namespace.Name`
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.namespace, &self.name)
    }

    /// Elements in insertion order
    pub fn elements(&self) -> &[ContainerElement] {
        &self.elements
    }

    /// First element named `name`
    pub fn element(&self, name: &str) -> Option<&ContainerElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub(crate) fn element_mut(&mut self, name: &str) -> Option<&mut ContainerElement> {
        self.elements.iter_mut().find(|e| e.name == name)
    }
}

/// Entity set, singleton or operation import
#[derive(Debug, Clone)]
pub struct ContainerElement {
    pub name: String,
    pub kind: ContainerElementKind,
    pub location: Option<SourceLocation>,
}

impl ContainerElement {
    /// Entity type of a set or singleton
    pub fn entity_type(&self) -> Option<&TypeReference> {
        match &self.kind {
            ContainerElementKind::EntitySet(set) => Some(&set.entity_type),
            ContainerElementKind::Singleton(singleton) => Some(&singleton.entity_type),
            _ => None,
        }
    }

    /// Navigation bindings of a set or singleton
    pub fn bindings(&self) -> &[NavigationBinding] {
        match &self.kind {
            ContainerElementKind::EntitySet(set) => &set.bindings,
            ContainerElementKind::Singleton(singleton) => &singleton.bindings,
            _ => &[],
        }
    }

    pub(crate) fn bindings_mut(&mut self) -> Option<&mut Vec<NavigationBinding>> {
        match &mut self.kind {
            ContainerElementKind::EntitySet(set) => Some(&mut set.bindings),
            ContainerElementKind::Singleton(singleton) => Some(&mut singleton.bindings),
            _ => None,
        }
    }

    /// Operation import body
    pub fn as_operation_import(&self) -> Option<&OperationImport> {
        match &self.kind {
            ContainerElementKind::ActionImport(import)
            | ContainerElementKind::FunctionImport(import) => Some(import),
            _ => None,
        }
    }

    /// CSDL element name for this kind
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ContainerElementKind::EntitySet(_) => "EntitySet",
            ContainerElementKind::Singleton(_) => "Singleton",
            ContainerElementKind::ActionImport(_) => "ActionImport",
            ContainerElementKind::FunctionImport(_) => "FunctionImport",
        }
    }
}

/// Kind-specific part of a container element
#[derive(Debug, Clone)]
pub enum ContainerElementKind {
    EntitySet(EntitySet),
    Singleton(Singleton),
    ActionImport(OperationImport),
    FunctionImport(OperationImport),
}

/// Entity set body
#[derive(Debug, Clone)]
pub struct EntitySet {
    pub entity_type: TypeReference,
    pub include_in_service_document: bool,
    pub(crate) bindings: Vec<NavigationBinding>,
}

/// Singleton body
#[derive(Debug, Clone)]
pub struct Singleton {
    pub entity_type: TypeReference,
    pub(crate) bindings: Vec<NavigationBinding>,
}

/// Reference to an operation by handle or unresolved qualified name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationRef {
    Resolved(OperationId),
    Unresolved(String),
}

/// Action or function import body
#[derive(Debug, Clone)]
pub struct OperationImport {
    pub operation: OperationRef,
    /// Name or path of the entity set results belong to
    pub entity_set: Option<String>,
    /// Function imports only
    pub include_in_service_document: bool,
}

/// Navigation-property-to-target binding on a set or singleton
///
/// Bindings are keyed by navigation property and binding path. The path is
/// the navigation property name unless the property is reached through
/// complex or contained sub-structure or a type cast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationBinding {
    /// `None` when the path did not resolve to a navigation property
    pub navigation_property: Option<PropertyId>,
    pub path: String,
    /// Target set or singleton, optionally container-qualified
    pub target: String,
    pub location: Option<SourceLocation>,
}
