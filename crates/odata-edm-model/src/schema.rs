//! Structured types, enum types and properties

use crate::names::qualified_name;
use crate::primitive::PrimitiveKind;
use crate::{PropertyId, TypeId, TypeReference};
use odata_edm_diagnostics::SourceLocation;
use std::fmt;
use std::str::FromStr;

/// An entity, complex or enum type
#[derive(Debug, Clone)]
pub struct SchemaType {
    pub namespace: String,
    pub name: String,
    pub kind: SchemaTypeKind,
    pub location: Option<SourceLocation>,
}

/// Kind-specific part of a schema type
#[derive(Debug, Clone)]
pub enum SchemaTypeKind {
    Entity(StructuredType),
    Complex(StructuredType),
    Enum(EnumType),
}

impl SchemaType {
    /// `Namespace.Name`
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.namespace, &self.name)
    }

    /// Check if this is an entity type
    pub fn is_entity(&self) -> bool {
        matches!(self.kind, SchemaTypeKind::Entity(_))
    }

    /// Check if this is a complex type
    pub fn is_complex(&self) -> bool {
        matches!(self.kind, SchemaTypeKind::Complex(_))
    }

    /// Check if this is an enum type
    pub fn is_enum(&self) -> bool {
        matches!(self.kind, SchemaTypeKind::Enum(_))
    }

    /// Structured part of an entity or complex type
    pub fn as_structured(&self) -> Option<&StructuredType> {
        match &self.kind {
            SchemaTypeKind::Entity(s) | SchemaTypeKind::Complex(s) => Some(s),
            SchemaTypeKind::Enum(_) => None,
        }
    }

    /// Mutable structured part of an entity or complex type
    pub fn as_structured_mut(&mut self) -> Option<&mut StructuredType> {
        match &mut self.kind {
            SchemaTypeKind::Entity(s) | SchemaTypeKind::Complex(s) => Some(s),
            SchemaTypeKind::Enum(_) => None,
        }
    }

    /// Enum part of an enum type
    pub fn as_enum(&self) -> Option<&EnumType> {
        match &self.kind {
            SchemaTypeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Mutable enum part of an enum type
    pub fn as_enum_mut(&mut self) -> Option<&mut EnumType> {
        match &mut self.kind {
            SchemaTypeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// CSDL element name for this kind
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            SchemaTypeKind::Entity(_) => "EntityType",
            SchemaTypeKind::Complex(_) => "ComplexType",
            SchemaTypeKind::Enum(_) => "EnumType",
        }
    }
}

/// Entity or complex type body
///
/// `base_type` is a plain handle: reassigning it changes what derived types
/// see on the next traversal.
#[derive(Debug, Clone, Default)]
pub struct StructuredType {
    pub base_type: Option<TypeId>,
    pub is_abstract: bool,
    pub is_open: bool,
    /// Entity types only
    pub has_stream: bool,
    pub(crate) declared_properties: Vec<PropertyId>,
    pub(crate) declared_key: Vec<PropertyId>,
}

impl StructuredType {
    /// Properties declared directly on this type, in declaration order
    pub fn declared_properties(&self) -> &[PropertyId] {
        &self.declared_properties
    }

    /// Key declared directly on this type, duplicates included
    pub fn declared_key(&self) -> &[PropertyId] {
        &self.declared_key
    }
}

/// Enum type body
#[derive(Debug, Clone)]
pub struct EnumType {
    pub underlying_type: PrimitiveKind,
    pub is_flags: bool,
    pub(crate) members: Vec<EnumMember>,
}

impl EnumType {
    /// Members in declaration order
    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    /// Find a member by name
    pub fn member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Members sorted by name, the order used for serialization
    pub fn members_by_name(&self) -> Vec<&EnumMember> {
        let mut members: Vec<&EnumMember> = self.members.iter().collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        members
    }
}

/// Named enum value; values need not be distinct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
    pub location: Option<SourceLocation>,
}

/// A structural or navigation property
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub(crate) declaring_type: Option<TypeId>,
    pub kind: PropertyKind,
    pub location: Option<SourceLocation>,
}

impl Property {
    /// Type that declares this property, once added to one
    pub fn declaring_type(&self) -> Option<TypeId> {
        self.declaring_type
    }

    /// Declared type of the property
    pub fn type_ref(&self) -> &TypeReference {
        match &self.kind {
            PropertyKind::Structural(s) => &s.type_ref,
            PropertyKind::Navigation(n) => &n.target,
        }
    }

    /// Navigation part, if this is a navigation property
    pub fn as_navigation(&self) -> Option<&NavigationProperty> {
        match &self.kind {
            PropertyKind::Navigation(n) => Some(n),
            PropertyKind::Structural(_) => None,
        }
    }

    /// Mutable navigation part
    pub fn as_navigation_mut(&mut self) -> Option<&mut NavigationProperty> {
        match &mut self.kind {
            PropertyKind::Navigation(n) => Some(n),
            PropertyKind::Structural(_) => None,
        }
    }

    /// Structural part, if this is a structural property
    pub fn as_structural(&self) -> Option<&StructuralProperty> {
        match &self.kind {
            PropertyKind::Structural(s) => Some(s),
            PropertyKind::Navigation(_) => None,
        }
    }

    pub fn as_structural_mut(&mut self) -> Option<&mut StructuralProperty> {
        match &mut self.kind {
            PropertyKind::Structural(s) => Some(s),
            PropertyKind::Navigation(_) => None,
        }
    }

    /// Check if this is a navigation property
    pub fn is_navigation(&self) -> bool {
        matches!(self.kind, PropertyKind::Navigation(_))
    }
}

/// Kind-specific part of a property
#[derive(Debug, Clone)]
pub enum PropertyKind {
    Structural(StructuralProperty),
    Navigation(NavigationProperty),
}

/// Structural property body
#[derive(Debug, Clone)]
pub struct StructuralProperty {
    pub type_ref: TypeReference,
    pub default_value: Option<String>,
}

/// Navigation property body
#[derive(Debug, Clone)]
pub struct NavigationProperty {
    /// Entity type or collection of entity type
    pub target: TypeReference,
    /// Mutual inverse; may be the property itself
    pub partner: Option<PropertyId>,
    pub contains_target: bool,
    pub on_delete: Option<OnDeleteAction>,
    /// Properties of the declaring type
    pub dependent_properties: Vec<PropertyId>,
    /// Properties of the target type, paired by position with the dependents
    pub principal_properties: Vec<PropertyId>,
}

/// Action taken on dependents when the principal is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnDeleteAction {
    None,
    Cascade,
    SetNull,
    SetDefault,
}

impl OnDeleteAction {
    /// CSDL spelling
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Cascade => "Cascade",
            Self::SetNull => "SetNull",
            Self::SetDefault => "SetDefault",
        }
    }
}

impl FromStr for OnDeleteAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "Cascade" => Ok(Self::Cascade),
            "SetNull" => Ok(Self::SetNull),
            "SetDefault" => Ok(Self::SetDefault),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for OnDeleteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How many targets a navigation property reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Multiplicity {
    ZeroOrOne,
    One,
    Many,
}

/// Builder input for navigation properties
#[derive(Debug, Clone)]
pub struct NavigationPropertyInfo {
    pub name: String,
    pub target: TypeId,
    pub multiplicity: Multiplicity,
    pub contains_target: bool,
    pub on_delete: Option<OnDeleteAction>,
    pub dependent_properties: Vec<PropertyId>,
    pub principal_properties: Vec<PropertyId>,
}

impl NavigationPropertyInfo {
    /// Navigation named `name` reaching `target` with `multiplicity`
    pub fn new(name: impl Into<String>, target: TypeId, multiplicity: Multiplicity) -> Self {
        Self {
            name: name.into(),
            target,
            multiplicity,
            contains_target: false,
            on_delete: None,
            dependent_properties: Vec::new(),
            principal_properties: Vec::new(),
        }
    }

    /// Mark the target as contained
    pub fn contained(mut self) -> Self {
        self.contains_target = true;
        self
    }

    /// Set the on-delete action
    pub fn with_on_delete(mut self, action: OnDeleteAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    /// Add a referential constraint pair
    pub fn with_constraint(mut self, dependent: PropertyId, principal: PropertyId) -> Self {
        self.dependent_properties.push(dependent);
        self.principal_properties.push(principal);
        self
    }

    pub(crate) fn target_reference(&self) -> TypeReference {
        match self.multiplicity {
            Multiplicity::Many => TypeReference::collection(TypeReference::schema(self.target, false)),
            Multiplicity::ZeroOrOne => TypeReference::schema(self.target, true),
            Multiplicity::One => TypeReference::schema(self.target, false),
        }
    }
}
