//! Type references: a type plus nullability and facets

use crate::TypeId;
use crate::primitive::PrimitiveKind;
use std::fmt;

/// MaxLength facet value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaxLength {
    /// Concrete bound
    Bounded(u32),
    /// `max` - explicitly unbounded
    Max,
}

/// Scale facet value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scale {
    /// Concrete scale
    Fixed(u32),
    /// `variable` - scale varies per value
    Variable,
}

/// SRID facet value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Srid {
    /// Concrete spatial reference system id
    Value(i32),
    /// `variable` - SRID varies per value
    Variable,
}

/// Facets of a type reference; `None` means "unset"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Facets {
    pub max_length: Option<MaxLength>,
    pub unicode: Option<bool>,
    pub precision: Option<u32>,
    pub scale: Option<Scale>,
    pub srid: Option<Srid>,
}

impl Facets {
    /// Check if no facet is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// What a type reference points at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDefinition {
    /// Built-in primitive
    Primitive(PrimitiveKind),
    /// Entity, complex or enum type of the model
    Schema(TypeId),
    /// `Collection(element)`
    Collection(Box<TypeReference>),
    /// Reference to an entity (`Ref` in annotation terms)
    EntityReference(TypeId),
    /// Qualified name that did not resolve when the reference was read
    Unresolved(String),
}

/// A type plus nullability and facets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeReference {
    pub definition: TypeDefinition,
    pub nullable: bool,
    pub facets: Facets,
}

impl TypeReference {
    /// Create a reference to any definition
    pub fn new(definition: TypeDefinition, nullable: bool) -> Self {
        Self {
            definition,
            nullable,
            facets: Facets::default(),
        }
    }

    /// Reference to a primitive type
    pub fn primitive(kind: PrimitiveKind, nullable: bool) -> Self {
        Self::new(TypeDefinition::Primitive(kind), nullable)
    }

    /// `Edm.String`
    pub fn string(nullable: bool) -> Self {
        Self::primitive(PrimitiveKind::String, nullable)
    }

    /// `Edm.Int32`
    pub fn int32(nullable: bool) -> Self {
        Self::primitive(PrimitiveKind::Int32, nullable)
    }

    /// `Edm.Boolean`
    pub fn boolean(nullable: bool) -> Self {
        Self::primitive(PrimitiveKind::Boolean, nullable)
    }

    /// `Edm.Binary`
    pub fn binary(nullable: bool) -> Self {
        Self::primitive(PrimitiveKind::Binary, nullable)
    }

    /// `Edm.Decimal` with optional precision and scale
    pub fn decimal(nullable: bool, precision: Option<u32>, scale: Option<Scale>) -> Self {
        let mut reference = Self::primitive(PrimitiveKind::Decimal, nullable);
        reference.facets.precision = precision;
        reference.facets.scale = scale;
        reference
    }

    /// Reference to an entity, complex or enum type
    pub fn schema(id: TypeId, nullable: bool) -> Self {
        Self::new(TypeDefinition::Schema(id), nullable)
    }

    /// `Collection(element)`
    ///
    /// Nullability of a collection is carried by its element type.
    pub fn collection(element: TypeReference) -> Self {
        Self::new(TypeDefinition::Collection(Box::new(element)), false)
    }

    /// Reference to an entity
    pub fn entity_reference(id: TypeId, nullable: bool) -> Self {
        Self::new(TypeDefinition::EntityReference(id), nullable)
    }

    /// Unresolvable named type
    pub fn unresolved(name: impl Into<String>, nullable: bool) -> Self {
        Self::new(TypeDefinition::Unresolved(name.into()), nullable)
    }

    /// Set MaxLength
    pub fn with_max_length(mut self, max_length: MaxLength) -> Self {
        self.facets.max_length = Some(max_length);
        self
    }

    /// Set Unicode
    pub fn with_unicode(mut self, unicode: bool) -> Self {
        self.facets.unicode = Some(unicode);
        self
    }

    /// Set Precision
    pub fn with_precision(mut self, precision: u32) -> Self {
        self.facets.precision = Some(precision);
        self
    }

    /// Set Scale
    pub fn with_scale(mut self, scale: Scale) -> Self {
        self.facets.scale = Some(scale);
        self
    }

    /// Set SRID
    pub fn with_srid(mut self, srid: Srid) -> Self {
        self.facets.srid = Some(srid);
        self
    }

    /// Same reference with different nullability
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Primitive kind, if this is a primitive reference
    pub fn as_primitive(&self) -> Option<PrimitiveKind> {
        match &self.definition {
            TypeDefinition::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Schema type handle, if this references a model type directly
    pub fn as_schema_type(&self) -> Option<TypeId> {
        match &self.definition {
            TypeDefinition::Schema(id) => Some(*id),
            _ => None,
        }
    }

    /// Check if this is a collection
    pub fn is_collection(&self) -> bool {
        matches!(self.definition, TypeDefinition::Collection(_))
    }

    /// Element type of a collection
    pub fn element_type(&self) -> Option<&TypeReference> {
        match &self.definition {
            TypeDefinition::Collection(element) => Some(element),
            _ => None,
        }
    }

    /// This reference, or its element type for a collection
    pub fn element_or_self(&self) -> &TypeReference {
        self.element_type().unwrap_or(self)
    }

    /// Check if the type could not be resolved
    pub fn is_unresolved(&self) -> bool {
        match &self.definition {
            TypeDefinition::Unresolved(_) => true,
            TypeDefinition::Collection(element) => element.is_unresolved(),
            _ => false,
        }
    }
}

impl fmt::Display for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(kind) => write!(f, "{}", kind),
            Self::Schema(id) | Self::EntityReference(id) => write!(f, "{}", id),
            Self::Collection(element) => write!(f, "Collection({})", element.definition),
            Self::Unresolved(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facets_distinguish_unset_variable_and_value() {
        let unset = TypeReference::decimal(true, None, None);
        let variable = TypeReference::decimal(true, None, Some(Scale::Variable));
        let fixed = TypeReference::decimal(true, None, Some(Scale::Fixed(0)));
        assert_ne!(unset, variable);
        assert_ne!(variable, fixed);
        assert!(unset.facets.is_empty());
    }

    #[test]
    fn test_collection_element() {
        let element = TypeReference::string(false).with_max_length(MaxLength::Max);
        let collection = TypeReference::collection(element.clone());
        assert!(collection.is_collection());
        assert_eq!(collection.element_type(), Some(&element));
        assert_eq!(collection.element_or_self(), &element);
    }

    #[test]
    fn test_unresolved_propagates_through_collection() {
        let reference = TypeReference::collection(TypeReference::unresolved("NS.Missing", true));
        assert!(reference.is_unresolved());
        assert_eq!(reference.definition.to_string(), "Collection(NS.Missing)");
    }
}
