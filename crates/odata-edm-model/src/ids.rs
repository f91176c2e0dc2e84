//! Stable handles into a model's element arena
//!
//! A handle is only meaningful for the [`Model`](crate::Model) that created it.
//! Handles never dangle: removing an element from a model's schema element list
//! keeps its arena slot alive, so old handles keep resolving.

use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Handle of an entity, complex or enum type
    TypeId,
    "type"
);
arena_id!(
    /// Handle of a structural or navigation property
    PropertyId,
    "property"
);
arena_id!(
    /// Handle of an action or function
    OperationId,
    "operation"
);
arena_id!(
    /// Handle of a vocabulary term
    TermId,
    "term"
);
arena_id!(
    /// Handle of an entity container
    ContainerId,
    "container"
);

/// A top-level element of a model's schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaElement {
    Type(TypeId),
    Operation(OperationId),
    Term(TermId),
    Container(ContainerId),
}

impl From<TypeId> for SchemaElement {
    fn from(id: TypeId) -> Self {
        Self::Type(id)
    }
}

impl From<OperationId> for SchemaElement {
    fn from(id: OperationId) -> Self {
        Self::Operation(id)
    }
}

impl From<TermId> for SchemaElement {
    fn from(id: TermId) -> Self {
        Self::Term(id)
    }
}

impl From<ContainerId> for SchemaElement {
    fn from(id: ContainerId) -> Self {
        Self::Container(id)
    }
}

/// An element a vocabulary or direct-value annotation can be attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AnnotationTarget {
    Type(TypeId),
    Property(PropertyId),
    EnumMember { enum_type: TypeId, member: String },
    Term(TermId),
    Operation(OperationId),
    Parameter { operation: OperationId, parameter: String },
    ReturnType(OperationId),
    Container(ContainerId),
    ContainerElement { container: ContainerId, element: String },
    /// Target path that could not be resolved while reading a document
    Unresolved(String),
}

impl From<SchemaElement> for AnnotationTarget {
    fn from(element: SchemaElement) -> Self {
        match element {
            SchemaElement::Type(id) => Self::Type(id),
            SchemaElement::Operation(id) => Self::Operation(id),
            SchemaElement::Term(id) => Self::Term(id),
            SchemaElement::Container(id) => Self::Container(id),
        }
    }
}

impl From<TypeId> for AnnotationTarget {
    fn from(id: TypeId) -> Self {
        Self::Type(id)
    }
}

impl From<PropertyId> for AnnotationTarget {
    fn from(id: PropertyId) -> Self {
        Self::Property(id)
    }
}

impl From<TermId> for AnnotationTarget {
    fn from(id: TermId) -> Self {
        Self::Term(id)
    }
}

impl From<OperationId> for AnnotationTarget {
    fn from(id: OperationId) -> Self {
        Self::Operation(id)
    }
}

impl From<ContainerId> for AnnotationTarget {
    fn from(id: ContainerId) -> Self {
        Self::Container(id)
    }
}
