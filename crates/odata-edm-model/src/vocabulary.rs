//! Terms, vocabulary annotations and direct-value annotations

use crate::expression::Expression;
use crate::names::qualified_name;
use crate::{AnnotationTarget, TermId, TypeReference};
use odata_edm_diagnostics::SourceLocation;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A vocabulary term
#[derive(Debug, Clone)]
pub struct Term {
    pub namespace: String,
    pub name: String,
    pub type_ref: TypeReference,
    /// Space-separated CSDL element names the term may be applied to
    pub applies_to: Option<String>,
    pub default_value: Option<String>,
    pub location: Option<SourceLocation>,
}

impl Term {
    /// `Namespace.Name`
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.namespace, &self.name)
    }
}

/// Term of an annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermRef {
    Resolved(TermId),
    /// Qualified name that did not resolve when the annotation was read
    Unresolved(String),
}

impl From<TermId> for TermRef {
    fn from(id: TermId) -> Self {
        Self::Resolved(id)
    }
}

/// Where the writer places an annotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AnnotationPlacement {
    /// Nested inside the annotated element
    Inline,
    /// In an `Annotations` block targeting the element
    #[default]
    OutOfLine,
}

/// (target, term, qualifier) bound to an expression
#[derive(Debug, Clone)]
pub struct VocabularyAnnotation {
    pub target: AnnotationTarget,
    pub term: TermRef,
    pub qualifier: Option<String>,
    pub expression: Arc<Expression>,
    pub placement: AnnotationPlacement,
    /// Schema namespace that hosts an out-of-line annotation
    pub hosting_namespace: Option<String>,
    pub location: Option<SourceLocation>,
}

impl VocabularyAnnotation {
    /// Out-of-line, unqualified annotation
    pub fn new(target: impl Into<AnnotationTarget>, term: impl Into<TermRef>, expression: Expression) -> Self {
        Self {
            target: target.into(),
            term: term.into(),
            qualifier: None,
            expression: Arc::new(expression),
            placement: AnnotationPlacement::OutOfLine,
            hosting_namespace: None,
            location: None,
        }
    }

    /// Set the qualifier
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    /// Place the annotation inline
    pub fn inline(mut self) -> Self {
        self.placement = AnnotationPlacement::Inline;
        self
    }

    /// Host the annotation in a different schema namespace
    pub fn hosted_in(mut self, namespace: impl Into<String>) -> Self {
        self.hosting_namespace = Some(namespace.into());
        self
    }

    /// Resolved term handle
    pub fn term_id(&self) -> Option<TermId> {
        match &self.term {
            TermRef::Resolved(id) => Some(*id),
            TermRef::Unresolved(_) => None,
        }
    }
}

/// Key of a direct-value annotation slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DirectValueKey {
    pub(crate) target: AnnotationTarget,
    pub(crate) namespace: String,
    pub(crate) name: String,
}

/// Opaque direct-value payload
pub(crate) struct DirectValue(pub(crate) Box<dyn Any + Send + Sync>);

impl fmt::Debug for DirectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.downcast_ref::<String>() {
            Some(s) => write!(f, "DirectValue({:?})", s),
            None => f.write_str("DirectValue(..)"),
        }
    }
}

/// One direct-value annotation as seen from outside the model
#[derive(Debug, Clone, Copy)]
pub struct DirectValueAnnotation<'a> {
    pub target: &'a AnnotationTarget,
    pub namespace: &'a str,
    pub name: &'a str,
    pub(crate) value: &'a (dyn Any + Send + Sync),
}

impl<'a> DirectValueAnnotation<'a> {
    /// Payload as `T`, if it has that type
    pub fn value<T: Any>(&self) -> Option<&'a T> {
        self.value.downcast_ref::<T>()
    }
}
