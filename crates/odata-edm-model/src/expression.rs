//! Annotation expressions
//!
//! Expressions are immutable trees. Child expressions are shared through
//! `Arc` so evaluators and validators can hold on to sub-trees cheaply.

use crate::container::OperationRef;
use crate::primitive::PrimitiveKind;
use crate::{TypeDefinition, TypeReference};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use odata_edm_diagnostics::SourceLocation;
use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// An expression node with optional source provenance
///
/// Equality compares the expression structure only, never the location.
#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub location: Option<SourceLocation>,
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

/// Expression variants
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Null,
    Constant(Constant),
    /// Constant whose literal text could not be parsed
    Malformed { kind: ConstantKind, text: String },
    /// Property path; zero segments denotes the context itself
    Path(Vec<String>),
    Apply {
        function: OperationRef,
        arguments: Vec<Arc<Expression>>,
    },
    If {
        condition: Arc<Expression>,
        then_branch: Arc<Expression>,
        else_branch: Arc<Expression>,
    },
    IsOf {
        operand: Arc<Expression>,
        type_ref: TypeReference,
    },
    Cast {
        operand: Arc<Expression>,
        type_ref: TypeReference,
    },
    Record {
        type_ref: Option<TypeReference>,
        properties: Vec<PropertyConstructor>,
    },
    Collection {
        element_type: Option<TypeReference>,
        elements: Vec<Arc<Expression>>,
    },
    LabeledElement {
        name: String,
        operand: Arc<Expression>,
    },
    LabeledElementReference(String),
    EnumMember(Vec<EnumMemberRef>),
}

/// Typed constant value
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Binary(Vec<u8>),
    Bool(bool),
    Date(NaiveDate),
    DateTimeOffset(DateTime<FixedOffset>),
    Decimal(Decimal),
    Duration(chrono::Duration),
    Float(f64),
    Guid(Uuid),
    Int(i64),
    String(String),
    TimeOfDay(NaiveTime),
}

impl Constant {
    /// Kind of this constant
    pub fn kind(&self) -> ConstantKind {
        match self {
            Self::Binary(_) => ConstantKind::Binary,
            Self::Bool(_) => ConstantKind::Bool,
            Self::Date(_) => ConstantKind::Date,
            Self::DateTimeOffset(_) => ConstantKind::DateTimeOffset,
            Self::Decimal(_) => ConstantKind::Decimal,
            Self::Duration(_) => ConstantKind::Duration,
            Self::Float(_) => ConstantKind::Float,
            Self::Guid(_) => ConstantKind::Guid,
            Self::Int(_) => ConstantKind::Int,
            Self::String(_) => ConstantKind::String,
            Self::TimeOfDay(_) => ConstantKind::TimeOfDay,
        }
    }
}

/// Kind of a constant expression, named after its CSDL element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantKind {
    Binary,
    Bool,
    Date,
    DateTimeOffset,
    Decimal,
    Duration,
    Float,
    Guid,
    Int,
    String,
    TimeOfDay,
}

impl ConstantKind {
    /// All constant kinds
    pub const ALL: [ConstantKind; 11] = [
        Self::Binary,
        Self::Bool,
        Self::Date,
        Self::DateTimeOffset,
        Self::Decimal,
        Self::Duration,
        Self::Float,
        Self::Guid,
        Self::Int,
        Self::String,
        Self::TimeOfDay,
    ];

    /// CSDL element and attribute name
    pub const fn element_name(&self) -> &'static str {
        match self {
            Self::Binary => "Binary",
            Self::Bool => "Bool",
            Self::Date => "Date",
            Self::DateTimeOffset => "DateTimeOffset",
            Self::Decimal => "Decimal",
            Self::Duration => "Duration",
            Self::Float => "Float",
            Self::Guid => "Guid",
            Self::Int => "Int",
            Self::String => "String",
            Self::TimeOfDay => "TimeOfDay",
        }
    }

    /// Look up a kind by CSDL element name
    pub fn from_element_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.element_name() == name)
    }

    /// Primitive kind a constant of this kind naturally has
    pub const fn primitive_kind(&self) -> PrimitiveKind {
        match self {
            Self::Binary => PrimitiveKind::Binary,
            Self::Bool => PrimitiveKind::Boolean,
            Self::Date => PrimitiveKind::Date,
            Self::DateTimeOffset => PrimitiveKind::DateTimeOffset,
            Self::Decimal => PrimitiveKind::Decimal,
            Self::Duration => PrimitiveKind::Duration,
            Self::Float => PrimitiveKind::Double,
            Self::Guid => PrimitiveKind::Guid,
            Self::Int => PrimitiveKind::Int64,
            Self::String => PrimitiveKind::String,
            Self::TimeOfDay => PrimitiveKind::TimeOfDay,
        }
    }

    /// Check if a constant of this kind may be asserted as `target`
    ///
    /// Integers promote to every integral, floating and decimal kind;
    /// floats promote to every floating kind and decimal.
    pub fn is_compatible_with(&self, target: PrimitiveKind) -> bool {
        match self {
            Self::Int => target.is_integer() || target.is_floating() || target == PrimitiveKind::Decimal,
            Self::Float => target.is_floating() || target == PrimitiveKind::Decimal,
            Self::Decimal => target == PrimitiveKind::Decimal,
            Self::Binary => matches!(target, PrimitiveKind::Binary | PrimitiveKind::Stream),
            other => other.primitive_kind() == target,
        }
    }
}

impl fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.element_name())
    }
}

/// `Property` plus value expression inside a record
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyConstructor {
    pub name: String,
    pub value: Arc<Expression>,
    pub location: Option<SourceLocation>,
}

impl PropertyConstructor {
    /// Constructor for property `name`
    pub fn new(name: impl Into<String>, value: Expression) -> Self {
        Self {
            name: name.into(),
            value: Arc::new(value),
            location: None,
        }
    }
}

/// `EnumType/Member` reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMemberRef {
    /// `Schema(id)` or `Unresolved(name)`
    pub enum_type: TypeDefinition,
    pub member: String,
}

impl Expression {
    /// Expression of the given kind without location
    pub fn new(kind: ExpressionKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    /// Attach a source location
    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn null() -> Self {
        Self::new(ExpressionKind::Null)
    }

    pub fn constant(constant: Constant) -> Self {
        Self::new(ExpressionKind::Constant(constant))
    }

    pub fn int(value: i64) -> Self {
        Self::constant(Constant::Int(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::constant(Constant::String(value.into()))
    }

    pub fn bool(value: bool) -> Self {
        Self::constant(Constant::Bool(value))
    }

    pub fn float(value: f64) -> Self {
        Self::constant(Constant::Float(value))
    }

    pub fn decimal(value: Decimal) -> Self {
        Self::constant(Constant::Decimal(value))
    }

    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        Self::constant(Constant::Binary(value.into()))
    }

    /// Constant whose literal failed to parse
    pub fn malformed(kind: ConstantKind, text: impl Into<String>) -> Self {
        Self::new(ExpressionKind::Malformed {
            kind,
            text: text.into(),
        })
    }

    /// Path from `/`-separated text; the empty string is the zero-segment path
    pub fn path(path: &str) -> Self {
        let segments = if path.is_empty() {
            Vec::new()
        } else {
            path.split('/').map(str::to_string).collect()
        };
        Self::new(ExpressionKind::Path(segments))
    }

    pub fn apply(function: OperationRef, arguments: Vec<Expression>) -> Self {
        Self::new(ExpressionKind::Apply {
            function,
            arguments: arguments.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn if_else(condition: Expression, then_branch: Expression, else_branch: Expression) -> Self {
        Self::new(ExpressionKind::If {
            condition: Arc::new(condition),
            then_branch: Arc::new(then_branch),
            else_branch: Arc::new(else_branch),
        })
    }

    pub fn is_of(operand: Expression, type_ref: TypeReference) -> Self {
        Self::new(ExpressionKind::IsOf {
            operand: Arc::new(operand),
            type_ref,
        })
    }

    pub fn cast(operand: Expression, type_ref: TypeReference) -> Self {
        Self::new(ExpressionKind::Cast {
            operand: Arc::new(operand),
            type_ref,
        })
    }

    pub fn record(type_ref: Option<TypeReference>, properties: Vec<PropertyConstructor>) -> Self {
        Self::new(ExpressionKind::Record {
            type_ref,
            properties,
        })
    }

    pub fn collection(element_type: Option<TypeReference>, elements: Vec<Expression>) -> Self {
        Self::new(ExpressionKind::Collection {
            element_type,
            elements: elements.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn labeled(name: impl Into<String>, operand: Expression) -> Self {
        Self::new(ExpressionKind::LabeledElement {
            name: name.into(),
            operand: Arc::new(operand),
        })
    }

    pub fn labeled_reference(name: impl Into<String>) -> Self {
        Self::new(ExpressionKind::LabeledElementReference(name.into()))
    }

    pub fn enum_member(members: Vec<EnumMemberRef>) -> Self {
        Self::new(ExpressionKind::EnumMember(members))
    }

    /// CSDL element name of this expression
    pub fn element_name(&self) -> &'static str {
        match &self.kind {
            ExpressionKind::Null => "Null",
            ExpressionKind::Constant(c) => c.kind().element_name(),
            ExpressionKind::Malformed { kind, .. } => kind.element_name(),
            ExpressionKind::Path(_) => "Path",
            ExpressionKind::Apply { .. } => "Apply",
            ExpressionKind::If { .. } => "If",
            ExpressionKind::IsOf { .. } => "IsOf",
            ExpressionKind::Cast { .. } => "Cast",
            ExpressionKind::Record { .. } => "Record",
            ExpressionKind::Collection { .. } => "Collection",
            ExpressionKind::LabeledElement { .. } => "LabeledElement",
            ExpressionKind::LabeledElementReference(_) => "LabeledElementReference",
            ExpressionKind::EnumMember(_) => "EnumMember",
        }
    }

    /// Visit this expression and every sub-expression in pre-order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expression)) {
        visit(self);
        match &self.kind {
            ExpressionKind::Apply { arguments, .. } => {
                arguments.iter().for_each(|a| a.walk(visit));
            }
            ExpressionKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.walk(visit);
                then_branch.walk(visit);
                else_branch.walk(visit);
            }
            ExpressionKind::IsOf { operand, .. }
            | ExpressionKind::Cast { operand, .. }
            | ExpressionKind::LabeledElement { operand, .. } => operand.walk(visit),
            ExpressionKind::Record { properties, .. } => {
                properties.iter().for_each(|p| p.value.walk(visit));
            }
            ExpressionKind::Collection { elements, .. } => {
                elements.iter().for_each(|e| e.walk(visit));
            }
            ExpressionKind::Null
            | ExpressionKind::Constant(_)
            | ExpressionKind::Malformed { .. }
            | ExpressionKind::Path(_)
            | ExpressionKind::LabeledElementReference(_)
            | ExpressionKind::EnumMember(_) => {}
        }
    }
}
