//! Runtime values produced by the evaluator
//!
//! Structured values are reference counted and compared by identity, so a
//! graph built from mutually referencing labeled elements keeps one shared
//! node per label. Such graphs are cyclic and are never freed.

use crate::error::EvalResult;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use odata_edm_model::literal::{format_constant, format_duration};
use odata_edm_model::{Constant, TypeId, TypeReference};
use rust_decimal::Decimal;
use smallvec::SmallVec;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// A runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Binary(Vec<u8>),
    Boolean(bool),
    Date(NaiveDate),
    DateTimeOffset(DateTime<FixedOffset>),
    Decimal(Decimal),
    Duration(chrono::Duration),
    /// Double or Single
    Float(f64),
    Guid(Uuid),
    /// Any integral kind; range checks happen on coercion
    Integer(i64),
    String(String),
    TimeOfDay(NaiveTime),
    Enum(EnumValue),
    Structured(Rc<StructuredValue>),
    Collection(CollectionValue),
}

impl Value {
    /// Structured value with the given properties
    pub fn structured(
        type_ref: Option<TypeReference>,
        properties: impl IntoIterator<Item = (impl Into<String>, Value)>,
    ) -> Self {
        let value = StructuredValue::new(type_ref);
        value.set_properties(properties.into_iter().map(|(name, value)| PropertyValue::new(name, value)).collect());
        Self::Structured(Rc::new(value))
    }

    /// Collection of successfully evaluated elements
    pub fn collection(element_type: Option<TypeReference>, elements: impl IntoIterator<Item = Value>) -> Self {
        Self::Collection(CollectionValue::new(element_type, elements.into_iter().map(Ok).collect()))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Name of the value's variant, for messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Binary(_) => "Binary",
            Self::Boolean(_) => "Boolean",
            Self::Date(_) => "Date",
            Self::DateTimeOffset(_) => "DateTimeOffset",
            Self::Decimal(_) => "Decimal",
            Self::Duration(_) => "Duration",
            Self::Float(_) => "Float",
            Self::Guid(_) => "Guid",
            Self::Integer(_) => "Integer",
            Self::String(_) => "String",
            Self::TimeOfDay(_) => "TimeOfDay",
            Self::Enum(_) => "Enum",
            Self::Structured(_) => "Structured",
            Self::Collection(_) => "Collection",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_structured(&self) -> Option<&Rc<StructuredValue>> {
        match self {
            Self::Structured(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionValue> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// Check if both values are the same structured instance
    pub fn same_instance(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Structured(a), Self::Structured(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Constant> for Value {
    fn from(constant: Constant) -> Self {
        match constant {
            Constant::Binary(b) => Self::Binary(b),
            Constant::Bool(b) => Self::Boolean(b),
            Constant::Date(d) => Self::Date(d),
            Constant::DateTimeOffset(d) => Self::DateTimeOffset(d),
            Constant::Decimal(d) => Self::Decimal(d),
            Constant::Duration(d) => Self::Duration(d),
            Constant::Float(f) => Self::Float(f),
            Constant::Guid(g) => Self::Guid(g),
            Constant::Int(i) => Self::Integer(i),
            Constant::String(s) => Self::String(s),
            Constant::TimeOfDay(t) => Self::TimeOfDay(t),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Structured values compare by identity, collections element-wise
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::DateTimeOffset(a), Self::DateTimeOffset(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::Duration(a), Self::Duration(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Guid(a), Self::Guid(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::TimeOfDay(a), Self::TimeOfDay(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Structured(a), Self::Structured(b)) => Rc::ptr_eq(a, b),
            (Self::Collection(a), Self::Collection(b)) => a.elements == b.elements,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Binary(b) => f.write_str(&hex::encode_upper(b)),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Date(d) => f.write_str(&format_constant(&Constant::Date(*d))),
            Self::DateTimeOffset(d) => f.write_str(&format_constant(&Constant::DateTimeOffset(*d))),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Duration(d) => f.write_str(&format_duration(d)),
            Self::Float(v) => f.write_str(&format_constant(&Constant::Float(*v))),
            Self::Guid(g) => write!(f, "{}", g.hyphenated()),
            Self::Integer(i) => write!(f, "{}", i),
            Self::String(s) => f.write_str(s),
            Self::TimeOfDay(t) => f.write_str(&format_constant(&Constant::TimeOfDay(*t))),
            Self::Enum(e) => write!(f, "{}", e),
            Self::Structured(s) => write!(f, "{}", s),
            Self::Collection(c) => write!(f, "{}", c),
        }
    }
}

/// Enum value: numeric value plus the member names it was built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub enum_type: Option<TypeId>,
    pub value: i64,
    pub members: SmallVec<[String; 1]>,
}

impl EnumValue {
    pub fn new(enum_type: Option<TypeId>, value: i64, members: impl IntoIterator<Item = String>) -> Self {
        Self {
            enum_type,
            value,
            members: members.into_iter().collect(),
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.members.is_empty() {
            write!(f, "{}", self.value)
        } else {
            f.write_str(&self.members.join(","))
        }
    }
}

/// One named slot of a structured value
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValue {
    pub name: String,
    pub value: Value,
}

impl PropertyValue {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Ordered name/value pairs; duplicate names are kept and the first wins on lookup
///
/// The property list is filled in after construction so that a value can be
/// shared before its own properties are evaluated.
pub struct StructuredValue {
    type_ref: Option<TypeReference>,
    properties: RefCell<Vec<PropertyValue>>,
}

impl StructuredValue {
    /// Value with no properties yet
    pub fn new(type_ref: Option<TypeReference>) -> Self {
        Self {
            type_ref,
            properties: RefCell::new(Vec::new()),
        }
    }

    /// Asserted type, if the value was built against one
    pub fn type_ref(&self) -> Option<&TypeReference> {
        self.type_ref.as_ref()
    }

    /// Schema type the value was built against
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_ref.as_ref().and_then(TypeReference::as_schema_type)
    }

    pub fn properties(&self) -> Ref<'_, Vec<PropertyValue>> {
        self.properties.borrow()
    }

    pub(crate) fn set_properties(&self, properties: Vec<PropertyValue>) {
        *self.properties.borrow_mut() = properties;
    }

    /// First property named `name`
    pub fn get(&self, name: &str) -> Option<Value> {
        self.properties
            .borrow()
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.clone())
    }

    pub fn len(&self) -> usize {
        self.properties.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.borrow().is_empty()
    }
}

/// Nested structured values print as `{..}`; the graph may be cyclic
struct Shallow<'a>(&'a Value);

impl fmt::Debug for Shallow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Structured(_) => f.write_str("{..}"),
            Value::Collection(c) => write!(f, "[{} item(s)]", c.len()),
            other => write!(f, "{:?}", other),
        }
    }
}

impl fmt::Debug for StructuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.properties.borrow().iter().map(|p| (&p.name, Shallow(&p.value))))
            .finish()
    }
}

impl fmt::Display for StructuredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, property) in self.properties.borrow().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match &property.value {
                Value::Structured(_) => write!(f, "{}: {{..}}", property.name)?,
                other => write!(f, "{}: {}", property.name, other)?,
            }
        }
        f.write_str("}")
    }
}

/// Elements of a collection
///
/// Each element is evaluated when the collection is built, but a failure is
/// kept in its slot and only raised when that element is accessed.
#[derive(Debug, Clone)]
pub struct CollectionValue {
    pub element_type: Option<TypeReference>,
    elements: Vec<EvalResult<Value>>,
}

impl CollectionValue {
    pub fn new(element_type: Option<TypeReference>, elements: Vec<EvalResult<Value>>) -> Self {
        Self { element_type, elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element at `index`, raising its evaluation failure if it had one
    pub fn get(&self, index: usize) -> Option<EvalResult<&Value>> {
        self.elements.get(index).map(|slot| slot.as_ref().map_err(Clone::clone))
    }

    /// Every element in order, each with its own outcome
    pub fn iter(&self) -> impl Iterator<Item = EvalResult<&Value>> + '_ {
        self.elements.iter().map(|slot| slot.as_ref().map_err(Clone::clone))
    }

    /// All elements, failing on the first element that failed
    pub fn values(&self) -> EvalResult<Vec<&Value>> {
        self.iter().collect()
    }
}

impl fmt::Display for CollectionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, slot) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match slot {
                Ok(value) => write!(f, "{}", value)?,
                Err(_) => f.write_str("<error>")?,
            }
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    #[test]
    fn test_first_property_wins() {
        let value = Value::structured(None, [("A", Value::Integer(1)), ("A", Value::Integer(2))]);
        let structured = value.as_structured().unwrap();
        assert_eq!(structured.get("A"), Some(Value::Integer(1)));
        assert_eq!(structured.len(), 2);
    }

    #[test]
    fn test_structured_equality_is_identity() {
        let a = Value::structured(None, [("A", Value::Integer(1))]);
        let b = Value::structured(None, [("A", Value::Integer(1))]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_cyclic_value_formats() {
        let node = Rc::new(StructuredValue::new(None));
        node.set_properties(vec![PropertyValue::new("Self", Value::Structured(node.clone()))]);
        assert_eq!(format!("{:?}", node), "{\"Self\": {..}}");
        assert_eq!(node.to_string(), "{Self: {..}}");
    }

    #[test]
    fn test_collection_keeps_failures_per_slot() {
        let collection = CollectionValue::new(
            None,
            vec![
                Err(EvalError::invalid_literal("Int", "x")),
                Ok(Value::Integer(1)),
            ],
        );
        assert!(collection.get(0).unwrap().is_err());
        assert_eq!(collection.get(1).unwrap().unwrap(), &Value::Integer(1));
        assert!(collection.values().is_err());
    }
}
