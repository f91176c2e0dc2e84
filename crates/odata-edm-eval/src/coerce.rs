//! Coercion of runtime values to type references
//!
//! Coercion is what `Cast` and `IsOf` assert. It widens integers, checks
//! facets, parses strings into the temporal and identifier kinds and enforces
//! nullability. A value that does not fit is a [`EvalError::CastFailed`];
//! failures stored in collection slots are raised unchanged.

use crate::error::{EvalError, EvalResult};
use crate::value::{CollectionValue, EnumValue, Value};
use odata_edm_model::literal::parse_constant;
use odata_edm_model::{ConstantKind, Facets, MaxLength, Model, PrimitiveKind, Scale, TypeDefinition, TypeId, TypeReference};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Coerce `value` to `type_ref`
pub fn coerce(model: &Model, value: Value, type_ref: &TypeReference) -> EvalResult<Value> {
    let from = value.kind_name();
    let fail = |message: String| EvalError::cast_failed(from, model.type_reference_name(type_ref), message);

    if value.is_null() {
        return if type_ref.nullable {
            Ok(Value::Null)
        } else {
            Err(fail("the type is not nullable".to_string()))
        };
    }

    match &type_ref.definition {
        TypeDefinition::Primitive(kind) => coerce_primitive(value, *kind, &type_ref.facets).map_err(fail),
        TypeDefinition::Collection(element) => match value {
            Value::Collection(collection) => coerce_collection(model, &collection, element),
            other => Err(fail(format!("a {} value is not a collection", other.kind_name()))),
        },
        TypeDefinition::Schema(id) => coerce_schema(model, value, *id).map_err(fail),
        TypeDefinition::EntityReference(id) => coerce_structured(model, value, *id).map_err(fail),
        TypeDefinition::Unresolved(name) => Err(fail(format!("type '{}' is not resolved", name))),
    }
}

/// Check if `value` coerces to `type_ref`
///
/// Only coercion mismatches answer `false`; a failed collection slot is
/// raised as-is.
pub fn is_of(model: &Model, value: Value, type_ref: &TypeReference) -> EvalResult<bool> {
    match coerce(model, value, type_ref) {
        Ok(_) => Ok(true),
        Err(err) if err.is_cast_failure() => Ok(false),
        Err(err) => Err(err),
    }
}

fn coerce_collection(model: &Model, collection: &CollectionValue, element: &TypeReference) -> EvalResult<Value> {
    let mut elements = Vec::with_capacity(collection.len());
    for slot in collection.iter() {
        elements.push(Ok(coerce(model, slot?.clone(), element)?));
    }
    Ok(Value::Collection(CollectionValue::new(Some(element.clone()), elements)))
}

fn integer_range(kind: PrimitiveKind) -> (i64, i64) {
    match kind {
        PrimitiveKind::Byte => (0, i64::from(u8::MAX)),
        PrimitiveKind::SByte => (i64::from(i8::MIN), i64::from(i8::MAX)),
        PrimitiveKind::Int16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
        PrimitiveKind::Int32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
        _ => (i64::MIN, i64::MAX),
    }
}

fn coerce_primitive(value: Value, kind: PrimitiveKind, facets: &Facets) -> Result<Value, String> {
    use PrimitiveKind as K;

    match (kind, value) {
        (K::Untyped, value) => Ok(value),
        (K::Byte | K::SByte | K::Int16 | K::Int32 | K::Int64, Value::Integer(i)) => {
            let (min, max) = integer_range(kind);
            if (min..=max).contains(&i) {
                Ok(Value::Integer(i))
            } else {
                Err(format!("{} is outside the range of {}", i, kind.qualified_name()))
            }
        }
        (K::Decimal, Value::Integer(i)) => check_decimal(Decimal::from(i), facets),
        (K::Decimal, Value::Decimal(d)) => check_decimal(d, facets),
        (K::Double | K::Single, Value::Integer(i)) => Ok(Value::Float(i as f64)),
        (K::Double, Value::Float(f)) => Ok(Value::Float(f)),
        (K::Single, Value::Float(f)) => {
            if f.is_finite() && f.abs() > f64::from(f32::MAX) {
                Err(format!("{} is outside the range of Edm.Single", f))
            } else {
                Ok(Value::Float(f))
            }
        }
        (K::Double | K::Single, Value::Decimal(d)) => d
            .to_f64()
            .map(Value::Float)
            .ok_or_else(|| format!("{} has no floating point form", d)),
        (K::String, Value::String(s)) => check_string(s, facets),
        (K::Binary, Value::Binary(bytes)) => match facets.max_length {
            Some(MaxLength::Bounded(n)) if bytes.len() > n as usize => {
                Err(format!("{} bytes exceed the maximum length {}", bytes.len(), n))
            }
            _ => Ok(Value::Binary(bytes)),
        },
        (K::Boolean, Value::Boolean(b)) => Ok(Value::Boolean(b)),
        (K::Guid, Value::Guid(g)) => Ok(Value::Guid(g)),
        (K::Date, Value::Date(d)) => Ok(Value::Date(d)),
        (K::DateTimeOffset, Value::DateTimeOffset(d)) => Ok(Value::DateTimeOffset(d)),
        (K::TimeOfDay, Value::TimeOfDay(t)) => Ok(Value::TimeOfDay(t)),
        (K::Duration, Value::Duration(d)) => Ok(Value::Duration(d)),
        (K::Guid, Value::String(s)) => promote(ConstantKind::Guid, &s),
        (K::Date, Value::String(s)) => promote(ConstantKind::Date, &s),
        (K::DateTimeOffset, Value::String(s)) => promote(ConstantKind::DateTimeOffset, &s),
        (K::TimeOfDay, Value::String(s)) => promote(ConstantKind::TimeOfDay, &s),
        (K::Duration, Value::String(s)) => promote(ConstantKind::Duration, &s),
        (kind, value) => Err(format!("a {} value is not {}", value.kind_name(), kind.qualified_name())),
    }
}

/// Parse a string as a literal of another kind
fn promote(kind: ConstantKind, text: &str) -> Result<Value, String> {
    parse_constant(kind, text)
        .map(Value::from)
        .map_err(|err| err.to_string())
}

fn check_string(s: String, facets: &Facets) -> Result<Value, String> {
    if let Some(MaxLength::Bounded(n)) = facets.max_length {
        let length = s.chars().count();
        if length > n as usize {
            return Err(format!("{} characters exceed the maximum length {}", length, n));
        }
    }
    if facets.unicode == Some(false) && !s.is_ascii() {
        return Err("the type does not allow non-ASCII characters".to_string());
    }
    Ok(Value::String(s))
}

fn check_decimal(d: Decimal, facets: &Facets) -> Result<Value, String> {
    let normalized = d.normalize();
    let scale = normalized.scale();
    let digits = normalized.mantissa().unsigned_abs().to_string().len() as u32;
    let integer_digits = digits.saturating_sub(scale);

    if let Some(Scale::Fixed(max_scale)) = facets.scale {
        if scale > max_scale {
            return Err(format!("{} has more than {} decimal place(s)", d, max_scale));
        }
    }
    if let Some(precision) = facets.precision {
        let integer_allowed = match facets.scale {
            Some(Scale::Fixed(max_scale)) => precision.saturating_sub(max_scale),
            _ => precision,
        };
        if digits > precision || integer_digits > integer_allowed {
            return Err(format!("{} does not fit precision {}", d, precision));
        }
    }
    Ok(Value::Decimal(d))
}

fn coerce_schema(model: &Model, value: Value, id: TypeId) -> Result<Value, String> {
    let Some(enum_type) = model.schema_type(id).as_enum() else {
        return coerce_structured(model, value, id);
    };
    match value {
        Value::Enum(e) if e.enum_type.is_none_or(|t| t == id) => Ok(Value::Enum(EnumValue {
            enum_type: Some(id),
            ..e
        })),
        Value::Integer(i) => {
            let names = enum_type
                .members()
                .iter()
                .filter(|m| m.value == i)
                .map(|m| m.name.clone())
                .take(1);
            Ok(Value::Enum(EnumValue::new(Some(id), i, names)))
        }
        Value::String(s) => {
            let mut value = 0;
            let mut names = Vec::new();
            for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                let member = enum_type
                    .member(name)
                    .ok_or_else(|| format!("'{}' is not a member", name))?;
                value |= member.value;
                names.push(member.name.clone());
            }
            if names.is_empty() || (!enum_type.is_flags && names.len() > 1) {
                return Err(format!("'{}' does not name a member", s));
            }
            Ok(Value::Enum(EnumValue::new(Some(id), value, names)))
        }
        other => Err(format!("a {} value is not an enum value", other.kind_name())),
    }
}

fn coerce_structured(model: &Model, value: Value, id: TypeId) -> Result<Value, String> {
    match value {
        Value::Structured(s) => match s.type_id() {
            Some(actual) if !model.is_or_inherits_from(actual, id) => Err(format!(
                "'{}' does not derive from '{}'",
                model.schema_type(actual).qualified_name(),
                model.schema_type(id).qualified_name()
            )),
            _ => Ok(Value::Structured(s)),
        },
        other => Err(format!("a {} value is not structured", other.kind_name())),
    }
}
