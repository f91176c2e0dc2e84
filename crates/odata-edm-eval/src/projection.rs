//! Projection of runtime values into host types
//!
//! Structured values become `Rc<RefCell<T>>` for any `T: Projectable`. Each
//! (value, host type) pair is converted once per [`Projector`]: the instance
//! is cached before its properties are set, so a cyclic value graph projects
//! into a cyclic host graph with one instance per node.

use crate::error::{EvalError, EvalResult};
use crate::value::{StructuredValue, Value};
use rust_decimal::Decimal;
use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Conversion from a runtime value
pub trait FromEdmValue: Sized {
    fn from_edm_value(value: &Value, projector: &mut Projector) -> EvalResult<Self>;
}

/// Host type that structured values project into
///
/// The instance starts as `Default` and receives each property in order.
/// Unknown properties should be ignored. No borrow of `instance` is held
/// during the call, and the projector may return instances that are still
/// being filled, `instance` included: project the value first, then borrow
/// `instance` mutably to store it.
pub trait Projectable: Default + 'static {
    fn set_property(instance: &RefCell<Self>, name: &str, value: &Value, projector: &mut Projector) -> EvalResult<()>;
}

/// Custom conversion hook
///
/// Receives the structured value, the requested `RefCell<T>` type id and the
/// projector, through which nested values are projected. `Ok(None)` leaves
/// the value to the default conversion; a returned instance must be an
/// `Rc<RefCell<T>>` of the requested type. A converter building a cyclic
/// graph registers its shell with [`Projector::cache`] before projecting
/// nested values.
pub type Converter = Rc<dyn Fn(&StructuredValue, TypeId, &mut Projector) -> EvalResult<Option<Rc<dyn Any>>>>;

/// Converts values into host types, keeping one instance per structured value
#[derive(Default)]
pub struct Projector {
    instances: HashMap<(usize, TypeId), Rc<dyn Any>>,
    converter: Option<Converter>,
}

impl Projector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a custom converter consulted before the default conversion
    pub fn with_converter(
        mut self,
        converter: impl Fn(&StructuredValue, TypeId, &mut Projector) -> EvalResult<Option<Rc<dyn Any>>> + 'static,
    ) -> Self {
        self.converter = Some(Rc::new(converter));
        self
    }

    /// Convert `value` into `T`
    pub fn project<T: FromEdmValue>(&mut self, value: &Value) -> EvalResult<T> {
        T::from_edm_value(value, self)
    }

    /// Number of structured values converted so far
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Record `instance` as the projection of `value` into `T`
    ///
    /// Later projections of the same value return `instance`, including
    /// those made while its properties are still being filled.
    pub fn cache<T: 'static>(&mut self, value: &StructuredValue, instance: &Rc<RefCell<T>>) {
        self.instances
            .insert(instance_key::<T>(value), instance.clone() as Rc<dyn Any>);
    }

    /// Set every property of `value` on `instance` through [`Projectable::set_property`]
    pub fn fill<T: Projectable>(&mut self, value: &StructuredValue, instance: &RefCell<T>) -> EvalResult<()> {
        let properties = value.properties().clone();
        for property in &properties {
            T::set_property(instance, &property.name, &property.value, self)?;
        }
        Ok(())
    }

    fn project_structured<T: Projectable>(&mut self, value: &StructuredValue) -> EvalResult<Rc<RefCell<T>>> {
        let key = instance_key::<T>(value);
        if let Some(existing) = self.instances.get(&key) {
            return downcast(existing.clone());
        }

        if let Some(converter) = self.converter.clone() {
            if let Some(instance) = converter(value, TypeId::of::<RefCell<T>>(), self)? {
                // A shell cached by the converter is already shared; it wins
                let instance = self.instances.entry(key).or_insert(instance).clone();
                return downcast(instance);
            }
        }

        let instance = Rc::new(RefCell::new(T::default()));
        self.cache(value, &instance);
        self.fill(value, &instance)?;
        Ok(instance)
    }
}

fn instance_key<T: 'static>(value: &StructuredValue) -> (usize, TypeId) {
    (value as *const StructuredValue as usize, TypeId::of::<RefCell<T>>())
}

fn downcast<T: 'static>(instance: Rc<dyn Any>) -> EvalResult<Rc<RefCell<T>>> {
    instance.downcast::<RefCell<T>>().map_err(|_| {
        EvalError::projection_failed("Structured", type_name::<T>(), "converter returned an instance of another type")
    })
}

fn mismatch<T>(value: &Value) -> EvalError {
    EvalError::projection_failed(value.kind_name(), type_name::<T>(), "incompatible value")
}

impl<T: Projectable> FromEdmValue for Rc<RefCell<T>> {
    fn from_edm_value(value: &Value, projector: &mut Projector) -> EvalResult<Self> {
        match value {
            Value::Structured(structured) => projector.project_structured(&**structured),
            other => Err(mismatch::<T>(other)),
        }
    }
}

impl<T: FromEdmValue> FromEdmValue for Option<T> {
    fn from_edm_value(value: &Value, projector: &mut Projector) -> EvalResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_edm_value(other, projector).map(Some),
        }
    }
}

impl<T: FromEdmValue> FromEdmValue for Vec<T> {
    fn from_edm_value(value: &Value, projector: &mut Projector) -> EvalResult<Self> {
        let Value::Collection(collection) = value else {
            return Err(mismatch::<Self>(value));
        };
        collection
            .iter()
            .map(|slot| slot.and_then(|element| T::from_edm_value(element, projector)))
            .collect()
    }
}

impl FromEdmValue for Value {
    fn from_edm_value(value: &Value, _: &mut Projector) -> EvalResult<Self> {
        Ok(value.clone())
    }
}

impl FromEdmValue for bool {
    fn from_edm_value(value: &Value, _: &mut Projector) -> EvalResult<Self> {
        value.as_bool().ok_or_else(|| mismatch::<Self>(value))
    }
}

impl FromEdmValue for String {
    fn from_edm_value(value: &Value, _: &mut Projector) -> EvalResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::Enum(e) => Ok(e.to_string()),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromEdmValue for f64 {
    fn from_edm_value(value: &Value, _: &mut Projector) -> EvalResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Integer(i) => Ok(*i as f64),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl FromEdmValue for Decimal {
    fn from_edm_value(value: &Value, _: &mut Projector) -> EvalResult<Self> {
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Integer(i) => Ok(Decimal::from(*i)),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

macro_rules! integer_projection {
    ($($ty:ty),*) => {
        $(
            impl FromEdmValue for $ty {
                fn from_edm_value(value: &Value, _: &mut Projector) -> EvalResult<Self> {
                    let integer = match value {
                        Value::Integer(i) => *i,
                        Value::Enum(e) => e.value,
                        other => return Err(mismatch::<Self>(other)),
                    };
                    <$ty>::try_from(integer).map_err(|_| {
                        EvalError::projection_failed(value.kind_name(), type_name::<Self>(), format!("{} is out of range", integer))
                    })
                }
            }
        )*
    };
}

integer_projection!(i64, i32, i16, i8, u8);
