//! Annotation expression evaluator
//!
//! An [`ExpressionEvaluator`] evaluates expression trees of a model against
//! an optional context value. Host code supplies implementations for applied
//! operations, keyed by operation handle, plus an optional by-name fallback
//! consulted when no handle matches.
//!
//! Labeled elements are registered before anything is evaluated, so a
//! reference may appear before, after or inside the element it names. A
//! labeled record is shared while its properties are still being evaluated,
//! which lets records refer to each other; every reference to a label yields
//! the same instance.

use crate::coerce::{coerce, is_of};
use crate::error::{EvalError, EvalResult};
use crate::projection::{FromEdmValue, Projector};
use crate::value::{CollectionValue, EnumValue, PropertyValue, StructuredValue, Value};
use log::{debug, trace};
use odata_edm_model::{
    AnnotationTarget, EnumMemberRef, Expression, ExpressionKind, Model, OperationId, OperationRef,
    PropertyConstructor, TermId, TypeDefinition, VocabularyAnnotation,
};
use std::collections::HashMap;
use std::rc::Rc;

/// Host implementation of an applied operation
pub type OperationFn = Box<dyn Fn(&[Value]) -> EvalResult<Value>>;

/// By-name fallback; `None` means "not handled"
pub type LastChanceFn = Box<dyn Fn(&str, &[Value]) -> Option<EvalResult<Value>>>;

/// Evaluates annotation expressions of one model
pub struct ExpressionEvaluator<'m> {
    model: &'m Model,
    operations: HashMap<OperationId, OperationFn>,
    last_chance: Option<LastChanceFn>,
}

/// Progress of one label within a top-level evaluation
enum LabelState {
    /// Being evaluated; records are already shared
    Pending(Option<Rc<StructuredValue>>),
    Done(Value),
}

/// State of one top-level evaluation
struct Scope<'e> {
    context: Option<&'e Value>,
    /// Owning `LabeledElement` node per label name
    definitions: HashMap<&'e str, &'e Expression>,
    labels: HashMap<String, LabelState>,
}

impl<'e> Scope<'e> {
    fn new(expression: &'e Expression, context: Option<&'e Value>) -> Self {
        let mut definitions = HashMap::new();
        expression.walk(&mut |node| {
            if let ExpressionKind::LabeledElement { name, .. } = &node.kind {
                // first definition in pre-order owns the name
                definitions.entry(name.as_str()).or_insert(node);
            }
        });
        Self {
            context,
            definitions,
            labels: HashMap::new(),
        }
    }

    fn owns(&self, name: &str, node: &Expression) -> bool {
        self.definitions
            .get(name)
            .is_some_and(|owner| std::ptr::eq(*owner, node))
    }
}

impl<'m> ExpressionEvaluator<'m> {
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            operations: HashMap::new(),
            last_chance: None,
        }
    }

    /// Register the implementation of `operation`
    pub fn with_operation(
        mut self,
        operation: OperationId,
        implementation: impl Fn(&[Value]) -> EvalResult<Value> + 'static,
    ) -> Self {
        self.operations.insert(operation, Box::new(implementation));
        self
    }

    /// Set the fallback for operations without a registered implementation
    ///
    /// It receives the qualified operation name and the evaluated arguments.
    pub fn with_last_chance(
        mut self,
        fallback: impl Fn(&str, &[Value]) -> Option<EvalResult<Value>> + 'static,
    ) -> Self {
        self.last_chance = Some(Box::new(fallback));
        self
    }

    pub fn model(&self) -> &'m Model {
        self.model
    }

    /// Evaluate `expression` against an optional context value
    pub fn evaluate(&self, expression: &Expression, context: Option<&Value>) -> EvalResult<Value> {
        let mut scope = Scope::new(expression, context);
        self.evaluate_in(expression, &mut scope)
    }

    /// Value of `term` for a structured value, coerced to the term type
    ///
    /// The annotation is looked up on the value's type and then its base
    /// types. No annotation, or a value without a type, yields `Null`.
    pub fn term_value(&self, value: &Value, term: TermId, qualifier: Option<&str>) -> EvalResult<Value> {
        let Some(type_id) = value.as_structured().and_then(|s| s.type_id()) else {
            return Ok(Value::Null);
        };
        let annotation = std::iter::once(type_id)
            .chain(self.model.ancestors(type_id))
            .find_map(|ty| {
                self.model
                    .find_vocabulary_annotation(&AnnotationTarget::Type(ty), term, qualifier)
            });
        match annotation {
            Some(annotation) => self.annotation_value(annotation, term, Some(value)),
            None => {
                debug!(
                    "No '{}' annotation for '{}'",
                    self.model.term(term).qualified_name(),
                    self.model.schema_type(type_id).qualified_name()
                );
                Ok(Value::Null)
            }
        }
    }

    /// [`term_value`](Self::term_value) with the term given by qualified name
    pub fn term_value_by_name(&self, value: &Value, term: &str, qualifier: Option<&str>) -> EvalResult<Value> {
        let id = self
            .model
            .find_term(term)
            .ok_or_else(|| EvalError::UnknownTerm { name: term.to_string() })?;
        self.term_value(value, id, qualifier)
    }

    /// Value of `term` on any annotatable element
    pub fn element_term_value(
        &self,
        target: &AnnotationTarget,
        term: TermId,
        qualifier: Option<&str>,
        context: Option<&Value>,
    ) -> EvalResult<Value> {
        match self.model.find_vocabulary_annotation(target, term, qualifier) {
            Some(annotation) => self.annotation_value(annotation, term, context),
            None => Ok(Value::Null),
        }
    }

    /// [`term_value`](Self::term_value) projected into a host type
    pub fn project_term_value<T: FromEdmValue>(
        &self,
        value: &Value,
        term: TermId,
        qualifier: Option<&str>,
        projector: &mut Projector,
    ) -> EvalResult<T> {
        let value = self.term_value(value, term, qualifier)?;
        projector.project(&value)
    }

    fn annotation_value(
        &self,
        annotation: &VocabularyAnnotation,
        term: TermId,
        context: Option<&Value>,
    ) -> EvalResult<Value> {
        let value = self.evaluate(&annotation.expression, context)?;
        coerce(self.model, value, &self.model.term(term).type_ref)
    }

    fn evaluate_in<'e>(&self, expression: &'e Expression, scope: &mut Scope<'e>) -> EvalResult<Value> {
        match &expression.kind {
            ExpressionKind::Null => Ok(Value::Null),
            ExpressionKind::Constant(constant) => Ok(Value::from(constant.clone())),
            ExpressionKind::Malformed { kind, text } => {
                Err(EvalError::invalid_literal(kind.element_name(), text.clone()))
            }
            ExpressionKind::Path(segments) => self.path(segments, scope.context),
            ExpressionKind::Apply { function, arguments } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| self.evaluate_in(argument, scope))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.apply(function, &arguments)
            }
            ExpressionKind::If {
                condition,
                then_branch,
                else_branch,
            } => match self.evaluate_in(condition, scope)? {
                Value::Boolean(true) => self.evaluate_in(then_branch, scope),
                Value::Boolean(false) => self.evaluate_in(else_branch, scope),
                other => Err(EvalError::ConditionNotBoolean {
                    kind: other.kind_name(),
                }),
            },
            ExpressionKind::IsOf { operand, type_ref } => {
                let value = self.evaluate_in(operand, scope)?;
                Ok(Value::Boolean(is_of(self.model, value, type_ref)?))
            }
            ExpressionKind::Cast { operand, type_ref } => {
                let value = self.evaluate_in(operand, scope)?;
                coerce(self.model, value, type_ref)
            }
            ExpressionKind::Record { type_ref, properties } => {
                let record = Rc::new(StructuredValue::new(type_ref.clone()));
                self.fill_record(&record, properties, scope)?;
                Ok(Value::Structured(record))
            }
            ExpressionKind::Collection { element_type, elements } => {
                let slots = elements
                    .iter()
                    .map(|element| self.evaluate_in(element, scope))
                    .collect();
                Ok(Value::Collection(CollectionValue::new(element_type.clone(), slots)))
            }
            ExpressionKind::LabeledElement { name, operand } => {
                if scope.owns(name, expression) {
                    self.label(name, scope)
                } else {
                    // shadowed duplicate: evaluated, never referenced
                    self.evaluate_in(operand, scope)
                }
            }
            ExpressionKind::LabeledElementReference(name) => self.label(name, scope),
            ExpressionKind::EnumMember(members) => self.enum_members(members),
        }
    }

    fn label<'e>(&self, name: &str, scope: &mut Scope<'e>) -> EvalResult<Value> {
        match scope.labels.get(name) {
            Some(LabelState::Done(value)) => return Ok(value.clone()),
            Some(LabelState::Pending(Some(record))) => return Ok(Value::Structured(record.clone())),
            Some(LabelState::Pending(None)) => {
                return Err(EvalError::LabelCycle { name: name.to_string() });
            }
            None => {}
        }
        let Some(owner) = scope.definitions.get(name).copied() else {
            trace!("Reference to unknown label '{}' evaluates to null", name);
            return Ok(Value::Null);
        };
        let ExpressionKind::LabeledElement { operand, .. } = &owner.kind else {
            return Ok(Value::Null);
        };
        let operand: &'e Expression = operand;

        trace!("Evaluating labeled element '{}'", name);
        let result = match &operand.kind {
            ExpressionKind::Record { type_ref, properties } => {
                let record = Rc::new(StructuredValue::new(type_ref.clone()));
                scope
                    .labels
                    .insert(name.to_string(), LabelState::Pending(Some(record.clone())));
                self.fill_record(&record, properties, scope)
                    .map(|()| Value::Structured(record))
            }
            _ => {
                scope.labels.insert(name.to_string(), LabelState::Pending(None));
                self.evaluate_in(operand, scope)
            }
        };
        match &result {
            Ok(value) => {
                scope.labels.insert(name.to_string(), LabelState::Done(value.clone()));
            }
            Err(_) => {
                scope.labels.remove(name);
            }
        }
        result
    }

    fn fill_record<'e>(
        &self,
        record: &Rc<StructuredValue>,
        properties: &'e [PropertyConstructor],
        scope: &mut Scope<'e>,
    ) -> EvalResult<()> {
        let mut values = Vec::with_capacity(properties.len());
        for property in properties {
            let value = self.evaluate_in(&property.value, scope)?;
            values.push(PropertyValue::new(property.name.clone(), value));
        }
        record.set_properties(values);
        Ok(())
    }

    fn path(&self, segments: &[String], context: Option<&Value>) -> EvalResult<Value> {
        let Some(mut current) = context.cloned() else {
            return Err(EvalError::MissingContext {
                path: segments.join("/"),
            });
        };
        for segment in segments {
            if segment.contains('.') {
                // type cast: values of other types read as null
                if let (Some(cast), Value::Structured(record)) = (self.model.find_type(segment), &current) {
                    if record
                        .type_id()
                        .is_some_and(|actual| !self.model.is_or_inherits_from(actual, cast))
                    {
                        return Ok(Value::Null);
                    }
                }
                continue;
            }
            current = match &current {
                Value::Structured(record) => record.get(segment).ok_or_else(|| EvalError::PathNotFound {
                    path: segments.join("/"),
                    segment: segment.clone(),
                })?,
                other => {
                    return Err(EvalError::NotStructured {
                        path: segments.join("/"),
                        segment: segment.clone(),
                        kind: other.kind_name(),
                    });
                }
            };
        }
        Ok(current)
    }

    fn apply(&self, function: &OperationRef, arguments: &[Value]) -> EvalResult<Value> {
        let name = match function {
            OperationRef::Resolved(id) => {
                if let Some(implementation) = self.operations.get(id) {
                    return implementation(arguments);
                }
                self.model.operation(*id).qualified_name()
            }
            OperationRef::Unresolved(name) => {
                let registered = self
                    .model
                    .find_operations(name)
                    .into_iter()
                    .find_map(|id| self.operations.get(&id));
                if let Some(implementation) = registered {
                    return implementation(arguments);
                }
                name.clone()
            }
        };
        let handled = self.last_chance.as_ref().and_then(|fallback| fallback(&name, arguments));
        handled.unwrap_or(Err(EvalError::UnboundOperation { name }))
    }

    fn enum_members(&self, members: &[EnumMemberRef]) -> EvalResult<Value> {
        let mut value = 0;
        let mut names = Vec::with_capacity(members.len());
        let mut enum_type = None;
        for reference in members {
            let member = match &reference.enum_type {
                TypeDefinition::Schema(id) => self
                    .model
                    .schema_type(*id)
                    .as_enum()
                    .and_then(|e| e.member(&reference.member))
                    .map(|member| (*id, member)),
                _ => None,
            };
            let Some((id, member)) = member else {
                return Err(EvalError::invalid_literal(
                    "EnumMember",
                    format!(
                        "{}/{}",
                        self.model.type_definition_name(&reference.enum_type),
                        reference.member
                    ),
                ));
            };
            value |= member.value;
            names.push(member.name.clone());
            enum_type = Some(id);
        }
        Ok(Value::Enum(EnumValue::new(enum_type, value, names)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_edm_model::{PrimitiveKind, TypeReference};

    #[test]
    fn test_empty_path_is_the_context() {
        let model = Model::new();
        let evaluator = ExpressionEvaluator::new(&model);
        let context = Value::Integer(7);
        assert_eq!(
            evaluator.evaluate(&Expression::path(""), Some(&context)).unwrap(),
            Value::Integer(7)
        );
    }

    #[test]
    fn test_path_without_context() {
        let model = Model::new();
        let err = ExpressionEvaluator::new(&model)
            .evaluate(&Expression::path("Name"), None)
            .unwrap_err();
        assert_eq!(err, EvalError::MissingContext { path: "Name".to_string() });
    }

    #[test]
    fn test_path_through_non_structured_value() {
        let model = Model::new();
        let context = Value::structured(None, [("Name", Value::string("Ada"))]);
        let err = ExpressionEvaluator::new(&model)
            .evaluate(&Expression::path("Name/Length"), Some(&context))
            .unwrap_err();
        assert!(matches!(err, EvalError::NotStructured { kind: "String", .. }));
    }

    #[test]
    fn test_type_cast_segment() {
        let mut model = Model::new();
        let person = model.add_complex_type("NS", "Person");
        model.add_complex_type("NS", "Pet");
        let evaluator = ExpressionEvaluator::new(&model);
        let context = Value::structured(Some(TypeReference::schema(person, true)), [("Name", Value::string("Ada"))]);

        assert_eq!(
            evaluator
                .evaluate(&Expression::path("NS.Person/Name"), Some(&context))
                .unwrap(),
            Value::string("Ada")
        );
        assert_eq!(
            evaluator
                .evaluate(&Expression::path("NS.Pet/Name"), Some(&context))
                .unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_if_evaluates_one_branch() {
        let model = Model::new();
        let evaluator = ExpressionEvaluator::new(&model);
        // the untaken branch would fail without a context
        let expression = Expression::if_else(Expression::bool(true), Expression::int(1), Expression::path("Missing"));
        assert_eq!(evaluator.evaluate(&expression, None).unwrap(), Value::Integer(1));

        let expression = Expression::if_else(Expression::int(1), Expression::int(1), Expression::int(2));
        assert_eq!(
            evaluator.evaluate(&expression, None).unwrap_err(),
            EvalError::ConditionNotBoolean { kind: "Integer" }
        );
    }

    #[test]
    fn test_enum_members_combine() {
        let mut model = Model::new();
        let access = model.add_enum_type("NS", "Access", PrimitiveKind::Int32, true);
        model.add_enum_member(access, "Read", 1).unwrap();
        model.add_enum_member(access, "Write", 2).unwrap();
        let expression = Expression::enum_member(vec![
            EnumMemberRef {
                enum_type: TypeDefinition::Schema(access),
                member: "Read".to_string(),
            },
            EnumMemberRef {
                enum_type: TypeDefinition::Schema(access),
                member: "Write".to_string(),
            },
        ]);

        let value = ExpressionEvaluator::new(&model).evaluate(&expression, None).unwrap();
        assert_eq!(value.to_string(), "Read,Write");
        let Value::Enum(e) = value else {
            panic!("expected an enum value");
        };
        assert_eq!(e.value, 3);
    }
}
