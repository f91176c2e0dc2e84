//! Rules over vocabulary annotations and their expressions

use crate::context::ValidationContext;
use odata_edm_diagnostics::{EdmErrorCode, EdmLocation};
use odata_edm_model::literal::invalid_code;
use odata_edm_model::{
    Constant, Expression, ExpressionKind, MaxLength, PrimitiveKind, TermRef, TypeDefinition,
    TypeId, TypeReference, VocabularyAnnotation,
};

fn annotation_location(ctx: &ValidationContext<'_>, annotation: &VocabularyAnnotation) -> EdmLocation {
    if let Some(location) = annotation.location {
        return EdmLocation::Text(location);
    }
    let term = match &annotation.term {
        TermRef::Resolved(id) => ctx.model.term(*id).qualified_name(),
        TermRef::Unresolved(name) => name.clone(),
    };
    let mut path = format!("{}/@{}", ctx.model.target_path(&annotation.target), term);
    if let Some(qualifier) = &annotation.qualifier {
        path.push('#');
        path.push_str(qualifier);
    }
    EdmLocation::Element(path)
}

fn expression_location(expr: &Expression, fallback: &EdmLocation) -> EdmLocation {
    expr.location.map(EdmLocation::Text).unwrap_or_else(|| fallback.clone())
}

pub(crate) fn annotation_targets(ctx: &mut ValidationContext<'_>, annotation: &VocabularyAnnotation) {
    let location = annotation_location(ctx, annotation);
    if let odata_edm_model::AnnotationTarget::Unresolved(path) = &annotation.target {
        ctx.report(
            EdmErrorCode::BadUnresolvedTarget,
            format!("Annotation target '{}' cannot be found", path),
            location.clone(),
        );
    }
    if let TermRef::Unresolved(name) = &annotation.term {
        ctx.report(
            EdmErrorCode::BadUnresolvedTerm,
            format!("Term '{}' cannot be found", name),
            location,
        );
    }
}

pub(crate) fn duplicate_annotations(ctx: &mut ValidationContext<'_>, index: usize) {
    let model = ctx.model;
    let annotations = model.vocabulary_annotations();
    let annotation = &annotations[index];
    let duplicate = annotations[..index].iter().any(|other| {
        other.target == annotation.target
            && other.term == annotation.term
            && other.qualifier == annotation.qualifier
    });
    if duplicate {
        let mut message = format!(
            "The term is applied more than once to '{}'",
            model.target_path(&annotation.target)
        );
        if let Some(qualifier) = &annotation.qualifier {
            message.push_str(&format!(" with qualifier '{}'", qualifier));
        }
        ctx.report(EdmErrorCode::DuplicateAnnotation, message, annotation_location(ctx, annotation));
    }
}

pub(crate) fn annotation_expressions(ctx: &mut ValidationContext<'_>, annotation: &VocabularyAnnotation) {
    let model = ctx.model;
    let location = annotation_location(ctx, annotation);
    report_malformed(ctx, &annotation.expression, &location);
    if let TermRef::Resolved(term) = &annotation.term {
        let expected = &model.term(*term).type_ref;
        ExpressionChecker { ctx: &mut *ctx }.check(&annotation.expression, expected, &location);
    }
}

/// Malformed literals and unresolved references anywhere in the tree
fn report_malformed(ctx: &mut ValidationContext<'_>, expr: &Expression, fallback: &EdmLocation) {
    let model = ctx.model;
    let mut found = Vec::new();
    expr.walk(&mut |e| match &e.kind {
        ExpressionKind::Malformed { kind, text } => found.push((
            invalid_code(*kind),
            format!("'{}' is not a valid {} value", text, kind),
            expression_location(e, fallback),
        )),
        ExpressionKind::EnumMember(members) => {
            for member in members {
                let resolved = match &member.enum_type {
                    TypeDefinition::Schema(id) => model
                        .schema_type(*id)
                        .as_enum()
                        .is_some_and(|t| t.member(&member.member).is_some()),
                    _ => false,
                };
                if !resolved {
                    found.push((
                        EdmErrorCode::BadUnresolvedEnumMember,
                        format!(
                            "Enum member '{}/{}' cannot be found",
                            model.type_definition_name(&member.enum_type),
                            member.member
                        ),
                        expression_location(e, fallback),
                    ));
                }
            }
        }
        ExpressionKind::Record { type_ref: Some(type_ref), .. } => {
            if let TypeDefinition::Unresolved(name) = &type_ref.definition {
                found.push((
                    EdmErrorCode::BadUnresolvedType,
                    format!("The record type '{}' cannot be found", name),
                    expression_location(e, fallback),
                ));
            } else if !type_ref
                .as_schema_type()
                .is_some_and(|t| model.schema_type(t).as_structured().is_some())
            {
                found.push((
                    EdmErrorCode::TypeSemanticsCouldNotConvertTypeReference,
                    format!(
                        "The record type '{}' is not a structured type",
                        model.type_reference_name(type_ref)
                    ),
                    expression_location(e, fallback),
                ));
            }
        }
        _ => {}
    });
    for (code, message, location) in found {
        ctx.report(code, message, location);
    }
}

/// Static check of an expression against an asserted type
struct ExpressionChecker<'c, 'm> {
    ctx: &'c mut ValidationContext<'m>,
}

impl ExpressionChecker<'_, '_> {
    fn check(&mut self, expr: &Expression, expected: &TypeReference, fallback: &EdmLocation) {
        if expected.as_primitive() == Some(PrimitiveKind::Untyped) {
            return;
        }
        if matches!(expected.definition, TypeDefinition::Unresolved(_)) {
            return;
        }
        let location = expression_location(expr, fallback);
        match &expr.kind {
            ExpressionKind::Null => {
                if !expected.nullable {
                    self.ctx.report(
                        EdmErrorCode::NullCannotBeAssertedToBeANonNullableType,
                        format!(
                            "Null cannot be asserted to non-nullable '{}'",
                            self.ctx.model.type_reference_name(expected)
                        ),
                        location,
                    );
                }
            }
            ExpressionKind::Constant(constant) => self.check_constant(constant, expected, location),
            ExpressionKind::Malformed { .. } => {}
            ExpressionKind::Collection { elements, .. } => match expected.element_type() {
                Some(element_type) => {
                    for element in elements {
                        self.check(element, element_type, &location);
                    }
                }
                None => self.ctx.report(
                    EdmErrorCode::CollectionExpressionNotValidForNonCollectionType,
                    format!(
                        "A collection expression is not valid for '{}'",
                        self.ctx.model.type_reference_name(expected)
                    ),
                    location,
                ),
            },
            ExpressionKind::Record { type_ref, properties } => {
                self.check_record(type_ref.as_ref(), properties, expected, location)
            }
            ExpressionKind::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.check(then_branch, expected, &location);
                self.check(else_branch, expected, &location);
            }
            ExpressionKind::LabeledElement { operand, .. } => self.check(operand, expected, &location),
            ExpressionKind::IsOf { .. } => match expected.as_primitive() {
                Some(PrimitiveKind::Boolean) => {}
                Some(kind) => self.ctx.report(
                    EdmErrorCode::ExpressionPrimitiveKindNotValidForAssertedType,
                    format!("An IsOf expression yields Edm.Boolean, not {}", kind),
                    location,
                ),
                None => self.not_valid(expr, expected, location),
            },
            ExpressionKind::Cast { type_ref, .. } => {
                let compatible = match (type_ref.as_primitive(), expected.as_primitive()) {
                    (Some(a), Some(b)) => a == b,
                    (None, None) => true,
                    _ => false,
                };
                if !compatible {
                    self.not_valid(expr, expected, location);
                }
            }
            ExpressionKind::EnumMember(members) => {
                let expected_enum = expected
                    .as_schema_type()
                    .filter(|t| self.ctx.model.schema_type(*t).is_enum());
                let fits = expected_enum.is_some_and(|t| {
                    members
                        .iter()
                        .all(|m| m.enum_type == TypeDefinition::Schema(t) || matches!(m.enum_type, TypeDefinition::Unresolved(_)))
                });
                if !fits {
                    self.not_valid(expr, expected, location);
                }
            }
            // resolved only against a runtime context
            ExpressionKind::Path(_)
            | ExpressionKind::Apply { .. }
            | ExpressionKind::LabeledElementReference(_) => {}
        }
    }

    fn not_valid(&mut self, expr: &Expression, expected: &TypeReference, location: EdmLocation) {
        self.ctx.report(
            EdmErrorCode::ExpressionNotValidForTheAssertedType,
            format!(
                "A {} expression is not valid for '{}'",
                expr.element_name(),
                self.ctx.model.type_reference_name(expected)
            ),
            location,
        );
    }

    fn check_constant(&mut self, constant: &Constant, expected: &TypeReference, location: EdmLocation) {
        let Some(kind) = expected.as_primitive() else {
            self.ctx.report(
                EdmErrorCode::PrimitiveConstantExpressionNotValidForNonPrimitiveType,
                format!(
                    "A {} constant is not valid for non-primitive '{}'",
                    constant.kind(),
                    self.ctx.model.type_reference_name(expected)
                ),
                location,
            );
            return;
        };
        if !constant.kind().is_compatible_with(kind) {
            self.ctx.report(
                EdmErrorCode::ExpressionPrimitiveKindNotValidForAssertedType,
                format!("A {} constant is not valid for {}", constant.kind(), kind),
                location,
            );
            return;
        }
        let max_length = match expected.facets.max_length {
            Some(MaxLength::Bounded(n)) => Some(n as usize),
            _ => None,
        };
        match constant {
            Constant::Int(value) => {
                if let Some((min, max)) = kind.integer_range() {
                    if *value < min || *value > max {
                        self.ctx.report(
                            EdmErrorCode::IntegerConstantValueOutOfRange,
                            format!("{} is out of range for {}", value, kind),
                            location,
                        );
                    }
                }
            }
            Constant::String(value) => {
                if let Some(max) = max_length {
                    if value.chars().count() > max {
                        self.ctx.report(
                            EdmErrorCode::StringConstantLengthOutOfRange,
                            format!("String of length {} exceeds MaxLength {}", value.chars().count(), max),
                            location,
                        );
                    }
                }
            }
            Constant::Binary(value) => {
                if let Some(max) = max_length {
                    if value.len() > max {
                        self.ctx.report(
                            EdmErrorCode::BinaryConstantLengthOutOfRange,
                            format!("Binary of length {} exceeds MaxLength {}", value.len(), max),
                            location,
                        );
                    }
                }
            }
            _ => {}
        }
    }

    fn check_record(
        &mut self,
        record_type: Option<&TypeReference>,
        properties: &[odata_edm_model::PropertyConstructor],
        expected: &TypeReference,
        location: EdmLocation,
    ) {
        let model = self.ctx.model;
        if expected.is_collection() {
            self.ctx.report(
                EdmErrorCode::ExpressionNotValidForTheAssertedType,
                format!(
                    "A Record expression is not valid for '{}'",
                    model.type_reference_name(expected)
                ),
                location,
            );
            return;
        }
        let structured: Option<TypeId> = match &expected.definition {
            TypeDefinition::Schema(t) if model.schema_type(*t).as_structured().is_some() => Some(*t),
            TypeDefinition::EntityReference(t) => Some(*t),
            _ => None,
        };
        let Some(expected_type) = structured else {
            self.ctx.report(
                EdmErrorCode::RecordExpressionNotValidForNonStructuredType,
                format!(
                    "A Record expression is not valid for non-structured '{}'",
                    model.type_reference_name(expected)
                ),
                location,
            );
            return;
        };
        // a record may assert a type derived from the expected one
        let ty = record_type
            .and_then(TypeReference::as_schema_type)
            .filter(|t| model.is_or_inherits_from(*t, expected_type))
            .unwrap_or(expected_type);
        let is_open = model.structured_type(ty).is_some_and(|s| s.is_open);

        for constructor in properties {
            let constructor_location = constructor
                .location
                .map(EdmLocation::Text)
                .unwrap_or_else(|| location.clone());
            match model.find_property(ty, &constructor.name) {
                Some(p) => {
                    let property_type = model.property(p).type_ref().clone();
                    self.check(&constructor.value, &property_type, &constructor_location);
                }
                None if !is_open => self.ctx.report(
                    EdmErrorCode::RecordExpressionHasExtraProperties,
                    format!(
                        "Property '{}' is not declared on closed type '{}'",
                        constructor.name,
                        model.schema_type(ty).qualified_name()
                    ),
                    constructor_location,
                ),
                None => {}
            }
        }

        for p in model.properties(ty) {
            let property = model.property(p);
            let Some(structural) = property.as_structural() else {
                continue;
            };
            if structural.type_ref.nullable
                || structural.type_ref.is_collection()
                || structural.default_value.is_some()
            {
                continue;
            }
            if !properties.iter().any(|c| c.name == property.name) {
                self.ctx.report(
                    EdmErrorCode::RecordExpressionMissingProperty,
                    format!(
                        "Record of '{}' is missing non-nullable property '{}'",
                        model.schema_type(ty).qualified_name(),
                        property.name
                    ),
                    location.clone(),
                );
            }
        }
    }
}
