//! Rules over types, properties, keys, operations and terms

use crate::context::ValidationContext;
use odata_edm_diagnostics::{EdmErrorCode, EdmLocation};
use odata_edm_model::names::{is_namespace_name, is_simple_identifier};
use odata_edm_model::{
    AnnotationTarget, BaseTypeResolution, MaxLength, OperationId, PrimitiveKind, PropertyId, Scale,
    SchemaElement, SchemaTypeKind, TermId, TypeDefinition, TypeId, TypeReference,
};
use std::collections::HashSet;

pub(crate) fn element_names(ctx: &mut ValidationContext<'_>, element: SchemaElement) {
    let model = ctx.model;
    let location = element_location(ctx, element);
    let namespace = model.element_namespace(element);
    if !is_namespace_name(namespace) {
        ctx.report(
            EdmErrorCode::InvalidNamespaceName,
            format!("'{}' is not a valid namespace name", namespace),
            location.clone(),
        );
    }
    let name = model.element_name(element);
    if !is_simple_identifier(name) {
        ctx.report(
            EdmErrorCode::InvalidName,
            format!("'{}' is not a valid simple identifier", name),
            location,
        );
    }

    if let SchemaElement::Type(id) = element {
        let ty = model.schema_type(id);
        let mut names: Vec<(String, EdmLocation)> = model
            .declared_properties(id)
            .iter()
            .map(|p| (model.property(*p).name.clone(), ctx.property_location(*p)))
            .collect();
        if let Some(enum_type) = ty.as_enum() {
            names.extend(enum_type.members().iter().map(|m| {
                (
                    m.name.clone(),
                    model.location_of(&AnnotationTarget::EnumMember {
                        enum_type: id,
                        member: m.name.clone(),
                    }),
                )
            }));
        }
        for (name, location) in names {
            if !is_simple_identifier(&name) {
                ctx.report(
                    EdmErrorCode::InvalidName,
                    format!("'{}' is not a valid simple identifier", name),
                    location,
                );
            }
        }
    }
}

pub(crate) fn element_location(ctx: &ValidationContext<'_>, element: SchemaElement) -> EdmLocation {
    ctx.model.location_of(&AnnotationTarget::from(element))
}

pub(crate) fn duplicate_elements(ctx: &mut ValidationContext<'_>, element: SchemaElement) {
    let model = ctx.model;
    let earlier: Vec<SchemaElement> = ctx
        .same_name(element)
        .iter()
        .copied()
        .take_while(|e| *e != element)
        .collect();
    let conflict = earlier.iter().any(|other| match (element, *other) {
        (SchemaElement::Operation(a), SchemaElement::Operation(b)) => {
            let (a_op, b_op) = (model.operation(a), model.operation(b));
            a_op.is_function() != b_op.is_function()
                || model.operation_signature(a) == model.operation_signature(b)
        }
        _ => true,
    });
    if conflict {
        ctx.report(
            EdmErrorCode::AlreadyDefined,
            format!(
                "An element named '{}' is already defined",
                model.element_qualified_name(element)
            ),
            element_location(ctx, element),
        );
    }
}

pub(crate) fn type_hierarchy_cycle(ctx: &mut ValidationContext<'_>, id: TypeId) {
    if let BaseTypeResolution::Cyclic(cycle) = ctx.model.resolve_base_type(id) {
        let members: Vec<String> = cycle.members.iter().map(|t| ctx.type_name(*t)).collect();
        ctx.report(
            EdmErrorCode::InterfaceCriticalCycleInTypeHierarchy,
            format!(
                "Type '{}' has a cycle in its hierarchy: {}",
                ctx.type_name(id),
                members.join(" -> ")
            ),
            ctx.type_location(id),
        );
    }
}

pub(crate) fn base_type_kind(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    let Some(base) = model.structured_type(id).and_then(|s| s.base_type) else {
        return;
    };
    let ty = model.schema_type(id);
    let base_ty = model.schema_type(base);
    let same_kind = matches!(
        (&ty.kind, &base_ty.kind),
        (SchemaTypeKind::Entity(_), SchemaTypeKind::Entity(_))
            | (SchemaTypeKind::Complex(_), SchemaTypeKind::Complex(_))
    );
    if !same_kind {
        ctx.report(
            EdmErrorCode::BaseTypeKindMismatch,
            format!(
                "{} '{}' cannot derive from {} '{}'",
                ty.kind_name(),
                ty.qualified_name(),
                base_ty.kind_name(),
                base_ty.qualified_name()
            ),
            ctx.type_location(id),
        );
    }
}

pub(crate) fn duplicate_properties(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    let mut seen: HashSet<&str> = HashSet::new();
    for ancestor in model.ancestors(id).iter().rev() {
        for p in model.declared_properties(*ancestor) {
            seen.insert(model.property(*p).name.as_str());
        }
    }
    for p in model.declared_properties(id) {
        let name = model.property(*p).name.as_str();
        if !seen.insert(name) {
            ctx.report(
                EdmErrorCode::AlreadyDefined,
                format!("Property '{}' is already defined on '{}'", name, ctx.type_name(id)),
                ctx.property_location(*p),
            );
        }
    }
}

/// Check a type reference resolves; reports and returns false if not
pub(crate) fn check_resolved(
    ctx: &mut ValidationContext<'_>,
    type_ref: &TypeReference,
    what: &str,
    location: &EdmLocation,
) -> bool {
    match &type_ref.element_or_self().definition {
        TypeDefinition::Unresolved(name) => {
            ctx.report(
                EdmErrorCode::BadUnresolvedType,
                format!("The type '{}' of {} cannot be found", name, what),
                location.clone(),
            );
            false
        }
        _ => true,
    }
}

fn check_facets(ctx: &mut ValidationContext<'_>, type_ref: &TypeReference, what: &str, location: &EdmLocation) {
    let type_ref = type_ref.element_or_self();
    let facets = &type_ref.facets;
    if let (Some(precision), Some(Scale::Fixed(scale))) = (facets.precision, facets.scale) {
        if scale > precision {
            ctx.report(
                EdmErrorCode::ScaleOutOfRange,
                format!("Scale {} of {} exceeds its precision {}", scale, what, precision),
                location.clone(),
            );
        }
    }
    if let Some(MaxLength::Bounded(0)) = facets.max_length {
        ctx.report(
            EdmErrorCode::InvalidPropertyType,
            format!("MaxLength of {} must be positive", what),
            location.clone(),
        );
    }
}

pub(crate) fn property_types(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    for p in model.declared_properties(id) {
        let property = model.property(*p);
        let Some(structural) = property.as_structural() else {
            continue;
        };
        let location = ctx.property_location(*p);
        let what = format!("property '{}'", property.name);
        if !check_resolved(ctx, &structural.type_ref, &what, &location) {
            continue;
        }
        if let Some(target) = structural.type_ref.element_or_self().as_schema_type() {
            if model.schema_type(target).is_entity() {
                ctx.report(
                    EdmErrorCode::InvalidPropertyType,
                    format!(
                        "Structural property '{}' cannot be typed by entity type '{}'",
                        property.name,
                        ctx.type_name(target)
                    ),
                    location.clone(),
                );
            }
        }
        if let TypeDefinition::EntityReference(_) = structural.type_ref.element_or_self().definition {
            ctx.report(
                EdmErrorCode::InvalidPropertyType,
                format!("Structural property '{}' cannot be an entity reference", property.name),
                location.clone(),
            );
        }
        check_facets(ctx, &structural.type_ref, &what, &location);
    }
}

pub(crate) fn navigation_targets(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    for p in model.declared_properties(id) {
        let property = model.property(*p);
        let Some(nav) = property.as_navigation() else {
            continue;
        };
        let location = ctx.property_location(*p);
        let what = format!("navigation property '{}'", property.name);
        if !check_resolved(ctx, &nav.target, &what, &location) {
            continue;
        }
        let is_entity = nav
            .target
            .element_or_self()
            .as_schema_type()
            .is_some_and(|t| model.schema_type(t).is_entity());
        if !is_entity {
            ctx.report(
                EdmErrorCode::TypeSemanticsCouldNotConvertTypeReference,
                format!(
                    "The target '{}' of navigation property '{}' is not an entity type",
                    model.type_reference_name(&nav.target),
                    property.name
                ),
                location,
            );
        }
    }
}

fn related(ctx: &ValidationContext<'_>, a: TypeId, b: TypeId) -> bool {
    ctx.model.is_or_inherits_from(a, b) || ctx.model.is_or_inherits_from(b, a)
}

pub(crate) fn navigation_partners(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    for p in model.declared_properties(id) {
        let property = model.property(*p);
        let Some(nav) = property.as_navigation() else {
            continue;
        };
        let Some(partner) = nav.partner else {
            continue;
        };
        let partner_property = model.property(partner);
        let mismatch = match partner_property.as_navigation() {
            None => true,
            Some(partner_nav) => {
                let back_ok = partner_nav.partner == Some(*p);
                let target_ok = match (model.to_entity_type(*p), partner_property.declaring_type()) {
                    (Some(target), Some(owner)) => related(ctx, target, owner),
                    _ => false,
                };
                let return_ok = model
                    .to_entity_type(partner)
                    .is_some_and(|t| related(ctx, t, id));
                !(back_ok && target_ok && return_ok)
            }
        };
        if mismatch {
            ctx.report(
                EdmErrorCode::NavigationPartnerMismatch,
                format!(
                    "Navigation property '{}' and its partner '{}' are not partners of each other",
                    property.name, partner_property.name
                ),
                ctx.property_location(*p),
            );
        }
    }
}

pub(crate) fn synthesized_partner_names(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    for p in model.declared_properties(id) {
        let property = model.property(*p);
        let Some(nav) = property.as_navigation() else {
            continue;
        };
        if nav.partner.is_some() {
            continue;
        }
        let (Some(target), Some(name)) = (model.to_entity_type(*p), model.partner_name(*p)) else {
            continue;
        };
        if model.find_property(target, &name).is_some() {
            ctx.report(
                EdmErrorCode::SynthesizedPartnerNameConflict,
                format!(
                    "The inverse name '{}' synthesized for '{}' collides with a property of '{}'",
                    name,
                    property.name,
                    ctx.type_name(target)
                ),
                ctx.property_location(*p),
            );
        }
    }
}

fn same_primitive(ctx: &ValidationContext<'_>, a: PropertyId, b: PropertyId) -> bool {
    let model = ctx.model;
    let (ta, tb) = (model.property(a).type_ref(), model.property(b).type_ref());
    match (ta.as_primitive(), tb.as_primitive()) {
        (Some(ka), Some(kb)) => ka == kb,
        _ => ta.definition == tb.definition,
    }
}

pub(crate) fn referential_constraints(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    for p in model.declared_properties(id) {
        let property = model.property(*p);
        let Some(nav) = property.as_navigation() else {
            continue;
        };
        if nav.dependent_properties.is_empty() && nav.principal_properties.is_empty() {
            continue;
        }
        let location = ctx.property_location(*p);
        if nav.dependent_properties.len() != nav.principal_properties.len() {
            ctx.report(
                EdmErrorCode::ReferentialConstraintCountMismatch,
                format!(
                    "Referential constraint of '{}' has {} dependent and {} principal properties",
                    property.name,
                    nav.dependent_properties.len(),
                    nav.principal_properties.len()
                ),
                location.clone(),
            );
            continue;
        }
        let own = model.properties(id);
        let target_properties = model
            .to_entity_type(*p)
            .map(|t| model.properties(t))
            .unwrap_or_default();
        for (dependent, principal) in nav.dependent_properties.iter().zip(&nav.principal_properties) {
            let problem = if !own.contains(dependent) {
                Some(format!("'{}' is not a property of the declaring type", model.property(*dependent).name))
            } else if !target_properties.contains(principal) {
                Some(format!("'{}' is not a property of the target type", model.property(*principal).name))
            } else if !same_primitive(ctx, *dependent, *principal) {
                Some(format!(
                    "'{}' and '{}' have different types",
                    model.property(*dependent).name,
                    model.property(*principal).name
                ))
            } else {
                None
            };
            if let Some(problem) = problem {
                ctx.report(
                    EdmErrorCode::ReferentialConstraintPropertyMismatch,
                    format!("Referential constraint of '{}': {}", property.name, problem),
                    location.clone(),
                );
            }
        }
    }
}

fn declared_key(ctx: &ValidationContext<'_>, id: TypeId) -> Vec<PropertyId> {
    match &ctx.model.schema_type(id).kind {
        SchemaTypeKind::Entity(entity) => entity.declared_key().to_vec(),
        _ => Vec::new(),
    }
}

pub(crate) fn key_property_ownership(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    let properties = model.properties(id);
    for key in declared_key(ctx, id) {
        if !properties.contains(&key) {
            ctx.report(
                EdmErrorCode::KeyPropertyMustBelongToEntity,
                format!(
                    "Key property '{}' does not belong to '{}'",
                    model.property(key).name,
                    ctx.type_name(id)
                ),
                ctx.type_location(id),
            );
        }
    }
}

pub(crate) fn duplicate_key_properties(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let mut seen = HashSet::new();
    for key in declared_key(ctx, id) {
        if !seen.insert(key) {
            ctx.report(
                EdmErrorCode::DuplicatePropertySpecifiedInEntityKey,
                format!(
                    "Key property '{}' is specified more than once on '{}'",
                    ctx.model.property(key).name,
                    ctx.type_name(id)
                ),
                ctx.type_location(id),
            );
        }
    }
}

pub(crate) fn key_properties(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    let properties = model.properties(id);
    let mut seen = HashSet::new();
    for key in declared_key(ctx, id) {
        if !properties.contains(&key) || !seen.insert(key) {
            continue;
        }
        let property = model.property(key);
        let type_ref = property.type_ref();
        let primitive_or_enum = match &type_ref.definition {
            TypeDefinition::Primitive(kind) => !kind.is_spatial() && *kind != PrimitiveKind::Stream,
            TypeDefinition::Schema(t) => model.schema_type(*t).is_enum(),
            _ => false,
        };
        let problem = if property.is_navigation() {
            Some("is a navigation property")
        } else if type_ref.nullable {
            Some("is nullable")
        } else if !primitive_or_enum {
            Some("is not a primitive or enum property")
        } else {
            None
        };
        if let Some(problem) = problem {
            ctx.report(
                EdmErrorCode::InvalidKey,
                format!("Key property '{}' of '{}' {}", property.name, ctx.type_name(id), problem),
                ctx.property_location(key),
            );
        }
    }
}

pub(crate) fn missing_key(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    let ty = model.schema_type(id);
    let Some(entity) = (match &ty.kind {
        SchemaTypeKind::Entity(entity) => Some(entity),
        _ => None,
    }) else {
        return;
    };
    if entity.is_abstract || model.is_in_cycle(id) {
        return;
    }
    if model.key(id).is_empty() {
        ctx.report(
            EdmErrorCode::KeyMissingOnEntityType,
            format!("Entity type '{}' has no key", ty.qualified_name()),
            ctx.type_location(id),
        );
    }
}

pub(crate) fn enum_types(ctx: &mut ValidationContext<'_>, id: TypeId) {
    let model = ctx.model;
    let Some(enum_type) = model.schema_type(id).as_enum() else {
        return;
    };
    let Some((min, max)) = enum_type.underlying_type.integer_range() else {
        ctx.report(
            EdmErrorCode::EnumMustHaveIntegerUnderlyingType,
            format!(
                "Underlying type '{}' of enum '{}' is not an integer type",
                enum_type.underlying_type,
                ctx.type_name(id)
            ),
            ctx.type_location(id),
        );
        return;
    };
    let mut seen = HashSet::new();
    for member in enum_type.members() {
        let location = model.location_of(&AnnotationTarget::EnumMember {
            enum_type: id,
            member: member.name.clone(),
        });
        if !seen.insert(member.name.as_str()) {
            ctx.report(
                EdmErrorCode::AlreadyDefined,
                format!("Member '{}' is already defined on '{}'", member.name, ctx.type_name(id)),
                location.clone(),
            );
        }
        if member.value < min || member.value > max {
            ctx.report(
                EdmErrorCode::EnumMemberValueOutOfRange,
                format!(
                    "Value {} of member '{}' is out of range for {}",
                    member.value, member.name, enum_type.underlying_type
                ),
                location,
            );
        }
    }
}

pub(crate) fn operations(ctx: &mut ValidationContext<'_>, id: OperationId) {
    let model = ctx.model;
    let op = model.operation(id);
    let location = model.location_of(&AnnotationTarget::Operation(id));
    if op.is_bound && op.parameters().is_empty() {
        ctx.report(
            EdmErrorCode::BoundOperationMustHaveParameters,
            format!("Bound {} '{}' has no binding parameter", op.kind_name(), op.qualified_name()),
            location.clone(),
        );
    }
    match &op.return_type {
        None if op.is_function() => ctx.report(
            EdmErrorCode::FunctionMustHaveReturnType,
            format!("Function '{}' has no return type", op.qualified_name()),
            location.clone(),
        ),
        Some(return_type) => {
            let what = format!("the return type of '{}'", op.name);
            check_resolved(ctx, return_type, &what, &location);
        }
        None => {}
    }
    let mut seen = HashSet::new();
    for parameter in op.parameters() {
        let location = model.location_of(&AnnotationTarget::Parameter {
            operation: id,
            parameter: parameter.name.clone(),
        });
        if !seen.insert(parameter.name.as_str()) {
            ctx.report(
                EdmErrorCode::AlreadyDefined,
                format!("Parameter '{}' is already defined on '{}'", parameter.name, op.name),
                location.clone(),
            );
        }
        if !is_simple_identifier(&parameter.name) {
            ctx.report(
                EdmErrorCode::InvalidName,
                format!("'{}' is not a valid simple identifier", parameter.name),
                location.clone(),
            );
        }
        let what = format!("parameter '{}'", parameter.name);
        check_resolved(ctx, &parameter.type_ref, &what, &location);
    }
}

pub(crate) fn terms(ctx: &mut ValidationContext<'_>, id: TermId) {
    let model = ctx.model;
    let term = model.term(id);
    let location = model.location_of(&AnnotationTarget::Term(id));
    let what = format!("term '{}'", term.name);
    check_resolved(ctx, &term.type_ref, &what, &location);
}

fn mentions_untyped(type_ref: &TypeReference) -> bool {
    type_ref.element_or_self().as_primitive() == Some(PrimitiveKind::Untyped)
}

pub(crate) fn untyped_not_supported(ctx: &mut ValidationContext<'_>, element: SchemaElement) {
    let model = ctx.model;
    let mut uses: Vec<(String, EdmLocation)> = Vec::new();
    match element {
        SchemaElement::Type(id) => {
            for p in model.declared_properties(id) {
                if mentions_untyped(model.property(*p).type_ref()) {
                    uses.push((model.property(*p).name.clone(), ctx.property_location(*p)));
                }
            }
        }
        SchemaElement::Operation(id) => {
            let op = model.operation(id);
            let location = model.location_of(&AnnotationTarget::Operation(id));
            if op.return_type.as_ref().is_some_and(mentions_untyped) {
                uses.push((format!("{} return type", op.name), location.clone()));
            }
            for parameter in op.parameters() {
                if mentions_untyped(&parameter.type_ref) {
                    uses.push((parameter.name.clone(), location.clone()));
                }
            }
        }
        SchemaElement::Term(id) => {
            if mentions_untyped(&model.term(id).type_ref) {
                uses.push((model.term(id).name.clone(), model.location_of(&AnnotationTarget::Term(id))));
            }
        }
        SchemaElement::Container(_) => {}
    }
    for (what, location) in uses {
        ctx.report(
            EdmErrorCode::TypeNotSupportedInVersion,
            format!("'{}' uses Edm.Untyped, which requires version 4.01", what),
            location,
        );
    }
}
