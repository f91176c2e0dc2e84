//! Rules over entity containers

use crate::context::ValidationContext;
use crate::structure::check_resolved;
use odata_edm_diagnostics::{EdmErrorCode, EdmLocation};
use odata_edm_model::{AnnotationTarget, ContainerElementKind, ContainerId, OperationRef, TypeDefinition};
use std::collections::HashSet;

fn element_location(ctx: &ValidationContext<'_>, container: ContainerId, element: &str) -> EdmLocation {
    ctx.model.location_of(&AnnotationTarget::ContainerElement {
        container,
        element: element.to_string(),
    })
}

pub(crate) fn container_element_names(ctx: &mut ValidationContext<'_>, id: ContainerId) {
    let model = ctx.model;
    let container = model.container(id);
    let mut seen = HashSet::new();
    for element in container.elements() {
        if !seen.insert(element.name.as_str()) {
            let location = element
                .location
                .map(EdmLocation::Text)
                .unwrap_or_else(|| element_location(ctx, id, &element.name));
            ctx.report(
                EdmErrorCode::AlreadyDefined,
                format!(
                    "An element named '{}' is already defined in container '{}'",
                    element.name,
                    container.qualified_name()
                ),
                location,
            );
        }
    }
}

pub(crate) fn entity_set_types(ctx: &mut ValidationContext<'_>, id: ContainerId) {
    let model = ctx.model;
    for element in model.container(id).elements() {
        let Some(entity_type) = element.entity_type() else {
            continue;
        };
        let location = element_location(ctx, id, &element.name);
        let what = format!("{} '{}'", element.kind_name(), element.name);
        if !check_resolved(ctx, entity_type, &what, &location) {
            continue;
        }
        let is_entity = match &entity_type.definition {
            TypeDefinition::Schema(t) => model.schema_type(*t).is_entity(),
            _ => false,
        };
        if !is_entity {
            ctx.report(
                EdmErrorCode::TypeSemanticsCouldNotConvertTypeReference,
                format!(
                    "The type '{}' of {} is not an entity type",
                    model.type_reference_name(entity_type),
                    what
                ),
                location,
            );
        }
    }
}

pub(crate) fn navigation_bindings(ctx: &mut ValidationContext<'_>, id: ContainerId) {
    let model = ctx.model;
    for element in model.container(id).elements() {
        let source_type = element.entity_type().and_then(|t| t.as_schema_type());
        let mut seen = HashSet::new();
        for binding in element.bindings() {
            let location = binding
                .location
                .map(EdmLocation::Text)
                .unwrap_or_else(|| {
                    EdmLocation::element(format!(
                        "{}/{}",
                        model.target_path(&AnnotationTarget::ContainerElement {
                            container: id,
                            element: element.name.clone(),
                        }),
                        binding.path
                    ))
                });

            let reachable = match (binding.navigation_property, source_type) {
                (Some(nav), Some(source)) => {
                    let property = model.property(nav);
                    // paths through complex properties or type casts reach
                    // navigation properties declared elsewhere
                    property.is_navigation()
                        && property.declaring_type().is_some_and(|owner| {
                            model.is_or_inherits_from(source, owner)
                                || model.is_or_inherits_from(owner, source)
                                || binding.path.contains('/')
                        })
                }
                _ => false,
            };
            if !reachable {
                ctx.report(
                    EdmErrorCode::InvalidNavigationBinding,
                    format!(
                        "'{}' on '{}' is not a navigation property of its entity type",
                        binding.path, element.name
                    ),
                    location.clone(),
                );
            } else if !seen.insert((binding.navigation_property, binding.path.as_str())) {
                ctx.report(
                    EdmErrorCode::DuplicateNavigationBinding,
                    format!(
                        "Navigation property '{}' of '{}' is bound more than once",
                        binding.path, element.name
                    ),
                    location.clone(),
                );
            }

            if model.resolve_binding_target(id, &binding.target).is_none() {
                ctx.report(
                    EdmErrorCode::NavigationBindingTargetNotFound,
                    format!(
                        "Binding target '{}' of '{}' on '{}' cannot be found",
                        binding.target, binding.path, element.name
                    ),
                    location,
                );
            }
        }
    }
}

pub(crate) fn operation_imports(ctx: &mut ValidationContext<'_>, id: ContainerId) {
    let model = ctx.model;
    for element in model.container(id).elements() {
        let (import, expects_function) = match &element.kind {
            ContainerElementKind::ActionImport(import) => (import, false),
            ContainerElementKind::FunctionImport(import) => (import, true),
            _ => continue,
        };
        let location = element_location(ctx, id, &element.name);
        let operation = match &import.operation {
            OperationRef::Resolved(op) => *op,
            OperationRef::Unresolved(name) => {
                ctx.report(
                    EdmErrorCode::BadUnresolvedOperation,
                    format!("Operation '{}' imported by '{}' cannot be found", name, element.name),
                    location,
                );
                continue;
            }
        };
        let op = model.operation(operation);
        if op.is_bound {
            ctx.report(
                EdmErrorCode::OperationImportCannotImportBoundOperation,
                format!(
                    "'{}' imports bound {} '{}'",
                    element.name,
                    op.kind_name(),
                    op.qualified_name()
                ),
                location.clone(),
            );
        }
        if op.is_function() != expects_function {
            ctx.report(
                EdmErrorCode::OperationImportKindMismatch,
                format!(
                    "{} '{}' imports {} '{}'",
                    element.kind_name(),
                    element.name,
                    op.kind_name(),
                    op.qualified_name()
                ),
                location,
            );
        }
    }
}
