//! Validation driver

use crate::context::ValidationContext;
use crate::rules::{Rule, RuleScope, RuleSet};
use crate::{annotation, container, structure};
use log::debug;
use odata_edm_diagnostics::{EdmError, Severity};
use odata_edm_model::{Model, SchemaElement};

/// Outcome of validating a model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<EdmError>,
}

impl ValidationResult {
    /// Check if no error-severity diagnostic was produced
    pub fn is_valid(&self) -> bool {
        !self.errors.iter().any(|e| e.severity == Severity::Error)
    }

    /// Error codes in report order
    pub fn codes(&self) -> Vec<odata_edm_diagnostics::EdmErrorCode> {
        self.errors.iter().map(|e| e.code).collect()
    }
}

/// Runs a rule set over a model
pub struct Validator<'m> {
    model: &'m Model,
    rules: RuleSet,
}

impl<'m> Validator<'m> {
    /// Validator using the rule set of the model's version
    pub fn new(model: &'m Model) -> Self {
        Self {
            model,
            rules: RuleSet::for_version(model.version()),
        }
    }

    /// Use a specific rule set
    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    /// Validate every schema element, then every annotation
    pub fn validate(&self) -> ValidationResult {
        let mut ctx = ValidationContext::new(self.model);

        let element_rules: Vec<Rule> = self.rules.scoped(RuleScope::Element).collect();
        for element in self.model.schema_elements() {
            for rule in &element_rules {
                check_element(&mut ctx, *rule, element);
            }
        }

        let annotation_rules: Vec<Rule> = self.rules.scoped(RuleScope::Annotation).collect();
        for (index, annotation) in self.model.vocabulary_annotations().iter().enumerate() {
            for rule in &annotation_rules {
                match rule {
                    Rule::AnnotationTargets => annotation::annotation_targets(&mut ctx, annotation),
                    Rule::DuplicateAnnotations => annotation::duplicate_annotations(&mut ctx, index),
                    Rule::AnnotationExpressions => annotation::annotation_expressions(&mut ctx, annotation),
                    _ => {}
                }
            }
        }

        let errors = ctx.into_errors();
        debug!(
            "Validated {} element(s) against {} rule(s): {} error(s)",
            self.model.schema_elements().len(),
            self.rules.rules().len(),
            errors.len()
        );
        ValidationResult { errors }
    }
}

fn check_element(ctx: &mut ValidationContext<'_>, rule: Rule, element: SchemaElement) {
    match (rule, element) {
        (Rule::ElementNames, _) => structure::element_names(ctx, element),
        (Rule::DuplicateElements, _) => structure::duplicate_elements(ctx, element),
        (Rule::UntypedNotSupported, _) => structure::untyped_not_supported(ctx, element),
        (Rule::TypeHierarchyCycle, SchemaElement::Type(id)) => structure::type_hierarchy_cycle(ctx, id),
        (Rule::BaseTypeKind, SchemaElement::Type(id)) => structure::base_type_kind(ctx, id),
        (Rule::DuplicateProperties, SchemaElement::Type(id)) => structure::duplicate_properties(ctx, id),
        (Rule::PropertyTypes, SchemaElement::Type(id)) => structure::property_types(ctx, id),
        (Rule::NavigationTargets, SchemaElement::Type(id)) => structure::navigation_targets(ctx, id),
        (Rule::NavigationPartners, SchemaElement::Type(id)) => structure::navigation_partners(ctx, id),
        (Rule::SynthesizedPartnerNames, SchemaElement::Type(id)) => {
            structure::synthesized_partner_names(ctx, id)
        }
        (Rule::ReferentialConstraints, SchemaElement::Type(id)) => {
            structure::referential_constraints(ctx, id)
        }
        (Rule::KeyPropertyOwnership, SchemaElement::Type(id)) => structure::key_property_ownership(ctx, id),
        (Rule::DuplicateKeyProperties, SchemaElement::Type(id)) => {
            structure::duplicate_key_properties(ctx, id)
        }
        (Rule::KeyProperties, SchemaElement::Type(id)) => structure::key_properties(ctx, id),
        (Rule::MissingKey, SchemaElement::Type(id)) => structure::missing_key(ctx, id),
        (Rule::EnumTypes, SchemaElement::Type(id)) => structure::enum_types(ctx, id),
        (Rule::Operations, SchemaElement::Operation(id)) => structure::operations(ctx, id),
        (Rule::Terms, SchemaElement::Term(id)) => structure::terms(ctx, id),
        (Rule::ContainerElementNames, SchemaElement::Container(id)) => {
            container::container_element_names(ctx, id)
        }
        (Rule::EntitySetTypes, SchemaElement::Container(id)) => container::entity_set_types(ctx, id),
        (Rule::NavigationBindings, SchemaElement::Container(id)) => container::navigation_bindings(ctx, id),
        (Rule::OperationImports, SchemaElement::Container(id)) => container::operation_imports(ctx, id),
        _ => {}
    }
}

/// Validate `model` under `rules`
pub fn validate(model: &Model, rules: &RuleSet) -> ValidationResult {
    Validator::new(model).with_rules(rules.clone()).validate()
}

/// Validate `model` under the rule set of its own version
pub fn validate_model(model: &Model) -> ValidationResult {
    Validator::new(model).validate()
}
