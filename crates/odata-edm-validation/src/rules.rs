//! Validation rules and version-keyed rule sets

use odata_edm_model::EdmVersion;

/// What a rule is evaluated against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleScope {
    /// Each top-level schema element
    Element,
    /// Each vocabulary annotation
    Annotation,
}

/// A single validation rule
///
/// Declaration order is the order rules run in for each element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Simple identifiers and namespace names are well formed
    ElementNames,
    /// No two top-level elements share a qualified name (overloads aside)
    DuplicateElements,
    /// Base-type chains do not cycle
    TypeHierarchyCycle,
    /// Entity types derive from entity types, complex from complex
    BaseTypeKind,
    /// Property names are unique across a type and its ancestors
    DuplicateProperties,
    /// Structural property types resolve and their facets are consistent
    PropertyTypes,
    /// Navigation targets are entity types
    NavigationTargets,
    /// Navigation partners are mutual and point back at the declaring type
    NavigationPartners,
    /// Synthesized inverse names do not collide on the target type
    SynthesizedPartnerNames,
    /// Referential constraints pair properties of the right types
    ReferentialConstraints,
    /// Key properties belong to the entity type
    KeyPropertyOwnership,
    /// Key properties are not listed twice
    DuplicateKeyProperties,
    /// Key properties are non-nullable primitives or enums
    KeyProperties,
    /// Non-abstract entity types have a key
    MissingKey,
    /// Enum underlying types and member values
    EnumTypes,
    /// Action and function shape
    Operations,
    /// Term types resolve
    Terms,
    /// Container element names are unique
    ContainerElementNames,
    /// Entity sets and singletons are typed by entity types
    EntitySetTypes,
    /// Navigation property bindings are valid and unique
    NavigationBindings,
    /// Operation imports resolve to unbound operations of the right kind
    OperationImports,
    /// `Edm.Untyped` is only available from 4.01
    UntypedNotSupported,
    /// Annotation targets and terms resolve
    AnnotationTargets,
    /// A term is applied once per target and qualifier
    DuplicateAnnotations,
    /// Annotation expressions fit the term type
    AnnotationExpressions,
}

impl Rule {
    /// Every rule in evaluation order
    pub const ALL: &'static [Rule] = &[
        Rule::ElementNames,
        Rule::DuplicateElements,
        Rule::TypeHierarchyCycle,
        Rule::BaseTypeKind,
        Rule::DuplicateProperties,
        Rule::PropertyTypes,
        Rule::NavigationTargets,
        Rule::NavigationPartners,
        Rule::SynthesizedPartnerNames,
        Rule::ReferentialConstraints,
        Rule::KeyPropertyOwnership,
        Rule::DuplicateKeyProperties,
        Rule::KeyProperties,
        Rule::MissingKey,
        Rule::EnumTypes,
        Rule::Operations,
        Rule::Terms,
        Rule::ContainerElementNames,
        Rule::EntitySetTypes,
        Rule::NavigationBindings,
        Rule::OperationImports,
        Rule::UntypedNotSupported,
        Rule::AnnotationTargets,
        Rule::DuplicateAnnotations,
        Rule::AnnotationExpressions,
    ];

    /// What this rule is evaluated against
    pub const fn scope(&self) -> RuleScope {
        match self {
            Rule::AnnotationTargets | Rule::DuplicateAnnotations | Rule::AnnotationExpressions => {
                RuleScope::Annotation
            }
            _ => RuleScope::Element,
        }
    }
}

/// Ordered set of rules for one EDM version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    version: EdmVersion,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// The fixed rule subset for `version`
    pub fn for_version(version: EdmVersion) -> Self {
        let rules = Rule::ALL
            .iter()
            .copied()
            .filter(|rule| version == EdmVersion::V4 || *rule != Rule::UntypedNotSupported)
            .collect();
        Self { version, rules }
    }

    /// A custom rule set; rules run in canonical order regardless of input order
    pub fn with_rules(version: EdmVersion, rules: impl IntoIterator<Item = Rule>) -> Self {
        let requested: Vec<Rule> = rules.into_iter().collect();
        let rules = Rule::ALL
            .iter()
            .copied()
            .filter(|rule| requested.contains(rule))
            .collect();
        Self { version, rules }
    }

    /// This set minus `rule`
    pub fn without(mut self, rule: Rule) -> Self {
        self.rules.retain(|r| *r != rule);
        self
    }

    /// Version the set was built for
    pub fn version(&self) -> EdmVersion {
        self.version
    }

    /// Rules in evaluation order
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Check if the set contains `rule`
    pub fn contains(&self, rule: Rule) -> bool {
        self.rules.contains(&rule)
    }

    pub(crate) fn scoped(&self, scope: RuleScope) -> impl Iterator<Item = Rule> + '_ {
        self.rules.iter().copied().filter(move |r| r.scope() == scope)
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::for_version(EdmVersion::default())
    }
}
