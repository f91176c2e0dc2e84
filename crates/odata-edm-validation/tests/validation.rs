//! Validator behaviour over hand-built models

use odata_edm_diagnostics::{EdmErrorCode, EdmLocation};
use odata_edm_model::{
    ConstantKind, EdmVersion, Expression, MaxLength, Model, Multiplicity, NavigationPropertyInfo,
    PrimitiveKind, PropertyConstructor, TypeReference, VocabularyAnnotation,
};
use odata_edm_validation::{Rule, RuleSet, validate, validate_model};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn keyed_entity(model: &mut Model, name: &str) -> odata_edm_model::TypeId {
    let ty = model.add_entity_type("NS", name);
    let id = model
        .add_structural_property(ty, "Id", TypeReference::int32(false))
        .unwrap();
    model.add_keys(ty, &[id]).unwrap();
    ty
}

#[test]
fn test_clean_model_is_valid() {
    let mut model = Model::new();
    let customer = keyed_entity(&mut model, "Customer");
    let order = keyed_entity(&mut model, "Order");
    model
        .add_bidirectional_navigation(
            customer,
            NavigationPropertyInfo::new("Orders", order, Multiplicity::Many),
            NavigationPropertyInfo::new("Customer", customer, Multiplicity::ZeroOrOne),
        )
        .unwrap();
    let container = model.add_entity_container("NS", "Default");
    model.add_entity_set(container, "Customers", TypeReference::schema(customer, false));

    let result = validate_model(&model);
    assert_eq!(result.errors, vec![]);
    assert!(result.is_valid());
}

#[test]
fn test_add_keys_errors_are_ordered() {
    let mut model = Model::new();
    let entity = model.add_entity_type("NS", "Person");
    let id = model
        .add_structural_property(entity, "Id", TypeReference::int32(false))
        .unwrap();
    let other = model.add_complex_type("NS", "Other");
    let foreign = model
        .add_structural_property(other, "Foreign", TypeReference::int32(false))
        .unwrap();

    model.add_keys(entity, &[id, id]).unwrap();
    model.add_keys(entity, &[id]).unwrap();
    model.add_keys(entity, &[foreign]).unwrap();

    let result = validate_model(&model);
    assert_eq!(
        result.codes(),
        vec![
            EdmErrorCode::KeyPropertyMustBelongToEntity,
            EdmErrorCode::DuplicatePropertySpecifiedInEntityKey,
            EdmErrorCode::DuplicatePropertySpecifiedInEntityKey,
        ]
    );
}

#[test]
fn test_cycle_is_reported_for_each_member() {
    let mut model = Model::new();
    let a = model.add_complex_type("NS", "A");
    let b = model.add_complex_type("NS", "B");
    model.set_base_type(a, Some(b)).unwrap();
    model.set_base_type(b, Some(a)).unwrap();

    let result = validate_model(&model);
    let cycle_locations: Vec<EdmLocation> = result
        .errors
        .iter()
        .filter(|e| e.code == EdmErrorCode::InterfaceCriticalCycleInTypeHierarchy)
        .filter_map(|e| e.location.clone())
        .collect();
    assert_eq!(
        cycle_locations,
        vec![EdmLocation::element("NS.A"), EdmLocation::element("NS.B")]
    );
}

#[test]
fn test_duplicate_names_are_flagged_after_the_first() {
    let mut model = Model::new();
    keyed_entity(&mut model, "Thing");
    model.add_complex_type("NS", "Thing");
    let ty = model.add_complex_type("NS", "Box");
    model.add_structural_property(ty, "Size", TypeReference::int32(true)).unwrap();
    model.add_structural_property(ty, "Size", TypeReference::string(true)).unwrap();

    let result = validate_model(&model);
    assert_eq!(
        result.codes(),
        vec![EdmErrorCode::AlreadyDefined, EdmErrorCode::AlreadyDefined]
    );
    assert_eq!(
        result.errors[1].location,
        Some(EdmLocation::element("NS.Box/Size"))
    );
}

#[test]
fn test_overloads_with_distinct_signatures_are_allowed() {
    let mut model = Model::new();
    let f1 = model.add_function("NS", "Find", false, false, TypeReference::int32(true));
    model.add_parameter(f1, "a", TypeReference::int32(false));
    let f2 = model.add_function("NS", "Find", false, false, TypeReference::int32(true));
    model.add_parameter(f2, "a", TypeReference::string(false));
    assert!(validate_model(&model).is_valid());

    let f3 = model.add_function("NS", "Find", false, false, TypeReference::int32(true));
    model.add_parameter(f3, "b", TypeReference::int32(false));
    assert_eq!(validate_model(&model).codes(), vec![EdmErrorCode::AlreadyDefined]);
}

#[test]
fn test_navigation_to_complex_type() {
    let mut model = Model::new();
    let customer = keyed_entity(&mut model, "Customer");
    let address = model.add_complex_type("NS", "Address");
    let nav = model.create_navigation_property("Address", TypeReference::schema(address, true));
    model.add_property(customer, nav).unwrap();

    let codes = validate_model(&model).codes();
    assert!(codes.contains(&EdmErrorCode::TypeSemanticsCouldNotConvertTypeReference));
}

#[test]
fn test_untyped_depends_on_version() {
    let mut model = Model::new();
    let ty = model.add_complex_type("NS", "Bag");
    model
        .add_structural_property(ty, "Anything", TypeReference::primitive(PrimitiveKind::Untyped, true))
        .unwrap();

    assert_eq!(
        validate(&model, &RuleSet::for_version(EdmVersion::V4)).codes(),
        vec![EdmErrorCode::TypeNotSupportedInVersion]
    );
    assert!(validate(&model, &RuleSet::for_version(EdmVersion::V401)).is_valid());
    assert!(
        validate(&model, &RuleSet::for_version(EdmVersion::V4).without(Rule::UntypedNotSupported))
            .is_valid()
    );
}

#[test]
fn test_synthesized_partner_name_conflict() {
    let mut model = Model::new();
    let person = keyed_entity(&mut model, "Person");
    let pet = keyed_entity(&mut model, "Pet");
    model
        .add_structural_property(pet, "Person_Pets", TypeReference::string(true))
        .unwrap();
    model
        .add_unidirectional_navigation(person, NavigationPropertyInfo::new("Pets", pet, Multiplicity::Many))
        .unwrap();

    assert_eq!(
        validate_model(&model).codes(),
        vec![EdmErrorCode::SynthesizedPartnerNameConflict]
    );
}

#[test]
fn test_binding_to_missing_target() {
    let mut model = Model::new();
    let customer = keyed_entity(&mut model, "Customer");
    let order = keyed_entity(&mut model, "Order");
    let orders = model
        .add_unidirectional_navigation(customer, NavigationPropertyInfo::new("Orders", order, Multiplicity::Many))
        .unwrap();
    let container = model.add_entity_container("NS", "Default");
    model.add_entity_set(container, "Customers", TypeReference::schema(customer, false));
    model.add_navigation_binding(container, "Customers", orders, "Orders").unwrap();

    assert_eq!(
        validate_model(&model).codes(),
        vec![EdmErrorCode::NavigationBindingTargetNotFound]
    );
}

enum TermType {
    Primitive(TypeReference),
    Complex,
    ComplexCollection,
}

fn annotated(term_type: TermType, expression: Expression) -> Vec<EdmErrorCode> {
    let mut model = Model::new();
    let address = model.add_complex_type("NS", "Address");
    model
        .add_structural_property(address, "Street", TypeReference::string(true))
        .unwrap();
    let type_ref = match term_type {
        TermType::Primitive(type_ref) => type_ref,
        TermType::Complex => TypeReference::schema(address, true),
        TermType::ComplexCollection => TypeReference::collection(TypeReference::schema(address, true)),
    };
    let term = model.add_term("NS", "Value", type_ref);
    model.add_vocabulary_annotation(VocabularyAnnotation::new(address, term, expression));
    validate_model(&model).codes()
}

#[rstest]
#[case::null_for_non_nullable(
    TermType::Primitive(TypeReference::int32(false)),
    Expression::null(),
    EdmErrorCode::NullCannotBeAssertedToBeANonNullableType
)]
#[case::constant_for_complex(
    TermType::Complex,
    Expression::int(1),
    EdmErrorCode::PrimitiveConstantExpressionNotValidForNonPrimitiveType
)]
#[case::wrong_primitive_kind(
    TermType::Primitive(TypeReference::string(true)),
    Expression::int(1),
    EdmErrorCode::ExpressionPrimitiveKindNotValidForAssertedType
)]
#[case::collection_for_scalar(
    TermType::Primitive(TypeReference::int32(true)),
    Expression::collection(None, vec![Expression::int(1)]),
    EdmErrorCode::CollectionExpressionNotValidForNonCollectionType
)]
#[case::record_for_collection(
    TermType::ComplexCollection,
    Expression::record(None, vec![]),
    EdmErrorCode::ExpressionNotValidForTheAssertedType
)]
#[case::record_extra_property(
    TermType::Complex,
    Expression::record(None, vec![PropertyConstructor::new("Zip", Expression::string("10001"))]),
    EdmErrorCode::RecordExpressionHasExtraProperties
)]
#[case::record_for_primitive(
    TermType::Primitive(TypeReference::int32(true)),
    Expression::record(None, vec![]),
    EdmErrorCode::RecordExpressionNotValidForNonStructuredType
)]
#[case::byte_out_of_range(
    TermType::Primitive(TypeReference::primitive(PrimitiveKind::Byte, true)),
    Expression::int(256),
    EdmErrorCode::IntegerConstantValueOutOfRange
)]
#[case::string_too_long(
    TermType::Primitive(TypeReference::string(true).with_max_length(MaxLength::Bounded(3))),
    Expression::string("abcd"),
    EdmErrorCode::StringConstantLengthOutOfRange
)]
#[case::binary_too_long(
    TermType::Primitive(TypeReference::binary(true).with_max_length(MaxLength::Bounded(2))),
    Expression::binary(vec![1, 2, 3]),
    EdmErrorCode::BinaryConstantLengthOutOfRange
)]
#[case::malformed_int(
    TermType::Primitive(TypeReference::int32(true)),
    Expression::malformed(ConstantKind::Int, "foo"),
    EdmErrorCode::InvalidInteger
)]
#[case::malformed_binary(
    TermType::Primitive(TypeReference::binary(true)),
    Expression::malformed(ConstantKind::Binary, "XYZ"),
    EdmErrorCode::InvalidBinary
)]
#[case::malformed_date(
    TermType::Primitive(TypeReference::primitive(PrimitiveKind::Date, true)),
    Expression::malformed(ConstantKind::Date, "2014-02-30"),
    EdmErrorCode::InvalidDate
)]
#[case::malformed_time(
    TermType::Primitive(TypeReference::primitive(PrimitiveKind::TimeOfDay, true)),
    Expression::malformed(ConstantKind::TimeOfDay, "25:61"),
    EdmErrorCode::InvalidTimeOfDay
)]
fn test_expression_against_term_type(
    #[case] term_type: TermType,
    #[case] expression: Expression,
    #[case] expected: EdmErrorCode,
) {
    assert_eq!(annotated(term_type, expression), vec![expected]);
}

#[rstest]
#[case(TermType::Primitive(TypeReference::primitive(PrimitiveKind::Byte, true)), Expression::int(255))]
#[case(TermType::Primitive(TypeReference::primitive(PrimitiveKind::Double, true)), Expression::int(3))]
#[case(TermType::Complex, Expression::record(None, vec![PropertyConstructor::new("Street", Expression::string("Main"))]))]
#[case(TermType::ComplexCollection, Expression::collection(None, vec![Expression::record(None, vec![])]))]
#[case(TermType::Primitive(TypeReference::string(true)), Expression::path("Street"))]
fn test_compatible_expressions(#[case] term_type: TermType, #[case] expression: Expression) {
    assert_eq!(annotated(term_type, expression), vec![]);
}

#[test]
fn test_duplicate_qualified_annotation() {
    let mut model = Model::new();
    let ty = model.add_complex_type("NS", "T");
    let term = model.add_term("NS", "Size", TypeReference::int32(true));
    model.add_vocabulary_annotation(VocabularyAnnotation::new(ty, term, Expression::int(1)).with_qualifier("a"));
    model.add_vocabulary_annotation(VocabularyAnnotation::new(ty, term, Expression::int(2)).with_qualifier("b"));
    assert!(validate_model(&model).is_valid());
    model.add_vocabulary_annotation(VocabularyAnnotation::new(ty, term, Expression::int(3)).with_qualifier("a"));
    assert_eq!(validate_model(&model).codes(), vec![EdmErrorCode::DuplicateAnnotation]);
}

#[test]
fn test_validation_does_not_stop_at_first_error() {
    let mut model = Model::new();
    model.add_entity_type("NS", "NoKey");
    model.add_enum_type("NS", "Color", PrimitiveKind::String, false);
    model.add_function("NS", "Bound", true, false, TypeReference::int32(true));
    assert_eq!(
        validate_model(&model).codes(),
        vec![
            EdmErrorCode::KeyMissingOnEntityType,
            EdmErrorCode::EnumMustHaveIntegerUnderlyingType,
            EdmErrorCode::BoundOperationMustHaveParameters,
        ]
    );
}
