//! Type graph behaviour through the public API

use odata_edm_model::literal::{format_constant, parse_constant};
use odata_edm_model::{
    AnnotationTarget, BaseTypeResolution, ConstantKind, Model, Multiplicity, NavigationPropertyInfo,
    OnDeleteAction, PrimitiveKind, SchemaElement, TypeReference,
};
use odata_edm_model::diagnostics::EdmErrorCode;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn property_names(model: &Model, id: odata_edm_model::TypeId) -> Vec<String> {
    model
        .properties(id)
        .iter()
        .map(|p| model.property(*p).name.clone())
        .collect()
}

#[test]
fn test_adding_same_element_twice_keeps_count() {
    let mut model = Model::new();
    let person = model.create_entity_type("NS", "Person");
    let address = model.create_complex_type("NS", "Address");
    model.add_elements([person, address]);
    let before = model.schema_elements().len();
    model.add_element(person);
    assert_eq!(model.schema_elements().len(), before);
    assert_eq!(model.schema_elements().collect::<Vec<_>>(), vec![SchemaElement::from(person), SchemaElement::from(address)]);
}

#[test]
fn test_rebasing_onto_replacement_type_is_seen_without_refresh() {
    let mut model = Model::new();
    let t1 = model.add_entity_type("NS", "T1");
    let t2 = model.add_entity_type("NS", "T2");
    let t3 = model.add_entity_type("NS", "T3");
    model.add_structural_property(t1, "P1", TypeReference::int32(false)).unwrap();
    model.add_structural_property(t2, "P2", TypeReference::int32(false)).unwrap();
    model.add_structural_property(t3, "P3", TypeReference::int32(false)).unwrap();
    model.set_base_type(t2, Some(t1)).unwrap();
    model.set_base_type(t3, Some(t2)).unwrap();
    assert_eq!(property_names(&model, t3), vec!["P1", "P2", "P3"]);

    let t2b = model.add_entity_type("NS", "T2");
    model.add_structural_property(t2b, "Q", TypeReference::string(true)).unwrap();
    model.set_base_type(t2b, Some(t1)).unwrap();
    model.set_base_type(t3, Some(t2b)).unwrap();
    assert_eq!(property_names(&model, t3), vec!["P1", "Q", "P3"]);
}

#[test]
fn test_editing_middle_of_chain_in_place_is_seen_by_derived() {
    let mut model = Model::new();
    let t1 = model.add_entity_type("NS", "T1");
    let t2 = model.add_entity_type("NS", "T2");
    let t3 = model.add_entity_type("NS", "T3");
    model.add_structural_property(t1, "P1", TypeReference::int32(false)).unwrap();
    model.add_structural_property(t3, "P3", TypeReference::int32(false)).unwrap();
    model.set_base_type(t3, Some(t2)).unwrap();
    assert_eq!(property_names(&model, t3), vec!["P3"]);

    model.add_structural_property(t2, "P2", TypeReference::int32(false)).unwrap();
    model.set_base_type(t2, Some(t1)).unwrap();
    assert_eq!(property_names(&model, t3), vec!["P1", "P2", "P3"]);
    assert_eq!(model.ancestors(t3), vec![t2, t1]);
}

#[test]
fn test_ancestors_of_long_chain() {
    let mut model = Model::new();
    let types: Vec<_> = (0..500)
        .map(|i| model.add_entity_type("NS", &format!("T{}", i)))
        .collect();
    for pair in types.windows(2) {
        model.set_base_type(pair[1], Some(pair[0])).unwrap();
    }

    let ancestors = model.ancestors(types[499]);
    assert_eq!(ancestors.len(), 499);
    assert_eq!(ancestors[0], types[498]);
    assert_eq!(ancestors[498], types[0]);
}

#[test]
fn test_ancestors_stop_at_cycle_entry() {
    let mut model = Model::new();
    let a = model.add_entity_type("NS", "A");
    let b = model.add_entity_type("NS", "B");
    let leaf = model.add_entity_type("NS", "Leaf");
    model.set_base_type(a, Some(b)).unwrap();
    model.set_base_type(b, Some(a)).unwrap();
    model.set_base_type(leaf, Some(a)).unwrap();

    assert_eq!(model.base_type(leaf), Some(a));
    assert_eq!(model.ancestors(leaf), vec![a]);
    assert!(model.is_or_inherits_from(leaf, a));
    assert!(!model.is_or_inherits_from(leaf, b));
}

#[test]
fn test_two_type_cycle_terminates() {
    let mut model = Model::new();
    let a = model.add_entity_type("NS", "A");
    let b = model.add_entity_type("NS", "B");
    model.set_base_type(a, Some(b)).unwrap();
    model.set_base_type(b, Some(a)).unwrap();

    for ty in [a, b] {
        assert!(matches!(model.resolve_base_type(ty), BaseTypeResolution::Cyclic(_)));
        assert!(model.ancestors(ty).is_empty());
        assert!(model.key(ty).is_empty());
    }
}

#[test]
fn test_referential_constraint_from_builder() {
    let mut model = Model::new();
    let customer = model.add_entity_type("NS", "Customer");
    let order = model.add_entity_type("NS", "Order");
    let id = model.add_structural_property(customer, "Id", TypeReference::int32(false)).unwrap();
    let customer_id = model.add_structural_property(order, "CustomerId", TypeReference::int32(false)).unwrap();

    let (to_customer, to_orders) = model
        .add_bidirectional_navigation(
            order,
            NavigationPropertyInfo::new("Customer", customer, Multiplicity::One)
                .with_constraint(customer_id, id)
                .with_on_delete(OnDeleteAction::Cascade),
            NavigationPropertyInfo::new("Orders", order, Multiplicity::Many),
        )
        .unwrap();

    let nav = model.property(to_customer).as_navigation().unwrap();
    assert_eq!(nav.dependent_properties, vec![customer_id]);
    assert_eq!(nav.principal_properties, vec![id]);
    assert_eq!(nav.on_delete, Some(OnDeleteAction::Cascade));
    assert_eq!(nav.partner, Some(to_orders));
    assert!(!nav.target.nullable);
}

#[test]
fn test_removal_is_explicit() {
    let mut model = Model::new();
    let t = model.add_entity_type("NS", "T");
    let c = model.add_entity_container("NS", "Default");
    model.add_entity_set(c, "Ts", TypeReference::schema(t, false));
    assert!(model.remove_element(t));
    assert_eq!(model.find_type("NS.T"), None);
    // the set still refers to the detached type
    assert_eq!(model.container(c).element("Ts").unwrap().entity_type(), Some(&TypeReference::schema(t, false)));
    assert_eq!(model.target_path(&AnnotationTarget::Type(t)), "NS.T");
}

#[test]
fn test_referenced_elements_are_found_but_not_owned() {
    let mut model = Model::new();
    let shared = model.create_complex_type("Vocab", "Shared");
    model.add_referenced_element(shared);
    assert_eq!(model.find_type("Vocab.Shared"), Some(shared));
    assert_eq!(model.schema_elements().len(), 0);
    assert_eq!(model.referenced_elements().len(), 1);
}

#[rstest]
#[case(ConstantKind::Int, "-9223372036854775808")]
#[case(ConstantKind::Decimal, "3.14159")]
#[case(ConstantKind::Guid, "21ec2020-3aea-1069-a2dd-08002b30309d")]
#[case(ConstantKind::Bool, "true")]
#[case(ConstantKind::Duration, "PT1H30M")]
#[case(ConstantKind::TimeOfDay, "23:59:59")]
#[case(ConstantKind::Binary, "DEADBEEF")]
fn test_canonical_literals_are_stable(#[case] kind: ConstantKind, #[case] text: &str) {
    let constant = parse_constant(kind, text).unwrap();
    assert_eq!(format_constant(&constant), text);
}

#[rstest]
#[case(ConstantKind::Int, "12x", EdmErrorCode::InvalidInteger)]
#[case(ConstantKind::Binary, "ABC", EdmErrorCode::InvalidBinary)]
#[case(ConstantKind::Date, "2014-02-30", EdmErrorCode::InvalidDate)]
#[case(ConstantKind::TimeOfDay, "noon", EdmErrorCode::InvalidTimeOfDay)]
#[case(ConstantKind::Duration, "P1Y", EdmErrorCode::InvalidDuration)]
#[case(ConstantKind::Guid, "1234", EdmErrorCode::InvalidGuid)]
fn test_malformed_literals_map_to_codes(#[case] kind: ConstantKind, #[case] text: &str, #[case] code: EdmErrorCode) {
    assert_eq!(parse_constant(kind, text).unwrap_err().code(), code);
}

#[rstest]
#[case(PrimitiveKind::String, true, false, false)]
#[case(PrimitiveKind::Binary, true, false, false)]
#[case(PrimitiveKind::Decimal, false, true, true)]
#[case(PrimitiveKind::DateTimeOffset, false, true, false)]
#[case(PrimitiveKind::Int32, false, false, false)]
fn test_facet_support(
    #[case] kind: PrimitiveKind,
    #[case] max_length: bool,
    #[case] precision: bool,
    #[case] scale: bool,
) {
    assert_eq!(kind.supports_max_length(), max_length);
    assert_eq!(kind.supports_precision(), precision);
    assert_eq!(kind.supports_scale(), scale);
}
