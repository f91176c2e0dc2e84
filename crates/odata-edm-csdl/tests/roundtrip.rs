//! Model -> CSDL -> model round trips

use odata_edm_csdl::{CsdlWriterSettings, XmlElement, parse_edmx, serialize, try_parse, write_edmx};
use odata_edm_diagnostics::EdmErrorCode;
use odata_edm_model::literal::literal_expression;
use odata_edm_model::{
    AnnotationTarget, ConstantKind, EnumMemberRef, Expression, MaxLength, Model, Multiplicity, NavigationPropertyInfo,
    OnDeleteAction, OperationRef, PrimitiveKind, PropertyKind, PropertyConstructor, Scale, Srid, TypeDefinition, TypeReference,
    VocabularyAnnotation,
};
use odata_edm_validation::validate_model;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

/// Serialize, read back and serialize again; both writes must agree
fn assert_round_trip(model: &Model) -> Vec<XmlElement> {
    let first = serialize(model);
    assert!(first.is_success(), "{:?}", first.errors);

    let parsed = try_parse(&first.schemas);
    assert!(parsed.is_success(), "{:?}", parsed.errors);

    let second = serialize(&parsed.model);
    assert!(second.is_success(), "{:?}", second.errors);
    assert_eq!(second.schemas, first.schemas);
    first.schemas
}

fn child<'a>(element: &'a XmlElement, name: &str, attr: &str, value: &str) -> &'a XmlElement {
    element
        .children
        .iter()
        .find(|c| c.name == name && c.attr(attr) == Some(value))
        .unwrap_or_else(|| panic!("no <{} {}=\"{}\">", name, attr, value))
}

/// Customers and orders with a constraint, a complex address and a country lookup
fn sales_model() -> Model {
    let mut model = Model::new();

    let country = model.add_entity_type("Sales", "Country");
    let code = model
        .add_structural_property(country, "Code", TypeReference::string(false).with_max_length(MaxLength::Bounded(2)))
        .unwrap();
    model.add_keys(country, &[code]).unwrap();

    let address = model.add_complex_type("Sales", "Address");
    model
        .add_structural_property(address, "Street", TypeReference::string(true).with_unicode(false))
        .unwrap();
    model
        .add_unidirectional_navigation(address, NavigationPropertyInfo::new("Country", country, Multiplicity::ZeroOrOne))
        .unwrap();

    let customer = model.add_entity_type("Sales", "Customer");
    let customer_id = model
        .add_structural_property(customer, "Id", TypeReference::int32(false))
        .unwrap();
    model.add_keys(customer, &[customer_id]).unwrap();
    model
        .add_structural_property(customer, "Address", TypeReference::schema(address, true))
        .unwrap();
    model
        .add_structural_property(
            customer,
            "Tags",
            TypeReference::collection(TypeReference::string(true)),
        )
        .unwrap();

    let order = model.add_entity_type("Sales", "Order");
    let order_id = model
        .add_structural_property(order, "Id", TypeReference::int32(false))
        .unwrap();
    let order_customer = model
        .add_structural_property(order, "CustomerId", TypeReference::int32(false))
        .unwrap();
    model.add_keys(order, &[order_id]).unwrap();

    model
        .add_bidirectional_navigation(
            order,
            NavigationPropertyInfo::new("Customer", customer, Multiplicity::One)
                .with_constraint(order_customer, customer_id)
                .with_on_delete(OnDeleteAction::Cascade),
            NavigationPropertyInfo::new("Orders", order, Multiplicity::Many),
        )
        .unwrap();

    let container = model.add_entity_container("Sales", "Default");
    model.add_entity_set(container, "Countries", TypeReference::schema(country, false));
    model.add_entity_set(container, "Customers", TypeReference::schema(customer, false));
    model.add_entity_set(container, "Orders", TypeReference::schema(order, false));
    model.add_singleton(container, "TopCustomer", TypeReference::schema(customer, false));

    let orders = model.find_property(customer, "Orders").unwrap();
    model.add_navigation_binding(container, "Customers", orders, "Orders").unwrap();
    let country_nav = model.find_property(address, "Country").unwrap();
    model
        .add_navigation_binding_with_path(container, "Customers", Some(country_nav), "Address/Country", "Countries")
        .unwrap();
    model
        .add_navigation_binding_with_path(container, "TopCustomer", Some(country_nav), "Address/Country", "Countries")
        .unwrap();

    model
}

#[test]
fn test_sales_model_is_valid_and_round_trips() {
    let model = sales_model();
    let validation = validate_model(&model);
    assert!(validation.is_valid(), "{:?}", validation.codes());

    let schemas = assert_round_trip(&model);
    assert_eq!(schemas.len(), 1);

    let order = child(&schemas[0], "EntityType", "Name", "Order");
    let customer_nav = child(order, "NavigationProperty", "Name", "Customer");
    assert_eq!(customer_nav.attr("Nullable"), Some("false"));
    assert_eq!(customer_nav.attr("Partner"), Some("Orders"));

    let container = child(&schemas[0], "EntityContainer", "Name", "Default");
    let customers = child(container, "EntitySet", "Name", "Customers");
    let paths: Vec<_> = customers.children.iter().filter_map(|b| b.attr("Path")).collect();
    assert_eq!(paths, vec!["Orders", "Address/Country"]);
}

#[test]
fn test_parsed_bindings_resolve_navigation_properties() {
    let schemas = serialize(&sales_model()).schemas;
    let parsed = try_parse(&schemas);
    let model = parsed.model;

    let container = model.find_entity_container("Sales.Default").unwrap();
    let customers = model.container(container).element("Customers").unwrap();
    let address = model.find_type("Sales.Address").unwrap();
    assert_eq!(
        customers.bindings()[1].navigation_property,
        model.find_property(address, "Country")
    );
}

#[rstest]
#[case::decimal(TypeReference::decimal(true, Some(1), Some(Scale::Fixed(1))))]
#[case::floating_decimal(TypeReference::decimal(false, Some(12), Some(Scale::Variable)))]
#[case::bounded_binary(TypeReference::binary(true).with_max_length(MaxLength::Bounded(10)))]
#[case::max_binary(TypeReference::binary(true).with_max_length(MaxLength::Max))]
#[case::ansi_string(TypeReference::string(false).with_unicode(false).with_max_length(MaxLength::Bounded(40)))]
#[case::point(TypeReference::primitive(PrimitiveKind::GeographyPoint, true).with_srid(Srid::Value(4326)))]
#[case::variable_srid(TypeReference::primitive(PrimitiveKind::GeometryPolygon, true).with_srid(Srid::Variable))]
#[case::timestamp(TypeReference::primitive(PrimitiveKind::DateTimeOffset, true).with_precision(3))]
#[case::collection(TypeReference::collection(TypeReference::string(false).with_max_length(MaxLength::Bounded(5))))]
fn test_facets_round_trip(#[case] type_ref: TypeReference) {
    let mut model = Model::new();
    let holder = model.add_complex_type("Facets", "Holder");
    let property = model
        .add_structural_property(holder, "Value", type_ref)
        .unwrap();

    assert_round_trip(&model);

    let parsed = try_parse(&serialize(&model).schemas).model;
    let holder = parsed.find_type("Facets.Holder").unwrap();
    let read = parsed.find_property(holder, "Value").unwrap();
    assert_eq!(parsed.property(read).type_ref(), model.property(property).type_ref());
}

#[test]
fn test_inheritance_and_flags_round_trip() {
    let mut model = Model::new();
    let shape = model.add_entity_type("Geo", "Shape");
    let id = model
        .add_structural_property(shape, "Id", TypeReference::int32(false))
        .unwrap();
    model.add_keys(shape, &[id]).unwrap();
    model.structured_type_mut(shape).unwrap().is_abstract = true;

    let circle = model.add_entity_type("Geo", "Circle");
    let square = model.add_entity_type("Geo", "Square");
    model.set_base_type(circle, Some(shape)).unwrap();
    model.set_base_type(square, Some(shape)).unwrap();
    model.structured_type_mut(circle).unwrap().is_open = true;
    model.structured_type_mut(square).unwrap().has_stream = true;

    let style = model.add_enum_type("Geo", "Style", PrimitiveKind::Int64, true);
    model.add_enum_member(style, "Filled", 1).unwrap();
    model.add_enum_member(style, "Dashed", 2).unwrap();
    model.add_enum_member(style, "Bold", 4).unwrap();
    let color = model.add_enum_type("Geo", "Color", PrimitiveKind::Int32, false);
    model.add_enum_member(color, "Red", 0).unwrap();
    model.add_enum_member(color, "Green", 1).unwrap();
    model
        .add_structural_property(circle, "Color", TypeReference::schema(color, false))
        .unwrap();

    let schemas = assert_round_trip(&model);

    let circle = child(&schemas[0], "EntityType", "Name", "Circle");
    assert_eq!(circle.attr("BaseType"), Some("Geo.Shape"));
    let style = child(&schemas[0], "EnumType", "Name", "Style");
    assert_eq!(style.attr("UnderlyingType"), Some("Edm.Int64"));
    assert_eq!(style.attr("IsFlags"), Some("true"));
    let color = child(&schemas[0], "EnumType", "Name", "Color");
    assert_eq!(color.attr("UnderlyingType"), None);
}

#[test]
fn test_operations_and_imports_round_trip() {
    let mut model = sales_model();
    let customer = model.find_type("Sales.Customer").unwrap();
    let order = model.find_type("Sales.Order").unwrap();

    let top = model.add_function(
        "Sales",
        "TopOrders",
        true,
        true,
        TypeReference::collection(TypeReference::schema(order, false)),
    );
    model.add_parameter(top, "customer", TypeReference::schema(customer, false));
    model.add_parameter(top, "count", TypeReference::int32(false));
    model.operation_mut(top).entity_set_path = Some("customer/Orders".to_string());

    let count = model.add_function("Sales", "CountOrders", false, false, TypeReference::int32(false));
    let reset = model.add_action("Sales", "Reset", false, None);
    model.add_parameter(reset, "hard", TypeReference::boolean(true));
    let cancel = model.add_action("Sales", "Cancel", true, Some(TypeReference::boolean(false)));
    model.add_parameter(cancel, "order", TypeReference::schema(order, false));

    let container = model.find_entity_container("Sales.Default").unwrap();
    model.add_function_import(container, "CountOrders", OperationRef::Resolved(count), None, true);
    model.add_action_import(container, "Reset", OperationRef::Resolved(reset), Some("Orders".to_string()));

    let schemas = assert_round_trip(&model);

    let top = child(&schemas[0], "Function", "Name", "TopOrders");
    assert_eq!(top.attr("IsBound"), Some("true"));
    assert_eq!(top.attr("IsComposable"), Some("true"));
    assert_eq!(top.attr("EntitySetPath"), Some("customer/Orders"));
    let container = child(&schemas[0], "EntityContainer", "Name", "Default");
    let import = child(container, "FunctionImport", "Name", "CountOrders");
    assert_eq!(import.attr("IncludeInServiceDocument"), Some("true"));
}

/// Terms in their own vocabulary namespace, applied in several placements
fn annotated_model() -> Model {
    let mut model = sales_model();
    model.set_namespace_alias("Sales", "S");

    let description = model.add_term("Vocab", "Description", TypeReference::string(true));
    let rating = model.add_term("Vocab", "Rating", TypeReference::int32(true));
    let shipping = model.add_term("Vocab", "Shipping", TypeReference::string(true));
    model.term_mut(shipping).applies_to = Some("EntityType Property".to_string());
    model.term_mut(shipping).default_value = Some("Ground".to_string());

    let customer = model.find_type("Sales.Customer").unwrap();
    let order = model.find_type("Sales.Order").unwrap();
    let customer_id = model.find_property(customer, "Id").unwrap();
    let container = model.find_entity_container("Sales.Default").unwrap();

    model.add_vocabulary_annotation(
        VocabularyAnnotation::new(customer, description, Expression::string("A customer")).inline(),
    );
    model.add_vocabulary_annotation(VocabularyAnnotation::new(order, rating, Expression::int(5)));
    model.add_vocabulary_annotation(
        VocabularyAnnotation::new(order, rating, Expression::int(3)).with_qualifier("Mobile"),
    );
    model.add_vocabulary_annotation(
        VocabularyAnnotation::new(customer_id, description, Expression::string("Identity")).hosted_in("Elsewhere"),
    );
    model.add_vocabulary_annotation(
        VocabularyAnnotation::new(
            AnnotationTarget::ContainerElement {
                container,
                element: "Orders".to_string(),
            },
            shipping,
            Expression::path("Customer/Address/Street"),
        )
        .inline(),
    );
    model.add_vocabulary_annotation(VocabularyAnnotation::new(
        description,
        rating,
        Expression::if_else(
            Expression::bool(true),
            literal_expression(ConstantKind::Decimal, "1.5"),
            Expression::cast(Expression::int(2), TypeReference::primitive(PrimitiveKind::Byte, false)),
        ),
    ));

    model
}

#[test]
fn test_annotations_round_trip() {
    let model = annotated_model();
    let schemas = assert_round_trip(&model);

    let namespaces: Vec<_> = schemas.iter().filter_map(|s| s.attr("Namespace")).collect();
    assert_eq!(namespaces, vec!["Sales", "Vocab", "Elsewhere"]);
    assert_eq!(schemas[0].attr("Alias"), Some("S"));

    let customer = child(&schemas[0], "EntityType", "Name", "Customer");
    let inline = child(customer, "Annotation", "Term", "Vocab.Description");
    assert_eq!(inline.attr("String"), Some("A customer"));

    let order_block = child(&schemas[0], "Annotations", "Target", "Sales.Order");
    assert_eq!(order_block.children.len(), 2);
    let hosted = child(&schemas[2], "Annotations", "Target", "Sales.Customer/Id");
    assert_eq!(hosted.children.len(), 1);
}

#[test]
fn test_read_annotations_keep_placement_and_host() {
    let schemas = serialize(&annotated_model()).schemas;
    let model = try_parse(&schemas).model;

    let customer = model.find_type("Sales.Customer").unwrap();
    let customer_id = model.find_property(customer, "Id").unwrap();
    let description = model.find_term("Vocab.Description").unwrap();

    let identity = model
        .find_vocabulary_annotation(&AnnotationTarget::Property(customer_id), description, None)
        .unwrap();
    assert_eq!(identity.hosting_namespace.as_deref(), Some("Elsewhere"));
    assert_eq!(*identity.expression, Expression::string("Identity"));
}

#[test]
fn test_record_collection_and_labels_round_trip() {
    let mut model = Model::new();
    let color = model.add_enum_type("Style", "Color", PrimitiveKind::Int32, true);
    model.add_enum_member(color, "Red", 1).unwrap();
    model.add_enum_member(color, "Blue", 2).unwrap();
    let palette = model.add_complex_type("Style", "Palette");
    model
        .add_structural_property(palette, "Name", TypeReference::string(true))
        .unwrap();
    model
        .add_structural_property(palette, "Colors", TypeReference::schema(color, true))
        .unwrap();
    let term = model.add_term("Style", "Palettes", TypeReference::collection(TypeReference::schema(palette, true)));

    let members = Expression::enum_member(vec![
        EnumMemberRef {
            enum_type: TypeDefinition::Schema(color),
            member: "Red".to_string(),
        },
        EnumMemberRef {
            enum_type: TypeDefinition::Schema(color),
            member: "Blue".to_string(),
        },
    ]);
    let value = Expression::collection(
        None,
        vec![
            Expression::labeled(
                "Warm",
                Expression::record(
                    Some(TypeReference::schema(palette, true)),
                    vec![
                        PropertyConstructor::new("Name", Expression::string("warm")),
                        PropertyConstructor::new("Colors", members),
                    ],
                ),
            ),
            Expression::labeled_reference("Warm"),
            Expression::apply(
                OperationRef::Unresolved("odata.concat".to_string()),
                vec![Expression::string("a"), Expression::binary(vec![0xAB, 0x01])],
            ),
            Expression::is_of(Expression::null(), TypeReference::schema(palette, true)),
        ],
    );
    model.add_vocabulary_annotation(VocabularyAnnotation::new(palette, term, value.clone()));

    assert_round_trip(&model);

    let parsed = try_parse(&serialize(&model).schemas).model;
    assert_eq!(*parsed.vocabulary_annotations()[0].expression, value);
}

#[test]
fn test_cyclic_model_serializes_nothing() {
    let mut model = Model::new();
    let a = model.add_entity_type("NS", "A");
    let b = model.add_entity_type("NS", "B");
    model.set_base_type(a, Some(b)).unwrap();
    model.set_base_type(b, Some(a)).unwrap();

    let serialized = serialize(&model);
    assert!(serialized.schemas.is_empty());
    assert_eq!(serialized.errors.len(), 2);
    assert!(
        serialized
            .errors
            .iter()
            .all(|e| e.code == EdmErrorCode::InterfaceCriticalCycleInTypeHierarchy)
    );
}

#[test]
fn test_invalid_model_still_round_trips() {
    let mut model = Model::new();
    // No key and a navigation to a complex type: invalid, but writable
    let thing = model.add_entity_type("Broken", "Thing");
    let part = model.add_complex_type("Broken", "Part");
    let nav = model.create_navigation_property("Part", TypeReference::schema(part, true));
    model.add_property(thing, nav).unwrap();

    assert!(!validate_model(&model).is_valid());
    assert_round_trip(&model);
}

#[test]
fn test_unpaired_constraint_properties_write_matched_pairs() {
    let mut model = sales_model();
    let order = model.find_type("Sales.Order").unwrap();
    let order_id = model.find_property(order, "Id").unwrap();
    let to_customer = model.find_property(order, "Customer").unwrap();
    if let PropertyKind::Navigation(nav) = &mut model.property_mut(to_customer).kind {
        nav.dependent_properties.push(order_id);
    }

    let validation = validate_model(&model);
    assert!(validation.codes().contains(&EdmErrorCode::ReferentialConstraintCountMismatch));

    let serialized = serialize(&model);
    let order = child(&serialized.schemas[0], "EntityType", "Name", "Order");
    let customer_nav = child(order, "NavigationProperty", "Name", "Customer");
    let constraints: Vec<_> = customer_nav
        .children
        .iter()
        .filter(|c| c.name == "ReferentialConstraint")
        .map(|c| (c.attr("Property"), c.attr("ReferencedProperty")))
        .collect();
    assert_eq!(constraints, vec![(Some("CustomerId"), Some("Id"))]);
}

#[test]
fn test_text_round_trip() {
    let model = annotated_model();
    let expected = serialize(&model).schemas;

    for settings in [CsdlWriterSettings::default(), CsdlWriterSettings::compact()] {
        let document = write_edmx(&model, &settings).unwrap();
        assert!(document.errors.is_empty());

        let parsed = parse_edmx(&document.text).unwrap();
        assert!(parsed.is_success(), "{:?}", parsed.errors);
        assert_eq!(serialize(&parsed.model).schemas, expected);
    }
}

fn qualified_values(qualifiers: &[String], values: &[i64]) -> Model {
    let mut model = Model::new();
    let target = model.add_complex_type("Q", "Target");
    let term = model.add_term("Q", "Level", TypeReference::int32(true));
    for (qualifier, value) in qualifiers.iter().zip(values) {
        model.add_vocabulary_annotation(
            VocabularyAnnotation::new(target, term, Expression::int(*value)).with_qualifier(qualifier.clone()),
        );
    }
    model
}

#[test]
fn test_unusual_qualifiers_survive() {
    let qualifiers = vec!["3".to_string(), "<&\"odd'>".to_string(), "foo+bar".to_string()];
    let values = [99, 127, 127];
    let model = qualified_values(&qualifiers, &values);

    let document = write_edmx(&model, &CsdlWriterSettings::default()).unwrap();
    let parsed = parse_edmx(&document.text).unwrap().model;

    let target = AnnotationTarget::Type(parsed.find_type("Q.Target").unwrap());
    let term = parsed.find_term("Q.Level").unwrap();
    for (qualifier, value) in qualifiers.iter().zip(values) {
        let annotation = parsed
            .find_vocabulary_annotation(&target, term, Some(qualifier))
            .unwrap();
        assert_eq!(*annotation.expression, Expression::int(value));
    }
}

proptest! {
    #[test]
    fn prop_qualified_annotations_are_independently_retrievable(
        qualifiers in prop::collection::hash_set("[A-Za-z0-9_+-]{1,12}", 1..5),
        seed in any::<i64>(),
    ) {
        let qualifiers: Vec<String> = qualifiers.into_iter().collect();
        let values: Vec<i64> = (0..qualifiers.len() as i64).map(|i| seed.wrapping_add(i)).collect();
        let model = qualified_values(&qualifiers, &values);

        let document = write_edmx(&model, &CsdlWriterSettings::compact()).unwrap();
        let parsed = parse_edmx(&document.text).unwrap().model;
        let target = AnnotationTarget::Type(parsed.find_type("Q.Target").unwrap());
        let term = parsed.find_term("Q.Level").unwrap();

        for (qualifier, value) in qualifiers.iter().zip(&values) {
            let annotation = parsed.find_vocabulary_annotation(&target, term, Some(qualifier));
            prop_assert!(annotation.is_some());
            prop_assert_eq!(&*annotation.unwrap().expression, &Expression::int(*value));
        }
    }
}
