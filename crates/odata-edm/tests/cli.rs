//! Command tests over documents written to temporary files
#![cfg(feature = "cli")]

use odata_edm::cli::evaluate::{EvaluateConfig, evaluate};
use odata_edm::cli::roundtrip::{RoundTripConfig, roundtrip};
use odata_edm::cli::validate::{ValidateConfig, validate};
use odata_edm::csdl::parse_edmx;
use odata_edm::{EdmVersion, Value};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const SALES: &str = r#"<edmx:Edmx Version="4.0" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
  <edmx:DataServices>
    <Schema Namespace="Sales" xmlns="http://docs.oasis-open.org/odata/ns/edm">
      <EntityType Name="Customer">
        <Key>
          <PropertyRef Name="Id"/>
        </Key>
        <Property Name="Id" Type="Edm.Int32" Nullable="false"/>
        <Property Name="Name" Type="Edm.String"/>
      </EntityType>
      <Term Name="Priority" Type="Edm.Int32"/>
      <Annotations Target="Sales.Customer">
        <Annotation Term="Sales.Priority" Int="7"/>
        <Annotation Term="Sales.Priority" Qualifier="Low" Int="1"/>
      </Annotations>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>
"#;

const BROKEN: &str = r#"<Schema Namespace="Sales" xmlns="http://docs.oasis-open.org/odata/ns/edm">
  <ComplexType Name="Address">
    <Property Name="Country" Type="Sales.Country"/>
  </ComplexType>
</Schema>
"#;

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn test_validate_accepts_valid_documents() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sales.xml", SALES);

    let reports = validate(ValidateConfig {
        files: vec![file.clone()],
        version: None,
        verbose: false,
    })
    .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].file, file);
    assert_eq!(reports[0].error_count(), 0);
}

#[test]
fn test_validate_reports_errors_across_files() {
    let dir = TempDir::new().unwrap();
    let good = write(&dir, "sales.xml", SALES);
    let bad = write(&dir, "broken.xml", BROKEN);

    let err = validate(ValidateConfig {
        files: vec![good, bad],
        version: Some(EdmVersion::V401),
        verbose: true,
    })
    .unwrap_err();
    assert!(err.to_string().starts_with("Validation failed"), "{}", err);
}

#[test]
fn test_validate_needs_files() {
    let err = validate(ValidateConfig {
        files: vec![],
        version: None,
        verbose: false,
    })
    .unwrap_err();
    assert_eq!(err.to_string(), "No files specified for validation");
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let err = validate(ValidateConfig {
        files: vec![dir.path().join("absent.xml")],
        version: None,
        verbose: false,
    })
    .unwrap_err();
    assert!(err.to_string().starts_with("Failed to read file"), "{}", err);
}

#[rstest]
#[case(false, None)]
#[case(true, None)]
#[case(false, Some(EdmVersion::V401))]
fn test_roundtrip_writes_equivalent_document(#[case] compact: bool, #[case] version: Option<EdmVersion>) {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sales.xml", SALES);
    let out = dir.path().join("out.xml");

    roundtrip(RoundTripConfig {
        file,
        output_file: Some(out.clone()),
        compact,
        version,
    })
    .unwrap();

    let text = fs::read_to_string(&out).unwrap();
    let parsed = parse_edmx(&text).unwrap();
    assert!(parsed.is_success(), "{:?}", parsed.errors);
    assert!(parsed.model.find_type("Sales.Customer").is_some());
    assert_eq!(parsed.model.version(), version.unwrap_or(EdmVersion::V4));
    assert_eq!(parsed.model.vocabulary_annotations().len(), 2);
}

#[rstest]
#[case(None, 7)]
#[case(Some("Low"), 1)]
fn test_evaluate_prints_annotation_value(#[case] qualifier: Option<&str>, #[case] expected: i64) {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sales.xml", SALES);
    let out = dir.path().join("value.txt");

    let value = evaluate(EvaluateConfig {
        file,
        term: "Sales.Priority".to_string(),
        target: "Sales.Customer".to_string(),
        qualifier: qualifier.map(str::to_string),
        output_file: Some(out.clone()),
    })
    .unwrap();
    assert_eq!(value, Value::Integer(expected));
    assert_eq!(fs::read_to_string(&out).unwrap(), expected.to_string());
}

#[test]
fn test_evaluate_unknown_term_and_target() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "sales.xml", SALES);
    let config = |term: &str, target: &str| EvaluateConfig {
        file: file.clone(),
        term: term.to_string(),
        target: target.to_string(),
        qualifier: None,
        output_file: None,
    };

    let err = evaluate(config("Sales.Missing", "Sales.Customer")).unwrap_err();
    assert_eq!(err.to_string(), "Unknown term 'Sales.Missing'");
    let err = evaluate(config("Sales.Priority", "Sales.Order")).unwrap_err();
    assert_eq!(err.to_string(), "No annotations on 'Sales.Order'");
}
