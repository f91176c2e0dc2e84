//! EDM error codes following a structured numbering system
//!
//! Error code ranges:
//! - 0001-0099: XML and CSDL parse errors
//! - 0100-0199: Model structure errors (types, properties, containers, operations)
//! - 0200-0299: Vocabulary and expression errors
//! - 0300-0399: Serialization errors

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

macro_rules! error_codes {
    ($($name:ident = $code:literal => $description:literal,)*) => {
        /// Error code identifier
        ///
        /// The variant name is the stable, user-visible identifier of the error;
        /// the numeric code is used for grouping and compact display.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum EdmErrorCode {
            $(
                #[doc = $description]
                $name,
            )*
        }

        impl EdmErrorCode {
            /// Every known error code, in numeric order
            pub const ALL: &'static [EdmErrorCode] = &[$(EdmErrorCode::$name,)*];

            /// Get the numeric code
            pub const fn code(&self) -> u16 {
                match self {
                    $(EdmErrorCode::$name => $code,)*
                }
            }

            /// Get the variant name (e.g. `AlreadyDefined`)
            pub const fn name(&self) -> &'static str {
                match self {
                    $(EdmErrorCode::$name => stringify!($name),)*
                }
            }

            /// Short description of the error
            pub const fn description(&self) -> &'static str {
                match self {
                    $(EdmErrorCode::$name => $description,)*
                }
            }
        }
    };
}

error_codes! {
    // XML and CSDL parse errors (0001-0099)
    XmlError = 1 => "Malformed XML",
    UnexpectedXmlElement = 2 => "Unexpected XML element",
    UnexpectedXmlAttribute = 3 => "Unexpected XML attribute",
    MissingAttribute = 4 => "Required attribute is missing",
    MissingType = 5 => "Element has no type",
    InvalidVersionNumber = 6 => "Invalid CSDL version number",
    InvalidBoolean = 7 => "Invalid boolean value",
    InvalidInteger = 8 => "Invalid integer value",
    InvalidBinary = 9 => "Invalid binary value",
    InvalidDate = 10 => "Invalid date value",
    InvalidTimeOfDay = 11 => "Invalid time-of-day value",
    InvalidDateTimeOffset = 12 => "Invalid date-time-offset value",
    InvalidDuration = 13 => "Invalid duration value",
    InvalidDecimal = 14 => "Invalid decimal value",
    InvalidFloatingPoint = 15 => "Invalid floating point value",
    InvalidGuid = 16 => "Invalid GUID value",
    InvalidMaxLength = 17 => "Invalid MaxLength facet",
    InvalidSrid = 18 => "Invalid SRID facet",
    InvalidOnDelete = 19 => "Invalid OnDelete action",
    InvalidQualifiedName = 20 => "Invalid qualified name",
    InvalidTypeName = 21 => "Invalid type name",
    InvalidIfExpression = 22 => "If expression must have exactly three operands",
    InvalidCastExpression = 23 => "Cast and IsOf expressions must have exactly one operand",
    InvalidLabeledElement = 24 => "Labeled element must have exactly one operand",

    // Model structure errors (0100-0199)
    AlreadyDefined = 100 => "Name is already defined",
    InterfaceCriticalCycleInTypeHierarchy = 101 => "Type hierarchy contains a cycle",
    DuplicatePropertySpecifiedInEntityKey = 102 => "Property specified more than once in entity key",
    KeyPropertyMustBelongToEntity = 103 => "Key property does not belong to the entity type",
    KeyMissingOnEntityType = 104 => "Entity type has no key",
    InvalidKey = 105 => "Invalid entity key",
    BaseTypeKindMismatch = 106 => "Base type must be of the same kind as the derived type",
    InvalidPropertyType = 107 => "Invalid property type",
    ScaleOutOfRange = 108 => "Scale exceeds precision",
    EnumMustHaveIntegerUnderlyingType = 109 => "Enum underlying type must be an integer type",
    EnumMemberValueOutOfRange = 110 => "Enum member value out of range for the underlying type",
    InvalidName = 111 => "Invalid simple identifier",
    InvalidNamespaceName = 112 => "Invalid namespace name",
    BadUnresolvedType = 113 => "Type reference cannot be resolved",
    BadUnresolvedOperation = 114 => "Operation cannot be resolved",
    NavigationPartnerMismatch = 115 => "Navigation partners are not mutual or point to the wrong type",
    SynthesizedPartnerNameConflict = 116 => "Synthesized partner name collides with an existing property",
    ReferentialConstraintPropertyMismatch = 117 => "Referential constraint property does not belong to the expected type or has a mismatched type",
    ReferentialConstraintCountMismatch = 118 => "Referential constraint has mismatched dependent and principal counts",
    NavigationBindingTargetNotFound = 119 => "Navigation property binding target not found",
    InvalidNavigationBinding = 120 => "Navigation property binding does not refer to a navigation property of the source",
    DuplicateNavigationBinding = 121 => "Navigation property bound more than once for the same path",
    OperationImportCannotImportBoundOperation = 122 => "Operation import cannot import a bound operation",
    OperationImportKindMismatch = 123 => "Action imports must import actions and function imports functions",
    BoundOperationMustHaveParameters = 124 => "Bound operation must have at least one parameter",
    FunctionMustHaveReturnType = 125 => "Function must have a return type",
    TypeSemanticsCouldNotConvertTypeReference = 126 => "Type reference does not have the expected type kind",
    TypeNotSupportedInVersion = 127 => "Type is not supported in the target EDM version",

    // Vocabulary and expression errors (0200-0299)
    BadUnresolvedTerm = 200 => "Term cannot be resolved",
    BadUnresolvedTarget = 201 => "Annotation target cannot be resolved",
    BadUnresolvedEnumMember = 202 => "Enum member cannot be resolved",
    DuplicateAnnotation = 203 => "Term annotated more than once on the same target with the same qualifier",
    NullCannotBeAssertedToBeANonNullableType = 204 => "Null cannot be asserted to a non-nullable type",
    PrimitiveConstantExpressionNotValidForNonPrimitiveType = 205 => "Primitive constant is not valid for a non-primitive type",
    ExpressionPrimitiveKindNotValidForAssertedType = 206 => "Primitive kind of the expression is not valid for the asserted type",
    ExpressionNotValidForTheAssertedType = 207 => "Expression is not valid for the asserted type",
    CollectionExpressionNotValidForNonCollectionType = 208 => "Collection expression is not valid for a non-collection type",
    RecordExpressionNotValidForNonStructuredType = 209 => "Record expression is not valid for a non-structured type",
    RecordExpressionHasExtraProperties = 210 => "Record expression has properties not declared on a closed type",
    RecordExpressionMissingProperty = 211 => "Record expression is missing a non-nullable property",
    IntegerConstantValueOutOfRange = 212 => "Integer constant is out of range for the asserted type",
    StringConstantLengthOutOfRange = 213 => "String constant exceeds the asserted MaxLength",
    BinaryConstantLengthOutOfRange = 214 => "Binary constant exceeds the asserted MaxLength",

    // Serialization errors (0300-0399)
    SerializationFailed = 300 => "Model cannot be serialized",
}

impl fmt::Display for EdmErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl EdmErrorCode {
    /// Get extended information for this code
    pub fn info(&self) -> ErrorInfo {
        ERROR_HELP
            .get(self)
            .cloned()
            .unwrap_or_else(|| ErrorInfo::new(self.description()))
    }

    /// Check if this is a parse error (0001-0099)
    pub const fn is_parse_error(&self) -> bool {
        self.code() < 100
    }

    /// Check if this is a structural model error (0100-0199)
    pub const fn is_model_error(&self) -> bool {
        self.code() >= 100 && self.code() < 200
    }

    /// Check if this is a vocabulary or expression error (0200-0299)
    pub const fn is_expression_error(&self) -> bool {
        self.code() >= 200 && self.code() < 300
    }

    /// Formatted numeric identifier (e.g. `EDM0100`)
    pub fn numeric_id(&self) -> String {
        format!("EDM{:04}", self.code())
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static ERROR_HELP: LazyLock<HashMap<EdmErrorCode, ErrorInfo>> = LazyLock::new(|| {
    use EdmErrorCode::*;

    let mut map = HashMap::new();
    map.insert(
        AlreadyDefined,
        ErrorInfo::new(AlreadyDefined.description())
            .with_help("Rename one of the elements or remove the duplicate"),
    );
    map.insert(
        InterfaceCriticalCycleInTypeHierarchy,
        ErrorInfo::new(InterfaceCriticalCycleInTypeHierarchy.description())
            .with_help("A type cannot derive from itself, directly or indirectly"),
    );
    map.insert(
        KeyMissingOnEntityType,
        ErrorInfo::new(KeyMissingOnEntityType.description())
            .with_help("Declare a key or derive from an entity type that has one"),
    );
    map.insert(
        BadUnresolvedType,
        ErrorInfo::new(BadUnresolvedType.description())
            .with_help("Check the namespace or alias and that the schema declaring the type is loaded"),
    );
    map.insert(
        TypeNotSupportedInVersion,
        ErrorInfo::new(TypeNotSupportedInVersion.description())
            .with_help("Edm.Untyped requires CSDL version 4.01"),
    );
    map
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_unique_and_ordered() {
        let codes: Vec<u16> = EdmErrorCode::ALL.iter().map(|c| c.code()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn test_ranges() {
        assert!(EdmErrorCode::InvalidInteger.is_parse_error());
        assert!(EdmErrorCode::AlreadyDefined.is_model_error());
        assert!(EdmErrorCode::RecordExpressionHasExtraProperties.is_expression_error());
        assert!(!EdmErrorCode::SerializationFailed.is_model_error());
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(EdmErrorCode::AlreadyDefined.to_string(), "AlreadyDefined");
        assert_eq!(EdmErrorCode::AlreadyDefined.numeric_id(), "EDM0100");
    }

    #[test]
    fn test_info_help() {
        assert!(EdmErrorCode::AlreadyDefined.info().help.is_some());
        assert!(EdmErrorCode::InvalidGuid.info().help.is_none());
    }
}
