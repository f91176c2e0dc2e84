//! Built-in EDM primitive types
//!
//! Primitive types are immutable and shared for the lifetime of the process.
//! They are looked up through [`PrimitiveRegistry::global`], a lazily built
//! table that is safe for unsynchronized concurrent reads.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

macro_rules! primitive_kinds {
    ($($kind:ident => $name:literal,)*) => {
        /// Kind of a built-in primitive type
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum PrimitiveKind {
            $($kind,)*
        }

        impl PrimitiveKind {
            /// Every primitive kind, in registry order
            pub const ALL: &'static [PrimitiveKind] = &[$(PrimitiveKind::$kind,)*];

            /// Simple name (e.g. `Int32`)
            pub const fn name(&self) -> &'static str {
                match self {
                    $(PrimitiveKind::$kind => $name,)*
                }
            }

            /// Qualified name (e.g. `Edm.Int32`)
            pub const fn qualified_name(&self) -> &'static str {
                match self {
                    $(PrimitiveKind::$kind => concat!("Edm.", $name),)*
                }
            }
        }
    };
}

primitive_kinds! {
    Binary => "Binary",
    Boolean => "Boolean",
    Byte => "Byte",
    Date => "Date",
    DateTimeOffset => "DateTimeOffset",
    Decimal => "Decimal",
    Double => "Double",
    Duration => "Duration",
    Guid => "Guid",
    Int16 => "Int16",
    Int32 => "Int32",
    Int64 => "Int64",
    SByte => "SByte",
    Single => "Single",
    Stream => "Stream",
    String => "String",
    TimeOfDay => "TimeOfDay",
    Untyped => "Untyped",
    Geography => "Geography",
    GeographyPoint => "GeographyPoint",
    GeographyLineString => "GeographyLineString",
    GeographyPolygon => "GeographyPolygon",
    GeographyMultiPoint => "GeographyMultiPoint",
    GeographyMultiLineString => "GeographyMultiLineString",
    GeographyMultiPolygon => "GeographyMultiPolygon",
    GeographyCollection => "GeographyCollection",
    Geometry => "Geometry",
    GeometryPoint => "GeometryPoint",
    GeometryLineString => "GeometryLineString",
    GeometryPolygon => "GeometryPolygon",
    GeometryMultiPoint => "GeometryMultiPoint",
    GeometryMultiLineString => "GeometryMultiLineString",
    GeometryMultiPolygon => "GeometryMultiPolygon",
    GeometryCollection => "GeometryCollection",
}

impl PrimitiveKind {
    /// Check if this is one of the integral kinds
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Byte | Self::SByte | Self::Int16 | Self::Int32 | Self::Int64
        )
    }

    /// Inclusive value range of an integral kind
    pub const fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::Byte => Some((u8::MIN as i64, u8::MAX as i64)),
            Self::SByte => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Check if this is a floating point kind
    pub const fn is_floating(&self) -> bool {
        matches!(self, Self::Single | Self::Double)
    }

    /// Check if this is a geography kind
    pub const fn is_geography(&self) -> bool {
        matches!(
            self,
            Self::Geography
                | Self::GeographyPoint
                | Self::GeographyLineString
                | Self::GeographyPolygon
                | Self::GeographyMultiPoint
                | Self::GeographyMultiLineString
                | Self::GeographyMultiPolygon
                | Self::GeographyCollection
        )
    }

    /// Check if this is a geometry kind
    pub const fn is_geometry(&self) -> bool {
        matches!(
            self,
            Self::Geometry
                | Self::GeometryPoint
                | Self::GeometryLineString
                | Self::GeometryPolygon
                | Self::GeometryMultiPoint
                | Self::GeometryMultiLineString
                | Self::GeometryMultiPolygon
                | Self::GeometryCollection
        )
    }

    /// Check if this is a spatial kind
    pub const fn is_spatial(&self) -> bool {
        self.is_geography() || self.is_geometry()
    }

    /// Check if the MaxLength facet applies
    pub const fn supports_max_length(&self) -> bool {
        matches!(self, Self::Binary | Self::String | Self::Stream)
    }

    /// Check if the Unicode facet applies
    pub const fn supports_unicode(&self) -> bool {
        matches!(self, Self::String)
    }

    /// Check if the Precision facet applies
    pub const fn supports_precision(&self) -> bool {
        matches!(
            self,
            Self::Decimal | Self::DateTimeOffset | Self::Duration | Self::TimeOfDay
        )
    }

    /// Check if the Scale facet applies
    pub const fn supports_scale(&self) -> bool {
        matches!(self, Self::Decimal)
    }

    /// Check if the SRID facet applies
    pub const fn supports_srid(&self) -> bool {
        self.is_spatial()
    }

    /// SRID assumed when the facet is not specified
    pub const fn default_srid(&self) -> Option<i32> {
        if self.is_geography() {
            Some(4326)
        } else if self.is_geometry() {
            Some(0)
        } else {
            None
        }
    }

    /// Look up a kind by qualified name (`Edm.Int32`)
    pub fn from_qualified_name(name: &str) -> Option<Self> {
        PrimitiveRegistry::global().find(name).map(|t| t.kind)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// A built-in primitive type definition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimitiveType {
    /// Kind of this primitive
    pub kind: PrimitiveKind,
    /// Always `Edm`
    pub namespace: &'static str,
    /// Simple name
    pub name: &'static str,
}

impl PrimitiveType {
    /// Qualified name (e.g. `Edm.String`)
    pub const fn qualified_name(&self) -> &'static str {
        self.kind.qualified_name()
    }
}

/// Registry of all primitive types
#[derive(Debug)]
pub struct PrimitiveRegistry {
    types: Vec<PrimitiveType>,
    by_name: HashMap<&'static str, usize>,
}

static REGISTRY: LazyLock<PrimitiveRegistry> = LazyLock::new(PrimitiveRegistry::build);

impl PrimitiveRegistry {
    /// The process-wide registry
    pub fn global() -> &'static PrimitiveRegistry {
        &REGISTRY
    }

    fn build() -> Self {
        let types: Vec<PrimitiveType> = PrimitiveKind::ALL
            .iter()
            .map(|kind| PrimitiveType {
                kind: *kind,
                namespace: "Edm",
                name: kind.name(),
            })
            .collect();
        let by_name = types
            .iter()
            .enumerate()
            .map(|(i, t)| (t.qualified_name(), i))
            .collect();
        Self { types, by_name }
    }

    /// Get the type for a kind
    pub fn get(&self, kind: PrimitiveKind) -> &PrimitiveType {
        // registry order follows PrimitiveKind::ALL
        &self.types[kind as usize]
    }

    /// Find a type by qualified name; lookup is case-sensitive
    pub fn find(&self, qualified_name: &str) -> Option<&PrimitiveType> {
        self.by_name.get(qualified_name).map(|i| &self.types[*i])
    }

    /// Iterate all primitive types
    pub fn iter(&self) -> impl Iterator<Item = &PrimitiveType> {
        self.types.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = PrimitiveRegistry::global();
        let int32 = registry.find("Edm.Int32").unwrap();
        assert_eq!(int32.kind, PrimitiveKind::Int32);
        assert_eq!(registry.get(PrimitiveKind::Int32), int32);
        assert!(registry.find("edm.int32").is_none());
        assert!(registry.find("Int32").is_none());
    }

    #[test]
    fn test_registry_is_shared() {
        let a = PrimitiveRegistry::global().get(PrimitiveKind::String);
        let b = PrimitiveRegistry::global().get(PrimitiveKind::String);
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_every_kind_is_registered() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveRegistry::global().get(*kind).kind, *kind);
        }
    }

    #[test]
    fn test_integer_ranges() {
        assert_eq!(PrimitiveKind::Byte.integer_range(), Some((0, 255)));
        assert_eq!(PrimitiveKind::SByte.integer_range(), Some((-128, 127)));
        assert_eq!(PrimitiveKind::String.integer_range(), None);
    }

    #[test]
    fn test_facet_applicability() {
        assert!(PrimitiveKind::Decimal.supports_scale());
        assert!(!PrimitiveKind::Double.supports_scale());
        assert!(PrimitiveKind::GeographyPoint.supports_srid());
        assert_eq!(PrimitiveKind::GeographyPoint.default_srid(), Some(4326));
        assert_eq!(PrimitiveKind::GeometryPolygon.default_srid(), Some(0));
    }
}
