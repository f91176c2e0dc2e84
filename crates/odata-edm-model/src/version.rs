//! EDM versions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace of the CSDL XML vocabulary
pub const CSDL_NAMESPACE: &str = "http://docs.oasis-open.org/odata/ns/edm";

/// Namespace of the Edmx envelope
pub const EDMX_NAMESPACE: &str = "http://docs.oasis-open.org/odata/ns/edmx";

/// Version of the EDM a model targets
///
/// Selects the CSDL namespace and the default validation rule set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdmVersion {
    /// OData 4.0
    #[default]
    V4,
    /// OData 4.01
    V401,
}

impl EdmVersion {
    /// CSDL namespace URI for this version
    pub const fn csdl_namespace(&self) -> &'static str {
        match self {
            Self::V4 | Self::V401 => CSDL_NAMESPACE,
        }
    }

    /// Edmx namespace URI for this version
    pub const fn edmx_namespace(&self) -> &'static str {
        match self {
            Self::V4 | Self::V401 => EDMX_NAMESPACE,
        }
    }

    /// Value of the Edmx `Version` attribute
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::V4 => "4.0",
            Self::V401 => "4.01",
        }
    }
}

impl fmt::Display for EdmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unrecognized version string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown EDM version '{0}'")]
pub struct UnknownVersion(pub String);

impl FromStr for EdmVersion {
    type Err = UnknownVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "4.0" | "4" | "V4" | "V40" => Ok(Self::V4),
            "4.01" | "V401" => Ok(Self::V401),
            other => Err(UnknownVersion(other.to_string())),
        }
    }
}
