//! Writer configuration

use odata_edm_model::EdmVersion;

/// Options for writing CSDL documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsdlWriterSettings {
    /// Indent nested elements
    pub pretty: bool,
    /// Spaces per nesting level when `pretty` is set
    pub indent: usize,
    /// Edmx `Version` to write instead of the model's own
    pub version: Option<EdmVersion>,
}

impl Default for CsdlWriterSettings {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: 2,
            version: None,
        }
    }
}

impl CsdlWriterSettings {
    /// Compact output without indentation
    pub fn compact() -> Self {
        Self {
            pretty: false,
            ..Self::default()
        }
    }

    /// Override the written version
    pub fn with_version(mut self, version: EdmVersion) -> Self {
        self.version = Some(version);
        self
    }
}
