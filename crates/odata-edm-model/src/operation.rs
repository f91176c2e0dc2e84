//! Actions, functions and parameters

use crate::TypeReference;
use crate::names::qualified_name;
use odata_edm_diagnostics::SourceLocation;

/// An action or function
#[derive(Debug, Clone)]
pub struct Operation {
    pub namespace: String,
    pub name: String,
    pub kind: OperationKind,
    pub is_bound: bool,
    pub entity_set_path: Option<String>,
    pub return_type: Option<TypeReference>,
    pub(crate) parameters: Vec<Parameter>,
    pub location: Option<SourceLocation>,
}

/// Action or function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Action,
    Function { is_composable: bool },
}

impl Operation {
    /// `Namespace.Name`
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.namespace, &self.name)
    }

    /// Check if this is a function
    pub fn is_function(&self) -> bool {
        matches!(self.kind, OperationKind::Function { .. })
    }

    /// Check if this is a composable function
    pub fn is_composable(&self) -> bool {
        matches!(self.kind, OperationKind::Function { is_composable: true })
    }

    /// Parameters in declaration order
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Find a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// First parameter of a bound operation
    pub fn binding_parameter(&self) -> Option<&Parameter> {
        if self.is_bound {
            self.parameters.first()
        } else {
            None
        }
    }

    /// CSDL element name for this kind
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            OperationKind::Action => "Action",
            OperationKind::Function { .. } => "Function",
        }
    }
}

/// Operation parameter
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub type_ref: TypeReference,
    pub location: Option<SourceLocation>,
}
