//! Generic element tree exchanged with the XML text layer
//!
//! The CSDL reader and writer only see this tree; character-level concerns
//! such as escaping, prefixes and indentation live in [`crate::xml`].

use odata_edm_diagnostics::{EdmLocation, SourceLocation};

/// An attribute with an optional namespace URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    /// Unprefixed attributes have no namespace
    pub namespace: Option<String>,
    pub value: String,
}

impl XmlAttribute {
    /// Unqualified attribute
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            value: value.into(),
        }
    }

    /// Attribute in a foreign namespace
    pub fn qualified(namespace: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
            value: value.into(),
        }
    }
}

/// An element: local name, namespace, ordered attributes and children
///
/// Equality ignores `location`.
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,
    /// Character content of a leaf element
    pub text: Option<String>,
    pub location: Option<SourceLocation>,
}

impl PartialEq for XmlElement {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.namespace == other.namespace
            && self.attributes == other.attributes
            && self.children == other.children
            && self.text == other.text
    }
}

impl XmlElement {
    /// Element without namespace
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the namespace
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Append an unqualified attribute
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(XmlAttribute::new(name, value));
        self
    }

    /// Append an unqualified attribute if `value` is present
    pub fn with_optional_attr(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with_attr(name, value),
            None => self,
        }
    }

    /// Append a child
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Set the character content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Value of the unqualified attribute `name`
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.namespace.is_none() && a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Check if the element carries the unqualified attribute `name`
    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Attributes in some namespace
    pub fn qualified_attributes(&self) -> impl Iterator<Item = &XmlAttribute> {
        self.attributes.iter().filter(|a| a.namespace.is_some())
    }

    /// Children with local name `name`
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First child with local name `name`
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Character content, empty when absent
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Where this element came from, or its name when built in memory
    pub fn edm_location(&self) -> EdmLocation {
        match self.location {
            Some(location) => EdmLocation::Text(location),
            None => EdmLocation::element(self.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let element = XmlElement::new("Property")
            .with_attr("Name", "Id")
            .with_attr("Type", "Edm.Int32")
            .with_optional_attr("Nullable", None::<&str>)
            .with_child(XmlElement::new("Annotation").with_attr("Term", "Core.Description"));

        assert_eq!(element.attr("Name"), Some("Id"));
        assert!(!element.has_attr("Nullable"));
        assert_eq!(element.children_named("Annotation").count(), 1);
        assert!(element.child("Key").is_none());
    }

    #[test]
    fn test_equality_ignores_location() {
        let mut a = XmlElement::new("Schema").with_attr("Namespace", "NS");
        let b = a.clone();
        a.location = Some(SourceLocation::new(3, 4, 20));
        assert_eq!(a, b);
    }

    #[test]
    fn test_qualified_attributes_are_not_plain() {
        let mut element = XmlElement::new("EntityType");
        element
            .attributes
            .push(XmlAttribute::qualified("urn:x", "Name", "foreign"));
        assert_eq!(element.attr("Name"), None);
        assert_eq!(element.qualified_attributes().count(), 1);
    }
}
