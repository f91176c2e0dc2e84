//! Name helpers: qualified names and identifier checks

/// Maximum length of a simple identifier
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Split `Namespace.Name` at the last dot
///
/// A name without a dot has an empty namespace.
pub fn split_qualified_name(qualified: &str) -> (&str, &str) {
    match qualified.rfind('.') {
        Some(dot) => (&qualified[..dot], &qualified[dot + 1..]),
        None => ("", qualified),
    }
}

/// Join a namespace and a simple name
pub fn qualified_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", namespace, name)
    }
}

/// Check if `name` is a valid simple identifier
///
/// Unicode letters and digits are accepted.
pub fn is_simple_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    name.chars().count() <= MAX_IDENTIFIER_LENGTH && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Check if `namespace` is a dot-separated list of simple identifiers
pub fn is_namespace_name(namespace: &str) -> bool {
    !namespace.is_empty() && namespace.split('.').all(is_simple_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qualified_name() {
        assert_eq!(split_qualified_name("A.B.Customer"), ("A.B", "Customer"));
        assert_eq!(split_qualified_name("Customer"), ("", "Customer"));
    }

    #[test]
    fn test_identifiers() {
        assert!(is_simple_identifier("Customer"));
        assert!(is_simple_identifier("_private"));
        assert!(is_simple_identifier("Kunde\u{e4}"));
        assert!(is_simple_identifier("\u{5ba2}\u{6237}"));
        assert!(!is_simple_identifier(""));
        assert!(!is_simple_identifier("1st"));
        assert!(!is_simple_identifier("foo+bar"));
        assert!(!is_simple_identifier(&"a".repeat(129)));
    }

    #[test]
    fn test_namespaces() {
        assert!(is_namespace_name("Org.Example"));
        assert!(!is_namespace_name("Org..Example"));
        assert!(!is_namespace_name(""));
    }
}
