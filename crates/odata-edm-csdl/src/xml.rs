//! XML text adapter: text to element tree and back
//!
//! Built on `quick-xml`. Namespace prefixes are resolved while reading, so
//! the tree only carries namespace URIs; the writer picks prefixes again.

use crate::element::{XmlAttribute, XmlElement};
use crate::error::CsdlError;
use crate::settings::CsdlWriterSettings;
use odata_edm_diagnostics::{LineIndex, SourceLocation};
use odata_edm_model::EDMX_NAMESPACE;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Namespace bound to the reserved `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix bindings of the open elements; `""` is the default namespace
#[derive(Debug, Default)]
struct Scopes {
    frames: Vec<Vec<(String, String)>>,
}

impl Scopes {
    fn push(&mut self, bindings: Vec<(String, String)>) {
        self.frames.push(bindings);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn bind(&mut self, prefix: String, uri: String) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push((prefix, uri));
        }
    }

    fn lookup(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
            .filter(|uri| !uri.is_empty())
    }

    fn prefix_for(&self, uri: &str) -> Option<&str> {
        if uri == XML_NAMESPACE {
            return Some("xml");
        }
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, u)| !p.is_empty() && u == uri)
            .map(|(p, _)| p.as_str())
            // a closer frame may have rebound the prefix
            .filter(|p| self.lookup(p) == Some(uri))
    }
}

struct OpenElement {
    element: XmlElement,
    text: String,
}

/// Parse a document into its root element
///
/// Fails only if the text is not well-formed XML.
pub fn parse_document(text: &str) -> Result<XmlElement, CsdlError> {
    let index = LineIndex::new(text);
    let mut reader = Reader::from_str(text);
    let mut scopes = Scopes::default();
    let mut stack: Vec<OpenElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let offset = reader.buffer_position() as usize;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(CsdlError::syntax(
                    e.to_string(),
                    index.location(reader.error_position() as usize),
                ));
            }
        };
        match event {
            Event::Start(start) => {
                let location = index.location(offset);
                let element = open_element(&start, &mut scopes, location)?;
                stack.push(OpenElement {
                    element: XmlElement {
                        location: Some(location),
                        ..element
                    },
                    text: String::new(),
                });
            }
            Event::Empty(start) => {
                let location = index.location(offset);
                let element = open_element(&start, &mut scopes, location)?;
                scopes.pop();
                let element = XmlElement {
                    location: Some(location),
                    ..element
                };
                attach(element, &mut stack, &mut root, &index, offset)?;
            }
            Event::End(_) => {
                scopes.pop();
                let Some(open) = stack.pop() else {
                    return Err(CsdlError::syntax("unmatched end tag", index.location(offset)));
                };
                let element = close_element(open);
                attach(element, &mut stack, &mut root, &index, offset)?;
            }
            Event::Text(content) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&content));
                }
            }
            Event::CData(content) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&content));
                }
            }
            Event::GeneralRef(reference) => {
                let name = String::from_utf8_lossy(&reference).into_owned();
                let Some(resolved) = resolve_reference(&name) else {
                    return Err(CsdlError::syntax(
                        format!("unknown entity reference '&{};'", name),
                        index.location(offset),
                    ));
                };
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CsdlError::syntax(
            "unexpected end of document",
            index.location(text.len()),
        ));
    }
    root.ok_or_else(|| CsdlError::syntax("document has no root element", index.location(0)))
}

fn open_element(
    start: &BytesStart<'_>,
    scopes: &mut Scopes,
    location: SourceLocation,
) -> Result<XmlElement, CsdlError> {
    let mut raw_attributes = Vec::new();
    scopes.push(Vec::new());
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attribute.value).into_owned();
        let value = unescape(&raw)?.into_owned();
        if key == "xmlns" {
            scopes.bind(String::new(), value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scopes.bind(prefix.to_string(), value);
        } else {
            raw_attributes.push((key, value));
        }
    }

    let qname = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let (prefix, name) = match qname.split_once(':') {
        Some((prefix, name)) => (prefix, name),
        None => ("", qname.as_str()),
    };
    let namespace = scopes.lookup(prefix).map(str::to_string);
    if !prefix.is_empty() && namespace.is_none() {
        return Err(CsdlError::syntax(format!("unbound namespace prefix '{}'", prefix), location));
    }

    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        let attribute = match key.split_once(':') {
            Some((prefix, local)) => match scopes.lookup(prefix) {
                Some(uri) => XmlAttribute::qualified(uri, local, value),
                None => {
                    return Err(CsdlError::syntax(
                        format!("unbound namespace prefix '{}'", prefix),
                        location,
                    ));
                }
            },
            None => XmlAttribute::new(key, value),
        };
        attributes.push(attribute);
    }

    Ok(XmlElement {
        name: name.to_string(),
        namespace,
        attributes,
        ..XmlElement::default()
    })
}

fn close_element(open: OpenElement) -> XmlElement {
    let OpenElement { mut element, text } = open;
    let keep = if element.children.is_empty() {
        !text.is_empty()
    } else {
        !text.trim().is_empty()
    };
    if keep {
        element.text = Some(text);
    }
    element
}

fn attach(
    element: XmlElement,
    stack: &mut [OpenElement],
    root: &mut Option<XmlElement>,
    index: &LineIndex<'_>,
    offset: usize,
) -> Result<(), CsdlError> {
    match stack.last_mut() {
        Some(parent) => parent.element.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(CsdlError::syntax(
                "document has more than one root element",
                index.location(offset),
            ));
        }
    }
    Ok(())
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let text = match name {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        _ => return None,
    };
    Some(text.to_string())
}

/// Conventional prefix for well-known namespaces
fn preferred_prefix(uri: &str) -> Option<&'static str> {
    (uri == EDMX_NAMESPACE).then_some("edmx")
}

struct TextWriter {
    writer: Writer<Vec<u8>>,
    scopes: Scopes,
    generated: usize,
}

impl TextWriter {
    fn emit(&mut self, event: Event<'_>) -> Result<(), CsdlError> {
        self.writer
            .write_event(event)
            .map_err(|e| CsdlError::Write(e.to_string()))
    }

    fn fresh_prefix(&mut self) -> String {
        loop {
            self.generated += 1;
            let prefix = format!("p{}", self.generated);
            if self.scopes.lookup(&prefix).is_none() {
                return prefix;
            }
        }
    }

    fn write_element(&mut self, element: &XmlElement) -> Result<(), CsdlError> {
        self.scopes.push(Vec::new());
        let mut declarations: Vec<(String, String)> = Vec::new();

        let qname = match &element.namespace {
            None => {
                if self.scopes.lookup("").is_some() {
                    self.scopes.bind(String::new(), String::new());
                    declarations.push(("xmlns".to_string(), String::new()));
                }
                element.name.clone()
            }
            Some(uri) if self.scopes.lookup("") == Some(uri.as_str()) => element.name.clone(),
            Some(uri) => match self.scopes.prefix_for(uri) {
                Some(prefix) => format!("{}:{}", prefix, element.name),
                None => match preferred_prefix(uri) {
                    Some(prefix) if self.scopes.lookup(prefix).is_none() => {
                        self.scopes.bind(prefix.to_string(), uri.clone());
                        declarations.push((format!("xmlns:{}", prefix), uri.clone()));
                        format!("{}:{}", prefix, element.name)
                    }
                    _ => {
                        self.scopes.bind(String::new(), uri.clone());
                        declarations.push(("xmlns".to_string(), uri.clone()));
                        element.name.clone()
                    }
                },
            },
        };

        let mut attributes: Vec<(String, &str)> = Vec::with_capacity(element.attributes.len());
        for attribute in &element.attributes {
            let key = match &attribute.namespace {
                None => attribute.name.clone(),
                Some(uri) => {
                    let prefix = match self.scopes.prefix_for(uri) {
                        Some(prefix) => prefix.to_string(),
                        None => {
                            let prefix = match preferred_prefix(uri) {
                                Some(p) if self.scopes.lookup(p).is_none() => p.to_string(),
                                _ => self.fresh_prefix(),
                            };
                            self.scopes.bind(prefix.clone(), uri.clone());
                            declarations.push((format!("xmlns:{}", prefix), uri.clone()));
                            prefix
                        }
                    };
                    format!("{}:{}", prefix, attribute.name)
                }
            };
            attributes.push((key, attribute.value.as_str()));
        }

        let mut start = BytesStart::new(qname.as_str());
        for (key, value) in &declarations {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        for (key, value) in &attributes {
            start.push_attribute((key.as_str(), *value));
        }

        if element.children.is_empty() && element.text.as_deref().is_none_or(str::is_empty) {
            self.emit(Event::Empty(start))?;
        } else {
            self.emit(Event::Start(start))?;
            if let Some(text) = &element.text {
                self.emit(Event::Text(BytesText::new(text)))?;
            }
            for child in &element.children {
                self.write_element(child)?;
            }
            self.emit(Event::End(BytesEnd::new(qname.as_str())))?;
        }
        self.scopes.pop();
        Ok(())
    }
}

/// Write an element tree as an XML document
pub fn write_document(root: &XmlElement, settings: &CsdlWriterSettings) -> Result<String, CsdlError> {
    let writer = if settings.pretty {
        Writer::new_with_indent(Vec::new(), b' ', settings.indent)
    } else {
        Writer::new(Vec::new())
    };
    let mut out = TextWriter {
        writer,
        scopes: Scopes::default(),
        generated: 0,
    };
    out.emit(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    out.write_element(root)?;
    String::from_utf8(out.writer.into_inner()).map_err(|e| CsdlError::Write(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_edm_model::CSDL_NAMESPACE;
    use pretty_assertions::assert_eq;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx Version="4.0" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
  <edmx:DataServices>
    <Schema Namespace="NS" xmlns="http://docs.oasis-open.org/odata/ns/edm" xmlns:x="urn:extra">
      <ComplexType Name="Address" x:Color="blue &amp; green"/>
      <Term Name="Note" Type="Edm.String"><Annotation Term="NS.Note"><String>a &lt; b &#x41;</String></Annotation></Term>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let root = parse_document(DOCUMENT).unwrap();
        assert_eq!(root.name, "Edmx");
        assert_eq!(root.namespace.as_deref(), Some(EDMX_NAMESPACE));
        assert_eq!(root.attr("Version"), Some("4.0"));

        let schema = &root.children[0].children[0];
        assert_eq!(schema.name, "Schema");
        assert_eq!(schema.namespace.as_deref(), Some(CSDL_NAMESPACE));

        let complex = &schema.children[0];
        let foreign: Vec<_> = complex.qualified_attributes().collect();
        assert_eq!(foreign.len(), 1);
        assert_eq!(foreign[0].namespace.as_deref(), Some("urn:extra"));
        assert_eq!(foreign[0].value, "blue & green");
    }

    #[test]
    fn test_parse_records_locations_and_text() {
        let root = parse_document(DOCUMENT).unwrap();
        assert_eq!(root.location, Some(SourceLocation::new(2, 1, 39)));
        let schema = &root.children[0].children[0];
        assert_eq!(schema.location.map(|l| (l.line, l.column)), Some((4, 5)));

        let string = &schema.children[1].children[0].children[0];
        assert_eq!(string.text.as_deref(), Some("a < b A"));
    }

    #[test]
    fn test_malformed_documents_fail() {
        assert!(matches!(
            parse_document("<Schema><EntityType></Schema>"),
            Err(CsdlError::Syntax { .. })
        ));
        assert!(parse_document("<Schema>").is_err());
        assert!(parse_document("").is_err());
        assert!(parse_document("<a/><b/>").is_err());
        assert!(parse_document("<p:a/>").is_err());
    }

    #[test]
    fn test_write_then_parse() {
        let root = XmlElement::new("Edmx")
            .in_namespace(EDMX_NAMESPACE)
            .with_attr("Version", "4.01")
            .with_child(
                XmlElement::new("Schema")
                    .in_namespace(CSDL_NAMESPACE)
                    .with_attr("Namespace", "NS")
                    .with_child({
                        let mut complex = XmlElement::new("ComplexType")
                            .in_namespace(CSDL_NAMESPACE)
                            .with_attr("Name", "Quote\"<&>");
                        complex
                            .attributes
                            .push(XmlAttribute::qualified("urn:extra", "Tag", "x"));
                        complex
                    })
                    .with_child(
                        XmlElement::new("String")
                            .in_namespace(CSDL_NAMESPACE)
                            .with_text("1 < 2 & 3"),
                    ),
            );

        let text = write_document(&root, &CsdlWriterSettings::default()).unwrap();
        assert!(text.contains("<edmx:Edmx"));
        assert!(text.contains("xmlns:p1=\"urn:extra\""));

        let parsed = parse_document(&text).unwrap();
        assert_eq!(parsed, root);
    }

    #[test]
    fn test_compact_output() {
        let root = XmlElement::new("Schema").with_child(XmlElement::new("Term"));
        let settings = CsdlWriterSettings {
            pretty: false,
            ..CsdlWriterSettings::default()
        };
        let text = write_document(&root, &settings).unwrap();
        assert!(text.ends_with("<Schema><Term/></Schema>"));
    }
}
