//! XML loader that builds the document tree.
//!
//! The loader uses quick-xml's pull API and keeps its own namespace context,
//! so every element and attribute name comes out as an [`ExpandedName`] and
//! namespace declarations stay on the element that made them.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use quick_xml::escape::{resolve_predefined_entity, unescape, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::{Error, Result};
use crate::node::{
    is_xmlns_attr, split_qname, ExpandedName, NamespaceContext, XmlAttribute, XmlDocument,
    XmlElement,
};

/// Loads XML text into an [`XmlDocument`].
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlLoader;

impl XmlLoader {
    /// Creates a new loader.
    pub fn new() -> Self {
        XmlLoader
    }

    /// Loads a document from a reader. The whole stream is consumed before
    /// parsing starts; input that is not UTF-8 is a parse error.
    pub fn load<R: Read>(&self, mut input: R) -> Result<XmlDocument> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        let xml = String::from_utf8(bytes).map_err(|e| {
            Error::Parse(format!(
                "invalid UTF-8 at byte {}",
                e.utf8_error().valid_up_to()
            ))
        })?;
        self.load_str(&xml)
    }

    /// Loads a document from a file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<XmlDocument> {
        let file = File::open(path)?;
        self.load(BufReader::new(file))
    }

    /// Loads a document from a string.
    pub fn load_str(&self, xml: &str) -> Result<XmlDocument> {
        let mut reader = Reader::from_str(xml);
        let mut namespaces = NamespaceContext::new();
        let mut open: Vec<XmlElement> = Vec::new();
        let mut roots: Vec<XmlElement> = Vec::new();
        let mut entities: HashMap<String, String> = HashMap::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let element = self.parse_element(e, &reader, &mut namespaces, &entities)?;
                    open.push(element);
                }
                Ok(Event::Empty(ref e)) => {
                    let element = self.parse_element(e, &reader, &mut namespaces, &entities)?;
                    namespaces.pop_scope();
                    attach(&mut open, &mut roots, element);
                }
                Ok(Event::End(ref e)) => {
                    let Some(element) = open.pop() else {
                        let name = decode(&reader, e.name().as_ref())?;
                        return Err(Error::Parse(format!("unexpected end tag </{}>", name)));
                    };
                    namespaces.pop_scope();
                    attach(&mut open, &mut roots, element);
                }
                Ok(Event::Text(ref e)) => {
                    if open.is_empty() && e.iter().any(|b| !b.is_ascii_whitespace()) {
                        return Err(Error::Parse(
                            "text is not allowed outside of an element".to_string(),
                        ));
                    }
                }
                Ok(Event::CData(_)) | Ok(Event::GeneralRef(_)) if open.is_empty() => {
                    return Err(Error::Parse(
                        "character data is not allowed outside of an element".to_string(),
                    ));
                }
                Ok(Event::DocType(ref e)) => {
                    let doctype = decode(&reader, e)?;
                    entities.extend(internal_entities(&doctype));
                    debug!(entities = entities.len(), "read DOCTYPE");
                }
                Ok(Event::Eof) => break,
                // Text, comments, PIs and the declaration carry
                // nothing WSL can represent
                Ok(_) => {}
                Err(e) => {
                    debug!(position = reader.error_position(), "XML parse failed");
                    return Err(e.into());
                }
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(Error::Parse(format!(
                "unclosed element <{}> at end of input",
                unclosed.name().local_name
            )));
        }
        debug_assert_eq!(namespaces.depth(), 0);

        let document = XmlDocument::new(roots);
        debug!(
            roots = document.roots().len(),
            elements = document.element_count(),
            attributes = document.attribute_count(),
            "loaded XML document"
        );
        Ok(document)
    }

    /// Parses an element's name and attributes, opening its namespace scope.
    ///
    /// The caller pops the scope once the element is closed.
    fn parse_element(
        &self,
        e: &BytesStart<'_>,
        reader: &Reader<&[u8]>,
        namespaces: &mut NamespaceContext,
        entities: &HashMap<String, String>,
    ) -> Result<XmlElement> {
        let qname = decode(reader, e.name().as_ref())?;

        let mut raw = Vec::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| Error::Parse(format!("Attribute error: {}", e)))?;
            let key = decode(reader, attr.key.as_ref())?;
            let literal = normalize_whitespace(&decode(reader, &attr.value)?);
            let value = unescape_with(&literal, |name| {
                entities
                    .get(name)
                    .map(String::as_str)
                    .or_else(|| resolve_predefined_entity(name))
            })
            .map_err(|e| Error::Parse(format!("attribute {}: {}", key, e)))?
            .into_owned();
            raw.push((key, value));
        }

        // Declarations apply to the element's own name and attributes, so
        // bind them all before resolving anything.
        namespaces.push_scope();
        for (key, value) in raw.iter().filter(|(key, _)| is_xmlns_attr(key)) {
            match split_qname(key) {
                (Some(_), prefix) => {
                    if value.is_empty() {
                        return Err(Error::Parse(format!(
                            "prefix '{}' cannot be bound to an empty namespace",
                            prefix
                        )));
                    }
                    namespaces.bind(prefix, value);
                }
                (None, _) => namespaces.bind("", value),
            }
        }

        let name = resolve_element_name(&qname, namespaces)?;
        let mut attributes = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let attribute = if is_xmlns_attr(&key) {
                let (prefix, local) = split_qname(&key);
                XmlAttribute::declaration(prefix.map(|_| local), value)
            } else {
                XmlAttribute::new(resolve_attribute_name(&key, namespaces)?, value)
            };
            attributes.push(attribute);
        }

        Ok(XmlElement::with_attributes(name, attributes))
    }
}

fn decode(reader: &Reader<&[u8]>, bytes: &[u8]) -> Result<String> {
    reader
        .decoder()
        .decode(bytes)
        .map(|name| name.into_owned())
        .map_err(|e| Error::Parse(e.to_string()))
}

/// Attribute-value normalization: every literal tab or line break becomes a
/// space, with CRLF counting as one break. Character references are expanded
/// afterwards, so `&#10;` still yields a line feed.
fn normalize_whitespace(raw: &str) -> String {
    raw.replace("\r\n", " ").replace(['\r', '\n', '\t'], " ")
}

/// General entities declared in an internal DTD subset.
///
/// Parameter entities and external (`SYSTEM`/`PUBLIC`) entities are skipped.
/// The first declaration of a name wins. Character and predefined entity
/// references in the replacement text are expanded here; anything else is
/// kept as written.
fn internal_entities(doctype: &str) -> HashMap<String, String> {
    let mut entities = HashMap::new();
    let mut rest = doctype;
    while let Some(start) = rest.find("<!ENTITY") {
        rest = rest[start + "<!ENTITY".len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '>')
            .unwrap_or(rest.len());
        let name = &rest[..name_end];
        rest = rest[name_end..].trim_start();

        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let Some(len) = rest[1..].find(quote) else {
            break;
        };
        if !name.is_empty() {
            entities
                .entry(name.to_string())
                .or_insert_with(|| replacement_text(&rest[1..1 + len]));
        }
        rest = &rest[1 + len + 1..];
    }
    entities
}

fn replacement_text(literal: &str) -> String {
    let literal = normalize_whitespace(literal);
    let expanded = unescape(&literal).map(|text| text.into_owned());
    expanded.unwrap_or(literal)
}

/// Unprefixed element names take the default namespace in scope.
fn resolve_element_name(qname: &str, namespaces: &mut NamespaceContext) -> Result<ExpandedName> {
    match split_qname(qname) {
        (Some(prefix), local) => {
            let uri = resolve_prefix(prefix, namespaces)?;
            Ok(ExpandedName::new(uri, local))
        }
        (None, local) => match namespaces.default_namespace() {
            Some(uri) => Ok(ExpandedName::new(uri, local)),
            None => Ok(ExpandedName::new(namespaces.intern_uri(""), local)),
        },
    }
}

/// Unprefixed attribute names are in no namespace.
fn resolve_attribute_name(qname: &str, namespaces: &mut NamespaceContext) -> Result<ExpandedName> {
    match split_qname(qname) {
        (Some(prefix), local) => {
            let uri = resolve_prefix(prefix, namespaces)?;
            Ok(ExpandedName::new(uri, local))
        }
        (None, local) => Ok(ExpandedName::new(namespaces.intern_uri(""), local)),
    }
}

fn resolve_prefix(prefix: &str, namespaces: &NamespaceContext) -> Result<std::rc::Rc<str>> {
    namespaces
        .resolve(prefix)
        .ok_or_else(|| Error::Parse(format!("unbound namespace prefix '{}'", prefix)))
}

fn attach(open: &mut [XmlElement], roots: &mut Vec<XmlElement>, element: XmlElement) {
    match open.last_mut() {
        Some(parent) => parent.add_child(element),
        None => roots.push(element),
    }
}

/// Loads a document from a reader.
pub fn load<R: Read>(input: R) -> Result<XmlDocument> {
    XmlLoader::new().load(input)
}

/// Loads a document from a file.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<XmlDocument> {
    XmlLoader::new().load_file(path)
}

/// Loads a document from a string.
pub fn load_str(xml: &str) -> Result<XmlDocument> {
    XmlLoader::new().load_str(xml)
}
