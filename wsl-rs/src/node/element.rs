//! Element, attribute and document types of the parsed tree.
//!
//! The loader builds these once; the emitter only reads them. Text content is
//! not part of the model since WSL has no place for it.

use std::rc::Rc;

use super::namespace::{ExpandedName, XMLNS_NAMESPACE};

/// A single attribute of an element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    name: ExpandedName,
    value: String,
    namespace_declaration: bool,
}

impl XmlAttribute {
    /// Creates an ordinary (non-declaration) attribute.
    pub fn new(name: ExpandedName, value: impl Into<String>) -> Self {
        XmlAttribute {
            name,
            value: value.into(),
            namespace_declaration: false,
        }
    }

    /// Creates a namespace declaration.
    ///
    /// `None` declares the default namespace (`xmlns="uri"`), `Some(prefix)`
    /// binds a prefix (`xmlns:prefix="uri"`).
    pub fn declaration(prefix: Option<&str>, uri: impl Into<String>) -> Self {
        let name = match prefix {
            Some(prefix) => ExpandedName::new(XMLNS_NAMESPACE, prefix),
            None => ExpandedName::no_namespace("xmlns"),
        };
        XmlAttribute {
            name,
            value: uri.into(),
            namespace_declaration: true,
        }
    }

    /// Returns the expanded name.
    pub fn name(&self) -> &ExpandedName {
        &self.name
    }

    /// Returns the (unescaped) value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns true if this attribute binds a namespace.
    pub fn is_namespace_declaration(&self) -> bool {
        self.namespace_declaration
    }

    /// Returns the prefix declared by this attribute.
    ///
    /// `Some(None)` for the default declaration, `Some(Some(prefix))` for a
    /// prefixed one and `None` for ordinary attributes.
    pub fn declared_prefix(&self) -> Option<Option<&str>> {
        if !self.namespace_declaration {
            None
        } else if self.name.namespace_uri.is_empty() {
            Some(None)
        } else {
            Some(Some(self.name.local_name.as_str()))
        }
    }
}

/// An XML element with its attributes and child elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: ExpandedName,
    attributes: Vec<XmlAttribute>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    /// Creates an element with no attributes and no children.
    pub fn new(name: ExpandedName) -> Self {
        XmlElement {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Creates an element with the given attributes.
    pub fn with_attributes(name: ExpandedName, attributes: Vec<XmlAttribute>) -> Self {
        XmlElement {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    /// Returns the expanded name.
    pub fn name(&self) -> &ExpandedName {
        &self.name
    }

    /// Returns all attributes, declarations included, in document order.
    pub fn attributes(&self) -> &[XmlAttribute] {
        &self.attributes
    }

    /// Returns the namespace declarations made on this element.
    pub fn declarations(&self) -> impl Iterator<Item = &XmlAttribute> {
        self.attributes
            .iter()
            .filter(|attr| attr.is_namespace_declaration())
    }

    /// Returns the attributes that are not namespace declarations.
    pub fn plain_attributes(&self) -> impl Iterator<Item = &XmlAttribute> {
        self.attributes
            .iter()
            .filter(|attr| !attr.is_namespace_declaration())
    }

    /// Returns the child elements.
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Appends a child element.
    pub fn add_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Appends an attribute.
    pub fn add_attribute(&mut self, attribute: XmlAttribute) {
        self.attributes.push(attribute);
    }

    /// Returns the default namespace declared locally on this element.
    pub fn default_namespace(&self) -> Option<&str> {
        self.declarations()
            .find(|attr| attr.declared_prefix() == Some(None))
            .map(XmlAttribute::value)
    }

    /// Number of elements in this subtree, this one included.
    pub fn element_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(XmlElement::element_count)
            .sum::<usize>()
    }

    /// Number of attributes in this subtree, declarations included.
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
            + self
                .children
                .iter()
                .map(XmlElement::attribute_count)
                .sum::<usize>()
    }
}

/// A parsed document: zero or more root-level elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDocument {
    roots: Vec<XmlElement>,
}

impl XmlDocument {
    /// Creates a document from its root-level elements.
    pub fn new(roots: Vec<XmlElement>) -> Self {
        XmlDocument { roots }
    }

    /// Returns the root-level elements.
    pub fn roots(&self) -> &[XmlElement] {
        &self.roots
    }

    /// Returns the first root element, if any.
    pub fn root(&self) -> Option<&XmlElement> {
        self.roots.first()
    }

    /// The document's default namespace: the default declared on the first
    /// root, or the empty namespace.
    pub fn default_namespace(&self) -> Rc<str> {
        self.root()
            .and_then(XmlElement::default_namespace)
            .map(Rc::from)
            .unwrap_or_else(|| Rc::from(""))
    }

    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        self.roots.iter().map(XmlElement::element_count).sum()
    }

    /// Total number of attributes, declarations included.
    pub fn attribute_count(&self) -> usize {
        self.roots.iter().map(XmlElement::attribute_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(local: &str) -> XmlElement {
        XmlElement::new(ExpandedName::no_namespace(local))
    }

    #[test]
    fn test_declaration_prefixes() {
        let default = XmlAttribute::declaration(None, "urn:x");
        let prefixed = XmlAttribute::declaration(Some("ns"), "urn:y");
        let plain = XmlAttribute::new(ExpandedName::no_namespace("id"), "1");

        assert_eq!(default.declared_prefix(), Some(None));
        assert_eq!(prefixed.declared_prefix(), Some(Some("ns")));
        assert_eq!(plain.declared_prefix(), None);
        assert_eq!(default.name().local_name, "xmlns");
        assert_eq!(prefixed.name().namespace_uri.as_ref(), XMLNS_NAMESPACE);
    }

    #[test]
    fn test_attribute_partition_keeps_order() {
        let el = XmlElement::with_attributes(
            ExpandedName::no_namespace("root"),
            vec![
                XmlAttribute::new(ExpandedName::no_namespace("b"), "2"),
                XmlAttribute::declaration(Some("p"), "urn:p"),
                XmlAttribute::new(ExpandedName::no_namespace("a"), "1"),
                XmlAttribute::declaration(None, "urn:d"),
            ],
        );

        let decls: Vec<_> = el.declarations().map(|a| a.value()).collect();
        let plain: Vec<_> = el.plain_attributes().map(|a| a.value()).collect();
        assert_eq!(decls, vec!["urn:p", "urn:d"]);
        assert_eq!(plain, vec!["2", "1"]);
        assert_eq!(el.default_namespace(), Some("urn:d"));
    }

    #[test]
    fn test_counts() {
        let mut root = element("root");
        let mut child = element("child");
        child.add_attribute(XmlAttribute::new(ExpandedName::no_namespace("x"), "1"));
        child.add_child(element("leaf"));
        root.add_child(child);
        root.add_child(element("other"));

        let doc = XmlDocument::new(vec![root, element("second")]);
        assert_eq!(doc.element_count(), 5);
        assert_eq!(doc.attribute_count(), 1);
    }

    #[test]
    fn test_document_default_namespace() {
        assert_eq!(XmlDocument::default().default_namespace().as_ref(), "");

        let root = XmlElement::with_attributes(
            ExpandedName::new("urn:x", "root"),
            vec![XmlAttribute::declaration(None, "urn:x")],
        );
        let doc = XmlDocument::new(vec![root]);
        assert_eq!(doc.default_namespace().as_ref(), "urn:x");
    }
}
