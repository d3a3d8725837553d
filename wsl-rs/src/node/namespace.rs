//! Namespace handling for XML elements.
//!
//! Two views of the same scoping rules live here: [`NamespaceContext`] maps
//! prefixes to URIs while the loader streams through the input, and [`Scope`]
//! answers the reverse question (which prefix names a URI) over the finished
//! tree while the emitter walks it.

use std::collections::HashMap;
use std::rc::Rc;

use super::element::XmlElement;

/// The namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace of `xmlns:*` declaration attributes.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Represents an expanded XML name (namespace URI + local name).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedName {
    /// The namespace URI (empty string for no namespace).
    pub namespace_uri: Rc<str>,
    /// The local part of the name (without prefix).
    pub local_name: String,
}

impl ExpandedName {
    /// Creates a new expanded name with a namespace.
    pub fn new(uri: impl Into<Rc<str>>, local: impl Into<String>) -> Self {
        Self {
            namespace_uri: uri.into(),
            local_name: local.into(),
        }
    }

    /// Creates an expanded name with no namespace.
    pub fn no_namespace(local: impl Into<String>) -> Self {
        Self {
            namespace_uri: "".into(),
            local_name: local.into(),
        }
    }
}

/// Tracks namespace bindings during parsing.
pub struct NamespaceContext {
    /// URI interning cache, so every name in one namespace shares its URI.
    uri_cache: HashMap<String, Rc<str>>,
    /// Stack of scopes, each containing prefix -> URI bindings.
    scopes: Vec<HashMap<String, Rc<str>>>,
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceContext {
    /// Creates a new namespace context with the XML namespace pre-bound.
    pub fn new() -> Self {
        let mut ctx = NamespaceContext {
            uri_cache: HashMap::new(),
            scopes: vec![HashMap::new()],
        };
        ctx.bind("xml", XML_NAMESPACE);
        ctx
    }

    /// Pushes a new scope for entering an element.
    pub fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pops the current scope when leaving an element.
    pub fn pop_scope(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Number of element scopes currently open.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Binds a prefix to a URI in the current scope. The empty prefix is the
    /// default namespace.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        let uri_rc = self.intern_uri(uri);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(prefix.to_string(), uri_rc);
        }
    }

    /// Resolves a prefix to its URI, searching from innermost scope.
    pub fn resolve(&self, prefix: &str) -> Option<Rc<str>> {
        for scope in self.scopes.iter().rev() {
            if let Some(uri) = scope.get(prefix) {
                return Some(uri.clone());
            }
        }
        None
    }

    /// Returns the default namespace (empty prefix binding).
    ///
    /// `xmlns=""` undeclares the default, so an empty binding reads as none.
    pub fn default_namespace(&self) -> Option<Rc<str>> {
        self.resolve("").filter(|uri| !uri.is_empty())
    }

    /// Interns a URI string.
    pub fn intern_uri(&mut self, uri: &str) -> Rc<str> {
        if let Some(cached) = self.uri_cache.get(uri) {
            cached.clone()
        } else {
            let rc: Rc<str> = uri.into();
            self.uri_cache.insert(uri.to_string(), rc.clone());
            rc
        }
    }
}

/// Splits a qualified name into prefix and local name.
///
/// Returns (Some(prefix), local) for "prefix:local"
/// Returns (None, name) for "name" without prefix
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some(pos) = qname.find(':') {
        (Some(&qname[..pos]), &qname[pos + 1..])
    } else {
        (None, qname)
    }
}

/// Checks if an attribute name is a namespace declaration.
pub fn is_xmlns_attr(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

/// The lexical namespace scope of one element during a tree walk.
///
/// A scope is the chain of elements from the current one up to its root,
/// innermost first. Each level of the recursion builds its own scope on top of
/// its parent's, so nothing has to be popped on the way back out.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    element: &'a XmlElement,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    /// Creates the scope of a root-level element.
    pub fn new(element: &'a XmlElement) -> Self {
        Scope {
            element,
            parent: None,
        }
    }

    /// Creates the scope of a child of this scope's element.
    pub fn nest<'s>(&'s self, element: &'s XmlElement) -> Scope<'s> {
        Scope {
            element,
            parent: Some(self),
        }
    }

    /// Returns the element this scope belongs to.
    pub fn element(&self) -> &'a XmlElement {
        self.element
    }

    fn levels(&self) -> impl Iterator<Item = &Scope<'a>> {
        std::iter::successors(Some(self), |scope| scope.parent)
    }

    /// Resolves a prefix (`""` for the default) to the URI of its nearest
    /// enclosing declaration.
    pub fn lookup_namespace(&self, prefix: &str) -> Option<&'a str> {
        for scope in self.levels() {
            for attr in scope.element.declarations() {
                if attr.declared_prefix().map(|p| p.unwrap_or("")) == Some(prefix) {
                    return Some(attr.value());
                }
            }
        }
        (prefix == "xml").then_some(XML_NAMESPACE)
    }

    /// Finds the prefix bound to `uri` in this scope.
    ///
    /// Declarations are searched innermost first. A prefix found on an
    /// ancestor only counts if no nearer declaration rebinds it. Default
    /// declarations never produce a prefix.
    pub fn prefix_of(&self, uri: &str) -> Option<&'a str> {
        for scope in self.levels() {
            for attr in scope.element.declarations() {
                let Some(Some(prefix)) = attr.declared_prefix() else {
                    continue;
                };
                if attr.value() == uri && self.lookup_namespace(prefix) == Some(uri) {
                    return Some(prefix);
                }
            }
        }
        if uri == XML_NAMESPACE && self.lookup_namespace("xml") == Some(XML_NAMESPACE) {
            return Some("xml");
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::XmlAttribute;

    fn element_with(decls: &[(Option<&str>, &str)]) -> XmlElement {
        XmlElement::with_attributes(
            ExpandedName::no_namespace("e"),
            decls
                .iter()
                .map(|(prefix, uri)| XmlAttribute::declaration(*prefix, *uri))
                .collect(),
        )
    }

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("svg:rect"), (Some("svg"), "rect"));
        assert_eq!(split_qname("rect"), (None, "rect"));
        assert_eq!(split_qname("ns:foo:bar"), (Some("ns"), "foo:bar"));
    }

    #[test]
    fn test_namespace_context() {
        let mut ctx = NamespaceContext::new();
        ctx.push_scope();
        ctx.bind("svg", "http://www.w3.org/2000/svg");

        assert_eq!(
            ctx.resolve("svg").unwrap().as_ref(),
            "http://www.w3.org/2000/svg"
        );
        assert_eq!(ctx.depth(), 1);

        ctx.pop_scope();
        assert!(ctx.resolve("svg").is_none());
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn test_is_xmlns() {
        assert!(is_xmlns_attr("xmlns"));
        assert!(is_xmlns_attr("xmlns:svg"));
        assert!(!is_xmlns_attr("xml:space"));
        assert!(!is_xmlns_attr("xmlnsfoo"));
        assert!(!is_xmlns_attr("href"));
    }

    #[test]
    fn test_default_namespace() {
        let mut ctx = NamespaceContext::new();
        assert!(ctx.default_namespace().is_none());

        ctx.push_scope();
        ctx.bind("", "http://www.w3.org/1999/xhtml");
        assert_eq!(
            ctx.default_namespace().unwrap().as_ref(),
            "http://www.w3.org/1999/xhtml"
        );

        ctx.push_scope();
        ctx.bind("", "");
        assert!(ctx.default_namespace().is_none());

        ctx.pop_scope();
        ctx.pop_scope();
        assert!(ctx.default_namespace().is_none());
    }

    #[test]
    fn test_interned_uris_are_shared() {
        let mut ctx = NamespaceContext::new();
        let a = ctx.intern_uri("urn:a");
        let b = ctx.intern_uri("urn:a");
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_scope_prefix_inherited() {
        let outer = element_with(&[(Some("a"), "urn:a")]);
        let inner = element_with(&[(Some("b"), "urn:b")]);
        let root = Scope::new(&outer);
        let child = root.nest(&inner);

        assert_eq!(child.prefix_of("urn:a"), Some("a"));
        assert_eq!(child.prefix_of("urn:b"), Some("b"));
        assert_eq!(root.prefix_of("urn:b"), None);
        assert_eq!(child.element().declarations().count(), 1);
    }

    #[test]
    fn test_scope_shadowed_prefix_is_skipped() {
        let outer = element_with(&[(Some("p"), "urn:old")]);
        let inner = element_with(&[(Some("p"), "urn:new")]);
        let root = Scope::new(&outer);
        let child = root.nest(&inner);

        assert_eq!(child.prefix_of("urn:new"), Some("p"));
        assert_eq!(child.prefix_of("urn:old"), None);
        assert_eq!(root.prefix_of("urn:old"), Some("p"));
    }

    #[test]
    fn test_scope_default_declaration_has_no_prefix() {
        let el = element_with(&[(None, "urn:d")]);
        let scope = Scope::new(&el);

        assert_eq!(scope.prefix_of("urn:d"), None);
        assert_eq!(scope.lookup_namespace(""), Some("urn:d"));
    }

    #[test]
    fn test_scope_xml_prefix_always_bound() {
        let el = element_with(&[]);
        let scope = Scope::new(&el);

        assert_eq!(scope.lookup_namespace("xml"), Some(XML_NAMESPACE));
        assert_eq!(scope.prefix_of(XML_NAMESPACE), Some("xml"));
        assert_eq!(scope.prefix_of(""), None);
    }
}
