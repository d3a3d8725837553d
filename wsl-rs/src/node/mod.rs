//! Node structures for the parsed XML tree.
//!
//! The tree is a plain owned structure: a document holds its root elements,
//! each element owns its attributes and children. Namespace bindings stay
//! attached to the element that declares them, and [`Scope`] resolves them
//! during traversal.

mod element;
pub mod namespace;

pub use element::{XmlAttribute, XmlDocument, XmlElement};
pub use namespace::{
    is_xmlns_attr, split_qname, ExpandedName, NamespaceContext, Scope, XMLNS_NAMESPACE,
    XML_NAMESPACE,
};
