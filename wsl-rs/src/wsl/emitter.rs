//! WSL emitter that renders a document tree.
//!
//! Every element is written as its name followed by up to three blocks:
//! namespace declarations in `( )`, attributes in `[ ]` and child elements in
//! `{ }`. Empty blocks are omitted. A block holding more than one item is laid
//! out one item per line; a child block is always laid out that way.

use std::io::{self, Write};
use std::rc::Rc;

use tracing::trace;

use crate::node::{ExpandedName, Scope, XmlAttribute, XmlDocument, XmlElement};

/// Name written for namespace declarations, in place of `xmlns`.
pub const DECLARATION_MARKER: &str = "wslns";

/// Layout options for WSL output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WslOptions {
    /// Indentation written once per nesting level.
    pub indent: String,
    /// Line terminator.
    pub newline: String,
}

impl Default for WslOptions {
    fn default() -> Self {
        WslOptions {
            indent: "  ".to_string(),
            newline: "\n".to_string(),
        }
    }
}

/// Writes documents as WSL to an output sink.
///
/// The emitter writes as it walks and never flushes; the sink belongs to the
/// caller.
pub struct WslEmitter<W: Write> {
    writer: W,
    options: WslOptions,
    default_ns: Rc<str>,
}

impl<W: Write> WslEmitter<W> {
    /// Creates a new emitter with default layout.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, WslOptions::default())
    }

    /// Creates a new emitter with the given layout options.
    pub fn with_options(writer: W, options: WslOptions) -> Self {
        WslEmitter {
            writer,
            options,
            default_ns: Rc::from(""),
        }
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Consumes the emitter, returning the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes a whole document.
    ///
    /// Several root elements are written one per line at the left margin; a
    /// single root is written inline after a space.
    pub fn write_document(&mut self, document: &XmlDocument) -> io::Result<()> {
        self.default_ns = document.default_namespace();

        let roots = document.roots();
        let many = roots.len() > 1;
        trace!(
            roots = roots.len(),
            default_ns = %self.default_ns,
            "writing WSL document"
        );
        for root in roots {
            self.write_element(root, None, 0, many)?;
        }
        Ok(())
    }

    fn write_element(
        &mut self,
        element: &XmlElement,
        parent: Option<&Scope<'_>>,
        depth: usize,
        many: bool,
    ) -> io::Result<()> {
        let scope = match parent {
            Some(parent) => parent.nest(element),
            None => Scope::new(element),
        };

        self.write_lead(depth, many)?;
        self.write_name(element.name(), &scope)?;

        let declarations: Vec<&XmlAttribute> = element.declarations().collect();
        self.write_block("(", ")", false, &declarations, depth, |w, attr, depth, many| {
            w.write_declaration(attr, depth, many)
        })?;

        let attributes: Vec<&XmlAttribute> = element.plain_attributes().collect();
        self.write_block("[", "]", false, &attributes, depth, |w, attr, depth, many| {
            w.write_attribute(attr, &scope, depth, many)
        })?;

        self.write_block(
            "{",
            "}",
            true,
            element.children(),
            depth,
            |w, child, depth, many| w.write_element(child, Some(&scope), depth, many),
        )?;

        if many {
            self.write_newline()?;
        }
        Ok(())
    }

    /// Writes one bracketed block; `write_item` renders each item at the
    /// block's inner depth.
    fn write_block<T, F>(
        &mut self,
        begin: &str,
        end: &str,
        force_many: bool,
        items: &[T],
        depth: usize,
        mut write_item: F,
    ) -> io::Result<()>
    where
        F: FnMut(&mut Self, &T, usize, bool) -> io::Result<()>,
    {
        if items.is_empty() {
            return Ok(());
        }
        let many = items.len() > 1 || force_many;

        write!(self.writer, " {}", begin)?;
        if many {
            self.write_newline()?;
        }
        for item in items {
            write_item(self, item, depth + 1, many)?;
        }
        if many {
            self.write_indent(depth)?;
        } else {
            self.writer.write_all(b" ")?;
        }
        self.writer.write_all(end.as_bytes())
    }

    fn write_declaration(
        &mut self,
        attr: &XmlAttribute,
        depth: usize,
        many: bool,
    ) -> io::Result<()> {
        self.write_lead(depth, many)?;
        self.writer.write_all(DECLARATION_MARKER.as_bytes())?;
        if let Some(Some(prefix)) = attr.declared_prefix() {
            write!(self.writer, ":{}", prefix)?;
        }
        self.write_value(attr.value())?;
        if many {
            self.write_newline()?;
        }
        Ok(())
    }

    fn write_attribute(
        &mut self,
        attr: &XmlAttribute,
        scope: &Scope<'_>,
        depth: usize,
        many: bool,
    ) -> io::Result<()> {
        self.write_lead(depth, many)?;
        self.write_name(attr.name(), scope)?;
        self.write_value(attr.value())?;
        if many {
            self.write_newline()?;
        }
        Ok(())
    }

    /// Names outside the default namespace get the prefix bound to their
    /// namespace, when one is in scope.
    fn write_name(&mut self, name: &ExpandedName, scope: &Scope<'_>) -> io::Result<()> {
        if name.namespace_uri != self.default_ns {
            if let Some(prefix) = scope
                .prefix_of(&name.namespace_uri)
                .filter(|prefix| !prefix.is_empty())
            {
                write!(self.writer, "{}:", prefix)?;
            }
        }
        self.writer
            .write_all(wsl_local_name(&name.local_name).as_bytes())
    }

    // Values go out verbatim.
    fn write_value(&mut self, value: &str) -> io::Result<()> {
        write!(self.writer, "=\"{}\"", value)
    }

    fn write_lead(&mut self, depth: usize, many: bool) -> io::Result<()> {
        if many {
            self.write_indent(depth)
        } else {
            self.writer.write_all(b" ")
        }
    }

    fn write_indent(&mut self, depth: usize) -> io::Result<()> {
        for _ in 0..depth {
            self.writer.write_all(self.options.indent.as_bytes())?;
        }
        Ok(())
    }

    fn write_newline(&mut self) -> io::Result<()> {
        self.writer.write_all(self.options.newline.as_bytes())
    }
}

/// Converts an XML local name to WSL casing.
///
/// Upper-case letters are lowered, and a `-` goes in front of each one unless
/// it starts the name or follows a `.` or `-`. So `ItemOne` becomes
/// `item-one` and `Grid.RowSpan` becomes `grid.row-span`.
pub fn wsl_local_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        if c.is_uppercase() {
            if !matches!(prev, None | Some('.') | Some('-')) {
                result.push('-');
            }
            result.extend(c.to_lowercase());
        } else {
            result.push(c);
        }
        prev = Some(c);
    }
    result
}

/// Writes a document to a string.
pub fn to_wsl_string(document: &XmlDocument) -> io::Result<String> {
    let mut output = Vec::new();
    {
        let mut emitter = WslEmitter::new(&mut output);
        emitter.write_document(document)?;
    }
    Ok(String::from_utf8_lossy(&output).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::load_str;

    fn wsl(xml: &str) -> String {
        let doc = load_str(xml).unwrap();
        to_wsl_string(&doc).unwrap()
    }

    #[test]
    fn test_local_name_casing() {
        assert_eq!(wsl_local_name("ItemOne"), "item-one");
        assert_eq!(wsl_local_name("attrValue"), "attr-value");
        assert_eq!(wsl_local_name("Grid.RowSpan"), "grid.row-span");
        assert_eq!(wsl_local_name("Foo-Bar"), "foo-bar");
        assert_eq!(wsl_local_name("ABC"), "a-b-c");
        assert_eq!(wsl_local_name("x1Y_z"), "x1-y_z");
        assert_eq!(wsl_local_name(""), "");
    }

    #[test]
    fn test_local_name_fixed_point() {
        for name in ["item-one", "grid.row-span", "plain", "a-b-c", "x_1"] {
            assert_eq!(wsl_local_name(name), name);
        }
        let once = wsl_local_name("SomeLongName.WithParts");
        assert_eq!(wsl_local_name(&once), once);
    }

    #[test]
    fn test_single_root_with_default_namespace() {
        let output = wsl(r#"<Root xmlns="urn:x"><ItemOne attrValue="5"/></Root>"#);
        assert_eq!(
            output,
            " root ( wslns=\"urn:x\" ) {\n  item-one [ attr-value=\"5\" ]\n}"
        );
    }

    #[test]
    fn test_sibling_roots() {
        assert_eq!(wsl("<A/><B/>"), "a\nb\n");
    }

    #[test]
    fn test_prefixed_child() {
        let output = wsl(r#"<Pkg xmlns:ns="urn:y"><ns:Child/></Pkg>"#);
        assert_eq!(output, " pkg ( wslns:ns=\"urn:y\" ) {\n  ns:child\n}");
    }

    #[test]
    fn test_bare_element() {
        assert_eq!(wsl("<Lone/>"), " lone");
    }

    #[test]
    fn test_multiple_attributes_go_multiline() {
        let output = wsl(r#"<a x="1" y="2"/>"#);
        assert_eq!(output, " a [\n  x=\"1\"\n  y=\"2\"\n]");
    }

    #[test]
    fn test_nested_blocks_indent() {
        let output = wsl(r#"<a><b x="1" y="2"><c/><d/></b></a>"#);
        assert_eq!(
            output,
            concat!(
                " a {\n",
                "  b [\n",
                "    x=\"1\"\n",
                "    y=\"2\"\n",
                "  ] {\n",
                "    c\n",
                "    d\n",
                "  }\n",
                "}"
            )
        );
    }

    #[test]
    fn test_declarations_and_prefixed_attributes() {
        let output = wsl(r#"<r xmlns="urn:d" xmlns:p="urn:p" p:x="1" y="2"/>"#);
        assert_eq!(
            output,
            concat!(
                " r (\n",
                "  wslns=\"urn:d\"\n",
                "  wslns:p=\"urn:p\"\n",
                ") [\n",
                "  p:x=\"1\"\n",
                "  y=\"2\"\n",
                "]"
            )
        );
    }

    #[test]
    fn test_default_namespace_suppresses_prefix() {
        // The root's default namespace is also bound to a prefix; names in it
        // still render bare.
        let output = wsl(r#"<a xmlns="urn:d" xmlns:d="urn:d"><d:b/></a>"#);
        assert!(output.contains("\n  b\n"), "{}", output);
    }

    #[test]
    fn test_unresolvable_prefix_renders_bare_name() {
        // Possibly lossy: `b` lives in urn:b but there is no prefix for it.
        let output = wsl(r#"<a><b xmlns="urn:b"/></a>"#);
        assert_eq!(output, " a {\n  b ( wslns=\"urn:b\" )\n}");
        assert!(!output.contains(":b"));
    }

    #[test]
    fn test_xml_prefix_is_resolved() {
        let output = wsl(r#"<doc xml:lang="en"/>"#);
        assert_eq!(output, " doc [ xml:lang=\"en\" ]");
    }

    #[test]
    fn test_shadowed_prefix_resolves_to_nearest() {
        let output = wsl(r#"<a xmlns:p="urn:one"><p:b xmlns:p="urn:two"><p:c/></p:b></a>"#);
        assert_eq!(
            output,
            concat!(
                " a ( wslns:p=\"urn:one\" ) {\n",
                "  p:b ( wslns:p=\"urn:two\" ) {\n",
                "    p:c\n",
                "  }\n",
                "}"
            )
        );
    }

    #[test]
    fn test_values_are_verbatim() {
        let output = wsl(r#"<a v="x &amp; y"/>"#);
        assert_eq!(output, " a [ v=\"x & y\" ]");
    }

    #[test]
    fn test_literal_line_breaks_do_not_reach_values() {
        let output = wsl("<a v=\"x&#10;y\" w=\"x\ny\"/>");
        assert_eq!(output, " a [\n  v=\"x\ny\"\n  w=\"x y\"\n]");
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(wsl(""), "");
    }

    #[test]
    fn test_custom_options() {
        let doc = load_str("<a><b/></a>").unwrap();
        let options = WslOptions {
            indent: "\t".to_string(),
            newline: "\r\n".to_string(),
        };
        let mut emitter = WslEmitter::with_options(Vec::new(), options);
        emitter.write_document(&doc).unwrap();
        let output = String::from_utf8(emitter.into_inner()).unwrap();
        assert_eq!(output, " a {\r\n\tb\r\n}");
    }

    #[test]
    fn test_sink_errors_propagate() {
        struct FailingWriter;
        impl Write for FailingWriter {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("sink closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let doc = load_str("<a/>").unwrap();
        let mut emitter = WslEmitter::new(FailingWriter);
        assert!(emitter.write_document(&doc).is_err());
    }
}
