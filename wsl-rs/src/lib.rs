//! XML to WSL transcoding.
//!
//! WSL is a compact, indentation-based rendering of an XML tree. Each element
//! is written as its (dash-cased) name followed by up to three blocks:
//! namespace declarations in `( )`, attributes in `[ ]` and child elements in
//! `{ }`:
//!
//! ```text
//!  pkg ( wslns:ns="urn:y" ) {
//!   ns:child [ attr-value="5" ]
//! }
//! ```
//!
//! Loading is done by [`xml`] on top of quick-xml; the tree lives in
//! [`node`]; [`wsl`] holds the emitter and a tokenizer for the output format.

pub mod error;
pub mod node;
pub mod wsl;
pub mod xml;

use std::io::{Read, Write};

pub use error::{Error, Result};
pub use node::{ExpandedName, NamespaceContext, Scope, XmlAttribute, XmlDocument, XmlElement};
pub use wsl::{
    to_wsl_string, wsl_local_name, Lexer, Token, TokenKind, WslEmitter, WslOptions,
    DECLARATION_MARKER,
};
pub use xml::{load, load_file, load_str, XmlLoader};

/// Reads a whole XML document from `input` and writes it to `output` as WSL.
///
/// Nothing is written unless the input parses. `output` is not flushed.
pub fn transcode<R: Read, W: Write>(input: R, output: W) -> Result<()> {
    let document = load(input)?;
    let mut emitter = WslEmitter::new(output);
    emitter.write_document(&document)?;
    Ok(())
}
