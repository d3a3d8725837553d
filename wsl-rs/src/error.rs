//! Error types for the XML to WSL transcoder.

use thiserror::Error;

/// Result type alias for transcoder operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or transcoding a document.
#[derive(Error, Debug)]
pub enum Error {
    /// The input is not well-formed XML.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl Error {
    /// Returns true if this error means the input was not well-formed XML.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Parse(_) | Error::Xml(_))
    }
}
