//! XML input.
//!
//! Parsing itself is delegated to quick-xml; this module turns its event
//! stream into the namespace-aware tree in [`crate::node`].

mod loader;

pub use loader::{load, load_file, load_str, XmlLoader};
