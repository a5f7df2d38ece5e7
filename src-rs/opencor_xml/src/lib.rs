//! Minimal XML reader and writer for the OpenCOR engine
//!
//! CellML models, SED-ML documents and COMBINE manifests are all small XML
//! documents. This crate parses them into an [`Element`] tree with resolved
//! namespaces and pretty prints element trees back to text.
//!
//! Only the subset of XML those formats use is supported: elements,
//! attributes, character data (including CDATA sections and the predefined and
//! numeric entities), comments, processing instructions and a skipped
//! `DOCTYPE`. DTD validation and external entities are not supported.

mod element;
pub mod error;
mod parser;
mod util;
mod writer;

pub use element::{Element, Node};
pub use error::XmlError;

/// Parses a complete XML document and returns its root element.
///
/// # Errors
///
/// Returns an error if the input is not well-formed, or if it contains
/// anything but whitespace, comments and processing instructions around the
/// root element.
pub fn parse_document(input: &str) -> Result<Element, XmlError> {
    parser::parse_document(input)
}

/// Parses a complete XML document given as raw bytes.
///
/// A UTF-8 byte order mark is skipped.
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8 or if the document is
/// not well-formed.
pub fn parse_bytes(input: &[u8]) -> Result<Element, XmlError> {
    let input = input.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(input);
    let text = std::str::from_utf8(input).map_err(|error| XmlError::invalid_utf8(error.valid_up_to()))?;

    parse_document(text)
}
