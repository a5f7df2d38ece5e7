//! COMBINE archives
//!
//! A COMBINE archive (OMEX) is a ZIP container with a `manifest.xml` entry
//! that lists the other entries, their format and which one is the master
//! file. The [`ArchiveReader`] trait is the seam between file classification
//! and the container format; [`ZipArchiveReader`] is the shipped
//! implementation.

mod zip;

use opencor_shared::number::parse_boolean;
use opencor_xml::XmlError;

pub use zip::{ZipArchiveReader, is_zip};

/// The location of the manifest inside a COMBINE archive
pub const MANIFEST_LOCATION: &str = "manifest.xml";

/// The namespace of the root element of a COMBINE manifest
pub const MANIFEST_NAMESPACE: &str = "http://identifiers.org/combine.specifications/omex-manifest";

/// An entry listed in the manifest of a COMBINE archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// The location of the entry, relative to the archive root and without a
    /// leading `./`
    pub location: String,
    /// The format URI of the entry
    pub format: String,
    /// Whether the entry is the master file of the archive
    pub master: bool,
}

/// An error produced while reading an archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The bytes are not a readable ZIP container
    #[error("malformed archive: {0}")]
    Malformed(&'static str),
    /// The container uses a feature that is not supported
    #[error("unsupported archive: {0}")]
    Unsupported(&'static str),
    /// The requested entry is not in the archive
    #[error("the archive has no entry `{0}`")]
    MissingEntry(String),
    /// The manifest is well-formed XML but not a COMBINE manifest
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    /// The manifest is not well-formed XML
    #[error("the manifest could not be parsed: {0}")]
    Manifest(#[from] XmlError),
    /// An entry could not be decompressed
    #[error("an entry could not be decompressed: {0}")]
    Decompression(#[from] std::io::Error),
}

/// Reads the manifest and the entries of an archive.
pub trait ArchiveReader: Send + Sync {
    /// Returns the content entries listed by the manifest of the archive.
    ///
    /// The manifest itself and the archive root (`.`) are not returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive or its manifest cannot be read.
    fn read_manifest(&self, archive: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError>;

    /// Returns the uncompressed bytes of the entry at `location`.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive cannot be read or has no such entry.
    fn read_entry(&self, archive: &[u8], location: &str) -> Result<Vec<u8>, ArchiveError>;
}

/// Removes the leading `./` segments of a manifest location.
#[must_use]
pub fn normalise_location(location: &str) -> &str {
    let mut location = location;

    while let Some(rest) = location.strip_prefix("./") {
        location = rest;
    }

    location
}

/// Parses an OMEX manifest.
///
/// # Errors
///
/// Returns an error if the manifest is not well-formed XML or if its root
/// element is not `omexManifest`.
pub fn parse_manifest(manifest: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let root = opencor_xml::parse_bytes(manifest)?;

    if root.local_name() != "omexManifest" {
        return Err(ArchiveError::InvalidManifest(format!(
            "the root element is `{}` instead of `omexManifest`",
            root.name()
        )));
    }

    let entries = root
        .children_named("content")
        .filter_map(|content| {
            let location = normalise_location(content.attribute("location")?);

            if location.is_empty() || location == "." || location == MANIFEST_LOCATION {
                return None;
            }

            Some(ArchiveEntry {
                location: location.to_string(),
                format: content.attribute("format").unwrap_or_default().to_string(),
                master: content
                    .attribute("master")
                    .and_then(parse_boolean)
                    .unwrap_or(false),
            })
        })
        .collect();

    Ok(entries)
}
