//! File resolution and type detection for the OpenCOR engine
//!
//! A [`File`] is created from a file name or URL through [`File::open`] (or
//! from bytes through [`File::new_in_memory`]), retrieved, and classified as a
//! CellML file, a SED-ML file, a COMBINE archive, an unknown file or an
//! irretrievable file. The [`FileRegistry`] guarantees that a given identity
//! maps to at most one live file.
//!
//! Remote retrieval and archive reading go through the [`HttpClient`] and
//! [`ArchiveReader`] traits; [`ReqwestClient`] and [`ZipArchiveReader`] are
//! the implementations used outside of tests.

pub mod archive;
mod file;
mod http;
pub mod path;
mod registry;

#[cfg(test)]
mod test;

pub use archive::{ArchiveEntry, ArchiveError, ArchiveReader, ZipArchiveReader};
pub use file::{CELLML_NAMESPACES, File, FileRef, FileType, SEDML_NAMESPACE_PREFIX};
pub use http::{HttpClient, HttpError, ReqwestClient};
pub use registry::FileRegistry;
