//! Test utilities for file resolution.


pub use archive_reader::TestArchiveReader;
pub use http_client::TestHttpClient;

use std::sync::Arc;

use crate::{FileRegistry, ZipArchiveReader};

/// Creates a registry that downloads through the given test client and reads
/// archives with the real ZIP reader.
pub fn registry_with(http: TestHttpClient) -> FileRegistry {
    FileRegistry::new(Arc::new(http), Arc::new(ZipArchiveReader))
}

/// Creates a registry with no remote files.
pub fn registry() -> FileRegistry {
    registry_with(TestHttpClient::new())
}
