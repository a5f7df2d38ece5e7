//! Zip32 reader for COMBINE archives
//!
//! Only what COMBINE archives need is supported: a single-disk Zip32
//! container whose entries are stored or deflated. Zip64, multi-disk and
//! encrypted archives are rejected.

use std::io::Read;

use flate2::read::DeflateDecoder;

use super::{ArchiveEntry, ArchiveError, ArchiveReader, MANIFEST_LOCATION, normalise_location, parse_manifest};

const SIG_EOCD: u32 = 0x0605_4b50;
const SIG_CDFH: u32 = 0x0201_4b50;
const SIG_LFH: u32 = 0x0403_4b50;

const EOCD_MIN_LEN: usize = 22;
const EOCD_SEARCH_MAX: usize = 66 * 1024; // 64 KiB comment + header margin

/// Central directory fixed header length.
const CDFH_LEN: usize = 46;
/// Local file header fixed length.
const LFH_LEN: usize = 30;

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

const FLAG_ENCRYPTED: u16 = 0x0001;

/// Returns whether the bytes start with a ZIP local file header.
///
/// Empty and spanned archives (which start with another signature) are not
/// considered to be ZIP files.
#[must_use]
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.len() > 4 && le_u32(bytes, 0) == Some(SIG_LFH)
}

/// An [`ArchiveReader`] for in-memory Zip32 containers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveReader;

impl ArchiveReader for ZipArchiveReader {
    fn read_manifest(&self, archive: &[u8]) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let manifest = self.read_entry(archive, MANIFEST_LOCATION)?;

        parse_manifest(&manifest)
    }

    fn read_entry(&self, archive: &[u8], location: &str) -> Result<Vec<u8>, ArchiveError> {
        let location = normalise_location(location);
        let entry = central_directory(archive)?
            .into_iter()
            .find(|entry| normalise_location(&entry.name) == location)
            .ok_or_else(|| ArchiveError::MissingEntry(location.to_string()))?;

        tracing::trace!(location, method = entry.method, size = entry.uncompressed_size, "reading archive entry");

        entry.data(archive)
    }
}

/// Central-directory metadata for a single entry.
struct CentralEntry {
    name: String,
    flags: u16,
    method: u16,
    compressed_size: usize,
    uncompressed_size: usize,
    local_header_offset: usize,
}

impl CentralEntry {
    fn data(&self, archive: &[u8]) -> Result<Vec<u8>, ArchiveError> {
        if self.flags & FLAG_ENCRYPTED != 0 {
            return Err(ArchiveError::Unsupported("encrypted entries"));
        }

        let offset = self.local_header_offset;

        if le_u32(archive, offset) != Some(SIG_LFH) {
            return Err(ArchiveError::Malformed("bad local file header signature"));
        }

        let name_len = le_u16(archive, offset + 26).ok_or(ArchiveError::Malformed("truncated local file header"))?;
        let extra_len = le_u16(archive, offset + 28).ok_or(ArchiveError::Malformed("truncated local file header"))?;
        let start = offset + LFH_LEN + usize::from(name_len) + usize::from(extra_len);
        let data = archive
            .get(start..start + self.compressed_size)
            .ok_or(ArchiveError::Malformed("entry data out of bounds"))?;

        match self.method {
            METHOD_STORED => Ok(data.to_vec()),
            METHOD_DEFLATED => {
                let mut contents = Vec::with_capacity(self.uncompressed_size);

                DeflateDecoder::new(data).read_to_end(&mut contents)?;

                Ok(contents)
            }
            _ => Err(ArchiveError::Unsupported("compression method")),
        }
    }
}

fn central_directory(archive: &[u8]) -> Result<Vec<CentralEntry>, ArchiveError> {
    let truncated = ArchiveError::Malformed("truncated end of central directory");

    if archive.len() < EOCD_MIN_LEN {
        return Err(truncated);
    }

    let window_start = archive.len().saturating_sub(EOCD_SEARCH_MAX);
    let eocd = rfind_signature(&archive[window_start..], SIG_EOCD)
        .map(|index| window_start + index)
        .ok_or(ArchiveError::Malformed("missing end of central directory"))?;

    let field16 = |at: usize| le_u16(archive, eocd + at);
    let field32 = |at: usize| le_u32(archive, eocd + at);

    let (Some(disk_no), Some(cd_disk), Some(entries_disk), Some(entries_total), Some(cd_offset)) =
        (field16(4), field16(6), field16(8), field16(10), field32(16))
    else {
        return Err(truncated);
    };

    if disk_no != 0 || cd_disk != 0 || entries_disk != entries_total {
        return Err(ArchiveError::Unsupported("multi-disk archives"));
    }

    if entries_total == u16::MAX || cd_offset == u32::MAX {
        return Err(ArchiveError::Unsupported("Zip64 archives"));
    }

    let mut entries = Vec::with_capacity(usize::from(entries_total));
    let mut offset = to_usize(cd_offset)?;

    for _ in 0..entries_total {
        let bad_header = ArchiveError::Malformed("truncated central directory");

        if le_u32(archive, offset) != Some(SIG_CDFH) {
            return Err(ArchiveError::Malformed("bad central directory signature"));
        }

        let (
            Some(flags),
            Some(method),
            Some(compressed_size),
            Some(uncompressed_size),
            Some(name_len),
            Some(extra_len),
            Some(comment_len),
            Some(local_header_offset),
        ) = (
            le_u16(archive, offset + 8),
            le_u16(archive, offset + 10),
            le_u32(archive, offset + 20),
            le_u32(archive, offset + 24),
            le_u16(archive, offset + 28),
            le_u16(archive, offset + 30),
            le_u16(archive, offset + 32),
            le_u32(archive, offset + 42),
        )
        else {
            return Err(bad_header);
        };

        let name_start = offset + CDFH_LEN;
        let name = archive
            .get(name_start..name_start + usize::from(name_len))
            .ok_or(bad_header)?;

        entries.push(CentralEntry {
            name: String::from_utf8_lossy(name).into_owned(),
            flags,
            method,
            compressed_size: to_usize(compressed_size)?,
            uncompressed_size: to_usize(uncompressed_size)?,
            local_header_offset: to_usize(local_header_offset)?,
        });

        offset = name_start + usize::from(name_len) + usize::from(extra_len) + usize::from(comment_len);
    }

    Ok(entries)
}

fn rfind_signature(haystack: &[u8], signature: u32) -> Option<usize> {
    (0..haystack.len().saturating_sub(3))
        .rev()
        .find(|&index| le_u32(haystack, index) == Some(signature))
}

fn to_usize(value: u32) -> Result<usize, ArchiveError> {
    usize::try_from(value).map_err(|_| ArchiveError::Unsupported("entries larger than the address space"))
}

fn le_u16(bytes: &[u8], at: usize) -> Option<u16> {
    bytes.get(at..at + 2)?.try_into().ok().map(u16::from_le_bytes)
}

fn le_u32(bytes: &[u8], at: usize) -> Option<u32> {
    bytes.get(at..at + 4)?.try_into().ok().map(u32::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::zip::{Compression, build_archive, omex_manifest};

    #[test]
    fn sniff_zip_magic() {
        assert!(is_zip(b"PK\x03\x04rest"));
        assert!(!is_zip(b"PK\x03\x04"));
        assert!(!is_zip(b"PK\x05\x06rest"));
        assert!(!is_zip(b"<model/>"));
    }

    #[test]
    fn read_stored_and_deflated_entries() {
        let archive = build_archive(&[
            ("stored.txt", b"stored contents".as_slice(), Compression::Stored),
            ("deflated.txt", b"deflated contents, deflated contents".as_slice(), Compression::Deflated),
        ]);

        let reader = ZipArchiveReader;

        assert_eq!(
            reader.read_entry(&archive, "stored.txt").expect("entry should be read"),
            b"stored contents"
        );
        assert_eq!(
            reader.read_entry(&archive, "./deflated.txt").expect("entry should be read"),
            b"deflated contents, deflated contents"
        );
    }

    #[test]
    fn missing_entry_is_reported() {
        let archive = build_archive(&[("a.txt", b"a".as_slice(), Compression::Stored)]);
        let error = ZipArchiveReader
            .read_entry(&archive, "b.txt")
            .expect_err("entry should be missing");

        assert!(matches!(error, ArchiveError::MissingEntry(location) if location == "b.txt"));
    }

    #[test]
    fn read_manifest_of_combine_archive() {
        let manifest = omex_manifest(&[("model.cellml", "cellml", true)]);
        let archive = build_archive(&[
            ("manifest.xml", manifest.as_bytes(), Compression::Deflated),
            ("model.cellml", b"<model/>".as_slice(), Compression::Stored),
        ]);

        let entries = ZipArchiveReader
            .read_manifest(&archive)
            .expect("manifest should be read");

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].location, "model.cellml");
        assert!(entries[0].master);
    }

    #[test]
    fn archive_without_manifest_is_rejected() {
        let archive = build_archive(&[("model.cellml", b"<model/>".as_slice(), Compression::Stored)]);
        let error = ZipArchiveReader
            .read_manifest(&archive)
            .expect_err("manifest should be missing");

        assert!(matches!(error, ArchiveError::MissingEntry(_)));
    }

    #[test]
    fn truncated_archive_is_rejected() {
        let archive = build_archive(&[("a.txt", b"a".as_slice(), Compression::Stored)]);
        let truncated = &archive[..archive.len() - 10];

        assert!(ZipArchiveReader.read_entry(truncated, "a.txt").is_err());
        assert!(ZipArchiveReader.read_entry(b"PK\x03\x04 garbage", "a.txt").is_err());
    }
}
