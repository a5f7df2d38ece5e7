//! Normalisation of user supplied file names and URLs
//!
//! A file can be referred to in many ways: a POSIX or Windows path (absolute
//! or relative), a `file://` URI (possibly percent-encoded) or an HTTP(S) URL
//! (possibly percent-encoded). [`retrieve_file_info`] turns all of them into
//! the identity used by the [`FileRegistry`](crate::FileRegistry), so that
//! different spellings of the same resource share one [`File`](crate::File).

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

/// The identity of a file, as derived from a file name or URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileInfo {
    /// Whether the file lives on the local file system
    pub is_local: bool,
    /// The absolute native path of a local file, or the decoded URL of a
    /// remote file
    pub path: String,
}

impl FileInfo {
    fn local(path: &str) -> Self {
        let path = path.replace('\\', "/");
        let absolute = if is_windows_drive_path(&path) || Path::new(&path).is_absolute() {
            PathBuf::from(&path)
        } else {
            std::env::current_dir().map_or_else(|_| PathBuf::from(&path), |cwd| cwd.join(&path))
        };

        let cleaned = path_clean::clean(absolute);

        Self {
            is_local: true,
            path: native_form(&cleaned.to_string_lossy()),
        }
    }

    fn remote(url: &str) -> Self {
        Self {
            is_local: false,
            path: percent_decode_str(url).decode_utf8_lossy().into_owned(),
        }
    }
}

/// Returns the identity of the given file name or URL.
///
/// - `file://` URIs are percent-decoded and turned into a local path;
/// - `http://` and `https://` URLs are remote and percent-decoded;
/// - everything else is a local path, with `\` accepted as a separator,
///   resolved against the current working directory when relative, and with
///   `.` and `..` segments collapsed.
#[must_use]
pub fn retrieve_file_info(file_name_or_url: &str) -> FileInfo {
    let input = file_name_or_url.trim();

    if let Some(uri_path) = strip_prefix_ignore_ascii_case(input, "file://") {
        let decoded = percent_decode_str(uri_path).decode_utf8_lossy().replace('\\', "/");

        // file:///C:/a/b has a leading slash before the drive
        let path = match decoded.strip_prefix('/') {
            Some(rest) if is_windows_drive_path(rest) => rest,
            _ => decoded.as_str(),
        };

        return FileInfo::local(path);
    }

    if is_remote(input) {
        return FileInfo::remote(input);
    }

    FileInfo::local(input)
}

/// Returns whether the given string is an HTTP(S) URL.
#[must_use]
pub fn is_remote(file_name_or_url: &str) -> bool {
    Url::parse(file_name_or_url).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Returns whether the path starts with a Windows drive (`C:/`).
///
/// Such paths are absolute on every platform.
#[must_use]
pub fn is_windows_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();

    bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && (bytes[2] == b'/' || bytes[2] == b'\\')
}

/// Converts a path to use the separator of the current platform.
#[cfg(windows)]
fn native_form(path: &str) -> String {
    path.replace('/', "\\")
}

/// Converts a path to use the separator of the current platform.
#[cfg(not(windows))]
fn native_form(path: &str) -> String {
    path.to_string()
}

fn strip_prefix_ignore_ascii_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;

    head.eq_ignore_ascii_case(prefix).then(|| &text[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(windows))]
    #[test]
    fn posix_forms_share_an_identity() {
        let expected = "/some/path/file.txt";

        for input in [
            "/some/path/file.txt",
            "/some/path/./other/../file.txt",
            "file:///some/path/file.txt",
            "FILE:///some/path/file.txt",
            "file:///some/path/my%20dir/../file.txt",
        ] {
            let info = retrieve_file_info(input);

            assert!(info.is_local, "{input} should be local");
            assert_eq!(info.path, expected, "{input}");
        }
    }

    #[cfg(not(windows))]
    #[test]
    fn windows_forms_share_an_identity() {
        let expected = "C:/some/path/file.txt";

        for input in [
            "C:\\some\\path\\file.txt",
            "C:/some/path/file.txt",
            "file:///C:/some/path/file.txt",
            "file:///C:\\some\\path\\file.txt",
        ] {
            let info = retrieve_file_info(input);

            assert!(info.is_local, "{input} should be local");
            assert_eq!(info.path, expected, "{input}");
        }
    }

    #[test]
    fn relative_paths_are_resolved_against_the_working_directory() {
        let cwd = std::env::current_dir().expect("cwd should be available");
        let info = retrieve_file_info("some/../file.txt");

        assert!(info.is_local);
        assert_eq!(PathBuf::from(info.path), cwd.join("file.txt"));
    }

    #[test]
    fn encoded_and_plain_urls_share_an_identity() {
        let encoded = retrieve_file_info("https://example.com/my%20model.cellml");
        let plain = retrieve_file_info("https://example.com/my model.cellml");

        assert!(!encoded.is_local);
        assert_eq!(encoded, plain);
        assert_eq!(encoded.path, "https://example.com/my model.cellml");
    }

    #[test]
    fn only_http_urls_are_remote() {
        assert!(is_remote("http://example.com/a.cellml"));
        assert!(is_remote("https://example.com/a.cellml"));
        assert!(!is_remote("ftp://example.com/a.cellml"));
        assert!(!is_remote("C:\\a.cellml"));
        assert!(!is_remote("/a.cellml"));
    }

    #[test]
    fn drive_paths() {
        assert!(is_windows_drive_path("C:/a"));
        assert!(is_windows_drive_path("d:\\a"));
        assert!(!is_windows_drive_path("/a"));
        assert!(!is_windows_drive_path("C:"));
    }
}
