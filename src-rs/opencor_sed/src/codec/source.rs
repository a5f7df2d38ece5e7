use std::path::Path;

use opencor_file::{
    File,
    path::{is_remote, is_windows_drive_path, retrieve_file_info},
};
use percent_encoding::percent_decode_str;
use url::Url;

/// Returns the location of a model file referred to as `source` by a SED-ML
/// document.
///
/// URLs and absolute paths are returned as given. Relative sources are
/// resolved against the directory of a local document, or joined to the URL
/// of a remote one.
#[must_use]
pub fn resolve_source(document_path: &str, document_is_local: bool, source: &str) -> String {
    let source = source.trim();
    let is_file_url = source.get(..7).is_some_and(|scheme| scheme.eq_ignore_ascii_case("file://"));

    if is_remote(source) || is_file_url {
        return source.to_string();
    }

    if document_is_local {
        if is_windows_drive_path(source) || Path::new(source).is_absolute() {
            return source.to_string();
        }

        return Path::new(document_path)
            .parent()
            .map_or_else(|| source.to_string(), |directory| directory.join(source).to_string_lossy().into_owned());
    }

    Url::parse(document_path)
        .and_then(|url| url.join(source))
        .map_or_else(|_| source.to_string(), String::from)
}

/// Returns the location of `file` as written in the `source` attribute of a
/// SED-ML model.
///
/// Without a base path, a local file is written as a `file://` URL and a
/// remote one as its URL. With a base path, the location is made relative
/// to it when both are local, or both are remote on the same server.
///
/// `file://` URLs are not percent-encoded: `/a/my model.cellml` is written as
/// `file:///a/my model.cellml` and `C:\a\model.cellml` as
/// `file:///C:/a/model.cellml`.
#[must_use]
pub fn model_source(file: &File, base_path: Option<&str>) -> String {
    let absolute = if file.is_local() {
        file_url(file.path())
    } else {
        file.path().to_string()
    };

    let Some(base_path) = base_path else {
        return absolute;
    };

    let base = retrieve_file_info(base_path);

    let relative = match (base.is_local, file.is_local()) {
        (true, true) => Url::from_directory_path(&base.path)
            .ok()
            .zip(Url::from_file_path(file.path()).ok())
            .and_then(|(base, file)| base.make_relative(&file)),
        (false, false) => {
            let base = Url::parse(&format!("{}/", base.path.trim_end_matches('/'))).ok();
            let file = Url::parse(file.path()).ok();

            base.zip(file)
                .filter(|(base, file)| {
                    base.scheme() == file.scheme()
                        && base.host_str() == file.host_str()
                        && base.port_or_known_default() == file.port_or_known_default()
                })
                .and_then(|(base, file)| base.make_relative(&file))
        }
        (true, false) | (false, true) => None,
    };

    relative.map_or(absolute, |relative| percent_decode_str(&relative).decode_utf8_lossy().into_owned())
}

fn file_url(path: &str) -> String {
    if is_windows_drive_path(path) {
        format!("file:///{}", path.replace('\\', "/"))
    } else {
        format!("file://{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::registry;

    #[cfg(unix)]
    #[test]
    fn relative_sources_follow_their_document() {
        assert_eq!(resolve_source("/a/b/doc.sedml", true, "model.cellml"), "/a/b/model.cellml");
        assert_eq!(resolve_source("/a/b/doc.sedml", true, "/c/model.cellml"), "/c/model.cellml");
        assert_eq!(
            resolve_source("https://example.org/a/doc.sedml", false, "model.cellml"),
            "https://example.org/a/model.cellml"
        );
        assert_eq!(
            resolve_source("/a/b/doc.sedml", true, "https://example.org/model.cellml"),
            "https://example.org/model.cellml"
        );
        assert_eq!(
            resolve_source("/a/b/doc.sedml", true, "file:///c/model.cellml"),
            "file:///c/model.cellml"
        );
    }

    #[cfg(unix)]
    #[test]
    fn local_sources() {
        let registry = registry();
        let file = File::new_in_memory(&registry, "/some/dir/my model.cellml", Vec::new());

        assert_eq!(model_source(&file, None), "file:///some/dir/my model.cellml");
        assert_eq!(model_source(&file, Some("/some/dir")), "my model.cellml");
        assert_eq!(model_source(&file, Some("/some/dir/a/b")), "../../my model.cellml");
        assert_eq!(
            model_source(&file, Some("https://example.org/")),
            "file:///some/dir/my model.cellml"
        );
    }

    #[test]
    fn windows_sources_use_forward_slashes() {
        let registry = registry();
        let file = File::new_in_memory(&registry, "C:\\some\\path\\file.txt", Vec::new());

        assert_eq!(model_source(&file, None), "file:///C:/some/path/file.txt");
        assert_eq!(file_url("P:/some/path/file.txt"), "file:///P:/some/path/file.txt");
    }

    #[test]
    fn remote_sources() {
        let registry = registry();
        let file = File::new_in_memory(&registry, "https://example.org/models/model.cellml", Vec::new());

        assert_eq!(model_source(&file, None), "https://example.org/models/model.cellml");
        assert_eq!(model_source(&file, Some("https://example.org/models")), "model.cellml");
        assert_eq!(model_source(&file, Some("https://example.org/other/")), "../models/model.cellml");
        assert_eq!(
            model_source(&file, Some("https://example.com/models/")),
            "https://example.org/models/model.cellml"
        );
    }
}
