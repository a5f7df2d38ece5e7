use std::{fmt, sync::Arc};

use opencor_shared::issue::{Issue, Logger};
use parking_lot::RwLock;

use crate::{
    FileRegistry,
    archive::is_zip,
    path::{FileInfo, retrieve_file_info},
};

/// A shared handle to a [`File`]
pub type FileRef = Arc<File>;

/// The namespaces of the CellML versions that are recognised
pub const CELLML_NAMESPACES: [&str; 3] = [
    "http://www.cellml.org/cellml/1.0#",
    "http://www.cellml.org/cellml/1.1#",
    "http://www.cellml.org/cellml/2.0#",
];

/// The prefix shared by the namespaces of every SED-ML level and version
pub const SEDML_NAMESPACE_PREFIX: &str = "http://sed-ml.org/sed-ml/";

/// The kind of a file, as derived from its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    /// The file has not been classified yet
    #[default]
    Undefined,
    /// A CellML model
    CellmlFile,
    /// A SED-ML simulation experiment description
    SedmlFile,
    /// A COMBINE archive
    CombineArchive,
    /// The contents are none of the above
    UnknownFile,
    /// The contents could not be retrieved
    IrretrievableFile,
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "undefined",
            Self::CellmlFile => "CellML file",
            Self::SedmlFile => "SED-ML file",
            Self::CombineArchive => "COMBINE archive",
            Self::UnknownFile => "unknown file",
            Self::IrretrievableFile => "irretrievable file",
        };

        f.write_str(name)
    }
}

/// A byte-content source: a local file, a remote file or an in-memory
/// buffer.
///
/// A file is identified by its absolute local path or its URL (see
/// [`retrieve_file_info`]) and its type is derived from its contents only.
/// The child files of a COMBINE archive are owned by the archive file and
/// are identified as `<archive path>.contents/<entry location>`.
pub struct File {
    info: FileInfo,
    registry: FileRegistry,
    state: RwLock<FileState>,
}

#[derive(Debug, Default)]
struct FileState {
    file_type: FileType,
    contents: Vec<u8>,
    retrieval_issues: Logger,
    classification_issues: Logger,
    child_files: Vec<FileRef>,
    master_file: Option<usize>,
}

/// The outcome of content sniffing.
enum Classification {
    Cellml,
    Sedml,
    Combine {
        child_files: Vec<FileRef>,
        master_file: Option<usize>,
    },
}

impl File {
    fn unresolved(registry: &FileRegistry, info: FileInfo) -> Self {
        Self {
            info,
            registry: registry.clone(),
            state: RwLock::new(FileState::default()),
        }
    }

    /// Returns the file with the given name or URL, retrieving and
    /// classifying it if the registry does not know it yet.
    ///
    /// A retrieval failure is not a Rust error: the file becomes an
    /// [`FileType::IrretrievableFile`] with an error issue.
    #[must_use]
    pub fn open(registry: &FileRegistry, file_name_or_url: &str) -> FileRef {
        let info = retrieve_file_info(file_name_or_url);

        if let Some(file) = registry.file(&info.path) {
            return file;
        }

        tracing::debug!(path = %info.path, local = info.is_local, "opening file");

        let file = Arc::new(Self::unresolved(registry, info));

        file.retrieve();

        registry.register(file)
    }

    /// Returns a file with the given identity and contents, without
    /// retrieving anything.
    ///
    /// If the registry already knows a file with that identity, its contents
    /// are replaced and it is returned.
    #[must_use]
    pub fn new_in_memory(registry: &FileRegistry, file_name_or_url: &str, contents: Vec<u8>) -> FileRef {
        let info = retrieve_file_info(file_name_or_url);

        if let Some(file) = registry.file(&info.path) {
            file.set_contents(contents);
            return file;
        }

        let file = Arc::new(Self::unresolved(registry, info));

        file.set_contents(contents);

        registry.register(file)
    }

    /// Retrieves the contents of the file again, and reclassifies it.
    ///
    /// Issues from a previous retrieval are cleared.
    pub fn reload(&self) {
        self.retrieve();
    }

    fn retrieve(&self) {
        let contents = if self.info.is_local {
            std::fs::read(&self.info.path).map_err(|error| {
                tracing::warn!(path = %self.info.path, %error, "file could not be read");
                "The file does not exist."
            })
        } else {
            self.registry.http().get(&self.info.path).map_err(|error| {
                tracing::warn!(url = %self.info.path, %error, "file could not be downloaded");
                "The file could not be downloaded."
            })
        };

        match contents {
            Ok(contents) => {
                {
                    let mut state = self.state.write();

                    state.retrieval_issues.remove_all_issues();
                    state.file_type = FileType::Undefined;
                }

                self.set_contents(contents);
            }
            Err(message) => {
                let mut state = self.state.write();

                state.file_type = FileType::IrretrievableFile;
                state.contents.clear();
                state.child_files.clear();
                state.master_file = None;
                state.classification_issues.remove_all_issues();
                state.retrieval_issues.remove_all_issues();
                state.retrieval_issues.add_error(message);
            }
        }
    }

    /// Replaces the contents of the file and reclassifies it.
    ///
    /// Issues from the previous classification are cleared; issues from
    /// retrieval are kept. Child files of a previous archive are released.
    pub fn set_contents(&self, contents: Vec<u8>) {
        let classification = self.classify(&contents);
        let mut state = self.state.write();

        state.classification_issues.remove_all_issues();
        state.child_files.clear();
        state.master_file = None;

        state.file_type = match classification {
            Some(Classification::Cellml) => FileType::CellmlFile,
            Some(Classification::Sedml) => FileType::SedmlFile,
            Some(Classification::Combine { child_files, master_file }) => {
                state.child_files = child_files;
                state.master_file = master_file;

                FileType::CombineArchive
            }
            None => {
                state
                    .classification_issues
                    .add_error("The file is not a CellML file, a SED-ML file, or a COMBINE archive.");

                FileType::UnknownFile
            }
        };

        state.contents = contents;

        tracing::debug!(path = %self.info.path, file_type = %state.file_type, "file classified");
    }

    fn classify(&self, contents: &[u8]) -> Option<Classification> {
        if let Some(classification) = classify_markup(contents) {
            return Some(classification);
        }

        if is_zip(contents) {
            return self.expand_archive(contents);
        }

        None
    }

    /// Creates a child file for every entry of a COMBINE archive.
    ///
    /// Returns `None` (i.e. an unknown file) if the archive cannot be read.
    fn expand_archive(&self, contents: &[u8]) -> Option<Classification> {
        let archive = self.registry.archive();
        let expanded = archive.read_manifest(contents).and_then(|entries| {
            let mut child_files = Vec::with_capacity(entries.len());
            let mut master_file = None;

            for entry in entries {
                let entry_contents = archive.read_entry(contents, &entry.location)?;
                let identity = format!("{}.contents/{}", self.path(), entry.location);

                if entry.master && master_file.is_none() {
                    master_file = Some(child_files.len());
                }

                child_files.push(Self::new_in_memory(&self.registry, &identity, entry_contents));
            }

            Ok(Classification::Combine { child_files, master_file })
        });

        expanded
            .map_err(|error| tracing::warn!(path = %self.info.path, %error, "archive could not be read"))
            .ok()
    }

    /// Returns the type of the file
    #[must_use]
    pub fn file_type(&self) -> FileType {
        self.state.read().file_type
    }

    /// Returns the local path of the file, or its URL for a remote file
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.info.path
    }

    /// Returns the URL of a remote file, or an empty string for a local one
    #[must_use]
    pub fn url(&self) -> &str {
        if self.info.is_local { "" } else { &self.info.path }
    }

    /// Returns the identity of the file: its URL if it has one, its file name
    /// otherwise
    #[must_use]
    pub fn path(&self) -> &str {
        &self.info.path
    }

    /// Returns whether the file lives on the local file system
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.info.is_local
    }

    /// Returns a copy of the contents of the file
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        self.state.read().contents.clone()
    }

    /// Returns the retrieval and classification issues of the file
    #[must_use]
    pub fn issues(&self) -> Vec<Issue> {
        let state = self.state.read();

        state
            .retrieval_issues
            .issues()
            .iter()
            .chain(state.classification_issues.issues())
            .cloned()
            .collect()
    }

    /// Returns whether the file has any issue
    #[must_use]
    pub fn has_issues(&self) -> bool {
        let state = self.state.read();

        state.retrieval_issues.issue_count() + state.classification_issues.issue_count() != 0
    }

    /// Returns whether the file has any error
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues().iter().any(Issue::is_error)
    }

    /// Returns whether the file is an archive with at least one child file
    #[must_use]
    pub fn has_child_files(&self) -> bool {
        !self.state.read().child_files.is_empty()
    }

    /// Returns the number of child files
    #[must_use]
    pub fn child_file_count(&self) -> usize {
        self.state.read().child_files.len()
    }

    /// Returns the child files, in manifest order
    #[must_use]
    pub fn child_files(&self) -> Vec<FileRef> {
        self.state.read().child_files.clone()
    }

    /// Returns the child file with the given identity, if any
    #[must_use]
    pub fn child_file(&self, file_name_or_url: &str) -> Option<FileRef> {
        let info = retrieve_file_info(file_name_or_url);

        self.state
            .read()
            .child_files
            .iter()
            .find(|child| child.path() == info.path)
            .cloned()
    }

    /// Returns the master file of an archive, if the manifest names one
    #[must_use]
    pub fn master_file(&self) -> Option<FileRef> {
        let state = self.state.read();

        state.master_file.and_then(|index| state.child_files.get(index).cloned())
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("path", &self.info.path)
            .field("is_local", &self.info.is_local)
            .field("file_type", &self.file_type())
            .finish_non_exhaustive()
    }
}

/// Sniffs a CellML or SED-ML root element.
fn classify_markup(contents: &[u8]) -> Option<Classification> {
    let root = opencor_xml::parse_bytes(contents).ok()?;
    let namespace = root.namespace()?;

    match root.local_name() {
        "model" if CELLML_NAMESPACES.contains(&namespace) => Some(Classification::Cellml),
        "sedML" if namespace.starts_with(SEDML_NAMESPACE_PREFIX) => Some(Classification::Sedml),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use opencor_shared::issue::IssueKind;

    use super::*;
    use crate::test::{
        self, TestArchiveReader, TestHttpClient,
        zip::{Compression, build_archive, omex_manifest},
    };

    const CELLML: &str = r#"<?xml version="1.0"?>
<model xmlns="http://www.cellml.org/cellml/1.1#" name="m"/>"#;
    const SEDML: &str = r#"<sedML xmlns="http://sed-ml.org/sed-ml/level1/version4" level="1" version="4"/>"#;
    const UNKNOWN_ERROR: &str = "The file is not a CellML file, a SED-ML file, or a COMBINE archive.";

    fn combine_archive() -> Vec<u8> {
        let manifest = omex_manifest(&[("simulation.sedml", "sed-ml", true), ("model.cellml", "cellml", false)]);

        build_archive(&[
            ("manifest.xml", manifest.as_bytes(), Compression::Deflated),
            ("simulation.sedml", SEDML.as_bytes(), Compression::Stored),
            ("model.cellml", CELLML.as_bytes(), Compression::Deflated),
        ])
    }

    #[test]
    fn local_cellml_file() {
        let mut temp = tempfile::NamedTempFile::new().expect("temporary file should be created");
        temp.write_all(CELLML.as_bytes()).expect("temporary file should be written");

        let registry = test::registry();
        let path = temp.path().to_string_lossy().into_owned();
        let file = File::open(&registry, &path);

        assert_eq!(file.file_type(), FileType::CellmlFile);
        assert_eq!(file.url(), "");
        assert!(file.is_local());
        assert!(!file.has_issues());
        assert_eq!(file.contents(), CELLML.as_bytes());
    }

    #[test]
    fn missing_local_file_is_irretrievable() {
        let registry = test::registry();
        let file = File::open(&registry, "/this/file/does/not/exist.cellml");

        assert_eq!(file.file_type(), FileType::IrretrievableFile);
        assert_eq!(file.issues(), [Issue::error("The file does not exist.")]);
    }

    #[test]
    fn remote_file_is_downloaded_once() {
        let http = TestHttpClient::new().with_response("https://example.com/my model.cellml", CELLML);
        let registry = test::registry_with(http);

        let encoded = File::open(&registry, "https://example.com/my%20model.cellml");
        let plain = File::open(&registry, "https://example.com/my model.cellml");

        assert!(Arc::ptr_eq(&encoded, &plain));
        assert_eq!(encoded.file_type(), FileType::CellmlFile);
        assert_eq!(encoded.url(), "https://example.com/my model.cellml");
        assert_eq!(encoded.file_name(), encoded.url());
        assert_eq!(registry.file_count(), 1);
    }

    #[test]
    fn failed_download_is_irretrievable() {
        let registry = test::registry();
        let file = File::open(&registry, "https://example.com/missing.cellml");

        assert_eq!(file.file_type(), FileType::IrretrievableFile);
        assert_eq!(file.issues(), [Issue::error("The file could not be downloaded.")]);
    }

    #[test]
    fn unknown_file_has_one_error() {
        let registry = test::registry();
        let file = File::new_in_memory(&registry, "/unknown.txt", b"Some unknown contents".to_vec());

        assert_eq!(file.file_type(), FileType::UnknownFile);
        assert_eq!(file.issues(), [Issue::error(UNKNOWN_ERROR)]);
        assert!(file.has_errors());
    }

    #[test]
    fn xml_with_another_root_is_unknown() {
        let registry = test::registry();
        let file = File::new_in_memory(&registry, "/other.xml", b"<model xmlns=\"urn:other\"/>".to_vec());

        assert_eq!(file.file_type(), FileType::UnknownFile);
    }

    #[test]
    fn setting_contents_reclassifies() {
        let registry = test::registry();
        let file = File::new_in_memory(&registry, "/file.xml", b"unknown".to_vec());

        file.set_contents(SEDML.as_bytes().to_vec());

        assert_eq!(file.file_type(), FileType::SedmlFile);
        assert!(!file.has_issues());
    }

    #[test]
    fn classification_is_idempotent() {
        let registry = test::registry();
        let file = File::new_in_memory(&registry, "/file.txt", b"unknown".to_vec());
        let issues = file.issues();

        file.set_contents(b"unknown".to_vec());

        assert_eq!(file.file_type(), FileType::UnknownFile);
        assert_eq!(file.issues(), issues);
    }

    #[test]
    fn retrieval_issues_survive_new_contents() {
        let registry = test::registry();
        let file = File::open(&registry, "/this/file/does/not/exist.cellml");

        file.set_contents(CELLML.as_bytes().to_vec());

        assert_eq!(file.file_type(), FileType::CellmlFile);
        assert_eq!(file.issues(), [Issue::error("The file does not exist.")]);

        file.set_contents(b"still unknown".to_vec());

        assert_eq!(file.file_type(), FileType::UnknownFile);
        assert_eq!(
            file.issues(),
            [Issue::error("The file does not exist."), Issue::error(UNKNOWN_ERROR)]
        );
    }

    #[test]
    fn irretrievable_file_with_unknown_contents_becomes_unknown() {
        let registry = test::registry();
        let file = File::open(&registry, "/this/file/does/not/exist.cellml");

        file.set_contents(b"garbage".to_vec());

        assert_eq!(file.file_type(), FileType::UnknownFile);
        assert_eq!(
            file.issues(),
            [Issue::error("The file does not exist."), Issue::error(UNKNOWN_ERROR)]
        );
    }

    #[test]
    fn reload_clears_retrieval_issues() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("model.cellml");
        let registry = test::registry();
        let file = File::open(&registry, &path.to_string_lossy());

        assert_eq!(file.file_type(), FileType::IrretrievableFile);

        std::fs::write(&path, CELLML).expect("model should be written");
        file.reload();

        assert_eq!(file.file_type(), FileType::CellmlFile);
        assert!(!file.has_issues());
    }

    #[test]
    fn combine_archive_has_child_files() {
        let registry = test::registry();
        let file = File::new_in_memory(&registry, "/some/archive.omex", combine_archive());

        assert_eq!(file.file_type(), FileType::CombineArchive);
        assert!(!file.has_issues());
        assert!(file.has_child_files());
        assert_eq!(file.child_file_count(), 2);

        let master = file.master_file().expect("archive should have a master file");

        assert_eq!(master.file_name(), "/some/archive.omex.contents/simulation.sedml");
        assert_eq!(master.file_type(), FileType::SedmlFile);

        let model = file
            .child_file("/some/archive.omex.contents/model.cellml")
            .expect("model should be a child file");

        assert_eq!(model.file_type(), FileType::CellmlFile);
        assert!(file.child_file("/some/archive.omex.contents/missing.cellml").is_none());

        // children are managed by the same registry
        assert!(registry.file("/some/archive.omex.contents/model.cellml").is_some());
        assert_eq!(registry.file_count(), 3);
    }

    #[test]
    fn child_files_are_released_with_their_archive() {
        let registry = test::registry();
        let file = File::new_in_memory(&registry, "/some/archive.omex", combine_archive());

        drop(file);

        assert_eq!(registry.file_count(), 0);
    }

    #[test]
    fn unreadable_archive_is_unknown() {
        let registry = FileRegistry::new(Arc::new(TestHttpClient::new()), Arc::new(TestArchiveReader));
        let file = File::new_in_memory(&registry, "/archive.omex", combine_archive());

        assert_eq!(file.file_type(), FileType::UnknownFile);
        assert_eq!(file.issues().len(), 1);
        assert_eq!(file.issues()[0].kind(), IssueKind::Error);
        assert!(!file.has_child_files());
        assert!(file.master_file().is_none());
    }
}
