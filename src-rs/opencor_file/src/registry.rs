use std::{
    fmt,
    sync::{Arc, Weak},
};

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::{ArchiveReader, File, FileRef, HttpClient, path::retrieve_file_info};

/// The index of live files, keyed by identity.
///
/// The registry guarantees that at most one live [`File`] exists per
/// identity: [`File::open`] returns the registered file when there is one.
/// It does not own files (it only keeps weak references), so a file is
/// dropped as soon as its last [`FileRef`] is, and its entry disappears from
/// the registry at the next access.
///
/// The registry also carries the collaborators used to retrieve remote files
/// and to expand archives. It is a cheap handle: clones share the same index.
#[derive(Clone)]
pub struct FileRegistry {
    shared: Arc<Shared>,
}

struct Shared {
    files: Mutex<IndexMap<String, Weak<File>>>,
    http: Arc<dyn HttpClient>,
    archive: Arc<dyn ArchiveReader>,
}

impl FileRegistry {
    /// Creates an empty registry using the given collaborators
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>, archive: Arc<dyn ArchiveReader>) -> Self {
        Self {
            shared: Arc::new(Shared {
                files: Mutex::new(IndexMap::new()),
                http,
                archive,
            }),
        }
    }

    pub(crate) fn http(&self) -> &dyn HttpClient {
        self.shared.http.as_ref()
    }

    pub(crate) fn archive(&self) -> &dyn ArchiveReader {
        self.shared.archive.as_ref()
    }

    /// Runs `f` on the index after dropping the entries of dead files.
    fn with_files<T>(&self, f: impl FnOnce(&mut IndexMap<String, Weak<File>>) -> T) -> T {
        let mut files = self.shared.files.lock();

        files.retain(|_, file| file.strong_count() > 0);

        f(&mut files)
    }

    /// Registers `file` unless the registry already knows a live file with
    /// the same identity. Returns the registered file.
    pub(crate) fn register(&self, file: FileRef) -> FileRef {
        self.with_files(|files| {
            if let Some(existing) = files.get(file.path()).and_then(Weak::upgrade) {
                return existing;
            }

            files.insert(file.path().to_string(), Arc::downgrade(&file));

            file
        })
    }

    /// Starts managing a file.
    ///
    /// Returns `false` if the file is already managed, or if another live
    /// file with the same identity is.
    pub fn manage(&self, file: &FileRef) -> bool {
        self.with_files(|files| {
            if files.contains_key(file.path()) {
                return false;
            }

            tracing::debug!(path = file.path(), "managing file");

            files.insert(file.path().to_string(), Arc::downgrade(file));

            true
        })
    }

    /// Stops managing a file.
    ///
    /// Returns `false` if the file is not managed. The file itself is not
    /// affected.
    pub fn unmanage(&self, file: &FileRef) -> bool {
        self.with_files(|files| {
            let is_managed = files
                .get(file.path())
                .is_some_and(|managed| Weak::ptr_eq(managed, &Arc::downgrade(file)));

            if is_managed {
                tracing::debug!(path = file.path(), "unmanaging file");

                files.shift_remove(file.path());
            }

            is_managed
        })
    }

    /// Stops managing every file
    pub fn reset(&self) {
        self.shared.files.lock().clear();
    }

    /// Returns whether any live file is managed
    #[must_use]
    pub fn has_files(&self) -> bool {
        self.file_count() != 0
    }

    /// Returns the number of live managed files
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.with_files(|files| files.len())
    }

    /// Returns the live managed files, in the order they were managed
    #[must_use]
    pub fn files(&self) -> Vec<FileRef> {
        self.with_files(|files| files.values().filter_map(Weak::upgrade).collect())
    }

    /// Returns the managed file with the given identity.
    ///
    /// The file name or URL goes through the same normalisation as
    /// [`File::open`], so any spelling of the identity finds the file.
    #[must_use]
    pub fn file(&self, file_name_or_url: &str) -> Option<FileRef> {
        let info = retrieve_file_info(file_name_or_url);

        self.with_files(|files| files.get(&info.path).and_then(Weak::upgrade))
    }

    /// Returns the managed file at the given index
    #[must_use]
    pub fn file_at(&self, index: usize) -> Option<FileRef> {
        self.with_files(|files| files.get_index(index).and_then(|(_, file)| file.upgrade()))
    }
}

impl fmt::Debug for FileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let files: Vec<String> = self.with_files(|files| files.keys().cloned().collect());

        f.debug_struct("FileRegistry").field("files", &files).finish_non_exhaustive()
    }
}
