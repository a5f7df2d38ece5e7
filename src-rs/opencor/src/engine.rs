//! Construction of the engine collaborators

use std::{sync::Arc, time::Duration};

use opencor_file::{ArchiveReader, File, FileRef, FileRegistry, HttpClient, HttpError, ReqwestClient, ZipArchiveReader};
use opencor_model::{CellmlAnalyser, EvaluationMode};
use opencor_sed::{Instance, SedDocument};

/// Settings of an [`Engine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long a remote file may take to download
    pub http_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            http_timeout: ReqwestClient::DEFAULT_TIMEOUT,
        }
    }
}

/// The file registry and model analyser shared by every command.
pub struct Engine {
    registry: FileRegistry,
    analyser: CellmlAnalyser,
}

impl Engine {
    /// Creates an engine that downloads remote files with `reqwest` and
    /// reads ZIP archives.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    pub fn new(config: EngineConfig) -> Result<Self, HttpError> {
        let http = ReqwestClient::new(config.http_timeout)?;

        Ok(Self::with_collaborators(Arc::new(http), Arc::new(ZipArchiveReader)))
    }

    #[must_use]
    pub fn with_collaborators(http: Arc<dyn HttpClient>, archive: Arc<dyn ArchiveReader>) -> Self {
        Self {
            registry: FileRegistry::new(http, archive),
            analyser: CellmlAnalyser::new(),
        }
    }

    #[must_use]
    pub fn open(&self, file_name_or_url: &str) -> FileRef {
        File::open(&self.registry, file_name_or_url)
    }

    #[must_use]
    pub fn document(&self, file: &FileRef) -> SedDocument {
        SedDocument::new(Some(file), &self.registry, &self.analyser)
    }

    #[must_use]
    pub fn instantiate(&self, document: &SedDocument, mode: EvaluationMode) -> Instance {
        document.instantiate(&self.analyser, mode)
    }

    /// Forgets every file so that the next [`Engine::open`] retrieves them
    /// again.
    pub fn forget_files(&self) {
        self.registry.reset();
    }
}
