//! Artifact persistence – writes a finished PDF under a unique name in the
//! configured output directory.
//!
//! Bytes are first written to a hidden temporary file in the same directory
//! and then renamed into place without clobbering. A failed or abandoned
//! write therefore never leaves a partial file under a final name.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::error::AssembleError;
use crate::layout_config::LayoutConfig;

/// Process-wide sequence that disambiguates names within one millisecond.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Attempts at finding a free name before giving up.
const MAX_NAME_ATTEMPTS: usize = 16;

/// A persisted PDF.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
    pub byte_len: usize,
    #[serde(skip)]
    pub layout: LayoutConfig,
}

impl Artifact {
    pub const MIME_TYPE: &'static str = "application/pdf";

    pub fn page_count(&self) -> usize {
        self.layout.pages.len()
    }

    /// File name to offer when the artifact is downloaded.
    pub fn suggested_filename(&self) -> &str {
        &self.file_name
    }
}

/// A PDF rendered in memory and not persisted.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub layout: LayoutConfig,
}

impl RenderedDocument {
    pub const MIME_TYPE: &'static str = Artifact::MIME_TYPE;

    pub fn page_count(&self) -> usize {
        self.layout.pages.len()
    }
}

/// Writes artifacts into one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Next candidate name: `pdf-<unix millis>-<sequence>.pdf`.
    pub fn next_file_name(&self) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        format!("pdf-{millis}-{seq}.pdf")
    }

    /// Persist `document` and return the resulting [`Artifact`].
    pub fn persist(&self, document: RenderedDocument) -> Result<Artifact, AssembleError> {
        let path = self.write(&document.bytes)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        log::info!(
            "wrote {} ({} bytes, {} page{})",
            path.display(),
            document.bytes.len(),
            document.page_count(),
            if document.page_count() == 1 { "" } else { "s" }
        );
        Ok(Artifact {
            path,
            file_name,
            byte_len: document.bytes.len(),
            layout: document.layout,
        })
    }

    /// Atomically write `bytes` under a fresh name and return its path.
    pub fn write(&self, bytes: &[u8]) -> Result<PathBuf, AssembleError> {
        let persistence = |path: &Path, source: io::Error| AssembleError::Persistence {
            path: path.to_path_buf(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| persistence(&self.dir, e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".pdf-partial-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|e| persistence(&self.dir, e))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| persistence(tmp.path(), e))?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.dir.join(self.next_file_name());
            match tmp.persist_noclobber(&path) {
                Ok(_) => return Ok(path),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    log::debug!("{} already exists, picking another name", path.display());
                    tmp = err.file;
                }
                Err(err) => return Err(persistence(&path, err.error)),
            }
        }

        Err(persistence(
            &self.dir,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                "could not find a free artifact name",
            ),
        ))
    }
}
