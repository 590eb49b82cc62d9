//! Where downloaded files end up.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ExportError;

/// Receives a finished file, e.g. by offering it to the user for download.
pub trait FileSink: Send + Sync {
    /// Store `contents` under `filename` and return where it went.
    fn deliver(&self, filename: &str, contents: &[u8]) -> Result<PathBuf, ExportError>;
}

/// Writes files into a local directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSink for DirectorySink {
    fn deliver(&self, filename: &str, contents: &[u8]) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        fs::write(&path, contents)?;
        tracing::info!(path = %path.display(), bytes = contents.len(), "file written");
        Ok(path)
    }
}
