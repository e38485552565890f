//! Rewriting result collections on disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

/// Owns one output file and replaces its whole content on every write.
#[derive(Debug, Clone)]
pub struct ResultWriter {
    path: PathBuf,
}

impl ResultWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with `entries` as a pretty-printed JSON array.
    ///
    /// The array is written to a temporary file in the same directory and
    /// renamed over the target, so readers only ever see a complete array.
    pub fn write_all<T: Serialize>(&self, entries: &[T]) -> Result<()> {
        let data = serde_json::to_vec_pretty(entries)?;
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let io_err = |source| Error::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = NamedTempFile::new_in(dir).map_err(io_err)?;
        file.write_all(&data).map_err(io_err)?;
        file.as_file().sync_all().map_err(io_err)?;
        file.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}
