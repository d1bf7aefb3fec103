//! Read-before-write guard.
//!
//! An existing file may only be overwritten or edited once this session has
//! read it, or created it with a prior write. New files are always allowed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Write refused because the file was never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "cannot write to an existing file that hasn't been read first. Use read_file to inspect the current contents before overwriting or editing."
)]
pub struct WriteBlocked {
    pub path: PathBuf,
}

/// Paths read and written during one session.
#[derive(Debug, Clone, Default)]
pub struct FileAccessTracker {
    read_paths: HashSet<PathBuf>,
    written_paths: HashSet<PathBuf>,
}

impl FileAccessTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&mut self, path: &Path) {
        self.read_paths.insert(normalize_path_key(path));
    }

    pub fn record_write(&mut self, path: &Path) {
        self.written_paths.insert(normalize_path_key(path));
    }

    #[must_use]
    pub fn was_read(&self, path: &Path) -> bool {
        self.read_paths.contains(&normalize_path_key(path))
    }

    #[must_use]
    pub fn was_written(&self, path: &Path) -> bool {
        self.written_paths.contains(&normalize_path_key(path))
    }

    /// Allow the write unless `path` exists and this session neither read
    /// nor wrote it.
    pub fn check_write_allowed(&self, path: &Path, exists: bool) -> Result<(), WriteBlocked> {
        if !exists {
            return Ok(());
        }
        let key = normalize_path_key(path);
        if self.read_paths.contains(&key) || self.written_paths.contains(&key) {
            return Ok(());
        }
        tracing::warn!(path = %path.display(), "write blocked: file not read first");
        Err(WriteBlocked {
            path: path.to_path_buf(),
        })
    }

    pub fn reset(&mut self) {
        self.read_paths.clear();
        self.written_paths.clear();
    }
}

/// Normalize a path for use as a set key.
///
/// Windows paths are case-insensitive, so keys are lowercased there.
#[cfg(windows)]
pub(crate) fn normalize_path_key(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().to_lowercase())
}

#[cfg(not(windows))]
pub(crate) fn normalize_path_key(path: &Path) -> PathBuf {
    path.to_path_buf()
}
