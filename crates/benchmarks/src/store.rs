//! Append-only snapshot store.
//!
//! Snapshots are stored immutably, one file per (framework id, timestamp).
//! The authoritative snapshot of a framework is a pure query over the files
//! on disk: the one whose file name sorts last. Timestamp-derived names
//! (`2024-02-01T00-00-00.json`) make that the newest measurement.

use crate::io::{self, IoError};
use crate::layout::{ResultsLayout, LATEST_FILE};
use benchhub_core::{FrameworkId, Snapshot, SnapshotError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a result file failed
    #[error(transparent)]
    Io(#[from] IoError),

    /// Directory operation failed
    #[error("Filesystem error at {path}: {source}")]
    Filesystem {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Snapshot content is invalid
    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    /// A snapshot with the same timestamp is already stored
    #[error("Snapshot already exists: {0}")]
    AlreadyExists(PathBuf),
}

impl StoreError {
    pub(crate) fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// A snapshot file found in a framework directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFile {
    /// File name, e.g. `2024-02-01T00-00-00.json`
    pub file_name: String,
    /// Full path
    pub path: PathBuf,
}

/// Pick the authoritative file: the one whose name sorts last.
///
/// The result does not depend on the order of `files`.
pub fn select_latest(files: &[SnapshotFile]) -> Option<&SnapshotFile> {
    files.iter().max_by(|a, b| a.file_name.cmp(&b.file_name))
}

/// List snapshot files in a framework directory, sorted by name.
///
/// The latest pointer, hidden files, non-JSON files and subdirectories are
/// ignored.
pub fn snapshot_files(dir: &Path) -> Result<Vec<SnapshotFile>, StoreError> {
    let entries = fs::read_dir(dir).map_err(|e| StoreError::filesystem(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::filesystem(dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| StoreError::filesystem(entry.path(), e))?
            .is_file();
        let Ok(file_name) = entry.file_name().into_string() else {
            debug!(path = %entry.path().display(), "Ignoring non UTF-8 file name");
            continue;
        };

        if is_file
            && file_name.ends_with(".json")
            && file_name != LATEST_FILE
            && !file_name.starts_with('.')
        {
            files.push(SnapshotFile {
                file_name,
                path: entry.path(),
            });
        }
    }

    files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(files)
}

/// Filesystem-backed snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    layout: ResultsLayout,
}

impl SnapshotStore {
    /// Open a store over the given layout. Nothing is touched on disk.
    pub fn new(layout: ResultsLayout) -> Self {
        Self { layout }
    }

    /// The store layout.
    pub fn layout(&self) -> &ResultsLayout {
        &self.layout
    }

    /// Create the frameworks directory if it is missing.
    ///
    /// Returns `true` when the directory had to be created.
    pub fn ensure_root(&self) -> Result<bool, StoreError> {
        let dir = self.layout.frameworks_dir();
        if dir.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(&dir).map_err(|e| StoreError::filesystem(&dir, e))?;
        Ok(true)
    }

    /// Framework directories as `(directory name, path)`, sorted by name.
    ///
    /// Directory names are returned unvalidated; callers decide what to do
    /// with names that are not valid framework ids.
    pub fn framework_dirs(&self) -> Result<Vec<(String, PathBuf)>, StoreError> {
        let root = self.layout.frameworks_dir();
        let entries = fs::read_dir(&root).map_err(|e| StoreError::filesystem(&root, e))?;

        let mut dirs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::filesystem(&root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => dirs.push((name, path)),
                Err(name) => warn!(?name, "Ignoring framework directory with non UTF-8 name"),
            }
        }

        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs)
    }

    /// Snapshot files of one framework, oldest first.
    ///
    /// A framework without a directory has no snapshots.
    pub fn files(&self, id: &FrameworkId) -> Result<Vec<SnapshotFile>, StoreError> {
        let dir = self.layout.framework_dir(id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        snapshot_files(&dir)
    }

    /// The authoritative snapshot of a framework, if any.
    pub fn latest(&self, id: &FrameworkId) -> Result<Option<Snapshot>, StoreError> {
        let files = self.files(id)?;
        match select_latest(&files) {
            Some(file) => Ok(Some(io::read_snapshot(&file.path)?)),
            None => Ok(None),
        }
    }

    /// All readable snapshots of a framework, newest first.
    ///
    /// Unreadable files are logged and left out.
    pub fn history(&self, id: &FrameworkId) -> Result<Vec<Snapshot>, StoreError> {
        let files = self.files(id)?;
        let mut history = Vec::with_capacity(files.len());
        for file in files.iter().rev() {
            match io::read_snapshot(&file.path) {
                Ok(snapshot) => history.push(snapshot),
                Err(e) => warn!(framework_id = %id, error = %e, "Skipping unreadable snapshot"),
            }
        }
        Ok(history)
    }

    /// Add a snapshot to the store under its own framework id.
    ///
    /// The snapshot is validated first. Existing files are never replaced.
    pub fn append(&self, snapshot: &Snapshot) -> Result<PathBuf, StoreError> {
        snapshot.validate()?;

        let dir = self.layout.framework_dir(&snapshot.framework_id);
        fs::create_dir_all(&dir).map_err(|e| StoreError::filesystem(&dir, e))?;

        let path = dir.join(snapshot.file_name());
        if path.exists() {
            return Err(StoreError::AlreadyExists(path));
        }

        // Write aside, then hard-link into place: linking fails instead of
        // clobbering when a concurrent writer got there first.
        let tmp = dir.join(format!(".{}.{}.tmp", snapshot.file_name(), std::process::id()));
        io::write_json_atomic(snapshot, &tmp)?;
        let linked = fs::hard_link(&tmp, &path);
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => Ok(path),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(path))
            }
            Err(e) => Err(StoreError::filesystem(&path, e)),
        }
    }
}
