//! I/O operations for result files.
//!
//! This module reads and writes the JSON files that make up the result
//! store: snapshots, latest pointers, the index and the contract file.
//! Writes go through a temporary file and a rename so readers never see a
//! half-written file.

use benchhub_core::{ContractFile, Index, Snapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from reading or writing a single result file.
#[derive(Debug, Error)]
pub enum IoError {
    /// File could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// File content is not the expected JSON
    #[error("Failed to parse {path}: {source}")]
    Parse {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// File could not be written
    #[error("Failed to write {path}: {source}")]
    Write {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

/// Read and parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, IoError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| IoError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a value as pretty JSON, replacing the target atomically.
pub fn write_json_atomic<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), IoError> {
    let path = path.as_ref();
    let write_err = |source: io::Error| IoError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut json = serde_json::to_string_pretty(value)
        .map_err(|e| write_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    json.push('\n');

    let tmp = temp_path(path);
    fs::write(&tmp, json).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        write_err(e)
    })
}

/// Read a snapshot file.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Snapshot, IoError> {
    read_json(path)
}

/// Read an index file.
pub fn read_index(path: impl AsRef<Path>) -> Result<Index, IoError> {
    read_json(path)
}

/// Read the contract file.
pub fn read_contract(path: impl AsRef<Path>) -> Result<ContractFile, IoError> {
    read_json(path)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}
