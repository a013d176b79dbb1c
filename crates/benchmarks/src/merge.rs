//! Result store merger.
//!
//! Scans every framework directory, selects its authoritative snapshot,
//! rewrites the framework's latest pointer and writes the consolidated index.
//!
//! Failures are local: a framework whose snapshot cannot be read, parsed or
//! validated is logged and left out of this run's index while the others are
//! merged. Only a failure to list the store or to write the index aborts the
//! run.

use crate::io::{self, IoError};
use crate::layout::ResultsLayout;
use crate::store::{select_latest, snapshot_files, SnapshotStore, StoreError};
use benchhub_core::{FrameworkId, Index, IndexEntry, SnapshotError, VersionPolicy};
use chrono::{DateTime, Utc};
use metrics::counter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// Why a single framework was left out of a merge.
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// Directory name is not a valid framework id
    #[error("Directory name is not a valid framework id: {0}")]
    InvalidDirectory(#[source] SnapshotError),

    /// Listing the framework directory failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reading, parsing or writing a file failed
    #[error(transparent)]
    Io(#[from] IoError),

    /// Snapshot belongs to a different framework than its directory
    #[error("Snapshot {path} has framework_id '{found}', expected '{expected}'")]
    IdMismatch {
        /// File or directory involved
        path: PathBuf,
        /// Name of the framework directory
        expected: String,
        /// `framework_id` inside the snapshot
        found: String,
    },

    /// Snapshot metrics break an invariant
    #[error("Snapshot {path} is invalid: {source}")]
    Invalid {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: SnapshotError,
    },

    /// Snapshot was written for another contract version
    #[error("Snapshot {path} has contract version {found}, expected {expected}")]
    VersionMismatch {
        /// File or directory involved
        path: PathBuf,
        /// Current contract version
        expected: u32,
        /// Version the snapshot declares
        found: u32,
    },
}

/// Merge settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOptions {
    /// Version stamped into the index
    pub contract_version: u32,
    /// Handling of snapshots written for another version
    pub version_policy: VersionPolicy,
}

impl MergeOptions {
    /// Options for a contract version with the default policy.
    pub fn new(contract_version: u32) -> Self {
        Self {
            contract_version,
            version_policy: VersionPolicy::default(),
        }
    }

    /// Set the version policy.
    pub fn with_version_policy(mut self, policy: VersionPolicy) -> Self {
        self.version_policy = policy;
        self
    }
}

/// Outcome of a merge run.
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// Where the index was written
    pub index_path: PathBuf,
    /// Whether the frameworks directory had to be created
    pub created_root: bool,
    /// The index that was written
    pub index: Index,
    /// Ids whose latest pointer was updated
    pub updated: Vec<String>,
    /// Directories without any snapshot file
    pub skipped: Vec<String>,
    /// Directories left out because of an error, with the error message
    pub failed: Vec<(String, String)>,
}

impl MergeReport {
    /// True when every framework with snapshots was merged.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Consolidates a result store into latest pointers and an index.
#[derive(Debug, Clone)]
pub struct Merger {
    store: SnapshotStore,
    options: MergeOptions,
}

impl Merger {
    /// Create a merger over a results directory layout.
    pub fn new(layout: ResultsLayout, options: MergeOptions) -> Self {
        Self {
            store: SnapshotStore::new(layout),
            options,
        }
    }

    /// Run a merge stamped with the current time.
    pub fn run(&self) -> Result<MergeReport, StoreError> {
        self.run_at(Utc::now())
    }

    /// Run a merge with an explicit `generated_at`.
    pub fn run_at(&self, generated_at: DateTime<Utc>) -> Result<MergeReport, StoreError> {
        let layout = self.store.layout();

        let created_root = self.store.ensure_root()?;
        if created_root {
            info!(
                path = %layout.frameworks_dir().display(),
                "No frameworks directory found, created an empty one"
            );
        }

        let mut entries = Vec::new();
        let mut updated = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();

        for (name, dir) in self.store.framework_dirs()? {
            match self.merge_framework(&name, &dir) {
                Ok(Some(entry)) => {
                    counter!("benchhub_merge_frameworks_total", "outcome" => "updated").increment(1);
                    updated.push(name);
                    entries.push(entry);
                }
                Ok(None) => {
                    counter!("benchhub_merge_frameworks_total", "outcome" => "skipped").increment(1);
                    info!(framework_id = %name, "No result files found, skipping");
                    skipped.push(name);
                }
                Err(e) => {
                    counter!("benchhub_merge_frameworks_total", "outcome" => "failed").increment(1);
                    error!(framework_id = %name, error = %e, "Failed to merge framework");
                    failed.push((name, e.to_string()));
                }
            }
        }

        let index = Index::new(generated_at, self.options.contract_version, entries);
        let index_path = layout.index_path();
        io::write_json_atomic(&index, &index_path)?;

        info!(
            frameworks = index.frameworks.len(),
            updated = ?updated,
            skipped = ?skipped,
            failed = failed.len(),
            path = %index_path.display(),
            "Index generated"
        );

        Ok(MergeReport {
            index_path,
            created_root,
            index,
            updated,
            skipped,
            failed,
        })
    }

    /// Merge one framework directory.
    ///
    /// Returns `Ok(None)` when the directory holds no snapshot file.
    fn merge_framework(&self, name: &str, dir: &Path) -> Result<Option<IndexEntry>, FrameworkError> {
        let id = FrameworkId::parse(name).map_err(FrameworkError::InvalidDirectory)?;

        let files = snapshot_files(dir)?;
        let Some(file) = select_latest(&files) else {
            return Ok(None);
        };

        let snapshot = io::read_snapshot(&file.path)?;

        if snapshot.framework_id != id {
            return Err(FrameworkError::IdMismatch {
                path: file.path.clone(),
                expected: id.to_string(),
                found: snapshot.framework_id.to_string(),
            });
        }

        snapshot.validate().map_err(|source| FrameworkError::Invalid {
            path: file.path.clone(),
            source,
        })?;

        let expected = self.options.contract_version;
        if snapshot.contract_version != expected {
            match self.options.version_policy {
                VersionPolicy::Ignore => {}
                VersionPolicy::Warn => warn!(
                    framework_id = %id,
                    found = snapshot.contract_version,
                    expected,
                    "Contract version mismatch"
                ),
                VersionPolicy::Reject => {
                    return Err(FrameworkError::VersionMismatch {
                        path: file.path.clone(),
                        expected,
                        found: snapshot.contract_version,
                    })
                }
            }
        }

        let layout = self.store.layout();
        io::write_json_atomic(&snapshot, layout.latest_path(&id))?;
        info!(framework_id = %id, file = %file.file_name, "Updated latest.json");

        Ok(Some(IndexEntry::from_snapshot(
            &snapshot,
            layout.latest_reference(&id),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::snapshot;
    use std::fs;

    fn write_snapshot(root: &Path, id: &str, file: &str, measured_at: &str, rps: f64) {
        let dir = root.join("frameworks").join(id);
        fs::create_dir_all(&dir).unwrap();
        let json = serde_json::to_string_pretty(&snapshot(id, measured_at, rps)).unwrap();
        fs::write(dir.join(file), json).unwrap();
    }

    #[test]
    fn test_missing_root_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        let report = Merger::new(ResultsLayout::new(&results), MergeOptions::new(1))
            .run()
            .unwrap();

        assert!(report.created_root);
        assert!(report.index.is_empty());
        assert!(results.join("frameworks").is_dir());
        assert!(results.join("index.json").is_file());
    }

    #[test]
    fn test_empty_framework_dir_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        fs::create_dir_all(results.join("frameworks/express")).unwrap();
        write_snapshot(&results, "fiber", "2024-01-01T00-00-00.json", "2024-01-01T00:00:00Z", 10.0);

        let report = Merger::new(ResultsLayout::new(&results), MergeOptions::new(1))
            .run()
            .unwrap();

        assert_eq!(report.updated, vec!["fiber"]);
        assert_eq!(report.skipped, vec!["express"]);
        assert!(report.is_complete());
    }

    #[test]
    fn test_id_mismatch_is_a_framework_failure() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        let other = results.join("frameworks/hono");
        fs::create_dir_all(&other).unwrap();
        let json = serde_json::to_string(&snapshot("elysia", "2024-01-01T00:00:00Z", 1.0)).unwrap();
        fs::write(other.join("2024-01-01T00-00-00.json"), json).unwrap();

        let report = Merger::new(ResultsLayout::new(&results), MergeOptions::new(1))
            .run()
            .unwrap();

        assert!(report.index.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "hono");
        assert!(!other.join("latest.json").exists());
    }

    #[test]
    fn test_invalid_directory_name_is_a_framework_failure() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        fs::create_dir_all(results.join("frameworks/bad name")).unwrap();

        let report = Merger::new(ResultsLayout::new(&results), MergeOptions::new(1))
            .run()
            .unwrap();
        assert_eq!(report.failed[0].0, "bad name");
    }

    #[test]
    fn test_version_policy() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        write_snapshot(&results, "fiber", "2024-01-01T00-00-00.json", "2024-01-01T00:00:00Z", 10.0);
        let layout = ResultsLayout::new(&results);

        let warned = Merger::new(layout.clone(), MergeOptions::new(2)).run().unwrap();
        assert_eq!(warned.index.frameworks.len(), 1);
        assert_eq!(warned.index.contract_version, 2);

        let rejected = Merger::new(
            layout,
            MergeOptions::new(2).with_version_policy(VersionPolicy::Reject),
        )
        .run()
        .unwrap();
        assert!(rejected.index.is_empty());
        assert!(rejected.failed[0].1.contains("contract version 1, expected 2"));
    }
}
