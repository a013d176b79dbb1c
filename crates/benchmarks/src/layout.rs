//! On-disk layout of the result store.
//!
//! ```text
//! <public>/
//!   results/
//!     index.json
//!     frameworks/
//!       <framework-id>/
//!         2024-01-01T00-00-00.json
//!         2024-02-01T00-00-00.json
//!         latest.json
//! ```
//!
//! Index entries reference latest pointers relative to `<public>`, which is
//! how the dashboard and the HTTP API resolve them. The first segment of a
//! reference is the results directory's own name, so a store kept in
//! `/srv/bench-data` is referenced as `bench-data/...`.

use benchhub_core::FrameworkId;
use std::path::{Path, PathBuf};

/// Conventional name of the results directory under the public root.
pub const RESULTS_PREFIX: &str = "results";

/// Name of the per-framework directory container.
pub const FRAMEWORKS_DIR: &str = "frameworks";

/// File name of the latest pointer inside a framework directory.
pub const LATEST_FILE: &str = "latest.json";

/// File name of the consolidated index.
pub const INDEX_FILE: &str = "index.json";

/// Reference of the index under the conventional results directory.
pub const INDEX_REFERENCE: &str = "results/index.json";

/// Paths of a result store rooted at a results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsLayout {
    results_dir: PathBuf,
}

impl ResultsLayout {
    /// Layout rooted at `results_dir` (usually `site/public/results`).
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
        }
    }

    /// The results directory.
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Directory that references are resolved against.
    pub fn public_root(&self) -> PathBuf {
        match self.results_dir.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Directory holding one subdirectory per framework.
    pub fn frameworks_dir(&self) -> PathBuf {
        self.results_dir.join(FRAMEWORKS_DIR)
    }

    /// Directory of one framework.
    pub fn framework_dir(&self, id: &FrameworkId) -> PathBuf {
        self.frameworks_dir().join(id.as_str())
    }

    /// Latest pointer file of one framework.
    pub fn latest_path(&self, id: &FrameworkId) -> PathBuf {
        self.framework_dir(id).join(LATEST_FILE)
    }

    /// Consolidated index file.
    pub fn index_path(&self) -> PathBuf {
        self.results_dir.join(INDEX_FILE)
    }

    /// First segment of every reference: the results directory's name.
    ///
    /// Falls back to `results` for paths without a final name, such as `.`.
    pub fn results_prefix(&self) -> String {
        match self.results_dir.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => RESULTS_PREFIX.to_string(),
        }
    }

    /// Reference to the index relative to [`Self::public_root`].
    pub fn index_reference(&self) -> String {
        format!("{}/{INDEX_FILE}", self.results_prefix())
    }

    /// Reference to a latest pointer as written into the index.
    pub fn latest_reference(&self, id: &FrameworkId) -> String {
        format!("{}/{FRAMEWORKS_DIR}/{id}/{LATEST_FILE}", self.results_prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = ResultsLayout::new("site/public/results");
        let id = FrameworkId::parse("bun-http").unwrap();

        assert_eq!(layout.public_root(), PathBuf::from("site/public"));
        assert_eq!(
            layout.latest_path(&id),
            PathBuf::from("site/public/results/frameworks/bun-http/latest.json")
        );
        assert_eq!(layout.index_path(), PathBuf::from("site/public/results/index.json"));
        assert_eq!(
            layout.latest_reference(&id),
            "results/frameworks/bun-http/latest.json"
        );
        assert_eq!(layout.index_reference(), INDEX_REFERENCE);
        assert_eq!(layout.public_root().join(INDEX_REFERENCE), layout.index_path());
    }

    #[test]
    fn test_references_follow_directory_name() {
        let layout = ResultsLayout::new("/srv/bench-data");
        let id = FrameworkId::parse("hono").unwrap();

        assert_eq!(layout.index_reference(), "bench-data/index.json");
        assert_eq!(
            layout.latest_reference(&id),
            "bench-data/frameworks/hono/latest.json"
        );
        assert_eq!(layout.public_root().join(layout.index_reference()), layout.index_path());
        assert_eq!(
            layout.public_root().join(layout.latest_reference(&id)),
            layout.latest_path(&id)
        );
    }

    #[test]
    fn test_public_root_of_bare_dir() {
        assert_eq!(ResultsLayout::new("results").public_root(), PathBuf::from("."));
    }
}
