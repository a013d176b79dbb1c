//! Read-only access to published results.
//!
//! Consumers fetch the index, then each framework's latest snapshot through
//! the reference stored in the index. A [`ResultSource`] resolves those
//! references against a local directory or a base URL.

use crate::layout::{ResultsLayout, INDEX_REFERENCE};
use crate::view::ViewModel;
use async_trait::async_trait;
use benchhub_core::{Index, IndexEntry, Snapshot};
use futures::stream::{self, StreamExt};
use serde::de::DeserializeOwned;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Default number of snapshot fetches in flight.
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Errors from fetching results.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reference cannot be resolved safely
    #[error("Invalid reference: {0:?}")]
    InvalidReference(String),

    /// Local read failed
    #[error("Failed to read {reference}: {source}")]
    Io {
        /// Reference being fetched
        reference: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// HTTP request failed or returned a non-success status
    #[error("Request for {reference} failed: {source}")]
    Http {
        /// Reference being fetched
        reference: String,
        /// Underlying error
        #[source]
        source: reqwest::Error,
    },

    /// Body is not the expected JSON
    #[error("Failed to parse {reference}: {source}")]
    Parse {
        /// Reference being fetched
        reference: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot does not belong to the entry that referenced it
    #[error("{reference} holds framework '{found}', expected '{expected}'")]
    IdMismatch {
        /// Reference being fetched
        reference: String,
        /// Id of the index entry
        expected: String,
        /// `framework_id` inside the snapshot
        found: String,
    },
}

/// Somewhere published results can be read from.
#[async_trait]
pub trait ResultSource: Send + Sync {
    /// Where this source reads from, for logs.
    fn describe(&self) -> String;

    /// Reference of the consolidated index.
    fn index_reference(&self) -> String {
        INDEX_REFERENCE.to_string()
    }

    /// Read the raw bytes behind a relative reference.
    async fn read(&self, reference: &str) -> Result<Vec<u8>, SourceError>;
}

/// Results on the local filesystem, rooted at the public directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
    index_reference: String,
}

impl FsSource {
    /// Source rooted at `root`; the index is `root/results/index.json`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_reference: INDEX_REFERENCE.to_string(),
        }
    }

    /// Source over the store a merger wrote to `layout`, whatever the
    /// results directory is called.
    pub fn from_layout(layout: &ResultsLayout) -> Self {
        Self {
            root: layout.public_root(),
            index_reference: layout.index_reference(),
        }
    }

    /// Resolve a reference, refusing anything that could leave the root.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(reference);
        let safe = !reference.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(SourceError::InvalidReference(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ResultSource for FsSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn index_reference(&self) -> String {
        self.index_reference.clone()
    }

    async fn read(&self, reference: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.resolve(reference)?;
        tokio::fs::read(&path).await.map_err(|source| SourceError::Io {
            reference: reference.to_string(),
            source,
        })
    }
}

/// Results published over HTTP, e.g. the static dashboard site.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    base: reqwest::Url,
}

impl HttpSource {
    /// Source rooted at `base`, which may or may not end in `/`.
    pub fn new(base: &str) -> Result<Self, SourceError> {
        let with_slash = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = reqwest::Url::parse(&with_slash)
            .map_err(|_| SourceError::InvalidReference(base.to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base,
        })
    }

    /// Absolute URL of a reference.
    pub fn url_for(&self, reference: &str) -> Result<reqwest::Url, SourceError> {
        let reference = reference.trim_start_matches("./");
        let escapes = reference.split('/').any(|segment| segment == "..");
        if reference.is_empty()
            || reference.starts_with('/')
            || reference.contains("://")
            || escapes
        {
            return Err(SourceError::InvalidReference(reference.to_string()));
        }
        self.base
            .join(reference)
            .map_err(|_| SourceError::InvalidReference(reference.to_string()))
    }
}

#[async_trait]
impl ResultSource for HttpSource {
    fn describe(&self) -> String {
        self.base.to_string()
    }

    async fn read(&self, reference: &str) -> Result<Vec<u8>, SourceError> {
        let url = self.url_for(reference)?;
        let http_err = |source| SourceError::Http {
            reference: reference.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?;
        let body = response.bytes().await.map_err(http_err)?;
        Ok(body.to_vec())
    }
}

async fn fetch_json<T: DeserializeOwned>(
    source: &dyn ResultSource,
    reference: &str,
) -> Result<T, SourceError> {
    let bytes = source.read(reference).await?;
    serde_json::from_slice(&bytes).map_err(|source| SourceError::Parse {
        reference: reference.to_string(),
        source,
    })
}

/// Fetch the consolidated index.
pub async fn fetch_index(source: &dyn ResultSource) -> Result<Index, SourceError> {
    fetch_json(source, &source.index_reference()).await
}

/// Fetch the latest snapshot an index entry points at.
pub async fn fetch_snapshot(
    source: &dyn ResultSource,
    entry: &IndexEntry,
) -> Result<Snapshot, SourceError> {
    let snapshot: Snapshot = fetch_json(source, &entry.latest).await?;
    if snapshot.framework_id != entry.id {
        return Err(SourceError::IdMismatch {
            reference: entry.latest.clone(),
            expected: entry.id.to_string(),
            found: snapshot.framework_id.to_string(),
        });
    }
    Ok(snapshot)
}

/// Fetch the index and then the latest snapshot of one framework.
///
/// Returns `Ok(None)` when the index does not list the framework.
pub async fn fetch_framework(
    source: &dyn ResultSource,
    id: &str,
) -> Result<Option<Snapshot>, SourceError> {
    let index = fetch_index(source).await?;
    match index.entry(id) {
        Some(entry) => fetch_snapshot(source, entry).await.map(Some),
        None => Ok(None),
    }
}

/// Load everything a ranking view needs.
///
/// Snapshots are fetched with at most `concurrency` requests in flight and
/// kept in index order. A snapshot that fails to load is logged and left
/// out; it does not affect the others. Only a failed index fetch is an
/// error.
pub async fn load_view_model(
    source: &dyn ResultSource,
    concurrency: usize,
) -> Result<ViewModel, SourceError> {
    let index = fetch_index(source).await?;
    debug!(
        source = %source.describe(),
        frameworks = index.frameworks.len(),
        "Fetched index"
    );

    let snapshots: Vec<Snapshot> = stream::iter(index.frameworks.iter().cloned())
        .map(move |entry| async move {
            match fetch_snapshot(source, &entry).await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    warn!(framework_id = %entry.id, error = %e, "Omitting framework");
                    None
                }
            }
        })
        .buffered(concurrency.max(1))
        .filter_map(futures::future::ready)
        .collect()
        .await;

    Ok(ViewModel::new(&index, snapshots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::{MergeOptions, Merger};
    use crate::store::{tests::snapshot, SnapshotStore};
    use std::fs;

    fn published(ids: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let layout = ResultsLayout::new(dir.path().join("results"));
        let store = SnapshotStore::new(layout.clone());
        for (i, id) in ids.iter().enumerate() {
            store
                .append(&snapshot(id, "2024-02-01T00:00:00Z", 1000.0 * (i + 1) as f64))
                .unwrap();
        }
        Merger::new(layout, MergeOptions::new(1)).run().unwrap();
        dir
    }

    #[test]
    fn test_fs_source_rejects_escaping_references() {
        let source = FsSource::new("/srv/site");
        assert!(source.resolve("results/index.json").is_ok());
        assert!(source.resolve("./results/index.json").is_ok());
        assert!(source.resolve("../secret.json").is_err());
        assert!(source.resolve("/etc/passwd").is_err());
        assert!(source.resolve("").is_err());
    }

    #[test]
    fn test_http_source_joins_references() {
        let source = HttpSource::new("https://example.org/awesome-bench").unwrap();
        assert_eq!(
            source.url_for("results/index.json").unwrap().as_str(),
            "https://example.org/awesome-bench/results/index.json"
        );
        assert_eq!(
            source.url_for("./results/frameworks/hono/latest.json").unwrap().as_str(),
            "https://example.org/awesome-bench/results/frameworks/hono/latest.json"
        );
        assert!(source.url_for("https://evil.example/x.json").is_err());
        assert!(source.url_for("../other-site/results/index.json").is_err());
        assert!(source.url_for("results/../../index.json").is_err());
        assert!(source.url_for("").is_err());
        assert!(HttpSource::new("not a url").is_err());
    }

    /// Answer a single HTTP request with a fixed response; returns the base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 2048];
            let _ = stream.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        });
        format!("http://{addr}/site")
    }

    #[tokio::test]
    async fn test_http_source_reads_body() {
        let source = HttpSource::new(&serve_once("200 OK", "{\"ok\":true}").await).unwrap();
        let body = source.read("results/index.json").await.unwrap();
        assert_eq!(body, b"{\"ok\":true}".to_vec());
    }

    #[tokio::test]
    async fn test_http_source_error_status() {
        let source = HttpSource::new(&serve_once("404 Not Found", "").await).unwrap();
        let err = fetch_index(&source).await.unwrap_err();
        match err {
            SourceError::Http { reference, source } => {
                assert_eq!(reference, "results/index.json");
                assert_eq!(source.status(), Some(reqwest::StatusCode::NOT_FOUND));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_load_view_model_future_is_send() {
        let source = FsSource::new("/srv/site");
        assert_send(load_view_model(&source, 4));
        assert_send(fetch_framework(&source, "hono"));
    }

    #[tokio::test]
    async fn test_source_follows_results_dir_name() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ResultsLayout::new(dir.path().join("bench-data"));
        SnapshotStore::new(layout.clone())
            .append(&snapshot("hono", "2024-02-01T00:00:00Z", 1000.0))
            .unwrap();
        Merger::new(layout.clone(), MergeOptions::new(1)).run().unwrap();

        let source = FsSource::from_layout(&layout);
        assert_eq!(source.index_reference(), "bench-data/index.json");
        let model = load_view_model(&source, 2).await.unwrap();
        assert_eq!(model.rows().len(), 1);
        assert_eq!(model.rows()[0].id.as_str(), "hono");
    }

    #[tokio::test]
    async fn test_load_view_model_from_fs() {
        let dir = published(&["hono", "elysia", "bun-http"]);
        let source = FsSource::new(dir.path());

        let model = tokio_test::assert_ok!(load_view_model(&source, 2).await);
        let ids: Vec<&str> = model.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["bun-http", "elysia", "hono"]);
        assert_eq!(model.meta().unwrap().contract_version, 1);
    }

    #[tokio::test]
    async fn test_failed_snapshot_is_omitted() {
        let dir = published(&["hono", "elysia"]);
        fs::write(
            dir.path().join("results/frameworks/hono/latest.json"),
            "{ not json",
        )
        .unwrap();

        let model = load_view_model(&FsSource::new(dir.path()), 4).await.unwrap();
        let ids: Vec<&str> = model.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["elysia"]);
    }

    #[tokio::test]
    async fn test_missing_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_view_model(&FsSource::new(dir.path()), 4).await.unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }

    #[test]
    fn test_fetch_framework() {
        let dir = published(&["fiber"]);
        let source = FsSource::new(dir.path());

        tokio_test::block_on(async {
            let found = fetch_framework(&source, "fiber").await.unwrap().unwrap();
            assert_eq!(found.framework_id.as_str(), "fiber");
            assert!(fetch_framework(&source, "express").await.unwrap().is_none());
        });
    }
}
