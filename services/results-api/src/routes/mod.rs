pub mod health;
pub mod metrics;
pub mod rankings;
pub mod results;

#[cfg(test)]
pub(crate) mod testing {
    use crate::{app, AppState};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use benchhub_benchmarks::{MergeOptions, Merger, ResultsLayout, SnapshotStore};
    use benchhub_core::Snapshot;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::path::{Path, PathBuf};
    use tower::ServiceExt;

    pub fn snapshot(id: &str, language: &str, rps: f64) -> Snapshot {
        serde_json::from_value(json!({
            "framework_id": id,
            "language": language,
            "framework": id,
            "measured_at": "2024-02-01T00:00:00Z",
            "contract_version": 1,
            "runner_version": "0.3.0",
            "environment": { "os": "ubuntu-22.04", "ci": "github-actions", "oha_version": "1.4.1" },
            "benchmarks": {
                "plaintext": {
                    "duration_seconds": 6.0,
                    "requests_per_sec": rps,
                    "latency_ms": { "p50": 0.4, "p95": 1.1, "p99": 2.0 },
                    "errors": 0
                }
            }
        }))
        .unwrap()
    }

    /// Results directory the routes under test serve from.
    pub fn results_dir(root: &Path) -> PathBuf {
        root.join("bench-data")
    }

    /// A merged results tree holding the given frameworks.
    pub fn published(frameworks: &[(&str, &str, f64)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let layout = ResultsLayout::new(results_dir(dir.path()));
        let store = SnapshotStore::new(layout.clone());
        for (id, language, rps) in frameworks {
            store.append(&snapshot(id, language, *rps)).unwrap();
        }
        Merger::new(layout, MergeOptions::new(1)).run().unwrap();
        dir
    }

    pub fn router(root: &Path) -> Router {
        app(AppState::from_layout(ResultsLayout::new(results_dir(root)), 4))
    }

    pub async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }
}
