//! The published files, served as stored.

use ::metrics::counter;
use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use benchhub_benchmarks::{ResultSource, ResultsLayout};
use benchhub_core::FrameworkId;
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::models::AppState;

/// Routes mirroring the on-disk tree, e.g. `/results/index.json`.
pub fn routes(layout: &ResultsLayout) -> Router<Arc<AppState>> {
    let prefix = layout.results_prefix();
    Router::new()
        .route(&format!("/{prefix}/index.json"), get(index))
        .route(&format!("/{prefix}/frameworks/:id/latest.json"), get(latest))
}

async fn index(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    counter!("benchhub_api_requests_total", "route" => "index").increment(1);
    let reference = state.layout.index_reference();
    let body = state.source.read(&reference).await.map_err(|e| {
        let err = ApiError::from(e);
        if err.code == "not_found" {
            ApiError::not_found("No benchmark results available yet.").with_code("no_results")
        } else {
            err
        }
    })?;
    Ok(json_body(body))
}

async fn latest(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    counter!("benchhub_api_requests_total", "route" => "latest").increment(1);
    let id = FrameworkId::parse(id)
        .map_err(|e| ApiError::bad_request("invalid_framework_id", e.to_string()))?;

    let reference = state.layout.latest_reference(&id);
    debug!(framework_id = %id, reference = %reference, "Serving latest snapshot");
    let body = state.source.read(&reference).await?;
    Ok(json_body(body))
}

fn json_body(body: Vec<u8>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], body)
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::{get, published, router};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_index_is_served_verbatim() {
        let dir = published(&[("hono", "TypeScript (Bun)", 100.0), ("fiber", "Go", 200.0)]);
        let (status, body) = get(router(dir.path()), "/bench-data/index.json").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["contract_version"], 1);
        assert_eq!(body["frameworks"][0]["id"], "fiber");
        assert_eq!(
            body["frameworks"][1]["latest"],
            "bench-data/frameworks/hono/latest.json"
        );
    }

    #[tokio::test]
    async fn test_index_references_resolve_on_the_same_server() {
        let dir = published(&[("hono", "TypeScript (Bun)", 100.0)]);
        let router = router(dir.path());

        let (_, index) = get(router.clone(), "/bench-data/index.json").await;
        let latest = index["frameworks"][0]["latest"].as_str().unwrap();
        let (status, body) = get(router.clone(), &format!("/{latest}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["framework_id"], "hono");

        let (status, _) = get(router, "/results/index.json").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_missing_index_is_no_results() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = get(router(dir.path()), "/bench-data/index.json").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "no_results");
    }

    #[tokio::test]
    async fn test_latest_snapshot() {
        let dir = published(&[("hono", "TypeScript (Bun)", 100.0)]);
        let router = router(dir.path());

        let (status, body) = get(router.clone(), "/bench-data/frameworks/hono/latest.json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["framework_id"], "hono");
        assert_eq!(body["benchmarks"]["plaintext"]["requests_per_sec"], 100.0);

        let (status, body) = get(router.clone(), "/bench-data/frameworks/express/latest.json").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");

        let (status, body) = get(router, "/bench-data/frameworks/.hidden/latest.json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "invalid_framework_id");
    }
}
