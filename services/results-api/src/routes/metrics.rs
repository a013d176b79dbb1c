use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::Arc;

use crate::models::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/metrics", get(render))
}

async fn render(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed\n".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::{get, router};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = get(router(dir.path()), "/metrics").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
