//! Rankings computed from the published results.

use ::metrics::counter;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use benchhub_benchmarks::{
    fetch_framework, load_view_model, FrameworkRow, Rankings, ScenarioFigures, SortKey,
    ViewModel, ViewParseError, ViewState,
};
use benchhub_core::{Environment, Scenario};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::models::AppState;

/// Query string of `/api/v1/rankings`.
#[derive(Debug, Default, Deserialize)]
pub struct RankingQuery {
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub q: Option<String>,
    pub language: Option<String>,
}

impl RankingQuery {
    /// Without `direction` the sort key's natural direction applies.
    pub fn view_state(&self) -> Result<ViewState, ViewParseError> {
        let sort_key = match &self.sort {
            Some(sort) => sort.parse()?,
            None => SortKey::default(),
        };
        let direction = match &self.direction {
            Some(direction) => direction.parse()?,
            None => sort_key.default_direction(),
        };

        let mut state = ViewState {
            sort_key,
            direction,
            ..ViewState::default()
        };
        if let Some(query) = &self.q {
            state = state.with_query(query.as_str());
        }
        if let Some(language) = self.language.as_deref().filter(|l| !l.is_empty()) {
            state = state.with_language(language);
        }
        Ok(state)
    }
}

/// One framework's latest figures.
#[derive(Debug, Serialize)]
pub struct FrameworkDetail {
    pub id: String,
    pub framework: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub measured_at: DateTime<Utc>,
    pub contract_version: u32,
    pub runner_version: String,
    pub environment: Environment,
    pub scenarios: BTreeMap<Scenario, ScenarioFigures>,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/rankings", get(rankings))
        .route("/api/v1/frameworks/:id", get(framework))
        .route("/api/v1/languages", get(languages))
}

async fn load(state: &AppState) -> ViewModel {
    match load_view_model(&state.source, state.fetch_concurrency).await {
        Ok(model) => model,
        Err(e) => {
            warn!(error = %e, "Results index unavailable");
            ViewModel::unavailable()
        }
    }
}

async fn rankings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RankingQuery>,
) -> Result<Json<Rankings>, ApiError> {
    counter!("benchhub_api_requests_total", "route" => "rankings").increment(1);
    let view = query
        .view_state()
        .map_err(|e| ApiError::bad_request("invalid_query", e.to_string()))?;

    let model = load(&state).await;
    Ok(Json(model.rankings(&view)))
}

async fn framework(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FrameworkDetail>, ApiError> {
    counter!("benchhub_api_requests_total", "route" => "framework").increment(1);
    let snapshot = fetch_framework(&state.source, &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Framework '{id}' is not in the index")))?;

    let row = FrameworkRow::from_snapshot(&snapshot);
    Ok(Json(FrameworkDetail {
        scenarios: Scenario::ALL
            .into_iter()
            .map(|s| (s, row.figures(s)))
            .collect(),
        id: row.id.to_string(),
        framework: row.framework,
        language: row.language,
        url: row.url,
        measured_at: row.measured_at,
        contract_version: snapshot.contract_version,
        runner_version: snapshot.runner_version,
        environment: snapshot.environment,
    }))
}

async fn languages(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    counter!("benchhub_api_requests_total", "route" => "languages").increment(1);
    let model = load(&state).await;
    Json(model.languages().into_iter().map(str::to_string).collect())
}
