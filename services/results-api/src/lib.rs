// Copyright 2025 BenchHub Contributors
// SPDX-License-Identifier: Apache-2.0

//! Read-only HTTP API over published BenchHub results.
//!
//! Serves the consolidated index and latest snapshots as stored, plus
//! rankings computed with the same view model the dashboard uses.

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod error;
pub mod models;
pub mod routes;

use axum::http::Method;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use models::AppState;

/// Build the application router.
///
/// The raw files are mounted under the results directory's name, so the
/// `latest` references inside the served index resolve against the same
/// server.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::results::routes(&state.layout))
        .merge(routes::rankings::routes())
        .merge(routes::metrics::routes())
        .with_state(Arc::new(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS]),
        )
        .layer(TraceLayer::new_for_http())
}
