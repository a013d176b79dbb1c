// Copyright 2025 BenchHub Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use benchhub_benchmarks::Settings;
use metrics_exporter_prometheus::PrometheusBuilder;
use results_api::{app, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "results_api=info,benchhub_benchmarks=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load().context("Failed to load settings")?;
    tracing::info!(
        results_dir = %settings.results_dir.display(),
        fetch_concurrency = settings.fetch_concurrency,
        "results-api starting..."
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    let state = AppState::new(&settings).with_metrics(metrics);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind_addr))?;
    tracing::info!("Listening on {}", settings.bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutting down");
}
