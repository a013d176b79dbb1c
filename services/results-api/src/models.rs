use benchhub_benchmarks::{FsSource, ResultsLayout, Settings};
use metrics_exporter_prometheus::PrometheusHandle;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Where the merger writes
    pub layout: ResultsLayout,
    /// Published results, rooted at the layout's public root
    pub source: FsSource,
    /// Snapshot fetches in flight per rankings request
    pub fetch_concurrency: usize,
    /// Recorder handle backing `/metrics`, when one is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        Self::from_layout(
            ResultsLayout::new(&settings.results_dir),
            settings.fetch_concurrency,
        )
    }

    pub fn from_layout(layout: ResultsLayout, fetch_concurrency: usize) -> Self {
        Self {
            source: FsSource::from_layout(&layout),
            layout,
            fetch_concurrency,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
