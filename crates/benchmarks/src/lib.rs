//! Result store merger and ranking view model for BenchHub.
//!
//! The external benchmark runner writes one timestamped snapshot per
//! framework per run. This crate consolidates those snapshots and derives
//! comparable rankings from them.
//!
//! # Quick Start
//!
//! ```no_run
//! use benchhub_benchmarks::{FsSource, MergeOptions, Merger, ResultsLayout, ViewState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Consolidate the store
//! let layout = ResultsLayout::new("site/public/results");
//! let report = Merger::new(layout.clone(), MergeOptions::new(1)).run()?;
//! println!("{} frameworks indexed", report.index.frameworks.len());
//!
//! // Rank what was published
//! let source = FsSource::from_layout(&layout);
//! let model = benchhub_benchmarks::load_view_model(&source, 8).await?;
//! for ranked in model.view(&ViewState::default()).rows() {
//!     println!("{}. {}", ranked.rank, ranked.row.framework);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`store`] - append-only snapshot store and latest selection
//! - [`merge`] - the merger producing latest pointers and the index
//! - [`source`] - read-only access for consumers
//! - [`view`] - rows, sorting, filtering and ranks
//! - [`markdown`] - markdown report generation
//! - [`io`] - reading and writing result files

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod format;
pub mod io;
pub mod layout;
pub mod markdown;
pub mod merge;
pub mod settings;
pub mod source;
pub mod store;
pub mod view;

pub use layout::ResultsLayout;
pub use merge::{FrameworkError, MergeOptions, MergeReport, Merger};
pub use settings::Settings;
pub use source::{
    fetch_framework, fetch_index, fetch_snapshot, load_view_model, FsSource, HttpSource,
    ResultSource, SourceError,
};
pub use store::{SnapshotStore, StoreError};
pub use view::{
    projected_throughput, FrameworkRow, RankedRow, Rankings, RowSummary, ScenarioFigures,
    SortDirection, SortKey, ViewModel, ViewOutcome, ViewParseError, ViewState,
};
