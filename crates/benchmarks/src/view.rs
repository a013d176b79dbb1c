//! Ranking view model.
//!
//! Flattens each framework's latest snapshot into a [`FrameworkRow`] and
//! derives sorted, filtered, ranked views over them. Rows are built once and
//! never mutated; every view is computed from the full set.
//!
//! Scenario presence is explicit all the way through: a row holds
//! `Option<BenchmarkMetric>` per scenario. Display accessors collapse a
//! missing scenario to zero, so anything comparing frameworks on a scenario
//! should check [`FrameworkRow::is_measured`] or use [`ScenarioFigures`].

use benchhub_core::{BenchmarkMetric, FrameworkId, Index, Percentile, Scenario, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing view parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewParseError {
    /// Not a known sort key
    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),

    /// Neither `asc` nor `desc`
    #[error("Unknown sort direction: {0}")]
    UnknownDirection(String),
}

/// Scale heuristic suggesting production throughput from a measured value.
///
/// This is a presentation estimate, not a measurement: `(rps / 1000)² × 100`.
/// It is only ever shown next to the raw value.
pub fn projected_throughput(requests_per_sec: f64) -> f64 {
    (requests_per_sec / 1000.0).powi(2) * 100.0
}

/// Flattened, display-ready figures for one scenario of one framework.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScenarioFigures {
    /// False when the framework never ran this scenario
    pub measured: bool,
    /// Measured throughput, 0 when not measured
    pub requests_per_sec: f64,
    /// [`projected_throughput`] of the measured value
    pub projected_rps: f64,
    /// Median latency in ms
    pub p50: f64,
    /// 95th percentile latency in ms
    pub p95: f64,
    /// 99th percentile latency in ms
    pub p99: f64,
    /// Failed requests
    pub errors: u64,
}

impl From<Option<&BenchmarkMetric>> for ScenarioFigures {
    fn from(metric: Option<&BenchmarkMetric>) -> Self {
        match metric {
            Some(m) => Self {
                measured: true,
                requests_per_sec: m.requests_per_sec,
                projected_rps: projected_throughput(m.requests_per_sec),
                p50: m.latency_ms.p50,
                p95: m.latency_ms.p95,
                p99: m.latency_ms.p99,
                errors: m.errors,
            },
            None => Self::default(),
        }
    }
}

/// One framework as shown in the rankings.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameworkRow {
    /// Framework id
    pub id: FrameworkId,
    /// Human-readable name
    pub framework: String,
    /// Language or runtime label
    pub language: String,
    /// Documentation URL
    pub url: Option<String>,
    /// When the snapshot was measured
    pub measured_at: DateTime<Utc>,
    metrics: BTreeMap<Scenario, BenchmarkMetric>,
}

impl FrameworkRow {
    /// Flatten a snapshot. Only known scenarios are kept.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let metrics = Scenario::ALL
            .into_iter()
            .filter_map(|s| snapshot.metric(s).map(|m| (s, *m)))
            .collect();

        Self {
            id: snapshot.framework_id.clone(),
            framework: snapshot.framework.clone(),
            language: snapshot.language.clone(),
            url: snapshot.url.clone(),
            measured_at: snapshot.measured_at,
            metrics,
        }
    }

    /// The measured metric, or `None` when the scenario was not run.
    pub fn metric(&self, scenario: Scenario) -> Option<&BenchmarkMetric> {
        self.metrics.get(&scenario)
    }

    /// Presence flag: distinguishes "measured as 0" from "not measured".
    pub fn is_measured(&self, scenario: Scenario) -> bool {
        self.metrics.contains_key(&scenario)
    }

    /// Throughput for display, 0 when not measured.
    pub fn throughput(&self, scenario: Scenario) -> f64 {
        self.metric(scenario).map_or(0.0, |m| m.requests_per_sec)
    }

    /// Latency percentile for display, 0 when not measured.
    pub fn latency(&self, scenario: Scenario, percentile: Percentile) -> f64 {
        self.metric(scenario)
            .map_or(0.0, |m| percentile.of(&m.latency_ms))
    }

    /// Flattened figures for one scenario.
    pub fn figures(&self, scenario: Scenario) -> ScenarioFigures {
        ScenarioFigures::from(self.metric(scenario))
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

impl SortDirection {
    /// The other direction.
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = ViewParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ViewParseError::UnknownDirection(s.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => f.write_str("asc"),
            Self::Desc => f.write_str("desc"),
        }
    }
}

/// What a view is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Framework name
    Framework,
    /// Language label
    Language,
    /// Measurement time
    MeasuredAt,
    /// `<scenario>_rps`
    Throughput(Scenario),
    /// `<scenario>_<percentile>`
    Latency(Scenario, Percentile),
}

impl SortKey {
    /// Higher throughput is better; everything else reads best ascending.
    pub fn default_direction(&self) -> SortDirection {
        match self {
            Self::Throughput(_) => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    /// Scenario the key looks at, if any.
    pub fn scenario(&self) -> Option<Scenario> {
        match self {
            Self::Throughput(s) | Self::Latency(s, _) => Some(*s),
            _ => None,
        }
    }

    fn compare(&self, a: &FrameworkRow, b: &FrameworkRow) -> Ordering {
        match self {
            Self::Framework => cmp_ignore_case(&a.framework, &b.framework),
            Self::Language => cmp_ignore_case(&a.language, &b.language),
            Self::MeasuredAt => a.measured_at.cmp(&b.measured_at),
            Self::Throughput(s) => a.throughput(*s).total_cmp(&b.throughput(*s)),
            Self::Latency(s, p) => a.latency(*s, *p).total_cmp(&b.latency(*s, *p)),
        }
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

impl Default for SortKey {
    fn default() -> Self {
        Self::Throughput(Scenario::Plaintext)
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framework => f.write_str("framework"),
            Self::Language => f.write_str("language"),
            Self::MeasuredAt => f.write_str("measured_at"),
            Self::Throughput(s) => write!(f, "{s}_rps"),
            Self::Latency(s, p) => write!(f, "{s}_{p}"),
        }
    }
}

impl FromStr for SortKey {
    type Err = ViewParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ViewParseError::UnknownSortKey(s.to_string());
        match s {
            "framework" => return Ok(Self::Framework),
            "language" => return Ok(Self::Language),
            "measured_at" => return Ok(Self::MeasuredAt),
            _ => {}
        }

        let (scenario, metric) = s.rsplit_once('_').ok_or_else(unknown)?;
        let scenario: Scenario = scenario.parse().map_err(|_| unknown())?;
        match metric {
            "rps" => Ok(Self::Throughput(scenario)),
            percentile => percentile
                .parse()
                .map(|p| Self::Latency(scenario, p))
                .map_err(|_| unknown()),
        }
    }
}

/// User-controlled view parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    /// Sort key
    pub sort_key: SortKey,
    /// Sort direction
    pub direction: SortDirection,
    /// Case-insensitive substring matched against name and language
    pub query: Option<String>,
    /// Exact language label
    pub language: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        let sort_key = SortKey::default();
        Self {
            sort_key,
            direction: sort_key.default_direction(),
            query: None,
            language: None,
        }
    }
}

impl ViewState {
    /// Select a sort key the way a column header click does: the same key
    /// flips direction, a new key starts at its natural direction.
    pub fn select_sort(&mut self, key: SortKey) {
        if self.sort_key == key {
            self.direction = self.direction.flipped();
        } else {
            self.sort_key = key;
            self.direction = key.default_direction();
        }
    }

    /// Set the free-text search. Blank text clears it.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.trim().is_empty()).then_some(query);
        self
    }

    /// Restrict to one language label.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    fn matches(&self, row: &FrameworkRow) -> bool {
        if let Some(language) = &self.language {
            if &row.language != language {
                return false;
            }
        }
        match &self.query {
            Some(query) => {
                let needle = query.trim().to_lowercase();
                row.framework.to_lowercase().contains(&needle)
                    || row.language.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// A row at its position in a view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedRow<'a> {
    /// 1-based position in the current view
    pub rank: usize,
    /// The row
    pub row: &'a FrameworkRow,
}

impl RankedRow<'_> {
    /// Serializable summary with figures for every known scenario.
    pub fn summary(&self) -> RowSummary {
        let row = self.row;
        RowSummary {
            rank: self.rank,
            id: row.id.to_string(),
            framework: row.framework.clone(),
            language: row.language.clone(),
            url: row.url.clone(),
            measured_at: row.measured_at,
            scenarios: Scenario::ALL
                .into_iter()
                .map(|s| (s, row.figures(s)))
                .collect(),
        }
    }
}

/// Owned, serializable form of a ranked row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSummary {
    /// 1-based position in the view
    pub rank: usize,
    /// Framework id
    pub id: String,
    /// Human-readable name
    pub framework: String,
    /// Language or runtime label
    pub language: String,
    /// Documentation URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// When the snapshot was measured
    pub measured_at: DateTime<Utc>,
    /// Figures per scenario; unmeasured ones carry `measured: false`
    pub scenarios: BTreeMap<Scenario, ScenarioFigures>,
}

/// Result of computing a view.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome<'a> {
    /// There is no data at all yet
    NoResults,
    /// Data exists but the filter matched nothing
    NoMatches,
    /// Ranked rows
    Rows(Vec<RankedRow<'a>>),
}

impl<'a> ViewOutcome<'a> {
    /// Rows of the view, empty for the other outcomes.
    pub fn rows(&self) -> &[RankedRow<'a>] {
        match self {
            Self::Rows(rows) => rows,
            _ => &[],
        }
    }

    /// Machine-readable outcome: `no_results`, `no_matches` or `ok`.
    pub fn status(&self) -> &'static str {
        match self {
            Self::NoResults => "no_results",
            Self::NoMatches => "no_matches",
            Self::Rows(_) => "ok",
        }
    }
}

/// Serializable rankings document for one view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rankings {
    /// See [`ViewOutcome::status`]
    pub status: &'static str,
    /// Sort key name
    pub sort: String,
    /// Sort direction
    pub direction: SortDirection,
    /// When the index was generated, if one was read
    pub generated_at: Option<DateTime<Utc>>,
    /// Contract version of the index, if one was read
    pub contract_version: Option<u32>,
    /// Ranked rows
    pub frameworks: Vec<RowSummary>,
}

/// Index metadata carried alongside the rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMeta {
    /// When the index was generated
    pub generated_at: DateTime<Utc>,
    /// Contract version of the index
    pub contract_version: u32,
}

/// All rows loaded from one index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewModel {
    meta: Option<IndexMeta>,
    rows: Vec<FrameworkRow>,
}

impl ViewModel {
    /// Build from an index and the snapshots that could be fetched for it.
    ///
    /// Snapshots are expected in index order; frameworks whose fetch failed
    /// are simply absent.
    pub fn new(index: &Index, snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        Self {
            meta: Some(IndexMeta {
                generated_at: index.generated_at,
                contract_version: index.contract_version,
            }),
            rows: snapshots
                .into_iter()
                .map(|s| FrameworkRow::from_snapshot(&s))
                .collect(),
        }
    }

    /// A model for when no index could be read.
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Index metadata, `None` when no index was read.
    pub fn meta(&self) -> Option<&IndexMeta> {
        self.meta.as_ref()
    }

    /// Every row, unfiltered, in load order.
    pub fn rows(&self) -> &[FrameworkRow] {
        &self.rows
    }

    /// Row of one framework.
    pub fn row(&self, id: &str) -> Option<&FrameworkRow> {
        self.rows.iter().find(|r| r.id.as_str() == id)
    }

    /// True when there is nothing to show at all.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Filter, then stable-sort, then rank.
    pub fn view(&self, state: &ViewState) -> ViewOutcome<'_> {
        if self.rows.is_empty() {
            return ViewOutcome::NoResults;
        }

        let mut rows: Vec<&FrameworkRow> = self.rows.iter().filter(|r| state.matches(r)).collect();
        if rows.is_empty() {
            return ViewOutcome::NoMatches;
        }

        // `sort_by` is stable; reversing the comparator keeps ties in load order.
        // Rows that never ran the sorted scenario go last in either direction.
        let scenario = state.sort_key.scenario();
        rows.sort_by(|a, b| {
            if let Some(s) = scenario {
                match (a.is_measured(s), b.is_measured(s)) {
                    (true, false) => return Ordering::Less,
                    (false, true) => return Ordering::Greater,
                    _ => {}
                }
            }
            let ord = state.sort_key.compare(a, b);
            match state.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        ViewOutcome::Rows(
            rows.into_iter()
                .enumerate()
                .map(|(i, row)| RankedRow { rank: i + 1, row })
                .collect(),
        )
    }

    /// Compute a view and flatten it for serialization.
    pub fn rankings(&self, state: &ViewState) -> Rankings {
        let outcome = self.view(state);
        Rankings {
            status: outcome.status(),
            sort: state.sort_key.to_string(),
            direction: state.direction,
            generated_at: self.meta.map(|m| m.generated_at),
            contract_version: self.meta.map(|m| m.contract_version),
            frameworks: outcome.rows().iter().map(|r| r.summary()).collect(),
        }
    }

    /// Distinct language labels, sorted case-insensitively.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.rows.iter().map(|r| r.language.as_str()).collect();
        languages.sort_by(|a, b| cmp_ignore_case(a, b).then_with(|| a.cmp(b)));
        languages.dedup();
        languages
    }

    /// Highest measured throughput for a scenario.
    pub fn max_throughput(&self, scenario: Scenario) -> Option<f64> {
        self.leader(scenario).map(|r| r.throughput(scenario))
    }

    /// Framework with the highest measured throughput for a scenario.
    ///
    /// Frameworks that never ran the scenario are not candidates. The first
    /// row in load order wins a tie.
    pub fn leader(&self, scenario: Scenario) -> Option<&FrameworkRow> {
        self.rows
            .iter()
            .filter(|r| r.is_measured(scenario))
            .fold(None, |best: Option<&FrameworkRow>, row| match best {
                Some(b) if b.throughput(scenario) >= row.throughput(scenario) => Some(b),
                _ => Some(row),
            })
    }
}
