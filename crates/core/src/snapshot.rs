// Copyright 2025 BenchHub Contributors
// SPDX-License-Identifier: Apache-2.0

//! Result snapshot types.
//!
//! A [`Snapshot`] is one measurement of one framework at one point in time,
//! written by the external benchmark runner as a JSON file. Snapshots are
//! immutable once written; a later run supersedes an earlier one by adding a
//! new file, never by editing the old one.
//!
//! # Invariants
//!
//! - [`FrameworkId`] is the join key between snapshots, index entries and
//!   latest pointers. It is validated whenever it is parsed.
//! - A scenario missing from [`Snapshot::benchmarks`] means "not measured".
//!   Nothing in this crate substitutes a zero metric for it.
//! - Latency percentiles satisfy `p50 <= p95 <= p99` once
//!   [`Snapshot::validate`] has passed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum accepted length of a framework id, in bytes.
pub const MAX_FRAMEWORK_ID_LEN: usize = 128;

/// Errors raised while validating snapshot contents.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    /// Framework id is not a valid slug
    #[error("Invalid framework id {id:?}: {reason}")]
    InvalidFrameworkId {
        /// The rejected id
        id: String,
        /// Rule it breaks
        reason: &'static str,
    },

    /// A scenario metric breaks a value invariant
    #[error("Invalid metric for scenario '{scenario}': {reason}")]
    InvalidMetric {
        /// Scenario key in `benchmarks`
        scenario: String,
        /// Broken invariant
        reason: String,
    },

    /// Scenario name is not one of the known scenarios
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// Percentile name is not p50, p95 or p99
    #[error("Unknown percentile: {0}")]
    UnknownPercentile(String),
}

/// Stable slug identifying a framework across runs.
///
/// Accepts ASCII alphanumerics, `-`, `_` and `.`, must not start with `.`
/// and is compared case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FrameworkId(String);

impl FrameworkId {
    /// Parse and validate a framework id.
    pub fn parse(id: impl Into<String>) -> Result<Self, SnapshotError> {
        let id = id.into();
        let reason = if id.is_empty() {
            Some("must not be empty")
        } else if id.len() > MAX_FRAMEWORK_ID_LEN {
            Some("too long")
        } else if id.starts_with('.') {
            Some("must not start with '.'")
        } else if !id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        {
            Some("only ASCII letters, digits, '-', '_' and '.' are allowed")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(SnapshotError::InvalidFrameworkId { id, reason }),
            None => Ok(Self(id)),
        }
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for FrameworkId {
    type Error = SnapshotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<FrameworkId> for String {
    fn from(id: FrameworkId) -> Self {
        id.0
    }
}

impl FromStr for FrameworkId {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FrameworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FrameworkId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Machine the benchmark ran on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Operating system name
    pub os: String,
    /// CI identifier, empty when not run in CI
    pub ci: String,
    /// Load generator (oha) version
    pub oha_version: String,
}

impl Environment {
    /// CI identifier, or `None` when the run did not happen in CI.
    pub fn ci_label(&self) -> Option<&str> {
        let ci = self.ci.trim();
        (!ci.is_empty()).then_some(ci)
    }
}

/// Latency distribution in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatencyMs {
    /// Median latency
    pub p50: f64,
    /// 95th percentile
    pub p95: f64,
    /// 99th percentile
    pub p99: f64,
}

/// Measurement of one scenario during one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetric {
    /// Run duration in seconds
    pub duration_seconds: f64,
    /// Achieved throughput
    pub requests_per_sec: f64,
    /// Latency distribution
    pub latency_ms: LatencyMs,
    /// Failed requests during the run
    pub errors: u64,
}

impl BenchmarkMetric {
    fn validate(&self, scenario: &str) -> Result<(), SnapshotError> {
        let invalid = |reason: String| SnapshotError::InvalidMetric {
            scenario: scenario.to_string(),
            reason,
        };

        let values = [
            ("duration_seconds", self.duration_seconds),
            ("requests_per_sec", self.requests_per_sec),
            ("latency_ms.p50", self.latency_ms.p50),
            ("latency_ms.p95", self.latency_ms.p95),
            ("latency_ms.p99", self.latency_ms.p99),
        ];
        for (field, value) in values {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "{field} must be a non-negative number, got {value}"
                )));
            }
        }

        let LatencyMs { p50, p95, p99 } = self.latency_ms;
        if p50 > p95 || p95 > p99 {
            return Err(invalid(format!(
                "latency percentiles out of order (p50={p50}, p95={p95}, p99={p99})"
            )));
        }

        Ok(())
    }
}

/// One measurement of one framework at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Stable framework slug
    pub framework_id: FrameworkId,
    /// Language or runtime label
    pub language: String,
    /// Human-readable framework name
    pub framework: String,
    /// When the measurement was taken
    pub measured_at: DateTime<Utc>,
    /// Schema version the runner wrote
    pub contract_version: u32,
    /// Version of the benchmark runner
    pub runner_version: String,
    /// Machine the run happened on
    pub environment: Environment,
    /// Scenario name to metric. Absent keys were not measured.
    pub benchmarks: BTreeMap<String, BenchmarkMetric>,
    /// Documentation URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Fields this version does not know about, kept for re-serialization.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Snapshot {
    /// Check every metric invariant.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        self.benchmarks
            .iter()
            .try_for_each(|(scenario, metric)| metric.validate(scenario))
    }

    /// Metric for a known scenario, if it was measured.
    pub fn metric(&self, scenario: Scenario) -> Option<&BenchmarkMetric> {
        self.benchmarks.get(scenario.as_str())
    }

    /// Canonical immutable file name, e.g. `2024-02-01T00-00-00.json`.
    ///
    /// Names sort chronologically, which is what latest selection relies on.
    pub fn file_name(&self) -> String {
        self.measured_at.format("%Y-%m-%dT%H-%M-%S.json").to_string()
    }
}

/// Benchmark routes every framework sample implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// `GET /plaintext`
    Plaintext,
    /// `GET /json`
    Json,
    /// `POST /echo`
    Echo,
    /// Query parameter parsing
    Search,
    /// Path parameter parsing
    User,
}

impl Scenario {
    /// All known scenarios, in display order.
    pub const ALL: [Scenario; 5] = [
        Scenario::Plaintext,
        Scenario::Json,
        Scenario::Echo,
        Scenario::Search,
        Scenario::User,
    ];

    /// Key used in [`Snapshot::benchmarks`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintext => "plaintext",
            Self::Json => "json",
            Self::Echo => "echo",
            Self::Search => "search",
            Self::User => "user",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Plaintext => "Plaintext",
            Self::Json => "JSON",
            Self::Echo => "Echo POST",
            Self::Search => "Query Params",
            Self::User => "Path Params",
        }
    }
}

impl FromStr for Scenario {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.as_str() == s)
            .ok_or_else(|| SnapshotError::UnknownScenario(s.to_string()))
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latency percentile selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Percentile {
    /// Median
    P50,
    /// 95th percentile
    P95,
    /// 99th percentile
    P99,
}

impl Percentile {
    /// Pick this percentile out of a distribution.
    pub fn of(&self, latency: &LatencyMs) -> f64 {
        match self {
            Self::P50 => latency.p50,
            Self::P95 => latency.p95,
            Self::P99 => latency.p99,
        }
    }

    /// Wire name (`p50`, `p95`, `p99`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P50 => "p50",
            Self::P95 => "p95",
            Self::P99 => "p99",
        }
    }
}

impl FromStr for Percentile {
    type Err = SnapshotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p50" => Ok(Self::P50),
            "p95" => Ok(Self::P95),
            "p99" => Ok(Self::P99),
            other => Err(SnapshotError::UnknownPercentile(other.to_string())),
        }
    }
}

impl fmt::Display for Percentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
