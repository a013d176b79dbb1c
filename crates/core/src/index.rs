// Copyright 2025 BenchHub Contributors
// SPDX-License-Identifier: Apache-2.0

//! Consolidated index of the latest snapshot per framework.

use crate::snapshot::{FrameworkId, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Projection of a snapshot, one per known framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Framework id (join key)
    pub id: FrameworkId,
    /// Language or runtime label
    pub language: String,
    /// Human-readable framework name
    pub framework: String,
    /// When the latest snapshot was measured
    pub measured_at: DateTime<Utc>,
    /// Relative reference to the latest snapshot, e.g.
    /// `results/frameworks/bun-http/latest.json`
    pub latest: String,
}

impl IndexEntry {
    /// Build an entry from the authoritative snapshot of a framework.
    pub fn from_snapshot(snapshot: &Snapshot, latest: impl Into<String>) -> Self {
        Self {
            id: snapshot.framework_id.clone(),
            language: snapshot.language.clone(),
            framework: snapshot.framework.clone(),
            measured_at: snapshot.measured_at,
            latest: latest.into(),
        }
    }
}

/// The consolidated index file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// When the index was generated
    pub generated_at: DateTime<Utc>,
    /// Contract version stamped by the merger
    pub contract_version: u32,
    /// Entries sorted by id ascending
    pub frameworks: Vec<IndexEntry>,
}

impl Index {
    /// Create an index, sorting entries by id.
    ///
    /// Ids compare byte-wise, so the order is case-sensitive and does not
    /// depend on the order the entries were collected in.
    pub fn new(
        generated_at: DateTime<Utc>,
        contract_version: u32,
        mut frameworks: Vec<IndexEntry>,
    ) -> Self {
        frameworks.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            generated_at,
            contract_version,
            frameworks,
        }
    }

    /// Look up an entry by framework id.
    pub fn entry(&self, id: &str) -> Option<&IndexEntry> {
        self.frameworks.iter().find(|entry| entry.id.as_str() == id)
    }

    /// True when no framework has a snapshot yet.
    pub fn is_empty(&self) -> bool {
        self.frameworks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str) -> IndexEntry {
        IndexEntry {
            id: FrameworkId::parse(id).unwrap(),
            language: "Go".to_string(),
            framework: id.to_string(),
            measured_at: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            latest: format!("results/frameworks/{id}/latest.json"),
        }
    }

    #[test]
    fn test_index_sorted_case_sensitive() {
        let index = Index::new(
            Utc::now(),
            1,
            vec![entry("fiber"), entry("Axum"), entry("bun-http"), entry("axum")],
        );
        let ids: Vec<&str> = index.frameworks.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["Axum", "axum", "bun-http", "fiber"]);
    }

    #[test]
    fn test_index_round_trip() {
        let index = Index::new(Utc::now(), 3, vec![entry("fiber"), entry("bun-http")]);
        let json = serde_json::to_string_pretty(&index).unwrap();
        let parsed: Index = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.contract_version, 3);
        assert_eq!(parsed.frameworks, index.frameworks);
    }

    #[test]
    fn test_index_entry_lookup() {
        let index = Index::new(Utc::now(), 1, vec![entry("fiber"), entry("bun-http")]);
        assert_eq!(index.entry("fiber").map(|e| e.framework.as_str()), Some("fiber"));
        assert!(index.entry("express").is_none());
        assert!(!index.is_empty());
    }

    #[test]
    fn test_measured_at_serializes_as_utc() {
        let json = serde_json::to_value(entry("bun-http")).unwrap();
        assert_eq!(json["measured_at"], "2024-02-01T00:00:00Z");
    }
}
