// Copyright 2025 BenchHub Contributors
// SPDX-License-Identifier: Apache-2.0

//! Benchmark contract file and version policy.
//!
//! The contract file (`benchmarks/contract.json`) is shared with the
//! benchmark runner. Only its `version` field matters here; the merger
//! stamps it into every index it writes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The parts of the contract file the merger reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFile {
    /// Current contract version
    pub version: u32,
}

impl ContractFile {
    /// Parse a contract file, ignoring fields other than `version`.
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

/// What to do with a snapshot whose `contract_version` differs from the
/// configured one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Accept silently
    Ignore,
    /// Accept and log a warning
    #[default]
    Warn,
    /// Skip the framework for this run with a warning
    Reject,
}

impl VersionPolicy {
    /// Wire name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Warn => "warn",
            Self::Reject => "reject",
        }
    }
}

impl FromStr for VersionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "warn" => Ok(Self::Warn),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown version policy: {other}")),
        }
    }
}

impl fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_ignores_other_fields() {
        let contract = ContractFile::from_json(
            r#"{ "version": 2, "duration_seconds": 6, "connections": 64, "routes": ["plaintext"] }"#,
        )
        .unwrap();
        assert_eq!(contract.version, 2);
    }

    #[test]
    fn test_contract_requires_version() {
        assert!(ContractFile::from_json(r#"{ "routes": [] }"#).is_err());
    }

    #[test]
    fn test_version_policy_parse() {
        assert_eq!("Reject".parse::<VersionPolicy>().unwrap(), VersionPolicy::Reject);
        assert_eq!(VersionPolicy::default(), VersionPolicy::Warn);
        assert!("strict".parse::<VersionPolicy>().is_err());
    }
}
