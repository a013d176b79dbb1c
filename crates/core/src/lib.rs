// Copyright 2025 BenchHub Contributors
// SPDX-License-Identifier: Apache-2.0

//! Core types for BenchHub benchmark results.
//!
//! This crate defines the JSON contract shared by the external benchmark
//! runner, the result store merger, and every read-only consumer:
//!
//! - [`snapshot`] - one immutable measurement of one framework
//! - [`index`] - the consolidated, id-sorted list of latest snapshots
//! - [`contract`] - the contract version file and mismatch policy

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod contract;
pub mod index;
pub mod snapshot;

pub use contract::{ContractFile, VersionPolicy};
pub use index::{Index, IndexEntry};
pub use snapshot::{
    BenchmarkMetric, Environment, FrameworkId, LatencyMs, Percentile, Scenario, Snapshot,
    SnapshotError,
};
