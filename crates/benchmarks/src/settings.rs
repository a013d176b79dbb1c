//! Layered configuration.
//!
//! Settings come from built-in defaults, then an optional `benchhub.toml`
//! (or any format the `config` crate recognises under that name), then
//! `BENCHHUB_*` environment variables. Command-line flags override the
//! result in the binaries.

use benchhub_core::VersionPolicy;
use config::{Config, ConfigError, Environment, File, FileFormat, FileSourceFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default results directory, relative to the repository root.
pub const DEFAULT_RESULTS_DIR: &str = "site/public/results";

/// Default contract file, relative to the repository root.
pub const DEFAULT_CONTRACT_FILE: &str = "benchmarks/contract.json";

/// Default listen address of the results API.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "BENCHHUB";

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Directory holding `index.json` and `frameworks/`
    pub results_dir: PathBuf,
    /// Contract file supplying the current contract version
    pub contract_file: PathBuf,
    /// Handling of snapshots written for another contract version
    pub version_policy: VersionPolicy,
    /// Snapshot fetches in flight when loading a view
    pub fetch_concurrency: usize,
    /// Listen address of the results API
    pub bind_addr: String,
}

impl Settings {
    /// Load defaults, `./benchhub.*` if present, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(Some(File::with_name("benchhub").required(false)))
    }

    /// Load defaults, the given file (which must exist), then the environment.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::build(Some(File::from(path).required(true)))
    }

    /// Defaults and environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(None)
    }

    fn build(file: Option<File<FileSourceFile, FileFormat>>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("results_dir", DEFAULT_RESULTS_DIR)?
            .set_default("contract_file", DEFAULT_CONTRACT_FILE)?
            .set_default("version_policy", VersionPolicy::default().as_str())?
            .set_default("fetch_concurrency", crate::source::DEFAULT_FETCH_CONCURRENCY as i64)?
            .set_default("bind_addr", DEFAULT_BIND_ADDR)?;

        if let Some(file) = file {
            builder = builder.add_source(file);
        }

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.contract_file, PathBuf::from(DEFAULT_CONTRACT_FILE));
        assert_eq!(settings.version_policy, VersionPolicy::Warn);
        assert_eq!(settings.fetch_concurrency, 8);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("benchhub.toml");
        std::fs::write(
            &path,
            "contract_file = \"contract.json\"\nversion_policy = \"reject\"\nfetch_concurrency = 2\n",
        )
        .unwrap();

        let settings = Settings::load_from_file(&path).unwrap();
        assert_eq!(settings.contract_file, PathBuf::from("contract.json"));
        assert_eq!(settings.version_policy, VersionPolicy::Reject);
        assert_eq!(settings.fetch_concurrency, 2);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load_from_file(&dir.path().join("absent.toml")).is_err());
    }
}
