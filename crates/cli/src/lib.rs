//! CLI for BenchHub.
//!
//! This crate provides the `benchhub` command-line interface: merging the
//! result store, ingesting new snapshots, and ranking or inspecting
//! published results.

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use benchhub_benchmarks::io::{read_contract, read_index, read_snapshot};
use benchhub_benchmarks::format::{format_date, format_latency, format_number};
use benchhub_benchmarks::markdown::{
    generate_detailed_report, generate_history, generate_rankings, NO_MATCHES, NO_RESULTS,
};
use benchhub_benchmarks::{
    fetch_framework, load_view_model, FsSource, HttpSource, MergeOptions, Merger, ResultSource,
    ResultsLayout, Settings, SnapshotStore, SortDirection, SortKey, ViewModel, ViewOutcome,
    ViewState,
};
use benchhub_core::{FrameworkId, Scenario, VersionPolicy};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// BenchHub CLI.
#[derive(Parser, Debug)]
#[command(name = "benchhub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to ./benchhub.toml when present).
    #[arg(long, global = true, env = "BENCHHUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output formats for ranking and inspection commands.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned terminal table
    Table,
    /// Markdown report
    Markdown,
    /// JSON document
    Json,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select the latest snapshot per framework and write latest pointers
    /// and the consolidated index.
    ///
    /// Frameworks that fail to merge are logged and left out; the command
    /// still succeeds. Only a failure to write the index is fatal.
    Merge {
        /// Results directory holding `frameworks/` and `index.json`.
        #[arg(short, long)]
        results_dir: Option<PathBuf>,

        /// Contract file supplying the current contract version.
        #[arg(short, long)]
        contract: Option<PathBuf>,

        /// Handling of snapshots written for another contract version.
        #[arg(long)]
        version_policy: Option<VersionPolicy>,
    },

    /// Validate a snapshot file from the benchmark runner and add it to the
    /// store under its framework id.
    Ingest {
        /// Snapshot file to add.
        file: PathBuf,

        /// Results directory holding `frameworks/`.
        #[arg(short, long)]
        results_dir: Option<PathBuf>,
    },

    /// Rank published frameworks.
    Rank {
        /// Public directory or base URL the index is published under.
        #[arg(short, long)]
        source: Option<String>,

        /// Sort key: framework, language, measured_at, <scenario>_rps or
        /// <scenario>_<p50|p95|p99>.
        #[arg(long, default_value = "plaintext_rps")]
        sort: SortKey,

        /// Sort direction (defaults to the key's natural direction).
        #[arg(long)]
        direction: Option<SortDirection>,

        /// Case-insensitive search over framework name and language.
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Only show one language.
        #[arg(short, long)]
        language: Option<String>,

        /// Output format.
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the latest snapshot of one framework.
    Show {
        /// Framework id.
        id: String,

        /// Public directory or base URL the index is published under.
        #[arg(short, long)]
        source: Option<String>,

        /// Also list every stored snapshot (local results only).
        #[arg(long)]
        history: bool,

        /// Output format (`table` renders markdown).
        #[arg(short, long, value_enum, default_value = "markdown")]
        format: OutputFormat,
    },

    /// Show configuration and the state of the index.
    Status {
        /// Show per-framework snapshot counts.
        #[arg(short, long)]
        detailed: bool,
    },
}

/// Install the tracing subscriber. Logs go to stderr so stdout stays
/// parseable.
pub fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .try_init();
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load_from_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Settings::load().context("Failed to load settings"),
    }
}

/// Pick a source: `http(s)://` arguments are fetched over HTTP, anything
/// else is a local public directory.
fn open_source(arg: Option<&str>, settings: &Settings) -> Result<Box<dyn ResultSource>> {
    match arg {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
            Ok(Box::new(HttpSource::new(url)?))
        }
        Some(path) => Ok(Box::new(FsSource::new(path))),
        None => Ok(Box::new(FsSource::from_layout(&ResultsLayout::new(
            &settings.results_dir,
        )))),
    }
}

/// Parse arguments, set up logging and run the chosen command.
pub async fn run() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);
    execute(cli).await
}

/// Run a parsed command.
pub async fn execute(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_ref())?;

    match cli.command {
        Commands::Merge {
            results_dir,
            contract,
            version_policy,
        } => {
            let results_dir = results_dir.unwrap_or_else(|| settings.results_dir.clone());
            let contract_path = contract.unwrap_or_else(|| settings.contract_file.clone());
            let policy = version_policy.unwrap_or(settings.version_policy);

            let contract = read_contract(&contract_path).context("Failed to read contract file")?;
            info!(
                contract_version = contract.version,
                policy = %policy,
                results_dir = %results_dir.display(),
                "Merging results"
            );

            let merger = Merger::new(
                ResultsLayout::new(&results_dir),
                MergeOptions::new(contract.version).with_version_policy(policy),
            );
            let report = merger.run().context("Merge aborted")?;

            println!(
                "Index generated with {} frameworks",
                report.index.frameworks.len()
            );
            println!("Saved to: {}", report.index_path.display());
            for id in &report.updated {
                println!("  {} {}", "updated".green(), id);
            }
            for id in &report.skipped {
                println!("  {} {} (no result files)", "skipped".yellow(), id);
            }
            for (id, error) in &report.failed {
                println!("  {} {}: {}", "failed".red(), id, error);
            }

            Ok(())
        }

        Commands::Ingest { file, results_dir } => {
            let results_dir = results_dir.unwrap_or_else(|| settings.results_dir.clone());
            let snapshot = read_snapshot(&file)?;
            let store = SnapshotStore::new(ResultsLayout::new(&results_dir));
            let path = store
                .append(&snapshot)
                .with_context(|| format!("Failed to ingest {}", file.display()))?;

            info!(framework_id = %snapshot.framework_id, path = %path.display(), "Snapshot ingested");
            println!("Stored {}", path.display());
            println!("Run `benchhub merge` to publish it.");
            Ok(())
        }

        Commands::Rank {
            source,
            sort,
            direction,
            search,
            language,
            format,
        } => {
            let source = open_source(source.as_deref(), &settings)?;
            let model = match load_view_model(source.as_ref(), settings.fetch_concurrency).await {
                Ok(model) => model,
                Err(e) => {
                    warn!(source = %source.describe(), error = %e, "Index unavailable");
                    ViewModel::unavailable()
                }
            };

            let mut state = ViewState {
                sort_key: sort,
                direction: direction.unwrap_or_else(|| sort.default_direction()),
                ..ViewState::default()
            };
            if let Some(search) = search {
                state = state.with_query(search);
            }
            if let Some(language) = language {
                state = state.with_language(language);
            }

            match format {
                OutputFormat::Markdown => print!("{}", generate_rankings(&model, &state)),
                OutputFormat::Json => println!("{}", rankings_json(&model, &state)?),
                OutputFormat::Table => print_table(&model, &state),
            }
            Ok(())
        }

        Commands::Show {
            id,
            source,
            history,
            format,
        } => {
            let source = open_source(source.as_deref(), &settings)?;
            let snapshot = fetch_framework(source.as_ref(), &id)
                .await
                .with_context(|| format!("Failed to load results from {}", source.describe()))?
                .with_context(|| format!("Framework '{id}' not found"))?;

            let history = if history {
                let store = SnapshotStore::new(ResultsLayout::new(&settings.results_dir));
                store.history(&FrameworkId::parse(id.as_str())?)?
            } else {
                Vec::new()
            };

            match format {
                OutputFormat::Json => {
                    let value = serde_json::json!({ "latest": snapshot, "history": history });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                OutputFormat::Markdown | OutputFormat::Table => {
                    print!("{}", generate_detailed_report(&snapshot));
                    if !history.is_empty() {
                        println!();
                        print!("{}", generate_history(&history));
                    }
                }
            }
            Ok(())
        }

        Commands::Status { detailed } => {
            println!("BenchHub Results");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Results directory: {}", settings.results_dir.display());
            println!("Contract file: {}", settings.contract_file.display());
            println!("Version policy: {}", settings.version_policy);

            match read_contract(&settings.contract_file) {
                Ok(contract) => println!("Contract version: {}", contract.version),
                Err(e) => println!("Contract version: {} ({e})", "unavailable".red()),
            }

            let layout = ResultsLayout::new(&settings.results_dir);
            match read_index(layout.index_path()) {
                Ok(index) => {
                    println!(
                        "Index: {} frameworks, generated {}, contract version {}",
                        index.frameworks.len(),
                        format_date(&index.generated_at),
                        index.contract_version
                    );
                }
                Err(_) => println!("Index: {}", NO_RESULTS),
            }

            if detailed {
                let store = SnapshotStore::new(layout);
                if store.layout().frameworks_dir().is_dir() {
                    println!("\nFrameworks:");
                    for (name, _) in store.framework_dirs()? {
                        match FrameworkId::parse(name.as_str()) {
                            Ok(id) => println!("  - {}: {} snapshots", id, store.files(&id)?.len()),
                            Err(e) => println!("  - {}: {}", name, e.to_string().red()),
                        }
                    }
                }
            }

            Ok(())
        }
    }
}

fn rankings_json(model: &ViewModel, state: &ViewState) -> Result<String> {
    Ok(serde_json::to_string_pretty(&model.rankings(state))?)
}

fn print_table(model: &ViewModel, state: &ViewState) {
    let rows = match model.view(state) {
        ViewOutcome::NoResults => {
            println!("{}", NO_RESULTS.yellow());
            return;
        }
        ViewOutcome::NoMatches => {
            println!("{}", NO_MATCHES.yellow());
            return;
        }
        ViewOutcome::Rows(rows) => rows,
    };

    let scenario = state.sort_key.scenario().unwrap_or(Scenario::Plaintext);
    let header = format!(
        "{:>4}  {:<24} {:<20} {:>10} {:>10} {:>10}  {}",
        "#",
        "Framework",
        "Language",
        format!("{} rps", scenario),
        "projected",
        "p95",
        "Measured"
    );
    println!("{}", header.bold());

    for ranked in &rows {
        let row = ranked.row;
        let figures = row.figures(scenario);
        let (rps, projected, p95) = if figures.measured {
            (
                format_number(figures.requests_per_sec),
                format_number(figures.projected_rps),
                format_latency(figures.p95),
            )
        } else {
            ("n/a".to_string(), "n/a".to_string(), "n/a".to_string())
        };
        println!(
            "{:>4}  {:<24} {:<20} {:>10} {:>10} {:>10}  {}",
            ranked.rank,
            row.framework,
            row.language,
            rps,
            projected,
            p95,
            format_date(&row.measured_at)
        );
    }

    if let Some(leader) = model.leader(scenario) {
        println!(
            "\nFastest {}: {} ({} req/s)",
            scenario.label(),
            leader.framework.green(),
            format_number(leader.throughput(scenario))
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchhub_core::Percentile;

    #[test]
    fn test_parse_rank_command() {
        let cli = Cli::try_parse_from([
            "benchhub", "rank", "--sort", "json_p95", "--direction", "desc", "-q", "bun",
            "--format", "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Rank {
                sort,
                direction,
                search,
                format,
                ..
            } => {
                assert_eq!(sort, SortKey::Latency(Scenario::Json, Percentile::P95));
                assert_eq!(direction, Some(SortDirection::Desc));
                assert_eq!(search.as_deref(), Some("bun"));
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_sort_key() {
        assert!(Cli::try_parse_from(["benchhub", "rank", "--sort", "graphql_rps"]).is_err());
    }

    #[test]
    fn test_parse_merge_policy() {
        let cli =
            Cli::try_parse_from(["benchhub", "merge", "--version-policy", "reject"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Merge {
                version_policy: Some(VersionPolicy::Reject),
                ..
            }
        ));
    }

    #[test]
    fn test_rankings_json_distinguishes_empty_states() {
        let state = ViewState::default();
        let json = rankings_json(&ViewModel::unavailable(), &state).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "no_results");
        assert_eq!(value["frameworks"].as_array().unwrap().len(), 0);
        assert_eq!(value["sort"], "plaintext_rps");
    }

    #[tokio::test]
    async fn test_merge_then_rank_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        let contract = dir.path().join("contract.json");
        std::fs::write(&contract, r#"{ "version": 1 }"#).unwrap();

        let cli = Cli::try_parse_from([
            "benchhub",
            "merge",
            "--results-dir",
            results.to_str().unwrap(),
            "--contract",
            contract.to_str().unwrap(),
        ])
        .unwrap();
        execute(cli).await.unwrap();
        assert!(results.join("index.json").is_file());

        let cli = Cli::try_parse_from([
            "benchhub",
            "rank",
            "--source",
            dir.path().to_str().unwrap(),
            "--format",
            "json",
        ])
        .unwrap();
        execute(cli).await.unwrap();
    }
}
