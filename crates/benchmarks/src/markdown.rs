//! Markdown output generation.
//!
//! Renders ranking tables, per-framework detail reports and snapshot
//! history as markdown for the CLI and for publishing alongside results.

use crate::format::{format_date, format_datetime, format_latency, format_number};
use crate::view::{projected_throughput, FrameworkRow, ViewModel, ViewOutcome, ViewState};
use benchhub_core::{Scenario, Snapshot};
use std::fmt::Write;

/// Message shown when no index could be read or it lists no framework.
pub const NO_RESULTS: &str = "No benchmark results available yet.";

/// Message shown when the filter removed every framework.
pub const NO_MATCHES: &str = "No frameworks match the current filter.";

const TABLE_SCENARIOS: [Scenario; 2] = [Scenario::Plaintext, Scenario::Json];

fn throughput_cell(row: &FrameworkRow, scenario: Scenario) -> String {
    match row.metric(scenario) {
        Some(m) => format_number(m.requests_per_sec),
        None => "n/a".to_string(),
    }
}

fn p95_cell(row: &FrameworkRow, scenario: Scenario) -> String {
    match row.metric(scenario) {
        Some(m) => format_latency(m.latency_ms.p95),
        None => "n/a".to_string(),
    }
}

/// Generate the ranking table for a view.
pub fn generate_rankings(model: &ViewModel, state: &ViewState) -> String {
    let mut output = String::new();

    writeln!(output, "# HTTP Framework Benchmarks").unwrap();
    writeln!(output).unwrap();

    let rows = match model.view(state) {
        ViewOutcome::NoResults => {
            writeln!(output, "{NO_RESULTS}").unwrap();
            return output;
        }
        ViewOutcome::NoMatches => {
            writeln!(output, "{NO_MATCHES}").unwrap();
            return output;
        }
        ViewOutcome::Rows(rows) => rows,
    };

    writeln!(output, "Sorted by `{}` ({})", state.sort_key, state.direction).unwrap();
    writeln!(output).unwrap();

    let mut header = String::from("| # | Framework | Language |");
    let mut divider = String::from("|---|-----------|----------|");
    for scenario in TABLE_SCENARIOS {
        write!(header, " {0} req/s | {0} p95 |", scenario.label()).unwrap();
        divider.push_str("------:|------:|");
    }
    header.push_str(" Measured |");
    divider.push_str("----------|");
    writeln!(output, "{header}").unwrap();
    writeln!(output, "{divider}").unwrap();

    for ranked in &rows {
        let row = ranked.row;
        let name = match &row.url {
            Some(url) => format!("[{}]({})", row.framework, url),
            None => row.framework.clone(),
        };
        write!(output, "| {} | {} | {} |", ranked.rank, name, row.language).unwrap();
        for scenario in TABLE_SCENARIOS {
            write!(
                output,
                " {} | {} |",
                throughput_cell(row, scenario),
                p95_cell(row, scenario)
            )
            .unwrap();
        }
        writeln!(output, " {} |", format_date(&row.measured_at)).unwrap();
    }

    writeln!(output).unwrap();
    writeln!(output, "---").unwrap();
    if let Some(meta) = model.meta() {
        writeln!(
            output,
            "Last updated: {} · Contract version: {} · Frameworks: {}/{}",
            format_date(&meta.generated_at),
            meta.contract_version,
            rows.len(),
            model.rows().len()
        )
        .unwrap();
    }
    writeln!(
        output,
        "Results were measured at different times and may not be directly comparable."
    )
    .unwrap();

    output
}

/// Generate the detail report for one snapshot.
pub fn generate_detailed_report(snapshot: &Snapshot) -> String {
    let mut output = String::new();

    writeln!(output, "# {}", snapshot.framework).unwrap();
    writeln!(output).unwrap();
    writeln!(output, "**Language:** {}", snapshot.language).unwrap();
    if let Some(url) = &snapshot.url {
        writeln!(output, "**Documentation:** {url}").unwrap();
    }
    writeln!(
        output,
        "**Last measured:** {}",
        format_datetime(&snapshot.measured_at)
    )
    .unwrap();
    writeln!(output).unwrap();

    for (scenario, metric) in &snapshot.benchmarks {
        let label = scenario
            .parse::<Scenario>()
            .map(|s| s.label().to_string())
            .unwrap_or_else(|_| scenario.clone());
        writeln!(output, "## {label}").unwrap();
        writeln!(output).unwrap();
        writeln!(
            output,
            "- Projected: {} req/s (measured: {} req/s)",
            format_number(projected_throughput(metric.requests_per_sec)),
            format_number(metric.requests_per_sec)
        )
        .unwrap();
        writeln!(
            output,
            "- Latency: p50 {} · p95 {} · p99 {}",
            format_latency(metric.latency_ms.p50),
            format_latency(metric.latency_ms.p95),
            format_latency(metric.latency_ms.p99)
        )
        .unwrap();
        writeln!(output, "- Duration: {}s", metric.duration_seconds).unwrap();
        if metric.errors > 0 {
            writeln!(output, "- **{} errors during benchmark**", metric.errors).unwrap();
        }
        writeln!(output).unwrap();
    }

    let missing: Vec<&str> = Scenario::ALL
        .iter()
        .filter(|s| snapshot.metric(**s).is_none())
        .map(|s| s.label())
        .collect();
    if !missing.is_empty() {
        writeln!(output, "Not measured: {}", missing.join(", ")).unwrap();
        writeln!(output).unwrap();
    }

    writeln!(output, "## Environment Details").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "| OS | CI | oha version | Contract version |").unwrap();
    writeln!(output, "|----|----|-------------|------------------|").unwrap();
    writeln!(
        output,
        "| {} | {} | {} | {} |",
        snapshot.environment.os,
        snapshot.environment.ci_label().unwrap_or("N/A"),
        snapshot.environment.oha_version,
        snapshot.contract_version
    )
    .unwrap();

    output
}

/// Generate a history table, newest snapshot first.
pub fn generate_history(history: &[Snapshot]) -> String {
    let mut output = String::new();

    writeln!(output, "## History").unwrap();
    writeln!(output).unwrap();
    writeln!(output, "| Measured | Plaintext req/s | JSON req/s | Runner |").unwrap();
    writeln!(output, "|----------|----------------:|-----------:|--------|").unwrap();
    for snapshot in history {
        let rps = |s: Scenario| {
            snapshot
                .metric(s)
                .map_or_else(|| "n/a".to_string(), |m| format_number(m.requests_per_sec))
        };
        writeln!(
            output,
            "| {} | {} | {} | {} |",
            format_datetime(&snapshot.measured_at),
            rps(Scenario::Plaintext),
            rps(Scenario::Json),
            snapshot.runner_version
        )
        .unwrap();
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchhub_core::Index;
    use chrono::Utc;
    use serde_json::json;

    fn snapshot(id: &str, benchmarks: serde_json::Value) -> Snapshot {
        serde_json::from_value(json!({
            "framework_id": id,
            "language": "Go",
            "framework": id,
            "measured_at": "2024-02-01T00:00:00Z",
            "contract_version": 1,
            "runner_version": "0.3.0",
            "environment": { "os": "ubuntu-22.04", "ci": "", "oha_version": "1.4.1" },
            "benchmarks": benchmarks,
            "url": "https://gofiber.io"
        }))
        .unwrap()
    }

    fn plaintext(rps: f64, errors: u64) -> serde_json::Value {
        json!({ "plaintext": {
            "duration_seconds": 6.0,
            "requests_per_sec": rps,
            "latency_ms": { "p50": 0.5, "p95": 1.5, "p99": 2.5 },
            "errors": errors
        }})
    }

    #[test]
    fn test_rankings_messages() {
        let empty = generate_rankings(&ViewModel::unavailable(), &ViewState::default());
        assert!(empty.contains(NO_RESULTS));

        let index = Index::new(Utc::now(), 1, Vec::new());
        let model = ViewModel::new(&index, vec![snapshot("fiber", plaintext(1.0, 0))]);
        let filtered = generate_rankings(&model, &ViewState::default().with_query("zig"));
        assert!(filtered.contains(NO_MATCHES));
        assert!(!filtered.contains(NO_RESULTS));
    }

    #[test]
    fn test_rankings_table_marks_unmeasured() {
        let index = Index::new(Utc::now(), 1, Vec::new());
        let model = ViewModel::new(&index, vec![snapshot("fiber", plaintext(45_678.0, 0))]);
        let table = generate_rankings(&model, &ViewState::default());

        assert!(table.contains("| 1 | [fiber](https://gofiber.io) | Go | 45.7K | 1.50ms | n/a | n/a | Feb 1, 2024 |"));
        assert!(table.contains("Contract version: 1"));
    }

    #[test]
    fn test_detailed_report() {
        let report = generate_detailed_report(&snapshot("fiber", plaintext(5_000.0, 3)));
        assert!(report.contains("## Plaintext"));
        assert!(report.contains("Projected: 2.5K req/s (measured: 5.0K req/s)"));
        assert!(report.contains("3 errors during benchmark"));
        assert!(report.contains("Not measured: JSON, Echo POST, Query Params, Path Params"));
        assert!(report.contains("| ubuntu-22.04 | N/A | 1.4.1 | 1 |"));
    }

    #[test]
    fn test_history_lists_every_snapshot() {
        let history = vec![
            snapshot("fiber", plaintext(7_000.0, 0)),
            snapshot("fiber", plaintext(5_000.0, 0)),
        ];
        let table = generate_history(&history);
        assert!(table.contains("| 7.0K | n/a |"));
        assert!(table.contains("| 5.0K | n/a |"));
    }
}
