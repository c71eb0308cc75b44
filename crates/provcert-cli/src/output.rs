//! Output formatting

use provcert_checks::CheckReport;
use provcert_summary::{ConsolidatedSummary, ResultSummary};
use provcert_types::{FilterStage, PluginSummary};
use serde::Serialize;
use std::fmt::Write;

use crate::error::CliResult;

/// Output format for the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON document
    Json,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    summary: &'a ConsolidatedSummary,
    checks: &'a CheckReport,
}

/// Render the consolidated summary and the check verdicts.
pub fn render_report(
    summary: &ConsolidatedSummary,
    checks: &CheckReport,
    format: OutputFormat,
) -> CliResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&ReportDocument { summary, checks })?),
        OutputFormat::Text => Ok(render_text(summary, checks)),
    }
}

fn render_text(summary: &ConsolidatedSummary, checks: &CheckReport) -> String {
    let mut out = String::new();

    if let Some(provider) = summary.provider() {
        section(&mut out, "Provider", provider, summary);
    }
    match summary.baseline() {
        Some(baseline) => {
            section(&mut out, "Baseline", baseline, summary);
            if let Some(filters) = summary.filter_report() {
                for plugin in &filters.baseline_skipped {
                    let _ = writeln!(out, "Baseline: not processed for {plugin}");
                }
                if !filters.baseline_skipped.is_empty() {
                    out.push('\n');
                }
            }
        }
        None => out.push_str("Baseline: not processed\n\n"),
    }
    if let Some(filters) = summary.filter_report() {
        match &filters.release {
            Some(release) => {
                let _ = writeln!(
                    out,
                    "Flake corpus: release {} ({} queried, {} excluded, {} errors)\n",
                    release, filters.flake_queries, filters.flaking_excluded, filters.flake_errors
                );
            }
            None => out.push_str("Flake corpus: not queried\n\n"),
        }
    }

    let _ = write!(out, "{checks}");
    out
}

fn section(out: &mut String, title: &str, results: &ResultSummary, summary: &ConsolidatedSummary) {
    let _ = writeln!(out, "{title}: {}", results.source);
    if let Some(version) = results.cluster_version() {
        let _ = writeln!(out, "  Cluster version: {version}");
    }
    for plugin in results.plugins.values() {
        plugin_lines(out, plugin, summary.suite(&plugin.name).is_some());
    }
    for (plugin, error) in &results.plugin_errors {
        let _ = writeln!(out, "  [x] {plugin}: {error}");
    }
    out.push('\n');
}

fn plugin_lines(out: &mut String, plugin: &PluginSummary, filtered: bool) {
    let _ = writeln!(out, "  {} [{}]", plugin.name, plugin.status);
    let _ = writeln!(
        out,
        "      total {}  passed {}  failed {}  timeout {}  skipped {}",
        plugin.total, plugin.passed, plugin.failed, plugin.timeout, plugin.skipped
    );
    if !filtered {
        return;
    }

    let mut stages = format!("raw {}", plugin.failed_list.len());
    for stage in FilterStage::all() {
        if let Some(list) = plugin.filter(*stage) {
            let _ = write!(stages, " -> {} {}", stage.label(), list.len());
        }
    }
    let _ = writeln!(out, "      failures: {stages}");
    for test in plugin.final_failures() {
        let _ = writeln!(out, "        - {test}");
    }
}
