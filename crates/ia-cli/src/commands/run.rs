//! Collection runs: aggregate, export, report.

use anyhow::{Context, Result};
use colored::Colorize;
use ia_connectors::GraphConnector;
use ia_core::{InventoryPipeline, ResourceKind, RunReport};
use ia_export::Exporter;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::OutputFormat;

/// What one run collects and exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// One resource kind.
    Kind(ResourceKind),
    /// Every kind into a single table.
    All,
    /// Every kind folded into the assignment graph.
    Graph,
    /// Every kind, filtered to one group by name.
    Group(String),
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::Kind(kind) => write!(f, "{}", kind),
            Selection::All => f.write_str("all"),
            Selection::Graph => f.write_str("graph"),
            Selection::Group(name) => write!(f, "group '{}'", name),
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub selection: String,
    /// Rows exported; differs from the edge count only for group runs.
    pub rows: usize,
    pub files: Vec<PathBuf>,
    pub report: RunReport,
}

/// Pipeline over the configured Graph tenant.
pub fn build_pipeline(config: &AppConfig) -> Result<InventoryPipeline> {
    let connector = Arc::new(
        GraphConnector::new(config.graph_config())
            .context("Failed to create Graph connector")?,
    );
    Ok(InventoryPipeline::new(
        connector.clone(),
        connector,
        config.pipeline_config(),
    ))
}

/// Runs one aggregation pass for `selection` and writes its export files.
pub async fn run_selection(
    pipeline: &InventoryPipeline,
    exporter: &Exporter,
    selection: &Selection,
) -> Result<RunOutcome> {
    let span = ia_observability::run_span!(selection);
    let report = match selection {
        Selection::Kind(kind) => pipeline.collect(*kind).instrument(span).await,
        _ => pipeline.collect_everything().instrument(span).await,
    };

    let (rows, files) = match selection {
        Selection::Kind(kind) => (
            report.edge_count(),
            exporter.export_kind(*kind, &report.edges)?,
        ),
        Selection::All => (report.edge_count(), exporter.export_all(&report.edges)?),
        Selection::Graph => (report.edge_count(), exporter.export_graph(&report.edges)?),
        Selection::Group(name) => {
            let (matched, files) = exporter.export_group(name, &report.edges)?;
            (matched.len(), files)
        }
    };

    Ok(RunOutcome {
        selection: selection.to_string(),
        rows,
        files,
        report,
    })
}

/// Prints the outcome of a run.
pub fn print_outcome(outcome: &RunOutcome, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    let summary = &outcome.report.summary;
    let elapsed = outcome.report.finished_at - outcome.report.started_at;

    println!();
    println!("{} {}", "Collected:".bold(), outcome.selection.cyan());
    println!("─────────────────────────────");
    for (kind, stats) in &summary.per_kind {
        println!(
            "  {:<26} {:>5} objects {:>6} assignments",
            kind.description(),
            stats.objects,
            stats.edges
        );
    }
    println!(
        "  {:<26} {:>5} objects {:>6} assignments",
        "Total",
        summary.totals.objects,
        summary.totals.edges
    );
    println!(
        "  Group lookups: {}  Elapsed: {:.1}s",
        outcome.report.group_lookups,
        elapsed.num_milliseconds() as f64 / 1000.0
    );

    if outcome.rows != outcome.report.edge_count() {
        println!("  Matching rows: {}", outcome.rows);
    }

    if !summary.is_complete() {
        println!(
            "  {} {} item(s) skipped ({} targets dropped, {} collections failed). See the log for details.",
            "⚠".yellow(),
            summary.diagnostics.len(),
            summary.totals.dropped_targets,
            summary.totals.failed_sources
        );
    }

    for file in &outcome.files {
        println!("  {} {}", "✓".green(), file.display());
    }

    Ok(())
}
