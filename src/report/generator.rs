//! Markdown and JSON report generation.
//!
//! This module renders a [`Snapshot`] as an hours report: project rows,
//! the hours comparison table and the allocated-hours distribution.

use crate::config::ReportConfig;
use crate::models::{
    DistributionShare, HoursComparison, PortfolioTotals, ProjectMetrics, ProjectRecord,
};
use crate::snapshot::Snapshot;
use anyhow::Result;
use serde::Serialize;

/// Metadata about where the report's data came from.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Payload source (file path, `stdin` or URL).
    pub source: String,
    /// Number of raw records in the payload.
    pub raw_records: usize,
}

/// JSON document layout.
#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: &'a ReportMetadata,
    snapshot: &'a Snapshot,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(
    snapshot: &Snapshot,
    metadata: &ReportMetadata,
    options: &ReportConfig,
) -> String {
    let mut output = String::new();

    output.push_str("# Project Hours Report\n\n");

    output.push_str(&generate_metadata_section(snapshot, metadata));
    output.push_str(&generate_summary_section(&snapshot.totals));
    output.push_str(&generate_projects_section(snapshot));

    if options.include_comparison {
        output.push_str(&generate_comparison_section(&snapshot.comparison));
    }

    if options.include_distribution {
        output.push_str(&generate_distribution_section(
            &snapshot.distribution,
            snapshot.distribution_drift,
        ));
    }

    if options.include_rejected {
        output.push_str(&generate_rejected_section(snapshot));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(snapshot: &Snapshot, metadata: &ReportMetadata) -> Result<String> {
    let report = JsonReport { metadata, snapshot };
    serde_json::to_string_pretty(&report).map_err(Into::into)
}

/// Format an hour figure without trailing zeros (`85`, `12.5`, `3.14`).
pub fn format_hours(hours: f64) -> String {
    let text = format!("{:.2}", hours);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn generate_metadata_section(snapshot: &Snapshot, metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        snapshot.built_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Records Received:** {}\n", metadata.raw_records));
    section.push_str(&format!("- **Projects:** {}\n", snapshot.records.len()));
    if !snapshot.rejected.is_empty() {
        section.push_str(&format!("- **Records Skipped:** {}\n", snapshot.rejected.len()));
    }
    if !snapshot.warnings.is_empty() {
        section.push_str(&format!("- **Field Warnings:** {}\n", snapshot.warnings.len()));
    }
    section.push('\n');

    section
}

fn generate_summary_section(totals: &PortfolioTotals) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Projects | Over Allocated | Estimated | Approved | Remaining | Progress |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {}h | {}h | {}h | {}% |\n\n",
        totals.project_count,
        totals.over_allocated_count,
        format_hours(totals.total_allocated_hours),
        format_hours(totals.total_consumed_hours),
        format_hours(totals.total_remaining_hours),
        totals.overall_progress_percent,
    ));

    section
}

fn generate_projects_section(snapshot: &Snapshot) -> String {
    let mut section = String::new();

    section.push_str("## Projects\n\n");

    if snapshot.records.is_empty() {
        section.push_str("No projects to report.\n\n");
        return section;
    }

    for (record, metrics) in snapshot.projects() {
        section.push_str(&generate_project_block(record, metrics));
    }

    section
}

fn generate_project_block(record: &ProjectRecord, metrics: &ProjectMetrics) -> String {
    let mut block = String::new();
    let status = metrics.status();

    block.push_str(&format!("### {} {}\n\n", status.emoji(), record.label()));

    block.push_str(&format!(
        "- **Estimated:** {}h | **Approved:** {}h | **Remaining:** {}h\n",
        format_hours(record.allocated_hours),
        format_hours(record.consumed_hours),
        format_hours(metrics.remaining_hours),
    ));

    if let Some(start) = record.start_date {
        if record.is_open_ended() {
            block.push_str(&format!("- **Dates:** {} (open-ended)\n", start));
        } else if let Some(end) = record.end_date {
            block.push_str(&format!("- **Dates:** {} to {}\n", start, end));
        }
    }

    block.push_str(&format!(
        "- **Progress:** `{}` {}% of hour budget\n",
        progress_bar(metrics.progress_bar_percent),
        metrics.progress_percent
    ));

    if let Some(over) = metrics.over_budget_percent {
        block.push_str(&format!(
            "\n> ⚠️ **Overbudget!** Project is over allocated by {}%\n",
            over
        ));
    }

    block.push('\n');

    block
}

/// Text progress bar, 20 cells wide.
fn progress_bar(percent: i64) -> String {
    let filled = (percent.clamp(0, 100) as usize * 20 + 50) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(20 - filled))
}

fn generate_comparison_section(rows: &[HoursComparison]) -> String {
    let mut section = String::new();

    section.push_str("## Project Hours Overview\n\n");

    if rows.is_empty() {
        section.push_str("No projects to compare.\n\n");
        return section;
    }

    section.push_str("| Project | Estimated | Actual | Remaining |\n");
    section.push_str("|:---|---:|---:|---:|\n");

    for row in rows {
        let actual = if row.over_allocated {
            format!("**{}h**", format_hours(row.consumed_hours))
        } else {
            format!("{}h", format_hours(row.consumed_hours))
        };
        let label = if row.name.is_empty() { &row.id } else { &row.name };
        section.push_str(&format!(
            "| {} | {}h | {} | {}h |\n",
            label,
            format_hours(row.allocated_hours),
            actual,
            format_hours(row.remaining_hours),
        ));
    }
    section.push('\n');

    section
}

fn generate_distribution_section(shares: &[DistributionShare], drift: i64) -> String {
    let mut section = String::new();

    section.push_str("## Estimated Hours Distribution\n\n");

    if shares.is_empty() {
        section.push_str("No projects to distribute.\n\n");
        return section;
    }

    section.push_str("| Project | Estimated | Share |\n");
    section.push_str("|:---|---:|---:|\n");

    for share in shares {
        let label = if share.name.is_empty() { &share.id } else { &share.name };
        section.push_str(&format!(
            "| {} | {}h | {}% |\n",
            label,
            format_hours(share.allocated_hours),
            share.share_percent
        ));
    }
    section.push('\n');

    if drift != 0 {
        section.push_str(&format!(
            "*Shares are rounded per project and sum to {}%.*\n\n",
            100 + drift
        ));
    }

    section
}

fn generate_rejected_section(snapshot: &Snapshot) -> String {
    if snapshot.rejected.is_empty() && snapshot.warnings.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Data Problems\n\n");

    for rejected in &snapshot.rejected {
        section.push_str(&format!("- Skipped: {}\n", rejected));
    }
    for warning in &snapshot.warnings {
        section.push_str(&format!("- Warning: {}\n", warning));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    "---\n\n*Report generated by hourledger*\n".to_string()
}
