//! Per-project metric derivation.

use crate::models::{ProjectMetrics, ProjectRecord};

/// Rounded percentage of `part` relative to `whole`; 0 when `whole` is 0.
///
/// Rounds half away from zero, once, on the final ratio.
pub fn percent_of(part: f64, whole: f64) -> i64 {
    if whole > 0.0 {
        (part / whole * 100.0).round() as i64
    } else {
        0
    }
}

/// Derive the metrics of a single project.
pub fn derive_metrics(record: &ProjectRecord) -> ProjectMetrics {
    let allocated = record.allocated_hours;
    let consumed = record.consumed_hours;

    let progress_percent = percent_of(consumed, allocated);
    let over_allocated = consumed > allocated;

    ProjectMetrics {
        id: record.id.clone(),
        progress_percent,
        progress_bar_percent: progress_percent.min(100),
        remaining_hours: (allocated - consumed).max(0.0),
        over_allocated,
        over_budget_percent: over_allocated.then(|| progress_percent - 100),
    }
}

/// Derive metrics for every record, in input order.
pub fn derive_all(records: &[ProjectRecord]) -> Vec<ProjectMetrics> {
    records.iter().map(derive_metrics).collect()
}
