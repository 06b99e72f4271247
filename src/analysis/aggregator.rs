//! Collection-level rollups.
//!
//! This module combines projects of one collection for comparative
//! displays: allocated-hours distribution, side-by-side hour comparison
//! and portfolio totals. Every function preserves input order, which the
//! presentation layer relies on for legend order and color cycling.

use crate::analysis::metrics::{derive_metrics, percent_of};
use crate::models::{
    DistributionShare, HoursComparison, PortfolioTotals, ProjectMetrics, ProjectRecord,
};

/// Each project's share of the total allocated hours.
///
/// Shares are rounded independently; their sum may drift from 100 and is
/// left as is.
pub fn aggregate(records: &[ProjectRecord]) -> Vec<DistributionShare> {
    let scale = overflow_scale(records.iter().map(|r| r.allocated_hours));
    let total: f64 = records.iter().map(|r| r.allocated_hours / scale).sum();

    records
        .iter()
        .map(|r| DistributionShare {
            id: r.id.clone(),
            name: r.name.clone(),
            allocated_hours: r.allocated_hours,
            share_percent: percent_of(r.allocated_hours / scale, total),
        })
        .collect()
}

/// Divisor that keeps the sum of `values` finite.
///
/// 1 whenever the plain sum fits in an `f64`, so ordinary inputs are
/// divided by nothing. Otherwise the largest value, which bounds every
/// scaled term by 1.
fn overflow_scale(values: impl Iterator<Item = f64> + Clone) -> f64 {
    if values.clone().sum::<f64>().is_finite() {
        1.0
    } else {
        values.fold(0.0, f64::max)
    }
}

/// How far the rounded shares sum away from 100.
///
/// 0 for an empty collection or one with nothing allocated.
pub fn share_drift(shares: &[DistributionShare]) -> i64 {
    if shares.iter().all(|s| s.allocated_hours == 0.0) {
        return 0;
    }
    shares.iter().map(|s| s.share_percent).sum::<i64>() - 100
}

/// Allocated, consumed and remaining hours per project.
pub fn comparison_summary(records: &[ProjectRecord]) -> Vec<HoursComparison> {
    records
        .iter()
        .map(|r| {
            let metrics = derive_metrics(r);
            HoursComparison {
                id: r.id.clone(),
                name: r.name.clone(),
                allocated_hours: r.allocated_hours,
                consumed_hours: r.consumed_hours,
                remaining_hours: metrics.remaining_hours,
                over_allocated: metrics.over_allocated,
            }
        })
        .collect()
}

/// Totals across the whole collection.
pub fn portfolio_totals(records: &[ProjectRecord]) -> PortfolioTotals {
    let mut totals = PortfolioTotals {
        project_count: records.len(),
        ..PortfolioTotals::default()
    };

    for record in records {
        let metrics = derive_metrics(record);
        totals.total_allocated_hours += record.allocated_hours;
        totals.total_consumed_hours += record.consumed_hours;
        totals.total_remaining_hours += metrics.remaining_hours;
        if metrics.over_allocated {
            totals.over_allocated_count += 1;
        }
    }

    let scale = overflow_scale(
        records
            .iter()
            .flat_map(|r| [r.allocated_hours, r.consumed_hours]),
    );
    let allocated: f64 = records.iter().map(|r| r.allocated_hours / scale).sum();
    let consumed: f64 = records.iter().map(|r| r.consumed_hours / scale).sum();
    totals.overall_progress_percent = percent_of(consumed, allocated);

    totals
}

/// Ids of over-allocated projects, in input order.
pub fn over_allocated_projects(metrics: &[ProjectMetrics]) -> Vec<&str> {
    metrics
        .iter()
        .filter(|m| m.over_allocated)
        .map(|m| m.id.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<ProjectRecord> {
        vec![
            ProjectRecord::new("web", "Website Redesign", 120.0, 85.0),
            ProjectRecord::new("app", "Mobile App", 160.0, 100.0),
            ProjectRecord::new("db", "Database Migration", 80.0, 95.0),
        ]
    }

    #[test]
    fn test_distribution_with_drift() {
        let shares = aggregate(&sample_records());
        let percents: Vec<_> = shares.iter().map(|s| s.share_percent).collect();
        assert_eq!(percents, vec![33, 44, 22]);
        assert_eq!(share_drift(&shares), -1);
    }

    #[test]
    fn test_distribution_preserves_order() {
        let mut records = sample_records();
        records.reverse();
        let shares = aggregate(&records);
        let ids: Vec<_> = shares.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["db", "app", "web"]);
        let percents: Vec<_> = shares.iter().map(|s| s.share_percent).collect();
        assert_eq!(percents, vec![22, 44, 33]);
    }

    #[test]
    fn test_distribution_zero_total() {
        let records = vec![
            ProjectRecord::new("a", "A", 0.0, 5.0),
            ProjectRecord::new("b", "B", 0.0, 0.0),
        ];
        let shares = aggregate(&records);
        assert!(shares.iter().all(|s| s.share_percent == 0));
        assert_eq!(share_drift(&shares), 0);
    }

    #[test]
    fn test_distribution_empty() {
        assert!(aggregate(&[]).is_empty());
        assert_eq!(share_drift(&[]), 0);
    }

    #[test]
    fn test_distribution_within_tolerance() {
        let records: Vec<_> = [1.0, 2.0, 3.0, 7.5, 11.0, 0.0, 13.25]
            .iter()
            .enumerate()
            .map(|(i, &h)| ProjectRecord::new(i.to_string(), "", h, 0.0))
            .collect();
        let total: f64 = records.iter().map(|r| r.allocated_hours).sum();

        for (record, share) in records.iter().zip(aggregate(&records)) {
            let exact = record.allocated_hours / total * 100.0;
            assert!((share.share_percent as f64 - exact).abs() <= 1.0);
        }
    }

    #[test]
    fn test_distribution_total_beyond_f64_range() {
        let records = vec![
            ProjectRecord::new("a", "A", 1e308, 0.0),
            ProjectRecord::new("b", "B", 1e308, 0.0),
        ];
        let shares = aggregate(&records);
        let percents: Vec<_> = shares.iter().map(|s| s.share_percent).collect();
        assert_eq!(percents, vec![50, 50]);
        assert_eq!(share_drift(&shares), 0);

        let uneven = vec![
            ProjectRecord::new("a", "A", 1.5e308, 0.0),
            ProjectRecord::new("b", "B", 5e307, 0.0),
            ProjectRecord::new("c", "C", 10.0, 0.0),
        ];
        let percents: Vec<_> = aggregate(&uneven).iter().map(|s| s.share_percent).collect();
        assert_eq!(percents, vec![75, 25, 0]);
    }

    #[test]
    fn test_single_project_takes_everything() {
        let shares = aggregate(&[ProjectRecord::new("solo", "Solo", 12.0, 0.0)]);
        assert_eq!(shares[0].share_percent, 100);
        assert_eq!(share_drift(&shares), 0);
    }

    #[test]
    fn test_comparison_summary() {
        let rows = comparison_summary(&sample_records());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].remaining_hours, 35.0);
        assert_eq!(rows[1].remaining_hours, 60.0);
        assert_eq!(rows[2].remaining_hours, 0.0);
        assert!(rows[2].over_allocated);
        assert_eq!(rows[2].consumed_hours, 95.0);
    }

    #[test]
    fn test_portfolio_totals() {
        let totals = portfolio_totals(&sample_records());
        assert_eq!(totals.project_count, 3);
        assert_eq!(totals.over_allocated_count, 1);
        assert_eq!(totals.total_allocated_hours, 360.0);
        assert_eq!(totals.total_consumed_hours, 280.0);
        assert_eq!(totals.total_remaining_hours, 95.0);
        // 280 / 360 = 77.8%
        assert_eq!(totals.overall_progress_percent, 78);
    }

    #[test]
    fn test_portfolio_progress_beyond_f64_range() {
        let records = vec![
            ProjectRecord::new("a", "A", 1e308, 5e307),
            ProjectRecord::new("b", "B", 1e308, 5e307),
        ];
        let totals = portfolio_totals(&records);
        assert_eq!(totals.overall_progress_percent, 50);
        assert_eq!(totals.over_allocated_count, 0);
    }

    #[test]
    fn test_portfolio_totals_empty() {
        let totals = portfolio_totals(&[]);
        assert_eq!(totals, PortfolioTotals::default());
    }

    #[test]
    fn test_over_allocated_projects() {
        let metrics: Vec<_> = sample_records().iter().map(derive_metrics).collect();
        assert_eq!(over_allocated_projects(&metrics), vec!["db"]);
    }
}
