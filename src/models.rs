//! Data models for the hours ledger.
//!
//! This module contains the canonical project record and every value
//! derived from it: per-project metrics, distribution shares, comparison
//! rows and portfolio totals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated, defaulted project record.
///
/// Produced only by the normalizer, so hour figures are always finite and
/// non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    /// Stable identifier, unique within a collection.
    pub id: String,
    /// Display label (empty when the backend sent none).
    pub name: String,
    /// Planned/estimated hour budget.
    pub allocated_hours: f64,
    /// Approved/logged hours, rounded to 2 decimal places.
    pub consumed_hours: f64,
    /// First day of the project.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Last day of the project; `None` for open-ended projects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl ProjectRecord {
    /// Creates a record with the given hours and no dates.
    #[cfg(test)]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        allocated_hours: f64,
        consumed_hours: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            allocated_hours,
            consumed_hours,
            start_date: None,
            end_date: None,
        }
    }

    /// Returns true when the project has no end date.
    pub fn is_open_ended(&self) -> bool {
        self.end_date.is_none()
    }

    /// Label used in reports: the name, or the id when the name is empty.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Budget state of a single project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Consumed hours are at or below the allocation.
    OnBudget,
    /// Consumed hours strictly exceed the allocation.
    OverAllocated,
}

impl fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetStatus::OnBudget => write!(f, "On budget"),
            BudgetStatus::OverAllocated => write!(f, "Over allocated"),
        }
    }
}

impl BudgetStatus {
    /// Returns an emoji representation of the status.
    pub fn emoji(&self) -> &'static str {
        match self {
            BudgetStatus::OnBudget => "🟢",
            BudgetStatus::OverAllocated => "🔴",
        }
    }
}

/// Metrics derived from one [`ProjectRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetrics {
    /// Id of the source record.
    pub id: String,
    /// Consumed/allocated as a rounded percentage; 0 when nothing is allocated.
    pub progress_percent: i64,
    /// Progress capped at 100, the fill width of a progress bar.
    pub progress_bar_percent: i64,
    /// Hours left in the budget, never negative.
    pub remaining_hours: f64,
    /// True iff consumed hours strictly exceed allocated hours.
    pub over_allocated: bool,
    /// `progress_percent - 100`, only when over-allocated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub over_budget_percent: Option<i64>,
}

impl ProjectMetrics {
    pub fn status(&self) -> BudgetStatus {
        if self.over_allocated {
            BudgetStatus::OverAllocated
        } else {
            BudgetStatus::OnBudget
        }
    }
}

/// A project's share of the collection's total allocated hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionShare {
    pub id: String,
    pub name: String,
    pub allocated_hours: f64,
    /// Independently rounded percentage of the total.
    pub share_percent: i64,
}

/// Side-by-side hours of one project, for bar comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoursComparison {
    pub id: String,
    pub name: String,
    pub allocated_hours: f64,
    pub consumed_hours: f64,
    pub remaining_hours: f64,
    pub over_allocated: bool,
}

/// Collection-level totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTotals {
    /// Number of projects in the collection.
    pub project_count: usize,
    /// Number of over-allocated projects.
    pub over_allocated_count: usize,
    /// Sum of allocated hours.
    pub total_allocated_hours: f64,
    /// Sum of consumed hours.
    pub total_consumed_hours: f64,
    /// Sum of per-project remaining hours.
    pub total_remaining_hours: f64,
    /// Total consumed over total allocated, as a rounded percentage.
    pub overall_progress_percent: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_label_falls_back_to_id() {
        let named = ProjectRecord::new("p1", "Website Redesign", 120.0, 85.0);
        assert_eq!(named.label(), "Website Redesign");

        let unnamed = ProjectRecord::new("p2", "", 10.0, 0.0);
        assert_eq!(unnamed.label(), "p2");
    }

    #[test]
    fn test_record_open_ended() {
        let mut record = ProjectRecord::new("p1", "Mobile App", 160.0, 100.0);
        assert!(record.is_open_ended());

        record.end_date = NaiveDate::from_ymd_opt(2025, 3, 31);
        assert!(!record.is_open_ended());
    }

    #[test]
    fn test_budget_status_display() {
        assert_eq!(BudgetStatus::OnBudget.to_string(), "On budget");
        assert_eq!(BudgetStatus::OverAllocated.to_string(), "Over allocated");
        assert_eq!(BudgetStatus::OverAllocated.emoji(), "🔴");
    }

    #[test]
    fn test_metrics_status() {
        let metrics = ProjectMetrics {
            id: "p1".to_string(),
            progress_percent: 119,
            progress_bar_percent: 100,
            remaining_hours: 0.0,
            over_allocated: true,
            over_budget_percent: Some(19),
        };
        assert_eq!(metrics.status(), BudgetStatus::OverAllocated);

        let on_budget = ProjectMetrics {
            over_allocated: false,
            over_budget_percent: None,
            ..metrics
        };
        assert_eq!(on_budget.status(), BudgetStatus::OnBudget);
    }

    #[test]
    fn test_metrics_json_omits_absent_over_budget() {
        let metrics = ProjectMetrics {
            id: "p1".to_string(),
            progress_percent: 71,
            progress_bar_percent: 71,
            remaining_hours: 35.0,
            over_allocated: false,
            over_budget_percent: None,
        };
        let json = serde_json::to_string(&metrics).unwrap();
        assert!(!json.contains("over_budget_percent"));
    }
}
