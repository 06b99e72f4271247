//! Immutable snapshots of one payload and everything derived from it.
//!
//! A refresh never patches a published snapshot. It builds a new one and
//! swaps it in whole, so readers cannot mix metrics from one fetch with
//! records from another.

use crate::analysis;
use crate::error::{FieldWarning, RecordError};
use crate::models::{
    DistributionShare, HoursComparison, PortfolioTotals, ProjectMetrics, ProjectRecord,
};
use crate::normalize::{normalize_batch, FieldAliases};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// One normalized collection with all derived values.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Fetch generation this snapshot was built from.
    pub generation: u64,
    /// When the snapshot was built.
    pub built_at: DateTime<Utc>,
    /// Canonical records, in payload order.
    pub records: Vec<ProjectRecord>,
    /// Metrics, index-aligned with `records`.
    pub metrics: Vec<ProjectMetrics>,
    /// Allocated-hours distribution.
    pub distribution: Vec<DistributionShare>,
    /// How far the distribution sums away from 100.
    pub distribution_drift: i64,
    /// Allocated/consumed/remaining per project.
    pub comparison: Vec<HoursComparison>,
    pub totals: PortfolioTotals,
    /// Raw records excluded during normalization.
    pub rejected: Vec<RecordError>,
    /// Field problems recovered during normalization.
    pub warnings: Vec<FieldWarning>,
}

impl Snapshot {
    /// Run a raw payload through normalization, derivation and aggregation.
    pub fn build(generation: u64, raw: &[Value], aliases: &FieldAliases) -> Self {
        let batch = normalize_batch(raw, aliases);
        let records = batch.records;

        let metrics = analysis::derive_all(&records);
        let distribution = analysis::aggregate(&records);
        let distribution_drift = analysis::share_drift(&distribution);
        let comparison = analysis::comparison_summary(&records);
        let totals = analysis::portfolio_totals(&records);

        debug!(
            "Built snapshot #{}: {} projects, drift {}",
            generation,
            records.len(),
            distribution_drift
        );

        Self {
            generation,
            built_at: Utc::now(),
            records,
            metrics,
            distribution,
            distribution_drift,
            comparison,
            totals,
            rejected: batch.rejected,
            warnings: batch.warnings,
        }
    }

    /// An empty snapshot, used before the first fetch completes.
    pub fn empty() -> Self {
        Self::build(0, &[], &FieldAliases::default())
    }

    /// Records paired with their metrics.
    pub fn projects(&self) -> impl Iterator<Item = (&ProjectRecord, &ProjectMetrics)> {
        self.records.iter().zip(self.metrics.iter())
    }

    /// Ids of over-allocated projects, in payload order.
    pub fn over_allocated(&self) -> Vec<&str> {
        analysis::over_allocated_projects(&self.metrics)
    }
}

/// Holds the latest published snapshot.
///
/// Generations are handed out when a fetch starts; a snapshot is only
/// accepted when its generation is newer than the published one, so a slow
/// superseded fetch cannot overwrite fresher data.
pub struct SnapshotStore {
    tx: watch::Sender<Arc<Snapshot>>,
    next_generation: AtomicU64,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(Snapshot::empty()));
        Self {
            tx,
            next_generation: AtomicU64::new(1),
        }
    }

    /// Reserve the generation number for a fetch that is about to start.
    pub fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::SeqCst)
    }

    /// Publish a snapshot. Returns `false` when it is stale and was dropped.
    pub fn publish(&self, snapshot: Snapshot) -> bool {
        let generation = snapshot.generation;
        let snapshot = Arc::new(snapshot);

        let accepted = self.tx.send_if_modified(|current| {
            if generation > current.generation {
                *current = snapshot;
                true
            } else {
                false
            }
        });

        if accepted {
            info!("Published snapshot #{}", generation);
        } else {
            debug!("Dropped stale snapshot #{}", generation);
        }

        accepted
    }

    /// The latest published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Vec<Value> {
        vec![
            json!({ "id": "web", "name": "Website Redesign", "estimated_hours": 120, "approved_hours": 85 }),
            json!({ "id": "app", "name": "Mobile App", "estimated_hours": 160, "approved_hours": 100 }),
            json!({ "id": "db", "name": "Database Migration", "estimated_hours": 80, "approved_hours": 95 }),
            json!({ "name": "Orphan", "estimated_hours": 10 }),
        ]
    }

    #[test]
    fn test_build_snapshot() {
        let snapshot = Snapshot::build(1, &payload(), &FieldAliases::default());

        assert_eq!(snapshot.records.len(), 3);
        assert_eq!(snapshot.metrics.len(), 3);
        assert_eq!(snapshot.rejected, vec![RecordError::MissingIdentifier { index: 3 }]);

        let progress: Vec<_> = snapshot.metrics.iter().map(|m| m.progress_percent).collect();
        assert_eq!(progress, vec![71, 63, 119]);

        let shares: Vec<_> = snapshot.distribution.iter().map(|s| s.share_percent).collect();
        assert_eq!(shares, vec![33, 44, 22]);
        assert_eq!(snapshot.distribution_drift, -1);

        assert_eq!(snapshot.totals.over_allocated_count, 1);
        assert_eq!(snapshot.over_allocated(), vec!["db"]);
    }

    #[test]
    fn test_projects_pairs_records_with_metrics() {
        let snapshot = Snapshot::build(1, &payload(), &FieldAliases::default());
        for (record, metrics) in snapshot.projects() {
            assert_eq!(record.id, metrics.id);
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Snapshot::empty();
        assert_eq!(snapshot.generation, 0);
        assert!(snapshot.records.is_empty());
        assert_eq!(snapshot.distribution_drift, 0);
    }

    #[test]
    fn test_store_rejects_stale_snapshot() {
        let store = SnapshotStore::new();
        let older = store.next_generation();
        let newer = store.next_generation();
        assert!(newer > older);

        assert!(store.publish(Snapshot::build(newer, &payload(), &FieldAliases::default())));
        assert!(!store.publish(Snapshot::build(older, &[], &FieldAliases::default())));

        let current = store.current();
        assert_eq!(current.generation, newer);
        assert_eq!(current.records.len(), 3);
    }

    #[test]
    fn test_store_replaces_whole_snapshot() {
        let store = SnapshotStore::new();
        let first = store.next_generation();
        store.publish(Snapshot::build(first, &payload(), &FieldAliases::default()));
        let before = store.current();

        let refreshed = vec![json!({ "id": "web", "estimated_hours": 10, "approved_hours": 20 })];
        let second = store.next_generation();
        assert!(store.publish(Snapshot::build(second, &refreshed, &FieldAliases::default())));

        let after = store.current();
        assert_eq!(before.records.len(), 3);
        assert_eq!(after.records.len(), 1);
        assert!(after.metrics[0].over_allocated);
        assert_eq!(after.distribution[0].share_percent, 100);
    }
}
