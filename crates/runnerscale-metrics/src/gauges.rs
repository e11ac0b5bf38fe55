//! Fleet gauges — point-in-time values overwritten every cycle.
//!
//! The reconciler is the only writer; scrape handlers read concurrently.
//! A publish swaps the whole gauge set under one write lock, so a scrape
//! never observes a half-updated cycle and removed runners vanish at once.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use runnerscale_state::{JobCounts, JobState, RunnerInventory};

/// Values of all gauge families at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GaugeSnapshot {
    /// Active runner count. `None` until the first cycle publishes.
    pub runners_total: Option<u64>,
    /// Presence per runner name.
    pub runners_active: BTreeMap<String, u64>,
    /// Job count per state.
    pub jobs: BTreeMap<JobState, u64>,
}

/// Shared handle to the fleet gauges.
#[derive(Debug, Clone, Default)]
pub struct FleetGauges {
    inner: Arc<RwLock<GaugeSnapshot>>,
}

impl FleetGauges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all gauges with the values read this cycle.
    pub async fn publish(&self, counts: &JobCounts, inventory: &RunnerInventory) {
        let next = GaugeSnapshot {
            runners_total: Some(inventory.runners().len() as u64),
            runners_active: inventory
                .runners()
                .iter()
                .map(|name| (name.clone(), 1))
                .collect(),
            jobs: counts.iter().collect(),
        };

        *self.inner.write().await = next;
        debug!(
            runners = inventory.runners().len(),
            "fleet gauges published"
        );
    }

    /// Copy of the current gauge values.
    pub async fn snapshot(&self) -> GaugeSnapshot {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(pending: u64, processing: u64, waiting: u64, completing: u64) -> JobCounts {
        JobCounts {
            pending,
            processing,
            waiting,
            completing,
        }
    }

    fn inventory(names: &[&str]) -> RunnerInventory {
        RunnerInventory::new(names.iter().map(|n| n.to_string()).collect(), None)
    }

    #[tokio::test]
    async fn empty_before_first_publish() {
        let gauges = FleetGauges::new();
        let snap = gauges.snapshot().await;
        assert_eq!(snap.runners_total, None);
        assert!(snap.runners_active.is_empty());
        assert!(snap.jobs.is_empty());
    }

    #[tokio::test]
    async fn publish_sets_all_families() {
        let gauges = FleetGauges::new();
        gauges
            .publish(&counts(12, 2, 3, 1), &inventory(&["runner1", "runner2"]))
            .await;

        let snap = gauges.snapshot().await;
        assert_eq!(snap.runners_total, Some(2));
        assert_eq!(snap.runners_active.get("runner1"), Some(&1));
        assert_eq!(snap.runners_active.get("runner2"), Some(&1));
        assert_eq!(snap.jobs.get(&JobState::Pending), Some(&12));
        assert_eq!(snap.jobs.get(&JobState::Completing), Some(&1));
    }

    #[tokio::test]
    async fn removed_runner_stops_being_reported() {
        let gauges = FleetGauges::new();
        gauges
            .publish(&counts(0, 0, 0, 0), &inventory(&["runner1", "runner2"]))
            .await;
        gauges
            .publish(&counts(0, 0, 0, 0), &inventory(&["runner1"]))
            .await;

        let snap = gauges.snapshot().await;
        assert_eq!(snap.runners_total, Some(1));
        assert!(!snap.runners_active.contains_key("runner2"));
    }

    #[tokio::test]
    async fn counts_are_set_not_accumulated() {
        let gauges = FleetGauges::new();
        let inv = inventory(&["runner1"]);
        gauges.publish(&counts(10, 0, 0, 0), &inv).await;
        gauges.publish(&counts(4, 0, 0, 0), &inv).await;

        let snap = gauges.snapshot().await;
        assert_eq!(snap.jobs.get(&JobState::Pending), Some(&4));
        assert_eq!(snap.runners_active.get("runner1"), Some(&1));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let gauges = FleetGauges::new();
        let reader = gauges.clone();
        gauges
            .publish(&counts(1, 0, 0, 0), &inventory(&["runner1"]))
            .await;
        assert_eq!(reader.snapshot().await.runners_total, Some(1));
    }
}
