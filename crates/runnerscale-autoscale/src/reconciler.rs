//! Reconciler — the fixed-interval control loop.
//!
//! One cycle: read job counts, read the runner inventory, decide, publish
//! gauges, run the scale command (if any), log a summary. Gauges carry only
//! what was read, so they are refreshed even when the command then fails.
//! A failing read publishes nothing. A failing read or command aborts that
//! cycle only; the loop keeps ticking. Cycles never
//! overlap because the next tick is not awaited until the current cycle,
//! including its blocking scale command, has finished.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use runnerscale_metrics::FleetGauges;
use runnerscale_state::{FleetStore, JobCounts};

use crate::config::ScalingConfig;
use crate::decision::{ScalingAction, decide};
use crate::error::ReconcileError;
use crate::executor::ScaleExecutor;

/// What a completed cycle observed and did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub counts: JobCounts,
    pub active_runners: u32,
    pub action: ScalingAction,
}

/// Drives reconciliation cycles against a store and an executor.
pub struct Reconciler<S, E> {
    store: S,
    executor: E,
    config: Arc<ScalingConfig>,
    gauges: FleetGauges,
}

impl<S: FleetStore, E: ScaleExecutor> Reconciler<S, E> {
    pub fn new(store: S, executor: E, config: Arc<ScalingConfig>, gauges: FleetGauges) -> Self {
        Self {
            store,
            executor,
            config,
            gauges,
        }
    }

    /// Run a single reconciliation cycle.
    pub async fn reconcile_once(&self) -> Result<CycleReport, ReconcileError> {
        let counts = self.store.job_counts().await?;
        let inventory = self.store.inventory(&self.config.runner_prefix).await?;
        let active_runners = inventory.active_count();

        let action = decide(
            &counts,
            active_runners,
            inventory.idle_runner(),
            &self.config,
        );

        self.gauges.publish(&counts, &inventory).await;

        if !action.is_noop() {
            self.executor.apply(&action).await?;
            info!(%action, "scale action applied");
        }

        info!(
            runners = active_runners,
            pending = counts.pending,
            processing = counts.processing,
            waiting = counts.waiting,
            completing = counts.completing,
            %action,
            "reconciliation cycle complete"
        );

        Ok(CycleReport {
            counts,
            active_runners,
            action,
        })
    }

    /// Run the reconciliation loop until shutdown signal.
    ///
    /// The first cycle starts one `interval` after the call.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = interval.as_secs(),
            min_runners = self.config.min_runners,
            max_runners = self.config.max_runners,
            min_pending = self.config.min_pending,
            prefix = %self.config.runner_prefix,
            "reconciler started"
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.reconcile_once().await {
                        log_cycle_error(&e);
                    }
                }
                _ = shutdown.changed() => {
                    info!("reconciler shutting down");
                    break;
                }
            }
        }
    }
}

fn log_cycle_error(err: &ReconcileError) {
    match err {
        ReconcileError::Query(e) => {
            error!(query = e.query().unwrap_or("unknown"), error = %e, "reconciliation failed");
        }
        ReconcileError::Command(e) => {
            error!(
                direction = %e.direction,
                runner = %e.runner,
                exit_code = ?e.exit_code(),
                error = %e,
                "reconciliation failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use runnerscale_state::{JobState, MemoryFleetStore};

    use crate::error::{CommandError, CommandErrorKind, Direction};

    /// Records actions and mirrors them into the memory store, the way a
    /// real provisioning script would register or delete the runner.
    #[derive(Default)]
    struct FakeExecutor {
        store: MemoryFleetStore,
        applied: Mutex<Vec<ScalingAction>>,
        fail: bool,
    }

    impl FakeExecutor {
        fn new(store: MemoryFleetStore) -> Self {
            Self {
                store,
                ..Default::default()
            }
        }

        fn applied(&self) -> Vec<ScalingAction> {
            self.applied.lock().unwrap().clone()
        }
    }

    impl ScaleExecutor for FakeExecutor {
        async fn apply(&self, action: &ScalingAction) -> Result<(), CommandError> {
            self.applied.lock().unwrap().push(action.clone());
            if self.fail {
                return Err(CommandError {
                    direction: Direction::Up,
                    runner: "runner1".into(),
                    command: PathBuf::from("up"),
                    kind: CommandErrorKind::TimedOut(Duration::from_secs(1)),
                });
            }
            match action {
                ScalingAction::NoOp => {}
                ScalingAction::ScaleUp { index } => {
                    self.store.add_runner(&format!("runner{index}"));
                }
                ScalingAction::ScaleDown { runner } => {
                    self.store.remove_runner(runner);
                }
            }
            Ok(())
        }
    }

    fn config(min_runners: u32, max_runners: u32) -> Arc<ScalingConfig> {
        Arc::new(ScalingConfig {
            min_runners,
            max_runners,
            min_pending: 10,
            up_command: "up".into(),
            down_command: "down".into(),
            ..Default::default()
        })
    }

    fn reconciler(
        store: &MemoryFleetStore,
        executor: FakeExecutor,
        config: Arc<ScalingConfig>,
    ) -> (Reconciler<MemoryFleetStore, FakeExecutor>, FleetGauges) {
        let gauges = FleetGauges::new();
        (
            Reconciler::new(store.clone(), executor, config, gauges.clone()),
            gauges,
        )
    }

    #[tokio::test]
    async fn deep_queue_scales_up_one_runner() {
        let store = MemoryFleetStore::new();
        let r1 = store.add_runner("runner1");
        store.add_job(Some(r1), JobState::Processing);
        store.add_jobs(12, JobState::Pending);

        let (rec, gauges) = reconciler(&store, FakeExecutor::new(store.clone()), config(0, 5));
        let report = rec.reconcile_once().await.unwrap();

        assert_eq!(report.action, ScalingAction::ScaleUp { index: 2 });
        assert_eq!(report.active_runners, 1);
        assert_eq!(report.counts.pending, 12);
        assert_eq!(rec.executor.applied(), vec![ScalingAction::ScaleUp { index: 2 }]);

        // Gauges reflect what was read, before the new runner registered.
        let snap = gauges.snapshot().await;
        assert_eq!(snap.runners_total, Some(1));
    }

    #[tokio::test]
    async fn quiet_queue_removes_idle_runner() {
        let store = MemoryFleetStore::new();
        let r1 = store.add_runner("runner1");
        store.add_runner("runner2");
        store.add_job(Some(r1), JobState::Processing);
        store.add_jobs(2, JobState::Pending);
        store.add_jobs(3, JobState::Waiting);

        let (rec, _) = reconciler(&store, FakeExecutor::new(store.clone()), config(1, 5));
        let report = rec.reconcile_once().await.unwrap();

        assert_eq!(
            report.action,
            ScalingAction::ScaleDown {
                runner: "runner2".into()
            }
        );
        assert_eq!(store.runner_names("runner").await.unwrap(), vec!["runner1"]);
    }

    #[tokio::test]
    async fn busy_fleet_is_left_alone() {
        let store = MemoryFleetStore::new();
        let r1 = store.add_runner("runner1");
        let r2 = store.add_runner("runner2");
        store.add_job(Some(r1), JobState::Processing);
        store.add_job(Some(r2), JobState::Completing);

        let (rec, gauges) = reconciler(&store, FakeExecutor::new(store.clone()), config(1, 5));
        let report = rec.reconcile_once().await.unwrap();

        assert_eq!(report.action, ScalingAction::NoOp);
        assert!(rec.executor.applied().is_empty());
        assert_eq!(gauges.snapshot().await.runners_total, Some(2));
    }

    #[tokio::test]
    async fn runners_outside_prefix_are_ignored() {
        let store = MemoryFleetStore::new();
        store.add_runner("static-gpu");
        store.add_runner("runner1");

        let (rec, gauges) = reconciler(&store, FakeExecutor::new(store.clone()), config(1, 5));
        let report = rec.reconcile_once().await.unwrap();

        assert_eq!(report.active_runners, 1);
        assert_eq!(report.action, ScalingAction::NoOp);
        assert!(!gauges.snapshot().await.runners_active.contains_key("static-gpu"));
    }

    #[tokio::test]
    async fn store_failure_aborts_cycle_without_publishing() {
        let store = MemoryFleetStore::new();
        store.add_jobs(12, JobState::Pending);
        store.set_unavailable(true);

        let (rec, gauges) = reconciler(&store, FakeExecutor::new(store.clone()), config(0, 5));
        let err = rec.reconcile_once().await.unwrap_err();

        assert!(matches!(err, ReconcileError::Query(_)));
        assert!(rec.executor.applied().is_empty());
        assert_eq!(gauges.snapshot().await.runners_total, None);
    }

    #[tokio::test]
    async fn command_failure_still_refreshes_gauges() {
        let store = MemoryFleetStore::new();
        store.add_runner("runner1");
        store.add_jobs(12, JobState::Pending);

        let executor = FakeExecutor {
            fail: true,
            ..FakeExecutor::new(store.clone())
        };
        let (rec, gauges) = reconciler(&store, executor, config(0, 5));
        let err = rec.reconcile_once().await.unwrap_err();

        assert!(matches!(err, ReconcileError::Command(_)));
        let snap = gauges.snapshot().await;
        assert_eq!(snap.runners_total, Some(1));
        assert_eq!(snap.jobs.get(&JobState::Pending), Some(&12));

        // A later failure still reports the fleet as it was read.
        store.add_jobs(3, JobState::Pending);
        assert!(rec.reconcile_once().await.is_err());
        assert_eq!(gauges.snapshot().await.jobs.get(&JobState::Pending), Some(&15));
    }

    #[tokio::test(start_paused = true)]
    async fn run_ticks_serially_until_shutdown() {
        let store = MemoryFleetStore::new();
        store.add_jobs(12, JobState::Pending);

        let (rec, _) = reconciler(&store, FakeExecutor::new(store.clone()), config(0, 5));
        let rec = Arc::new(rec);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let rec = Arc::clone(&rec);
            async move { rec.run(Duration::from_secs(60), rx).await }
        });

        // Ticks at 60s and 120s; nothing fires before the first interval.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(rec.executor.applied().is_empty());
        tokio::time::sleep(Duration::from_secs(120)).await;

        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(
            rec.executor.applied(),
            vec![
                ScalingAction::ScaleUp { index: 1 },
                ScalingAction::ScaleUp { index: 2 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn run_survives_failed_cycle() {
        let store = MemoryFleetStore::new();
        store.add_jobs(12, JobState::Pending);
        store.set_unavailable(true);

        let (rec, _) = reconciler(&store, FakeExecutor::new(store.clone()), config(0, 5));
        let rec = Arc::new(rec);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let rec = Arc::clone(&rec);
            async move { rec.run(Duration::from_secs(60), rx).await }
        });

        // First tick (60s) fails; the store recovers before the second (120s).
        tokio::time::sleep(Duration::from_secs(90)).await;
        store.set_unavailable(false);
        tokio::time::sleep(Duration::from_secs(60)).await;

        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(rec.executor.applied(), vec![ScalingAction::ScaleUp { index: 1 }]);
    }
}
