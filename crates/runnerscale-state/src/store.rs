//! FleetStore — readers over the PeerTube runner tables.
//!
//! `PgFleetStore` issues parameterized queries against `"runner"` and
//! `"runnerJob"`. The runner prefix is always a bound argument, escaped
//! for `LIKE`, never spliced into the query text.

use std::future::Future;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::types::{JobCounts, JobState, RunnerInventory};

const COUNT_JOBS: &str = r#"SELECT count(id) FROM "runnerJob" WHERE state = $1"#;

// Names sort by byte value (`COLLATE "C"`) whatever the database locale.
const LIST_RUNNERS: &str = r#"SELECT DISTINCT name FROM "runner"
WHERE name LIKE $1 ESCAPE '\'
ORDER BY name COLLATE "C""#;

const IDLE_RUNNER: &str = r#"SELECT r.name FROM "runner" r
WHERE r.name LIKE $1 ESCAPE '\'
  AND NOT EXISTS (
    SELECT 1 FROM "runnerJob" j
    WHERE j."runnerId" = r.id AND j.state IN ($2, $3)
  )
ORDER BY r.name COLLATE "C"
LIMIT 1"#;

/// Read access to queue depth and fleet membership.
///
/// Implementations must be cheap to share between tasks; every method is
/// read-only.
pub trait FleetStore: Send + Sync {
    /// Number of jobs currently in `state`.
    fn count_jobs(&self, state: JobState) -> impl Future<Output = StoreResult<u64>> + Send;

    /// Distinct runner names starting with `prefix`, ascending.
    fn runner_names(&self, prefix: &str)
    -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    /// The first runner (by name) starting with `prefix` that has no job
    /// in a state that occupies it. `None` when every runner is busy.
    fn idle_runner(&self, prefix: &str)
    -> impl Future<Output = StoreResult<Option<String>>> + Send;

    /// Counts for every known state. Aborts on the first failing query.
    fn job_counts(&self) -> impl Future<Output = StoreResult<JobCounts>> + Send {
        async move {
            let mut counts = JobCounts::default();
            for state in JobState::ALL {
                counts.set(state, self.count_jobs(state).await?);
            }
            Ok(counts)
        }
    }

    /// Runner names plus the idle candidate.
    fn inventory(&self, prefix: &str) -> impl Future<Output = StoreResult<RunnerInventory>> + Send {
        async move {
            let runners = self.runner_names(prefix).await?;
            let idle = self.idle_runner(prefix).await?;
            Ok(RunnerInventory::new(runners, idle))
        }
    }
}

/// Escape `prefix` for use as a `LIKE ... ESCAPE '\'` pattern and append `%`.
pub fn like_prefix_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// PostgreSQL-backed fleet store.
#[derive(Clone)]
pub struct PgFleetStore {
    pool: PgPool,
}

impl PgFleetStore {
    /// Connect and verify the database answers a trivial query.
    pub async fn connect(options: PgConnectOptions) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StoreError::Connect)?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(StoreError::Connect)?;

        debug!("fleet store connected");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close the underlying pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl FleetStore for PgFleetStore {
    async fn count_jobs(&self, state: JobState) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar(COUNT_JOBS)
            .bind(state.code())
            .fetch_one(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                query: "count_jobs",
                source,
            })?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn runner_names(&self, prefix: &str) -> StoreResult<Vec<String>> {
        sqlx::query_scalar(LIST_RUNNERS)
            .bind(like_prefix_pattern(prefix))
            .fetch_all(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                query: "runner_names",
                source,
            })
    }

    async fn idle_runner(&self, prefix: &str) -> StoreResult<Option<String>> {
        sqlx::query_scalar(IDLE_RUNNER)
            .bind(like_prefix_pattern(prefix))
            .bind(JobState::Processing.code())
            .bind(JobState::Completing.code())
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| StoreError::Query {
                query: "idle_runner",
                source,
            })
    }
}
