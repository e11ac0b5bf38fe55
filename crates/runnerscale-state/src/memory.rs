//! In-memory fleet store with the same query semantics as PostgreSQL.
//!
//! Used by tests across the workspace. Clones share the same tables so a
//! test can mutate the fleet while a reconciler holds another handle.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{StoreError, StoreResult};
use crate::store::FleetStore;
use crate::types::JobState;

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    /// `"runner"(id, name)`
    runners: Vec<(i64, String)>,
    /// `"runnerJob"(runnerId, state)`
    jobs: Vec<(Option<i64>, JobState)>,
    unavailable: bool,
}

/// Ephemeral fleet store backed by plain vectors.
#[derive(Debug, Clone, Default)]
pub struct MemoryFleetStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryFleetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn available(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        let tables = self.lock();
        if tables.unavailable {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(tables)
    }

    /// Register a runner and return its id.
    pub fn add_runner(&self, name: &str) -> i64 {
        let mut tables = self.lock();
        tables.next_id += 1;
        let id = tables.next_id;
        tables.runners.push((id, name.to_string()));
        id
    }

    /// Remove a runner by name, along with any jobs it holds.
    pub fn remove_runner(&self, name: &str) -> bool {
        let mut tables = self.lock();
        let Some(pos) = tables.runners.iter().position(|(_, n)| n == name) else {
            return false;
        };
        let (id, _) = tables.runners.remove(pos);
        tables.jobs.retain(|(runner, _)| *runner != Some(id));
        true
    }

    /// Queue a job, optionally assigned to a runner.
    pub fn add_job(&self, runner_id: Option<i64>, state: JobState) {
        self.lock().jobs.push((runner_id, state));
    }

    /// Queue `n` unassigned jobs in `state`.
    pub fn add_jobs(&self, n: usize, state: JobState) {
        let mut tables = self.lock();
        tables.jobs.extend(std::iter::repeat_n((None, state), n));
    }

    /// Make every subsequent query fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }
}

impl FleetStore for MemoryFleetStore {
    async fn count_jobs(&self, state: JobState) -> StoreResult<u64> {
        let tables = self.available()?;
        Ok(tables.jobs.iter().filter(|(_, s)| *s == state).count() as u64)
    }

    async fn runner_names(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let tables = self.available()?;
        let mut names: Vec<String> = tables
            .runners
            .iter()
            .filter(|(_, name)| name.starts_with(prefix))
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn idle_runner(&self, prefix: &str) -> StoreResult<Option<String>> {
        let tables = self.available()?;
        let idle = tables
            .runners
            .iter()
            .filter(|(_, name)| name.starts_with(prefix))
            .filter(|(id, _)| {
                !tables
                    .jobs
                    .iter()
                    .any(|(runner, state)| *runner == Some(*id) && state.occupies_runner())
            })
            .map(|(_, name)| name)
            .min()
            .cloned();
        Ok(idle)
    }
}
