//! Domain types read from the job queue.

use std::fmt;

/// Job state codes stored in `"runnerJob".state`.
///
/// The numeric codes are fixed by the PeerTube schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobState {
    Pending,
    Processing,
    Waiting,
    Completing,
}

impl JobState {
    /// Every state the autoscaler reads, in reporting order.
    pub const ALL: [JobState; 4] = [
        JobState::Pending,
        JobState::Processing,
        JobState::Waiting,
        JobState::Completing,
    ];

    /// Integer code as stored in the database.
    pub fn code(self) -> i32 {
        match self {
            Self::Pending => 1,
            Self::Processing => 2,
            Self::Waiting => 5,
            Self::Completing => 9,
        }
    }

    /// Map a database code back to a known state.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Lower-case label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Waiting => "waiting",
            Self::Completing => "completing",
        }
    }

    /// Whether a job in this state pins its runner (runner is busy).
    pub fn occupies_runner(self) -> bool {
        matches!(self, Self::Processing | Self::Completing)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job counts per state, read fresh each cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    pub pending: u64,
    pub processing: u64,
    pub waiting: u64,
    pub completing: u64,
}

impl JobCounts {
    /// Count for a single state.
    pub fn get(&self, state: JobState) -> u64 {
        match state {
            JobState::Pending => self.pending,
            JobState::Processing => self.processing,
            JobState::Waiting => self.waiting,
            JobState::Completing => self.completing,
        }
    }

    /// Set the count for a single state.
    pub fn set(&mut self, state: JobState, count: u64) {
        match state {
            JobState::Pending => self.pending = count,
            JobState::Processing => self.processing = count,
            JobState::Waiting => self.waiting = count,
            JobState::Completing => self.completing = count,
        }
    }

    /// Iterate `(state, count)` pairs in reporting order.
    pub fn iter(&self) -> impl Iterator<Item = (JobState, u64)> + '_ {
        JobState::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

/// Runners currently registered under the configured prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerInventory {
    /// Runner names, ascending and de-duplicated.
    runners: Vec<String>,
    /// A runner with no processing/completing job, if any.
    idle_runner: Option<String>,
}

impl RunnerInventory {
    /// Build an inventory.
    ///
    /// Names are sorted and de-duplicated. An idle runner that is not part
    /// of `runners` is dropped so the idle name is always an inventory member.
    pub fn new(mut runners: Vec<String>, idle_runner: Option<String>) -> Self {
        runners.sort();
        runners.dedup();
        let idle_runner = idle_runner.filter(|idle| runners.binary_search(idle).is_ok());
        Self {
            runners,
            idle_runner,
        }
    }

    pub fn runners(&self) -> &[String] {
        &self.runners
    }

    pub fn idle_runner(&self) -> Option<&str> {
        self.idle_runner.as_deref()
    }

    /// Number of active runners, saturating at `u32::MAX`.
    pub fn active_count(&self) -> u32 {
        u32::try_from(self.runners.len()).unwrap_or(u32::MAX)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.runners.binary_search_by(|r| r.as_str().cmp(name)).is_ok()
    }
}
