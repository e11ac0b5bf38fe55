//! Scaling configuration, built once at startup and never mutated.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Direction};

/// Bounds, thresholds and scale commands for the runner fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalingConfig {
    /// Never scale down to fewer runners than this.
    pub min_runners: u32,
    /// Never scale up beyond this many runners.
    pub max_runners: u32,
    /// Pending jobs needed before a runner is added.
    pub min_pending: u64,
    /// Runner names managed by this autoscaler start with this prefix.
    pub runner_prefix: String,
    /// Executable run to add a runner.
    pub up_command: PathBuf,
    /// Executable run to remove a runner.
    pub down_command: PathBuf,
    /// Upper bound on a single scale command. `None` waits forever and
    /// stalls reconciliation until the command returns.
    pub command_timeout: Option<Duration>,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            min_runners: 0,
            max_runners: 1,
            min_pending: 10,
            runner_prefix: "runner".to_string(),
            up_command: PathBuf::new(),
            down_command: PathBuf::new(),
            command_timeout: None,
        }
    }
}

impl ScalingConfig {
    /// Reject configurations the decision rules cannot honor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_runners > self.max_runners {
            return Err(ConfigError::RunnerBounds {
                min: self.min_runners,
                max: self.max_runners,
            });
        }
        if self.runner_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if self.up_command.as_os_str().is_empty() {
            return Err(ConfigError::MissingCommand(Direction::Up));
        }
        if self.down_command.as_os_str().is_empty() {
            return Err(ConfigError::MissingCommand(Direction::Down));
        }
        Ok(())
    }

    /// Name given to the runner created for `index`.
    pub fn runner_name(&self, index: u32) -> String {
        format!("{}{index}", self.runner_prefix)
    }

    /// Command path for a direction.
    pub fn command(&self, direction: Direction) -> &PathBuf {
        match direction {
            Direction::Up => &self.up_command,
            Direction::Down => &self.down_command,
        }
    }
}
