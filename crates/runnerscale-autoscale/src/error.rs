//! Autoscaler error types.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

use runnerscale_state::StoreError;

/// Invalid scaling configuration, rejected at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("min runners ({min}) exceeds max runners ({max})")]
    RunnerBounds { min: u32, max: u32 },

    #[error("runner prefix must not be empty")]
    EmptyPrefix,

    #[error("{0} command must be set")]
    MissingCommand(Direction),
}

/// Which way a scale command moves the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Up => "up",
            Self::Down => "down",
        })
    }
}

/// Why an external scale command failed.
#[derive(Debug, Error)]
pub enum CommandErrorKind {
    #[error("failed to spawn: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed waiting for exit: {0}")]
    Wait(#[source] std::io::Error),

    #[error("{0}")]
    Exited(ExitStatus),

    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// An external scale command did not succeed.
#[derive(Debug, Error)]
#[error("scale {direction} command {} for runner {runner} failed: {kind}", .command.display())]
pub struct CommandError {
    pub direction: Direction,
    pub runner: String,
    pub command: PathBuf,
    #[source]
    pub kind: CommandErrorKind,
}

impl CommandError {
    /// Process exit code, when the command ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match &self.kind {
            CommandErrorKind::Exited(status) => status.code(),
            _ => None,
        }
    }
}

/// A reconciliation cycle was aborted.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("reading fleet state: {0}")]
    Query(#[from] StoreError),

    #[error(transparent)]
    Command(#[from] CommandError),
}
