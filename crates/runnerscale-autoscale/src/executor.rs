//! Scale executor — turns a scaling action into an external command run.
//!
//! The command inherits the parent environment and stdio, plus
//! `RUNNER_NAME` naming the runner to create or delete. The call does not
//! return until the process exits, which serializes scale actions.

use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ScalingConfig;
use crate::decision::ScalingAction;
use crate::error::{CommandError, CommandErrorKind, Direction};

/// Environment variable carrying the target runner name.
pub const RUNNER_NAME_ENV: &str = "RUNNER_NAME";

/// Applies a scaling action to the outside world.
pub trait ScaleExecutor: Send + Sync {
    /// Apply `action`. `NoOp` succeeds without doing anything.
    fn apply(&self, action: &ScalingAction)
    -> impl Future<Output = Result<(), CommandError>> + Send;
}

/// Runs the configured up/down executables.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    config: Arc<ScalingConfig>,
}

impl CommandExecutor {
    pub fn new(config: Arc<ScalingConfig>) -> Self {
        Self { config }
    }

    async fn run(&self, direction: Direction, runner: &str) -> Result<(), CommandError> {
        let program = self.config.command(direction);
        let fail = |kind| CommandError {
            direction,
            runner: runner.to_string(),
            command: program.clone(),
            kind,
        };

        info!(%direction, runner, command = %program.display(), "running scale command");

        let mut child = command(program, runner)
            .spawn()
            .map_err(|e| fail(CommandErrorKind::Spawn(e)))?;

        let status = match self.config.command_timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(waited) => waited,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(fail(CommandErrorKind::TimedOut(limit)));
                }
            },
            None => child.wait().await,
        }
        .map_err(|e| fail(CommandErrorKind::Wait(e)))?;

        if !status.success() {
            return Err(fail(CommandErrorKind::Exited(status)));
        }

        debug!(%direction, runner, "scale command exited successfully");
        Ok(())
    }
}

fn command(program: &Path, runner: &str) -> Command {
    let mut cmd = Command::new(program);
    cmd.env(RUNNER_NAME_ENV, runner)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);
    cmd
}

impl ScaleExecutor for CommandExecutor {
    async fn apply(&self, action: &ScalingAction) -> Result<(), CommandError> {
        match action {
            ScalingAction::NoOp => Ok(()),
            ScalingAction::ScaleUp { index } => {
                let runner = self.config.runner_name(*index);
                self.run(Direction::Up, &runner).await
            }
            ScalingAction::ScaleDown { runner } => self.run(Direction::Down, runner).await,
        }
    }
}
