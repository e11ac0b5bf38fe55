//! runnerscale-autoscale — queue-driven runner scaling.
//!
//! Each reconciliation cycle reads job counts and the runner inventory
//! from a [`FleetStore`](runnerscale_state::FleetStore), decides on at most
//! one scaling action, republishes the observed state as gauges, then runs
//! the matching external command.
//!
//! # Scaling Algorithm
//!
//! ```text
//! if pending >= min_pending:
//!     runners >= max_runners → NoOp
//!     otherwise              → ScaleUp(runners + 1)
//!
//! if runners > min_runners and pending + waiting < min_pending:
//!     idle runner found → ScaleDown(idle)
//!     otherwise         → NoOp
//!
//! NoOp
//! ```
//!
//! Scale-up always wins over scale-down. One runner per cycle bounds the
//! effect of any single decision; the next cycle re-reads the store.

pub mod config;
pub mod decision;
pub mod error;
pub mod executor;
pub mod reconciler;

pub use config::ScalingConfig;
pub use decision::{ScalingAction, decide};
pub use error::{CommandError, CommandErrorKind, ConfigError, Direction, ReconcileError};
pub use executor::{CommandExecutor, RUNNER_NAME_ENV, ScaleExecutor};
pub use reconciler::{CycleReport, Reconciler};
