//! Scaling decision — maps one cycle's observations to a single action.

use std::fmt;

use runnerscale_state::JobCounts;

use crate::config::ScalingConfig;

/// The single action taken in a reconciliation cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalingAction {
    /// Leave the fleet as it is.
    NoOp,
    /// Add the runner numbered `index`.
    ScaleUp { index: u32 },
    /// Remove the named idle runner.
    ScaleDown { runner: String },
}

impl ScalingAction {
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }
}

impl fmt::Display for ScalingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => f.write_str("noop"),
            Self::ScaleUp { index } => write!(f, "scale-up({index})"),
            Self::ScaleDown { runner } => write!(f, "scale-down({runner})"),
        }
    }
}

/// Decide how to move the fleet this cycle.
///
/// Pure: identical inputs always yield the identical action.
pub fn decide(
    counts: &JobCounts,
    active_count: u32,
    idle_runner: Option<&str>,
    config: &ScalingConfig,
) -> ScalingAction {
    // Queue is deep enough to want another runner.
    if counts.pending >= config.min_pending {
        if active_count >= config.max_runners {
            return ScalingAction::NoOp;
        }
        return ScalingAction::ScaleUp {
            index: active_count.saturating_add(1),
        };
    }

    // Backlog (including jobs waiting on dependencies) is small.
    if active_count > config.min_runners
        && counts.pending.saturating_add(counts.waiting) < config.min_pending
    {
        return match idle_runner {
            Some(name) => ScalingAction::ScaleDown {
                runner: name.to_string(),
            },
            None => ScalingAction::NoOp,
        };
    }

    ScalingAction::NoOp
}
