use thiserror::Error;
use uuid::Uuid;

use crate::models::{DependencyStatus, ItemStatus, Role};

/// Why a transition was refused or could not be applied.
///
/// Everything except `Storage` is recoverable by the caller adjusting the
/// request (supplying a comment, a decision log, `force`, or re-reading a
/// stale item).
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: ItemStatus, to: ItemStatus },

    #[error("Role '{role}' cannot perform this transition")]
    RoleNotPermitted { role: Role },

    #[error("A comment is required for this transition")]
    CommentRequired,

    #[error("At least one decision log is required before marking as done")]
    DecisionLogRequired,

    #[error("Blocked by unfinished dependencies: {}. Use force=true to override.", describe_blockers(.blockers))]
    DependencyBlocked { blockers: Vec<DependencyStatus> },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Item {0} was modified concurrently; reload and retry")]
    Conflict(Uuid),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl WorkflowError {
    /// Whether this is a precondition failure (missing comment or decision log).
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::CommentRequired | Self::DecisionLogRequired)
    }
}

fn describe_blockers(blockers: &[DependencyStatus]) -> String {
    blockers
        .iter()
        .map(|b| format!("\"{}\" ({})", b.title, b.status))
        .collect::<Vec<_>>()
        .join(", ")
}
