//! Resolution errors.
//!
//! Fatal errors abort a whole resolution. Branch errors only cost the
//! branch they happened in and are reported next to the records that did
//! resolve.

use pipedeps_core::{EntityId, EntityRef, SourceCategory, TaskType, TaskTypeError};
use pipedeps_storage::GatewayError;
use serde::Serialize;

/// Errors that abort a resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Task label normalizes to nothing
    #[error(transparent)]
    InvalidTaskType(#[from] TaskTypeError),

    /// No rule for the normalized task type
    #[error("no pipeline rule for task type '{0}'")]
    UnknownTaskType(TaskType),

    /// Caller cancelled before the lookups finished
    #[error("resolution cancelled")]
    Cancelled,
}

/// Errors confined to a single branch.
#[derive(Debug, thiserror::Error)]
pub enum BranchError {
    /// Gateway query failed or timed out
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Chain walk came back to a stage it already visited
    #[error("dependency cycle: {task_type} on entity #{entity} visited twice")]
    DependencyCycle {
        /// Entity being walked
        entity: EntityId,
        /// Repeated stage
        task_type: TaskType,
    },
}

/// A branch that produced no record because it failed.
#[derive(Debug, Serialize)]
pub struct BranchFailure {
    /// Branch kind
    pub category: SourceCategory,

    /// Entity the branch was resolving
    pub entity: EntityRef,

    /// What went wrong
    #[serde(serialize_with = "serialize_display")]
    pub error: BranchError,
}

impl std::fmt::Display for BranchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.entity, self.category, self.error)
    }
}

fn serialize_display<S: serde::Serializer>(
    error: &BranchError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
