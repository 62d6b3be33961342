//! Version model - one iteration of a task's output.

use serde::{Deserialize, Serialize};
use crate::id::{TaskId, VersionId};
use crate::Time;

/// One iteration of a task's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Unique identifier
    pub id: VersionId,

    /// Owning task
    pub task: TaskId,

    /// Version code, e.g. `generic_prop_1_002_Modeling_v004`
    pub code: String,

    /// Monotonically increasing per task
    pub sequence: u32,

    /// Review status
    pub status: VersionStatus,

    /// Creation timestamp
    pub created_at: Time,
}

impl Version {
    /// Whether this version may be handed downstream.
    pub fn is_acceptable(&self) -> bool {
        self.status.is_acceptable()
    }
}

/// Review status of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionStatus {
    /// Approved
    #[serde(rename = "apr")]
    Approved,
    /// Pending review
    #[serde(rename = "rev")]
    PendingReview,
    /// Still being worked on
    #[serde(rename = "ip")]
    InProgress,
    /// Rejected
    #[serde(rename = "rej")]
    Rejected,
    /// Omitted
    #[serde(rename = "omt")]
    Omitted,
    /// Site-specific code
    #[serde(other)]
    Other,
}

impl VersionStatus {
    /// Rejected and omitted versions are never handed downstream.
    pub fn is_acceptable(self) -> bool {
        !matches!(self, Self::Rejected | Self::Omitted)
    }
}
