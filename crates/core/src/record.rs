//! Resolution output - one resolved dependency.

use serde::{Deserialize, Serialize};
use crate::deliverable::{Attachment, PublishedFile};
use crate::entity::Entity;
use crate::task::Task;
use crate::task_type::TaskType;
use crate::version::Version;

/// Why a dependency was pulled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCategory {
    /// Prior pipeline stage on the same entity
    UpstreamTask,
    /// Deliverable of an asset linked to the shot
    AssetDependency,
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpstreamTask => f.write_str("Upstream Tasks"),
            Self::AssetDependency => f.write_str("Asset Dependencies"),
        }
    }
}

/// A dependency that was resolved from a later candidate in its chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    /// First candidate of the chain
    pub preferred: TaskType,
    /// Candidate that actually resolved
    pub actual: TaskType,
}

/// One resolved dependency: a task, its latest acceptable version and the
/// files that version carries.
///
/// The version always belongs to the task and the task to the entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// Upstream stage or linked asset
    pub category: SourceCategory,

    /// Resolved task
    pub task: Task,

    /// Entity owning the task
    pub entity: Entity,

    /// Latest acceptable version of the task
    pub version: Version,

    /// Attachments of the version
    pub attachments: Vec<Attachment>,

    /// Files published from the version
    pub published_files: Vec<PublishedFile>,

    /// Set when the record did not come from the preferred task type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Fallback>,
}

impl DependencyRecord {
    /// Whether a substitute task type was used.
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    /// Human-readable fallback note, e.g.
    /// `Using Modeling for Char_Cianlu (no Rig available)`.
    pub fn note(&self) -> Option<String> {
        self.fallback.as_ref().map(|fallback| {
            format!(
                "Using {} for {} (no {} available)",
                fallback.actual, self.entity.code, fallback.preferred
            )
        })
    }
}
