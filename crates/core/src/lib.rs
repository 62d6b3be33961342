//! pipedeps core data models.
//!
//! Read-only projections of production-tracking data (entities, tasks,
//! versions and their file deliverables) plus the records produced when a
//! task's upstream dependencies are resolved.

#![warn(missing_docs)]

// Identities
mod id;

// Pipeline subjects
mod entity;
mod task;
mod task_type;

// Task output
mod version;
mod deliverable;

// Resolution output
mod record;

// Re-exports
pub use id::*;

pub use entity::{Entity, EntityKind, EntityRef, EntityType, AssetType};
pub use task::{Task, TaskStatus};
pub use task_type::{normalize_task_type, TaskType, TaskTypeError};
pub use version::{Version, VersionStatus};
pub use deliverable::{Attachment, AttachmentOwner, MediaKind, PublishedFile};
pub use record::{DependencyRecord, Fallback, SourceCategory};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
