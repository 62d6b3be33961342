//! Entity gateway trait abstraction.

use std::time::Duration;

use async_trait::async_trait;
use pipedeps_core::{
    Attachment, AttachmentOwner, Entity, EntityRef, PublishedFile, Task, TaskType, Version,
};

/// Error type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Operational failures of a gateway query.
///
/// "Not found" is never an error: lookups return `None` or an empty list.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Backend could not be reached or refused the query
    #[error("gateway unavailable: {cause}")]
    Unavailable {
        /// What went wrong
        cause: String,
    },

    /// Query did not answer in time
    #[error("gateway query timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatewayError {
    /// Shorthand for [`GatewayError::Unavailable`].
    pub fn unavailable(cause: impl Into<String>) -> Self {
        Self::Unavailable { cause: cause.into() }
    }
}

/// Read-only query surface over production-tracking data.
///
/// Implementations must answer repeated queries for the same key
/// consistently for the duration of one resolution.
#[async_trait]
pub trait EntityGateway: Send + Sync {
    /// Load an entity by link.
    async fn get_entity(&self, entity: &EntityRef) -> Result<Option<Entity>>;

    /// Current task of the given normalized type on an entity.
    async fn get_task(&self, entity: &EntityRef, task_type: &TaskType) -> Result<Option<Task>>;

    /// All versions of a task, in creation order. No status filtering.
    async fn get_versions(&self, task: &Task) -> Result<Vec<Version>>;

    /// Links to the assets a shot uses, in breakdown order. The assets
    /// themselves are loaded one by one with [`get_entity`](Self::get_entity).
    async fn get_linked_entities(&self, shot: &EntityRef) -> Result<Vec<EntityRef>>;

    /// Attachments of a version or task.
    async fn get_attachments(&self, owner: &AttachmentOwner) -> Result<Vec<Attachment>>;

    /// Files published from a version.
    async fn get_published_files(&self, version: &Version) -> Result<Vec<PublishedFile>>;
}

#[async_trait]
impl<G: EntityGateway + ?Sized> EntityGateway for std::sync::Arc<G> {
    async fn get_entity(&self, entity: &EntityRef) -> Result<Option<Entity>> {
        (**self).get_entity(entity).await
    }

    async fn get_task(&self, entity: &EntityRef, task_type: &TaskType) -> Result<Option<Task>> {
        (**self).get_task(entity, task_type).await
    }

    async fn get_versions(&self, task: &Task) -> Result<Vec<Version>> {
        (**self).get_versions(task).await
    }

    async fn get_linked_entities(&self, shot: &EntityRef) -> Result<Vec<EntityRef>> {
        (**self).get_linked_entities(shot).await
    }

    async fn get_attachments(&self, owner: &AttachmentOwner) -> Result<Vec<Attachment>> {
        (**self).get_attachments(owner).await
    }

    async fn get_published_files(&self, version: &Version) -> Result<Vec<PublishedFile>> {
        (**self).get_published_files(version).await
    }
}
