//! In-memory snapshot gateway.
//!
//! Holds an immutable copy of the records a resolution needs. Useful for
//! callers that already fetched a project in bulk, and for tests.

use async_trait::async_trait;
use pipedeps_core::{
    Attachment, AttachmentOwner, Entity, EntityRef, PublishedFile, Task, TaskId, TaskStatus,
    TaskType, Version, VersionId,
};
use tracing::debug;

use super::{EntityGateway, Result};

/// Snapshot-backed gateway.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    entities: Vec<Entity>,
    tasks: Vec<Task>,
    versions: Vec<Version>,
    attachments: Vec<Attachment>,
    published_files: Vec<PublishedFile>,
}

impl MemoryGateway {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity.
    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(entity);
        self
    }

    /// Add a task.
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Add a version. Versions are reported in insertion order.
    pub fn with_version(mut self, version: Version) -> Self {
        self.versions.push(version);
        self
    }

    /// Add an attachment.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Add a published file.
    pub fn with_published_file(mut self, file: PublishedFile) -> Self {
        self.published_files.push(file);
        self
    }

    /// Look up a task by id.
    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Look up a version by id.
    pub fn version(&self, id: VersionId) -> Option<&Version> {
        self.versions.iter().find(|v| v.id == id)
    }

    fn entity(&self, link: &EntityRef) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == link.id)
    }
}

/// Whether `task` is the current task of `task_type` on `entity`.
///
/// Omitted tasks never count, and a step label that does not normalize
/// cannot match anything.
pub(crate) fn is_current_task(task: &Task, entity: &EntityRef, task_type: &TaskType) -> bool {
    task.entity.id == entity.id
        && task.status != TaskStatus::Omitted
        && task.task_type().is_ok_and(|t| &t == task_type)
}

#[async_trait]
impl EntityGateway for MemoryGateway {
    async fn get_entity(&self, entity: &EntityRef) -> Result<Option<Entity>> {
        Ok(self.entity(entity).cloned())
    }

    async fn get_task(&self, entity: &EntityRef, task_type: &TaskType) -> Result<Option<Task>> {
        Ok(self
            .tasks
            .iter()
            .find(|t| is_current_task(t, entity, task_type))
            .cloned())
    }

    async fn get_versions(&self, task: &Task) -> Result<Vec<Version>> {
        Ok(self
            .versions
            .iter()
            .filter(|v| v.task == task.id)
            .cloned()
            .collect())
    }

    async fn get_linked_entities(&self, shot: &EntityRef) -> Result<Vec<EntityRef>> {
        match self.entity(shot) {
            Some(shot) => Ok(shot.linked_assets().to_vec()),
            None => {
                debug!("Shot {} missing from snapshot", shot);
                Ok(Vec::new())
            }
        }
    }

    async fn get_attachments(&self, owner: &AttachmentOwner) -> Result<Vec<Attachment>> {
        Ok(self
            .attachments
            .iter()
            .filter(|a| &a.owner == owner)
            .cloned()
            .collect())
    }

    async fn get_published_files(&self, version: &Version) -> Result<Vec<PublishedFile>> {
        Ok(self
            .published_files
            .iter()
            .filter(|f| f.version == version.id)
            .cloned()
            .collect())
    }
}
