//! JSON directory gateway.
//!
//! Reads one JSON document per record from a directory tree:
//!
//! ```text
//! <root>/entities/<id>.json
//! <root>/tasks/<id>.json
//! <root>/versions/<id>.json
//! <root>/attachments/<id>.json
//! <root>/published_files/<id>.json
//! ```
//!
//! Every query goes back to disk; nothing is cached between calls.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipedeps_core::{
    Attachment, AttachmentOwner, Entity, EntityId, EntityRef, PublishedFile, Task, TaskId,
    TaskType, Version,
};
use tokio::fs;
use tracing::{debug, warn};

use super::memory_gateway::is_current_task;
use super::{EntityGateway, GatewayError, Result};

/// File-based JSON gateway.
#[derive(Debug, Clone)]
pub struct JsonGateway {
    root: PathBuf,
}

impl JsonGateway {
    /// Open a data directory. The directory must exist; missing
    /// subdirectories simply hold no records.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !fs::metadata(&root).await?.is_dir() {
            return Err(GatewayError::unavailable(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Root of the data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entity_path(&self, id: EntityId) -> PathBuf {
        self.root.join("entities").join(format!("{}.json", id))
    }
    fn task_path(&self, id: TaskId) -> PathBuf {
        self.root.join("tasks").join(format!("{}.json", id))
    }

    /// Load a task by id.
    pub async fn load_task(&self, id: TaskId) -> Result<Option<Task>> {
        read_json(&self.task_path(id)).await
    }

    async fn load_entity(&self, id: EntityId) -> Result<Option<Entity>> {
        read_json(&self.entity_path(id)).await
    }
}

#[async_trait]
impl EntityGateway for JsonGateway {
    async fn get_entity(&self, entity: &EntityRef) -> Result<Option<Entity>> {
        self.load_entity(entity.id).await
    }

    async fn get_task(&self, entity: &EntityRef, task_type: &TaskType) -> Result<Option<Task>> {
        let dir = self.root.join("tasks");
        let mut tasks: Vec<Task> = list_dir(&dir, |doc| doc["entity"]["id"] == entity.id.get()).await?;
        tasks.sort_by_key(|t| t.id);
        Ok(tasks.into_iter().find(|t| is_current_task(t, entity, task_type)))
    }

    async fn get_versions(&self, task: &Task) -> Result<Vec<Version>> {
        let dir = self.root.join("versions");
        let mut versions: Vec<Version> = list_dir(&dir, |doc| doc["task"] == task.id.get()).await?;
        versions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(versions)
    }

    async fn get_linked_entities(&self, shot: &EntityRef) -> Result<Vec<EntityRef>> {
        match self.load_entity(shot.id).await? {
            Some(entity) => Ok(entity.linked_assets().to_vec()),
            None => {
                debug!("Shot {} not found under {}", shot, self.root.display());
                Ok(Vec::new())
            }
        }
    }

    async fn get_attachments(&self, owner: &AttachmentOwner) -> Result<Vec<Attachment>> {
        let owner_doc = serde_json::to_value(owner)?;
        let dir = self.root.join("attachments");
        let mut attachments: Vec<Attachment> = list_dir(&dir, |doc| doc["owner"] == owner_doc).await?;
        attachments.sort_by_key(|a| a.id);
        Ok(attachments)
    }

    async fn get_published_files(&self, version: &Version) -> Result<Vec<PublishedFile>> {
        let dir = self.root.join("published_files");
        let mut files: Vec<PublishedFile> = list_dir(&dir, |doc| doc["version"] == version.id.get()).await?;
        files.sort_by_key(|f| f.id);
        Ok(files)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Load the documents in `dir` picked out by `belongs`.
///
/// Documents that cannot be read at all are skipped with a warning, since
/// they cannot be attributed to any record. A picked document that does
/// not match the record shape fails the lookup.
async fn list_dir<T, F>(dir: &Path, belongs: F) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
    F: Fn(&serde_json::Value) -> bool,
{
    let mut items = Vec::new();
    let mut rd = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(items),
        Err(e) => return Err(e.into()),
    };
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let doc: serde_json::Value = match read_json(&path).await {
            Ok(Some(doc)) => doc,
            Ok(None) => continue,
            Err(e) => {
                warn!("Skipping unreadable document {}: {}", path.display(), e);
                continue;
            }
        };
        if belongs(&doc) {
            items.push(serde_json::from_value(doc)?);
        }
    }
    Ok(items)
}
