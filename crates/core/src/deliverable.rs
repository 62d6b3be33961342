//! File-level deliverables attached to versions and tasks.

use serde::{Deserialize, Serialize};
use crate::id::{AttachmentId, PublishedFileId, TaskId, VersionId};

/// What an attachment hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id")]
pub enum AttachmentOwner {
    /// Attached to a version
    Version(VersionId),
    /// Attached directly to a task
    Task(TaskId),
}

/// Coarse media classification of an attachment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image
    Image,
    /// Movie / playblast
    Movie,
    /// Geometry or scene cache (`.abc`, `.usd`, ...)
    Geometry,
    /// Document
    Document,
    /// Anything else
    #[default]
    #[serde(other)]
    Other,
}

/// An uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique identifier
    pub id: AttachmentId,

    /// Owning version or task
    pub owner: AttachmentOwner,

    /// Original filename
    pub filename: String,

    /// Size in bytes, when the site reports one
    #[serde(default)]
    pub size: Option<u64>,

    /// Media classification
    #[serde(default)]
    pub media_kind: MediaKind,
}

/// A file published from a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedFile {
    /// Unique identifier
    pub id: PublishedFileId,

    /// Owning version
    pub version: VersionId,

    /// Filename
    pub filename: String,

    /// Size in bytes, when the site reports one
    #[serde(default)]
    pub size: Option<u64>,

    /// Storage path token used by the download layer
    pub path_token: String,
}
