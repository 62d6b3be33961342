//! Version selection along a fallback chain.

use std::cmp::Ordering;
use std::collections::HashSet;

use pipedeps_core::{
    AttachmentOwner, DependencyRecord, Entity, EntityId, EntityRef, Fallback, SourceCategory,
    Task, TaskType, Version,
};
use pipedeps_storage::{EntityGateway, GatewayError};
use tracing::debug;

use crate::error::BranchError;

/// Stages already walked during one resolution, per entity.
pub type Visited = HashSet<(EntityId, TaskType)>;

/// The task and version a chain resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Resolved task
    pub task: Task,
    /// Its latest acceptable version
    pub version: Version,
    /// Set when a later candidate of the chain was used
    pub fallback: Option<Fallback>,
}

impl Selection {
    /// Fetch the version's files and build a record.
    pub async fn into_record<G: EntityGateway + ?Sized>(
        self,
        gateway: &G,
        category: SourceCategory,
        entity: Entity,
    ) -> Result<DependencyRecord, GatewayError> {
        let owner = AttachmentOwner::Version(self.version.id);
        let (attachments, published_files) = tokio::try_join!(
            gateway.get_attachments(&owner),
            gateway.get_published_files(&self.version),
        )?;

        debug!(
            "Version {} of {} has {} attachments and {} published files",
            self.version.code,
            entity.code,
            attachments.len(),
            published_files.len()
        );

        Ok(DependencyRecord {
            category,
            task: self.task,
            entity,
            version: self.version,
            attachments,
            published_files,
            fallback: self.fallback,
        })
    }
}

/// Picks the latest acceptable version of the first candidate stage that
/// has one.
pub struct VersionSelector<'g, G: ?Sized> {
    gateway: &'g G,
}

impl<'g, G: EntityGateway + ?Sized> VersionSelector<'g, G> {
    /// Create a selector over a gateway.
    pub fn new(gateway: &'g G) -> Self {
        Self { gateway }
    }

    /// Walk `candidates` in order on `entity`.
    ///
    /// A candidate is skipped when the entity has no such task or the task
    /// has no acceptable version. `Ok(None)` means nothing in the chain
    /// resolved.
    pub async fn select(
        &self,
        entity: &EntityRef,
        candidates: &[TaskType],
    ) -> Result<Option<Selection>, BranchError> {
        let mut visited = Visited::new();
        self.select_unvisited(entity, candidates, &mut visited).await
    }

    /// Like [`select`](Self::select), failing with a cycle error when a
    /// candidate was already walked on this entity.
    pub async fn select_unvisited(
        &self,
        entity: &EntityRef,
        candidates: &[TaskType],
        visited: &mut Visited,
    ) -> Result<Option<Selection>, BranchError> {
        for candidate in candidates {
            if !visited.insert((entity.id, candidate.clone())) {
                return Err(BranchError::DependencyCycle {
                    entity: entity.id,
                    task_type: candidate.clone(),
                });
            }

            let Some(task) = self.gateway.get_task(entity, candidate).await? else {
                debug!("{} has no {} task", entity.code, candidate);
                continue;
            };

            let versions = self.gateway.get_versions(&task).await?;
            let Some(version) = latest_acceptable(&versions) else {
                debug!("{} task {} has no acceptable version", candidate, task.id);
                continue;
            };

            let fallback = candidates
                .first()
                .filter(|preferred| *preferred != candidate)
                .map(|preferred| Fallback {
                    preferred: preferred.clone(),
                    actual: candidate.clone(),
                });
            if let Some(fallback) = &fallback {
                debug!("{}: falling back from {} to {}", entity.code, fallback.preferred, fallback.actual);
            }

            return Ok(Some(Selection {
                version: version.clone(),
                task,
                fallback,
            }));
        }

        Ok(None)
    }
}

/// Highest-sequence acceptable version.
///
/// Equal sequences go to the most recently created version, then to the
/// higher id, so the pick never depends on input order.
pub fn latest_acceptable(versions: &[Version]) -> Option<&Version> {
    versions
        .iter()
        .filter(|v| v.is_acceptable())
        .max_by(|a, b| newer(a, b))
}

fn newer(a: &Version, b: &Version) -> Ordering {
    a.sequence
        .cmp(&b.sequence)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
