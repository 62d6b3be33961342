//! Test gateway and fixtures shared by the resolver tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pipedeps_core::{
    Attachment, AttachmentId, AttachmentOwner, Entity, EntityId, EntityRef, MediaKind,
    PublishedFile, PublishedFileId, Task, TaskId, TaskType, Version, VersionId, VersionStatus,
};
use pipedeps_storage::{EntityGateway, GatewayError, MemoryGateway, Result};

pub fn ty(name: &str) -> TaskType {
    TaskType::parse(name).unwrap()
}

pub fn version(id: u64, task: TaskId, sequence: u32, status: VersionStatus) -> Version {
    Version {
        id: VersionId::new(id),
        task,
        code: format!("task{}_v{:03}", task, sequence),
        sequence,
        status,
        created_at: Utc.with_ymd_and_hms(2025, 11, 1, 9, 0, 0).unwrap()
            + chrono::Duration::minutes(i64::from(sequence)),
    }
}

/// Gateway call that can be made to fail for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Entity,
    Task,
    Versions,
    LinkedEntities,
    Attachments,
    PublishedFiles,
}

/// Memory gateway with failure injection and a query log.
pub struct ScriptedGateway {
    inner: MemoryGateway,
    failing: HashSet<(EntityId, Call)>,
    stalled: HashSet<EntityId>,
    delay: Option<Duration>,
    task_queries: Mutex<Vec<(EntityId, String)>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new(inner: MemoryGateway) -> Self {
        Self {
            inner,
            failing: HashSet::new(),
            stalled: HashSet::new(),
            delay: None,
            task_queries: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Task lookups and breakdown queries on `entity` fail.
    pub fn failing(self, entity: EntityId) -> Self {
        self.failing_at(entity, Call::Task).failing_at(entity, Call::LinkedEntities)
    }

    /// One kind of call fails whenever it concerns `entity`.
    pub fn failing_at(mut self, entity: EntityId, call: Call) -> Self {
        self.failing.insert((entity, call));
        self
    }

    /// Every task lookup on `entity` never answers.
    pub fn stalled(mut self, entity: EntityId) -> Self {
        self.stalled.insert(entity);
        self
    }

    /// Task lookups take this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn queried(&self, entity: EntityId, task_type: &str) -> bool {
        self.task_queries
            .lock()
            .unwrap()
            .iter()
            .any(|(e, t)| *e == entity && t == task_type)
    }

    pub fn task_query_count(&self) -> usize {
        self.task_queries.lock().unwrap().len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn check(&self, entity: Option<EntityId>, call: Call) -> Result<()> {
        match entity {
            Some(entity) if self.failing.contains(&(entity, call)) => Err(GatewayError::unavailable(
                format!("connection reset during {:?} query on #{}", call, entity),
            )),
            _ => Ok(()),
        }
    }

    fn owner_of_task(&self, task: TaskId) -> Option<EntityId> {
        self.inner.task(task).map(|t| t.entity.id)
    }

    fn owner_of_version(&self, version: VersionId) -> Option<EntityId> {
        self.inner.version(version).and_then(|v| self.owner_of_task(v.task))
    }
}

#[async_trait]
impl EntityGateway for ScriptedGateway {
    async fn get_entity(&self, entity: &EntityRef) -> Result<Option<Entity>> {
        self.check(Some(entity.id), Call::Entity)?;
        self.inner.get_entity(entity).await
    }

    async fn get_task(&self, entity: &EntityRef, task_type: &TaskType) -> Result<Option<Task>> {
        self.task_queries
            .lock()
            .unwrap()
            .push((entity.id, task_type.to_string()));

        if self.stalled.contains(&entity.id) {
            std::future::pending::<()>().await;
        }
        self.check(Some(entity.id), Call::Task)?;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.inner.get_task(entity, task_type).await
    }

    async fn get_versions(&self, task: &Task) -> Result<Vec<Version>> {
        self.check(Some(task.entity.id), Call::Versions)?;
        self.inner.get_versions(task).await
    }

    async fn get_linked_entities(&self, shot: &EntityRef) -> Result<Vec<EntityRef>> {
        self.check(Some(shot.id), Call::LinkedEntities)?;
        self.inner.get_linked_entities(shot).await
    }

    async fn get_attachments(&self, owner: &AttachmentOwner) -> Result<Vec<Attachment>> {
        let entity = match owner {
            AttachmentOwner::Version(id) => self.owner_of_version(*id),
            AttachmentOwner::Task(id) => self.owner_of_task(*id),
        };
        self.check(entity, Call::Attachments)?;
        self.inner.get_attachments(owner).await
    }

    async fn get_published_files(&self, version: &Version) -> Result<Vec<PublishedFile>> {
        self.check(self.owner_of_task(version.task), Call::PublishedFiles)?;
        self.inner.get_published_files(version).await
    }
}

pub mod fixtures {
    //! A small show: one character, a prop, an environment and two shots.

    use super::*;

    pub const CIANLU: EntityId = EntityId::new(1);
    pub const LAMP: EntityId = EntityId::new(2);
    pub const FOREST: EntityId = EntityId::new(3);
    pub const SHOT_050: EntityId = EntityId::new(10);
    pub const SHOT_060: EntityId = EntityId::new(11);

    pub fn cianlu_entity() -> Entity {
        Entity::asset(CIANLU, "Char_Cianlu", Some(pipedeps_core::AssetType::Character))
    }

    pub fn cianlu() -> EntityRef {
        cianlu_entity().to_ref()
    }

    pub fn lamp_entity() -> Entity {
        Entity::asset(LAMP, "Prop_Lamp", Some(pipedeps_core::AssetType::Prop))
    }

    pub fn forest_entity() -> Entity {
        Entity::asset(FOREST, "Env_Forest", Some(pipedeps_core::AssetType::Environment))
    }

    /// Shot using Char_Cianlu only.
    pub fn shot_050_entity() -> Entity {
        Entity::shot(SHOT_050, "Shot_sq010_050", vec![cianlu()])
    }

    /// Shot using all three assets.
    pub fn shot_060_entity() -> Entity {
        Entity::shot(
            SHOT_060,
            "Shot_sq010_060",
            vec![cianlu(), lamp_entity().to_ref(), forest_entity().to_ref()],
        )
    }

    /// A task on Shot_sq010_050 that is not stored in the gateway.
    pub fn shot_050_task(id: u64, step: &str) -> Task {
        Task::new(TaskId::new(id), shot_050_entity().to_ref(), step)
    }

    /// A task on Shot_sq010_060 that is not stored in the gateway.
    pub fn shot_060_task(id: u64, step: &str) -> Task {
        Task::new(TaskId::new(id), shot_060_entity().to_ref(), step)
    }

    /// Char_Cianlu: Art v3, Modeling with only a rejected version, Rig v5.
    /// Shot_sq010_050: Layout v2, no Animation task.
    pub fn cianlu_project() -> MemoryGateway {
        let art = Task::new(TaskId::new(101), cianlu(), "001_Art");
        let modeling = Task::new(TaskId::new(102), cianlu(), "002_Modeling");
        let rig = Task::new(TaskId::new(103), cianlu(), "003_Rig");
        let layout = Task::new(TaskId::new(201), shot_050_entity().to_ref(), "01_Layout");

        MemoryGateway::new()
            .with_entity(cianlu_entity())
            .with_entity(shot_050_entity())
            .with_version(version(1011, art.id, 1, VersionStatus::Approved))
            .with_version(version(1013, art.id, 3, VersionStatus::Approved))
            .with_version(version(1012, art.id, 2, VersionStatus::Approved))
            .with_version(version(1021, modeling.id, 1, VersionStatus::Rejected))
            .with_version(version(1034, rig.id, 4, VersionStatus::Approved))
            .with_version(version(1035, rig.id, 5, VersionStatus::PendingReview))
            .with_version(version(1036, rig.id, 6, VersionStatus::Rejected))
            .with_version(version(2011, layout.id, 1, VersionStatus::Approved))
            .with_version(version(2012, layout.id, 2, VersionStatus::Approved))
            .with_attachment(Attachment {
                id: AttachmentId::new(746),
                owner: AttachmentOwner::Version(VersionId::new(1035)),
                filename: "CianLu_rig_turntable.mov".into(),
                size: Some(18_000_000),
                media_kind: MediaKind::Movie,
            })
            .with_published_file(PublishedFile {
                id: PublishedFileId::new(77),
                version: VersionId::new(1035),
                filename: "CianLu_rig.v005.ma".into(),
                size: Some(4_200_000),
                path_token: "assets/Char_Cianlu/rig/v005".into(),
            })
            .with_published_file(PublishedFile {
                id: PublishedFileId::new(78),
                version: VersionId::new(2012),
                filename: "sq010_050_layout.v002.usd".into(),
                size: None,
                path_token: "shots/sq010_050/layout/v002".into(),
            })
            .with_task(art)
            .with_task(modeling)
            .with_task(rig)
            .with_task(layout)
    }

    /// Adds Prop_Lamp (Modeling v1 only), Env_Forest (Rig v2) and
    /// Shot_sq010_060 linking all three assets.
    pub fn three_asset_project() -> MemoryGateway {
        let lamp_model = Task::new(TaskId::new(301), lamp_entity().to_ref(), "Modeling");
        let forest_rig = Task::new(TaskId::new(401), forest_entity().to_ref(), "Rig");

        cianlu_project()
            .with_entity(lamp_entity())
            .with_entity(forest_entity())
            .with_entity(shot_060_entity())
            .with_version(version(3011, lamp_model.id, 1, VersionStatus::Approved))
            .with_version(version(4012, forest_rig.id, 2, VersionStatus::Approved))
            .with_task(lamp_model)
            .with_task(forest_rig)
    }

    pub fn write_json(root: &Path, dir: &str, id: u64, doc: &impl serde::Serialize) {
        let dir = root.join(dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("{id}.json")), serde_json::to_vec_pretty(doc).unwrap()).unwrap();
    }

    /// On-disk project: Shot_S (#10) links Char_A (#1), Prop_B (#2) and
    /// Env_C (#3). Asset #n has Rig task 10n with an approved v1.
    pub fn write_json_project(root: &Path) -> EntityRef {
        let assets = [(1, "Char_A"), (2, "Prop_B"), (3, "Env_C")]
            .map(|(id, code)| Entity::asset(EntityId::new(id), code, None));
        let shot = Entity::shot(EntityId::new(10), "Shot_S", assets.iter().map(Entity::to_ref).collect());
        write_json(root, "entities", 10, &shot);

        for asset in &assets {
            let id = asset.id.get();
            let rig = Task::new(TaskId::new(100 + id), asset.to_ref(), "003_Rig");
            write_json(root, "entities", id, asset);
            write_json(root, "versions", 1000 + id, &version(1000 + id, rig.id, 1, VersionStatus::Approved));
            write_json(root, "tasks", rig.id.get(), &rig);
        }
        shot.to_ref()
    }
}
