//! Task model - one unit of work on an Asset or Shot.

use serde::{Deserialize, Serialize};
use crate::entity::EntityRef;
use crate::id::TaskId;
use crate::task_type::{TaskType, TaskTypeError};

/// A unit of work of a given step on one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Task name as shown to artists
    pub content: String,

    /// Owning entity
    pub entity: EntityRef,

    /// Raw step label, possibly carrying an ordering prefix (`002_Modeling`)
    pub step: String,

    /// Current status
    #[serde(default)]
    pub status: TaskStatus,
}

impl Task {
    /// Create a task.
    pub fn new(id: TaskId, entity: EntityRef, step: impl Into<String>) -> Self {
        let step = step.into();
        Self {
            id,
            content: step.clone(),
            entity,
            step,
            status: TaskStatus::default(),
        }
    }

    /// Set the status.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Normalized step of this task.
    pub fn task_type(&self) -> Result<TaskType, TaskTypeError> {
        TaskType::parse(&self.step)
    }
}

/// Task status codes used by the tracking site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Waiting to start
    #[default]
    #[serde(rename = "wtg")]
    Waiting,
    /// Ready to start
    #[serde(rename = "rdy")]
    Ready,
    /// In progress
    #[serde(rename = "ip")]
    InProgress,
    /// Pending review
    #[serde(rename = "rev")]
    Review,
    /// Final
    #[serde(rename = "fin")]
    Final,
    /// On hold
    #[serde(rename = "hld")]
    OnHold,
    /// Omitted
    #[serde(rename = "omt")]
    Omitted,
    /// Site-specific code
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityId;

    #[test]
    fn task_type_is_normalized_from_step_label() {
        let shot = EntityRef::shot(EntityId::new(20), "sq010_050");
        let task = Task::new(TaskId::new(6078), shot, "02_Animacion");
        assert_eq!(task.task_type().unwrap().as_str(), "Animacion");
        assert_eq!(task.status, TaskStatus::Waiting);
    }

    #[test]
    fn unknown_status_codes_are_kept_as_other() {
        let json = r#"{
            "id": 5947,
            "content": "Modeling",
            "entity": {"id": 1, "type": "Asset", "code": "generic_prop_1"},
            "step": "002_Modeling",
            "status": "cbb"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.status, TaskStatus::Other);
    }
}
