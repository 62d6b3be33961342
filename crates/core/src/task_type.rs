//! Task types and the label normalizer.
//!
//! Tracking sites prefix step labels with an ordering number
//! (`002_Modeling`, `02_Animacion`). Rules are keyed on the bare name, so
//! labels are normalized before any lookup.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Errors produced while normalizing a task-type label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskTypeError {
    /// Nothing left once the ordering prefix is removed
    #[error("invalid task type label '{0}': nothing left after removing the ordering prefix")]
    Invalid(String),

    /// The ordering-prefix pattern failed to compile
    #[error("ordering prefix pattern: {0}")]
    Pattern(String),
}

/// A normalized task type, e.g. `Modeling` or `Lighting`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskType(String);

impl TaskType {
    /// Normalize a raw label into a task type.
    pub fn parse(label: &str) -> Result<Self, TaskTypeError> {
        normalize_task_type(label).map(|key| Self(key.to_string()))
    }

    /// Wrap a name that is already in normalized form, such as the keys of a
    /// built-in rule table.
    pub fn known(name: &'static str) -> Self {
        debug_assert_eq!(normalize_task_type(name), Ok(name), "task type {name:?} is not normalized");
        Self(name.to_string())
    }

    /// The normalized key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskType {
    type Error = TaskTypeError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        Self::parse(&label)
    }
}

impl From<TaskType> for String {
    fn from(task_type: TaskType) -> Self {
        task_type.0
    }
}

impl std::str::FromStr for TaskType {
    type Err = TaskTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TaskType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn ordering_prefix() -> Result<&'static Regex, TaskTypeError> {
    static PREFIX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    match PREFIX.get_or_init(|| Regex::new(r"^[0-9]+[_\-.\s]*")) {
        Ok(re) => Ok(re),
        Err(e) => Err(TaskTypeError::Pattern(e.to_string())),
    }
}

/// Strip a leading run of digits and the separators right after it.
///
/// The remainder is returned untouched, case included. Labels without a
/// leading digit come back unchanged. A label that is nothing but digits
/// and separators is rejected.
pub fn normalize_task_type(label: &str) -> Result<&str, TaskTypeError> {
    let stripped = match ordering_prefix()?.find(label) {
        Some(prefix) => &label[prefix.end()..],
        None => label,
    };

    let only_separators = stripped
        .chars()
        .all(|c| c.is_ascii_digit() || c == '_' || c == '-' || c == '.' || c.is_whitespace());
    if only_separators {
        return Err(TaskTypeError::Invalid(label.to_string()));
    }

    Ok(stripped)
}
