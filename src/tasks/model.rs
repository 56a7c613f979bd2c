use serde::{Deserialize, Serialize};

/// A single entry in the task list.
///
/// Serialized as `{"id": 1, "title": "buy milk", "completed": false}`.
/// Files written with a `description` key instead of `title` still load, and
/// a record without `completed` loads as not completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    #[serde(alias = "description")]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    /// A fresh, not yet completed task.
    pub fn new(id: u64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            completed: false,
        }
    }
}

/// Returns the id for the next task: one past the largest id in `tasks`,
/// or `1` for an empty collection. `None` once `u64::MAX` is taken.
pub fn next_id(tasks: &[Task]) -> Option<u64> {
    match tasks.iter().map(|t| t.id).max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}
