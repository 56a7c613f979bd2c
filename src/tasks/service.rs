use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{Task, TaskError, next_id};
use crate::store::TaskStore;

/// Task operations over a [`TaskStore`].
///
/// Every operation is a full load → modify → save cycle. The cycles are
/// serialized by an internal mutex, so two overlapping requests can never
/// both start from the same snapshot and lose one another's write.
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    // Held for the whole load/modify/save cycle.
    cycle: Mutex<()>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        Self {
            store,
            cycle: Mutex::new(()),
        }
    }

    /// Returns every task in insertion order.
    pub async fn list(&self) -> Result<Vec<Task>, TaskError> {
        let _cycle = self.cycle.lock().await;
        Ok(self.store.load().await?)
    }

    /// Appends a task titled `title` (trimmed) and returns it.
    ///
    /// # Errors
    ///
    /// [`TaskError::TitleRequired`] if `title` is blank.
    pub async fn create(&self, title: &str) -> Result<Task, TaskError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::TitleRequired);
        }

        let _cycle = self.cycle.lock().await;
        let mut tasks = self.store.load().await?;
        let id = next_id(&tasks).ok_or(TaskError::IdsExhausted)?;
        let task = Task::new(id, title);
        tasks.push(task.clone());
        self.store.save(&tasks).await?;

        info!(id = task.id, "task created");
        Ok(task)
    }

    /// Sets the completion flag of task `id` and returns the updated task.
    ///
    /// Setting a flag to the value it already has still saves and succeeds.
    pub async fn set_completed(&self, id: u64, completed: bool) -> Result<Task, TaskError> {
        let _cycle = self.cycle.lock().await;
        let mut tasks = self.store.load().await?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskError::NotFound)?;
        task.completed = completed;
        let updated = task.clone();
        self.store.save(&tasks).await?;

        debug!(id, completed, "task updated");
        Ok(updated)
    }

    /// Removes the first task with `id` and returns it.
    pub async fn delete(&self, id: u64) -> Result<Task, TaskError> {
        let _cycle = self.cycle.lock().await;
        let mut tasks = self.store.load().await?;
        let index = tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskError::NotFound)?;
        let removed = tasks.remove(index);
        self.store.save(&tasks).await?;

        info!(id, "task deleted");
        Ok(removed)
    }
}
