use tokio::sync::Mutex;

use super::{StoreFuture, TaskStore};
use crate::tasks::Task;

/// Keeps the collection in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing collection.
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    /// Returns a copy of the current collection.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().await.clone()
    }
}

impl TaskStore for MemoryStore {
    fn load(&self) -> StoreFuture<'_, Vec<Task>> {
        Box::pin(async move { Ok(self.tasks.lock().await.clone()) })
    }

    fn save<'a>(&'a self, tasks: &'a [Task]) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            *self.tasks.lock().await = tasks.to_vec();
            Ok(())
        })
    }
}
