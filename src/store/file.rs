use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use super::{StoreError, StoreFuture, TaskStore};
use crate::tasks::Task;

/// Stores tasks as a pretty-printed JSON array in a single file.
///
/// - A missing file is created containing `[]` on first load.
/// - A file that does not parse loads as an empty collection and is logged
///   at `warn`; the next save overwrites it.
/// - Saves rewrite the whole file in place. A crash mid-write can leave it
///   truncated, which the previous rule then treats as empty.
///
/// # Examples
///
/// ```rust,no_run
/// use taskd::store::{JsonFileStore, TaskStore};
///
/// # async fn example() -> Result<(), taskd::store::StoreError> {
/// let store = JsonFileStore::new("tasks.json");
/// let tasks = store.load().await?;
/// store.save(&tasks).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read(&self) -> Result<Vec<Task>, StoreError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "creating empty task file");
                fs::write(&self.path, b"[]")
                    .await
                    .map_err(|e| self.io_error(e))?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_slice(&raw) {
            Ok(tasks) => Ok(tasks),
            Err(e) if e.is_syntax() || e.is_eof() => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "could not parse task file, using empty list"
                );
                Ok(Vec::new())
            }
            Err(e) => Err(StoreError::Malformed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    async fn write(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(tasks)?;
        fs::write(&self.path, json)
            .await
            .map_err(|e| self.io_error(e))
    }
}

impl TaskStore for JsonFileStore {
    fn load(&self) -> StoreFuture<'_, Vec<Task>> {
        Box::pin(self.read())
    }

    fn save<'a>(&'a self, tasks: &'a [Task]) -> StoreFuture<'a, ()> {
        Box::pin(self.write(tasks))
    }
}
