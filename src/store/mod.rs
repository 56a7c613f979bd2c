//! Task persistence.
//!
//! The service never touches the filesystem directly: it talks to a
//! [`TaskStore`], which loads and saves the whole collection at once.
//!
//! - [`JsonFileStore`]: the production backend, a pretty-printed JSON array on disk.
//! - [`MemoryStore`]: an in-process vector, for tests and embedding.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use thiserror::Error;

use crate::tasks::Task;

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Errors surfaced by a [`TaskStore`].
///
/// A backing file that is not JSON at all is not an error: it loads as an
/// empty collection. Well-formed JSON that does not describe a task list is
/// reported as [`StoreError::Malformed`] and left on disk untouched.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} does not hold a task list: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Boxed future returned by [`TaskStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Whole-collection storage for tasks.
///
/// Implementations must preserve order: `save(tasks)` followed by `load()`
/// yields the same sequence.
pub trait TaskStore: Send + Sync {
    /// Reads the full collection.
    fn load(&self) -> StoreFuture<'_, Vec<Task>>;

    /// Replaces the stored collection with `tasks`.
    fn save<'a>(&'a self, tasks: &'a [Task]) -> StoreFuture<'a, ()>;
}
