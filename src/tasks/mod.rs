//! The task list: model, operations, and HTTP routes.

mod error;
mod handlers;
mod model;
mod service;

pub use error::TaskError;
pub use handlers::routes;
pub use model::{Task, next_id};
pub use service::TaskService;
