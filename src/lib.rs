//! # taskd
//!
//! A small task list service: a JSON-over-HTTP/1.1 API on top of a
//! from-scratch async server, storing its tasks in one JSON file.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taskd::{App, Server, store::JsonFileStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = App::new(Arc::new(JsonFileStore::new("tasks.json")));
//!     let server = Server::bind("127.0.0.1:3000").await?;
//!     println!("Listening on http://{}", server.local_addr());
//!     server.run(app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Endpoints
//!
//! | Method  | Path             | Result                                   |
//! |---------|------------------|------------------------------------------|
//! | GET     | `/`              | HTML usage page                          |
//! | GET     | `/api/tasks`     | every task                               |
//! | POST    | `/api/tasks`     | `201` new task from `{"title": "..."}`   |
//! | PUT     | `/api/tasks/:id` | task with `completed` set                |
//! | DELETE  | `/api/tasks/:id` | the removed task                         |
//! | OPTIONS | any              | `204` CORS preflight                     |

// ── Protocol plumbing ─────────────────────────────────────────────────────────
pub mod context;
pub mod http;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;

// ── Task API ──────────────────────────────────────────────────────────────────
pub mod app;
pub mod config;
pub mod store;
pub mod tasks;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use app::App;
pub use config::Config;
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::{Server, ServerError};
