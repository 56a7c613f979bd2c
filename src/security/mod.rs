//! Security middleware.
//!
//! Currently only [`CorsMiddleware`], which the task API installs in front
//! of every route.

mod middleware;

pub use middleware::CorsMiddleware;
