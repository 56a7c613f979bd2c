//! Wires storage, task routes, and middleware into one request handler.

use std::sync::Arc;

use crate::context::Context;
use crate::http::{Request, Response};
use crate::middleware::{LoggerMiddleware, MiddlewareHandler, Next, from_middleware};
use crate::router::Router;
use crate::security::CorsMiddleware;
use crate::store::TaskStore;
use crate::tasks::{TaskService, routes};

/// The complete task API: `LoggerMiddleware` → `CorsMiddleware` → task routes.
///
/// Cheap to clone; every connection task holds one.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use taskd::{App, Request, StatusCode, store::MemoryStore};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let app = App::new(Arc::new(MemoryStore::new()));
/// let (request, _) = Request::parse(b"GET /api/tasks HTTP/1.1\r\n\r\n").unwrap();
/// let response = app.handle(request).await;
/// assert_eq!(response.status(), StatusCode::Ok);
/// assert_eq!(response.body_bytes(), b"[]");
/// # }
/// ```
#[derive(Clone)]
pub struct App {
    middlewares: Arc<[MiddlewareHandler]>,
    router: Arc<Router>,
}

impl App {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        let service = Arc::new(TaskService::new(store));
        Self {
            middlewares: Arc::from(vec![
                from_middleware(LoggerMiddleware),
                from_middleware(CorsMiddleware::new()),
            ]),
            router: Arc::new(routes(service)),
        }
    }

    /// Runs `request` through the middleware chain and router.
    pub async fn handle(&self, request: Request) -> Response {
        let next = Next::new(Arc::clone(&self.middlewares), Arc::clone(&self.router));
        next.run(Context::new(request)).await
    }
}
