//! Request routing: map URL patterns and HTTP methods to handler functions.
//!
//! [`Router`] dispatches a [`Context`] to the first route whose method and
//! pattern both match. Two pattern styles are supported:
//!
//! | Pattern              | Example match      | Captured params |
//! |----------------------|--------------------|-----------------|
//! | `/api/tasks`         | `/api/tasks`       | *(none)*        |
//! | `/api/tasks/:id`     | `/api/tasks/42`    | `id → "42"`     |
//!
//! Captures match any non-empty segment; handlers validate the value.
//! Paths are compared as written: `/api/tasks/` and `/api/tasks//1` match
//! nothing. A `HEAD` request is served by the matching `GET` route.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::{Context, PathParams};
use crate::{Method, Response, StatusCode};

/// Type-erased, heap-allocated async handler that processes a [`Context`] and returns a
/// [`Response`].
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so they can be shared across
/// connection tasks without copying the underlying closure.
pub type Handler =
    Arc<dyn Fn(Context) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static>;

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = Response> + Send` that is also
/// `Send + Sync + 'static` implements this trait automatically.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    fn call(&self, ctx: Context) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin((self)(ctx))
    }
}

fn erase(handler: impl IntoHandler) -> Handler {
    Arc::new(move |ctx: Context| handler.call(ctx))
}

// A single path segment, either a literal string or a named capture (`:name`).
#[derive(Debug, Clone)]
enum Segment {
    Static(String),
    Parameter(String),
}

// Compiled representation of a route pattern string.
#[derive(Debug, Clone)]
enum Pattern {
    // Matches one exact path string, e.g. `/api/tasks`.
    Exact(String),
    // Matches a fixed number of segments where some are named captures, e.g. `/api/tasks/:id`.
    Parameterized { segments: Vec<Segment> },
}

impl Pattern {
    /// Compile a route pattern. Patterns containing `:` become
    /// [`Pattern::Parameterized`]; everything else is an exact match.
    fn parse(pattern: &str) -> Self {
        if pattern.contains(':') {
            let segments = pattern
                .split('/')
                .map(|s| match s.strip_prefix(':') {
                    Some(name) => Segment::Parameter(name.to_owned()),
                    None => Segment::Static(s.to_owned()),
                })
                .collect();

            return Pattern::Parameterized { segments };
        }

        Pattern::Exact(pattern.to_owned())
    }

    // Try to match `path` against this pattern, returning captured params on success.
    fn matches(&self, path: &str) -> Option<PathParams> {
        match self {
            Pattern::Exact(p) => (p == path).then(PathParams::new),
            Pattern::Parameterized { segments } => {
                let path_segments: Vec<&str> = path.split('/').collect();
                if segments.len() != path_segments.len() {
                    return None;
                }

                let mut params = PathParams::new();
                for (seg, path_seg) in segments.iter().zip(path_segments) {
                    match seg {
                        Segment::Static(s) if s != path_seg => return None,
                        Segment::Static(_) => {}
                        Segment::Parameter(_) if path_seg.is_empty() => return None,
                        Segment::Parameter(name) => params.insert(name.clone(), path_seg),
                    }
                }
                Some(params)
            }
        }
    }
}

// A single registered route binding a method + pattern to a handler.
struct Route {
    method: Method,
    pattern: Pattern,
    handler: Handler,
}

impl Route {
    // Returns `Some(params)` when both the HTTP method and path pattern match.
    fn matches(&self, method: &Method, path: &str) -> Option<PathParams> {
        let method_matches =
            &self.method == method || (self.method == Method::Get && *method == Method::Head);
        if method_matches {
            self.pattern.matches(path)
        } else {
            None
        }
    }
}

/// HTTP request router that dispatches requests to registered handler functions.
///
/// Routes are evaluated in registration order. When no route matches, the
/// fallback answers `404` with `{"error":"Endpoint not found."}`.
///
/// # Examples
///
/// ```rust,no_run
/// use taskd::{Response, Router, StatusCode, context::Context};
///
/// let mut router = Router::new();
/// router.get("/api/tasks/:id", |ctx: Context| async move {
///     let id = ctx.params().get("id").unwrap_or_default().to_owned();
///     Response::new(StatusCode::Ok).body(id)
/// });
/// ```
pub struct Router {
    routes: Vec<Route>,
    fallback: Handler,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create a new, empty `Router`.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: erase(|_ctx: Context| async {
                Response::error(StatusCode::NotFound, "Endpoint not found.")
            }),
        }
    }

    /// Register a handler for `GET` requests matching `path`.
    pub fn get(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Get, path, handler);
    }

    /// Register a handler for `POST` requests matching `path`.
    pub fn post(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Post, path, handler);
    }

    /// Register a handler for `PUT` requests matching `path`.
    pub fn put(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Put, path, handler);
    }

    /// Register a handler for `DELETE` requests matching `path`.
    pub fn delete(&mut self, path: &str, handler: impl IntoHandler) {
        self.add_route(Method::Delete, path, handler);
    }

    fn add_route(&mut self, method: Method, path: &str, handler: impl IntoHandler) {
        self.routes.push(Route {
            method,
            pattern: Pattern::parse(path),
            handler: erase(handler),
        });
    }

    /// Dispatch `ctx` to the first matching route, or to the fallback.
    ///
    /// Captured path parameters are stored on the context before the handler runs.
    pub async fn dispatch(&self, mut ctx: Context) -> Response {
        let matched = self.routes.iter().find_map(|route| {
            route
                .matches(ctx.request().method(), ctx.request().path())
                .map(|params| (route, params))
        });

        match matched {
            Some((route, params)) => {
                ctx.set_params(params);
                (route.handler)(ctx).await
            }
            None => (self.fallback)(ctx).await,
        }
    }
}
