//! Middleware pipeline: composable before/after request handler logic.
//!
//! Each middleware wraps the next layer, enabling request inspection,
//! short-circuit responses, and response decoration without coupling route
//! handlers to infrastructure concerns. The chain always ends at a
//! [`Router`], so a request that passes every middleware is dispatched to a
//! route (or the router's fallback).
//!
//! ## Core types
//!
//! - [`Middleware`]: trait implemented by all middleware.
//! - [`Next`]: cursor into the remaining chain; call [`Next::run`] to advance.
//! - [`MiddlewareHandler`]: type-erased, cheaply-cloneable middleware function.
//! - [`LoggerMiddleware`]: one `tracing` line per request.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::time::Instant;

use crate::{Response, context::Context, router::Router};

/// A type-erased, reference-counted middleware function.
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Converts a [`Middleware`] implementation into a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: M) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    let middleware = Arc::new(middleware);
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// A cursor into the remaining middleware chain for a single request.
///
/// `Next` is consumed by [`run`](Self::run), so each middleware can forward a
/// request at most once.
///
/// # Examples
///
/// ```rust,no_run
/// use std::pin::Pin;
/// use taskd::{Response, context::Context, middleware::{Middleware, Next}};
///
/// struct PassThrough;
///
/// impl Middleware for PassThrough {
///     fn handle(
///         &self,
///         ctx: Context,
///         next: Next,
///     ) -> Pin<Box<dyn std::future::Future<Output = Response> + Send>> {
///         Box::pin(async move { next.run(ctx).await })
///     }
/// }
/// ```
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    endpoint: Arc<Router>,
    // Tracks which middleware to invoke on the next `run` call.
    index: usize,
}

impl Next {
    /// Creates a cursor positioned at the start of `middlewares`, ending at `endpoint`.
    pub fn new(middlewares: Arc<[MiddlewareHandler]>, endpoint: Arc<Router>) -> Self {
        Self {
            middlewares,
            endpoint,
            index: 0,
        }
    }

    /// Invokes the next middleware in the chain, or the router once the
    /// middleware stack is exhausted.
    pub async fn run(mut self, ctx: Context) -> Response {
        match self.middlewares.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler(ctx, self).await
            }
            None => self.endpoint.dispatch(ctx).await,
        }
    }
}

/// The core trait for all middleware.
///
/// Implementors receive a [`Context`] and a [`Next`] cursor. They may pass
/// the request through, short-circuit with their own [`Response`], or
/// decorate the downstream response.
///
/// Implementations must be `Send + Sync` because middleware is shared across
/// connection tasks.
pub trait Middleware: Send + Sync {
    /// Handle the request and optionally delegate to the next middleware.
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// Logs each request's method, path, status, and duration.
///
/// Emits a single `tracing::info!` record once the downstream response is
/// available; error statuses are logged at `warn`.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().clone();
            let path = ctx.request().path().to_owned();

            let response = next.run(ctx).await;

            let elapsed = start.elapsed();
            let status = response.status().as_u16();
            if response.status().is_error() {
                tracing::warn!(%method, %path, status, ?elapsed, "request failed");
            } else {
                tracing::info!(%method, %path, status, ?elapsed, "request served");
            }

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Request, StatusCode};

    fn ctx(method: &str, path: &str) -> Context {
        let raw = format!("{method} {path} HTTP/1.1\r\n\r\n");
        Context::new(Request::parse(raw.as_bytes()).unwrap().0)
    }

    fn router() -> Arc<Router> {
        let mut router = Router::new();
        router.get("/ok", |_ctx: Context| async { Response::new(StatusCode::Ok) });
        Arc::new(router)
    }

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn handle(
            &self,
            ctx: Context,
            next: Next,
        ) -> Pin<Box<dyn Future<Output = Response> + Send>> {
            let tag = self.0;
            Box::pin(async move {
                let seen = next.run(ctx).await;
                let trail = match seen.headers().get("X-Trail") {
                    Some(prev) => format!("{prev},{tag}"),
                    None => tag.to_owned(),
                };
                let mut response = seen;
                response.set_header("X-Trail", trail);
                response
            })
        }
    }

    struct Deny;

    impl Middleware for Deny {
        fn handle(
            &self,
            _ctx: Context,
            _next: Next,
        ) -> Pin<Box<dyn Future<Output = Response> + Send>> {
            Box::pin(async { Response::new(StatusCode::BadRequest) })
        }
    }

    #[tokio::test]
    async fn empty_chain_reaches_router() {
        let next = Next::new(Arc::from(Vec::new()), router());
        assert_eq!(next.run(ctx("GET", "/ok")).await.status(), StatusCode::Ok);
    }

    #[tokio::test]
    async fn middlewares_unwind_in_reverse_order() {
        let chain: Arc<[MiddlewareHandler]> =
            Arc::from(vec![from_middleware(Tag("outer")), from_middleware(Tag("inner"))]);
        let response = Next::new(chain, router()).run(ctx("GET", "/ok")).await;
        assert_eq!(response.headers().get("x-trail"), Some("inner,outer"));
    }

    #[tokio::test]
    async fn short_circuit_skips_router() {
        let chain: Arc<[MiddlewareHandler]> = Arc::from(vec![from_middleware(Deny)]);
        let response = Next::new(chain, router()).run(ctx("GET", "/ok")).await;
        assert_eq!(response.status(), StatusCode::BadRequest);
    }

    #[tokio::test]
    async fn logger_passes_response_through() {
        let chain: Arc<[MiddlewareHandler]> = Arc::from(vec![from_middleware(LoggerMiddleware)]);
        let response = Next::new(chain.clone(), router()).run(ctx("GET", "/ok")).await;
        assert_eq!(response.status(), StatusCode::Ok);
        let response = Next::new(chain, router()).run(ctx("GET", "/missing")).await;
        assert_eq!(response.status(), StatusCode::NotFound);
    }
}
