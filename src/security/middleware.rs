//! Cross-Origin Resource Sharing.

use std::future::Future;
use std::pin::Pin;

use crate::{
    Method, Response, StatusCode,
    context::Context,
    middleware::{Middleware, Next},
};

/// Seconds a browser may cache a preflight answer.
const PREFLIGHT_MAX_AGE: &str = "3600";

/// CORS middleware. Answers preflight requests and stamps
/// `Access-Control-*` headers on every other response.
///
/// The policy is fixed and permissive:
///
/// | Header                         | Value                             |
/// |--------------------------------|-----------------------------------|
/// | `Access-Control-Allow-Origin`  | `*`                               |
/// | `Access-Control-Allow-Methods` | `GET, POST, PUT, DELETE, OPTIONS` |
/// | `Access-Control-Allow-Headers` | `Content-Type`                    |
///
/// Every `OPTIONS` request is short-circuited with `204 No Content` plus
/// `Access-Control-Max-Age`; the router never sees it. The headers are
/// written whether or not the request sent an `Origin`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorsMiddleware;

impl CorsMiddleware {
    const ALLOW_ORIGIN: &'static str = "*";
    const ALLOW_METHODS: &'static str = "GET, POST, PUT, DELETE, OPTIONS";
    const ALLOW_HEADERS: &'static str = "Content-Type";

    pub fn new() -> Self {
        Self
    }

    fn decorate(response: &mut Response) {
        response.set_header("Access-Control-Allow-Origin", Self::ALLOW_ORIGIN);
        response.set_header("Access-Control-Allow-Methods", Self::ALLOW_METHODS);
        response.set_header("Access-Control-Allow-Headers", Self::ALLOW_HEADERS);
    }
}

impl Middleware for CorsMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let is_preflight = ctx.request().method() == &Method::Options;

        Box::pin(async move {
            let mut response = if is_preflight {
                Response::new(StatusCode::NoContent)
                    .header("Access-Control-Max-Age", PREFLIGHT_MAX_AGE)
            } else {
                next.run(ctx).await
            };
            Self::decorate(&mut response);
            response
        })
    }
}
