//! Per-request context handed through the middleware chain to route handlers.
//!
//! A [`Context`] starts out holding only the [`Request`]; the router fills in
//! the [`PathParams`] captured by the matching route before calling its
//! handler.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::Request;

/// Path parameters captured from `:name` segments of the matched route.
#[derive(Default, Debug, Clone)]
pub struct PathParams {
    map: HashMap<String, String>,
}

impl PathParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.map.insert(key.into(), value.into());
    }

    /// Returns the captured value for `key`, if the route declared it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }
}

/// Per-request state: the parsed request plus router captures.
#[derive(Debug)]
pub struct Context {
    request: Request,
    params: PathParams,
}

impl Context {
    /// Create a context with no captured parameters.
    pub fn new(request: Request) -> Self {
        Self::with_params(request, PathParams::new())
    }

    pub fn with_params(request: Request, params: PathParams) -> Self {
        Self { request, params }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Replaces the captured parameters. Called by the router once a route matches.
    pub fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }

    /// Decodes the request body as JSON.
    ///
    /// A zero-length body decodes as `{}`, so a bodiless `POST` reaches field
    /// validation instead of failing as malformed JSON. Any other body,
    /// whitespace included, must be a JSON document.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: DeserializeOwned,
    {
        let body = self.request.body();
        if body.is_empty() {
            return serde_json::from_slice(b"{}");
        }
        serde_json::from_slice(body)
    }
}
