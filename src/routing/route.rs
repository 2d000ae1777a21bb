//! A single route and its builder.
//!
//! # Responsibilities
//! - Bind a compiled pattern, method, handler, middleware and name
//! - Record the first build error and ignore further configuration after it
//! - Claim names in the registry shared by the table and every group
//! - Cache the route-level middleware chain once serving starts

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use axum::http::Method;

use crate::error::RouteError;
use crate::handler::{self, BoxedHandler, Handler, MiddlewareFunc};
use crate::routing::pattern::PathPattern;

/// Lookup-only description of a route, handed to request contexts.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    name: Arc<str>,
    path: Arc<str>,
    method: Option<Method>,
}

impl RouteInfo {
    /// Explicit name, or the path when none was assigned.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }
}

/// A route in the table.
pub struct Route {
    info: RouteInfo,
    /// True once a name has been claimed in the registry.
    named: bool,
    pattern: Option<PathPattern>,
    handler: Option<BoxedHandler>,
    middleware: Vec<MiddlewareFunc>,
    error: Option<RouteError>,
    /// Handler wrapped in the route middleware, built on first match.
    chain: OnceLock<BoxedHandler>,
}

impl Route {
    pub(crate) fn new() -> Self {
        Self {
            info: RouteInfo {
                name: Arc::from(""),
                path: Arc::from(""),
                method: None,
            },
            named: false,
            pattern: None,
            handler: None,
            middleware: Vec::new(),
            error: None,
            chain: OnceLock::new(),
        }
    }

    pub fn info(&self) -> &RouteInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// The path as registered, before canonicalization.
    pub fn path(&self) -> &str {
        self.info.path()
    }

    pub fn method(&self) -> Option<&Method> {
        self.info.method()
    }

    pub fn pattern(&self) -> Option<&PathPattern> {
        self.pattern.as_ref()
    }

    pub fn error(&self) -> Option<&RouteError> {
        self.error.as_ref()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn middleware(&self) -> &[MiddlewareFunc] {
        &self.middleware
    }

    /// Handler wrapped in this route's middleware, nearest-to-handler last in
    /// the declared list.
    pub(crate) fn chain(&self) -> Option<BoxedHandler> {
        let handler = self.handler.as_ref()?;
        Some(Arc::clone(self.chain.get_or_init(|| {
            handler::compose(Arc::clone(handler), &self.middleware)
        })))
    }

    fn invalidate_chain(&mut self) {
        self.chain = OnceLock::new();
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.info.name)
            .field("path", &self.info.path)
            .field("method", &self.info.method)
            .field("middleware", &self.middleware.len())
            .field("has_handler", &self.handler.is_some())
            .field("error", &self.error)
            .finish()
    }
}

/// Fluent configuration for a route stored in a [`RouteTable`](super::RouteTable).
///
/// Every method is a no-op once the route holds an error; call
/// [`build`](Self::build) to inspect the outcome.
pub struct RouteBuilder<'a> {
    route: &'a mut Route,
    names: &'a mut HashMap<String, usize>,
    index: usize,
}

impl<'a> RouteBuilder<'a> {
    pub(crate) fn new(route: &'a mut Route, names: &'a mut HashMap<String, usize>, index: usize) -> Self {
        Self { route, names, index }
    }

    /// Compile and set the path. Without an explicit name, the path becomes
    /// the route's (unregistered) name.
    pub fn path(self, path: &str) -> Self {
        if self.route.error.is_some() {
            return self;
        }

        match PathPattern::compile(path) {
            Ok(pattern) => self.route.pattern = Some(pattern),
            Err(source) => {
                self.route.error = Some(RouteError::Pattern {
                    path: path.to_string(),
                    source,
                });
            }
        }

        self.route.info.path = Arc::from(path);
        if !self.route.named {
            self.route.info.name = Arc::from(path);
        }
        self
    }

    pub fn method(self, method: Method) -> Self {
        if self.route.error.is_none() {
            self.route.info.method = Some(method);
        }
        self
    }

    pub fn handler(self, handler: impl Handler) -> Self {
        self.boxed_handler(handler::boxed(handler))
    }

    pub fn boxed_handler(self, handler: BoxedHandler) -> Self {
        if self.route.error.is_none() {
            self.route.handler = Some(handler);
            self.route.invalidate_chain();
        }
        self
    }

    /// Claim `name` in the shared registry. A name already held by another
    /// route is an error; the existing holder keeps it.
    pub fn name(self, name: &str) -> Self {
        if self.route.error.is_some() {
            return self;
        }

        let holder = self.names.get(name).copied();
        match holder {
            Some(holder) if holder != self.index => {
                self.route.error = Some(RouteError::DuplicateName(name.to_string()));
            }
            _ => {
                if self.route.named && self.route.info.name.as_ref() != name {
                    self.names.remove(self.route.info.name.as_ref());
                }
                self.names.insert(name.to_string(), self.index);
                self.route.info.name = Arc::from(name);
                self.route.named = true;
            }
        }
        self
    }

    /// Append middleware; earlier entries wrap later ones.
    pub fn middleware(self, middleware: impl IntoIterator<Item = MiddlewareFunc>) -> Self {
        if self.route.error.is_none() {
            self.route.middleware.extend(middleware);
            self.route.invalidate_chain();
        }
        self
    }

    /// Append a single middleware.
    pub fn with(self, middleware: MiddlewareFunc) -> Self {
        self.middleware([middleware])
    }

    pub fn error(&self) -> Option<&RouteError> {
        self.route.error.as_ref()
    }

    /// Index of the route in its table.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Finish configuration, surfacing any recorded error.
    pub fn build(self) -> Result<&'a Route, RouteError> {
        let route: &'a Route = self.route;
        match &route.error {
            Some(err) => Err(err.clone()),
            None => Ok(route),
        }
    }
}
