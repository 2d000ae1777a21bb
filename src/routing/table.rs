//! Ordered route table and request matching.
//!
//! # Responsibilities
//! - Store routes in registration order, append-only
//! - Own the name registry shared by the table and its groups
//! - Resolve (method, path) to a route: first match wins
//! - Report method mismatch separately from "not found"
//!
//! Ambiguous patterns are resolved by registration order only; there is no
//! specificity ranking.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;

use crate::error::RouteError;
use crate::handler::{BoxedHandler, MiddlewareFunc};
use crate::routing::pattern::BuildError;
use crate::routing::register::Routes;
use crate::routing::route::{Route, RouteBuilder, RouteInfo};

/// Why a request could not be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("not found")]
    NotFound,

    /// Some route matched the path, none matched the method.
    #[error("method not allowed")]
    MethodNotAllowed,
}

/// A successful resolution.
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    /// Route handler wrapped in the route's middleware.
    pub handler: BoxedHandler,
    pub param_names: Arc<[String]>,
    pub param_values: Vec<String>,
}

impl RouteMatch<'_> {
    pub fn info(&self) -> &RouteInfo {
        self.route.info()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.param_names
            .iter()
            .zip(&self.param_values)
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Debug for RouteMatch<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteMatch")
            .field("route", self.route)
            .field("param_names", &self.param_names)
            .field("param_values", &self.param_values)
            .finish_non_exhaustive()
    }
}

/// Error building a URL for a named route.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UrlError {
    #[error("no route named {0}")]
    UnknownRoute(String),

    #[error("route {0} has no usable pattern")]
    Unroutable(String),

    #[error(transparent)]
    Build(#[from] BuildError),
}

#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    /// Name registry: route name to index in `routes`.
    names: HashMap<String, usize>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty route and return its builder.
    pub fn new_route(&mut self) -> RouteBuilder<'_> {
        let index = self.routes.len();
        self.routes.push(Route::new());
        RouteBuilder::new(&mut self.routes[index], &mut self.names, index)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Route registered under `name`.
    pub fn route(&self, name: &str) -> Option<&Route> {
        self.names.get(name).and_then(|&i| self.routes.get(i))
    }

    /// Build errors of every route, in registration order.
    pub fn errors(&self) -> impl Iterator<Item = &RouteError> {
        self.routes.iter().filter_map(Route::error)
    }

    /// Build the URL of a named route from placeholder values.
    pub fn url<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<String, UrlError> {
        let route = self
            .route(name)
            .ok_or_else(|| UrlError::UnknownRoute(name.to_string()))?;
        let pattern = route
            .pattern()
            .filter(|_| route.error().is_none())
            .ok_or_else(|| UrlError::Unroutable(name.to_string()))?;
        Ok(pattern.build(values)?)
    }

    /// Resolve a request to a route.
    ///
    /// Routes are scanned in registration order. Routes with a build error,
    /// no pattern or no handler are skipped. A path match with the wrong
    /// method is remembered and scanning continues; the first path and method
    /// match wins.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch<'_>, MatchError> {
        let mut outcome = MatchError::NotFound;

        for route in &self.routes {
            if route.error().is_some() || !route.has_handler() {
                continue;
            }
            let Some(pattern) = route.pattern() else {
                continue;
            };
            let Some(values) = pattern.captures(path) else {
                continue;
            };

            if route.method() != Some(method) {
                outcome = MatchError::MethodNotAllowed;
                continue;
            }

            let Some(handler) = route.chain() else {
                continue;
            };
            return Ok(RouteMatch {
                route,
                handler,
                param_names: pattern.shared_names(),
                param_values: values,
            });
        }

        Err(outcome)
    }
}

impl Routes for RouteTable {
    fn add_boxed(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler,
        middleware: Vec<MiddlewareFunc>,
    ) -> RouteBuilder<'_> {
        self.new_route()
            .path(path)
            .boxed_handler(handler)
            .method(method)
            .middleware(middleware)
    }
}
