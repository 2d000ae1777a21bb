//! Registration shortcuts shared by the dispatch core, the route table and
//! groups.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;

use crate::error::RouteError;
use crate::handler::{self, BoxedHandler, Handler, MiddlewareFunc};
use crate::http::statics::{SingleFile, StaticDir};
use crate::routing::route::RouteBuilder;

/// Every method a route registered with [`Routes::any`] answers to.
pub const ALL_METHODS: [Method; 9] = [
    Method::CONNECT,
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::PATCH,
    Method::POST,
    Method::PUT,
    Method::TRACE,
];

/// Something routes can be added to.
///
/// Implementors only provide [`add_boxed`](Self::add_boxed); the method
/// shortcuts, `any`, and the file helpers all funnel through it.
pub trait Routes {
    fn add_boxed(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler,
        middleware: Vec<MiddlewareFunc>,
    ) -> RouteBuilder<'_>;

    fn add(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        middleware: Vec<MiddlewareFunc>,
    ) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.add_boxed(method, path, handler::boxed(handler), middleware)
    }

    fn get(&mut self, path: &str, handler: impl Handler) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.add(Method::GET, path, handler, Vec::new())
    }

    fn head(&mut self, path: &str, handler: impl Handler) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.add(Method::HEAD, path, handler, Vec::new())
    }

    fn post(&mut self, path: &str, handler: impl Handler) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.add(Method::POST, path, handler, Vec::new())
    }

    fn put(&mut self, path: &str, handler: impl Handler) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.add(Method::PUT, path, handler, Vec::new())
    }

    fn patch(&mut self, path: &str, handler: impl Handler) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.add(Method::PATCH, path, handler, Vec::new())
    }

    fn delete(&mut self, path: &str, handler: impl Handler) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.add(Method::DELETE, path, handler, Vec::new())
    }

    fn connect(&mut self, path: &str, handler: impl Handler) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.add(Method::CONNECT, path, handler, Vec::new())
    }

    fn options(&mut self, path: &str, handler: impl Handler) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.add(Method::OPTIONS, path, handler, Vec::new())
    }

    fn trace(&mut self, path: &str, handler: impl Handler) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.add(Method::TRACE, path, handler, Vec::new())
    }

    /// Register `handler` under every method in [`ALL_METHODS`]. Returns the
    /// first build error; all nine routes share the same path, so they fail
    /// together.
    fn any(
        &mut self,
        path: &str,
        handler: impl Handler,
        middleware: Vec<MiddlewareFunc>,
    ) -> Result<(), RouteError>
    where
        Self: Sized,
    {
        let handler = handler::boxed(handler);
        let mut first_error = None;
        for method in ALL_METHODS {
            let builder = self.add_boxed(method, path, Arc::clone(&handler), middleware.clone());
            if first_error.is_none() {
                first_error = builder.error().cloned();
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Serve files below `root` under `prefix` with `GET`.
    fn static_files(&mut self, prefix: &str, root: impl Into<PathBuf>) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        let mut path = prefix.to_string();
        if !path.ends_with('/') {
            path.push('/');
        }
        path.push_str("{path:.*}");
        self.get(&path, StaticDir::new(root))
    }

    /// Serve one file from disk at `path` with `GET`.
    fn file(&mut self, path: &str, fs_path: impl Into<PathBuf>) -> RouteBuilder<'_>
    where
        Self: Sized,
    {
        self.get(path, SingleFile::new(fs_path))
    }
}
