//! The dispatch core.
//!
//! # Responsibilities
//! - Collect routes, groups and global middleware during setup
//! - Turn one request into one response: match, run the chain, classify
//!   failures
//! - Supply the built-in fallbacks (404, 405, error responder)
//! - Record per-request metrics
//!
//! # Design Decisions
//! - Registration takes `&mut Core`; serving takes `&Core` (usually behind
//!   an `Arc`), so routes cannot change once requests are flowing
//! - Global middleware wraps matched routes and configured 404/405 handlers;
//!   the built-in fallbacks run bare

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};

use crate::dispatch::pool::ContextPool;
use crate::error::{Error, HandlerResult, RouteError};
use crate::handler::{self, handler_fn, BoxedHandler, Handler, MiddlewareFunc};
use crate::http::Context;
use crate::observability::metrics;
use crate::render::Renderer;
use crate::routing::{Group, MatchError, RouteBuilder, RouteTable, Routes, UrlError};

/// Responds to a failed handler. Called with the failure and the context the
/// failure happened in.
pub type ErrorHandler = Arc<dyn Fn(&Error, &mut Context) + Send + Sync>;

pub struct Core {
    table: RouteTable,
    middleware: Vec<MiddlewareFunc>,
    pool: ContextPool,
    renderer: Option<Arc<dyn Renderer>>,
    not_found: Option<BoxedHandler>,
    method_not_allowed: Option<BoxedHandler>,
    system_error: Option<ErrorHandler>,
}

impl Core {
    pub fn new() -> Self {
        Self::with_pool(ContextPool::new())
    }

    pub fn with_pool(pool: ContextPool) -> Self {
        Self {
            table: RouteTable::new(),
            middleware: Vec::new(),
            pool,
            renderer: None,
            not_found: None,
            method_not_allowed: None,
            system_error: None,
        }
    }

    // ----- setup -----

    /// Append global middleware. The first registered is the outermost.
    pub fn use_middleware(&mut self, middleware: impl IntoIterator<Item = MiddlewareFunc>) -> &mut Self {
        self.middleware.extend(middleware);
        self
    }

    /// Open a group whose routes get `prefix` and `middleware`.
    pub fn group(&mut self, prefix: &str, middleware: Vec<MiddlewareFunc>) -> Group<'_> {
        Group::new(&mut self.table, prefix, middleware)
    }

    /// Start an empty route.
    pub fn new_route(&mut self) -> RouteBuilder<'_> {
        self.table.new_route()
    }

    /// Start a route with only its path set.
    pub fn path(&mut self, path: &str) -> RouteBuilder<'_> {
        self.table.new_route().path(path)
    }

    pub fn with_renderer(&mut self, renderer: Arc<dyn Renderer>) -> &mut Self {
        self.renderer = Some(renderer);
        self
    }

    /// Handler for unmatched paths and for handlers that report not found.
    pub fn not_found_handler(&mut self, handler: impl Handler) -> &mut Self {
        self.not_found = Some(handler::boxed(handler));
        self
    }

    /// Handler for paths that matched under a different method.
    pub fn method_not_allowed_handler(&mut self, handler: impl Handler) -> &mut Self {
        self.method_not_allowed = Some(handler::boxed(handler));
        self
    }

    /// Replace the built-in error responder.
    pub fn system_error_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Error, &mut Context) + Send + Sync + 'static,
    {
        self.system_error = Some(Arc::new(handler));
        self
    }

    // ----- inspection -----

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn middleware(&self) -> &[MiddlewareFunc] {
        &self.middleware
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    /// URL of a named route.
    pub fn url<S: AsRef<str>>(&self, name: &str, values: &[S]) -> Result<String, UrlError> {
        self.table.url(name, values)
    }

    /// Every route build error. Run before serving; a route with an error is
    /// never matched.
    pub fn check_routes(&self) -> Result<(), Vec<RouteError>> {
        let errors: Vec<RouteError> = self.table.errors().cloned().collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    // ----- serving -----

    /// Dispatch one request.
    pub async fn serve(&self, request: Request<Body>) -> Response<Body> {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let mut ctx = self.pool.acquire(request);
        ctx.set_renderer(self.renderer.clone());

        let chain = match self.table.resolve(&method, &path) {
            Ok(matched) => {
                ctx.set_route(Some(matched.info().clone()));
                ctx.set_params(matched.param_names, matched.param_values);
                handler::compose(matched.handler, &self.middleware)
            }
            Err(MatchError::MethodNotAllowed) => match &self.method_not_allowed {
                Some(h) => handler::compose(Arc::clone(h), &self.middleware),
                None => self.fallback_method_not_allowed(),
            },
            Err(MatchError::NotFound) => match &self.not_found {
                Some(h) => handler::compose(Arc::clone(h), &self.middleware),
                None => self.fallback_not_found(),
            },
        };

        if let Err(err) = chain.run(&mut ctx).await {
            self.handle_error(err, &mut ctx).await;
        }

        let response = ctx.response_mut().take();
        let route = ctx.route().map_or("none", |r| r.name()).to_string();
        drop(ctx);

        metrics::record_request(method.as_str(), response.status().as_u16(), &route, start);
        response
    }

    async fn handle_error(&self, err: Error, ctx: &mut Context) {
        if err.is_not_found() {
            if ctx.response().committed() {
                return;
            }
            if let Err(err) = self.fallback_not_found().run(ctx).await {
                log_failure(&err, ctx);
            }
            return;
        }

        log_failure(&err, ctx);
        if ctx.response().committed() {
            return;
        }
        match &self.system_error {
            Some(handler) => handler(&err, ctx),
            None => default_error_handler(&err, ctx),
        }
    }

    fn fallback_not_found(&self) -> BoxedHandler {
        self.not_found
            .clone()
            .unwrap_or_else(|| handler::boxed(handler_fn(default_not_found)))
    }

    fn fallback_method_not_allowed(&self) -> BoxedHandler {
        self.method_not_allowed
            .clone()
            .unwrap_or_else(|| handler::boxed(handler_fn(default_method_not_allowed)))
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

impl Routes for Core {
    fn add_boxed(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler,
        middleware: Vec<MiddlewareFunc>,
    ) -> RouteBuilder<'_> {
        self.table.add_boxed(method, path, handler, middleware)
    }
}

impl std::fmt::Debug for Core {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Core")
            .field("routes", &self.table.len())
            .field("middleware", &self.middleware.len())
            .field("pool", &self.pool)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

fn default_not_found(ctx: &mut Context) -> futures_util::future::BoxFuture<'_, HandlerResult> {
    Box::pin(async move { ctx.string(StatusCode::NOT_FOUND, "404 page not found") })
}

fn default_method_not_allowed(ctx: &mut Context) -> futures_util::future::BoxFuture<'_, HandlerResult> {
    Box::pin(async move { ctx.no_content(StatusCode::METHOD_NOT_ALLOWED) })
}

/// Built-in error responder: an [`HttpError`](crate::HttpError) is sent with
/// its own status and JSON body; anything else becomes a bare 500 so internal
/// details stay in the logs. `HEAD` responses carry no body.
pub fn default_error_handler(err: &Error, ctx: &mut Context) {
    let head = ctx.request().method() == Method::HEAD;

    let result = match err {
        Error::Http(http) if head => ctx.no_content(http.code),
        Error::Http(http) => ctx.json(http.code, &http.body()),
        _ if head => ctx.no_content(StatusCode::INTERNAL_SERVER_ERROR),
        _ => ctx.string(
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::INTERNAL_SERVER_ERROR
                .canonical_reason()
                .unwrap_or_default(),
        ),
    };

    if let Err(err) = result {
        tracing::error!(error = %err, "failed to write error response");
    }
}

fn log_failure(err: &Error, ctx: &Context) {
    let request = ctx.request();
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let request_id = ctx
        .request_id()
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let remote_addr = ctx.remote_addr().map(|a| a.to_string()).unwrap_or_default();

    tracing::error!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        remote_addr = %remote_addr,
        user_agent = %user_agent,
        route = ctx.route().map_or("none", |r| r.name()),
        error = %err,
        "request failed"
    );
}
