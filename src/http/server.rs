//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Finish the dispatch core from config (static mounts, concurrency limit)
//! - Refuse to start with broken routes
//! - Create the axum Router whose catch-all routes forward into the core
//! - Wire up tower layers (panic catch, body limit, timeout, request ID,
//!   tracing)
//! - Serve with connect-info and graceful shutdown

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::dispatch::Core;
use crate::error::RouteError;
use crate::middleware::ConcurrencyLimiter;
use crate::routing::Routes;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("{} route(s) failed to build: {}", .0.len(), join(.0))]
    Routes(Vec<RouteError>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn join(errors: &[RouteError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// HTTP server around a finished dispatch core.
pub struct HttpServer {
    router: Router,
    core: Arc<Core>,
    config: ServerConfig,
}

impl HttpServer {
    /// Take ownership of `core`, apply `config` to it and build the router.
    ///
    /// Fails if any registered route carries a build error.
    pub fn new(mut core: Core, config: ServerConfig) -> Result<Self, ServerError> {
        for mount in &config.static_files {
            core.static_files(&mount.prefix, &mount.root);
            tracing::info!(prefix = %mount.prefix, root = %mount.root, "Static directory mounted");
        }

        let max = config.limits.max_concurrent_per_client;
        if max > 0 {
            core.use_middleware([ConcurrencyLimiter::new(max).middleware()]);
        }

        if let Err(errors) = core.check_routes() {
            for err in &errors {
                tracing::error!(error = %err, "Route failed to build");
            }
            return Err(ServerError::Routes(errors));
        }

        tracing::info!(
            routes = core.table().len(),
            middleware = core.middleware().len(),
            "Dispatch core ready"
        );

        let core = Arc::new(core);
        let router = Self::build_router(&config, Arc::clone(&core));
        Ok(Self {
            router,
            core,
            config,
        })
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, core: Arc<Core>) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(core)
            .layer(CatchPanicLayer::new())
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving through other means (tests, custom listeners).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Run the server on `listener` until `shutdown` completes, then wait for
    /// in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every request goes through the dispatch core.
async fn dispatch(State(core): State<Arc<Core>>, request: Request<Body>) -> Response<Body> {
    core.serve(request).await
}
