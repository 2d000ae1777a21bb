//! Switchyard: the request-dispatch core of a small HTTP framework.
//!
//! Routes are declared as path templates (`/users/{id:[0-9]+}`) bound to a
//! method, a handler and optional middleware. A request is matched against
//! the routes in registration order, run through global and route middleware
//! with a pooled per-request [`Context`], and answered with whatever the
//! handler wrote.
//!
//! ```ignore
//! let mut core = Core::new();
//! core.use_middleware([middleware::recover()]);
//! core.get("/users/{id}", handler_fn(|c| Box::pin(async move {
//!     let id = c.param("id").unwrap_or_default().to_string();
//!     c.string(StatusCode::OK, id)
//! })))
//! .name("user");
//!
//! let server = HttpServer::new(core, ServerConfig::default())?;
//! server.run(listener, shutdown.signalled()).await?;
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod render;
pub mod routing;

pub use config::ServerConfig;
pub use dispatch::Core;
pub use error::{BoxError, Error, HandlerResult, HttpError, RouteError};
pub use handler::{handler_fn, middleware_fn, BoxedHandler, Handler, MiddlewareFunc};
pub use http::{Context, HttpServer};
pub use lifecycle::Shutdown;
pub use render::Renderer;
pub use routing::{Group, RouteBuilder, Routes};
