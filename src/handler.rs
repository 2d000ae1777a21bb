//! Handler and middleware contracts.
//!
//! A handler borrows the request [`Context`] for the duration of one call and
//! reports success (response already written) or an [`Error`](crate::Error).
//! A middleware turns one handler into another; [`compose`] folds a list of
//! middleware so the first entry is the outermost wrapper.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::error::HandlerResult;
use crate::http::Context;

/// Request handler.
pub trait Handler: Send + Sync + 'static {
    fn run<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult>;
}

/// Shared, type-erased handler.
pub type BoxedHandler = Arc<dyn Handler>;

/// Handler-to-handler transformation.
pub type MiddlewareFunc = Arc<dyn Fn(BoxedHandler) -> BoxedHandler + Send + Sync>;

/// Handler backed by a closure. Built with [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    fn run<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self.f)(ctx)
    }
}

/// Turn a closure into a [`Handler`].
///
/// ```ignore
/// core.get("/hello", handler_fn(|c| Box::pin(async move {
///     c.string(StatusCode::OK, "hello")
/// })));
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
{
    HandlerFn { f }
}

impl Handler for BoxedHandler {
    fn run<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (**self).run(ctx)
    }
}

/// Erase a handler's type.
pub fn boxed<H: Handler>(handler: H) -> BoxedHandler {
    Arc::new(handler)
}

/// Wrap `handler` with `middleware`; `middleware[0]` ends up outermost.
pub fn compose(handler: BoxedHandler, middleware: &[MiddlewareFunc]) -> BoxedHandler {
    middleware.iter().rev().fold(handler, |next, m| m(next))
}

/// Middleware built from a closure that receives the context and the next
/// handler in the chain.
///
/// ```ignore
/// let timing = middleware_fn(|c, next| Box::pin(async move {
///     let start = Instant::now();
///     let result = next.run(c).await;
///     tracing::debug!(elapsed = ?start.elapsed(), "request handled");
///     result
/// }));
/// ```
pub fn middleware_fn<F>(f: F) -> MiddlewareFunc
where
    F: for<'a> Fn(&'a mut Context, &'a BoxedHandler) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |next: BoxedHandler| -> BoxedHandler {
        Arc::new(FnMiddleware {
            f: Arc::clone(&f),
            next,
        })
    })
}

struct FnMiddleware<F> {
    f: Arc<F>,
    next: BoxedHandler,
}

impl<F> Handler for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut Context, &'a BoxedHandler) -> BoxFuture<'a, HandlerResult>
        + Send
        + Sync
        + 'static,
{
    fn run<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        (self.f)(ctx, &self.next)
    }
}
