//! Free-list of request contexts.
//!
//! # Responsibilities
//! - Hand out a reset [`Context`] per request
//! - Take it back when the request finishes, on every exit path
//! - Bound the number of idle contexts kept around
//!
//! A context is never shared between requests: the guard owns it exclusively
//! until it is dropped.

use std::ops::{Deref, DerefMut};

use axum::body::Body;
use axum::http::Request;
use parking_lot::Mutex;

use crate::http::Context;

/// Idle contexts retained by default.
pub const DEFAULT_MAX_IDLE: usize = 1024;

pub struct ContextPool {
    free: Mutex<Vec<Context>>,
    max_idle: usize,
}

impl ContextPool {
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Pool that keeps at most `max_idle` released contexts.
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Take a context from the pool (or allocate one) and reset it for
    /// `request`.
    pub fn acquire(&self, request: Request<Body>) -> PooledContext<'_> {
        let recycled = self.free.lock().pop();
        let ctx = match recycled {
            Some(mut ctx) => {
                ctx.reset(request);
                ctx
            }
            None => Context::new(request),
        };
        PooledContext {
            pool: self,
            ctx: Some(ctx),
        }
    }

    /// Number of contexts waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    fn release(&self, mut ctx: Context) {
        ctx.release();
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(ctx);
        }
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContextPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextPool")
            .field("idle", &self.idle())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// A context on loan from a [`ContextPool`]; returned when dropped.
pub struct PooledContext<'p> {
    pool: &'p ContextPool,
    ctx: Option<Context>,
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        // Only `drop` takes the context out.
        self.ctx.as_ref().unwrap_or_else(|| unreachable!("context used after release"))
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx.as_mut().unwrap_or_else(|| unreachable!("context used after release"))
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}
