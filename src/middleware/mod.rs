//! Stock middleware.
//!
//! # Available
//! - [`recover`]: turn a panicking handler into a 500 response
//! - [`ConcurrencyLimiter`]: cap in-flight requests per client IP
//!
//! Both plug into the chain as plain [`MiddlewareFunc`](crate::MiddlewareFunc)
//! values; register `recover()` first so it wraps everything after it.

pub mod limit;
pub mod recover;

pub use limit::ConcurrencyLimiter;
pub use recover::recover;
