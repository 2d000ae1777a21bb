//! Request dispatch.
//!
//! # Data Flow
//! ```text
//! Request<Body>
//!     → pool.rs (acquire + reset a Context)
//!     → routing::RouteTable::resolve
//!     → global middleware → route middleware → handler
//!     → failure classification (not found / error responder)
//!     → Response<Body>; Context back to the pool
//! ```

pub mod core;
pub mod pool;

pub use self::core::{default_error_handler, Core, ErrorHandler};
pub use self::pool::{ContextPool, PooledContext};
