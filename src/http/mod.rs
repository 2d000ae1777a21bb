//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, tower layers, catch-all route)
//!     → dispatch::Core::serve
//!     → context.rs (per-request state, response helpers)
//!     → response.rs (buffered status, headers, body)
//!     → Send to client
//! ```

pub mod context;
pub mod mime;
pub mod response;
pub mod server;
pub mod statics;

pub use context::Context;
pub use response::ResponseWriter;
pub use server::{HttpServer, ServerError};
pub use statics::{SingleFile, StaticDir};
