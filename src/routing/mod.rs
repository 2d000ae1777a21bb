//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (setup phase, &mut access):
//!     path template
//!     → pattern.rs (canonicalize, compile anchored regex)
//!     → route.rs (builder: method, handler, name, middleware)
//!     → table.rs (append; names claimed in the shared registry)
//!
//! Incoming request (method, path):
//!     → table.rs (linear scan in registration order)
//!     → Return: RouteMatch, MethodNotAllowed or NotFound
//! ```
//!
//! # Design Decisions
//! - Routes are registered before serving and read-only afterwards
//! - First match wins; no specificity ranking between patterns
//! - Build errors are recorded on the route, never raised mid-chain

pub mod group;
pub mod pattern;
pub mod register;
pub mod route;
pub mod table;

pub use group::{join_paths, Group};
pub use pattern::{BuildError, PathPattern, PatternError};
pub use register::{Routes, ALL_METHODS};
pub use route::{Route, RouteBuilder, RouteInfo};
pub use table::{MatchError, RouteMatch, RouteTable, UrlError};
