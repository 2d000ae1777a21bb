//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch core, middleware, server:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (request counter, latency histogram)
//!
//! Consumers:
//!     → stderr via tracing-subscriber
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through log events as a field
//! - Metrics are recorded through the `metrics` facade; without an installed
//!   recorder they are no-ops

pub mod logging;
pub mod metrics;
