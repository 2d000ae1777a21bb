//! Per-client concurrent request limiter.
//!
//! Counts requests in flight per client IP (see `Context::real_ip`). A request
//! arriving while its client already has `max` requests in flight is answered
//! with 429 and never reaches the handler.

use std::sync::Arc;

use axum::http::StatusCode;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::handler::{middleware_fn, MiddlewareFunc};
use crate::observability::metrics;

pub struct ConcurrencyLimiter {
    /// 0 disables limiting.
    max: usize,
    in_flight: DashMap<String, usize>,
}

impl ConcurrencyLimiter {
    pub fn new(max: usize) -> Arc<Self> {
        Arc::new(Self {
            max,
            in_flight: DashMap::new(),
        })
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Requests currently in flight for `client`.
    pub fn in_flight(&self, client: &str) -> usize {
        self.in_flight.get(client).map_or(0, |n| *n)
    }

    /// Claim a slot for `client`. The check and the increment happen under
    /// the same shard lock. The slot is given back when the permit drops.
    pub fn try_acquire(self: &Arc<Self>, client: &str) -> Option<Permit> {
        let mut count = self.in_flight.entry(client.to_string()).or_insert(0);
        if *count >= self.max {
            return None;
        }
        *count += 1;
        drop(count);

        Some(Permit {
            limiter: Arc::clone(self),
            client: client.to_string(),
        })
    }

    fn release(&self, client: &str) {
        if let Entry::Occupied(mut entry) = self.in_flight.entry(client.to_string()) {
            let count = entry.get_mut();
            *count = count.saturating_sub(1);
            if *count == 0 {
                entry.remove();
            }
        }
    }

    /// The limiter as middleware. With `max == 0`, or when the client IP is
    /// unknown, requests pass straight through.
    pub fn middleware(self: &Arc<Self>) -> MiddlewareFunc {
        let limiter = Arc::clone(self);
        middleware_fn(move |c, next| {
            let limiter = Arc::clone(&limiter);
            Box::pin(async move {
                if limiter.max == 0 {
                    return next.run(c).await;
                }
                let client = c.real_ip();
                if client.is_empty() {
                    return next.run(c).await;
                }

                let Some(_permit) = limiter.try_acquire(&client) else {
                    tracing::warn!(client = %client, max = limiter.max, "Concurrent request limit exceeded");
                    metrics::record_limited();
                    return c.string(
                        StatusCode::TOO_MANY_REQUESTS,
                        StatusCode::TOO_MANY_REQUESTS
                            .canonical_reason()
                            .unwrap_or_default(),
                    );
                };
                next.run(c).await
            })
        })
    }
}

impl std::fmt::Debug for ConcurrencyLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrencyLimiter")
            .field("max", &self.max)
            .field("clients", &self.in_flight.len())
            .finish()
    }
}

/// A held slot; dropping it frees the slot, including on early return and
/// unwinding.
pub struct Permit {
    limiter: Arc<ConcurrencyLimiter>,
    client: String,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.limiter.release(&self.client);
    }
}
