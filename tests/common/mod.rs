//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use switchyard::{handler_fn, middleware_fn, Handler, MiddlewareFunc};

/// Build a request with an empty body.
pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Collect a response body as UTF-8.
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Handler answering 200 with a fixed text body.
pub fn text(body: &'static str) -> impl Handler {
    handler_fn(move |c| Box::pin(async move { c.string(StatusCode::OK, body) }))
}

/// Shared, ordered event log for middleware ordering tests.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Middleware logging `{label}-before` and `{label}-after` around `next`.
    pub fn middleware(&self, label: &'static str) -> MiddlewareFunc {
        let log = self.clone();
        middleware_fn(move |c, next| {
            let log = log.clone();
            Box::pin(async move {
                log.push(format!("{label}-before"));
                let result = next.run(c).await;
                log.push(format!("{label}-after"));
                result
            })
        })
    }

    /// Handler logging `H` then answering 200.
    pub fn handler(&self) -> impl Handler {
        let log = self.clone();
        handler_fn(move |c| {
            let log = log.clone();
            Box::pin(async move {
                log.push("H");
                c.no_content(StatusCode::OK)
            })
        })
    }
}
