//! Buffered response writer.
//!
//! # Responsibilities
//! - Hold status, headers and body while the handler chain runs
//! - Commit the status once; later status writes are ignored
//! - Hand the finished response to the dispatch core
//!
//! The first body write commits an implicit `200 OK`, the same way a
//! streaming writer would. A streamed body (files, readers) is handed through
//! untouched and replaces anything buffered.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};

#[derive(Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    stream: Option<Body>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a status has been written.
    pub fn committed(&self) -> bool {
        self.status.is_some()
    }

    /// Status written so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Body bytes written so far. Empty once a stream has been set.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Set the content type unless one is already present.
    pub fn set_content_type_if_unset(&mut self, value: &str) {
        if self.headers.contains_key(header::CONTENT_TYPE) {
            return;
        }
        if let Ok(v) = HeaderValue::from_str(value) {
            self.headers.insert(header::CONTENT_TYPE, v);
        }
    }

    /// Write the status line. Only the first call takes effect.
    pub fn write_header(&mut self, code: StatusCode) {
        if let Some(current) = self.status {
            tracing::warn!(
                current = current.as_u16(),
                ignored = code.as_u16(),
                "superfluous write_header call"
            );
            return;
        }
        self.status = Some(code);
    }

    /// Append to the body, committing `200 OK` if no status was written.
    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
    }

    /// Send `body` as the response body, dropping buffered bytes and
    /// committing `200 OK` if no status was written.
    pub fn write_stream(&mut self, body: Body) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.clear();
        self.stream = Some(body);
    }

    /// Move the accumulated response out, leaving the writer empty.
    pub fn take(&mut self) -> Response<Body> {
        let status = self.status.take().unwrap_or(StatusCode::OK);
        let headers = std::mem::take(&mut self.headers);
        let body = match self.stream.take() {
            Some(stream) => stream,
            None => Body::from(std::mem::take(&mut self.body)),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }

    /// Drop everything written so far.
    pub fn clear(&mut self) {
        self.status = None;
        self.headers.clear();
        self.body.clear();
        self.stream = None;
    }
}

impl std::fmt::Debug for ResponseWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseWriter")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("buffered", &self.body.len())
            .field("streaming", &self.stream.is_some())
            .finish()
    }
}
