//! Error taxonomy.
//!
//! # Responsibilities
//! - Route-build failures (`RouteError`, wrapping `PatternError`)
//! - Handler failures (`Error`), including the not-found sentinel
//! - Client-facing structured errors (`HttpError`)
//!
//! Match outcomes (not found, method not allowed) live in
//! `routing::MatchError`; they never surface as handler errors.

use axum::http::StatusCode;
use serde_json::Value;

use crate::routing::pattern::PatternError;

/// Boxed error used for arbitrary handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of running a handler: the response has been written, or a failure.
pub type HandlerResult = Result<(), Error>;

/// A client-facing error carrying a status code and an opaque message.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("code={}, message={}", .code.as_u16(), .message)]
pub struct HttpError {
    pub code: StatusCode,
    pub message: Value,
}

impl HttpError {
    /// Create an error whose message is the canonical reason phrase.
    pub fn new(code: StatusCode) -> Self {
        Self {
            code,
            message: Value::String(code.canonical_reason().unwrap_or_default().to_string()),
        }
    }

    /// Create an error with a custom message payload.
    pub fn with_message(code: StatusCode, message: impl Into<Value>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_request() -> Self {
        Self::new(StatusCode::BAD_REQUEST)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED)
    }

    pub fn payload_too_large() -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE)
    }

    pub fn too_many_requests() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS)
    }

    pub fn internal_server_error() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn bad_gateway() -> Self {
        Self::new(StatusCode::BAD_GATEWAY)
    }

    pub fn service_unavailable() -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE)
    }

    pub fn gateway_timeout() -> Self {
        Self::new(StatusCode::GATEWAY_TIMEOUT)
    }

    /// JSON body sent to the client. String messages are wrapped as
    /// `{"message": ...}`; other payloads are sent as-is.
    pub fn body(&self) -> Value {
        match &self.message {
            Value::String(s) => serde_json::json!({ "message": s }),
            other => other.clone(),
        }
    }
}

/// Failure returned by a handler or middleware.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested resource does not exist.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("renderer not registered")]
    RendererNotRegistered,

    #[error("invalid redirect status code {0}")]
    InvalidRedirectCode(u16),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("reading request body: {0}")]
    Body(#[from] axum::Error),

    #[error("render {template}: {source}")]
    Render {
        template: String,
        #[source]
        source: BoxError,
    },

    /// A panic caught by the recovery middleware.
    #[error("panic: {0}")]
    Panic(String),

    #[error(transparent)]
    Other(BoxError),
}

impl Error {
    /// Wrap any error type as a handler failure.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Error::Other(err.into())
    }

    /// True for the not-found sentinel, including `HttpError::not_found()`.
    /// A 404 with a custom message is a regular error and keeps its payload.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound => true,
            Error::Http(e) => *e == HttpError::not_found(),
            _ => false,
        }
    }
}

/// Failure recorded on a route while it is being built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RouteError {
    #[error("invalid path {path:?}: {source}")]
    Pattern {
        path: String,
        #[source]
        source: PatternError,
    },

    #[error("route already has name {0}")]
    DuplicateName(String),
}
