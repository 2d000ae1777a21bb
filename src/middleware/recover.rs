//! Panic recovery.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use crate::error::{BoxError, Error};
use crate::handler::{middleware_fn, MiddlewareFunc};

/// Middleware that catches a panic anywhere further down the chain.
///
/// The panic payload and the request URL are logged; the request then fails
/// with [`Error::Panic`], which the dispatch core answers with a generic 500.
pub fn recover() -> MiddlewareFunc {
    middleware_fn(|c, next| {
        Box::pin(async move {
            let outcome = AssertUnwindSafe(next.run(c)).catch_unwind().await;
            match outcome {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(
                        url = %c.request().uri(),
                        panic = %message,
                        "Recovered from handler panic"
                    );
                    Err(Error::Panic(message))
                }
            }
        })
    })
}

/// Best-effort text for a panic payload: strings and common error types are
/// shown, anything else is "unknown error".
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(e) = payload.downcast_ref::<Error>() {
        e.to_string()
    } else if let Some(e) = payload.downcast_ref::<BoxError>() {
        e.to_string()
    } else if let Some(e) = payload.downcast_ref::<std::io::Error>() {
        e.to_string()
    } else {
        "unknown error".to_string()
    }
}
