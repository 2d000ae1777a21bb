//! Template rendering capability.
//!
//! The dispatch core never reads templates itself; a rendering engine is
//! injected through [`Renderer`] and reached from handlers via
//! `Context::render`, which passes the context's side-channel values as the
//! template data.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::BoxError;

pub trait Renderer: Send + Sync {
    /// Render `template` with `data` into `out`.
    fn render(
        &self,
        out: &mut Vec<u8>,
        template: &str,
        data: &HashMap<String, Value>,
    ) -> Result<(), BoxError>;
}
