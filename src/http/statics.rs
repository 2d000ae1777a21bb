//! File-serving handlers.
//!
//! # Responsibilities
//! - Map a `{path:.*}` capture onto a directory without escaping it
//! - Redirect directory requests to their trailing-slash form
//! - Serve single files and directory indexes through `Context::file`

use std::path::{Component, Path, PathBuf};

use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use percent_encoding::percent_decode_str;

use crate::error::{Error, HandlerResult, HttpError};
use crate::handler::Handler;
use crate::http::Context;

/// Path parameter holding the file path below the mount prefix.
pub const PATH_PARAM: &str = "path";

/// Serves files below a root directory. Expects the route to capture the
/// relative path in a `path` placeholder.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
}

impl StaticDir {
    /// An empty root means the working directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = if root.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            root
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn serve(&self, ctx: &mut Context) -> HandlerResult {
        let raw = ctx.param(PATH_PARAM).unwrap_or("");
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| HttpError::bad_request())?
            .into_owned();

        let target = self.root.join(clean_path(&decoded));
        let meta = tokio::fs::metadata(&target).await.map_err(|_| Error::NotFound)?;

        let request_path = ctx.request().uri().path();
        if meta.is_dir() && !request_path.ends_with('/') {
            let location = format!("{request_path}/");
            return ctx.redirect(StatusCode::MOVED_PERMANENTLY, &location);
        }

        ctx.file(&target).await
    }
}

impl Handler for StaticDir {
    fn run<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(self.serve(ctx))
    }
}

/// Serves one fixed file.
#[derive(Debug, Clone)]
pub struct SingleFile {
    path: PathBuf,
}

impl SingleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Handler for SingleFile {
    fn run<'a>(&'a self, ctx: &'a mut Context) -> BoxFuture<'a, HandlerResult> {
        Box::pin(ctx.file(&self.path))
    }
}

/// Lexically resolve `.` and `..` in a request path. The result is always
/// relative and never climbs above its starting point.
pub fn clean_path(path: &str) -> PathBuf {
    let mut out = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path_stays_inside_root() {
        assert_eq!(clean_path("css/site.css"), PathBuf::from("css/site.css"));
        assert_eq!(clean_path("/etc/passwd"), PathBuf::from("etc/passwd"));
        assert_eq!(clean_path("../../etc/passwd"), PathBuf::from("etc/passwd"));
        assert_eq!(clean_path("a/./b/../c"), PathBuf::from("a/c"));
        assert_eq!(clean_path(""), PathBuf::new());
    }

    #[test]
    fn test_empty_root_is_working_directory() {
        assert_eq!(StaticDir::new("").root(), Path::new("."));
    }
}
