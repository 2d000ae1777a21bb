//! Route groups: a path prefix plus inherited middleware.

use axum::http::Method;

use crate::handler::{BoxedHandler, MiddlewareFunc};
use crate::routing::register::Routes;
use crate::routing::route::RouteBuilder;
use crate::routing::table::RouteTable;

/// Routes added through a group get the group's prefix in front of their path
/// and the group's middleware ahead of their own.
///
/// A group borrows the table it registers into, so names stay unique across
/// the table and all of its groups.
pub struct Group<'a> {
    table: &'a mut RouteTable,
    prefix: String,
    middleware: Vec<MiddlewareFunc>,
}

impl<'a> Group<'a> {
    pub(crate) fn new(table: &'a mut RouteTable, prefix: &str, middleware: Vec<MiddlewareFunc>) -> Self {
        Self {
            table,
            prefix: prefix.to_string(),
            middleware,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn middleware(&self) -> &[MiddlewareFunc] {
        &self.middleware
    }

    /// Add middleware for routes registered through this group from now on.
    pub fn use_middleware(&mut self, middleware: impl IntoIterator<Item = MiddlewareFunc>) -> &mut Self {
        self.middleware.extend(middleware);
        self
    }

    /// Nested group. Prefixes and middleware accumulate outer to inner.
    pub fn group(&mut self, prefix: &str, middleware: Vec<MiddlewareFunc>) -> Group<'_> {
        let mut inherited = self.middleware.clone();
        inherited.extend(middleware);
        Group {
            table: &mut *self.table,
            prefix: join_paths(&self.prefix, prefix),
            middleware: inherited,
        }
    }

    /// Start a bare route under the group's prefix. Group middleware is not
    /// applied; use [`Routes::add`] for that.
    pub fn path(&mut self, path: &str) -> RouteBuilder<'_> {
        let full = join_paths(&self.prefix, path);
        self.table.new_route().path(&full)
    }
}

impl Routes for Group<'_> {
    fn add_boxed(
        &mut self,
        method: Method,
        path: &str,
        handler: BoxedHandler,
        middleware: Vec<MiddlewareFunc>,
    ) -> RouteBuilder<'_> {
        let mut chain = Vec::with_capacity(self.middleware.len() + middleware.len());
        chain.extend(self.middleware.iter().cloned());
        chain.extend(middleware);

        let full = join_paths(&self.prefix, path);
        self.table.add_boxed(method, &full, handler, chain)
    }
}

/// Join two path fragments with exactly one `/` between them.
pub fn join_paths(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return prefix.to_string();
    }
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, middleware_fn, Handler};
    use crate::routing::register::ALL_METHODS;
    use axum::http::StatusCode;

    fn ok() -> impl Handler {
        handler_fn(|c| Box::pin(async move { c.string(StatusCode::OK, "ok") }))
    }

    fn noop() -> MiddlewareFunc {
        middleware_fn(|c, next| Box::pin(async move { next.run(c).await }))
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("", "/users"), "/users");
        assert_eq!(join_paths("/api", ""), "/api");
        assert_eq!(join_paths("/api", "/users"), "/api/users");
        assert_eq!(join_paths("/api/", "/users"), "/api/users");
        assert_eq!(join_paths("/api", "users"), "/api/users");
        assert_eq!(join_paths("/api/", "users/{id}"), "/api/users/{id}");
    }

    #[test]
    fn test_group_prefix_and_middleware() {
        let mut table = RouteTable::new();
        let outer = noop();
        let inner = noop();
        let own = noop();

        {
            let mut api = Group::new(&mut table, "/api", vec![outer.clone()]);
            let mut v1 = api.group("/v1/", vec![inner.clone()]);
            v1.add(Method::GET, "/users/{id}", ok(), vec![own.clone()]).name("user");
        }

        let route = table.route("user").unwrap();
        assert_eq!(route.path(), "/api/v1/users/{id}");

        let mw = route.middleware();
        assert_eq!(mw.len(), 3);
        assert!(std::sync::Arc::ptr_eq(&mw[0], &outer));
        assert!(std::sync::Arc::ptr_eq(&mw[1], &inner));
        assert!(std::sync::Arc::ptr_eq(&mw[2], &own));

        let m = table.resolve(&Method::GET, "/api/v1/users/9").unwrap();
        assert_eq!(m.param("id"), Some("9"));
    }

    #[test]
    fn test_group_names_share_table_registry() {
        let mut table = RouteTable::new();
        table.add(Method::GET, "/home", ok(), vec![]).name("home");

        let mut admin = Group::new(&mut table, "/admin", vec![]);
        let err = admin.get("/home", ok()).name("home").build().unwrap_err();
        assert_eq!(err, crate::error::RouteError::DuplicateName("home".into()));
    }

    #[test]
    fn test_any_registers_every_method() {
        let mut table = RouteTable::new();
        let mut g = Group::new(&mut table, "/echo", vec![]);
        g.any("", ok(), vec![]).unwrap();

        assert_eq!(table.len(), ALL_METHODS.len());
        for method in ALL_METHODS {
            assert!(table.resolve(&method, "/echo").is_ok(), "{method}");
        }
    }
}
