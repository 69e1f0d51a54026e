//! Route declaration under a path prefix.
//!
//! # Responsibilities
//! - Join the controller prefix with each declared sub-path
//! - Compile the joined template eagerly
//! - Keep routes in declaration order
//!
//! # Design Decisions
//! - One Router per controller invocation, discarded after the build
//! - Append-only: routes cannot be removed or reordered
//! - Compile errors surface while the table is built, never on dispatch

use axum::http::Method;
use futures_util::future::BoxFuture;

use super::error::RoutingError;
use super::pattern::{collapse_separators, PathPattern};
use super::route::{Route, RouteMethod};
use crate::dispatch::{Handler, HandlerResult, Next, RequestContext};

/// Builder collecting routes for one controller.
#[derive(Debug)]
pub struct Router {
    prefix: String,
    case_insensitive: bool,
    view_namespace: Option<String>,
    routes: Vec<Route>,
}

impl Router {
    /// A router with case-insensitive matching and no namespace.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_options(prefix, true, None)
    }

    pub(crate) fn with_options(
        prefix: impl Into<String>,
        case_insensitive: bool,
        view_namespace: Option<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            case_insensitive,
            view_namespace,
            routes: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Declare a route for `method` at `sub_path`.
    pub fn on(
        &mut self,
        method: impl Into<RouteMethod>,
        sub_path: &str,
        handler: Handler,
    ) -> Result<&mut Self, RoutingError> {
        let path = join_paths(&self.prefix, sub_path);
        let pattern = PathPattern::compile(&path, self.case_insensitive)?;
        let method = method.into();

        tracing::trace!(method = %method, path = %path, "Route declared");
        self.routes.push(Route::new(
            method,
            pattern,
            handler,
            self.view_namespace.clone(),
        ));
        Ok(self)
    }

    /// Register a handler for every method.
    pub fn all<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, RoutingError>
    where
        F: for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on(RouteMethod::All, path, Handler::new(handler))
    }

    /// Register a handler for GET requests.
    pub fn get<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, RoutingError>
    where
        F: for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on(Method::GET, path, Handler::new(handler))
    }

    /// Register a handler for HEAD requests.
    pub fn head<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, RoutingError>
    where
        F: for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on(Method::HEAD, path, Handler::new(handler))
    }

    /// Register a handler for OPTIONS requests.
    pub fn options<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, RoutingError>
    where
        F: for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on(Method::OPTIONS, path, Handler::new(handler))
    }

    /// Register a handler for POST requests.
    pub fn post<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, RoutingError>
    where
        F: for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on(Method::POST, path, Handler::new(handler))
    }

    /// Register a handler for PUT requests.
    pub fn put<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, RoutingError>
    where
        F: for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on(Method::PUT, path, Handler::new(handler))
    }

    /// Register a handler for PATCH requests.
    pub fn patch<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, RoutingError>
    where
        F: for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on(Method::PATCH, path, Handler::new(handler))
    }

    /// Register a handler for DELETE requests.
    pub fn delete<F>(&mut self, path: &str, handler: F) -> Result<&mut Self, RoutingError>
    where
        F: for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.on(Method::DELETE, path, Handler::new(handler))
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

/// `prefix + "/" + sub`, with repeated separators collapsed.
pub fn join_paths(prefix: &str, sub_path: &str) -> String {
    collapse_separators(&format!("{}/{}", prefix, sub_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Handler {
        Handler::new(|_cx, _next| Box::pin(async { Ok(()) }))
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("/", "/"), "/");
        assert_eq!(join_paths("/", "home"), "/home");
        assert_eq!(join_paths("/api/", "/users/:id"), "/api/users/:id");
        assert_eq!(join_paths("/api", "users/"), "/api/users/");
        assert_eq!(join_paths("", "x"), "/x");
    }

    #[test]
    fn test_routes_keep_declaration_order() {
        let mut router = Router::new("/api");
        router
            .get("/a", |_cx, _next| Box::pin(async { Ok(()) }))
            .unwrap()
            .post("/b", |_cx, _next| Box::pin(async { Ok(()) }))
            .unwrap()
            .on(RouteMethod::All, "/c", noop())
            .unwrap();

        let paths: Vec<_> = router.routes().iter().map(|r| r.path().to_string()).collect();
        assert_eq!(paths, vec!["/api/a", "/api/b", "/api/c"]);
        assert_eq!(router.routes()[1].method(), &RouteMethod::Only(Method::POST));
        assert_eq!(router.routes()[2].method(), &RouteMethod::All);
    }

    #[test]
    fn test_routes_inherit_namespace_and_case() {
        let mut router = Router::with_options("/", false, Some("views".into()));
        router.on(Method::GET, "/Home", noop()).unwrap();

        let route = &router.routes()[0];
        assert_eq!(route.view_namespace(), Some("views"));
        assert!(!route.pattern().is_case_insensitive());
        assert!(route.matches(&Method::GET, "/home").is_none());
        assert!(route.matches(&Method::GET, "/Home").is_some());
    }

    #[test]
    fn test_default_router_ignores_case() {
        let mut router = Router::new("/");
        router.on(Method::GET, "/Home", noop()).unwrap();
        assert!(router.routes()[0].matches(&Method::GET, "/HOME").is_some());
    }
}
