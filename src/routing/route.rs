//! A single (method, pattern, handler) binding.

use std::fmt;
use std::str::FromStr;

use axum::http::Method;

use super::pattern::{MatchResult, PathPattern};
use crate::dispatch::Handler;

/// Method selector of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteMethod {
    /// Matches every method.
    All,
    Only(Method),
}

impl RouteMethod {
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            RouteMethod::All => true,
            RouteMethod::Only(expected) => expected == method,
        }
    }
}

impl From<Method> for RouteMethod {
    fn from(method: Method) -> Self {
        RouteMethod::Only(method)
    }
}

impl FromStr for RouteMethod {
    type Err = axum::http::method::InvalidMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("ALL") {
            return Ok(RouteMethod::All);
        }
        Method::from_bytes(s.to_ascii_uppercase().as_bytes()).map(RouteMethod::Only)
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMethod::All => f.write_str("ALL"),
            RouteMethod::Only(method) => f.write_str(method.as_str()),
        }
    }
}

/// An immutable route, created while a controller's initializer runs.
#[derive(Clone)]
pub struct Route {
    method: RouteMethod,
    path: String,
    pattern: PathPattern,
    handler: Handler,
    view_namespace: Option<String>,
}

impl Route {
    pub(crate) fn new(
        method: RouteMethod,
        pattern: PathPattern,
        handler: Handler,
        view_namespace: Option<String>,
    ) -> Self {
        Self {
            method,
            path: pattern.template().to_string(),
            pattern,
            handler,
            view_namespace,
        }
    }

    pub fn method(&self) -> &RouteMethod {
        &self.method
    }

    /// Full path template (prefix joined with the declared sub-path).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn view_namespace(&self) -> Option<&str> {
        self.view_namespace.as_deref()
    }

    /// Test `method` and `path` (query already removed).
    pub fn matches(&self, method: &Method, path: &str) -> Option<MatchResult> {
        if !self.method.matches(method) {
            return None;
        }
        let result = self.pattern.matches(path);
        result.is_match.then_some(result)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("view_namespace", &self.view_namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(method: RouteMethod, template: &str) -> Route {
        Route::new(
            method,
            PathPattern::compile(template, false).unwrap(),
            Handler::new(|_cx, _next| Box::pin(async { Ok(()) })),
            None,
        )
    }

    #[test]
    fn test_all_matches_any_method() {
        let r = route(RouteMethod::All, "/x");
        assert!(r.matches(&Method::GET, "/x").is_some());
        assert!(r.matches(&Method::DELETE, "/x").is_some());
    }

    #[test]
    fn test_method_mismatch() {
        let r = route(Method::POST.into(), "/x");
        assert!(r.matches(&Method::GET, "/x").is_none());
        assert!(r.matches(&Method::POST, "/x").is_some());
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("all".parse::<RouteMethod>().unwrap(), RouteMethod::All);
        assert_eq!(
            "get".parse::<RouteMethod>().unwrap(),
            RouteMethod::Only(Method::GET)
        );
        assert_eq!(RouteMethod::All.to_string(), "ALL");
    }
}
