//! Inbound request descriptor.
//!
//! # Responsibilities
//! - Carry method, raw target (path + query) and headers from the transport
//! - Expose the path portion used for matching
//! - Hold the path parameters bound by the engine for the matched route
//!
//! # Design Decisions
//! - Read-only to handlers except for the engine-bound parameters
//! - Query string parsed on demand, never used for matching

use std::collections::HashMap;

use axum::http::{HeaderMap, Method};
use percent_encoding::percent_decode_str;

use crate::routing::pattern::ParamKey;

/// Header carrying the request ID set by the transport.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Decoded path parameters of the matched route, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(ParamKey, String)>,
}

impl PathParams {
    pub fn new(entries: Vec<(ParamKey, String)>) -> Self {
        Self { entries }
    }

    /// Value of a `:name` parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.iter().find_map(|(k, v)| match k {
            ParamKey::Name(n) if n == name => Some(v.as_str()),
            _ => None,
        })
    }

    /// Value of the n-th wildcard.
    pub fn wildcard(&self, index: usize) -> Option<&str> {
        self.entries.iter().find_map(|(k, v)| match k {
            ParamKey::Index(i) if *i == index => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A request as seen by the dispatch core.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: String,
    headers: HeaderMap,
    params: PathParams,
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method,
            target: target.into(),
            headers,
            params: PathParams::default(),
        }
    }

    /// Shorthand for a header-less request.
    pub fn from_parts(method: Method, target: impl Into<String>) -> Self {
        Self::new(method, target, HeaderMap::new())
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path and query exactly as received.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Path portion of the target.
    pub fn path(&self) -> &str {
        match self.target.split_once('?') {
            Some((path, _)) => path,
            None => &self.target,
        }
    }

    pub fn query_string(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, q)| q)
    }

    /// Percent-decoded query pairs. A key without `=` maps to "".
    pub fn query(&self) -> HashMap<String, String> {
        self.query_string()
            .map(|q| {
                q.split('&')
                    .filter(|pair| !pair.is_empty())
                    .map(|pair| {
                        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                        (decode(k), decode(v))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn request_id(&self) -> Option<&str> {
        self.header(X_REQUEST_ID)
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Shorthand for `params().get(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub(crate) fn set_params(&mut self, params: PathParams) {
        self.params = params;
    }
}

pub(crate) fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_excludes_query() {
        let req = Request::from_parts(Method::GET, "/home?x=1&y");
        assert_eq!(req.path(), "/home");
        assert_eq!(req.query_string(), Some("x=1&y"));

        let query = req.query();
        assert_eq!(query.get("x").map(String::as_str), Some("1"));
        assert_eq!(query.get("y").map(String::as_str), Some(""));
    }

    #[test]
    fn test_query_is_decoded() {
        let req = Request::from_parts(Method::GET, "/s?q=a%20b&k%26=v=w");
        let query = req.query();
        assert_eq!(query["q"], "a b");
        assert_eq!(query["k&"], "v=w");
    }

    #[test]
    fn test_params_lookup() {
        let params = PathParams::new(vec![
            (ParamKey::Name("name".into()), "Ann".into()),
            (ParamKey::Index(0), "a/b".into()),
        ]);
        assert_eq!(params.get("name"), Some("Ann"));
        assert_eq!(params.wildcard(0), Some("a/b"));
        assert_eq!(params.wildcard(1), None);
        assert_eq!(params.len(), 2);
    }
}
