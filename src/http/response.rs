//! Outbound response capability.
//!
//! # Responsibilities
//! - Collect status, headers and body written by handlers
//! - Track whether the response has been ended
//! - Carry the view namespace bound from the matched route
//! - Convert into a transport response once dispatch finishes
//!
//! # Design Decisions
//! - Writes after `end` are ignored, so a late error handler cannot
//!   append to a finished response
//! - Body is buffered; streaming belongs to the transport

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    ended: bool,
    view_namespace: Option<String>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            ended: false,
            view_namespace: None,
        }
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        if !self.ended {
            self.status = status;
        }
        self
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        if !self.ended {
            self.headers.insert(name, value);
        }
        self
    }

    /// Append to the body.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> &mut Self {
        if self.ended {
            tracing::debug!("Write after end ignored");
        } else {
            self.body.extend_from_slice(chunk.as_ref());
        }
        self
    }

    /// Finalize; idempotent.
    pub fn end(&mut self) {
        self.ended = true;
    }

    /// Write `body` and end. Defaults the content type to plain text.
    pub fn send(&mut self, body: impl AsRef<[u8]>) {
        if !self.ended && !self.headers.contains_key(header::CONTENT_TYPE) {
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
        }
        self.write(body);
        self.end();
    }

    /// Serialize `value` as JSON and end.
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.send(body);
        Ok(())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, lossy.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Namespace tag of the controller whose route produced this response.
    pub fn view_namespace(&self) -> Option<&str> {
        self.view_namespace.as_deref()
    }

    pub(crate) fn set_view_namespace(&mut self, namespace: Option<String>) {
        self.view_namespace = namespace;
    }

    /// Convert into a transport response.
    pub fn into_http(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
