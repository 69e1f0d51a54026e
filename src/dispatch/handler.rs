//! Route handlers, the continuation capability and error-handler slots.
//!
//! # Handler Contract
//! ```text
//! handler(&mut RequestContext, Next) -> future of Result<(), HandlerError>
//!
//! Ok(())  + next.proceed()   → scan continues after the current route
//! Ok(())  + next.fail(err)   → INTERNAL error handler
//! Ok(())  + Next dropped     → request done
//! Err(e)                     → INTERNAL error handler (wins over Next)
//! panic                      → INTERNAL error handler
//! ```
//!
//! # Design Decisions
//! - `Next` reports through a one-shot message read after the handler's
//!   future resolves; a continuation resolved later is discarded
//! - All work a handler starts must finish before its future resolves

use std::fmt;
use std::sync::Arc;

use axum::http::StatusCode;
use futures_util::future::BoxFuture;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::config::Environment;
use crate::dispatch::context::RequestContext;

pub type HandlerResult = Result<(), HandlerError>;

type HandlerFn =
    dyn for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, HandlerResult> + Send + Sync;

/// Errors produced by handlers or by the engine on their behalf.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A handler reported a failure.
    #[error("{0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A handler reported a failure as plain text.
    #[error("{0}")]
    Message(String),

    /// A handler panicked while running.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// No route matched.
    #[error("Resource Not Found: {0}")]
    NotFound(String),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        HandlerError::Message(message.into())
    }

    pub fn new(error: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        HandlerError::Failed(error.into())
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        HandlerError::new(e)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::new(e)
    }
}

/// What a handler asked the engine to do next.
#[derive(Debug)]
pub enum Continuation {
    Proceed,
    Fail(HandlerError),
}

/// Single-use capability to resume the dispatch chain.
#[derive(Debug)]
pub struct Next {
    tx: oneshot::Sender<Continuation>,
}

impl Next {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<Continuation>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Continue with the next matching route.
    pub fn proceed(self) {
        self.resolve(Continuation::Proceed);
    }

    /// Abort the chain and route `error` to the INTERNAL handler.
    pub fn fail(self, error: HandlerError) {
        self.resolve(Continuation::Fail(error));
    }

    fn resolve(self, continuation: Continuation) {
        if let Err(late) = self.tx.send(continuation) {
            tracing::warn!(
                continuation = ?late,
                "Continuation resolved after its handler completed; ignoring"
            );
        }
    }
}

/// A shareable route handler.
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext, Next) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    pub(crate) fn call<'a>(
        &self,
        cx: &'a mut RequestContext,
        next: Next,
    ) -> BoxFuture<'a, HandlerResult> {
        (self.inner)(cx, next)
    }

    /// True if both refer to the same handler instance.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.inner) as *const (),
            Arc::as_ptr(&other.inner) as *const (),
        )
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("ptr", &(Arc::as_ptr(&self.inner) as *const ()))
            .finish()
    }
}

/// The two application-level error slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSlot {
    NotFound,
    Internal,
}

impl fmt::Display for ErrorSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorSlot::NotFound => "NOT_FOUND",
            ErrorSlot::Internal => "INTERNAL",
        })
    }
}

pub type ErrorHandler = Arc<dyn Fn(&mut RequestContext) + Send + Sync>;

/// Handlers for the NOT_FOUND and INTERNAL slots.
#[derive(Clone)]
pub struct ErrorHandlers {
    not_found: ErrorHandler,
    internal: ErrorHandler,
}

impl ErrorHandlers {
    pub fn get(&self, slot: ErrorSlot) -> ErrorHandler {
        match slot {
            ErrorSlot::NotFound => self.not_found.clone(),
            ErrorSlot::Internal => self.internal.clone(),
        }
    }

    /// Replace the handler in `slot`.
    pub fn set(&mut self, slot: ErrorSlot, handler: ErrorHandler) {
        match slot {
            ErrorSlot::NotFound => self.not_found = handler,
            ErrorSlot::Internal => self.internal = handler,
        }
    }
}

impl Default for ErrorHandlers {
    fn default() -> Self {
        Self {
            not_found: Arc::new(default_not_found),
            internal: Arc::new(default_internal),
        }
    }
}

fn default_not_found(cx: &mut RequestContext) {
    if cx.last_error().is_none() {
        return;
    }
    let body = format!("Not Found: {}", cx.request.target());
    cx.response.set_status(StatusCode::NOT_FOUND).send(body);
}

fn default_internal(cx: &mut RequestContext) {
    let Some(error) = cx.last_error() else {
        return;
    };
    let body = match cx.environment() {
        Environment::Development => format!(
            "Internal Server Error at {}\n\n{}",
            cx.request.target(),
            error
        ),
        _ => format!("Internal Server Error: {}", cx.request.target()),
    };
    cx.response
        .set_status(StatusCode::INTERNAL_SERVER_ERROR)
        .send(body);
}
