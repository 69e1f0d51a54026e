//! Per-request dispatch state.
//!
//! # States
//! ```text
//! MATCHING → HANDLING → MATCHING (handler called next.proceed())
//!                     → DONE
//!                     → ERRORED   (next.fail, Err return, panic)
//! MATCHING → NOT_FOUND            (table exhausted)
//! ```

use std::fmt;

use crate::config::Environment;
use crate::dispatch::handler::HandlerError;
use crate::http::{Request, Response};

/// Where a request is in its dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Matching,
    Handling,
    Done,
    Errored,
    NotFound,
}

impl DispatchState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            DispatchState::Done | DispatchState::Errored | DispatchState::NotFound
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DispatchState::Matching => "matching",
            DispatchState::Handling => "handling",
            DispatchState::Done => "done",
            DispatchState::Errored => "errored",
            DispatchState::NotFound => "not_found",
        }
    }
}

impl fmt::Display for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one request, owned by the engine for the request's lifetime.
///
/// Handlers read the request and write the response; the cursor, state
/// and last error belong to the engine.
#[derive(Debug)]
pub struct RequestContext {
    pub request: Request,
    pub response: Response,
    environment: Environment,
    cursor: usize,
    state: DispatchState,
    last_error: Option<HandlerError>,
}

impl RequestContext {
    pub fn new(request: Request, environment: Environment) -> Self {
        Self {
            request,
            response: Response::new(),
            environment,
            cursor: 0,
            state: DispatchState::Matching,
            last_error: None,
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Index of the first route not yet considered.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn last_error(&self) -> Option<&HandlerError> {
        self.last_error.as_ref()
    }

    pub(crate) fn advance_to(&mut self, cursor: usize) {
        self.cursor = cursor;
    }

    pub(crate) fn set_state(&mut self, state: DispatchState) {
        tracing::trace!(from = %self.state, to = %state, "Dispatch state");
        self.state = state;
    }

    pub(crate) fn set_last_error(&mut self, error: HandlerError) {
        self.last_error = Some(error);
    }

    /// Summary published with request events.
    pub(crate) fn describe(&self) -> serde_json::Value {
        serde_json::json!({
            "method": self.request.method().as_str(),
            "target": self.request.target(),
            "request_id": self.request.request_id(),
            "state": self.state.as_str(),
            "error": self.last_error.as_ref().map(ToString::to_string),
        })
    }
}
