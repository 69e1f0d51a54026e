//! Request dispatch state machine.
//!
//! # Data Flow
//! ```text
//! dispatch(request, table)
//!     → REQUEST:INCOMING
//!     → MATCHING: scan table from cursor (method + path, query ignored)
//!         → hit:  cursor = index + 1, bind decoded params + namespace
//!                 → HANDLING: await handler, read continuation
//!                     → proceed      → MATCHING
//!                     → fail / Err   → ERRORED (INTERNAL handler)
//!                     → panic        → ERRORED (INTERNAL handler)
//!                     → nothing      → DONE
//!         → miss: NOT_FOUND (NOT_FOUND handler)
//!     → response ended
//! ```
//!
//! # Design Decisions
//! - The table is borrowed for the whole request; a concurrent rebuild
//!   never changes what an in-flight request scans
//! - The cursor only moves forward, so no route runs twice per request
//! - Error handlers are cloned out of their lock before being called

use std::panic::AssertUnwindSafe;
use std::time::Instant;

use futures_util::FutureExt;
use parking_lot::RwLock;

use crate::config::Environment;
use crate::dispatch::context::{DispatchState, RequestContext};
use crate::dispatch::handler::{
    Continuation, ErrorHandler, ErrorHandlers, ErrorSlot, Handler, HandlerError, HandlerResult,
    Next,
};
use crate::events::{self, EventBus};
use crate::http::request::{decode, PathParams};
use crate::http::Request;
use crate::observability::metrics;
use crate::routing::error::panic_message;
use crate::routing::pattern::{MatchResult, ParamKey};
use crate::routing::{DispatchTable, Route};

/// Drives one request at a time through a dispatch table.
pub struct DispatchEngine {
    bus: EventBus,
    error_handlers: RwLock<ErrorHandlers>,
    environment: RwLock<Environment>,
}

impl DispatchEngine {
    pub fn new(bus: EventBus, environment: Environment) -> Self {
        Self {
            bus,
            error_handlers: RwLock::new(ErrorHandlers::default()),
            environment: RwLock::new(environment),
        }
    }

    /// Replace the handler in `slot`.
    pub fn set_error_handler(&self, slot: ErrorSlot, handler: ErrorHandler) {
        tracing::debug!(slot = %slot, "Error handler replaced");
        self.error_handlers.write().set(slot, handler);
    }

    pub fn error_handler(&self, slot: ErrorSlot) -> ErrorHandler {
        self.error_handlers.read().get(slot)
    }

    pub fn environment(&self) -> Environment {
        *self.environment.read()
    }

    pub fn set_environment(&self, environment: Environment) {
        *self.environment.write() = environment;
    }

    /// Run `request` against `table` until a terminal state is reached.
    ///
    /// The returned context always carries an ended response.
    pub async fn dispatch(&self, request: Request, table: &DispatchTable) -> RequestContext {
        let started = Instant::now();
        let mut cx = RequestContext::new(request, self.environment());

        tracing::debug!(
            method = %cx.request.method(),
            target_path = %cx.request.target(),
            request_id = cx.request.request_id().unwrap_or("-"),
            routes = table.len(),
            "Dispatching request"
        );
        events::emit(&self.bus, events::REQUEST_INCOMING, vec![cx.describe()]);

        loop {
            let Some((index, route, matched)) = next_match(table, &cx) else {
                self.not_found(&mut cx);
                break;
            };

            cx.advance_to(index + 1);
            cx.request.set_params(bind_params(matched));
            cx.response
                .set_view_namespace(route.view_namespace().map(str::to_owned));
            cx.set_state(DispatchState::Handling);

            tracing::debug!(
                index,
                method = %route.method(),
                path = route.path(),
                "Route matched"
            );

            let (next, mut continuation) = Next::channel();
            let outcome = invoke(route.handler(), &mut cx, next).await;

            match outcome {
                Err(payload) => {
                    let message = panic_message(&*payload);
                    self.fail(&mut cx, HandlerError::Panicked(message));
                    break;
                }
                Ok(Err(error)) => {
                    self.fail(&mut cx, error);
                    break;
                }
                Ok(Ok(())) => match continuation.try_recv() {
                    Ok(Continuation::Proceed) => cx.set_state(DispatchState::Matching),
                    Ok(Continuation::Fail(error)) => {
                        self.fail(&mut cx, error);
                        break;
                    }
                    Err(_) => {
                        cx.set_state(DispatchState::Done);
                        break;
                    }
                },
            }
        }

        cx.response.end();
        metrics::record_dispatch(cx.state(), started);
        cx
    }

    fn fail(&self, cx: &mut RequestContext, error: HandlerError) {
        tracing::warn!(
            target_path = %cx.request.target(),
            error = %error,
            "Request errored"
        );
        cx.set_last_error(error);
        cx.set_state(DispatchState::Errored);
        events::emit(&self.bus, events::REQUEST_ERRORED, vec![cx.describe()]);
        self.run_error_handler(ErrorSlot::Internal, cx);
        cx.response.end();
    }

    fn not_found(&self, cx: &mut RequestContext) {
        tracing::warn!(
            method = %cx.request.method(),
            target_path = %cx.request.target(),
            "No route matched"
        );
        let target = cx.request.target().to_string();
        cx.set_last_error(HandlerError::NotFound(target));
        cx.set_state(DispatchState::NotFound);
        events::emit(&self.bus, events::REQUEST_NOT_FOUND, vec![cx.describe()]);
        self.run_error_handler(ErrorSlot::NotFound, cx);
    }

    fn run_error_handler(&self, slot: ErrorSlot, cx: &mut RequestContext) {
        let handler = self.error_handler(slot);
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| handler(cx)));
        if let Err(payload) = result {
            tracing::error!(
                slot = %slot,
                panic = %panic_message(&*payload),
                "Error handler panicked"
            );
            cx.response
                .set_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
                .send("Internal Server Error");
        }
    }
}

impl std::fmt::Debug for DispatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchEngine")
            .field("environment", &self.environment())
            .finish_non_exhaustive()
    }
}

/// Run `handler` to completion. Panics raised while the handler builds
/// its future are caught along with those raised while it is polled.
async fn invoke(
    handler: &Handler,
    cx: &mut RequestContext,
    next: Next,
) -> std::thread::Result<HandlerResult> {
    let future = std::panic::catch_unwind(AssertUnwindSafe(move || handler.call(cx, next)))?;
    AssertUnwindSafe(future).catch_unwind().await
}

fn next_match<'t>(
    table: &'t DispatchTable,
    cx: &RequestContext,
) -> Option<(usize, &'t Route, MatchResult)> {
    let method = cx.request.method();
    let path = cx.request.path();
    table
        .routes()
        .iter()
        .enumerate()
        .skip(cx.cursor())
        .find_map(|(index, route)| route.matches(method, path).map(|m| (index, route, m)))
}

fn bind_params(matched: MatchResult) -> PathParams {
    let entries = matched
        .params
        .into_iter()
        .map(|(key, value)| {
            let key = match key {
                ParamKey::Name(name) => ParamKey::Name(decode(&name)),
                index => index,
            };
            (key, decode(&value))
        })
        .collect();
    PathParams::new(entries)
}
