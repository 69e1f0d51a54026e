//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Request descriptor + current DispatchTable
//!     → engine.rs (scan, match, bind params)
//!     → handler.rs (run handler, collect Next continuation)
//!     → context.rs (cursor, state, last error, response)
//!     → error slots (NOT_FOUND / INTERNAL) on miss or failure
//! ```
//!
//! # Design Decisions
//! - Exactly one handler is active per request at any time
//! - Control flow is an explicit loop, not nested callbacks
//! - Each request ends in exactly one terminal state

pub mod context;
pub mod engine;
pub mod handler;

pub use context::{DispatchState, RequestContext};
pub use engine::DispatchEngine;
pub use handler::{
    Continuation, ErrorHandler, ErrorHandlers, ErrorSlot, Handler, HandlerError, HandlerResult,
    Next,
};
