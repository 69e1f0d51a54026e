//! HTTP transport adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, request ID, timeout, trace layers)
//!     → request.rs (method + target + headers descriptor)
//!     → App::handle (dispatch core)
//!     → response.rs (status, headers, body, ended flag)
//!     → Axum response to the client
//! ```
//!
//! # Design Decisions
//! - Axum only carries bytes; all routing happens in the dispatch core
//! - Request bodies are not read by the core

pub mod request;
pub mod response;
pub mod server;

pub use request::{PathParams, Request, X_REQUEST_ID};
pub use response::Response;
pub use server::{HttpServer, ServerError};
