//! HTTP request-dispatch core.
//!
//! # Architecture Overview
//!
//! ```text
//!     Controller[] ──▶ Router ──▶ Route[] ──▶ DispatchTable (atomic swap)
//!                                                  │
//!     Request ──▶ http::server ──▶ App::handle ──▶ DispatchEngine
//!                                                  │   cursor, Next,
//!                                                  │   NOT_FOUND / INTERNAL
//!     Response ◀── http::server ◀── RequestContext ◀┘
//!
//!     EventBus: APP:*, ROUTES:*, REQUEST:*, CONTROLLER:REGISTERED
//! ```

// Core subsystems
pub mod app;
pub mod dispatch;
pub mod events;
pub mod routing;

// Transport adapter
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use app::App;
pub use config::schema::{AppConfig, DispatchConfig, Environment};
pub use dispatch::{
    DispatchEngine, DispatchState, ErrorSlot, Handler, HandlerError, HandlerResult, Next,
    RequestContext,
};
pub use events::{EventBus, EventDetails, EventKey};
pub use http::{HttpServer, Request, Response};
pub use lifecycle::Shutdown;
pub use routing::{Controller, DispatchTable, Route, RouteMethod, Router, RoutingError};
