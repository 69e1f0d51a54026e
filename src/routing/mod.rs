//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route declaration (on every table build):
//!     Controller (root path + initializer)
//!     → router.rs (join prefix, compile template)
//!     → pattern.rs (literal fast path or anchored regex)
//!     → route.rs (method + pattern + handler + namespace)
//!
//! Table assembly:
//!     Controller[] in registration order
//!     → table.rs (flatten, then swap in atomically)
//!     → DispatchTable consumed by the dispatch engine
//! ```
//!
//! # Design Decisions
//! - Table order is the only precedence rule: first match wins
//! - Routes are immutable; a rebuild replaces the whole table
//! - Query strings never take part in matching
//! - Configuration errors surface while building, never on dispatch

pub mod controller;
pub mod error;
pub mod pattern;
pub mod route;
pub mod router;
pub mod table;

pub use controller::{Controller, ControllerBuilder, ControllerEntry, Initializer};
pub use error::RoutingError;
pub use pattern::{MatchResult, ParamKey, PathPattern, Segment};
pub use route::{Route, RouteMethod};
pub use router::{join_paths, Router};
pub use table::{DispatchTable, TableHandle};
