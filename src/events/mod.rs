//! Lifecycle and diagnostic event subsystem.
//!
//! # Data Flow
//! ```text
//! App / table builder / engine
//!     → bus.rs publish("NS:NAME", args)
//!     → key.rs normalize
//!     → fan-out: "*" → "NS:NAME" → "NS:*" → "*:NAME"
//!     → subscribers receive EventDetails
//! ```
//!
//! # Design Decisions
//! - Registry guarded by a read/write lock; handlers run outside it
//! - Malformed keys fail at subscribe/publish, never silently
//! - A disabled bus turns every call into a no-op

pub mod bus;
pub mod key;

pub use bus::{EventBus, EventDetails, EventHandler, Subscription};
pub use key::{EventError, EventKey};

pub const APP_STARTING: &str = "APP:STARTING";
pub const APP_STARTED: &str = "APP:STARTED";
pub const APP_ENDING: &str = "APP:ENDING";
pub const APP_ENDED: &str = "APP:ENDED";
pub const ROUTES_BEFORE_REFRESH: &str = "ROUTES:BEFORE_REFRESH";
pub const ROUTES_AFTER_REFRESH: &str = "ROUTES:AFTER_REFRESH";
pub const REQUEST_INCOMING: &str = "REQUEST:INCOMING";
pub const REQUEST_NOT_FOUND: &str = "REQUEST:NOT_FOUND";
pub const REQUEST_ERRORED: &str = "REQUEST:ERRORED";
pub const CONTROLLER_REGISTERED: &str = "CONTROLLER:REGISTERED";

/// Publish a built-in event. Built-in keys are well-formed, so failures
/// are only logged.
pub(crate) fn emit(bus: &EventBus, key: &str, arguments: Vec<serde_json::Value>) {
    if let Err(e) = bus.publish(key, arguments) {
        tracing::error!(key, error = %e, "Failed to publish event");
    }
}
