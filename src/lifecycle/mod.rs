//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Status (status.rs):
//!     Created → Started (App::start) → Ended (App::shutdown)
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight requests drain
//!             → App::shutdown publishes APP:ENDING / APP:ENDED
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//! ```
//!
//! # Design Decisions
//! - Status is an atomic byte so readers never lock
//! - One broadcast channel fans shutdown out to every task

pub mod shutdown;
pub mod signals;
pub mod status;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_listener};
pub use status::AppStatus;
