//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Engine, table builder, server:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via the metrics facade)
//!
//! Consumers:
//!     → stdout (pretty or compact)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID from the transport flows into every dispatch log line
//! - Metrics are cheap and silently dropped when no exporter runs

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;
