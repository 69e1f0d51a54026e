//! Dispatch table assembly and atomic installation.
//!
//! # Data Flow
//! ```text
//! rebuild(controllers)
//!     → ROUTES:BEFORE_REFRESH
//!     → for each controller, in registration order:
//!         fresh Router(root) → initializer → routes (declaration order)
//!     → success: store new table (one pointer swap)
//!                → ROUTES:AFTER_REFRESH
//!     → failure: previous table keeps serving
//! ```
//!
//! # Design Decisions
//! - Tables are immutable; a rebuild always produces a new value
//! - Requests hold an `Arc` to the table they started with

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::json;

use super::controller::Controller;
use super::error::RoutingError;
use super::route::Route;
use crate::events::{self, EventBus};
use crate::observability::metrics;

/// The flattened, ordered route list. First match wins.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    routes: Vec<Route>,
    generation: u64,
}

impl DispatchTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Number of successful rebuilds that preceded this table. The
    /// initial empty table is generation 0.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Assemble a table from `controllers`, stopping at the first failure.
pub fn build(
    controllers: &[Controller],
    case_insensitive: bool,
) -> Result<DispatchTable, RoutingError> {
    let mut routes = Vec::new();
    for controller in controllers {
        let declared = controller.routes(case_insensitive)?;
        tracing::debug!(
            controller = controller.name(),
            root = controller.root_path(),
            routes = declared.len(),
            "Controller initialized"
        );
        routes.extend(declared);
    }
    Ok(DispatchTable {
        routes,
        generation: 0,
    })
}

/// Holds the table currently in use.
#[derive(Debug)]
pub struct TableHandle {
    current: ArcSwap<DispatchTable>,
    generation: AtomicU64,
}

impl TableHandle {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(DispatchTable::empty()),
            generation: AtomicU64::new(0),
        }
    }

    /// Snapshot of the installed table.
    pub fn load(&self) -> Arc<DispatchTable> {
        self.current.load_full()
    }

    /// Build a new table and install it. On failure the installed table
    /// is left untouched.
    ///
    /// The last successful store wins, so callers racing each other must
    /// serialize around reading their inputs and calling this.
    pub fn rebuild(
        &self,
        controllers: &[Controller],
        case_insensitive: bool,
        bus: &EventBus,
    ) -> Result<Arc<DispatchTable>, RoutingError> {
        let previous = self.load();
        events::emit(
            bus,
            events::ROUTES_BEFORE_REFRESH,
            vec![json!({
                "controllers": controllers.len(),
                "generation": previous.generation(),
            })],
        );

        let mut table = match build(controllers, case_insensitive) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    generation = previous.generation(),
                    "Route table rebuild failed; keeping previous table"
                );
                metrics::record_table_refresh("failed", previous.len());
                return Err(e);
            }
        };

        table.generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let table = Arc::new(table);
        self.current.store(table.clone());

        tracing::info!(
            routes = table.len(),
            generation = table.generation(),
            "Route table installed"
        );
        metrics::record_table_refresh("installed", table.len());
        events::emit(
            bus,
            events::ROUTES_AFTER_REFRESH,
            vec![json!({
                "routes": table.len(),
                "generation": table.generation(),
            })],
        );
        Ok(table)
    }
}

impl Default for TableHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use parking_lot::Mutex;

    fn static_controller(path: &'static str) -> Controller {
        Controller::new(move |router| {
            router.get(path, |_cx, _next| Box::pin(async { Ok(()) }))?;
            Ok(())
        })
    }

    #[test]
    fn test_build_preserves_registration_order() {
        let controllers = vec![
            Controller::at("/a", |router| {
                router.get("/1", |_cx, _next| Box::pin(async { Ok(()) }))?;
                router.get("/2", |_cx, _next| Box::pin(async { Ok(()) }))?;
                Ok(())
            }),
            static_controller("/b"),
        ];

        let table = build(&controllers, true).unwrap();
        let paths: Vec<_> = table.routes().iter().map(Route::path).collect();
        assert_eq!(paths, vec!["/a/1", "/a/2", "/b"]);
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_table() {
        let handle = TableHandle::new();
        let bus = EventBus::new();

        handle
            .rebuild(&[static_controller("/ok")], true, &bus)
            .unwrap();
        let before = handle.load();

        let broken = Controller::new(|_router| panic!("initializer failed")).named("broken");
        let err = handle
            .rebuild(&[static_controller("/new"), broken], true, &bus)
            .unwrap_err();
        assert!(matches!(err, RoutingError::InitializerPanicked { .. }));

        let after = handle.load();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.generation(), 1);
        assert!(after.routes()[0].matches(&Method::GET, "/ok").is_some());
    }

    #[test]
    fn test_in_flight_snapshot_survives_rebuild() {
        let handle = TableHandle::new();
        let bus = EventBus::new();
        handle.rebuild(&[static_controller("/v1")], true, &bus).unwrap();

        let in_flight = handle.load();
        handle.rebuild(&[static_controller("/v2")], true, &bus).unwrap();

        assert_eq!(in_flight.routes()[0].path(), "/v1");
        assert_eq!(handle.load().routes()[0].path(), "/v2");
        assert_eq!(handle.load().generation(), 2);
    }

    #[test]
    fn test_refresh_events_bracket_install() {
        let handle = TableHandle::new();
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = bus
            .subscribe("ROUTES:*", move |details| {
                sink.lock().push((details.key.to_string(), details.arguments[0].clone()));
            })
            .unwrap();

        handle.rebuild(&[static_controller("/")], true, &bus).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "ROUTES:BEFORE_REFRESH");
        assert_eq!(seen[1].0, "ROUTES:AFTER_REFRESH");
        assert_eq!(seen[1].1["routes"], 1);
        assert_eq!(seen[1].1["generation"], 1);
    }
}
