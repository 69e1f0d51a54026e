//! Host application.
//!
//! # Responsibilities
//! - Keep the ordered controller registry
//! - Own the event bus, the installed dispatch table and the engine
//! - Rebuild the table explicitly or lazily on the next request
//! - Publish lifecycle events (APP:*, ROUTES:*, CONTROLLER:REGISTERED)
//!
//! # Design Decisions
//! - Shared behind `Arc`; every method takes `&self`
//! - Registering a controller only marks the table stale
//! - A failed lazy rebuild keeps the previous table serving
//! - Rebuilds run one at a time; each reads the registry and options
//!   after taking the rebuild lock, so the last table installed is never
//!   older than the last registration it followed
//! - `disable_events` is read once, when the bus is created

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dispatch::{DispatchEngine, ErrorSlot, RequestContext};
use crate::events::{self, EventBus};
use crate::http::Request;
use crate::lifecycle::AppStatus;
use crate::routing::{Controller, ControllerEntry, DispatchTable, RoutingError, TableHandle};

/// An application: controllers, error handlers and the live table.
pub struct App {
    id: Uuid,
    options: ArcSwap<AppConfig>,
    bus: EventBus,
    controllers: RwLock<Vec<Controller>>,
    table: TableHandle,
    rebuild_lock: Mutex<()>,
    engine: DispatchEngine,
    stale: AtomicBool,
    status: AtomicU8,
}

impl App {
    pub fn new(options: AppConfig) -> Self {
        let bus = EventBus::with_enabled(!options.disable_events);
        let engine = DispatchEngine::new(bus.clone(), options.env);
        let id = Uuid::new_v4();

        tracing::debug!(
            app_id = %id,
            env = %options.env,
            ignore_route_case = options.ignore_route_case,
            events = bus.is_enabled(),
            "Application created"
        );

        Self {
            id,
            options: ArcSwap::from_pointee(options),
            bus,
            controllers: RwLock::new(Vec::new()),
            table: TableHandle::new(),
            rebuild_lock: Mutex::new(()),
            engine,
            stale: AtomicBool::new(true),
            status: AtomicU8::new(AppStatus::Created as u8),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The application's event bus. Subscribe here to observe lifecycle
    /// and request events.
    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    pub fn options(&self) -> Arc<AppConfig> {
        self.options.load_full()
    }

    pub fn status(&self) -> AppStatus {
        AppStatus::from(self.status.load(Ordering::Acquire))
    }

    pub fn controller_count(&self) -> usize {
        self.controllers.read().len()
    }

    /// Append `controller` to the registry. The table is rebuilt before
    /// the next request or on [`App::refresh_routes`].
    pub fn register_controller(&self, controller: Controller) -> &Self {
        let details = json!({
            "name": controller.name(),
            "root_path": controller.root_path(),
            "view_namespace": controller.view_namespace(),
        });
        tracing::debug!(
            controller = controller.name(),
            root = controller.root_path(),
            "Controller registered"
        );

        self.controllers.write().push(controller);
        self.stale.store(true, Ordering::Release);
        events::emit(&self.bus, events::CONTROLLER_REGISTERED, vec![details]);
        self
    }

    /// Register `controller` with every route tagged by `namespace`.
    pub fn register_controller_in(
        &self,
        namespace: impl Into<String>,
        controller: Controller,
    ) -> &Self {
        self.register_controller(controller.in_namespace(namespace))
    }

    /// Register controllers and nested lists of controllers, in order.
    pub fn register_controllers<I, E>(&self, entries: I) -> &Self
    where
        I: IntoIterator<Item = E>,
        E: Into<ControllerEntry>,
    {
        for entry in entries {
            for controller in entry.into().flatten() {
                self.register_controller(controller);
            }
        }
        self
    }

    /// Replace the NOT_FOUND or INTERNAL handler.
    pub fn on_error<F>(&self, slot: ErrorSlot, handler: F) -> &Self
    where
        F: Fn(&mut RequestContext) + Send + Sync + 'static,
    {
        self.engine.set_error_handler(slot, Arc::new(handler));
        self
    }

    /// Rebuild and install the table now.
    ///
    /// Waits for any rebuild already in progress. Calling this from a
    /// controller initializer deadlocks.
    pub fn refresh_routes(&self) -> Result<Arc<DispatchTable>, RoutingError> {
        self.stale.store(false, Ordering::Release);
        self.rebuild()
    }

    /// The installed table.
    pub fn table(&self) -> Arc<DispatchTable> {
        self.table.load()
    }

    /// Dispatch one request against the installed table.
    pub async fn handle(&self, request: Request) -> RequestContext {
        if self.stale.swap(false, Ordering::AcqRel) {
            if let Err(e) = self.rebuild() {
                tracing::error!(
                    app_id = %self.id,
                    error = %e,
                    "Lazy route refresh failed; serving previous table"
                );
            }
        }

        let table = self.table.load();
        self.engine.dispatch(request, &table).await
    }

    /// Publish APP:STARTING, build the table, publish APP:STARTED.
    pub fn start(&self) -> Result<(), RoutingError> {
        events::emit(&self.bus, events::APP_STARTING, vec![self.describe()]);
        let table = self.refresh_routes()?;
        self.status.store(AppStatus::Started as u8, Ordering::Release);

        tracing::info!(
            app_id = %self.id,
            controllers = self.controller_count(),
            routes = table.len(),
            "Application started"
        );
        events::emit(&self.bus, events::APP_STARTED, vec![self.describe()]);
        Ok(())
    }

    /// Publish APP:ENDING and APP:ENDED, then drop every subscription.
    pub fn shutdown(&self) {
        events::emit(&self.bus, events::APP_ENDING, vec![self.describe()]);
        self.status.store(AppStatus::Ended as u8, Ordering::Release);
        events::emit(&self.bus, events::APP_ENDED, vec![self.describe()]);
        self.bus.clear();
        tracing::info!(app_id = %self.id, "Application ended");
    }

    /// Swap in new options. The environment applies immediately; route
    /// case sensitivity applies on the next rebuild.
    pub fn update_options(&self, options: AppConfig) {
        let previous = self.options.load_full();
        if previous.disable_events != options.disable_events {
            tracing::warn!(
                disable_events = options.disable_events,
                "Event bus state is fixed at creation; ignoring change"
            );
        }

        self.engine.set_environment(options.env);
        tracing::info!(
            app_id = %self.id,
            env = %options.env,
            ignore_route_case = options.ignore_route_case,
            "Application options updated"
        );
        let case_changed = previous.ignore_route_case != options.ignore_route_case;
        self.options.store(Arc::new(options));
        if case_changed {
            self.stale.store(true, Ordering::Release);
        }
    }

    fn rebuild(&self) -> Result<Arc<DispatchTable>, RoutingError> {
        let _guard = self.rebuild_lock.lock();
        let controllers = self.controllers.read().clone();
        let case_insensitive = self.options.load().ignore_route_case;
        self.table.rebuild(&controllers, case_insensitive, &self.bus)
    }

    fn describe(&self) -> serde_json::Value {
        json!({
            "id": self.id.to_string(),
            "status": self.status().as_str(),
        })
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("controllers", &self.controller_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use axum::http::Method;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn hello() -> Controller {
        Controller::new(|router| {
            router.get("/Hello", |cx, _next| {
                Box::pin(async move {
                    cx.response.send("hi");
                    Ok(())
                })
            })?;
            Ok(())
        })
        .named("hello")
    }

    #[tokio::test]
    async fn test_lazy_refresh_on_first_request() {
        let app = App::default();
        app.register_controller(hello());
        assert!(app.table().is_empty());

        let cx = app.handle(Request::from_parts(Method::GET, "/hello")).await;
        assert_eq!(cx.response.body_text(), "hi");
        assert_eq!(app.table().len(), 1);
    }

    #[tokio::test]
    async fn test_case_sensitivity_follows_options() {
        let app = App::new(AppConfig {
            ignore_route_case: false,
            ..AppConfig::default()
        });
        app.register_controller(hello());

        let cx = app.handle(Request::from_parts(Method::GET, "/hello")).await;
        assert_eq!(cx.response.status(), axum::http::StatusCode::NOT_FOUND);

        app.update_options(AppConfig::default());
        let cx = app.handle(Request::from_parts(Method::GET, "/hello")).await;
        assert_eq!(cx.response.body_text(), "hi");
    }

    #[test]
    fn test_lifecycle_events_in_order() {
        let app = App::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        app.events()
            .subscribe_all(move |details| sink.lock().push(details.key.to_string()));

        app.register_controller(hello());
        app.start().unwrap();
        assert_eq!(app.status(), AppStatus::Started);
        app.shutdown();
        assert_eq!(app.status(), AppStatus::Ended);

        assert_eq!(
            *seen.lock(),
            vec![
                "CONTROLLER:REGISTERED",
                "APP:STARTING",
                "ROUTES:BEFORE_REFRESH",
                "ROUTES:AFTER_REFRESH",
                "APP:STARTED",
                "APP:ENDING",
                "APP:ENDED",
            ]
        );
        assert_eq!(app.events().handler_count("*"), 0);
    }

    #[test]
    fn test_disabled_events_publish_nothing() {
        let app = App::new(AppConfig {
            disable_events: true,
            ..AppConfig::default()
        });
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        app.events().subscribe_all(move |_| *sink.lock() += 1);

        app.register_controller(hello());
        app.start().unwrap();
        assert_eq!(*seen.lock(), 0);
    }

    #[test]
    fn test_register_controllers_flattens() {
        let app = App::default();
        app.register_controllers(vec![
            ControllerEntry::from(hello()),
            vec![hello(), hello()].into(),
        ]);
        assert_eq!(app.controller_count(), 3);
        assert_eq!(app.refresh_routes().unwrap().len(), 3);
    }

    #[test]
    fn test_start_fails_on_broken_controller() {
        let app = App::default();
        app.register_controller(Controller::new(|_router| {
            Err(RoutingError::initializer("broken", "missing dependency"))
        }));
        assert!(app.start().is_err());
        assert_eq!(app.status(), AppStatus::Created);
    }

    #[test]
    fn test_concurrent_refresh_installs_newest_registry() {
        let app = Arc::new(App::default());
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let gate = Arc::new(Mutex::new(Some((entered_tx, release_rx))));

        app.register_controller(Controller::new(move |router| {
            if let Some((entered, release)) = gate.lock().take() {
                entered.send(()).unwrap();
                release.recv().unwrap();
            }
            router.get("/first", |_cx, _next| Box::pin(async { Ok(()) }))?;
            Ok(())
        }));

        let slow = {
            let app = app.clone();
            thread::spawn(move || app.refresh_routes().map(|t| t.len()))
        };
        entered_rx.recv().unwrap();

        app.register_controller(Controller::new(|router| {
            router.get("/second", |_cx, _next| Box::pin(async { Ok(()) }))?;
            Ok(())
        }));
        let fast = {
            let app = app.clone();
            thread::spawn(move || app.refresh_routes().map(|t| t.len()))
        };
        thread::sleep(Duration::from_millis(50));
        release_tx.send(()).unwrap();

        assert_eq!(slow.join().unwrap().unwrap(), 1);
        assert_eq!(fast.join().unwrap().unwrap(), 2);
        assert_eq!(app.table().len(), 2);
        assert_eq!(app.table().generation(), 2);
    }

    #[test]
    fn test_options_visible_before_table_marked_stale() {
        let app = App::new(AppConfig {
            ignore_route_case: false,
            ..AppConfig::default()
        });
        app.register_controller(hello());
        app.refresh_routes().unwrap();

        app.update_options(AppConfig::default());
        assert!(app.options().ignore_route_case);
        assert!(app.stale.load(Ordering::Acquire));
        let table = app.refresh_routes().unwrap();
        assert!(table.routes()[0].matches(&Method::GET, "/hello").is_some());
    }

    #[tokio::test]
    async fn test_environment_update_applies_to_next_request() {
        let app = App::default();
        app.register_controller(Controller::new(|router| {
            router.get("/boom", |_cx, _next| {
                Box::pin(async { Err(crate::dispatch::HandlerError::msg("kaboom")) })
            })?;
            Ok(())
        }));

        let cx = app.handle(Request::from_parts(Method::GET, "/boom")).await;
        assert!(cx.response.body_text().contains("kaboom"));

        app.update_options(AppConfig {
            env: Environment::Production,
            ..AppConfig::default()
        });
        let cx = app.handle(Request::from_parts(Method::GET, "/boom")).await;
        assert_eq!(cx.response.body_text(), "Internal Server Error: /boom");
    }
}
