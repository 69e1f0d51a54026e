//! Shared utilities for integration tests.

use std::sync::Arc;

use parking_lot::Mutex;
use request_dispatch::{App, AppConfig, Controller, HandlerError};

/// Records the keys of every event published on `app`'s bus.
#[allow(dead_code)]
pub fn record_events(app: &App) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    app.events()
        .subscribe_all(move |details| sink.lock().push(details.key.to_string()));
    seen
}

/// The demo-style controller used across tests.
pub fn views_controller() -> Controller {
    Controller::new(|router| {
        router
            .get("/", |_cx, next| {
                Box::pin(async move {
                    next.proceed();
                    Ok(())
                })
            })?
            .get("/", |cx, _next| {
                Box::pin(async move {
                    cx.response.send("Hi");
                    Ok(())
                })
            })?
            .get("/home/:name", |cx, _next| {
                Box::pin(async move {
                    let body = format!("Welcome home, {}", cx.request.param("name").unwrap_or_default());
                    cx.response.send(body);
                    Ok(())
                })
            })?
            .get("/docs/*?", |cx, _next| {
                Box::pin(async move {
                    let rest = cx.request.params().wildcard(0).unwrap_or_default().to_string();
                    cx.response.send(format!("docs:{}", rest));
                    Ok(())
                })
            })?
            .get("/oops", |_cx, next| {
                Box::pin(async move {
                    next.fail(HandlerError::msg("Oopsie"));
                    Ok(())
                })
            })?;
        Ok(())
    })
    .named("views")
}

/// An app with the views controller registered under the `views` namespace.
#[allow(dead_code)]
pub fn demo_app(options: AppConfig) -> Arc<App> {
    let app = Arc::new(App::new(options));
    app.register_controller_in("views", views_controller());
    app
}
