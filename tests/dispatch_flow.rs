//! End-to-end dispatch through the host application.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::{Method, StatusCode};
use request_dispatch::{
    AppConfig, Controller, DispatchState, Environment, ErrorSlot, Request, RoutingError,
};

mod common;

#[tokio::test]
async fn test_proceed_then_respond() {
    let app = common::demo_app(AppConfig::default());
    let cx = app.handle(Request::from_parts(Method::GET, "/")).await;

    assert_eq!(cx.state(), DispatchState::Done);
    assert_eq!(cx.response.body_text(), "Hi");
    assert_eq!(cx.response.view_namespace(), Some("views"));
}

#[tokio::test]
async fn test_named_param_and_repeated_separators() {
    let app = common::demo_app(AppConfig::default());
    let cx = app
        .handle(Request::from_parts(Method::GET, "//home///Ann?x=1"))
        .await;
    assert_eq!(cx.response.body_text(), "Welcome home, Ann");

    let cx = app.handle(Request::from_parts(Method::GET, "/home/")).await;
    assert_eq!(cx.state(), DispatchState::NotFound);
}

#[tokio::test]
async fn test_optional_wildcard() {
    let app = common::demo_app(AppConfig::default());

    let cx = app.handle(Request::from_parts(Method::GET, "/docs")).await;
    assert_eq!(cx.response.body_text(), "docs:");

    let cx = app.handle(Request::from_parts(Method::GET, "/docs/x/y")).await;
    assert_eq!(cx.response.body_text(), "docs:x/y");
}

#[tokio::test]
async fn test_error_reaches_custom_internal_handler_once() {
    let app = common::demo_app(AppConfig {
        env: Environment::Production,
        ..AppConfig::default()
    });
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    app.on_error(ErrorSlot::Internal, move |cx| {
        counter.fetch_add(1, Ordering::SeqCst);
        let body = format!("custom: {}", cx.last_error().map(ToString::to_string).unwrap_or_default());
        cx.response
            .set_status(StatusCode::SERVICE_UNAVAILABLE)
            .send(body);
    });
    let events = common::record_events(&app);

    let cx = app.handle(Request::from_parts(Method::GET, "/oops")).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cx.state(), DispatchState::Errored);
    assert_eq!(cx.response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(cx.response.body_text(), "custom: Oopsie");
    assert!(events.lock().iter().any(|k| k == "REQUEST:ERRORED"));
}

#[tokio::test]
async fn test_not_found_is_observable() {
    let app = common::demo_app(AppConfig::default());
    let events = common::record_events(&app);

    let cx = app.handle(Request::from_parts(Method::POST, "/")).await;

    assert_eq!(cx.state(), DispatchState::NotFound);
    assert_eq!(cx.response.status(), StatusCode::NOT_FOUND);
    assert_eq!(cx.response.body_text(), "Not Found: /");
    assert!(events.lock().iter().any(|k| k == "REQUEST:NOT_FOUND"));
}

#[tokio::test]
async fn test_broken_registration_keeps_serving_previous_table() {
    let app = common::demo_app(AppConfig::default());
    app.refresh_routes().unwrap();
    let before = app.table();

    app.register_controller(
        Controller::new(|_router| Err(RoutingError::initializer("late", "not ready"))).named("late"),
    );
    assert!(app.refresh_routes().is_err());
    assert!(Arc::ptr_eq(&before, &app.table()));

    let cx = app.handle(Request::from_parts(Method::GET, "/")).await;
    assert_eq!(cx.response.body_text(), "Hi");
}

#[tokio::test]
async fn test_concurrent_requests_during_rebuild() {
    let app = common::demo_app(AppConfig::default());
    app.refresh_routes().unwrap();

    let mut tasks = Vec::new();
    for i in 0..32 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            if i % 8 == 0 {
                app.refresh_routes().unwrap();
            }
            let cx = app.handle(Request::from_parts(Method::GET, "/home/Bob")).await;
            cx.response.body_text()
        }));
    }

    for task in tasks {
        assert_eq!(task.await.unwrap(), "Welcome home, Bob");
    }
}
