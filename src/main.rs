//! request-dispatch server binary.
//!
//! Loads configuration, installs logging and metrics, registers the
//! demonstration controllers and serves until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tokio::net::TcpListener;

use request_dispatch::config::{load_config, watcher::ConfigWatcher, DispatchConfig};
use request_dispatch::lifecycle::{spawn_signal_listener, Shutdown};
use request_dispatch::observability::{init_logging, init_metrics};
use request_dispatch::{App, Controller, HandlerError, HttpServer};

#[derive(Parser)]
#[command(name = "request-dispatch")]
#[command(about = "HTTP request-dispatch server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload application options when the configuration file changes
    #[arg(short, long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DispatchConfig::default(),
    };
    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        env = %config.app.env,
        request_timeout_secs = config.timeouts.request_secs,
        "request-dispatch starting"
    );

    // The watcher stops when dropped, so it lives until main returns.
    let (updates, _watcher) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(updates), Some(watcher.run()?))
        }
        _ => (None, None),
    };

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let app = Arc::new(App::new(config.app.clone()));
    app.events().subscribe_all(|details| {
        tracing::debug!(
            event = %details.key,
            position = details.call_position,
            arguments = ?details.arguments,
            "Event published"
        );
    });
    app.register_controller_in("home", whoop_controller())
        .register_controller_in("views", views_controller());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    HttpServer::new(app, config)
        .run(listener, updates, shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

fn whoop_controller() -> Controller {
    Controller::new(|router| {
        router.get("/whoop", |cx, _next| {
            Box::pin(async move {
                cx.response.send("Hi from whoop");
                Ok(())
            })
        })?;
        Ok(())
    })
    .named("whoop")
}

fn views_controller() -> Controller {
    Controller::new(|router| {
        router
            .get("/", |cx, next| {
                Box::pin(async move {
                    tracing::debug!(target_path = %cx.request.target(), "Skipping to next route");
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
            .get("/home", |cx, _next| {
                Box::pin(async move {
                    tracing::debug!(query = ?cx.request.query(), "Home visited");
                    cx.response.send("Welcome home");
                    Ok(())
                })
            })?
            .get("/home/:name", |cx, _next| {
                Box::pin(async move {
                    let greeting = format!(
                        "Welcome home, {}",
                        cx.request.param("name").unwrap_or_default()
                    );
                    cx.response.send(greeting);
                    Ok(())
                })
            })?
            .get("/json", |cx, _next| {
                Box::pin(async move {
                    let params: serde_json::Map<_, _> = cx
                        .request
                        .params()
                        .iter()
                        .map(|(k, v)| (k.to_string(), json!(v)))
                        .collect();
                    let body = json!({
                        "method": cx.request.method().as_str(),
                        "target": cx.request.target(),
                        "query": cx.request.query(),
                        "params": params,
                        "request_id": cx.request.request_id(),
                        "view_namespace": cx.response.view_namespace(),
                    });
                    cx.response.json(&body).map_err(HandlerError::from)
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
