//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router whose single fallback feeds the dispatch core
//! - Wire up middleware (tracing, timeout, request ID)
//! - Convert transport requests into descriptors and responses back
//! - Apply hot-reloaded options to the running application
//! - Drive the application lifecycle around the serve loop

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request as HttpRequest, State},
    response::Response as HttpResponse,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::app::App;
use crate::config::DispatchConfig;
use crate::http::request::Request;
use crate::lifecycle::Shutdown;
use crate::routing::RoutingError;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Startup failed: {0}")]
    Routing(#[from] RoutingError),
}

/// HTTP front end for an [`App`].
pub struct HttpServer {
    app: Arc<App>,
    config: DispatchConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(app: Arc<App>, config: DispatchConfig) -> Self {
        let router = Self::build_router(&config, app.clone());
        Self {
            app,
            config,
            router,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &DispatchConfig, app: Arc<App>) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(app)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Start the application and serve until `shutdown` fires.
    ///
    /// Configs received on `config_updates` replace the application
    /// options; listener and timeout changes need a restart.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: Option<mpsc::UnboundedReceiver<DispatchConfig>>,
        shutdown: Shutdown,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        self.app.start()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if let Some(updates) = config_updates {
            tokio::spawn(apply_updates(
                self.app.clone(),
                self.config.clone(),
                updates,
                shutdown.clone(),
            ));
        }

        let mut stop = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        self.app.shutdown();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn apply_updates(
    app: Arc<App>,
    mut current: DispatchConfig,
    mut updates: mpsc::UnboundedReceiver<DispatchConfig>,
    shutdown: Shutdown,
) {
    let mut stop = shutdown.subscribe();
    loop {
        tokio::select! {
            Some(config) = updates.recv() => {
                if config.listener != current.listener || config.timeouts != current.timeouts {
                    tracing::warn!("Listener and timeout changes apply after restart");
                }
                app.update_options(config.app.clone());
                current = config;
            }
            _ = stop.recv() => break,
            else => break,
        }
    }
    tracing::debug!("Config update task stopped");
}

/// Fallback handler: every request goes through the dispatch core.
async fn dispatch_handler(State(app): State<Arc<App>>, request: HttpRequest) -> HttpResponse {
    let (parts, _body) = request.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let cx = app
        .handle(Request::new(parts.method, target, parts.headers))
        .await;

    tracing::debug!(
        status = %cx.response.status(),
        state = %cx.state(),
        "Request dispatched"
    );
    cx.response.into_http()
}
