//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: health surface + dispatcher fallback
//! - Wire up middleware (tracing, timeout, body limit)
//! - Serve with graceful shutdown
//! - Emit access log entries and request metrics at response end

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::{header, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use chrono::Utc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::config::store::ConfigStore;
use crate::dispatch::Dispatcher;
use crate::observability::access_log::{AccessLogEntry, AccessLogSink};
use crate::observability::metrics;
use crate::render::Renderer;
use crate::statics;

/// Health surface, fixed and independent of configuration.
const HEALTH_PATH: &str = "/health";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub access_log: AccessLogSink,
    /// Process start time, reported on the health surface.
    pub launch_date: Arc<str>,
}

/// HTTP server for the dispatcher.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over a bootstrapped config store.
    pub fn new(
        store: Arc<ConfigStore>,
        renderer: Arc<dyn Renderer>,
        access_log: AccessLogSink,
    ) -> Self {
        let settings = store.settings();
        let dispatcher = Arc::new(Dispatcher::new(store.clone(), renderer));

        let state = AppState {
            store,
            dispatcher,
            access_log,
            launch_date: Utc::now().to_rfc2822().into(),
        };

        let router = Router::new()
            .route(HEALTH_PATH, any(health_handler))
            .fallback(request_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                settings.request_timeout_secs,
            )))
            .layer(DefaultBodyLimit::max(settings.max_body_bytes))
            .layer(TraceLayer::new_for_http());

        Self { router }
    }

    /// Run the server until shutdown fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Shutdown signal received");
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Shutdown triggered");
                    }
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Health check: `200 ok` with the process launch date, bypassing all
/// routing and configuration.
async fn health_handler(State(state): State<AppState>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/plain".to_string()),
            (
                header::HeaderName::from_static("launch-date"),
                state.launch_date.to_string(),
            ),
        ],
        "ok",
    )
        .into_response()
}

/// Everything that is not the health surface: static delivery first,
/// then the dispatch pipeline.
async fn request_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    // Statics stay servable even while required artifacts are broken.
    let request = match statics::try_serve(&state.store, request).await {
        Ok(response) => return response,
        Err(request) => request,
    };

    let mut entry = AccessLogEntry::new(method.as_str(), path.as_str());
    let response = state.dispatcher.dispatch(request, &mut entry).await;

    entry.status = response.status().as_u16();
    entry.duration_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        action = entry.action.as_deref().unwrap_or("-"),
        status = entry.status,
        duration_ms = entry.duration_ms,
        "Request dispatched"
    );
    metrics::record_request(
        &method,
        entry.status,
        entry.action.as_deref().unwrap_or("-"),
        start,
    );
    state.access_log.emit(entry);

    response
}
