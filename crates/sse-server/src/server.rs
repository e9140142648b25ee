//! `SseServer`: Axum HTTP server in front of the hub.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use sse_hub::{Hub, HubHandle, HubStatus, Message};
use sse_settings::SseSettings;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::errors::{Result, ServerError};
use crate::health::{self, HealthResponse};
use crate::metrics::{PUBLISH_REQUESTS_TOTAL, STREAMS_OPENED_TOTAL};
use crate::shutdown::ShutdownCoordinator;
use crate::stream;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the hub loop.
    pub hub: HubHandle,
    /// Prometheus render handle.
    pub metrics: PrometheusHandle,
    /// When the server started.
    pub start_time: Instant,
    /// Idle interval between keepalive comments (`None` disables them).
    pub keepalive: Option<Duration>,
}

/// The SSE broadcast server.
pub struct SseServer {
    settings: SseSettings,
    hub: HubHandle,
    shutdown: Arc<ShutdownCoordinator>,
    metrics: PrometheusHandle,
    start_time: Instant,
}

impl SseServer {
    /// Create a server and start its hub on the current runtime.
    pub fn new(settings: SseSettings, metrics: PrometheusHandle) -> Self {
        let (hub, _hub_task) = Hub::start(settings.hub.clone());
        Self {
            settings,
            shutdown: Arc::new(ShutdownCoordinator::new(hub.clone())),
            hub,
            metrics,
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let keepalive = match self.settings.server.keepalive_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        let state = AppState {
            hub: self.hub.clone(),
            metrics: self.metrics.clone(),
            start_time: self.start_time,
            keepalive,
        };

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/admin/status.json", get(status_handler))
            .route("/subscribe/", get(subscribe_root_handler))
            .route("/subscribe/{*namespace}", get(subscribe_handler));
        if self.settings.server.allow_publish {
            router = router
                .route("/publish/", post(publish_root_handler))
                .route("/publish/{*namespace}", post(publish_handler));
        }

        router
            .with_state(state)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>)> {
        let addr = format!("{}:{}", self.settings.server.host, self.settings.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(token.cancelled_owned());
            if let Err(e) = serve.await {
                warn!(error = %e, "server exited with error");
            }
        });

        info!(%local_addr, "sse server listening");
        Ok((local_addr, handle))
    }

    /// Publish a message from inside the process.
    pub async fn broadcast(&self, msg: Message) -> Result<()> {
        self.hub.broadcast(msg).await?;
        Ok(())
    }

    /// End every open stream, then stop accepting connections.
    pub async fn shutdown(&self) {
        self.shutdown.shutdown().await;
    }

    /// [`shutdown`](Self::shutdown), then wait up to `timeout` for `handles`.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) {
        self.shutdown.graceful_shutdown(handles, timeout).await;
    }

    /// Get the hub handle.
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Get the shutdown coordinator.
    pub fn coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server settings.
    pub fn settings(&self) -> &SseSettings {
        &self.settings
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let status = state.hub.status().await?;
    Ok(Json(health::health_check(
        state.start_time,
        status.connection_count(),
    )))
}

/// GET /admin/status.json
async fn status_handler(State(state): State<AppState>) -> Result<Json<HubStatus>> {
    Ok(Json(state.hub.status().await?))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = crate::metrics::render(&state.metrics);
    (
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; version=0.0.4"),
        )],
        body,
    )
        .into_response()
}

/// GET /subscribe/
async fn subscribe_root_handler(state: State<AppState>) -> Result<Response> {
    open_stream(state, "/".to_string()).await
}

/// GET /subscribe/{*namespace}
async fn subscribe_handler(state: State<AppState>, Path(namespace): Path<String>) -> Result<Response> {
    open_stream(state, format!("/{namespace}")).await
}

async fn open_stream(State(state): State<AppState>, namespace: String) -> Result<Response> {
    let sub = state.hub.subscribe(namespace).await?;
    counter!(STREAMS_OPENED_TOTAL).increment(1);
    debug!(conn_id = %sub.id(), namespace = sub.namespace(), "event stream opened");

    let body = Body::from_stream(stream::event_stream(sub, state.keepalive));
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream")),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
        .into_response())
}

/// Query parameters accepted by `POST /publish`.
#[derive(Debug, Default, Deserialize)]
struct PublishParams {
    event: Option<String>,
}

/// POST /publish/
async fn publish_root_handler(
    state: State<AppState>,
    params: Query<PublishParams>,
    body: Bytes,
) -> Result<StatusCode> {
    publish(state, "/".to_string(), params, body).await
}

/// POST /publish/{*namespace}
async fn publish_handler(
    state: State<AppState>,
    Path(namespace): Path<String>,
    params: Query<PublishParams>,
    body: Bytes,
) -> Result<StatusCode> {
    publish(state, format!("/{namespace}"), params, body).await
}

async fn publish(
    State(state): State<AppState>,
    namespace: String,
    Query(params): Query<PublishParams>,
    body: Bytes,
) -> Result<StatusCode> {
    let mut msg = Message::new(namespace, body);
    if let Some(event) = params.event {
        msg = msg.with_event(event);
    }
    state.hub.broadcast(msg).await?;
    counter!(PUBLISH_REQUESTS_TOTAL).increment(1);
    Ok(StatusCode::ACCEPTED)
}
