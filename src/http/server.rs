//! HTTP server setup and alert intake.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, timeout)
//! - Authenticate and decode alert payloads, then dispatch them
//! - Expose liveness, readiness and the reload trigger
//! - Serve until the shutdown broadcast fires

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::alert::WebhookMessage;
use crate::config::ServerConfig;
use crate::http::request::{
    check_token, is_json_content_type, propagate_request_id_layer, set_request_id_layer,
    RequestIdExt,
};
use crate::http::response;
use crate::observability::metrics;
use crate::reload::ReloadManager;
use crate::runtime::{dispatch, RuntimeStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RuntimeStore>,
    pub reload: Arc<ReloadManager>,
    /// Serializes admin edits from write through rollback.
    pub edits: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: Arc<RuntimeStore>, reload: Arc<ReloadManager>) -> Self {
        Self {
            store,
            reload,
            edits: Arc::new(Mutex::new(())),
        }
    }
}

/// HTTP server for the relay.
///
/// Paths, body limit and timeout come from the snapshot served at startup and
/// are not affected by later reloads.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let router = Self::build_router(state);
        Self { router }
    }

    /// The fully layered router, for serving or for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState) -> Router {
        let snapshot = state.store.load();
        let server: &ServerConfig = &snapshot.config.server;
        let admin_prefix = snapshot.config.admin.mount_path();

        let app = Router::new()
            .route("/healthz", get(healthz))
            .route("/readyz", get(readyz))
            .route("/-/reload", post(reload_handler))
            .route(&server.path, post(alert_handler))
            .nest(&admin_prefix, admin::setup_admin_router(state.clone()))
            .with_state(state);

        app.layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer())
                .layer(RequestBodyLimitLayer::new(server.max_body_bytes))
                .layer(TimeoutLayer::new(server.write_timeout()))
                .layer(DefaultBodyLimit::disable()),
        )
    }

    /// Run the server on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn healthz() -> Response {
    response::ok("ok")
}

async fn readyz() -> Response {
    response::ok("ready")
}

async fn reload_handler(State(state): State<AppState>) -> Response {
    match state.reload.reload_async(true).await {
        Ok(_) => response::ok("ok"),
        Err(e) => response::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn alert_handler(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let request_id = headers.request_id();

    if !is_json_content_type(&headers) {
        metrics::record_alert("rejected");
        return response::error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "content-type must be application/json",
        );
    }

    let snapshot = state.store.load();
    if !check_token(&headers, snapshot.config.auth.token.expose()) {
        metrics::record_alert("unauthorized");
        return response::error(StatusCode::UNAUTHORIZED, "unauthorized");
    }

    let msg: WebhookMessage = match serde_json::from_slice(&body) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Invalid alert payload");
            metrics::record_alert("invalid");
            return response::error(StatusCode::BAD_REQUEST, "invalid json");
        }
    };

    tracing::debug!(
        request_id = %request_id,
        receiver = %msg.receiver,
        status = %msg.status,
        alerts = msg.alerts.len(),
        "Alert received"
    );

    match dispatch(&snapshot, &msg).await {
        Ok(delivered) => {
            metrics::record_alert("ok");
            tracing::info!(request_id = %request_id, receiver = %msg.receiver, delivered, "Alert delivered");
            response::ok("ok")
        }
        Err(e) => {
            metrics::record_alert("error");
            tracing::error!(request_id = %request_id, receiver = %msg.receiver, error = %e, "Alert delivery failed");
            response::error(StatusCode::INTERNAL_SERVER_ERROR, "send failed")
        }
    }
}
