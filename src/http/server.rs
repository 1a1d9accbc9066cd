//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy and shell handlers
//! - Wire up middleware (tracing, request ID, timeout, body limit)
//! - Build the upstream client and media table once, share them via state
//! - Bind server to listener, drain on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::http::proxy::{build_client, Proxy};
use crate::http::request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
use crate::http::shell;
use crate::media::MediaTable;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub proxy: Proxy,
}

/// HTTP server for the rewriting proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the standard media table.
    pub fn new(config: ProxyConfig) -> Self {
        let media = Arc::new(MediaTable::standard(&config.limits));
        Self::with_media_table(config, media)
    }

    /// Create a new HTTP server with an explicitly built media table.
    pub fn with_media_table(config: ProxyConfig, media: Arc<MediaTable>) -> Self {
        let client = build_client(&config.timeouts);
        let state = AppState {
            proxy: Proxy::new(client, media),
        };

        let router = Self::build_router(&config, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(shell::index))
            .route(shell::ABOUT_PATH, get(shell::about))
            .route("/redirect", post(shell::redirect))
            .route("/http/{*rest}", any(proxy_handler))
            .route("/https/{*rest}", any(proxy_handler))
            .fallback(shell::fallback)
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.limits.max_request_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler for `/http/...` and `/https/...`.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request.request_id().to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    match state.proxy.handle(request).await {
        Ok(response) => {
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                status = response.status().as_u16(),
                "Responded"
            );
            response
        }
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                error = %e,
                "Request failed"
            );
            e.into_response()
        }
    }
}
