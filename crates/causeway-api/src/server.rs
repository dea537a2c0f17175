//! API server implementation.
//!
//! Provides health, ready, metrics, and operation endpoints for the
//! Causeway relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use causeway_core::{Error as CoreError, Result};
use causeway_relay::dispatch::{
    DispatchOutcome, HttpDispatcher, WorkerDispatchRequest, WorkerDispatcher,
};
use causeway_relay::ledger::InMemoryLedger;
use causeway_relay::sweep::Sweeper;
use causeway_relay::{Relay, RelayConfig};

use crate::config::{Config, CorsConfig};

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// The relay behind every operation route.
    relay: Arc<Relay>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("relay", &"<Relay>")
            .finish()
    }
}

impl AppState {
    /// Returns the relay service.
    #[must_use]
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }
}

/// Dispatcher used in debug mode when no worker URL is configured.
///
/// Fails every dispatch immediately, which the relay converts into a stored
/// error record, so local submissions still settle.
struct NullDispatcher;

#[async_trait]
impl WorkerDispatcher for NullDispatcher {
    async fn dispatch(&self, request: &WorkerDispatchRequest) -> DispatchOutcome {
        tracing::warn!(
            correlation_id = %request.correlation_id,
            "no worker configured; failing dispatch"
        );
        DispatchOutcome::Failed {
            message: "no worker configured (CAUSEWAY_WORKER_URL is unset)".to_string(),
            retryable: false,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check
/// that doesn't verify dependencies.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// Returns 200 OK if the service is ready to accept requests.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.relay.ledger_size().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                message: Some(format!("ledger check failed: {e}")),
            }),
        ),
    }
}

/// Serves the generated `OpenAPI` spec as JSON.
async fn serve_openapi() -> axum::response::Response {
    match crate::openapi::openapi_json() {
        Ok(json) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            json,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to serialize OpenAPI spec: {e}"),
        )
            .into_response(),
    }
}

// ============================================================================
// Server
// ============================================================================

/// The Causeway API server.
pub struct Server {
    config: Config,
    relay: Arc<Relay>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("relay", &"<Relay>")
            .finish()
    }
}

fn relay_config(config: &Config) -> RelayConfig {
    RelayConfig {
        ttl: config.operation_ttl(),
        dispatch_max_attempts: config.dispatch_max_attempts,
        dispatch_backoff: Duration::from_millis(config.dispatch_backoff_ms),
        public_base_url: config.public_base_url(),
        ..RelayConfig::default()
    }
}

fn build_dispatcher(config: &Config) -> Result<Arc<dyn WorkerDispatcher>> {
    let Some(worker_url) = config.worker_url.as_deref() else {
        if config.debug {
            tracing::warn!("CAUSEWAY_WORKER_URL not set; dispatches will fail (debug only)");
            return Ok(Arc::new(NullDispatcher));
        }
        return Err(CoreError::InvalidInput(
            "CAUSEWAY_WORKER_URL is required when CAUSEWAY_DEBUG=false".to_string(),
        ));
    };

    let dispatcher = match config.dispatch_timeout_secs {
        Some(secs) => HttpDispatcher::with_timeout(
            worker_url,
            config.dispatch_mode,
            Duration::from_secs(secs),
        ),
        None => HttpDispatcher::new(worker_url, config.dispatch_mode),
    }
    .map_err(|e| CoreError::InvalidInput(e.to_string()))?;

    let dispatcher = match config.worker_api_key.as_deref() {
        Some(key) => dispatcher.with_api_key(key),
        None => dispatcher,
    };
    Ok(Arc::new(dispatcher))
}

impl Server {
    /// Creates a new server with an in-memory ledger and the configured
    /// HTTP dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker URL is missing outside debug mode or
    /// does not parse.
    pub fn new(config: Config) -> Result<Self> {
        let dispatcher = build_dispatcher(&config)?;
        let relay = Arc::new(Relay::new(
            Arc::new(InMemoryLedger::new()),
            dispatcher,
            relay_config(&config),
        ));
        Ok(Self { config, relay })
    }

    /// Creates a server over an explicit relay (primarily tests).
    #[must_use]
    pub fn with_relay(config: Config, relay: Arc<Relay>) -> Self {
        Self { config, relay }
    }

    /// Creates a new `ServerBuilder`.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates the router with all routes and middleware.
    fn create_router(&self) -> Router {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            relay: Arc::clone(&self.relay),
        });

        let cors = self.build_cors_layer();
        let request_id_layer = middleware::from_fn(crate::context::request_id_middleware);
        let metrics_layer = middleware::from_fn(crate::metrics::metrics_middleware);

        Router::new()
            // Health, ready, and metrics endpoints
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/metrics", get(crate::metrics::serve_metrics))
            .route("/openapi.json", get(serve_openapi))
            // Operation routes
            .nest("/api/v1", crate::routes::api_v1_routes())
            // Middleware (order matters): metrics outermost for timing, then
            // trace, then request-id, then CORS.
            .layer(cors)
            .layer(request_id_layer)
            .layer(TraceLayer::new_for_http())
            .layer(metrics_layer)
            .with_state(state)
    }

    /// Builds the CORS layer from configuration.
    fn build_cors_layer(&self) -> CorsLayer {
        let cors_config = &self.config.cors;
        let cors = Self::build_cors_base(cors_config);
        Self::apply_cors_allowed_origins(cors, cors_config)
    }

    fn build_cors_base(cors_config: &CorsConfig) -> CorsLayer {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                header::ACCEPT,
                header::HeaderName::from_static("x-request-id"),
            ])
            .expose_headers([
                header::CONTENT_TYPE,
                header::CONTENT_LENGTH,
                header::HeaderName::from_static("x-request-id"),
            ])
            .max_age(Duration::from_secs(cors_config.max_age_seconds))
    }

    fn cors_allows_any_origin(cors_config: &CorsConfig) -> bool {
        cors_config.allowed_origins.len() == 1
            && cors_config
                .allowed_origins
                .first()
                .is_some_and(|origin| origin == "*")
    }

    fn parse_cors_origins(cors_config: &CorsConfig) -> Vec<HeaderValue> {
        let mut allowed = Vec::new();
        for origin in &cors_config.allowed_origins {
            match HeaderValue::from_str(origin) {
                Ok(value) => allowed.push(value),
                Err(_) => {
                    tracing::error!(
                        origin = %origin,
                        "Invalid CORS origin; expected a valid HeaderValue"
                    );
                }
            }
        }
        allowed
    }

    fn apply_cors_allowed_origins(cors: CorsLayer, cors_config: &CorsConfig) -> CorsLayer {
        if cors_config.allowed_origins.is_empty() {
            return cors;
        }

        if Self::cors_allows_any_origin(cors_config) {
            return cors.allow_origin(Any);
        }

        if cors_config
            .allowed_origins
            .iter()
            .any(|origin| origin == "*")
        {
            tracing::error!(
                origins = ?cors_config.allowed_origins,
                "Invalid CORS config: '*' must be the only allowed origin"
            );
            return cors;
        }

        let allowed = Self::parse_cors_origins(cors_config);

        if allowed.is_empty() {
            tracing::warn!("All configured CORS origins were invalid; disabling CORS");
            cors
        } else {
            tracing::info!(origins = ?cors_config.allowed_origins, "CORS configured");
            cors.allow_origin(AllowOrigin::list(allowed))
        }
    }

    /// Starts the server and blocks until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the server cannot
    /// bind to its port.
    pub async fn serve(&self) -> Result<()> {
        self.validate_config()?;

        // Initialize metrics before starting the server
        crate::metrics::init_metrics();
        causeway_relay::metrics::register_metrics();

        let sweeper = Sweeper::new(
            Arc::clone(self.relay.ledger()),
            self.config.operation_ttl(),
        );
        let _sweep_handle = sweeper.spawn();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(
            http_port = self.config.http_port,
            "Starting Causeway API server"
        );

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| CoreError::Internal {
                message: format!("failed to bind to {addr}: {e}"),
            })?;

        axum::serve(listener, router)
            .await
            .map_err(|e| CoreError::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    /// Creates a test router for the server.
    ///
    /// This is useful for integration tests where you want to test
    /// the routes without actually binding to a port.
    #[doc(hidden)]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }

    fn validate_config(&self) -> Result<()> {
        // Enforce "no wildcard in production" for CORS.
        if !self.config.debug
            && self
                .config
                .cors
                .allowed_origins
                .iter()
                .any(|origin| origin == "*")
        {
            return Err(CoreError::InvalidInput(
                "cors.allowed_origins cannot include '*' when debug=false".to_string(),
            ));
        }

        if !self.config.debug && self.config.worker_url.is_none() {
            return Err(CoreError::InvalidInput(
                "CAUSEWAY_WORKER_URL is required when CAUSEWAY_DEBUG=false".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing a server.
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config: Config,
}

impl ServerBuilder {
    /// Creates a new server builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HTTP port.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Enables debug mode.
    #[must_use]
    pub fn debug(mut self, enabled: bool) -> Self {
        self.config.debug = enabled;
        self
    }

    /// Sets the worker URL dispatches are posted to.
    #[must_use]
    pub fn worker_url(mut self, url: impl Into<String>) -> Self {
        self.config.worker_url = Some(url.into());
        self
    }

    /// Sets the dispatch mode.
    #[must_use]
    pub fn dispatch_mode(mut self, mode: causeway_relay::dispatch::DispatchMode) -> Self {
        self.config.dispatch_mode = mode;
        self
    }

    /// Sets the public base URL used in polling hints and callback URLs.
    #[must_use]
    pub fn public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.public_base_url = Some(base_url.into());
        self
    }

    /// Builds the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker URL is missing outside debug mode or
    /// does not parse.
    pub fn build(self) -> Result<Server> {
        Server::new(self.config)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_endpoint() -> Result<()> {
        let server = ServerBuilder::new().debug(true).build()?;
        let router = server.test_router();

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .context("build request")?;

        let response = router.oneshot(request).await.map_err(|err| -> anyhow::Error { match err {} })?;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .context("read response body")?;
        let health: HealthResponse = serde_json::from_slice(&body).context("parse JSON body")?;
        assert_eq!(health.status, "ok");
        Ok(())
    }

    #[tokio::test]
    async fn test_ready_endpoint() -> Result<()> {
        let server = ServerBuilder::new().debug(true).build()?;
        let router = server.test_router();

        let request = Request::builder()
            .uri("/ready")
            .body(Body::empty())
            .context("build request")?;

        let response = router.oneshot(request).await.map_err(|err| -> anyhow::Error { match err {} })?;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024)
            .await
            .context("read response body")?;
        let ready: ReadyResponse = serde_json::from_slice(&body).context("parse JSON body")?;
        assert!(ready.ready);
        Ok(())
    }

    #[tokio::test]
    async fn test_openapi_endpoint() -> Result<()> {
        let server = ServerBuilder::new().debug(true).build()?;
        let router = server.test_router();

        let request = Request::builder()
            .uri("/openapi.json")
            .body(Body::empty())
            .context("build request")?;

        let response = router.oneshot(request).await.map_err(|err| -> anyhow::Error { match err {} })?;

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .context("read response body")?;
        let spec: serde_json::Value = serde_json::from_slice(&body).context("parse JSON body")?;
        assert!(spec["paths"]["/api/v1/operations"].is_object());
        Ok(())
    }

    #[test]
    fn test_build_fails_without_worker_url_in_production() {
        let result = ServerBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_rejects_invalid_worker_url() {
        let result = ServerBuilder::new().worker_url("not a url").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_config_rejects_wildcard_cors_in_production() {
        let mut config = Config {
            worker_url: Some("http://worker:9000/work".to_string()),
            ..Config::default()
        };
        config.cors.allowed_origins = vec!["*".to_string()];
        let server = Server::new(config).expect("server should build");
        assert!(server.validate_config().is_err());
    }
}
