//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the `/metrics` handler
//! - Wire up middleware (auth, tracing, request ID, timeout)
//! - Serve until the shutdown future resolves
//!
//! The handler only reads the registry. It never triggers a poll, so scrape
//! latency does not depend on RPC latency.

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::http::auth::{auth_middleware, AuthGate};
use crate::registry::BalanceRegistry;

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context shared by all handlers.
#[derive(Clone)]
pub struct AppContext {
    pub registry: BalanceRegistry,
    pub auth: AuthGate,
    /// Renders the exporter's own metrics, when a recorder is installed.
    pub telemetry: Option<PrometheusHandle>,
}

impl AppContext {
    pub fn new(registry: BalanceRegistry, auth: AuthGate) -> Self {
        Self {
            registry,
            auth,
            telemetry: None,
        }
    }

    pub fn with_telemetry(mut self, handle: PrometheusHandle) -> Self {
        self.telemetry = Some(handle);
        self
    }
}

/// HTTP server exposing the balance registry.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(context: AppContext) -> Self {
        if context.auth.is_enabled() {
            tracing::info!("Static token authentication enabled");
        } else {
            tracing::info!("Static token authentication disabled");
        }
        Self {
            router: build_router(context),
        }
    }

    /// The router, for serving elsewhere or driving directly in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(context: AppContext) -> Router {
    let auth = context.auth.clone();
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(context)
        .layer(middleware::from_fn_with_state(auth, auth_middleware))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn metrics_handler(State(context): State<AppContext>) -> impl IntoResponse {
    let mut body = context.registry.dump();
    if let Some(handle) = &context.telemetry {
        body.push_str(&handle.render());
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        body,
    )
}
