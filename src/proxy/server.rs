//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the axum router; every path enters the dispatcher
//! - Construct the server pool from configuration
//! - Buffer inbound bodies so the retry path can replay them
//! - Spawn the health monitor alongside the listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{loader, ConfigError, DispatchConfig, ProxyConfig};
use crate::health::HealthMonitor;
use crate::load_balancer::{Backend, ServerPool};
use crate::proxy::dispatch::dispatch;
use crate::proxy::forward::{Forwarder, HttpForwarder};

/// Largest inbound body the proxy will buffer for retry replay.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Application state injected into the handler.
#[derive(Clone)]
pub struct AppState {
    pool: Arc<ServerPool>,
    forwarder: Arc<dyn Forwarder>,
    dispatch: DispatchConfig,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    pool: Arc<ServerPool>,
}

impl HttpServer {
    /// Build the server from validated configuration. An unparseable
    /// backend URL is fatal here; nothing else in the system is.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let mut pool = ServerPool::new();
        for raw in &config.backends {
            let url = loader::parse_backend_url(raw)?;
            tracing::info!(backend = %url, "configured backend");
            pool.add_backend(Arc::new(Backend::new(url)));
        }
        let pool = Arc::new(pool);

        let state = AppState {
            pool: pool.clone(),
            forwarder: Arc::new(HttpForwarder::new()),
            dispatch: config.dispatch.clone(),
        };
        let router = Self::build_router(&config, state);

        Ok(Self {
            router,
            config,
            pool,
        })
    }

    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// The health monitor is spawned as a detached task and runs for the
    /// life of the process; only the listener observes Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, backends = self.pool.len(), "load balancer starting");

        let monitor = HealthMonitor::new(self.pool.clone(), self.config.health_check.clone());
        tokio::spawn(monitor.run());

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }

    /// The server pool, shared with the health monitor.
    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }
}

/// Entry point for every inbound request.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (parts, body) = request.into_parts();

    // Buffered up front: retries against a second backend need the bytes
    // again after the first forward consumed them.
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(client = %client, error = %e, "failed to buffer request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    dispatch(
        &state.pool,
        state.forwarder.as_ref(),
        &state.dispatch,
        client,
        &parts,
        body,
    )
    .await
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
