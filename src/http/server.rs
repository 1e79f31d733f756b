//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the faucet handlers
//! - Wire up middleware (tracing, request ID, timeout, body limit, metrics)
//! - Serve on a listener until shutdown is triggered

use std::net::SocketAddr;
use std::sync::Arc;

use alloy::primitives::U256;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::blockchain::SenderFactory;
use crate::clock::Clock;
use crate::config::ServerConfig;
use crate::http::handlers;
use crate::http::request::MakeRequestUuid;
use crate::ledger::Ledger;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::queue::SubmissionQueue;
use crate::security::RateLimiter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<dyn Ledger>,
    pub queue: Arc<SubmissionQueue>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Used for synchronous funding and balance lookups.
    pub senders: Arc<dyn SenderFactory>,
    pub clock: Arc<dyn Clock>,
    /// Transfer amount in wei, stored on records.
    pub amount_wei: U256,
    /// Transfer amount in ether, as shown to clients.
    pub amount_eth: String,
    /// Queue requests instead of sending inline.
    pub queue_enabled: bool,
}

/// HTTP server for the faucet API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, state: AppState) -> Self {
        Self {
            router: build_router(config, state),
        }
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(config: &ServerConfig, state: AppState) -> Router {
    Router::new()
        .route("/api/fund", post(handlers::fund))
        .route("/api/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
        .route_layer(middleware::from_fn(track_requests))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
}

async fn track_requests(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let response = next.run(request).await;
    metrics::record_http_request(route, response.status().as_u16());
    response
}
