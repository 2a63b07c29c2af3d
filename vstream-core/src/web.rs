//! HTTP metrics endpoint.
//!
//! A single `GET /metrics` route returning the current
//! [`MetricsSnapshot`] as JSON. CORS is wide open so a browser
//! dashboard served from anywhere can poll it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use axum::{Json, Router, extract::State, routing::get};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::StreamError;
use crate::metrics::{Metrics, MetricsSnapshot};

pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .layer(CorsLayer::permissive())
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Json<MetricsSnapshot> {
    Json(metrics.snapshot())
}

/// Bind `addr` and serve until the stop flag clears.
pub async fn serve(
    addr: SocketAddr,
    metrics: Arc<Metrics>,
    running: Arc<AtomicBool>,
) -> Result<(), StreamError> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_listener(listener, metrics, running).await
}

/// Serve on an already-bound listener (lets callers bind port 0).
pub async fn serve_listener(
    listener: tokio::net::TcpListener,
    metrics: Arc<Metrics>,
    running: Arc<AtomicBool>,
) -> Result<(), StreamError> {
    info!(addr = %listener.local_addr()?, "metrics endpoint up");
    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(async move { crate::pump::wait_for_stop(&running).await })
        .await?;
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────
