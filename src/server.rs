//! Health and metrics endpoints (/health, /metrics).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{any, get};
use prometheus_client::encoding::text::encode;
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;
use tracing::info;

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Encodes the registry as OpenMetrics text.
async fn metrics_handler(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
    let mut buf = String::new();
    if encode(&mut buf, &registry).is_err() {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode metrics".to_string(),
        );
    }
    (StatusCode::OK, buf)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/health", any(health))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found)
        .with_state(registry)
}

/// Bind the listener up front so address errors surface at startup.
pub async fn bind(addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!(listen = %addr, "HTTP server listening");
    Ok(listener)
}

pub async fn serve(listener: TcpListener, registry: Arc<Registry>) -> anyhow::Result<()> {
    axum::serve(listener, router(registry)).await?;
    Ok(())
}
