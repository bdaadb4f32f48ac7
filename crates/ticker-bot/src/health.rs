//! Liveness endpoint for hosted deployments

use crate::error::{Result, TickerError};
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use ticker_utils::Config;
use tokio::net::TcpListener;
use tracing::info;

/// Body of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub environment: String,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Routes: `GET /` plain text, `GET /health` JSON
pub fn router(identity: Config) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(Arc::new(identity))
}

async fn root(State(identity): State<Arc<Config>>) -> String {
    format!("{} running", identity.app_name)
}

async fn health(State(identity): State<Arc<Config>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: identity.app_name.clone(),
        environment: identity.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
    })
}

/// Bind the health listener.
///
/// Done before the ticker starts so a taken port fails startup instead of
/// leaving the process without a liveness surface.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|e| {
        TickerError::ConfigError(format!("Failed to bind health endpoint on {addr}: {e}"))
    })
}

/// Serve on a bound listener until the task is dropped
pub async fn serve_on(listener: TcpListener, identity: Config) -> Result<()> {
    info!("Health endpoint listening on {}", listener.local_addr()?);
    axum::serve(listener, router(identity)).await?;
    Ok(())
}
