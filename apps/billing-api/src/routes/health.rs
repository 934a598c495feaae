//! Health check endpoint.

use axum::extract::State;
use axum::{routing::get, Router};
use serde::Serialize;

use crate::response::ApiResponse;
use crate::server::AppState;

/// Health check payload.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

/// GET /health
///
/// Always 200; `status` reports whether the database answered.
async fn health(State(state): State<AppState>) -> ApiResponse<HealthStatus> {
    let connected = state.db.health_check().await;
    ApiResponse::ok(HealthStatus {
        status: if connected { "ok" } else { "degraded" },
        database: if connected { "connected" } else { "unreachable" },
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
