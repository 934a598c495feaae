//! # HTTP Server
//!
//! Router assembly, middleware and graceful shutdown.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request                                                                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  CorsLayer        (CORS_ORIGINS, permissive when empty)                 │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  TraceLayer       (one span per request)                                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  render_detail    (adds `detail` to error envelopes outside production) │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  CatchPanicLayer  (panic ──► 500 INTERNAL_ERROR envelope)               │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  routes::router() ──► fallback: 404 / 405 envelope                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On Ctrl+C or SIGTERM the server stops accepting connections, drains
//! in-flight requests, then closes the database pool.

use std::any::Any;

use axum::http::{HeaderValue, Method, Uri};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use billing_db::Database;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::{ApiConfig, ConfigError};
use crate::error::{render_detail, ApiError, ErrorCode};
use crate::routes;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    /// Include underlying error text in error envelopes.
    pub expose_detail: bool,
}

impl AppState {
    /// State with error detail hidden.
    pub fn new(db: Database) -> Self {
        AppState {
            db,
            expose_detail: false,
        }
    }

    pub fn expose_detail(mut self, expose: bool) -> Self {
        self.expose_detail = expose;
        self
    }
}

/// Builds the CORS layer from the configured origins.
pub fn cors_layer(config: &ApiConfig) -> Result<CorsLayer, ConfigError> {
    if config.cors_origins.is_empty() {
        warn!("CORS: no CORS_ORIGINS configured, all origins allowed");
        return Ok(CorsLayer::permissive());
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| ConfigError::InvalidOrigin(origin.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(cors::Any))
}

/// Full application router.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    routes::router()
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::map_response_with_state(
            state.expose_detail,
            render_detail,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::new(ErrorCode::NotFound, format!("Route not found: {}", uri.path()))
}

async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::new(
        ErrorCode::MethodNotAllowed,
        format!("Method {method} not allowed on {}", uri.path()),
    )
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "Handler panicked");
    ApiError::internal("Internal server error")
        .with_detail(detail)
        .into_response()
}

/// Runs the server until a shutdown signal, then closes the pool.
pub async fn run(config: ApiConfig, db: Database) -> Result<(), ServerError> {
    let cors = cors_layer(&config)?;
    let state = AppState::new(db.clone()).expose_detail(!config.is_production());
    let app = build_router(state, cors);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), env = ?config.environment, "Billing API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
