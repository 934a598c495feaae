//! # API Error Type
//!
//! Unified error type for route handlers.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Billing API                        │
//! │                                                                         │
//! │  Handler: Result<ApiResponse<T>, ApiError>                             │
//! │         │                                                               │
//! │         ├── ValidationError ──────────────► 400 VALIDATION_ERROR        │
//! │         ├── DbError::NotFound ────────────► 404 NOT_FOUND               │
//! │         ├── credentials rejected ─────────► 401 UNAUTHORIZED            │
//! │         ├── DbError::Connection/Execution ► 500 DATABASE_ERROR          │
//! │         └── anything else ────────────────► 500 INTERNAL_ERROR          │
//! │                                                                         │
//! │  Body:                                                                  │
//! │  { "success": false, "error": "NOT_FOUND",                              │
//! │    "message": "Customer not found: 41", "detail": "..." }               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers never see the environment: an error response is always rendered
//! without `detail` and carries its [`ApiError`] in the response extensions.
//! [`render_detail`], layered by the router outside production, re-renders
//! the body with `detail` from that copy.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use billing_core::ValidationError;
use billing_db::DbError;

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input validation failed (400)
    ValidationError,

    /// Credentials rejected (401)
    Unauthorized,

    /// Resource or route not found (404)
    NotFound,

    /// Method not supported on a known route (405)
    MethodNotAllowed,

    /// Database operation failed (500)
    DatabaseError,

    /// Internal server error (500)
    InternalError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// API error returned from handlers.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable message, safe to show
    pub message: String,

    /// Underlying error text
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{resource} not found: {id}"))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::InternalError, message)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    /// Envelope body.
    pub fn body(&self, expose_detail: bool) -> Value {
        let mut body = json!({
            "success": false,
            "error": self.code,
            "message": self.message,
        });
        if let (true, Some(detail)) = (expose_detail, &self.detail) {
            body["detail"] = Value::String(detail.clone());
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body(false))).into_response();
        if self.detail.is_some() {
            response.extensions_mut().insert(self);
        }
        response
    }
}

/// Response mapper adding `detail` back to error envelopes when
/// `expose_detail` is set.
pub async fn render_detail(State(expose_detail): State<bool>, mut response: Response) -> Response {
    if !expose_detail {
        return response;
    }
    match response.extensions_mut().remove::<ApiError>() {
        Some(err) => (err.status(), Json(err.body(true))).into_response(),
        None => response,
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::Connection(ref failure) => {
                tracing::error!(kind = %failure.kind, code = ?failure.code, error = %err, "Database unavailable");
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
                    .with_detail(err.to_string())
            }
            DbError::Execution(ref failure) => {
                tracing::error!(kind = %failure.kind, code = ?failure.code, error = %err, "Database operation failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
                    .with_detail(err.to_string())
            }
            DbError::InvalidParameters(_) | DbError::Configuration(_) => {
                tracing::error!(error = %err, "Internal database error");
                ApiError::internal("Internal server error").with_detail(err.to_string())
            }
        }
    }
}

/// Converts validation errors to API errors.
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Malformed or mistyped JSON bodies.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation("Invalid request body").with_detail(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation("Invalid query string").with_detail(rejection.body_text())
    }
}
