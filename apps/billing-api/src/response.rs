//! # Response Envelope
//!
//! Every successful response shares one shape:
//!
//! ```json
//! { "success": true, "data": [...], "count": 2 }
//! { "success": true, "data": {...}, "message": "Customer created" }
//! ```
//!
//! Failures use the same envelope with `success: false` (see
//! [`ApiError`](crate::error::ApiError)).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Success envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> ApiResponse<T> {
    /// 200 with a single payload.
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            message: None,
            count: None,
            status: StatusCode::OK,
        }
    }

    /// 201 with the created resource.
    pub fn created(data: T) -> Self {
        ApiResponse {
            status: StatusCode::CREATED,
            ..ApiResponse::ok(data)
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// 200 with a list and its length.
    pub fn list(items: Vec<T>) -> Self {
        let count = items.len();
        ApiResponse {
            count: Some(count),
            ..ApiResponse::ok(items)
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
