//! Invoice endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Local;

use billing_core::validation::{parse_id, validate_new_invoice};
use billing_core::{InvoiceCreated, InvoiceDetail, InvoiceHeader, NewInvoice};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::server::AppState;

/// GET /api/invoices
async fn list_recent(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<InvoiceHeader>>, ApiError> {
    let invoices = state.db.invoices().list_recent().await?;
    Ok(ApiResponse::list(invoices))
}

/// GET /api/invoices/{id}
async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<InvoiceDetail>, ApiError> {
    let id = parse_id("id", &id)?;
    let detail = state.db.invoices().get_detail(id).await?;
    Ok(ApiResponse::ok(detail))
}

/// POST /api/invoices
///
/// Header, items and adjustments are written atomically. Any failure rolls
/// the whole invoice back.
async fn create_invoice(
    State(state): State<AppState>,
    body: Result<Json<NewInvoice>, JsonRejection>,
) -> Result<ApiResponse<InvoiceCreated>, ApiError> {
    let Json(invoice) = body?;
    validate_new_invoice(&invoice)?;

    let today = Local::now().date_naive();
    let created = state.db.invoices().create(&invoice, today).await?;
    Ok(ApiResponse::created(created).message("Invoice created"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/invoices", get(list_recent).post(create_invoice))
        .route("/api/invoices/{id}", get(get_invoice))
}
