//! Product endpoints.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;

use billing_core::validation::{parse_id, require_max};
use billing_core::Product;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::server::AppState;

/// GET /api/products
async fn list_products(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<Product>>, ApiError> {
    let products = state.db.products().list_active().await?;
    Ok(ApiResponse::list(products))
}

/// GET /api/products/{id}
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Product>, ApiError> {
    let id = parse_id("id", &id)?;
    let product = state.db.products().get_by_id(id).await?;
    Ok(ApiResponse::ok(product))
}

/// GET /api/products/barcode/{barcode}
async fn get_by_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<ApiResponse<Product>, ApiError> {
    let barcode = require_max("barcode", &barcode, 50)?;
    let product = state.db.products().get_by_barcode(&barcode).await?;
    Ok(ApiResponse::ok(product))
}

/// GET /api/products/category/{category}
async fn list_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<ApiResponse<Vec<Product>>, ApiError> {
    let category = require_max("category", &category, 100)?;
    let products = state.db.products().list_by_category(&category).await?;
    Ok(ApiResponse::list(products))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product))
        .route("/api/products/barcode/{barcode}", get(get_by_barcode))
        .route("/api/products/category/{category}", get(list_by_category))
}
