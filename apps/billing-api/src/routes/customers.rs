//! Customer endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use billing_core::validation::{parse_id, validate_new_customer, validate_search_query};
use billing_core::{Customer, NewCustomer};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::server::AppState;

/// `?query=` for the search endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
}

/// GET /api/customers
async fn list_customers(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<Customer>>, ApiError> {
    let customers = state.db.customers().list_active().await?;
    Ok(ApiResponse::list(customers))
}

/// GET /api/customers/search?query=
async fn search_customers(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<ApiResponse<Vec<Customer>>, ApiError> {
    let Query(params) = params?;
    let query = validate_search_query(params.query.as_deref().unwrap_or(""))?;
    let customers = state.db.customers().search(&query).await?;
    Ok(ApiResponse::list(customers))
}

/// GET /api/customers/{id}
async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<Customer>, ApiError> {
    let id = parse_id("id", &id)?;
    let customer = state.db.customers().get_by_id(id).await?;
    Ok(ApiResponse::ok(customer))
}

/// POST /api/customers
async fn create_customer(
    State(state): State<AppState>,
    body: Result<Json<NewCustomer>, JsonRejection>,
) -> Result<ApiResponse<Customer>, ApiError> {
    let Json(body) = body?;
    let customer = validate_new_customer(&body)?;
    let created = state.db.customers().create(&customer).await?;
    Ok(ApiResponse::created(created).message("Customer created"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/customers", get(list_customers).post(create_customer))
        .route("/api/customers/search", get(search_customers))
        .route("/api/customers/{id}", get(get_customer))
}
