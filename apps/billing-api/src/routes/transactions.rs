//! Transaction screen lookups.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use billing_core::lookups::{dropdown_options, DropdownOptions};
use billing_core::validation::require_max;
use billing_core::GeneratedVoucher;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::server::AppState;

/// Longest series the header procedure accepts.
const MAX_SERIES_LEN: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct VoucherParams {
    #[serde(default)]
    pub series: Option<String>,
}

/// GET /api/transactions/dropdown-options
async fn get_dropdown_options() -> ApiResponse<DropdownOptions> {
    ApiResponse::ok(dropdown_options())
}

/// GET /api/transactions/generate-voucher?series=
///
/// Preview only: the number is not reserved.
async fn generate_voucher(
    State(state): State<AppState>,
    params: Result<Query<VoucherParams>, QueryRejection>,
) -> Result<ApiResponse<GeneratedVoucher>, ApiError> {
    let Query(params) = params?;
    let series = require_max("series", params.series.as_deref().unwrap_or(""), MAX_SERIES_LEN)?;
    let voucher = state.db.transactions().next_voucher(&series).await?;
    Ok(ApiResponse::ok(voucher))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/transactions/dropdown-options", get(get_dropdown_options))
        .route("/api/transactions/generate-voucher", get(generate_voucher))
}
