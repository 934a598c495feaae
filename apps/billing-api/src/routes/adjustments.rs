//! Adjustment account endpoints.

use axum::extract::State;
use axum::{routing::get, Router};

use billing_core::AdjustmentAccount;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::server::AppState;

/// GET /api/adjustments
async fn list_accounts(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<AdjustmentAccount>>, ApiError> {
    let accounts = state.db.adjustments().list_accounts().await?;
    Ok(ApiResponse::list(accounts))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/adjustments", get(list_accounts))
}
