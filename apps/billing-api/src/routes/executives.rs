//! Executive endpoints: screen defaults, credential checks and screen
//! route permissions.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use serde::Deserialize;

use billing_core::validation::{require, validate_screen_permissions};
use billing_core::{AuthProfile, ExecutiveDefaults, LoginRequest, Role, ScreenPermissions, ScreenType};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::server::AppState;

/// `?screen=` for the defaults endpoint. Unknown or missing screens fall
/// back to the employee sale invoice.
#[derive(Debug, Default, Deserialize)]
pub struct ScreenParams {
    #[serde(default)]
    pub screen: Option<String>,
}

/// GET /api/executives/{username}?screen=
async fn get_defaults(
    State(state): State<AppState>,
    Path(username): Path<String>,
    params: Result<Query<ScreenParams>, QueryRejection>,
) -> Result<ApiResponse<ExecutiveDefaults>, ApiError> {
    let Query(params) = params?;
    let username = require("username", &username)?;
    let screen = ScreenType::parse(params.screen.as_deref());

    let today = Local::now().date_naive();
    let defaults = state
        .db
        .executives()
        .load_defaults(&username, screen, today)
        .await?;
    Ok(ApiResponse::ok(defaults))
}

async fn login(
    state: &AppState,
    role: Role,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<AuthProfile>, ApiError> {
    let Json(login) = body?;
    require("username", &login.username)?;
    if login.password.is_empty() {
        return Err(billing_core::ValidationError::required("password").into());
    }

    match state.db.executives().authenticate(role, &login).await? {
        Some(profile) => Ok(ApiResponse::ok(profile).message("Login successful")),
        None => Err(ApiError::unauthorized("Invalid username or password")),
    }
}

/// POST /api/executives/auth/employee
async fn employee_login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<AuthProfile>, ApiError> {
    login(&state, Role::Employee, body).await
}

/// POST /api/executives/auth/supervisor
async fn supervisor_login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<AuthProfile>, ApiError> {
    login(&state, Role::Supervisor, body).await
}

/// GET /api/executives/screens/{username}
async fn get_screens(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<ApiResponse<ScreenPermissions>, ApiError> {
    let username = require("username", &username)?;
    let screens = state.db.executives().get_screens(&username).await?;
    Ok(ApiResponse::ok(screens))
}

/// POST /api/executives/screens
async fn set_screens(
    State(state): State<AppState>,
    body: Result<Json<ScreenPermissions>, JsonRejection>,
) -> Result<ApiResponse<ScreenPermissions>, ApiError> {
    let Json(update) = body?;
    validate_screen_permissions(&update)?;
    let stored = state.db.executives().set_screens(&update).await?;
    Ok(ApiResponse::ok(stored).message("Screen permissions updated"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/executives/{username}", get(get_defaults))
        .route("/api/executives/auth/employee", post(employee_login))
        .route("/api/executives/auth/supervisor", post(supervisor_login))
        .route("/api/executives/screens", post(set_screens))
        .route("/api/executives/screens/{username}", get(get_screens))
}
