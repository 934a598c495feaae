//! # Executive Repository
//!
//! Executives (employees) raise invoices from the billing screens. This
//! repository loads an executive's screen defaults, checks employee and
//! supervisor credentials through stored procedures, and reads or replaces
//! the screen routes an executive may open.
//!
//! ## Screen Defaults
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  load_defaults("jd", RentalMonthlyBill, 2025-06-01)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Employees row ──► ShortName "JD", BranchName "Namakkal"                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  branch_short_name("Namakkal") = "NAM"   (unknown branch → "", warn)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  derive_series ──► "RMB-25NAM-JD"                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  MAX(VoucherNo) for the series ──► preview = last + 1 (not stored)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use billing_core::branch::branch_short_name;
use billing_core::lookups::DEFAULT_PAYMENT_MODE;
use billing_core::permissions::{join_routes, split_routes};
use billing_core::voucher::{financial_year_label, VoucherContext};
use billing_core::{
    AuthProfile, Executive, ExecutiveDefaults, HeaderDefaults, LoginRequest, Role,
    ScreenPermissions, ScreenType, TransactionDefaults, VoucherSeries,
};

use crate::error::{DbError, DbResult};
use crate::executor::ResilientExecutor;
use crate::params::{ParamSpec, Params, SqlType, Statement};
use crate::repository::transaction::last_voucher_number;

// =============================================================================
// Statements
// =============================================================================

const BY_USERNAME: Statement = Statement::query(
    "SELECT EmployeeId, Username, EmployeeName, ShortName, BranchName,
            Designation, IsActive
     FROM Employees
     WHERE Username = @Username",
    &[ParamSpec::required("Username", SqlType::NVarChar)],
);

const EMPLOYEE_LOGIN: Statement = Statement::procedure(
    "dbo.usp_ValidateEmployeeLogin",
    &[
        ParamSpec::required("Username", SqlType::NVarChar),
        ParamSpec::required("Password", SqlType::NVarChar),
    ],
);

const SUPERVISOR_LOGIN: Statement = Statement::procedure(
    "dbo.usp_ValidateSupervisorLogin",
    &[
        ParamSpec::required("Username", SqlType::NVarChar),
        ParamSpec::required("Password", SqlType::NVarChar),
    ],
);

const SCREENS_BY_USERNAME: Statement = Statement::query(
    "SELECT Username, ScreenRoutes
     FROM Employees
     WHERE Username = @Username",
    &[ParamSpec::required("Username", SqlType::NVarChar)],
);

const UPDATE_SCREENS: Statement = Statement::query(
    "UPDATE Employees
     SET ScreenRoutes = @ScreenRoutes
     OUTPUT INSERTED.Username, INSERTED.ScreenRoutes
     WHERE Username = @Username",
    &[
        ParamSpec::required("Username", SqlType::NVarChar),
        ParamSpec::required("ScreenRoutes", SqlType::NVarChar),
    ],
);

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EmployeeRow {
    employee_id: i32,
    username: String,
    employee_name: String,
    short_name: Option<String>,
    branch_name: Option<String>,
    designation: Option<String>,
    #[serde(default)]
    is_active: Option<bool>,
}

impl From<EmployeeRow> for Executive {
    fn from(row: EmployeeRow) -> Self {
        Executive {
            employee_id: row.employee_id,
            username: row.username,
            employee_name: row.employee_name,
            short_name: row.short_name,
            branch_name: row.branch_name,
            designation: row.designation,
            is_active: row.is_active.unwrap_or(true),
        }
    }
}

/// Row returned by both login procedures.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LoginRow {
    user_id: i32,
    username: String,
    display_name: Option<String>,
    branch_name: Option<String>,
    #[serde(default)]
    screen_routes: Option<String>,
}

impl LoginRow {
    fn into_profile(self, role: Role) -> AuthProfile {
        AuthProfile {
            user_id: self.user_id,
            display_name: self.display_name.unwrap_or_else(|| self.username.clone()),
            username: self.username,
            branch_name: self.branch_name,
            role,
            permissions: split_routes(self.screen_routes.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ScreensRow {
    username: String,
    screen_routes: Option<String>,
}

impl From<ScreensRow> for ScreenPermissions {
    fn from(row: ScreensRow) -> Self {
        ScreenPermissions {
            screens: split_routes(row.screen_routes.as_deref()),
            username: row.username,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for executive profiles, logins and screen routes.
#[derive(Debug, Clone)]
pub struct ExecutiveRepository {
    executor: ResilientExecutor,
}

impl ExecutiveRepository {
    pub fn new(executor: ResilientExecutor) -> Self {
        ExecutiveRepository { executor }
    }

    /// Gets an executive by username.
    ///
    /// ## Errors
    /// `DbError::NotFound` when no employee has the username.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Executive> {
        let row: Option<EmployeeRow> = self
            .executor
            .fetch_optional(&BY_USERNAME, Params::new().set("Username", username))
            .await?;
        row.map(Executive::from)
            .ok_or_else(|| DbError::not_found("Executive", username))
    }

    /// Profile plus the transaction, voucher and header defaults a billing
    /// screen opens with.
    ///
    /// ## Arguments
    /// * `username` - Executive to load
    /// * `screen` - Billing screen being opened
    /// * `today` - Invoice date and the year the series is derived from
    ///
    /// ## Errors
    /// `DbError::NotFound` when the executive doesn't exist.
    pub async fn load_defaults(
        &self,
        username: &str,
        screen: ScreenType,
        today: NaiveDate,
    ) -> DbResult<ExecutiveDefaults> {
        let executive = self.get_by_username(username).await?;

        let branch_name = executive.branch_name.as_deref().unwrap_or("");
        let branch_short = branch_short_name(branch_name);
        if branch_short.is_empty() {
            warn!(
                username = %executive.username,
                branch = %branch_name,
                "Unknown branch, voucher series carries no branch code"
            );
        }

        let series = VoucherContext {
            screen,
            branch_short_name: branch_short,
            employee_short_name: executive.short_name.as_deref().unwrap_or(""),
            date: today,
        }
        .series();
        let last = last_voucher_number(&self.executor, &series).await?;
        let voucher = VoucherSeries::preview(series, last);

        debug!(
            username = %executive.username,
            screen = %screen,
            series = %voucher.series,
            preview_number = voucher.preview_number,
            "Loaded executive defaults"
        );

        Ok(ExecutiveDefaults {
            screen_type: screen,
            transaction: TransactionDefaults {
                transaction_type: screen.transaction_type().to_string(),
                payment_mode: DEFAULT_PAYMENT_MODE.to_string(),
            },
            voucher,
            header: HeaderDefaults {
                invoice_date: today,
                financial_year: financial_year_label(today),
                branch_name: executive.branch_name.clone(),
                branch_short_name: branch_short.to_string(),
                executive_name: executive.employee_name.clone(),
            },
            executive,
        })
    }

    /// Checks credentials through the role's login procedure.
    ///
    /// ## Returns
    /// * `Ok(Some(profile))` - Credentials accepted
    /// * `Ok(None)` - The procedure returned no row
    pub async fn authenticate(
        &self,
        role: Role,
        login: &LoginRequest,
    ) -> DbResult<Option<AuthProfile>> {
        let statement = match role {
            Role::Employee => &EMPLOYEE_LOGIN,
            Role::Supervisor => &SUPERVISOR_LOGIN,
        };
        let params = Params::new()
            .set("Username", login.username.trim())
            .set("Password", &login.password);

        let row: Option<LoginRow> = self.executor.fetch_optional(statement, params).await?;
        match row {
            Some(row) => {
                info!(username = %row.username, role = role.as_str(), "Login accepted");
                Ok(Some(row.into_profile(role)))
            }
            None => {
                warn!(username = %login.username.trim(), role = role.as_str(), "Login rejected");
                Ok(None)
            }
        }
    }

    /// Screen routes granted to an executive.
    ///
    /// ## Errors
    /// `DbError::NotFound` when the executive doesn't exist.
    pub async fn get_screens(&self, username: &str) -> DbResult<ScreenPermissions> {
        let row: Option<ScreensRow> = self
            .executor
            .fetch_optional(&SCREENS_BY_USERNAME, Params::new().set("Username", username))
            .await?;
        row.map(ScreenPermissions::from)
            .ok_or_else(|| DbError::not_found("Executive", username))
    }

    /// Replaces an executive's screen routes and returns what was stored.
    ///
    /// ## Errors
    /// `DbError::NotFound` when the UPDATE matched no employee.
    pub async fn set_screens(&self, update: &ScreenPermissions) -> DbResult<ScreenPermissions> {
        let username = update.username.trim();
        let params = Params::new()
            .set("Username", username)
            .set("ScreenRoutes", join_routes(&update.screens));

        let row: Option<ScreensRow> = self.executor.fetch_optional(&UPDATE_SCREENS, params).await?;
        let stored = row
            .map(ScreenPermissions::from)
            .ok_or_else(|| DbError::not_found("Executive", username))?;

        info!(username = %stored.username, screens = stored.screens.len(), "Screen routes updated");
        Ok(stored)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
