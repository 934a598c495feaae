//! # Domain Types
//!
//! Request and response DTOs for the billing API.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │     Product     │   │  InvoiceHeader  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  customer_id    │   │  product_id     │   │  invoice_id     │       │
//! │  │  customer_name  │   │  barcode        │   │  voucher_series │       │
//! │  │  mobile_no      │   │  unit_price     │   │  voucher_no     │       │
//! │  └─────────────────┘   └─────────────────┘   └────────┬────────┘       │
//! │                                                       │ 1:N            │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌────────┴────────┐       │
//! │  │   Executive     │   │ AdjustmentAcct  │   │ InvoiceItem     │       │
//! │  │  username       │   │  account_id     │   │ InvoiceAdjust.  │       │
//! │  │  short_name     │   │  account_name   │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All types serialize with camelCase keys. Database rows use PascalCase
//! column names and are converted in billing-db.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::voucher::{ScreenType, VoucherSeries};

// =============================================================================
// Customers
// =============================================================================

/// A billing customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub customer_id: i32,
    pub customer_name: String,
    pub mobile_no: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub gst_no: Option<String>,
    pub is_active: bool,
}

/// Body of `POST /api/customers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub mobile_no: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub gst_no: Option<String>,
}

// =============================================================================
// Products
// =============================================================================

/// A sale or rental product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: i32,
    pub product_name: String,
    pub barcode: Option<String>,
    pub category: Option<String>,
    pub unit_price: f64,
    pub rental_rate: Option<f64>,
    pub gst_percent: f64,
    pub stock_qty: i32,
    pub is_active: bool,
}

// =============================================================================
// Invoices
// =============================================================================

/// Invoice header as listed and fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceHeader {
    pub invoice_id: i32,
    pub voucher_series: String,
    #[ts(type = "number")]
    pub voucher_no: i64,
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    pub screen_type: String,
    pub customer_id: Option<i32>,
    pub customer_name: Option<String>,
    pub executive_username: Option<String>,
    pub branch_name: Option<String>,
    pub payment_mode: Option<String>,
    pub gross_amount: f64,
    pub gst_amount: f64,
    pub discount_amount: f64,
    pub net_amount: f64,
    pub remarks: Option<String>,
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub item_id: i32,
    pub product_id: i32,
    pub product_name: Option<String>,
    pub quantity: f64,
    pub rate: f64,
    pub gst_percent: f64,
    pub amount: f64,
    pub rental_days: Option<i32>,
}

/// One adjustment posted against an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceAdjustment {
    pub adjustment_id: i32,
    pub account_id: i32,
    pub account_name: Option<String>,
    pub amount: f64,
    pub remarks: Option<String>,
}

/// Header with its items and adjustments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    pub invoice: InvoiceHeader,
    pub items: Vec<InvoiceItem>,
    pub adjustments: Vec<InvoiceAdjustment>,
}

/// Line item in `POST /api/invoices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoiceItem {
    pub product_id: i32,
    pub quantity: f64,
    pub rate: f64,
    #[serde(default)]
    pub gst_percent: f64,
    pub amount: f64,
    #[serde(default)]
    pub rental_days: Option<i32>,
}

/// Adjustment in `POST /api/invoices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoiceAdjustment {
    pub account_id: i32,
    pub amount: f64,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Body of `POST /api/invoices`.
///
/// The header, every item and every adjustment are written in one
/// transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    #[serde(default)]
    pub voucher_series: String,
    #[serde(default)]
    pub screen_type: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub customer_id: Option<i32>,
    #[serde(default)]
    pub executive_username: String,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub payment_mode: Option<String>,
    #[serde(default)]
    pub gross_amount: f64,
    #[serde(default)]
    pub gst_amount: f64,
    #[serde(default)]
    pub discount_amount: f64,
    #[serde(default)]
    pub net_amount: f64,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub items: Vec<NewInvoiceItem>,
    #[serde(default)]
    pub adjustments: Vec<NewInvoiceAdjustment>,
}

/// Result of a committed invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceCreated {
    pub invoice_id: i32,
    pub voucher_series: String,
    #[ts(type = "number")]
    pub voucher_number: i64,
}

// =============================================================================
// Executives
// =============================================================================

/// An employee who raises invoices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Executive {
    pub employee_id: i32,
    pub username: String,
    pub employee_name: String,
    pub short_name: Option<String>,
    pub branch_name: Option<String>,
    pub designation: Option<String>,
    pub is_active: bool,
}

/// Pre-selected transaction fields for a billing screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDefaults {
    pub transaction_type: String,
    pub payment_mode: String,
}

/// Pre-filled invoice header fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HeaderDefaults {
    #[ts(as = "String")]
    pub invoice_date: NaiveDate,
    pub financial_year: String,
    pub branch_name: Option<String>,
    pub branch_short_name: String,
    pub executive_name: String,
}

/// Response of `GET /api/executives/{username}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveDefaults {
    pub executive: Executive,
    pub screen_type: ScreenType,
    pub transaction: TransactionDefaults,
    pub voucher: VoucherSeries,
    pub header: HeaderDefaults,
}

/// Who logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Employee,
    Supervisor,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Supervisor => "supervisor",
        }
    }
}

/// Body of the login endpoints.
#[derive(Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Profile returned by a successful credential check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AuthProfile {
    pub user_id: i32,
    pub username: String,
    pub display_name: String,
    pub branch_name: Option<String>,
    pub role: Role,
    pub permissions: Vec<String>,
}

/// Screen routes granted to an executive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ScreenPermissions {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub screens: Vec<String>,
}

// =============================================================================
// Adjustments & Transactions
// =============================================================================

/// Ledger account an invoice adjustment can be posted to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentAccount {
    pub account_id: i32,
    pub account_name: String,
    pub account_type: Option<String>,
    pub is_active: bool,
}

/// Response of `GET /api/transactions/generate-voucher`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedVoucher {
    pub series: String,
    #[ts(type = "number")]
    pub voucher_number: i64,
}
