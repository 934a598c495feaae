//! # billing-core: Pure Business Logic for the Rental Billing Backend
//!
//! Everything in this crate is deterministic and free of I/O. The database
//! and HTTP layers call into it to derive voucher series, resolve branch
//! codes, validate request bodies and shape response DTOs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Rental Billing Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 POS Frontend (billing screens)                  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 billing-api (axum routes)                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ billing-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  voucher  │  │  branch   │  │   types   │  │ validation│  │   │
//! │  │   │  series   │  │  codes    │  │   DTOs    │  │   rules   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          billing-db (pool manager, executor, repositories)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`voucher`] - Screen types, voucher series derivation, preview numbers
//! - [`branch`] - Branch name to short code table
//! - [`permissions`] - Comma-joined screen route encoding
//! - [`lookups`] - Static dropdown option lists
//! - [`types`] - Request and response DTOs (exported to TypeScript)
//! - [`validation`] - Request validation rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use billing_core::voucher::{derive_series, ScreenType};
//! use billing_core::branch::branch_short_name;
//! use chrono::NaiveDate;
//!
//! let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
//! let screen = ScreenType::parse(Some("RentalMonthlyBill"));
//! let series = derive_series(screen, branch_short_name("Namakkal"), "JD", date);
//!
//! assert_eq!(series, "RMB-25NAM-JD");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod branch;
pub mod error;
pub mod lookups;
pub mod permissions;
pub mod types;
pub mod validation;
pub mod voucher;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use types::*;
pub use voucher::{ScreenType, VoucherSeries};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of rows returned by the recent invoice listing.
pub const RECENT_INVOICE_LIMIT: i32 = 100;

/// Maximum line items accepted on a single invoice.
///
/// ## Business Reason
/// Guards the single-transaction insert path against runaway payloads.
pub const MAX_INVOICE_ITEMS: usize = 200;

/// Maximum screen routes stored for one executive.
pub const MAX_SCREEN_ROUTES: usize = 100;
