//! # billing-db: Database Layer for the Rental Billing Backend
//!
//! Every statement the service sends to SQL Server goes through this crate.
//! It owns the process-wide connection pool, retries transient failures and
//! exposes one repository per business area.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Rental Billing Data Flow                           │
//! │                                                                         │
//! │  axum handler (GET /api/customers/{id})                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   billing-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌───────────────────┐   ┌──────────────┐  │   │
//! │  │   │ Repositories │──►│ ResilientExecutor │──►│ PoolManager  │  │   │
//! │  │   │ customer.rs  │   │  bind, run, retry │   │ lazy, check, │  │   │
//! │  │   │ invoice.rs   │   │  invalidate, wait │   │ replace      │  │   │
//! │  │   │ ...          │   └───────────────────┘   └──────┬───────┘  │   │
//! │  │   └──────────────┘                                  │          │   │
//! │  │                                    ┌────────────────▼───────┐  │   │
//! │  │                                    │ Connector (trait)      │  │   │
//! │  │                                    │  MssqlConnector (bb8)  │  │   │
//! │  │                                    │  ScriptedConnector     │  │   │
//! │  │                                    └────────────────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                SQL Server (tables + stored procedures)          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Pool lifecycle and the backend traits
//! - [`executor`] - Retry policy, resilient execution, transactions
//! - [`params`] - Statement schemas and typed parameters
//! - [`record`] - Result rows and decoding
//! - [`mssql`] - SQL Server backend (tiberius + bb8)
//! - [`config`] - Connection settings
//! - [`error`] - Error classification
//! - [`repository`] - Customer, product, invoice, executive, adjustment and
//!   transaction repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use billing_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()?);
//! let customers = db.customers().list_active().await?;
//! db.close().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod database;
pub mod error;
pub mod executor;
pub mod mssql;
pub mod params;
pub mod pool;
pub mod record;
pub mod repository;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::DbConfig;
pub use database::Database;
pub use error::{DbError, DbResult, ErrorKind, SqlFailure};
pub use executor::{ResilientExecutor, RetryPolicy, TxContext};
pub use params::{ExecRequest, ParamSpec, Params, SqlType, SqlValue, Statement};
pub use pool::{Connector, PoolHandle, PoolManager, Transaction};
pub use record::Record;

// Repository re-exports for convenience
pub use repository::adjustment::AdjustmentRepository;
pub use repository::customer::CustomerRepository;
pub use repository::executive::ExecutiveRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::product::ProductRepository;
pub use repository::transaction::TransactionRepository;
