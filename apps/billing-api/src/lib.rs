//! # Billing API
//!
//! REST surface for the rental billing screens.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Billing API Routes                              │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  customers     │  │  products      │  │  invoices                  ││
//! │  │                │  │                │  │                            ││
//! │  │ • list/search  │  │ • list/by id   │  │ • recent / detail          ││
//! │  │ • by id        │  │ • barcode      │  │ • create (atomic)          ││
//! │  │ • create       │  │ • category     │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  executives    │  │  adjustments   │  │  transactions              ││
//! │  │                │  │                │  │                            ││
//! │  │ • defaults     │  │ • accounts     │  │ • dropdown options         ││
//! │  │ • login        │  │                │  │ • voucher preview          ││
//! │  │ • screens      │  │                │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  billing-db: PoolManager ──► ResilientExecutor ──► repositories  │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables:
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - HTTP port (default: 5000)
//! - `APP_ENV` - `production` hides error detail (default: development)
//! - `CORS_ORIGINS` - Comma separated allowed origins (default: any)
//! - `DB_SERVER`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`, ... - see
//!   [`billing_db::DbConfig`]

pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod server;

// Re-exports
pub use config::ApiConfig;
pub use error::ApiError;
pub use response::ApiResponse;
pub use server::{build_router, AppState};
