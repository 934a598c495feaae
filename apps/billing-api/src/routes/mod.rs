//! # Routes
//!
//! One module per business area. Each exposes `router()` with its full
//! paths; [`router`] merges them.
//!
//! | Module | Paths |
//! |---|---|
//! | [`health`] | `/health` |
//! | [`customers`] | `/api/customers/...` |
//! | [`products`] | `/api/products/...` |
//! | [`invoices`] | `/api/invoices/...` |
//! | [`executives`] | `/api/executives/...` |
//! | [`adjustments`] | `/api/adjustments` |
//! | [`transactions`] | `/api/transactions/...` |

use axum::Router;

use crate::server::AppState;

pub mod adjustments;
pub mod customers;
pub mod executives;
pub mod health;
pub mod invoices;
pub mod products;
pub mod transactions;

/// All API routes, without middleware or fallbacks.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(customers::router())
        .merge(products::router())
        .merge(invoices::router())
        .merge(executives::router())
        .merge(adjustments::router())
        .merge(transactions::router())
}
