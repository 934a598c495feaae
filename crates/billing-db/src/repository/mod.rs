//! # Repository Module
//!
//! One repository per business area. Each holds a clone of the shared
//! [`ResilientExecutor`](crate::executor::ResilientExecutor) and a set of
//! fixed [`Statement`](crate::params::Statement)s.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  axum handler                                                          │
//! │       │                                                                 │
//! │       │  db.customers().search("ravi")                                 │
//! │       ▼                                                                 │
//! │  CustomerRepository                                                    │
//! │  ├── const SEARCH: Statement  (text + parameter schema)                │
//! │  ├── bind Params  ──► ExecRequest                                      │
//! │  └── executor.run ──► Vec<Record> ──► CustomerRow ──► Customer         │
//! │                          (PascalCase)                 (camelCase)       │
//! │                                                                         │
//! │  SQL text and column names live only in this module tree.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`] - Customer list, search, lookup, create
//! - [`product::ProductRepository`] - Product list and lookups
//! - [`invoice::InvoiceRepository`] - Recent invoices, detail, atomic create
//! - [`executive::ExecutiveRepository`] - Defaults, logins, screen routes
//! - [`adjustment::AdjustmentRepository`] - Adjustment accounts
//! - [`transaction::TransactionRepository`] - Voucher number generation

pub mod adjustment;
pub mod customer;
pub mod executive;
pub mod invoice;
pub mod product;
pub mod transaction;

/// Escapes `%`, `_`, `[` and `\` so user input matches literally inside a
/// `LIKE ... ESCAPE '\'` pattern, and wraps it for substring matching.
pub(crate) fn contains_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '[' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("ravi"), "%ravi%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a_b[c]\\"), "%a\\_b\\[c]\\\\%");
    }
}
