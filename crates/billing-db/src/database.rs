//! # Database Facade
//!
//! The handle the HTTP layer holds. It wires a [`Connector`] into a
//! [`PoolManager`] and a [`ResilientExecutor`], and hands out repositories
//! that share them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Database (Clone, shared through axum State)                            │
//! │                                                                         │
//! │  db.customers()   ─┐                                                   │
//! │  db.products()     │                                                   │
//! │  db.invoices()     ├──► ResilientExecutor ──► Arc<PoolManager>          │
//! │  db.executives()   │         (clone)              (one per process)    │
//! │  db.adjustments()  │                                                   │
//! │  db.transactions() ┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing connects until the first repository call.

use std::sync::Arc;

use tracing::info;

use crate::config::DbConfig;
use crate::executor::{ResilientExecutor, RetryPolicy};
use crate::mssql::MssqlConnector;
use crate::pool::{Connector, PoolManager};
use crate::repository::adjustment::AdjustmentRepository;
use crate::repository::customer::CustomerRepository;
use crate::repository::executive::ExecutiveRepository;
use crate::repository::invoice::InvoiceRepository;
use crate::repository::product::ProductRepository;
use crate::repository::transaction::TransactionRepository;

/// Main database handle providing repository access.
///
/// ## Example
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_env()?);
/// let product = db.products().get_by_id(42).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    executor: ResilientExecutor,
}

impl Database {
    /// Creates a handle backed by SQL Server. Does not connect.
    pub fn new(config: DbConfig) -> Self {
        info!(
            db = %config.target(),
            max_connections = config.max_connections,
            max_retries = config.retry.max_retries,
            "Database configured"
        );
        let retry = config.retry;
        Self::with_connector(Arc::new(MssqlConnector::new(config)), retry)
    }

    /// Creates a handle over any backend.
    pub fn with_connector(connector: Arc<dyn Connector>, retry: RetryPolicy) -> Self {
        let pool = Arc::new(PoolManager::new(connector));
        Database {
            executor: ResilientExecutor::new(pool, retry),
        }
    }

    /// The executor shared by every repository.
    pub fn executor(&self) -> &ResilientExecutor {
        &self.executor
    }

    pub fn pool(&self) -> &Arc<PoolManager> {
        self.executor.pool()
    }

    pub fn customers(&self) -> CustomerRepository {
        CustomerRepository::new(self.executor.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.executor.clone())
    }

    pub fn invoices(&self) -> InvoiceRepository {
        InvoiceRepository::new(self.executor.clone())
    }

    pub fn executives(&self) -> ExecutiveRepository {
        ExecutiveRepository::new(self.executor.clone())
    }

    pub fn adjustments(&self) -> AdjustmentRepository {
        AdjustmentRepository::new(self.executor.clone())
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(self.executor.clone())
    }

    /// Checks that the database answers a round trip.
    ///
    /// ## Returns
    /// * `true` - Database is responsive
    /// * `false` - Connection failed or the check errored
    pub async fn health_check(&self) -> bool {
        self.pool().health_check().await
    }

    /// Closes the connection pool. Safe to call more than once; a later
    /// repository call reconnects.
    pub async fn close(&self) {
        self.pool().shutdown().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConnector;

    #[tokio::test]
    async fn test_repositories_share_one_pool() {
        let script = ScriptedConnector::new();
        let db = Database::with_connector(Arc::new(script.clone()), RetryPolicy::default());

        db.customers().list_active().await.unwrap();
        db.products().list_active().await.unwrap();
        db.adjustments().list_accounts().await.unwrap();

        assert_eq!(script.connects(), 1);
        assert!(db.pool().is_connected().await);
    }

    #[tokio::test]
    async fn test_health_check_and_close() {
        let script = ScriptedConnector::new();
        let db = Database::with_connector(Arc::new(script.clone()), RetryPolicy::default());

        assert!(db.health_check().await);
        db.close().await;
        db.close().await;
        assert_eq!(script.closes(), 1);
        assert!(!db.pool().is_connected().await);
    }
}
