//! # Customer Repository
//!
//! Database operations for billing customers.
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  search("98765")                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  pattern = %98765%   (%, _, [ and \ escaped)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CustomerName LIKE p  OR  MobileNo LIKE p  OR  CAST(CustomerId) LIKE p │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  active customers, ordered by name                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An empty query falls back to the full active list.

use serde::Deserialize;
use tracing::debug;

use billing_core::{Customer, NewCustomer};

use crate::error::{DbError, DbResult};
use crate::executor::ResilientExecutor;
use crate::params::{ParamSpec, Params, SqlType, Statement};
use crate::repository::contains_pattern;

const LIST_ACTIVE: Statement = Statement::query(
    "SELECT CustomerId, CustomerName, MobileNo, Address, City, GstNo, IsActive
     FROM Customers
     WHERE IsActive = 1
     ORDER BY CustomerName",
    &[],
);

const SEARCH: Statement = Statement::query(
    "SELECT CustomerId, CustomerName, MobileNo, Address, City, GstNo, IsActive
     FROM Customers
     WHERE IsActive = 1
       AND (CustomerName LIKE @Pattern ESCAPE '\\'
            OR MobileNo LIKE @Pattern ESCAPE '\\'
            OR CAST(CustomerId AS NVARCHAR(20)) LIKE @Pattern ESCAPE '\\')
     ORDER BY CustomerName",
    &[ParamSpec::required("Pattern", SqlType::NVarChar)],
);

const BY_ID: Statement = Statement::query(
    "SELECT CustomerId, CustomerName, MobileNo, Address, City, GstNo, IsActive
     FROM Customers
     WHERE CustomerId = @CustomerId",
    &[ParamSpec::required("CustomerId", SqlType::Int)],
);

const INSERT: Statement = Statement::query(
    "INSERT INTO Customers (CustomerName, MobileNo, Address, City, GstNo, IsActive)
     OUTPUT INSERTED.CustomerId, INSERTED.CustomerName, INSERTED.MobileNo,
            INSERTED.Address, INSERTED.City, INSERTED.GstNo, INSERTED.IsActive
     VALUES (@CustomerName, @MobileNo, @Address, @City, @GstNo, 1)",
    &[
        ParamSpec::required("CustomerName", SqlType::NVarChar),
        ParamSpec::nullable("MobileNo", SqlType::NVarChar),
        ParamSpec::nullable("Address", SqlType::NVarChar),
        ParamSpec::nullable("City", SqlType::NVarChar),
        ParamSpec::nullable("GstNo", SqlType::NVarChar),
    ],
);

/// Customer row as stored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CustomerRow {
    customer_id: i32,
    customer_name: String,
    mobile_no: Option<String>,
    address: Option<String>,
    city: Option<String>,
    gst_no: Option<String>,
    #[serde(default)]
    is_active: Option<bool>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            mobile_no: row.mobile_no,
            address: row.address,
            city: row.city,
            gst_no: row.gst_no,
            is_active: row.is_active.unwrap_or(true),
        }
    }
}

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    executor: ResilientExecutor,
}

impl CustomerRepository {
    pub fn new(executor: ResilientExecutor) -> Self {
        CustomerRepository { executor }
    }

    /// Lists active customers ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<Customer>> {
        let rows: Vec<CustomerRow> = self.executor.fetch_all(&LIST_ACTIVE, Params::new()).await?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    /// Substring match on name, mobile number and id.
    ///
    /// ## Arguments
    /// * `query` - Already validated search text; blank returns every active
    ///   customer
    pub async fn search(&self, query: &str) -> DbResult<Vec<Customer>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_active().await;
        }

        debug!(query = %query, "Searching customers");
        let rows: Vec<CustomerRow> = self
            .executor
            .fetch_all(&SEARCH, Params::new().set("Pattern", contains_pattern(query)))
            .await?;

        debug!(count = rows.len(), "Customer search returned rows");
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    /// Gets a customer by id.
    ///
    /// ## Errors
    /// `DbError::NotFound` when no row matches.
    pub async fn get_by_id(&self, id: i32) -> DbResult<Customer> {
        let row: Option<CustomerRow> = self
            .executor
            .fetch_optional(&BY_ID, Params::new().set("CustomerId", id))
            .await?;
        row.map(Customer::from)
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Inserts a customer and returns the stored row.
    ///
    /// `customer` must already be validated and trimmed.
    pub async fn create(&self, customer: &NewCustomer) -> DbResult<Customer> {
        let params = Params::new()
            .set("CustomerName", &customer.customer_name)
            .set("MobileNo", customer.mobile_no.clone())
            .set("Address", customer.address.clone())
            .set("City", customer.city.clone())
            .set("GstNo", customer.gst_no.clone());

        let row: Option<CustomerRow> = self.executor.fetch_optional(&INSERT, params).await?;
        let customer = row
            .map(Customer::from)
            .ok_or_else(|| DbError::conversion("customer insert returned no row"))?;

        debug!(customer_id = customer.customer_id, "Customer created");
        Ok(customer)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::executor::RetryPolicy;
    use crate::params::SqlValue;
    use crate::pool::PoolManager;
    use crate::testing::{record, ScriptedConnector};

    fn repo(script: &ScriptedConnector) -> CustomerRepository {
        let pool = Arc::new(PoolManager::new(Arc::new(script.clone())));
        CustomerRepository::new(ResilientExecutor::new(pool, RetryPolicy::default()))
    }

    fn ravi() -> crate::record::Record {
        record(json!({
            "CustomerId": 7,
            "CustomerName": "Ravi Kumar",
            "MobileNo": "9876543210",
            "Address": null,
            "City": "Salem",
            "GstNo": null,
            "IsActive": true
        }))
    }

    #[tokio::test]
    async fn test_search_escapes_and_maps() {
        let script = ScriptedConnector::new();
        script.respond("LIKE @Pattern", vec![ravi()]);

        let found = repo(&script).search(" 98_76 ").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].customer_name, "Ravi Kumar");
        assert_eq!(found[0].city.as_deref(), Some("Salem"));

        let sent = &script.executed()[0];
        assert_eq!(
            sent.param("Pattern"),
            Some(&SqlValue::NVarChar("%98\\_76%".to_string()))
        );
    }

    #[tokio::test]
    async fn test_blank_search_lists_active() {
        let script = ScriptedConnector::new();
        script.respond("ORDER BY CustomerName", vec![ravi()]);

        let found = repo(&script).search("   ").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(script.executed()[0].text(), LIST_ACTIVE.text);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let script = ScriptedConnector::new();
        let err = repo(&script).get_by_id(41).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_create_binds_nulls() {
        let script = ScriptedConnector::new();
        script.respond("INSERT INTO Customers", vec![ravi()]);

        let created = repo(&script)
            .create(&NewCustomer {
                customer_name: "Ravi Kumar".to_string(),
                mobile_no: Some("9876543210".to_string()),
                address: None,
                city: Some("Salem".to_string()),
                gst_no: None,
            })
            .await
            .unwrap();

        assert_eq!(created.customer_id, 7);
        let sent = &script.executed()[0];
        assert_eq!(sent.param("Address"), Some(&SqlValue::Null));
        assert_eq!(
            sent.param("CustomerName"),
            Some(&SqlValue::NVarChar("Ravi Kumar".to_string()))
        );
    }
}
