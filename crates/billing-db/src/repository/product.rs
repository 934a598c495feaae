//! # Product Repository
//!
//! Read-only lookups over the product catalogue: the active list, a single
//! product, barcode scans and category filters.

use serde::Deserialize;
use tracing::debug;

use billing_core::Product;

use crate::error::{DbError, DbResult};
use crate::executor::ResilientExecutor;
use crate::params::{ParamSpec, Params, SqlType, Statement};

const LIST_ACTIVE: Statement = Statement::query(
    "SELECT ProductId, ProductName, Barcode, Category, UnitPrice, RentalRate,
            GstPercent, StockQty, IsActive
     FROM Products
     WHERE IsActive = 1
     ORDER BY ProductName",
    &[],
);

const BY_ID: Statement = Statement::query(
    "SELECT ProductId, ProductName, Barcode, Category, UnitPrice, RentalRate,
            GstPercent, StockQty, IsActive
     FROM Products
     WHERE ProductId = @ProductId",
    &[ParamSpec::required("ProductId", SqlType::Int)],
);

const BY_BARCODE: Statement = Statement::query(
    "SELECT TOP (1) ProductId, ProductName, Barcode, Category, UnitPrice, RentalRate,
            GstPercent, StockQty, IsActive
     FROM Products
     WHERE Barcode = @Barcode AND IsActive = 1",
    &[ParamSpec::required("Barcode", SqlType::NVarChar)],
);

const BY_CATEGORY: Statement = Statement::query(
    "SELECT ProductId, ProductName, Barcode, Category, UnitPrice, RentalRate,
            GstPercent, StockQty, IsActive
     FROM Products
     WHERE Category = @Category AND IsActive = 1
     ORDER BY ProductName",
    &[ParamSpec::required("Category", SqlType::NVarChar)],
);

/// Product row as stored. Money columns are DECIMAL and arrive as floats.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ProductRow {
    product_id: i32,
    product_name: String,
    barcode: Option<String>,
    category: Option<String>,
    unit_price: Option<f64>,
    rental_rate: Option<f64>,
    gst_percent: Option<f64>,
    stock_qty: Option<i32>,
    #[serde(default)]
    is_active: Option<bool>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            product_id: row.product_id,
            product_name: row.product_name,
            barcode: row.barcode,
            category: row.category,
            unit_price: row.unit_price.unwrap_or(0.0),
            rental_rate: row.rental_rate,
            gst_percent: row.gst_percent.unwrap_or(0.0),
            stock_qty: row.stock_qty.unwrap_or(0),
            is_active: row.is_active.unwrap_or(true),
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let scanned = repo.get_by_barcode("8901234567890").await?;
/// let tents = repo.list_by_category("Tents").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    executor: ResilientExecutor,
}

impl ProductRepository {
    pub fn new(executor: ResilientExecutor) -> Self {
        ProductRepository { executor }
    }

    /// Lists active products ordered by name.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = self.executor.fetch_all(&LIST_ACTIVE, Params::new()).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a product by id, active or not.
    ///
    /// ## Errors
    /// `DbError::NotFound` when no row matches.
    pub async fn get_by_id(&self, id: i32) -> DbResult<Product> {
        let row: Option<ProductRow> = self
            .executor
            .fetch_optional(&BY_ID, Params::new().set("ProductId", id))
            .await?;
        row.map(Product::from)
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Looks up an active product by exact barcode.
    ///
    /// ## Errors
    /// `DbError::NotFound` when no active product carries the barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Product> {
        let barcode = barcode.trim();
        debug!(barcode = %barcode, "Looking up product by barcode");

        let row: Option<ProductRow> = self
            .executor
            .fetch_optional(&BY_BARCODE, Params::new().set("Barcode", barcode))
            .await?;
        row.map(Product::from)
            .ok_or_else(|| DbError::not_found("Product", barcode))
    }

    /// Lists active products in a category. Unknown categories yield an
    /// empty list.
    pub async fn list_by_category(&self, category: &str) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = self
            .executor
            .fetch_all(&BY_CATEGORY, Params::new().set("Category", category.trim()))
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
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

    fn repo(script: &ScriptedConnector) -> ProductRepository {
        let pool = Arc::new(PoolManager::new(Arc::new(script.clone())));
        ProductRepository::new(ResilientExecutor::new(pool, RetryPolicy::default()))
    }

    #[tokio::test]
    async fn test_row_mapping_fills_defaults() {
        let script = ScriptedConnector::new();
        script.respond(
            "WHERE ProductId = @ProductId",
            vec![record(json!({
                "ProductId": 3,
                "ProductName": "Shamiana 20x20",
                "Barcode": null,
                "Category": "Tents",
                "UnitPrice": 1500.5,
                "RentalRate": 250.0,
                "GstPercent": null,
                "StockQty": null,
                "IsActive": false
            }))],
        );

        let product = repo(&script).get_by_id(3).await.unwrap();
        assert_eq!(product.unit_price, 1500.5);
        assert_eq!(product.rental_rate, Some(250.0));
        assert_eq!(product.gst_percent, 0.0);
        assert_eq!(product.stock_qty, 0);
        assert!(!product.is_active);
    }

    #[tokio::test]
    async fn test_barcode_miss_is_not_found() {
        let script = ScriptedConnector::new();
        let err = repo(&script).get_by_barcode(" 890 ").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref id, .. } if id == "890"));
        assert_eq!(
            script.executed()[0].param("Barcode"),
            Some(&SqlValue::NVarChar("890".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unknown_category_is_empty() {
        let script = ScriptedConnector::new();
        assert!(repo(&script).list_by_category("None").await.unwrap().is_empty());
    }
}
