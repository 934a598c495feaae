//! # Invoice Repository
//!
//! Invoice listing, detail and the atomic create path.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        create(invoice)                                  │
//! │                                                                         │
//! │  executor.begin()          (pool acquire + BEGIN, retried if transient) │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  EXEC dbo.usp_CreateInvoiceHeader ──► InvoiceId, VoucherNo              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT InvoiceItems        × items                                     │
//! │  INSERT InvoiceAdjustments  × adjustments                               │
//! │       │                                                                 │
//! │       ├── all ok ──► COMMIT ──► InvoiceCreated                          │
//! │       │                                                                 │
//! │       └── any error ──► ROLLBACK ──► original error                     │
//! │                                                                         │
//! │  Statements inside the transaction are never retried.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

use billing_core::lookups::DEFAULT_PAYMENT_MODE;
use billing_core::{
    InvoiceAdjustment, InvoiceCreated, InvoiceDetail, InvoiceHeader, InvoiceItem, NewInvoice,
    ScreenType, RECENT_INVOICE_LIMIT,
};

use crate::error::{DbError, DbResult};
use crate::executor::{ResilientExecutor, TxContext};
use crate::params::{ParamSpec, Params, SqlType, Statement};
use crate::record::{column_i64, date_column};

// =============================================================================
// Statements
// =============================================================================

const RECENT: Statement = Statement::query(
    "SELECT TOP (@Limit)
            h.InvoiceId, h.VoucherSeries, h.VoucherNo, h.InvoiceDate, h.ScreenType,
            h.CustomerId, c.CustomerName, h.ExecutiveUsername, h.BranchName,
            h.PaymentMode, h.GrossAmount, h.GstAmount, h.DiscountAmount,
            h.NetAmount, h.Remarks
     FROM InvoiceHeader h
     LEFT JOIN Customers c ON c.CustomerId = h.CustomerId
     ORDER BY h.InvoiceDate DESC, h.InvoiceId DESC",
    &[ParamSpec::required("Limit", SqlType::Int)],
);

const HEADER_BY_ID: Statement = Statement::query(
    "SELECT h.InvoiceId, h.VoucherSeries, h.VoucherNo, h.InvoiceDate, h.ScreenType,
            h.CustomerId, c.CustomerName, h.ExecutiveUsername, h.BranchName,
            h.PaymentMode, h.GrossAmount, h.GstAmount, h.DiscountAmount,
            h.NetAmount, h.Remarks
     FROM InvoiceHeader h
     LEFT JOIN Customers c ON c.CustomerId = h.CustomerId
     WHERE h.InvoiceId = @InvoiceId",
    &[ParamSpec::required("InvoiceId", SqlType::Int)],
);

const ITEMS_BY_INVOICE: Statement = Statement::query(
    "SELECT i.ItemId, i.ProductId, p.ProductName, i.Quantity, i.Rate,
            i.GstPercent, i.Amount, i.RentalDays
     FROM InvoiceItems i
     LEFT JOIN Products p ON p.ProductId = i.ProductId
     WHERE i.InvoiceId = @InvoiceId
     ORDER BY i.ItemId",
    &[ParamSpec::required("InvoiceId", SqlType::Int)],
);

const ADJUSTMENTS_BY_INVOICE: Statement = Statement::query(
    "SELECT a.AdjustmentId, a.AccountId, acc.AccountName, a.Amount, a.Remarks
     FROM InvoiceAdjustments a
     LEFT JOIN AdjustmentAccounts acc ON acc.AccountId = a.AccountId
     WHERE a.InvoiceId = @InvoiceId
     ORDER BY a.AdjustmentId",
    &[ParamSpec::required("InvoiceId", SqlType::Int)],
);

const CREATE_HEADER: Statement = Statement::procedure(
    "dbo.usp_CreateInvoiceHeader",
    &[
        ParamSpec::required("VoucherSeries", SqlType::NVarChar),
        ParamSpec::required("ScreenType", SqlType::NVarChar),
        ParamSpec::required("InvoiceDate", SqlType::Date),
        ParamSpec::nullable("CustomerId", SqlType::Int),
        ParamSpec::required("ExecutiveUsername", SqlType::NVarChar),
        ParamSpec::nullable("BranchName", SqlType::NVarChar),
        ParamSpec::required("PaymentMode", SqlType::NVarChar),
        ParamSpec::required("GrossAmount", SqlType::Float),
        ParamSpec::required("GstAmount", SqlType::Float),
        ParamSpec::required("DiscountAmount", SqlType::Float),
        ParamSpec::required("NetAmount", SqlType::Float),
        ParamSpec::nullable("Remarks", SqlType::NVarChar),
    ],
);

const INSERT_ITEM: Statement = Statement::query(
    "INSERT INTO InvoiceItems
            (InvoiceId, ProductId, Quantity, Rate, GstPercent, Amount, RentalDays)
     VALUES (@InvoiceId, @ProductId, @Quantity, @Rate, @GstPercent, @Amount, @RentalDays)",
    &[
        ParamSpec::required("InvoiceId", SqlType::Int),
        ParamSpec::required("ProductId", SqlType::Int),
        ParamSpec::required("Quantity", SqlType::Float),
        ParamSpec::required("Rate", SqlType::Float),
        ParamSpec::required("GstPercent", SqlType::Float),
        ParamSpec::required("Amount", SqlType::Float),
        ParamSpec::nullable("RentalDays", SqlType::Int),
    ],
);

const INSERT_ADJUSTMENT: Statement = Statement::query(
    "INSERT INTO InvoiceAdjustments (InvoiceId, AccountId, Amount, Remarks)
     VALUES (@InvoiceId, @AccountId, @Amount, @Remarks)",
    &[
        ParamSpec::required("InvoiceId", SqlType::Int),
        ParamSpec::required("AccountId", SqlType::Int),
        ParamSpec::required("Amount", SqlType::Float),
        ParamSpec::nullable("Remarks", SqlType::NVarChar),
    ],
);

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HeaderRow {
    invoice_id: i32,
    voucher_series: String,
    voucher_no: i64,
    #[serde(deserialize_with = "date_column")]
    invoice_date: NaiveDate,
    screen_type: Option<String>,
    customer_id: Option<i32>,
    #[serde(default)]
    customer_name: Option<String>,
    executive_username: Option<String>,
    branch_name: Option<String>,
    payment_mode: Option<String>,
    gross_amount: Option<f64>,
    gst_amount: Option<f64>,
    discount_amount: Option<f64>,
    net_amount: Option<f64>,
    remarks: Option<String>,
}

impl From<HeaderRow> for InvoiceHeader {
    fn from(row: HeaderRow) -> Self {
        InvoiceHeader {
            invoice_id: row.invoice_id,
            voucher_series: row.voucher_series,
            voucher_no: row.voucher_no,
            invoice_date: row.invoice_date,
            screen_type: row
                .screen_type
                .unwrap_or_else(|| ScreenType::default().as_str().to_string()),
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            executive_username: row.executive_username,
            branch_name: row.branch_name,
            payment_mode: row.payment_mode,
            gross_amount: row.gross_amount.unwrap_or(0.0),
            gst_amount: row.gst_amount.unwrap_or(0.0),
            discount_amount: row.discount_amount.unwrap_or(0.0),
            net_amount: row.net_amount.unwrap_or(0.0),
            remarks: row.remarks,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ItemRow {
    item_id: i32,
    product_id: i32,
    #[serde(default)]
    product_name: Option<String>,
    quantity: f64,
    rate: f64,
    gst_percent: Option<f64>,
    amount: f64,
    rental_days: Option<i32>,
}

impl From<ItemRow> for InvoiceItem {
    fn from(row: ItemRow) -> Self {
        InvoiceItem {
            item_id: row.item_id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            rate: row.rate,
            gst_percent: row.gst_percent.unwrap_or(0.0),
            amount: row.amount,
            rental_days: row.rental_days,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AdjustmentRow {
    adjustment_id: i32,
    account_id: i32,
    #[serde(default)]
    account_name: Option<String>,
    amount: f64,
    remarks: Option<String>,
}

impl From<AdjustmentRow> for InvoiceAdjustment {
    fn from(row: AdjustmentRow) -> Self {
        InvoiceAdjustment {
            adjustment_id: row.adjustment_id,
            account_id: row.account_id,
            account_name: row.account_name,
            amount: row.amount,
            remarks: row.remarks,
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    executor: ResilientExecutor,
}

impl InvoiceRepository {
    pub fn new(executor: ResilientExecutor) -> Self {
        InvoiceRepository { executor }
    }

    /// Most recent invoices, newest first, capped at
    /// [`RECENT_INVOICE_LIMIT`].
    pub async fn list_recent(&self) -> DbResult<Vec<InvoiceHeader>> {
        let rows: Vec<HeaderRow> = self
            .executor
            .fetch_all(&RECENT, Params::new().set("Limit", RECENT_INVOICE_LIMIT))
            .await?;
        Ok(rows.into_iter().map(InvoiceHeader::from).collect())
    }

    /// Header with its items and adjustments.
    ///
    /// ## Errors
    /// `DbError::NotFound` when the header doesn't exist.
    pub async fn get_detail(&self, id: i32) -> DbResult<InvoiceDetail> {
        let header: HeaderRow = self
            .executor
            .fetch_optional(&HEADER_BY_ID, Params::new().set("InvoiceId", id))
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;

        let items: Vec<ItemRow> = self
            .executor
            .fetch_all(&ITEMS_BY_INVOICE, Params::new().set("InvoiceId", id))
            .await?;
        let adjustments: Vec<AdjustmentRow> = self
            .executor
            .fetch_all(&ADJUSTMENTS_BY_INVOICE, Params::new().set("InvoiceId", id))
            .await?;

        Ok(InvoiceDetail {
            invoice: header.into(),
            items: items.into_iter().map(InvoiceItem::from).collect(),
            adjustments: adjustments.into_iter().map(InvoiceAdjustment::from).collect(),
        })
    }

    /// Writes the header, items and adjustments in one transaction.
    ///
    /// `invoice` must already be validated. A missing invoice date falls
    /// back to `today`.
    ///
    /// ## Errors
    /// The first failing statement's error, after the transaction was rolled
    /// back. A failed rollback is logged and does not replace that error.
    pub async fn create(&self, invoice: &NewInvoice, today: NaiveDate) -> DbResult<InvoiceCreated> {
        let mut tx = self.executor.begin().await?;

        match write_invoice(&mut tx, invoice, today).await {
            Ok(created) => {
                tx.commit().await?;
                info!(
                    invoice_id = created.invoice_id,
                    series = %created.voucher_series,
                    voucher_number = created.voucher_number,
                    items = invoice.items.len(),
                    adjustments = invoice.adjustments.len(),
                    "Invoice created"
                );
                Ok(created)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Invoice rollback failed");
                }
                warn!(series = %invoice.voucher_series, error = %err, "Invoice creation rolled back");
                Err(err)
            }
        }
    }
}

async fn write_invoice(
    tx: &mut TxContext,
    invoice: &NewInvoice,
    today: NaiveDate,
) -> DbResult<InvoiceCreated> {
    let screen = ScreenType::parse(invoice.screen_type.as_deref());
    let payment_mode = invoice
        .payment_mode
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_PAYMENT_MODE);

    let header = Params::new()
        .set("VoucherSeries", invoice.voucher_series.trim())
        .set("ScreenType", screen.as_str())
        .set("InvoiceDate", invoice.invoice_date.unwrap_or(today))
        .set("CustomerId", invoice.customer_id)
        .set("ExecutiveUsername", invoice.executive_username.trim())
        .set("BranchName", invoice.branch_name.clone())
        .set("PaymentMode", payment_mode)
        .set("GrossAmount", invoice.gross_amount)
        .set("GstAmount", invoice.gst_amount)
        .set("DiscountAmount", invoice.discount_amount)
        .set("NetAmount", invoice.net_amount)
        .set("Remarks", invoice.remarks.clone());

    let rows = tx.execute(&CREATE_HEADER, header).await?;
    let first = rows
        .first()
        .ok_or_else(|| DbError::conversion("usp_CreateInvoiceHeader returned no row"))?;
    let invoice_id = column_i64(first, "InvoiceId")
        .and_then(|id| i32::try_from(id).ok())
        .ok_or_else(|| DbError::conversion("usp_CreateInvoiceHeader returned no InvoiceId"))?;
    let voucher_number = column_i64(first, "VoucherNo")
        .ok_or_else(|| DbError::conversion("usp_CreateInvoiceHeader returned no VoucherNo"))?;

    debug!(invoice_id, voucher_number, "Invoice header written");

    for item in &invoice.items {
        let params = Params::new()
            .set("InvoiceId", invoice_id)
            .set("ProductId", item.product_id)
            .set("Quantity", item.quantity)
            .set("Rate", item.rate)
            .set("GstPercent", item.gst_percent)
            .set("Amount", item.amount)
            .set("RentalDays", item.rental_days);
        tx.execute(&INSERT_ITEM, params).await?;
    }

    for adjustment in &invoice.adjustments {
        let params = Params::new()
            .set("InvoiceId", invoice_id)
            .set("AccountId", adjustment.account_id)
            .set("Amount", adjustment.amount)
            .set("Remarks", adjustment.remarks.clone());
        tx.execute(&INSERT_ADJUSTMENT, params).await?;
    }

    Ok(InvoiceCreated {
        invoice_id,
        voucher_series: invoice.voucher_series.trim().to_string(),
        voucher_number,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use billing_core::{NewInvoiceAdjustment, NewInvoiceItem};
    use serde_json::json;

    use crate::error::ErrorKind;
    use crate::executor::RetryPolicy;
    use crate::params::SqlValue;
    use crate::pool::PoolManager;
    use crate::testing::{record, ScriptedConnector};

    fn repo(script: &ScriptedConnector) -> InvoiceRepository {
        let pool = Arc::new(PoolManager::new(Arc::new(script.clone())));
        InvoiceRepository::new(ResilientExecutor::new(pool, RetryPolicy::default()))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn new_invoice() -> NewInvoice {
        NewInvoice {
            voucher_series: "RS25-26NAM-JD".to_string(),
            screen_type: Some("RentalService".to_string()),
            invoice_date: None,
            customer_id: Some(7),
            executive_username: "jd".to_string(),
            branch_name: Some("Namakkal".to_string()),
            payment_mode: None,
            gross_amount: 200.0,
            gst_amount: 36.0,
            discount_amount: 0.0,
            net_amount: 236.0,
            remarks: None,
            items: vec![
                NewInvoiceItem {
                    product_id: 3,
                    quantity: 1.0,
                    rate: 100.0,
                    gst_percent: 18.0,
                    amount: 100.0,
                    rental_days: Some(2),
                },
                NewInvoiceItem {
                    product_id: 4,
                    quantity: 2.0,
                    rate: 50.0,
                    gst_percent: 18.0,
                    amount: 100.0,
                    rental_days: None,
                },
            ],
            adjustments: vec![NewInvoiceAdjustment {
                account_id: 9,
                amount: -10.0,
                remarks: Some("round off".to_string()),
            }],
        }
    }

    fn header_result(script: &ScriptedConnector) {
        script.respond(
            "usp_CreateInvoiceHeader",
            vec![record(json!({"InvoiceId": 501, "VoucherNo": 12}))],
        );
    }

    #[tokio::test]
    async fn test_create_commits_everything() {
        let script = ScriptedConnector::new();
        header_result(&script);

        let created = repo(&script).create(&new_invoice(), today()).await.unwrap();
        assert_eq!(created.invoice_id, 501);
        assert_eq!(created.voucher_number, 12);
        assert_eq!(created.voucher_series, "RS25-26NAM-JD");

        let committed = script.committed();
        assert_eq!(committed.len(), 4);
        assert_eq!(committed[0].text(), "dbo.usp_CreateInvoiceHeader");
        assert_eq!(committed[0].param("InvoiceDate"), Some(&SqlValue::Date(today())));
        assert_eq!(
            committed[0].param("PaymentMode"),
            Some(&SqlValue::NVarChar("Cash".to_string()))
        );
        assert_eq!(committed[1].param("InvoiceId"), Some(&SqlValue::Int(501)));
        assert_eq!(committed[2].param("RentalDays"), Some(&SqlValue::Null));
        assert_eq!(committed[3].param("AccountId"), Some(&SqlValue::Int(9)));
        assert_eq!((script.commits(), script.rollbacks()), (1, 0));
    }

    #[tokio::test]
    async fn test_failed_item_rolls_back_and_is_not_retried() {
        let script = ScriptedConnector::new();
        header_result(&script);
        script.fail("INSERT INTO InvoiceItems", ErrorKind::ConnectionReset, 1);

        let err = repo(&script).create(&new_invoice(), today()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::ConnectionReset));

        assert!(script.committed().is_empty());
        assert_eq!((script.commits(), script.rollbacks()), (0, 1));
        assert_eq!(script.executed_counts()[INSERT_ITEM.text], 1);
        assert!(!script.executed_counts().contains_key(INSERT_ADJUSTMENT.text));
    }

    #[tokio::test]
    async fn test_header_without_id_rolls_back() {
        let script = ScriptedConnector::new();
        script.respond("usp_CreateInvoiceHeader", vec![record(json!({"VoucherNo": 1}))]);

        let err = repo(&script).create(&new_invoice(), today()).await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::Conversion));
        assert_eq!(script.rollbacks(), 1);
    }

    #[tokio::test]
    async fn test_detail_assembles_children() {
        let script = ScriptedConnector::new();
        script.respond(
            "WHERE h.InvoiceId = @InvoiceId",
            vec![record(json!({
                "InvoiceId": 501,
                "VoucherSeries": "RS25-26NAM-JD",
                "VoucherNo": 12,
                "InvoiceDate": "2025-06-01T10:30:00",
                "ScreenType": "RentalService",
                "CustomerId": 7,
                "CustomerName": "Ravi Kumar",
                "ExecutiveUsername": "jd",
                "BranchName": "Namakkal",
                "PaymentMode": "Cash",
                "GrossAmount": 200.0,
                "GstAmount": 36.0,
                "DiscountAmount": 0.0,
                "NetAmount": 236.0,
                "Remarks": null
            }))],
        );
        script.respond(
            "FROM InvoiceItems",
            vec![record(json!({
                "ItemId": 1, "ProductId": 3, "ProductName": "Shamiana",
                "Quantity": 1.0, "Rate": 100.0, "GstPercent": 18.0,
                "Amount": 100.0, "RentalDays": 2
            }))],
        );

        let detail = repo(&script).get_detail(501).await.unwrap();
        assert_eq!(detail.invoice.voucher_no, 12);
        assert_eq!(detail.invoice.invoice_date, today());
        assert_eq!(detail.invoice.customer_name.as_deref(), Some("Ravi Kumar"));
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].rental_days, Some(2));
        assert!(detail.adjustments.is_empty());
    }

    #[tokio::test]
    async fn test_detail_missing_header() {
        let script = ScriptedConnector::new();
        let err = repo(&script).get_detail(9).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(script.executed().len(), 1);
    }

    #[tokio::test]
    async fn test_recent_uses_limit() {
        let script = ScriptedConnector::new();
        repo(&script).list_recent().await.unwrap();
        assert_eq!(
            script.executed()[0].param("Limit"),
            Some(&SqlValue::Int(RECENT_INVOICE_LIMIT))
        );
    }

    #[tokio::test]
    async fn test_recent_reads_date_columns() {
        let script = ScriptedConnector::new();
        script.respond(
            "ORDER BY h.InvoiceDate DESC",
            vec![
                record(json!({
                    "InvoiceId": 502, "VoucherSeries": "RMB-25NAM-JD", "VoucherNo": 8,
                    "InvoiceDate": "2025-06-01", "ScreenType": "RentalMonthlyBill",
                    "CustomerId": null, "ExecutiveUsername": "jd", "BranchName": null,
                    "PaymentMode": "Cash", "GrossAmount": 50.0, "GstAmount": 9.0,
                    "DiscountAmount": 0.0, "NetAmount": 59.0, "Remarks": null
                })),
                record(json!({
                    "InvoiceId": 501, "VoucherSeries": "RS25-26NAM-JD", "VoucherNo": 12,
                    "InvoiceDate": "2025-05-31T18:45:10.250", "ScreenType": null,
                    "CustomerId": 7, "ExecutiveUsername": "jd", "BranchName": "Namakkal",
                    "PaymentMode": null, "GrossAmount": 200.0, "GstAmount": 36.0,
                    "DiscountAmount": 0.0, "NetAmount": 236.0, "Remarks": null
                })),
            ],
        );

        let recent = repo(&script).list_recent().await.unwrap();
        assert_eq!(recent[0].invoice_date, today());
        assert_eq!(
            recent[1].invoice_date,
            NaiveDate::from_ymd_opt(2025, 5, 31).unwrap()
        );
        assert_eq!(recent[1].screen_type, "EmployeeSaleInvoice");
    }
}
