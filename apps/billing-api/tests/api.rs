//! End-to-end router tests against a scripted database backend.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Local;
use serde_json::{json, Value};
use tower::ServiceExt;
use tower_http::cors::CorsLayer;

use billing_api::{build_router, AppState};
use billing_core::voucher::{derive_series, ScreenType};
use billing_db::error::ErrorKind;
use billing_db::testing::{record, ScriptedConnector};
use billing_db::{Database, RetryPolicy};

fn app(script: &ScriptedConnector) -> Router {
    app_with_detail(script, false)
}

fn app_with_detail(script: &ScriptedConnector, expose_detail: bool) -> Router {
    let db = Database::with_connector(
        Arc::new(script.clone()),
        RetryPolicy::new(2, Duration::from_millis(1)),
    );
    let state = AppState::new(db).expose_detail(expose_detail);
    build_router(state, CorsLayer::permissive())
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

fn invoice_body() -> Value {
    json!({
        "voucherSeries": "RS25-26NAM-JD",
        "screenType": "RentalService",
        "customerId": 7,
        "executiveUsername": "jd",
        "branchName": "Namakkal",
        "grossAmount": 200.0,
        "gstAmount": 36.0,
        "netAmount": 236.0,
        "items": [
            {"productId": 3, "quantity": 1, "rate": 100, "gstPercent": 18, "amount": 100},
            {"productId": 4, "quantity": 2, "rate": 50, "gstPercent": 18, "amount": 100}
        ],
        "adjustments": [{"accountId": 9, "amount": -10, "remarks": "round off"}]
    })
}

// =============================================================================
// Invoices
// =============================================================================

#[tokio::test]
async fn test_create_invoice_returns_201() {
    let script = ScriptedConnector::new();
    script.respond(
        "usp_CreateInvoiceHeader",
        vec![record(json!({"InvoiceId": 501, "VoucherNo": 12}))],
    );

    let (status, body) = post(app(&script), "/api/invoices", invoice_body()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Invoice created");
    assert_eq!(body["data"]["invoiceId"], 501);
    assert_eq!(body["data"]["voucherNumber"], 12);
    assert_eq!(script.commits(), 1);
    assert_eq!(script.committed().len(), 4);
}

#[tokio::test]
async fn test_failed_invoice_leaves_nothing_behind() {
    let script = ScriptedConnector::new();
    script.respond(
        "usp_CreateInvoiceHeader",
        vec![record(json!({"InvoiceId": 501, "VoucherNo": 12}))],
    );
    script.fail("INSERT INTO InvoiceAdjustments", ErrorKind::ConstraintViolation, 1);

    let (status, body) = post(app(&script), "/api/invoices", invoice_body()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "DATABASE_ERROR");
    assert_eq!(script.commits(), 0);
    assert_eq!(script.rollbacks(), 1);
    assert!(script.committed().is_empty());
}

#[tokio::test]
async fn test_error_detail_is_per_router() {
    let script = ScriptedConnector::new();
    script.fail("WHERE Barcode = @Barcode", ErrorKind::Syntax, 2);

    let (status, body) = get(app(&script), "/api/products/barcode/8901234").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Database operation failed");
    assert!(body.get("detail").is_none());

    let (status, body) = get(
        app_with_detail(&script, true),
        "/api/products/barcode/8901234",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "DATABASE_ERROR");
    assert!(body["detail"].as_str().unwrap().contains("scripted"));
}

#[tokio::test]
async fn test_invoice_without_items_is_rejected() {
    let script = ScriptedConnector::new();
    let mut body = invoice_body();
    body["items"] = json!([]);

    let (status, body) = post(app(&script), "/api/invoices", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(script.attempts(), 0);
}

#[tokio::test]
async fn test_recent_invoices_with_date_column() {
    let script = ScriptedConnector::new();
    script.respond(
        "ORDER BY h.InvoiceDate DESC",
        vec![record(json!({
            "InvoiceId": 501, "VoucherSeries": "RS25-26NAM-JD", "VoucherNo": 12,
            "InvoiceDate": "2025-06-01", "ScreenType": "RentalService",
            "CustomerId": 7, "CustomerName": "Ravi Kumar", "ExecutiveUsername": "jd",
            "BranchName": "Namakkal", "PaymentMode": "Cash", "GrossAmount": 200.0,
            "GstAmount": 36.0, "DiscountAmount": 0.0, "NetAmount": 236.0, "Remarks": null
        }))],
    );

    let (status, body) = get(app(&script), "/api/invoices").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["invoiceDate"], "2025-06-01");
    assert_eq!(body["data"][0]["voucherNo"], 12);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let script = ScriptedConnector::new();
    let (status, body) = post(app(&script), "/api/invoices", json!({"items": "nope"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

// =============================================================================
// Lookups
// =============================================================================

#[tokio::test]
async fn test_voucher_preview_is_not_persisted() {
    let script = ScriptedConnector::new();
    script.respond("MAX(VoucherNo)", vec![record(json!({"LastNumber": 41}))]);

    let app = app(&script);
    for _ in 0..2 {
        let (status, body) =
            get(app.clone(), "/api/transactions/generate-voucher?series=RS25-26NAM-JD").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["voucherNumber"], 42);
        assert_eq!(body["data"]["series"], "RS25-26NAM-JD");
    }
    assert_eq!(script.commits(), 0);
    assert!(script.committed().is_empty());
}

#[tokio::test]
async fn test_voucher_preview_requires_series() {
    let script = ScriptedConnector::new();
    let (status, body) = get(app(&script), "/api/transactions/generate-voucher").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_dropdown_options() {
    let script = ScriptedConnector::new();
    let (status, body) = get(app(&script), "/api/transactions/dropdown-options").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["transactionTypes"].as_array().is_some());
    assert!(body["data"]["paymentModes"].as_array().is_some());
    assert_eq!(body["data"]["branches"][0]["value"], "NAM");
    assert_eq!(body["data"]["branches"][0]["label"], "Namakkal");
    assert_eq!(script.attempts(), 0);
}

// =============================================================================
// Customers and executives
// =============================================================================

#[tokio::test]
async fn test_customer_not_found() {
    let script = ScriptedConnector::new();
    let (status, body) = get(app(&script), "/api/customers/41").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Customer not found: 41");
}

#[tokio::test]
async fn test_customer_bad_id() {
    let script = ScriptedConnector::new();
    let (status, body) = get(app(&script), "/api/customers/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(script.attempts(), 0);
}

#[tokio::test]
async fn test_customer_list_counts() {
    let script = ScriptedConnector::new();
    script.respond(
        "FROM Customers",
        vec![
            record(json!({"CustomerId": 1, "CustomerName": "Anbu"})),
            record(json!({"CustomerId": 2, "CustomerName": "Bala"})),
        ],
    );

    let (status, body) = get(app(&script), "/api/customers").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][1]["customerName"], "Bala");
}

fn employee_row() -> Value {
    json!({
        "EmployeeId": 11,
        "Username": "jd",
        "EmployeeName": "John David",
        "ShortName": "JD",
        "BranchName": "Namakkal",
        "Designation": "Executive",
        "IsActive": true
    })
}

#[tokio::test]
async fn test_executive_defaults_are_stable() {
    let script = ScriptedConnector::new();
    script.respond("FROM Employees", vec![record(employee_row())]);
    script.respond("MAX(VoucherNo)", vec![record(json!({"LastNumber": 7}))]);

    let expected = derive_series(
        ScreenType::RentalMonthlyBill,
        "NAM",
        "JD",
        Local::now().date_naive(),
    );

    let app = app(&script);
    let mut previews = Vec::new();
    for _ in 0..2 {
        let (status, body) = get(app.clone(), "/api/executives/jd?screen=rentalmonthlybill").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["screenType"], "RentalMonthlyBill");
        assert_eq!(body["data"]["voucher"]["series"], expected.as_str());
        assert_eq!(body["data"]["header"]["branchShortName"], "NAM");
        assert_eq!(body["data"]["transaction"]["paymentMode"], "Cash");
        previews.push(body["data"]["voucher"]["previewNumber"].clone());
    }
    assert_eq!(previews, vec![json!(8), json!(8)]);
    assert!(expected.starts_with("RMB-"));
    assert!(script.committed().is_empty());
}

#[tokio::test]
async fn test_executive_defaults_without_screen() {
    let script = ScriptedConnector::new();
    script.respond("FROM Employees", vec![record(employee_row())]);

    let (status, body) = get(app(&script), "/api/executives/jd").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["screenType"], "EmployeeSaleInvoice");
    assert_eq!(body["data"]["voucher"]["previewNumber"], 1);
    assert!(body["data"]["voucher"]["series"]
        .as_str()
        .unwrap()
        .ends_with("NAM-JD"));
}

#[tokio::test]
async fn test_unknown_executive_is_404() {
    let script = ScriptedConnector::new();
    let (status, body) = get(app(&script), "/api/executives/ghost?screen=RentalService").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "Executive not found: ghost");
}

#[tokio::test]
async fn test_rejected_login_is_401() {
    let script = ScriptedConnector::new();
    let (status, body) = post(
        app(&script),
        "/api/executives/auth/employee",
        json!({"username": "jd", "password": "wrong"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_login_requires_password() {
    let script = ScriptedConnector::new();
    let (status, _) = post(
        app(&script),
        "/api/executives/auth/supervisor",
        json!({"username": "jd"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(script.attempts(), 0);
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_product_by_barcode() {
    let script = ScriptedConnector::new();
    script.respond(
        "WHERE Barcode = @Barcode",
        vec![record(json!({
            "ProductId": 3, "ProductName": "Shamiana", "Barcode": "8901234",
            "Category": "Tents", "UnitPrice": 100.0, "RentalRate": 40.0,
            "GstPercent": 18.0, "StockQty": 12, "IsActive": true
        }))],
    );

    let (status, body) = get(app(&script), "/api/products/barcode/8901234").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["productId"], 3);
    assert_eq!(body["data"]["rentalRate"], 40.0);
}

#[tokio::test]
async fn test_product_barcode_miss_is_404() {
    let script = ScriptedConnector::new();
    let (status, body) = get(app(&script), "/api/products/barcode/000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found: 000");
}

#[tokio::test]
async fn test_product_list_and_bad_id() {
    let script = ScriptedConnector::new();
    script.respond(
        "ORDER BY ProductName",
        vec![record(json!({"ProductId": 1, "ProductName": "Chair"}))],
    );

    let (status, body) = get(app(&script), "/api/products").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let (status, body) = get(app(&script), "/api/products/zero").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

// =============================================================================
// Transport
// =============================================================================

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let script = ScriptedConnector::new();
    script.respond("FROM AdjustmentAccounts", vec![record(json!({"AccountId": 1, "AccountName": "Advance"}))]);
    script.fail("FROM AdjustmentAccounts", ErrorKind::ConnectionReset, 1);

    let (status, body) = get(app(&script), "/api/adjustments").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(script.attempts(), 2);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let script = ScriptedConnector::new();
    let (status, body) = get(app(&script), "/api/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_wrong_method_is_json_405() {
    let script = ScriptedConnector::new();
    let (status, body) = send(app(&script), Method::DELETE, "/api/customers", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "METHOD_NOT_ALLOWED");
}

#[tokio::test]
async fn test_health_reports_database() {
    let script = ScriptedConnector::new();
    let (status, body) = get(app(&script), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "connected");
}

#[tokio::test]
async fn test_health_degraded_when_unreachable() {
    let script = ScriptedConnector::new();
    script.fail_connect(ErrorKind::ConnectionFailed, 1);

    let (status, body) = get(app(&script), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "degraded");
}
