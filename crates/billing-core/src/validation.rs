//! # Validation Module
//!
//! Input validation for request bodies and path parameters.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Route handler (axum extractors)                              │
//! │  ├── JSON shape, query strings                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required identifiers, positive ids, sane lengths                  │
//! │  └── Invoice bodies before a transaction is opened                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQL Server                                                   │
//! │  ├── NOT NULL / UNIQUE / FOREIGN KEY constraints                       │
//! │  └── Stored procedure checks                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use billing_core::validation::{parse_id, require};
//!
//! assert_eq!(parse_id("id", "42").unwrap(), 42);
//! assert!(require("username", "  ").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{NewCustomer, NewInvoice, ScreenPermissions};
use crate::{MAX_INVOICE_ITEMS, MAX_SCREEN_ROUTES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Requires a non-blank value and returns it trimmed.
pub fn require(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(value.to_string())
}

/// Like [`require`] with an upper length bound (in characters).
pub fn require_max(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = require(field, value)?;
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(value)
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (callers fall back to the default listing)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates an optional mobile number: 10 to 15 digits, an optional leading
/// `+`. Blank values become `None`.
pub fn validate_mobile(mobile: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(mobile) = mobile.map(str::trim).filter(|m| !m.is_empty()) else {
        return Ok(None);
    };
    let digits = mobile.strip_prefix('+').unwrap_or(mobile);
    if !(10..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid(
            "mobileNo",
            "must be 10 to 15 digits",
        ));
    }
    Ok(Some(mobile.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Parses a positive integer identifier from a path segment.
///
/// ## Example
/// ```rust
/// use billing_core::validation::parse_id;
///
/// assert!(parse_id("id", "7").is_ok());
/// assert!(parse_id("id", "0").is_err());
/// assert!(parse_id("id", "abc").is_err());
/// ```
pub fn parse_id(field: &str, raw: &str) -> ValidationResult<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::required(field));
    }
    let id: i32 = raw
        .parse()
        .map_err(|_| ValidationError::invalid(field, "must be a whole number"))?;
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(id)
}

fn positive(field: impl Into<String>, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: field.into(),
        });
    }
    Ok(())
}

fn non_negative(field: impl Into<String>, value: f64) -> ValidationResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.into(),
        });
    }
    Ok(())
}

// =============================================================================
// Body Validators
// =============================================================================

/// Validates a new customer and returns it with trimmed fields.
pub fn validate_new_customer(customer: &NewCustomer) -> ValidationResult<NewCustomer> {
    let trim = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    Ok(NewCustomer {
        customer_name: require_max("customerName", &customer.customer_name, 100)?,
        mobile_no: validate_mobile(customer.mobile_no.as_deref())?,
        address: trim(&customer.address),
        city: trim(&customer.city),
        gst_no: trim(&customer.gst_no),
    })
}

/// Validates an invoice body before the transaction is opened.
///
/// ## Rules
/// - `voucherSeries` and `executiveUsername` are required
/// - At least one item, at most [`MAX_INVOICE_ITEMS`]
/// - Item quantities and product ids are positive
/// - Rates, amounts and totals are not negative
pub fn validate_new_invoice(invoice: &NewInvoice) -> ValidationResult<()> {
    require_max("voucherSeries", &invoice.voucher_series, 50)?;
    require("executiveUsername", &invoice.executive_username)?;

    if invoice.items.is_empty() {
        return Err(ValidationError::required("items"));
    }
    if invoice.items.len() > MAX_INVOICE_ITEMS {
        return Err(ValidationError::TooMany {
            field: "items".to_string(),
            max: MAX_INVOICE_ITEMS,
        });
    }

    for (i, item) in invoice.items.iter().enumerate() {
        if item.product_id <= 0 {
            return Err(ValidationError::MustBePositive {
                field: format!("items[{i}].productId"),
            });
        }
        positive(format!("items[{i}].quantity"), item.quantity)?;
        non_negative(format!("items[{i}].rate"), item.rate)?;
        non_negative(format!("items[{i}].amount"), item.amount)?;
    }

    for (i, adj) in invoice.adjustments.iter().enumerate() {
        if adj.account_id <= 0 {
            return Err(ValidationError::MustBePositive {
                field: format!("adjustments[{i}].accountId"),
            });
        }
        if !adj.amount.is_finite() {
            return Err(ValidationError::invalid(
                format!("adjustments[{i}].amount"),
                "must be a number",
            ));
        }
    }

    non_negative("grossAmount", invoice.gross_amount)?;
    non_negative("gstAmount", invoice.gst_amount)?;
    non_negative("discountAmount", invoice.discount_amount)?;
    non_negative("netAmount", invoice.net_amount)?;
    Ok(())
}

/// Validates a screen permission update.
pub fn validate_screen_permissions(update: &ScreenPermissions) -> ValidationResult<()> {
    require("username", &update.username)?;
    if update.screens.len() > MAX_SCREEN_ROUTES {
        return Err(ValidationError::TooMany {
            field: "screens".to_string(),
            max: MAX_SCREEN_ROUTES,
        });
    }
    if update.screens.iter().any(|s| s.contains(',')) {
        return Err(ValidationError::invalid("screens", "routes cannot contain ','"));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NewInvoiceAdjustment, NewInvoiceItem};

    fn invoice() -> NewInvoice {
        NewInvoice {
            voucher_series: "RS-25NAM-JD".to_string(),
            screen_type: Some("RentalService".to_string()),
            invoice_date: None,
            customer_id: Some(4),
            executive_username: "jd".to_string(),
            branch_name: Some("Namakkal".to_string()),
            payment_mode: None,
            gross_amount: 200.0,
            gst_amount: 36.0,
            discount_amount: 0.0,
            net_amount: 236.0,
            remarks: None,
            items: vec![NewInvoiceItem {
                product_id: 3,
                quantity: 2.0,
                rate: 100.0,
                gst_percent: 18.0,
                amount: 200.0,
                rental_days: Some(3),
            }],
            adjustments: vec![NewInvoiceAdjustment {
                account_id: 1,
                amount: -10.0,
                remarks: None,
            }],
        }
    }

    #[test]
    fn test_require() {
        assert_eq!(require("username", "  jd ").unwrap(), "jd");
        assert_eq!(
            require("username", "").unwrap_err(),
            ValidationError::required("username")
        );
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("id", " 12 ").unwrap(), 12);
        assert!(matches!(
            parse_id("id", "-3"),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(matches!(
            parse_id("id", "1.5"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(parse_id("id", ""), Err(ValidationError::Required { .. })));
    }

    #[test]
    fn test_validate_mobile() {
        assert_eq!(validate_mobile(None).unwrap(), None);
        assert_eq!(validate_mobile(Some("  ")).unwrap(), None);
        assert_eq!(
            validate_mobile(Some("9876543210")).unwrap().as_deref(),
            Some("9876543210")
        );
        assert!(validate_mobile(Some("+919876543210")).is_ok());
        assert!(validate_mobile(Some("98765")).is_err());
        assert!(validate_mobile(Some("98765abcde")).is_err());
    }

    #[test]
    fn test_validate_new_customer_trims() {
        let customer = NewCustomer {
            customer_name: "  Ravi Kumar ".to_string(),
            mobile_no: Some("".to_string()),
            address: Some("  ".to_string()),
            city: Some(" Salem ".to_string()),
            gst_no: None,
        };
        let clean = validate_new_customer(&customer).unwrap();
        assert_eq!(clean.customer_name, "Ravi Kumar");
        assert_eq!(clean.mobile_no, None);
        assert_eq!(clean.address, None);
        assert_eq!(clean.city.as_deref(), Some("Salem"));
    }

    #[test]
    fn test_validate_new_customer_requires_name() {
        let customer = NewCustomer {
            customer_name: " ".to_string(),
            mobile_no: None,
            address: None,
            city: None,
            gst_no: None,
        };
        assert_eq!(
            validate_new_customer(&customer).unwrap_err().field(),
            "customerName"
        );
    }

    #[test]
    fn test_validate_new_invoice() {
        assert!(validate_new_invoice(&invoice()).is_ok());

        let mut inv = invoice();
        inv.items.clear();
        assert_eq!(validate_new_invoice(&inv).unwrap_err().field(), "items");

        let mut inv = invoice();
        inv.items[0].quantity = 0.0;
        assert_eq!(
            validate_new_invoice(&inv).unwrap_err().field(),
            "items[0].quantity"
        );

        let mut inv = invoice();
        inv.executive_username = String::new();
        assert_eq!(
            validate_new_invoice(&inv).unwrap_err().field(),
            "executiveUsername"
        );

        let mut inv = invoice();
        inv.net_amount = f64::NAN;
        assert_eq!(validate_new_invoice(&inv).unwrap_err().field(), "netAmount");
    }

    #[test]
    fn test_validate_screen_permissions() {
        let ok = ScreenPermissions {
            username: "jd".to_string(),
            screens: vec!["/billing".to_string()],
        };
        assert!(validate_screen_permissions(&ok).is_ok());

        let bad = ScreenPermissions {
            username: "jd".to_string(),
            screens: vec!["/a,/b".to_string()],
        };
        assert!(validate_screen_permissions(&bad).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert_eq!(validate_search_query("  ravi ").unwrap(), "ravi");
        assert!(validate_search_query(&"a".repeat(101)).is_err());
    }
}
