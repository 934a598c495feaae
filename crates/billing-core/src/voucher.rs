//! # Voucher Series
//!
//! Derives the invoice series string shown on billing screens and previews
//! the next voucher number within that series.
//!
//! ## Series Formats
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Screen                 Prefix   Format                 Example (2025) │
//! │  ─────────────────────  ──────   ─────────────────────  ────────────── │
//! │  EmployeeSaleInvoice    RS       {P}{Y}-{Y1}{B}-{E}     RS25-26PAT-Mo  │
//! │  SalesReturns           SRS      {P}-{Y}{B}-{E}         SRS-25NAM-JD   │
//! │  RentalService          RS       {P}-{Y}{B}-{E}         RS-25NAM-JD    │
//! │  RentalMonthlyBill      RMB      {P}-{Y}{B}-{E}         RMB-25NAM-JD   │
//! │                                                                         │
//! │  Y  = last two digits of the year                                      │
//! │  Y1 = last two digits of the following year                            │
//! │  B  = branch short code   (omitted when empty)                         │
//! │  E  = employee short name (omitted together with its '-' when empty)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Preview Numbers
//! The preview is `last stored voucher number + 1`. It is advisory only and
//! never written back; the invoice header procedure assigns the real number
//! at commit time, so two reads without an insert in between return the same
//! preview.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Screen Type
// =============================================================================

/// Billing screen a voucher series belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ScreenType {
    SalesReturns,
    RentalService,
    RentalMonthlyBill,
    #[default]
    EmployeeSaleInvoice,
}

impl ScreenType {
    /// All screen types, in display order.
    pub const ALL: [ScreenType; 4] = [
        ScreenType::EmployeeSaleInvoice,
        ScreenType::RentalService,
        ScreenType::RentalMonthlyBill,
        ScreenType::SalesReturns,
    ];

    /// Parses a screen name from a query string.
    ///
    /// Matching ignores case and surrounding whitespace. Absent or unknown
    /// names fall back to [`ScreenType::EmployeeSaleInvoice`].
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return ScreenType::default();
        };
        ScreenType::ALL
            .into_iter()
            .find(|screen| screen.as_str().eq_ignore_ascii_case(raw))
            .unwrap_or_default()
    }

    /// Canonical name, as stored in `InvoiceHeader.ScreenType`.
    pub const fn as_str(self) -> &'static str {
        match self {
            ScreenType::SalesReturns => "SalesReturns",
            ScreenType::RentalService => "RentalService",
            ScreenType::RentalMonthlyBill => "RentalMonthlyBill",
            ScreenType::EmployeeSaleInvoice => "EmployeeSaleInvoice",
        }
    }

    /// Series prefix for this screen.
    pub const fn prefix(self) -> &'static str {
        match self {
            ScreenType::SalesReturns => "SRS",
            ScreenType::RentalMonthlyBill => "RMB",
            ScreenType::RentalService | ScreenType::EmployeeSaleInvoice => "RS",
        }
    }

    /// Transaction type pre-selected on this screen.
    pub const fn transaction_type(self) -> &'static str {
        match self {
            ScreenType::SalesReturns => "Return",
            ScreenType::RentalService => "Rental",
            ScreenType::RentalMonthlyBill => "MonthlyBill",
            ScreenType::EmployeeSaleInvoice => "Sale",
        }
    }
}

impl std::fmt::Display for ScreenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Series Derivation
// =============================================================================

/// Inputs for deriving a voucher series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherContext<'a> {
    pub screen: ScreenType,
    pub branch_short_name: &'a str,
    pub employee_short_name: &'a str,
    pub date: NaiveDate,
}

impl VoucherContext<'_> {
    /// Series string for this context.
    pub fn series(&self) -> String {
        derive_series(
            self.screen,
            self.branch_short_name,
            self.employee_short_name,
            self.date,
        )
    }
}

/// Builds the series string for a screen, branch, employee and date.
///
/// ## Example
/// ```rust
/// use billing_core::voucher::{derive_series, ScreenType};
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
/// assert_eq!(
///     derive_series(ScreenType::EmployeeSaleInvoice, "PAT", "Mo", date),
///     "RS25-26PAT-Mo"
/// );
/// assert_eq!(derive_series(ScreenType::RentalService, "", "", date), "RS-25");
/// ```
pub fn derive_series(
    screen: ScreenType,
    branch_short: &str,
    employee_short: &str,
    date: NaiveDate,
) -> String {
    let year = two_digit_year(date.year());
    let next_year = two_digit_year(date.year() + 1);
    let branch = branch_short.trim();
    let employee = employee_short.trim();

    let mut series = match screen {
        ScreenType::EmployeeSaleInvoice => {
            format!("{}{year:02}-{next_year:02}", screen.prefix())
        }
        _ => format!("{}-{year:02}", screen.prefix()),
    };
    series.push_str(branch);
    if !employee.is_empty() {
        series.push('-');
        series.push_str(employee);
    }
    series
}

fn two_digit_year(year: i32) -> i32 {
    year.rem_euclid(100)
}

/// Financial year label (April to March) for header defaults.
///
/// ## Example
/// ```rust
/// use billing_core::voucher::financial_year_label;
/// use chrono::NaiveDate;
///
/// let june = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
/// let feb = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
/// assert_eq!(financial_year_label(june), "2025-26");
/// assert_eq!(financial_year_label(feb), "2025-26");
/// ```
pub fn financial_year_label(date: NaiveDate) -> String {
    let start = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{start}-{:02}", two_digit_year(start + 1))
}

// =============================================================================
// Voucher Series + Preview
// =============================================================================

/// A series string with the advisory next voucher number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct VoucherSeries {
    pub series: String,
    #[ts(type = "number")]
    pub preview_number: i64,
}

impl VoucherSeries {
    /// Pairs a series with `last_stored + 1` (or `1` for an unused series).
    pub fn preview(series: impl Into<String>, last_stored: Option<i64>) -> Self {
        VoucherSeries {
            series: series.into(),
            preview_number: next_voucher_number(last_stored),
        }
    }
}

/// Next voucher number after the last stored one.
pub fn next_voucher_number(last_stored: Option<i64>) -> i64 {
    last_stored.unwrap_or(0).saturating_add(1)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, 7, 10).unwrap()
    }

    #[test]
    fn test_parse_screen_type() {
        assert_eq!(ScreenType::parse(Some("SalesReturns")), ScreenType::SalesReturns);
        assert_eq!(ScreenType::parse(Some("salesreturns")), ScreenType::SalesReturns);
        assert_eq!(
            ScreenType::parse(Some(" RENTALMONTHLYBILL ")),
            ScreenType::RentalMonthlyBill
        );
        assert_eq!(ScreenType::parse(Some("rentalService")), ScreenType::RentalService);
    }

    #[test]
    fn test_parse_falls_back_to_employee_sale_invoice() {
        assert_eq!(ScreenType::parse(None), ScreenType::EmployeeSaleInvoice);
        assert_eq!(ScreenType::parse(Some("")), ScreenType::EmployeeSaleInvoice);
        assert_eq!(ScreenType::parse(Some("Billing")), ScreenType::EmployeeSaleInvoice);
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(ScreenType::SalesReturns.prefix(), "SRS");
        assert_eq!(ScreenType::RentalMonthlyBill.prefix(), "RMB");
        assert_eq!(ScreenType::RentalService.prefix(), "RS");
        assert_eq!(ScreenType::EmployeeSaleInvoice.prefix(), "RS");
    }

    #[test]
    fn test_rental_service_degradation() {
        let d = date(2025);
        assert_eq!(derive_series(ScreenType::RentalService, "", "", d), "RS-25");
        assert_eq!(derive_series(ScreenType::RentalService, "NAM", "", d), "RS-25NAM");
        assert_eq!(derive_series(ScreenType::RentalService, "", "JD", d), "RS-25-JD");
        assert_eq!(
            derive_series(ScreenType::RentalService, "NAM", "JD", d),
            "RS-25NAM-JD"
        );
    }

    #[test]
    fn test_monthly_bill_example() {
        let series = derive_series(
            ScreenType::RentalMonthlyBill,
            crate::branch::branch_short_name("Namakkal"),
            "JD",
            date(2025),
        );
        assert_eq!(series, "RMB-25NAM-JD");
    }

    #[test]
    fn test_sales_returns_format() {
        assert_eq!(
            derive_series(ScreenType::SalesReturns, "PAT", "Mo", date(2025)),
            "SRS-25PAT-Mo"
        );
    }

    #[test]
    fn test_default_format_degradation() {
        let screen = ScreenType::parse(Some("unknown"));
        let d = date(2025);
        assert_eq!(derive_series(screen, "PAT", "Mo", d), "RS25-26PAT-Mo");
        assert_eq!(derive_series(screen, "PAT", "", d), "RS25-26PAT");
        assert_eq!(derive_series(screen, "", "Mo", d), "RS25-26-Mo");
        assert_eq!(derive_series(screen, "", "", d), "RS25-26");
    }

    #[test]
    fn test_century_rollover() {
        let d = date(2099);
        assert_eq!(
            derive_series(ScreenType::EmployeeSaleInvoice, "", "", d),
            "RS99-00"
        );
        assert_eq!(derive_series(ScreenType::RentalService, "", "", date(2005)), "RS-05");
    }

    #[test]
    fn test_context_series() {
        let ctx = VoucherContext {
            screen: ScreenType::RentalService,
            branch_short_name: "SLM",
            employee_short_name: "AK",
            date: date(2026),
        };
        assert_eq!(ctx.series(), "RS-26SLM-AK");
    }

    #[test]
    fn test_preview_number() {
        assert_eq!(VoucherSeries::preview("RS-25", Some(41)).preview_number, 42);
        assert_eq!(VoucherSeries::preview("RS-25", None).preview_number, 1);

        let first = VoucherSeries::preview("RS-25", Some(7));
        let second = VoucherSeries::preview("RS-25", Some(7));
        assert_eq!(first, second);
    }

    #[test]
    fn test_financial_year_label() {
        let march = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let april = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert_eq!(financial_year_label(march), "2024-25");
        assert_eq!(financial_year_label(april), "2025-26");
    }

    #[test]
    fn test_voucher_series_json_shape() {
        let json = serde_json::to_value(VoucherSeries::preview("RMB-25NAM-JD", Some(9))).unwrap();
        assert_eq!(json["series"], "RMB-25NAM-JD");
        assert_eq!(json["previewNumber"], 10);
    }
}
