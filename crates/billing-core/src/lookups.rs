//! # Static Lookups
//!
//! Fixed option lists served to the billing screens' dropdowns. They are not
//! stored in the database.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::branch::{branch_names, branch_short_name};
use crate::voucher::ScreenType;

/// One dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

impl DropdownOption {
    fn new(value: &str, label: &str) -> Self {
        DropdownOption {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// All dropdown lists used by the transaction screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DropdownOptions {
    pub transaction_types: Vec<DropdownOption>,
    pub payment_modes: Vec<DropdownOption>,
    pub screen_types: Vec<DropdownOption>,
    pub rental_periods: Vec<DropdownOption>,
    pub gst_rates: Vec<DropdownOption>,
    /// Value is the short code used in voucher series.
    pub branches: Vec<DropdownOption>,
}

const TRANSACTION_TYPES: &[(&str, &str)] = &[
    ("Sale", "Sale"),
    ("Rental", "Rental"),
    ("MonthlyBill", "Monthly Bill"),
    ("Return", "Sales Return"),
];

const PAYMENT_MODES: &[(&str, &str)] = &[
    ("Cash", "Cash"),
    ("Card", "Card"),
    ("UPI", "UPI"),
    ("Cheque", "Cheque"),
    ("Credit", "Credit"),
];

const RENTAL_PERIODS: &[(&str, &str)] = &[
    ("Daily", "Per Day"),
    ("Weekly", "Per Week"),
    ("Monthly", "Per Month"),
];

const GST_RATES: &[(&str, &str)] = &[
    ("0", "0%"),
    ("5", "5%"),
    ("12", "12%"),
    ("18", "18%"),
    ("28", "28%"),
];

fn options(table: &[(&str, &str)]) -> Vec<DropdownOption> {
    table
        .iter()
        .map(|(value, label)| DropdownOption::new(value, label))
        .collect()
}

/// Builds the dropdown option lists.
pub fn dropdown_options() -> DropdownOptions {
    DropdownOptions {
        transaction_types: options(TRANSACTION_TYPES),
        payment_modes: options(PAYMENT_MODES),
        screen_types: ScreenType::ALL
            .into_iter()
            .map(|screen| DropdownOption::new(screen.as_str(), screen.as_str()))
            .collect(),
        rental_periods: options(RENTAL_PERIODS),
        gst_rates: options(GST_RATES),
        branches: branch_names()
            .map(|name| DropdownOption::new(branch_short_name(name), name))
            .collect(),
    }
}

/// Default payment mode pre-selected on every billing screen.
pub const DEFAULT_PAYMENT_MODE: &str = "Cash";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropdown_lists_are_populated() {
        let opts = dropdown_options();
        assert_eq!(opts.payment_modes.len(), PAYMENT_MODES.len());
        assert_eq!(opts.screen_types.len(), 4);
        assert!(opts
            .payment_modes
            .iter()
            .any(|o| o.value == DEFAULT_PAYMENT_MODE));
    }

    #[test]
    fn test_every_screen_transaction_type_is_listed() {
        let opts = dropdown_options();
        for screen in ScreenType::ALL {
            assert!(
                opts.transaction_types
                    .iter()
                    .any(|o| o.value == screen.transaction_type()),
                "{screen} transaction type missing"
            );
        }
    }

    #[test]
    fn test_branches_carry_short_codes() {
        let opts = dropdown_options();
        assert_eq!(opts.branches.len(), branch_names().count());
        assert_eq!(
            opts.branches[0],
            DropdownOption::new("NAM", "Namakkal")
        );
        assert!(opts.branches.iter().all(|o| !o.value.is_empty()));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(dropdown_options()).unwrap();
        assert!(json["transactionTypes"].is_array());
        assert_eq!(json["gstRates"][2]["label"], "12%");
    }
}
