//! # Error Types
//!
//! Domain-specific error types for billing-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  billing-core errors (this file)                                       │
//! │  └── ValidationError  - Request validation failures (HTTP 400)         │
//! │                                                                         │
//! │  billing-db errors (separate crate)                                    │
//! │  └── DbError          - Pool, execution and lookup failures            │
//! │                                                                         │
//! │  billing-api errors (in app)                                           │
//! │  └── ApiError         - What the frontend sees (JSON envelope)         │
//! │                                                                         │
//! │  Flow: ValidationError / DbError → ApiError → Frontend                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Voucher derivation and branch lookup have no error paths; missing inputs
//! degrade to shorter strings instead.

use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when a request body or path parameter doesn't meet
/// requirements. They are raised before any database work starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Collection has too many entries.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., non-numeric id, malformed mobile number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::TooMany { field, .. }
            | ValidationError::MustBePositive { field }
            | ValidationError::Negative { field }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("username");
        assert_eq!(err.to_string(), "username is required");

        let err = ValidationError::TooLong {
            field: "customerName".to_string(),
            max: 100,
        };
        assert_eq!(err.to_string(), "customerName must be at most 100 characters");

        let err = ValidationError::invalid("id", "must be a whole number");
        assert_eq!(err.to_string(), "id has invalid format: must be a whole number");
    }

    #[test]
    fn test_field_accessor() {
        let err = ValidationError::MustBePositive {
            field: "items[0].quantity".to_string(),
        };
        assert_eq!(err.field(), "items[0].quantity");
    }
}
