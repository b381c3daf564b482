//! # Error Types
//!
//! Domain-specific error types for shelfwise-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  shelfwise-core errors (this file)                                     │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  shelfwise-db errors (separate crate)                                  │
//! │  └── DbError          - Database failures (wraps CoreError)            │
//! │                                                                         │
//! │  API errors (apps/api)                                                 │
//! │  └── ApiError         - What HTTP clients see (code + message)         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Client       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations. Repositories raise them
/// from inside transactions, which rolls the whole operation back.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock for a decrement.
    ///
    /// ## When This Occurs
    /// - Manual stock removal larger than the shelf quantity
    /// - Transfer out of a location that does not hold enough
    /// - Order line larger than the location's stock
    ///
    /// ## User Workflow
    /// ```text
    /// Remove stock (qty: 5)
    ///      │
    ///      ▼
    /// Guarded UPDATE affects 0 rows, level is 3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product_id} at {location_id}: available {available}, requested {requested}")]
    InsufficientStock {
        location_id: String,
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// A status transition not allowed by the document's state machine.
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        entity: String,
        from: String,
        to: String,
    },

    /// Stock transfer with identical source and destination.
    #[error("Cannot transfer stock to the same location: {0}")]
    SameLocationTransfer(String),

    /// Stock operation on a deactivated location.
    #[error("Location {0} is inactive")]
    LocationInactive(String),

    /// Operation referencing a deactivated product.
    #[error("Product {0} is inactive")]
    ProductInactive(String),

    /// Operation referencing a deactivated supplier.
    #[error("Supplier {0} is inactive")]
    SupplierInactive(String),

    /// GRN line receives more than is still outstanding on the PO line.
    #[error("Over-receipt on PO item {po_item_id}: outstanding {outstanding}, requested {requested}")]
    OverReceipt {
        po_item_id: String,
        outstanding: i64,
        requested: i64,
    },

    /// GRN line does not belong to the purchase order being received.
    #[error("Item {po_item_id} is not part of purchase order {purchase_order_id}")]
    UnknownPurchaseOrderItem {
        purchase_order_id: String,
        po_item_id: String,
    },

    /// Coupon exists but cannot be applied.
    #[error("Coupon {code} rejected: {reason}")]
    CouponRejected { code: String, reason: String },

    /// Petty cash expense larger than the float.
    #[error("Insufficient petty cash: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: i64, requested: i64 },

    /// Report period with `from >= to`.
    #[error("Invalid report period: {reason}")]
    InvalidPeriod { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidStatusTransition error.
    pub fn transition(
        entity: impl Into<String>,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        CoreError::InvalidStatusTransition {
            entity: entity.into(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Creates a CouponRejected error.
    pub fn coupon(code: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::CouponRejected {
            code: code.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid email, invalid code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Same key given twice in one document.
    #[error("{field} '{value}' appears more than once")]
    DuplicateLine { field: String, value: String },

    /// A document needs at least one line.
    #[error("{field} must contain at least one line")]
    Empty { field: String },

    /// A document has too many lines.
    #[error("{field} cannot have more than {max} lines")]
    TooManyLines { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            location_id: "main".to_string(),
            product_id: "TEE-001".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for TEE-001 at main: available 3, requested 5"
        );
    }

    #[test]
    fn test_transition_message() {
        let err = CoreError::transition("Purchase order", "completed", "approved");
        assert_eq!(
            err.to_string(),
            "Purchase order cannot move from completed to approved"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "sku".to_string(),
        };
        assert_eq!(err.to_string(), "sku is required");

        let err = ValidationError::DuplicateLine {
            field: "items".to_string(),
            value: "TEE/red/M".to_string(),
        };
        assert_eq!(err.to_string(), "items 'TEE/red/M' appears more than once");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "sku".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
