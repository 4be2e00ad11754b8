//! # Error Types
//!
//! Domain-specific error types for duka-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  duka-core errors (this file)                                          │
//! │  ├── CoreError        - Ledger rule violations and conflicts           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  duka-db errors (separate crate)                                       │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── LedgerError      - CoreError | DbError, returned by the ledger    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Taxonomy
//! - **Validation**: bad quantity, missing customer - rejected before any
//!   mutation, surfaced verbatim.
//! - **Conflict**: already closed, not closed, day closed, unauthorized
//!   business - rejected, no partial state change.
//! - **Not found**: missing item/entry/sale/customer - rejected.
//!
//! Every ledger-mutating error is all-or-nothing: an error response means no
//! totals, stock, or debt balances were changed.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations and conflicts.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Requested quantity exceeds available stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Record sale (qty: 20)
    ///      │
    ///      ▼
    /// Check stock: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { name: "sugar", available: 5, requested: 20 }
    ///      │
    ///      ▼
    /// UI shows: "Only 5 sugar in stock"
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// A debt sale was recorded without selecting a customer.
    #[error("Customer must be selected for debt sales")]
    MissingCustomer,

    /// Inventory item cannot be found (or was deleted).
    #[error("Inventory item not found: {0}")]
    ItemNotFound(String),

    /// Daily entry cannot be found.
    #[error("Daily entry not found: {0}")]
    EntryNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Customer cannot be found for this business.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Close attempted on an entry that is already closed.
    ///
    /// Repeated close attempts after success are rejected, not silently
    /// repeated.
    #[error("Daily entry {0} is already closed")]
    AlreadyClosed(String),

    /// Reopen attempted on an entry that is not closed.
    #[error("Daily entry {0} is not closed")]
    NotClosed(String),

    /// A sale mutation was attempted against a closed business day.
    ///
    /// Reopen the entry first; a closed day's reconciled totals are
    /// authoritative and must not drift.
    #[error("Business day {date} is closed; reopen it before recording changes")]
    DayClosed { date: String },

    /// The row exists but belongs to a different business.
    #[error("Unauthorized: {entity} {id} does not belong to this business")]
    Unauthorized { entity: &'static str, id: String },

    /// An inventory item with this name already exists for the business.
    #[error("Item '{name}' already exists in inventory")]
    DuplicateItem { name: String },

    /// Quantity to decrement exceeds what the sale holds.
    #[error("Cannot remove {requested} units from a sale of {sold}")]
    DecrementTooLarge { requested: i64, sold: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an Unauthorized error for a given entity type and ID.
    pub fn unauthorized(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::Unauthorized {
            entity,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements; used for early
/// validation before any ledger logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., malformed phone number).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
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
            name: "sugar".to_string(),
            available: 5,
            requested: 20,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for sugar: available 5, requested 20"
        );

        let err = CoreError::unauthorized("Sale", "abc");
        assert_eq!(
            err.to_string(),
            "Unauthorized: Sale abc does not belong to this business"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
