//! # Validation Module
//!
//! Input validation utilities for the Duka ledger.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (UI / API layer)                                      │
//! │  ├── Basic format checks, immediate user feedback                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                       │
//! │  ├── Runs before any ledger mutation                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / UNIQUE / CHECK constraints                             │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_NAME_LEN, MAX_SALE_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates and normalizes an inventory item name.
///
/// Names are stored trimmed and lowercased, unique per business; the
/// normalized form is what this function returns.
///
/// ## Example
/// ```rust
/// use duka_core::validation::normalize_item_name;
///
/// assert_eq!(normalize_item_name("  Sugar 1kg ").unwrap(), "sugar 1kg");
/// assert!(normalize_item_name("").is_err());
/// ```
pub fn normalize_item_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_ITEM_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_ITEM_NAME_LEN,
        });
    }

    Ok(name.to_lowercase())
}

/// Validates a customer phone number.
///
/// ## Rules
/// - Must not be empty
/// - Optional leading `+`
/// - 7 to 15 digits (spaces and hyphens are tolerated and ignored)
pub fn validate_phone_number(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone_number".to_string(),
        });
    }

    let digits: String = phone
        .strip_prefix('+')
        .unwrap_or(phone)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if !(7..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone_number".to_string(),
            reason: "expected 7-15 digits, optionally prefixed with +".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale/restock quantity.
///
/// ## Rules
/// - Must be positive
/// - Must not exceed [`MAX_SALE_QUANTITY`]
///
/// ## Example
/// ```rust
/// use duka_core::validation::validate_quantity;
///
/// assert!(validate_quantity(3).is_ok());
/// assert!(validate_quantity(0).is_err());
/// assert!(validate_quantity(-1).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_SALE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_SALE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents. Prices may be zero (giveaways) but never
/// negative.
pub fn validate_price(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_item_name() {
        assert_eq!(normalize_item_name("  Sugar 1KG ").unwrap(), "sugar 1kg");
        assert!(normalize_item_name("   ").is_err());
        assert!(normalize_item_name(&"a".repeat(121)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(9_999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(10_000).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price("retail_price", 0).is_ok());
        assert!(validate_price("retail_price", 10_000).is_ok());
        assert!(validate_price("cost_price", -1).is_err());
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("+254 712 345 678").is_ok());
        assert!(validate_phone_number("0712345678").is_ok());
        assert!(validate_phone_number("").is_err());
        assert!(validate_phone_number("12ab34").is_err());
        assert!(validate_phone_number("123").is_err());
    }
}
