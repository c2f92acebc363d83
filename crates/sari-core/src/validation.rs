//! # Validation Module
//!
//! Input validation for Sari POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (pure, before any storage work)                  │
//! │  ├── empty sale, missing borrower name, bad quantities/prices          │
//! │  └── returns ValidationError → DbError::InvalidArgument                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository transactions                                      │
//! │  ├── NotFound / InvalidState checks against live rows                  │
//! │  └── e.g. overpayment against the current outstanding balance          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite constraints (defense in depth, never relied on for    │
//! │  business rules)                                                       │
//! │  ├── CHECK (price_cents >= 0), CHECK (quantity >= 1)                   │
//! │  ├── UNIQUE borrower name (NOCASE), UNIQUE borrow per sale             │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::money::Money;
use crate::types::{ConfirmSale, CreateProduct};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most 200 characters
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a price. Zero is allowed (giveaway items); negative is not.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a line-item quantity (1 ..= MAX_ITEM_QUANTITY).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a repayment amount. Must be strictly positive; the balance
/// comparison happens in the ledger repository against the live row.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Payload Validators
// =============================================================================

/// Validates the shape of a confirm-sale payload.
///
/// ## Rules
/// - `items` must not be empty
/// - every quantity is within range
/// - credit methods (BORROW/PARTIAL) require a non-blank borrower name
///   and at least one item marked borrowed
pub fn validate_confirm_sale(payload: &ConfirmSale) -> ValidationResult<()> {
    if payload.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        });
    }

    for line in &payload.items {
        validate_quantity(line.quantity)?;
    }

    if payload.payment_method.is_credit() {
        let has_name = payload
            .borrower_name
            .as_deref()
            .map(str::trim)
            .is_some_and(|n| !n.is_empty());
        if !has_name {
            return Err(ValidationError::Required {
                field: "borrower_name".to_string(),
            });
        }

        if !payload.items.iter().any(|line| line.is_borrowed) {
            return Err(ValidationError::Empty {
                field: "borrowed items".to_string(),
            });
        }
    }

    Ok(())
}

/// Validates a create-product payload.
pub fn validate_create_product(payload: &CreateProduct) -> ValidationResult<()> {
    validate_product_name(&payload.name)?;
    validate_price(payload.price_cents)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PaymentMethod, SaleLine};

    fn line(product_id: &str, qty: i64, borrowed: bool) -> SaleLine {
        SaleLine {
            product_id: product_id.to_string(),
            quantity: qty,
            is_borrowed: borrowed,
        }
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Sardinas 155g").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name("   ").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::from_cents(0)).is_ok());
        assert!(validate_price(Money::from_cents(2550)).is_ok());
        assert!(validate_price(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_payment_amount() {
        assert!(validate_payment_amount(Money::from_cents(100)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
        assert!(validate_payment_amount(Money::from_cents(-5)).is_err());
    }

    #[test]
    fn test_confirm_sale_rejects_empty_items() {
        let payload = ConfirmSale {
            items: vec![],
            payment_method: PaymentMethod::Cash,
            borrower_name: None,
        };
        assert!(matches!(
            validate_confirm_sale(&payload),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn test_confirm_sale_credit_requires_borrower_name() {
        let payload = ConfirmSale {
            items: vec![line("p1", 1, true)],
            payment_method: PaymentMethod::Borrow,
            borrower_name: None,
        };
        assert!(matches!(
            validate_confirm_sale(&payload),
            Err(ValidationError::Required { .. })
        ));

        // Blank names count as missing
        let payload = ConfirmSale {
            borrower_name: Some("   ".to_string()),
            ..payload
        };
        assert!(validate_confirm_sale(&payload).is_err());
    }

    #[test]
    fn test_confirm_sale_credit_requires_borrowed_items() {
        let payload = ConfirmSale {
            items: vec![line("p1", 1, false)],
            payment_method: PaymentMethod::Borrow,
            borrower_name: Some("Aling Nena".to_string()),
        };
        assert!(matches!(
            validate_confirm_sale(&payload),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn test_confirm_sale_accepts_valid_payloads() {
        let cash = ConfirmSale {
            items: vec![line("p1", 2, false)],
            payment_method: PaymentMethod::Cash,
            borrower_name: None,
        };
        assert!(validate_confirm_sale(&cash).is_ok());

        let partial = ConfirmSale {
            items: vec![line("p1", 2, false), line("p2", 1, true)],
            payment_method: PaymentMethod::Partial,
            borrower_name: Some("Aling Nena".to_string()),
        };
        assert!(validate_confirm_sale(&partial).is_ok());
    }
}
