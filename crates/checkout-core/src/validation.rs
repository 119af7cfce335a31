//! # Validation Module
//!
//! Rule checks for pricing inputs.
//!
//! ## Who Pays for a Failure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Targets                                 │
//! │                                                                         │
//! │  Discount parameters (qty, qty_x, qty_y, fixed)                         │
//! │  └── called by the strategy → DiscountError → errors[], fold goes on   │
//! │                                                                         │
//! │  Line items and request size (qty, price, limits)                       │
//! │  └── called by the pipeline → PricingError → calculation aborted       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `percent` is never rejected: it is clamped to `[0, 100]` when applied.

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{BulkParams, BundleParams, BuyXGetYParams, LineItem, OrderParams, RegularParams};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Primitive Validators
// =============================================================================

/// Validates a count that must be at least one (bulk size, X, Y).
pub fn validate_positive(field: &str, value: i64) -> ValidationResult<()> {
    if value <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a money amount that must not be negative.
pub fn validate_non_negative_money(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Discount Parameter Validators
// =============================================================================

pub fn validate_regular(params: &RegularParams) -> ValidationResult<()> {
    validate_non_negative_money("fixed", params.fixed)
}

/// ## Rules
/// - `qty` must be positive (a bulk of zero units never terminates)
/// - `fixed` must not be negative
///
/// ## Example
/// ```rust
/// use checkout_core::types::BulkParams;
/// use checkout_core::validation::validate_bulk;
///
/// assert!(validate_bulk(&BulkParams { qty: 3, ..Default::default() }).is_ok());
/// assert!(validate_bulk(&BulkParams { qty: 0, ..Default::default() }).is_err());
/// ```
pub fn validate_bulk(params: &BulkParams) -> ValidationResult<()> {
    validate_positive("qty", params.qty)?;
    validate_non_negative_money("fixed", params.fixed)
}

pub fn validate_buy_x_get_y(params: &BuyXGetYParams) -> ValidationResult<()> {
    validate_positive("qty_x", params.qty_x)?;
    validate_positive("qty_y", params.qty_y)?;
    validate_non_negative_money("fixed", params.fixed)
}

pub fn validate_bundle(params: &BundleParams) -> ValidationResult<()> {
    validate_non_negative_money("fixed", params.fixed)
}

pub fn validate_order(params: &OrderParams) -> ValidationResult<()> {
    validate_non_negative_money("fixed", params.fixed)
}

// =============================================================================
// Request Validators
// =============================================================================

/// Validates one line item against the caller contract.
///
/// ## Rules
/// - Quantity between 0 and `max_quantity`
/// - A price must resolve (`price` or `data.price`)
/// - Price between 0 and `max_unit_price`
pub fn validate_line_item(
    item: &LineItem,
    max_quantity: i64,
    max_unit_price: Money,
) -> ValidationResult<()> {
    if item.qty < 0 || item.qty > max_quantity {
        return Err(ValidationError::OutOfRange {
            field: "qty".to_string(),
            min: 0,
            max: max_quantity,
        });
    }

    let price = item.resolved_price().ok_or_else(|| ValidationError::Required {
        field: "price".to_string(),
    })?;
    validate_non_negative_money("price", price)?;
    if price > max_unit_price {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: max_unit_price.cents(),
        });
    }
    Ok(())
}

/// Validates a collection size against a configured maximum.
pub fn validate_max_len(field: &str, len: usize, max: usize) -> ValidationResult<()> {
    if len > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: max as i64,
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
    use crate::types::ProductSnapshot;

    const MAX_PRICE: Money = Money::from_cents(100_000_000);

    #[test]
    fn test_validate_bulk() {
        assert!(validate_bulk(&BulkParams { qty: 1, ..Default::default() }).is_ok());
        assert!(validate_bulk(&BulkParams { qty: 0, ..Default::default() }).is_err());
        assert!(validate_bulk(&BulkParams { qty: -2, ..Default::default() }).is_err());
        assert!(validate_bulk(&BulkParams {
            qty: 2,
            fixed: Money::from_cents(-1),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_validate_buy_x_get_y() {
        let ok = BuyXGetYParams { qty_x: 2, qty_y: 1, ..Default::default() };
        assert!(validate_buy_x_get_y(&ok).is_ok());

        let err = validate_buy_x_get_y(&BuyXGetYParams { qty_y: 0, ..ok.clone() }).unwrap_err();
        assert_eq!(err.to_string(), "qty_y must be positive");

        let err = validate_buy_x_get_y(&BuyXGetYParams { qty_x: 0, ..ok }).unwrap_err();
        assert_eq!(err.to_string(), "qty_x must be positive");
    }

    #[test]
    fn test_validate_line_item() {
        let item = LineItem::new("a", 2, Money::from_cents(100));
        assert!(validate_line_item(&item, 999, MAX_PRICE).is_ok());
        assert!(validate_line_item(&item.with_qty(0), 999, MAX_PRICE).is_ok());
        assert!(validate_line_item(&item.with_qty(-1), 999, MAX_PRICE).is_err());
        assert!(validate_line_item(&item.with_qty(1000), 999, MAX_PRICE).is_err());

        let unpriced = LineItem { price: None, ..item.clone() };
        assert!(validate_line_item(&unpriced, 999, MAX_PRICE).is_err());

        let priced_by_product = LineItem {
            price: None,
            data: Some(ProductSnapshot::bare("a", Some(Money::from_cents(5)))),
            ..item.clone()
        };
        assert!(validate_line_item(&priced_by_product, 999, MAX_PRICE).is_ok());

        let negative = LineItem { price: Some(Money::from_cents(-5)), ..item.clone() };
        assert!(validate_line_item(&negative, 999, MAX_PRICE).is_err());

        let at_cap = LineItem { price: Some(MAX_PRICE), ..item.clone() };
        assert!(validate_line_item(&at_cap, 999, MAX_PRICE).is_ok());

        let over_cap = LineItem { price: Some(Money::from_cents(i64::MAX / 2)), ..item };
        let err = validate_line_item(&over_cap, 999, MAX_PRICE).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { ref field, .. } if field == "price"));
    }

    #[test]
    fn test_validate_max_len() {
        assert!(validate_max_len("line_items", 100, 100).is_ok());
        assert!(validate_max_len("line_items", 101, 100).is_err());
    }
}
