//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Folding ten discounts over a cart in floating point:                   │
//! │    950.0 - 33.333... - 33.333... = 883.3333333333334  ❌                │
//! │                                                                         │
//! │  Then "rounding to 2 decimals" at the end hides where the cent went.    │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every discount amount is rounded to a whole cent when computed,     │
//! │    so every evolution step and every total is exactly 2 decimals.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use checkout_core::money::{apply_discount, Money};
//!
//! let price = Money::from_cents(10000); // $100.00
//!
//! // 10% off three units
//! let off = apply_discount(3, price, 10.0, Money::zero());
//! assert_eq!(off.cents(), 3000);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::{DiscountRate, TaxRate};

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: running subtotals are computed by subtraction
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serde**: serialized as a plain integer number of cents
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  LineItem.price ──┬──► pass mask / reducer ──► removed value           │
/// │                   │                                                     │
/// │                   └──► DiscountStrategy ──► total_discount             │
/// │                                                                         │
/// │  PricingResult.subtotal ──► TaxProvider ──► PricingResult.total        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Parses a decimal amount in major units (`"12.50"` → 1250 cents).
    ///
    /// ## Rules
    /// - Optional surrounding whitespace
    /// - A plain decimal with no more than two significant decimal places
    /// - Negative amounts are rejected
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    ///
    /// assert_eq!(Money::parse_major("12.5").unwrap().cents(), 1250);
    /// assert_eq!(Money::parse_major("7").unwrap().cents(), 700);
    /// assert!(Money::parse_major("1.234").is_err());
    /// assert!(Money::parse_major("-3").is_err());
    /// ```
    pub fn parse_major(input: &str) -> Result<Money, ValidationError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            });
        }

        let amount = Decimal::from_str(input).map_err(|e| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: e.to_string(),
        })?;
        Money::from_decimal(amount)
    }

    /// Converts a decimal amount in major units to cents, exactly.
    ///
    /// Negative amounts, amounts with sub-cent digits and amounts outside
    /// the `i64` cent range are rejected.
    pub fn from_decimal(amount: Decimal) -> Result<Money, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ValidationError::MustNotBeNegative {
                field: "amount".to_string(),
            });
        }
        if amount.normalize().scale() > 2 {
            return Err(invalid("at most two decimal places are allowed"));
        }

        amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|cents| cents.to_i64())
            .map(Money)
            .ok_or_else(|| invalid("amount is too large"))
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns the amount in major units for display (`1099` → `10.99`).
    ///
    /// Never feed this back into calculations.
    #[inline]
    pub fn to_major(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Calculates tax at the given rate, rounding half up to a whole cent.
    ///
    /// ## Example
    /// ```rust
    /// use checkout_core::money::Money;
    /// use checkout_core::types::TaxRate;
    ///
    /// let price = Money::from_cents(1000); // $10.00
    /// let rate = TaxRate::from_bps(825);   // 8.25%
    ///
    /// // $10.00 × 8.25% = $0.825 → $0.83
    /// assert_eq!(price.calculate_tax(rate).cents(), 83);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        Money::from_cents(mul_bps_rounded(self.0 as i128, rate.bps()) as i64)
    }
}

/// `amount * bps / 10000`, rounded half away from zero.
fn mul_bps_rounded(amount: i128, bps: u32) -> i128 {
    let scaled = amount * bps as i128;
    if scaled >= 0 {
        (scaled + 5000) / 10000
    } else {
        (scaled - 5000) / 10000
    }
}

// =============================================================================
// Discount Arithmetic
// =============================================================================

/// Computes the discount granted on `qty` units of `price`.
///
/// ## Formula
/// ```text
/// gross = price × qty
/// raw   = round(gross × percent / 100) + fixed × qty
/// out   = clamp(raw, 0, gross)
/// ```
/// `percent` is clamped to `[0, 100]` first (NaN counts as 0). `fixed` is a
/// per-unit amount; callers that want a per-group amount pass `qty = 1` and
/// the group total as `price`.
///
/// ## Example
/// ```rust
/// use checkout_core::money::{apply_discount, Money};
///
/// let price = Money::from_cents(500);
///
/// // 100% off is the whole line
/// assert_eq!(apply_discount(4, price, 100.0, Money::zero()).cents(), 2000);
///
/// // a fixed amount never exceeds the line value
/// assert_eq!(apply_discount(2, price, 0.0, Money::from_cents(900)).cents(), 1000);
/// ```
pub fn apply_discount(qty: i64, price: Money, percent: f64, fixed: Money) -> Money {
    let rate = DiscountRate::from_percent(percent);
    let gross = price.0 as i128 * qty as i128;
    let raw = mul_bps_rounded(gross, rate.bps()) + fixed.0 as i128 * qty as i128;

    let upper = gross.max(0);
    Money(raw.clamp(0, upper) as i64)
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs. Localized formatting belongs to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
