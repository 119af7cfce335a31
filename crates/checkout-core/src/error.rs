//! # Error Types
//!
//! Domain-specific error types for checkout-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  Discount tier (swallowed and reported in PricingResult.errors)        │
//! │  └── DiscountError    - One discount could not be applied              │
//! │                                                                         │
//! │  Systemic tier (aborts the whole calculation)                          │
//! │  ├── PricingError     - Bad input or config, tax provider failure      │
//! │  └── TaxProviderError - What a TaxProvider implementation returns      │
//! │                                                                         │
//! │  Shared                                                                │
//! │  ├── ValidationError  - Field-level rule violations                    │
//! │  └── ConfigError      - PricingConfig load/validation failures         │
//! │                                                                         │
//! │  Flow: ValidationError → DiscountError → errors[] (calculation goes on)│
//! │        ValidationError → PricingError  → caller (calculation aborted)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (discount handle, line item id, etc.)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Discount Error
// =============================================================================

/// A single discount could not be applied.
///
/// The pipeline catches these per discount, records them and keeps folding
/// the remaining discounts over an unchanged pool.
#[derive(Debug, Error)]
pub enum DiscountError {
    /// The discount's `extra` parameters are invalid (e.g. `qty <= 0`).
    #[error("Invalid parameters for discount '{handle}': {source}")]
    InvalidParameters {
        handle: String,
        #[source]
        source: ValidationError,
    },

    /// A bundle discount has no product filters, so it has no slots.
    #[error("Bundle discount '{0}' has no product filters to use as slots")]
    EmptyBundle(String),
}

// =============================================================================
// Pricing Error
// =============================================================================

/// Systemic failures that abort the whole calculation.
#[derive(Debug, Error)]
pub enum PricingError {
    /// The shipping price is not a parsable major-unit amount.
    #[error("Invalid shipping price '{value}': {reason}")]
    InvalidShippingPrice { value: String, reason: String },

    /// A line item breaks the caller contract (no price, negative quantity).
    #[error("Invalid line item '{id}': {source}")]
    InvalidLineItem {
        id: String,
        #[source]
        source: ValidationError,
    },

    /// The request exceeds the configured limits.
    #[error("Request rejected: {0}")]
    Validation(#[from] ValidationError),

    /// The tax provider rejected the calculation.
    #[error("Tax provider failed: {0}")]
    TaxProvider(#[from] TaxProviderError),

    /// The limits handed to the pipeline are inconsistent.
    #[error("Pricing configuration rejected: {0}")]
    Config(#[from] ConfigError),

    /// A running total left the range of `i64` cents.
    #[error("{0} is out of range")]
    AmountOverflow(String),
}

/// Errors returned by a [`crate::tax::TaxProvider`].
#[derive(Debug, Error)]
pub enum TaxProviderError {
    /// The provider refused to compute taxes for this address/order.
    #[error("Tax computation rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or answered garbage.
    #[error("Tax provider unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements. They are wrapped
/// by [`DiscountError`] or [`PricingError`] depending on who supplied the
/// offending value.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., unparsable decimal amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Config Error
// =============================================================================

/// Failures while loading or validating [`crate::config::PricingConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid configuration value.
    #[error("Invalid pricing configuration: {0}")]
    Invalid(String),

    /// Config file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with PricingError.
pub type CheckoutResult<T> = Result<T, PricingError>;

/// Convenience type alias for strategy results.
pub type DiscountResult<T> = Result<T, DiscountError>;

// =============================================================================
// Unit Tests
// =============================================================================
