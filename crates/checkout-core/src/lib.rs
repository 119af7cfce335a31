//! # checkout-core: Discount & Pricing Engine
//!
//! Given a cart, its eligible discounts and coupons, a shipping method and an
//! optional tax provider, this crate computes the final itemized price and
//! records how every discount contributed to it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout creation / pricing preview (callers)                          │
//! │        │ PricingRequest                                                 │
//! │  ┌─────▼───────────────────────────────────────────────────────────┐   │
//! │  │               ★ checkout-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   pipeline ──► strategies ──► reducer ──► filters               │   │
//! │  │      │            (5 algorithms)  (unit removal)  (predicates)   │   │
//! │  │      └──► tax::TaxProvider (injected, called once)              │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • NO SHARED STATE BETWEEN CALLS      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │        │ PricingResult (totals + evolution log + errors)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Line items, discounts, request and result types
//! - [`money`] - Money type with integer arithmetic, discount arithmetic
//! - [`filters`] - Product and order predicates (fail-closed)
//! - [`reducer`] - Pass masks and quantity removal
//! - [`strategies`] - Regular, Bulk, BuyXGetY, Bundle, Order
//! - [`pipeline`] - `calculate_pricing`
//! - [`tax`] - The tax provider capability
//! - [`config`] - Limits and output options
//! - [`validation`] - Rule checks
//! - [`error`] - Error types
//!
//! ## Example Usage
//!
//! ```rust
//! use checkout_core::money::Money;
//! use checkout_core::pipeline::calculate_pricing;
//! use checkout_core::types::{LineItem, PricingRequest};
//!
//! let request = PricingRequest {
//!     line_items: vec![LineItem::new("tee", 2, Money::from_cents(2500))],
//!     ..Default::default()
//! };
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let result = runtime.block_on(calculate_pricing(&request, None)).unwrap();
//! assert_eq!(result.total.cents(), 5000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod filters;
pub mod money;
pub mod pipeline;
pub mod reducer;
pub mod strategies;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::PricingConfig;
pub use error::{DiscountError, PricingError, TaxProviderError, ValidationError};
pub use filters::Filter;
pub use money::Money;
pub use pipeline::{calculate_pricing, calculate_pricing_with_config};
pub use tax::{FlatRateTaxProvider, TaxProvider};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum number of line items in one pricing request.
pub const MAX_CART_ITEMS: usize = 100;

/// Default maximum quantity of a single line item.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Default maximum number of discounts and coupons in one request.
pub const MAX_DISCOUNTS: usize = 50;

/// Default maximum unit price in cents ($1,000,000.00).
pub const MAX_UNIT_PRICE_CENTS: i64 = 100_000_000;
