//! # Domain Types
//!
//! Types flowing into and out of the pricing pipeline.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  INPUT                                                                  │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    LineItem     │   │    Discount     │   │ ShippingMethod  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id, qty        │   │  handle         │   │  price (cents   │       │
//! │  │  price?         │   │  priority       │   │   or "12.50")   │       │
//! │  │  data? (product)│   │  details        │   └─────────────────┘       │
//! │  └─────────────────┘   │  filters[]      │                             │
//! │                        └─────────────────┘                             │
//! │  OUTPUT                                                                 │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  PricingResult  │──►│ EvolutionEntry  │   │ DiscountFailure │       │
//! │  │  totals, taxes  │   │ one per folded  │   │ one per broken  │       │
//! │  │  errors[]       │   │ discount        │   │ discount        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is constructed fresh for one calculation and dropped
//! afterwards; nothing is shared across calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::filters::Filter;
use crate::money::Money;

// =============================================================================
// Rates
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 825 bps = 8.25%
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// A percentage discount in basis points, always within `[0, 10000]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscountRate(u32);

impl DiscountRate {
    /// Converts a percent (`12.5` = 12.5%) into a rate, clamping to `[0, 100]`.
    ///
    /// NaN counts as zero.
    pub fn from_percent(percent: f64) -> Self {
        if percent.is_nan() {
            return DiscountRate(0);
        }
        DiscountRate((percent.clamp(0.0, 100.0) * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

// =============================================================================
// Line Items
// =============================================================================

/// The product data a line item was priced from.
///
/// Only the fields the product filters look at are modelled; the rest of
/// the catalogue record stays with the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSnapshot {
    /// Product handle (unique, human readable).
    pub handle: String,

    /// Display title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Catalogue price in cents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,

    /// Handles of the collections the product belongs to.
    #[serde(default)]
    pub collections: Vec<String>,

    /// Product tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ProductSnapshot {
    /// A snapshot for a line item that arrived without product data.
    pub fn bare(handle: &str, price: Option<Money>) -> Self {
        ProductSnapshot {
            handle: handle.to_string(),
            price,
            ..Default::default()
        }
    }
}

/// A cart entry: a product at a resolved unit price and a quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    /// Line item id (usually the product id).
    pub id: String,

    /// Quantity, never negative.
    pub qty: i64,

    /// Unit price in cents. Falls back to `data.price` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,

    /// Product snapshot used by product filters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ProductSnapshot>,
}

impl LineItem {
    /// Creates a line item with an explicit price and no product data.
    pub fn new(id: impl Into<String>, qty: i64, price: Money) -> Self {
        LineItem {
            id: id.into(),
            qty,
            price: Some(price),
            data: None,
        }
    }

    /// Attaches a product snapshot.
    pub fn with_product(mut self, product: ProductSnapshot) -> Self {
        self.data = Some(product);
        self
    }

    /// Unit price: `price`, else `data.price`.
    pub fn resolved_price(&self) -> Option<Money> {
        self.price
            .or_else(|| self.data.as_ref().and_then(|product| product.price))
    }

    /// Unit price, treating an unresolvable price as zero.
    ///
    /// The pipeline rejects unpriced items before any strategy runs, so
    /// inside the engine this is always the real price.
    pub fn unit_price(&self) -> Money {
        self.resolved_price().unwrap_or_default()
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price() * self.qty
    }

    /// Copy of this item carrying a different quantity.
    pub fn with_qty(&self, qty: i64) -> Self {
        LineItem {
            qty,
            ..self.clone()
        }
    }
}

/// Sum of quantities.
pub fn total_quantity(items: &[LineItem]) -> i64 {
    items.iter().map(|item| item.qty).sum()
}

/// Sum of line totals.
pub fn total_value(items: &[LineItem]) -> Money {
    items.iter().map(LineItem::line_total).sum()
}

// =============================================================================
// Discounts
// =============================================================================

/// How a discount becomes eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountApplication {
    /// Evaluated for every checkout.
    Auto,
    /// A coupon: evaluated only when its handle is requested.
    Manual,
}

/// A discount or coupon definition, as supplied by the discount store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Discount {
    pub id: String,

    /// Handle; for coupons this is the code the customer types.
    pub handle: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub active: bool,

    /// Lower runs first within its group.
    #[serde(default)]
    pub priority: i64,

    pub application: DiscountApplication,

    pub details: DiscountDetails,

    #[serde(default)]
    pub filters: Vec<Filter>,
}

impl Discount {
    /// Lightweight reference recorded in the evolution log.
    pub fn to_ref(&self) -> DiscountRef {
        DiscountRef {
            id: self.id.clone(),
            handle: self.handle.clone(),
            title: self.title.clone(),
            kind: self.details.kind().to_string(),
        }
    }
}

/// The discount algorithm and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "extra", rename_all = "snake_case")]
pub enum DiscountDetails {
    /// Per-unit discount on every matching item.
    Regular(RegularParams),
    /// Discount on groups of `qty` matching units.
    Bulk(BulkParams),
    /// Buy `qty_x` matching units, get `qty_y` reward units discounted.
    BuyXGetY(BuyXGetYParams),
    /// One unit per product filter, discounted together.
    Bundle(BundleParams),
    /// Discount on the order subtotal.
    Order(OrderParams),
}

impl DiscountDetails {
    /// Stable name of the algorithm, for logs and the evolution log.
    pub fn kind(&self) -> &'static str {
        match self {
            DiscountDetails::Regular(_) => "regular",
            DiscountDetails::Bulk(_) => "bulk",
            DiscountDetails::BuyXGetY(_) => "buy_x_get_y",
            DiscountDetails::Bundle(_) => "bundle",
            DiscountDetails::Order(_) => "order",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RegularParams {
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub fixed: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BulkParams {
    pub qty: i64,
    #[serde(default)]
    pub percent: f64,
    /// Fixed amount off per bulk.
    #[serde(default)]
    pub fixed: Money,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BuyXGetYParams {
    pub qty_x: i64,
    pub qty_y: i64,
    #[serde(default)]
    pub percent: f64,
    /// Fixed amount off per completed deal.
    #[serde(default)]
    pub fixed: Money,
    #[serde(default)]
    pub recursive: bool,
    /// Product filters selecting the reward units.
    #[serde(default)]
    pub filters_y: Vec<Filter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BundleParams {
    #[serde(default)]
    pub percent: f64,
    /// Fixed amount off per completed bundle.
    #[serde(default)]
    pub fixed: Money,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderParams {
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub fixed: Money,
    /// Carried through for the shipping step; not applied here.
    #[serde(default)]
    pub free_shipping: bool,
}

/// What the evolution log remembers about a folded discount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountRef {
    pub id: String,
    pub handle: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Algorithm name (`regular`, `bulk`, ...).
    pub kind: String,
}

// =============================================================================
// Shipping & Tax
// =============================================================================

/// Shipping price as sent by callers, in major units either way.
///
/// `50`, `50.0` and `"50"` all mean 50.00; `12.5` and `"12.50"` mean 12.50.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum ShippingPrice {
    /// A JSON number.
    Number(f64),
    /// A numeric string, e.g. `"12.50"`.
    Text(String),
}

impl Default for ShippingPrice {
    fn default() -> Self {
        ShippingPrice::Number(0.0)
    }
}

/// The selected shipping method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShippingMethod {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub price: ShippingPrice,
}

/// Destination address, forwarded untouched to the tax provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street1: Option<String>,
}

/// One tax line returned by a tax provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tax {
    pub name: String,
    pub value: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// =============================================================================
// Order Context
// =============================================================================

/// Aggregate view of the order that order-level filters are tested against.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderContext {
    /// Customer id, if the checkout is not anonymous.
    pub uid: Option<String>,
    /// Running subtotal at the moment the discount is evaluated.
    pub subtotal: Money,
    /// Running total (subtotal + shipping).
    pub total: Money,
    /// Quantity of the original cart.
    pub quantity_total: i64,
    /// Evaluation instant for date windows.
    pub now: DateTime<Utc>,
}

// =============================================================================
// Request & Result
// =============================================================================

/// Everything one pricing calculation needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingRequest {
    pub line_items: Vec<LineItem>,

    #[serde(default)]
    pub auto_discounts: Vec<Discount>,

    /// Candidate coupons (usually looked up by the requested handles).
    #[serde(default)]
    pub coupons: Vec<Discount>,

    /// Coupon handles the customer asked for.
    #[serde(default)]
    pub requested_coupons: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_method: Option<ShippingMethod>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,

    /// Evaluation instant; defaults to the current time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub now: Option<DateTime<Utc>>,
}

/// One fold step of the pricing pipeline. Index 0 is the baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EvolutionEntry {
    /// Pool of units still available to later discounts.
    pub line_items_next: Vec<LineItem>,

    /// Units this step consumed from the pool.
    pub line_items_discounted: Vec<LineItem>,

    /// Money taken off by this step.
    pub total_discount: Money,

    /// Running count of distinct cart units that received a discount.
    /// A unit hit by several discounts counts once.
    pub quantity_discounted: i64,

    /// Units still in the pool after this step.
    pub quantity_undiscounted: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<DiscountRef>,

    /// Running subtotal after this step.
    pub subtotal: Money,

    /// Running total after this step.
    pub total: Money,
}

/// A discount the pipeline skipped because it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountFailure {
    pub discount_code: String,
    pub message: String,
}

/// The itemized outcome of a pricing calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PricingResult {
    /// Audit log, baseline first.
    pub evo: Vec<EvolutionEntry>,

    pub subtotal_undiscounted: Money,

    pub subtotal_discount: Money,

    pub subtotal: Money,

    /// Coerced shipping price.
    pub shipping: Money,

    pub total: Money,

    pub total_without_taxes: Money,

    pub quantity_total: i64,

    /// Distinct cart units that received a discount, at most `quantity_total`.
    pub quantity_discounted: i64,

    /// Handles of coupons that were folded without error.
    #[serde(default)]
    pub coupons: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxes: Option<Vec<Tax>>,

    #[serde(default)]
    pub errors: Vec<DiscountFailure>,
}

// =============================================================================
// Unit Tests
// =============================================================================
