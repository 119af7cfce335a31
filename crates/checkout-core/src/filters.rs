//! # Filter Evaluator
//!
//! Discount targeting predicates and their evaluation.
//!
//! ## Filter Families
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PRODUCT filters (tested per line item)   ORDER filters (tested once)  │
//! │  ─────────────────────────────────────    ──────────────────────────── │
//! │  p-all                                    o-date-in-range              │
//! │  p-in-price-range                         o-has-customer               │
//! │  p-in-collections / p-not-in-collections  o-items-count-in-range       │
//! │  p-in-products    / p-not-in-products     o-subtotal-in-range          │
//! │  p-in-tags        / p-not-in-tags                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fail-Closed
//! A filter that cannot be evaluated (missing price, inverted range, wrong
//! family) does not match. A list of filters matches only if it contains at
//! least one filter of the family being tested and all of them match, so a
//! discount without product filters never touches line items.
//!
//! ## Wire Format
//! ```json
//! { "op": "p-in-tags", "value": ["summer", "sale"] }
//! { "op": "o-subtotal-in-range", "value": { "from": 30000 } }
//! { "op": "p-all" }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use ts_rs::TS;

use crate::money::Money;
use crate::types::{OrderContext, ProductSnapshot};

// =============================================================================
// Filter Definitions
// =============================================================================

/// Which side of the order a filter looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScope {
    Product,
    Order,
}

/// Inclusive money range; missing bounds are open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MoneyRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Money>,
}

/// Inclusive quantity range; missing bounds are open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CountRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<i64>,
}

/// Inclusive time window. `from` defaults to the epoch, `to` to "now".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

/// A discount targeting predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "op", content = "value", rename_all = "kebab-case")]
pub enum Filter {
    /// Every product.
    PAll,
    /// Unit price within the range (cents, inclusive).
    PInPriceRange(MoneyRange),
    /// Product belongs to any of these collections.
    PInCollections(Vec<String>),
    /// Product belongs to none of these collections.
    PNotInCollections(Vec<String>),
    /// Product handle is one of these.
    PInProducts(Vec<String>),
    /// Product handle is none of these.
    PNotInProducts(Vec<String>),
    /// Product has any of these tags.
    PInTags(Vec<String>),
    /// Product has none of these tags.
    PNotInTags(Vec<String>),

    /// Evaluation instant within the window.
    ODateInRange(DateRange),
    /// Customer id is one of these.
    OHasCustomer(Vec<String>),
    /// Cart quantity within the range.
    OItemsCountInRange(CountRange),
    /// Running subtotal within the range.
    OSubtotalInRange(MoneyRange),
}

impl Filter {
    /// Which family this filter belongs to.
    pub fn scope(&self) -> FilterScope {
        match self {
            Filter::PAll
            | Filter::PInPriceRange(_)
            | Filter::PInCollections(_)
            | Filter::PNotInCollections(_)
            | Filter::PInProducts(_)
            | Filter::PNotInProducts(_)
            | Filter::PInTags(_)
            | Filter::PNotInTags(_) => FilterScope::Product,
            Filter::ODateInRange(_)
            | Filter::OHasCustomer(_)
            | Filter::OItemsCountInRange(_)
            | Filter::OSubtotalInRange(_) => FilterScope::Order,
        }
    }

    /// Wire name of the operation.
    pub fn op(&self) -> &'static str {
        match self {
            Filter::PAll => "p-all",
            Filter::PInPriceRange(_) => "p-in-price-range",
            Filter::PInCollections(_) => "p-in-collections",
            Filter::PNotInCollections(_) => "p-not-in-collections",
            Filter::PInProducts(_) => "p-in-products",
            Filter::PNotInProducts(_) => "p-not-in-products",
            Filter::PInTags(_) => "p-in-tags",
            Filter::PNotInTags(_) => "p-not-in-tags",
            Filter::ODateInRange(_) => "o-date-in-range",
            Filter::OHasCustomer(_) => "o-has-customer",
            Filter::OItemsCountInRange(_) => "o-items-count-in-range",
            Filter::OSubtotalInRange(_) => "o-subtotal-in-range",
        }
    }

    #[inline]
    pub fn is_product(&self) -> bool {
        self.scope() == FilterScope::Product
    }

    #[inline]
    pub fn is_order(&self) -> bool {
        self.scope() == FilterScope::Order
    }
}

// =============================================================================
// Evaluation Errors
// =============================================================================

/// Why a single filter could not be evaluated. Never leaves this module.
#[derive(Debug, Error)]
enum FilterError {
    #[error("product '{0}' has no price")]
    MissingPrice(String),

    #[error("range is inverted ({from} > {to})")]
    InvertedRange { from: String, to: String },

    #[error("{0} filter tested against the wrong target")]
    WrongScope(&'static str),
}

fn check_order<T: PartialOrd + ToString>(from: &T, to: &T) -> Result<(), FilterError> {
    if from > to {
        return Err(FilterError::InvertedRange {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Product Filters
// =============================================================================

fn any_in(haystack: &[String], needles: &[String]) -> bool {
    haystack.iter().any(|value| needles.contains(value))
}

fn eval_product(filter: &Filter, product: &ProductSnapshot) -> Result<bool, FilterError> {
    match filter {
        Filter::PAll => Ok(true),
        Filter::PInPriceRange(range) => {
            let price = product
                .price
                .ok_or_else(|| FilterError::MissingPrice(product.handle.clone()))?;
            let from = range.from.unwrap_or_default();
            match range.to {
                Some(to) => {
                    check_order(&from, &to)?;
                    Ok(from <= price && price <= to)
                }
                None => Ok(from <= price),
            }
        }
        Filter::PInCollections(handles) => Ok(any_in(&product.collections, handles)),
        Filter::PNotInCollections(handles) => Ok(!any_in(&product.collections, handles)),
        Filter::PInProducts(handles) => Ok(handles.contains(&product.handle)),
        Filter::PNotInProducts(handles) => Ok(!handles.contains(&product.handle)),
        Filter::PInTags(tags) => Ok(any_in(&product.tags, tags)),
        Filter::PNotInTags(tags) => Ok(!any_in(&product.tags, tags)),
        Filter::ODateInRange(_)
        | Filter::OHasCustomer(_)
        | Filter::OItemsCountInRange(_)
        | Filter::OSubtotalInRange(_) => Err(FilterError::WrongScope(filter.op())),
    }
}

/// Tests one product filter. Evaluation failures count as "no match".
pub fn test_product_filter(filter: &Filter, product: &ProductSnapshot) -> bool {
    eval_product(filter, product).unwrap_or_else(|err| {
        debug!(op = filter.op(), product = %product.handle, error = %err, "Product filter failed closed");
        false
    })
}

/// Tests the product filters of a list (order filters are ignored).
///
/// Returns `false` when the list holds no product filter at all; otherwise
/// every product filter must match.
pub fn test_product_filters(filters: &[Filter], product: &ProductSnapshot) -> bool {
    let mut product_filters = filters.iter().filter(|f| f.is_product()).peekable();
    if product_filters.peek().is_none() {
        return false;
    }
    product_filters.all(|filter| test_product_filter(filter, product))
}

// =============================================================================
// Order Filters
// =============================================================================

fn eval_order(filter: &Filter, ctx: &OrderContext) -> Result<bool, FilterError> {
    match filter {
        Filter::ODateInRange(range) => {
            let from = range.from.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            let to = range.to.unwrap_or(ctx.now);
            check_order(&from, &to)?;
            Ok(from <= ctx.now && ctx.now <= to)
        }
        Filter::OHasCustomer(uids) => Ok(ctx
            .uid
            .as_ref()
            .map(|uid| uids.contains(uid))
            .unwrap_or(false)),
        Filter::OItemsCountInRange(range) => {
            let from = range.from.unwrap_or(0);
            match range.to {
                Some(to) => {
                    check_order(&from, &to)?;
                    Ok(from <= ctx.quantity_total && ctx.quantity_total <= to)
                }
                None => Ok(from <= ctx.quantity_total),
            }
        }
        Filter::OSubtotalInRange(range) => {
            let from = range.from.unwrap_or_default();
            match range.to {
                Some(to) => {
                    check_order(&from, &to)?;
                    Ok(from <= ctx.subtotal && ctx.subtotal <= to)
                }
                None => Ok(from <= ctx.subtotal),
            }
        }
        Filter::PAll
        | Filter::PInPriceRange(_)
        | Filter::PInCollections(_)
        | Filter::PNotInCollections(_)
        | Filter::PInProducts(_)
        | Filter::PNotInProducts(_)
        | Filter::PInTags(_)
        | Filter::PNotInTags(_) => Err(FilterError::WrongScope(filter.op())),
    }
}

/// Tests one order filter. Evaluation failures count as "no match".
pub fn test_order_filter(filter: &Filter, ctx: &OrderContext) -> bool {
    eval_order(filter, ctx).unwrap_or_else(|err| {
        debug!(op = filter.op(), error = %err, "Order filter failed closed");
        false
    })
}

/// Tests the order filters of a list (product filters are ignored).
///
/// Returns `false` when the list holds no order filter at all; otherwise
/// every order filter must match.
pub fn test_order_filters(filters: &[Filter], ctx: &OrderContext) -> bool {
    let mut order_filters = filters.iter().filter(|f| f.is_order()).peekable();
    if order_filters.peek().is_none() {
        return false;
    }
    order_filters.all(|filter| test_order_filter(filter, ctx))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn product(handle: &str, cents: Option<i64>, collections: &[&str], tags: &[&str]) -> ProductSnapshot {
        ProductSnapshot {
            handle: handle.to_string(),
            title: None,
            price: cents.map(Money::from_cents),
            collections: collections.iter().map(|s| s.to_string()).collect(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn ctx(subtotal: i64, quantity_total: i64) -> OrderContext {
        OrderContext {
            uid: Some("cus_1".to_string()),
            subtotal: Money::from_cents(subtotal),
            total: Money::from_cents(subtotal),
            quantity_total,
            now: Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_p_all() {
        assert!(test_product_filter(&Filter::PAll, &product("a", None, &[], &[])));
    }

    #[test]
    fn test_price_range_is_inclusive() {
        let p = product("a", Some(1000), &[], &[]);
        let range = |from: Option<i64>, to: Option<i64>| {
            Filter::PInPriceRange(MoneyRange {
                from: from.map(Money::from_cents),
                to: to.map(Money::from_cents),
            })
        };

        assert!(test_product_filter(&range(Some(1000), Some(1000)), &p));
        assert!(test_product_filter(&range(None, None), &p));
        assert!(test_product_filter(&range(Some(500), None), &p));
        assert!(!test_product_filter(&range(Some(1001), None), &p));
        assert!(!test_product_filter(&range(None, Some(999)), &p));
    }

    #[test]
    fn test_price_range_fails_closed() {
        let filter = Filter::PInPriceRange(MoneyRange::default());
        assert!(!test_product_filter(&filter, &product("a", None, &[], &[])));

        let inverted = Filter::PInPriceRange(MoneyRange {
            from: Some(Money::from_cents(2000)),
            to: Some(Money::from_cents(1000)),
        });
        assert!(!test_product_filter(&inverted, &product("a", Some(1500), &[], &[])));
    }

    #[test]
    fn test_collections() {
        let p = product("a", Some(100), &["summer", "shirts"], &[]);
        assert!(test_product_filter(&Filter::PInCollections(strings(&["shirts", "pants"])), &p));
        assert!(!test_product_filter(&Filter::PInCollections(strings(&["pants"])), &p));
        assert!(test_product_filter(&Filter::PNotInCollections(strings(&["pants"])), &p));
        assert!(!test_product_filter(&Filter::PNotInCollections(strings(&["summer"])), &p));

        let orphan = product("b", Some(100), &[], &[]);
        assert!(test_product_filter(&Filter::PNotInCollections(strings(&["summer"])), &orphan));
        assert!(!test_product_filter(&Filter::PInCollections(strings(&["summer"])), &orphan));
    }

    #[test]
    fn test_products_and_tags() {
        let p = product("red-tee", Some(100), &[], &["regular"]);
        assert!(test_product_filter(&Filter::PInProducts(strings(&["red-tee"])), &p));
        assert!(!test_product_filter(&Filter::PNotInProducts(strings(&["red-tee"])), &p));
        assert!(test_product_filter(&Filter::PInTags(strings(&["regular"])), &p));
        assert!(!test_product_filter(&Filter::PNotInTags(strings(&["regular", "x"])), &p));

        let untagged = product("blue-tee", Some(100), &[], &[]);
        assert!(test_product_filter(&Filter::PNotInTags(strings(&["regular"])), &untagged));
    }

    #[test]
    fn test_product_filters_empty_list_fails() {
        let p = product("a", Some(100), &[], &[]);
        assert!(!test_product_filters(&[], &p));

        // order filters alone do not count
        let only_order = [Filter::OHasCustomer(strings(&["cus_1"]))];
        assert!(!test_product_filters(&only_order, &p));
    }

    #[test]
    fn test_product_filters_and_semantics() {
        let p = product("a", Some(100), &["summer"], &["sale"]);
        let both = [
            Filter::PInCollections(strings(&["summer"])),
            Filter::PInTags(strings(&["sale"])),
            Filter::OHasCustomer(strings(&["nobody"])),
        ];
        assert!(test_product_filters(&both, &p));

        let one_fails = [
            Filter::PInCollections(strings(&["summer"])),
            Filter::PInTags(strings(&["clearance"])),
        ];
        assert!(!test_product_filters(&one_fails, &p));
    }

    #[test]
    fn test_wrong_scope_fails_closed() {
        let p = product("a", Some(100), &[], &[]);
        assert!(!test_product_filter(&Filter::OHasCustomer(strings(&["cus_1"])), &p));
        assert!(!test_order_filter(&Filter::PAll, &ctx(100, 1)));
    }

    #[test]
    fn test_subtotal_range_is_inclusive() {
        let filter = Filter::OSubtotalInRange(MoneyRange {
            from: Some(Money::from_cents(30000)),
            to: None,
        });
        assert!(test_order_filter(&filter, &ctx(30000, 1)));
        assert!(!test_order_filter(&filter, &ctx(29999, 1)));
    }

    #[test]
    fn test_items_count_enforces_upper_bound() {
        let filter = Filter::OItemsCountInRange(CountRange {
            from: Some(2),
            to: Some(5),
        });
        assert!(!test_order_filter(&filter, &ctx(100, 1)));
        assert!(test_order_filter(&filter, &ctx(100, 2)));
        assert!(test_order_filter(&filter, &ctx(100, 5)));
        assert!(!test_order_filter(&filter, &ctx(100, 6)));

        let open = Filter::OItemsCountInRange(CountRange {
            from: Some(2),
            to: None,
        });
        assert!(test_order_filter(&open, &ctx(100, 600)));
    }

    #[test]
    fn test_date_window() {
        let c = ctx(100, 1);
        let open = Filter::ODateInRange(DateRange::default());
        assert!(test_order_filter(&open, &c));

        let past = Filter::ODateInRange(DateRange {
            from: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
        });
        assert!(!test_order_filter(&past, &c));

        let future_start = Filter::ODateInRange(DateRange {
            from: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
            to: None,
        });
        assert!(!test_order_filter(&future_start, &c));
    }

    #[test]
    fn test_has_customer() {
        let filter = Filter::OHasCustomer(strings(&["cus_1", "cus_2"]));
        assert!(test_order_filter(&filter, &ctx(100, 1)));

        let anonymous = OrderContext { uid: None, ..ctx(100, 1) };
        assert!(!test_order_filter(&filter, &anonymous));
    }

    #[test]
    fn test_order_filters_empty_list_fails() {
        assert!(!test_order_filters(&[], &ctx(100, 1)));
        assert!(!test_order_filters(&[Filter::PAll], &ctx(100, 1)));
    }

    #[test]
    fn test_wire_format() {
        let filter: Filter =
            serde_json::from_str(r#"{ "op": "p-in-tags", "value": ["sale"] }"#).unwrap();
        assert_eq!(filter, Filter::PInTags(strings(&["sale"])));

        let filter: Filter = serde_json::from_str(r#"{ "op": "p-all" }"#).unwrap();
        assert_eq!(filter, Filter::PAll);

        let filter: Filter =
            serde_json::from_str(r#"{ "op": "o-subtotal-in-range", "value": { "from": 30000 } }"#)
                .unwrap();
        assert_eq!(filter.scope(), FilterScope::Order);
    }
}
