//! # Pricing Pipeline
//!
//! Turns a cart, its eligible discounts and a shipping method into an
//! itemized, auditable price.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. validate config + request (limits, line items)   ── Err → abort    │
//! │  2. auto discounts: active + Auto, by priority                         │
//! │  3. coupons: active + Manual + requested, by priority                  │
//! │  4. order = autos then coupons (autos ALWAYS first)                    │
//! │  5. shipping price → cents                           ── Err → abort    │
//! │  6. line items: resolve prices, sort by price descending               │
//! │  7. evo[0] = baseline                                                  │
//! │  8. fold each discount over evo.last().line_items_next                 │
//! │        Ok  → update totals, count newly discounted units, push entry   │
//! │        Err → push DiscountFailure, pool unchanged, keep folding        │
//! │  9. TaxProvider::compute once                        ── Err → abort    │
//! │ 10. strip product snapshots from the evolution log                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The fold is sequential on purpose: discount order and the order in which
//! units are consumed decide the result.
//!
//! `quantity_discounted` counts distinct cart units: a unit hit by two
//! stacked discounts is counted once, so it never exceeds `quantity_total`.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::PricingConfig;
use crate::error::{CheckoutResult, PricingError};
use crate::money::Money;
use crate::strategies::{calculate_discount_for_line_items, DiscountOutcome};
use crate::tax::TaxProvider;
use crate::types::{
    total_quantity, total_value, Discount, DiscountApplication, DiscountFailure, EvolutionEntry,
    LineItem, OrderContext, PricingRequest, PricingResult, ShippingMethod, ShippingPrice,
};
use crate::validation::{validate_line_item, validate_max_len};

// =============================================================================
// Discount Ordering
// =============================================================================

/// The discounts to fold, in folding order.
///
/// Automatic discounts come first, then requested coupons; `priority`
/// (ascending, ties keep input order) orders each group separately.
pub fn order_discounts<'a>(
    auto_discounts: &'a [Discount],
    coupons: &'a [Discount],
    requested_coupons: &[String],
) -> Vec<&'a Discount> {
    let mut autos: Vec<&Discount> = auto_discounts
        .iter()
        .filter(|d| d.active && d.application == DiscountApplication::Auto)
        .collect();
    autos.sort_by_key(|d| d.priority);

    let mut manual: Vec<&Discount> = coupons
        .iter()
        .filter(|d| {
            d.active
                && d.application == DiscountApplication::Manual
                && requested_coupons.contains(&d.handle)
        })
        .collect();
    manual.sort_by_key(|d| d.priority);

    autos.extend(manual);
    autos
}

// =============================================================================
// Input Preparation
// =============================================================================

/// Coerces the shipping price to cents. No shipping method costs nothing.
///
/// Numbers and numeric strings are both major units and go through the
/// same exact decimal conversion.
pub fn shipping_price(method: Option<&ShippingMethod>) -> CheckoutResult<Money> {
    let Some(method) = method else {
        return Ok(Money::zero());
    };

    let text = match &method.price {
        ShippingPrice::Number(value) => value.to_string(),
        ShippingPrice::Text(text) => text.clone(),
    };
    Money::parse_major(&text).map_err(|e| PricingError::InvalidShippingPrice {
        value: text,
        reason: e.to_string(),
    })
}

/// Copies the caller's line items, pins each resolved price onto the item
/// and sorts by unit price, highest first.
fn prepare_line_items(line_items: &[LineItem]) -> Vec<LineItem> {
    let mut items: Vec<LineItem> = line_items
        .iter()
        .map(|item| LineItem {
            price: item.resolved_price(),
            ..item.clone()
        })
        .collect();
    items.sort_by(|a, b| b.unit_price().cmp(&a.unit_price()));
    items
}

fn validate_request(request: &PricingRequest, config: &PricingConfig) -> CheckoutResult<()> {
    let limits = &config.limits;
    validate_max_len("line_items", request.line_items.len(), limits.max_line_items)?;
    validate_max_len(
        "discounts",
        request.auto_discounts.len() + request.coupons.len(),
        limits.max_discounts,
    )?;

    for item in &request.line_items {
        validate_line_item(item, limits.max_item_quantity, limits.max_unit_price).map_err(
            |source| PricingError::InvalidLineItem {
                id: item.id.clone(),
                source,
            },
        )?;
    }
    Ok(())
}

fn quantities_by_id(items: &[LineItem]) -> HashMap<&str, i64> {
    let mut quantities = HashMap::new();
    for item in items {
        *quantities.entry(item.id.as_str()).or_insert(0) += item.qty;
    }
    quantities
}

/// Counts cart units that received at least one price effect.
///
/// Units of one line item are interchangeable. A step that discounts units
/// leaving the pool takes already counted units first; trigger units that
/// leave without a price effect take uncounted units first.
#[derive(Debug, Default)]
struct DiscountedUnits {
    /// Counted units still in the pool, per line item id.
    marked: HashMap<String, i64>,
    total: i64,
}

impl DiscountedUnits {
    fn record(&mut self, pool: &[LineItem], outcome: &DiscountOutcome) {
        let affected = quantities_by_id(&outcome.line_items_affected);
        let consumed = quantities_by_id(&outcome.line_items_discounted);

        for (id, available) in quantities_by_id(pool) {
            let affected = affected.get(id).copied().unwrap_or(0);
            let consumed = consumed.get(id).copied().unwrap_or(0);
            if affected == 0 && consumed == 0 {
                continue;
            }
            let marked = self.marked.entry(id.to_string()).or_insert(0);

            // discounted units that left the pool
            let affected_consumed = affected.min(consumed);
            let reused = affected_consumed.min(*marked);
            self.total += affected_consumed - reused;
            *marked -= reused;

            // discounted units that stay in the pool
            let affected_kept = affected - affected_consumed;
            if affected_kept > *marked {
                self.total += affected_kept - *marked;
                *marked = affected_kept;
            }

            // triggers
            let triggers = consumed - affected_consumed;
            let unmarked = (available - affected_consumed - *marked).max(0);
            *marked -= (triggers - unmarked).clamp(0, *marked);
        }
    }
}

fn overflow(what: &str) -> PricingError {
    PricingError::AmountOverflow(what.to_string())
}

fn strip_snapshots(items: &mut [LineItem]) {
    for item in items {
        item.price = item.resolved_price();
        item.data = None;
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Prices a checkout with the default [`PricingConfig`].
pub async fn calculate_pricing(
    request: &PricingRequest,
    tax_provider: Option<&dyn TaxProvider>,
) -> CheckoutResult<PricingResult> {
    calculate_pricing_with_config(request, tax_provider, &PricingConfig::default()).await
}

/// Prices a checkout.
///
/// ## Errors
/// Only systemic failures are returned: an inconsistent config, a request
/// over the configured limits, an unpriced, negative or overpriced line
/// item, an unparsable shipping price, a total outside the `i64` cent
/// range, or a tax provider failure. A discount that fails is recorded in
/// [`PricingResult::errors`] and skipped.
pub async fn calculate_pricing_with_config(
    request: &PricingRequest,
    tax_provider: Option<&dyn TaxProvider>,
    config: &PricingConfig,
) -> CheckoutResult<PricingResult> {
    config.validate()?;
    validate_request(request, config)?;

    let discounts = order_discounts(
        &request.auto_discounts,
        &request.coupons,
        &request.requested_coupons,
    );
    let shipping = shipping_price(request.shipping_method.as_ref())?;
    let line_items = prepare_line_items(&request.line_items);
    let now = request.now.unwrap_or_else(Utc::now);

    let subtotal_undiscounted = total_value(&line_items);
    let quantity_total = total_quantity(&line_items);

    let mut subtotal = subtotal_undiscounted;
    let mut total = subtotal_undiscounted
        .checked_add(shipping)
        .ok_or_else(|| overflow("subtotal plus shipping"))?;
    let mut subtotal_discount = Money::zero();
    let mut discounted_units = DiscountedUnits::default();
    let mut coupons = Vec::new();
    let mut errors = Vec::new();

    let mut evo = vec![EvolutionEntry {
        line_items_next: line_items.clone(),
        line_items_discounted: Vec::new(),
        total_discount: Money::zero(),
        quantity_discounted: 0,
        quantity_undiscounted: quantity_total,
        discount_code: None,
        discount: None,
        subtotal,
        total,
    }];
    let mut pool = line_items;

    for discount in discounts {
        let ctx = OrderContext {
            uid: request.customer_id.clone(),
            subtotal,
            total,
            quantity_total,
            now,
        };

        let outcome = match calculate_discount_for_line_items(discount, &pool, &ctx) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(discount = %discount.handle, error = %err, "Skipping discount");
                errors.push(DiscountFailure {
                    discount_code: discount.handle.clone(),
                    message: err.to_string(),
                });
                continue;
            }
        };

        // Stacked discounts never push the subtotal below zero.
        let step_discount = outcome.total_discount.min(subtotal.max(Money::zero()));

        subtotal_discount += step_discount;
        subtotal -= step_discount;
        total -= step_discount;
        discounted_units.record(&pool, &outcome);

        if discount.application == DiscountApplication::Manual {
            coupons.push(discount.handle.clone());
        }

        debug!(
            discount = %discount.handle,
            kind = discount.details.kind(),
            amount = %step_discount,
            units = outcome.quantity_discounted,
            "Folded discount"
        );

        evo.push(EvolutionEntry {
            line_items_next: outcome.line_items_next.clone(),
            line_items_discounted: outcome.line_items_discounted,
            total_discount: step_discount,
            quantity_discounted: discounted_units.total,
            quantity_undiscounted: total_quantity(&outcome.line_items_next),
            discount_code: Some(discount.handle.clone()),
            discount: Some(discount.to_ref()),
            subtotal,
            total,
        });
        pool = outcome.line_items_next;
    }

    let mut report = PricingResult {
        evo,
        subtotal_undiscounted,
        subtotal_discount,
        subtotal,
        shipping,
        total,
        total_without_taxes: total,
        quantity_total,
        quantity_discounted: discounted_units.total,
        coupons,
        taxes: None,
        errors,
    };

    if let Some(provider) = tax_provider {
        let taxes = provider
            .compute(request.shipping_address.as_ref(), &report)
            .await?;
        let tax_total = taxes
            .iter()
            .try_fold(Money::zero(), |sum, tax| sum.checked_add(tax.value))
            .ok_or_else(|| overflow("tax total"))?;
        report.total = report
            .total
            .checked_add(tax_total)
            .ok_or_else(|| overflow("total with taxes"))?;
        report.taxes = Some(taxes);
    }

    if config.output.strip_product_snapshots {
        for entry in &mut report.evo {
            strip_snapshots(&mut entry.line_items_next);
            strip_snapshots(&mut entry.line_items_discounted);
        }
    }

    info!(
        subtotal = %report.subtotal,
        discount = %report.subtotal_discount,
        total = %report.total,
        steps = report.evo.len() - 1,
        failures = report.errors.len(),
        "Pricing calculated"
    );

    Ok(report)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscountDetails, RegularParams};

    fn discount(handle: &str, application: DiscountApplication, priority: i64, active: bool) -> Discount {
        Discount {
            id: handle.to_string(),
            handle: handle.to_string(),
            title: None,
            active,
            priority,
            application,
            details: DiscountDetails::Regular(RegularParams::default()),
            filters: Vec::new(),
        }
    }

    fn handles(discounts: &[&Discount]) -> Vec<String> {
        discounts.iter().map(|d| d.handle.clone()).collect()
    }

    #[test]
    fn test_autos_always_precede_coupons() {
        let autos = vec![
            discount("auto-late", DiscountApplication::Auto, 10, true),
            discount("auto-early", DiscountApplication::Auto, 1, true),
            discount("auto-off", DiscountApplication::Auto, 0, false),
            discount("manual-in-autos", DiscountApplication::Manual, 0, true),
        ];
        let coupons = vec![
            discount("coupon-b", DiscountApplication::Manual, -5, true),
            discount("coupon-a", DiscountApplication::Manual, -9, true),
            discount("coupon-unrequested", DiscountApplication::Manual, -10, true),
            discount("auto-in-coupons", DiscountApplication::Auto, -10, true),
        ];
        let requested = vec![
            "coupon-a".to_string(),
            "coupon-b".to_string(),
            "auto-in-coupons".to_string(),
        ];

        let ordered = order_discounts(&autos, &coupons, &requested);
        assert_eq!(
            handles(&ordered),
            vec!["auto-early", "auto-late", "coupon-a", "coupon-b"]
        );
    }

    #[test]
    fn test_priority_ties_keep_input_order() {
        let autos = vec![
            discount("first", DiscountApplication::Auto, 1, true),
            discount("second", DiscountApplication::Auto, 1, true),
        ];
        let ordered = order_discounts(&autos, &[], &[]);
        assert_eq!(handles(&ordered), vec!["first", "second"]);
    }

    #[test]
    fn test_shipping_price_coercion() {
        let method = |price: ShippingPrice| ShippingMethod {
            id: "ship".to_string(),
            name: None,
            price,
        };

        assert_eq!(shipping_price(None).unwrap(), Money::zero());
        let price_of = |price: ShippingPrice| shipping_price(Some(&method(price)));

        assert_eq!(price_of(ShippingPrice::Number(50.0)).unwrap().cents(), 5000);
        assert_eq!(
            price_of(ShippingPrice::Number(50.0)).unwrap(),
            price_of(ShippingPrice::Text("50".into())).unwrap()
        );
        assert_eq!(price_of(ShippingPrice::Number(12.5)).unwrap().cents(), 1250);
        assert_eq!(price_of(ShippingPrice::Number(0.1)).unwrap().cents(), 10);
        assert!(price_of(ShippingPrice::Number(0.125)).is_err());
        assert!(price_of(ShippingPrice::Number(f64::NAN)).is_err());
        assert_eq!(
            shipping_price(Some(&method(ShippingPrice::Text("12.50".into())))).unwrap().cents(),
            1250
        );
        assert!(matches!(
            shipping_price(Some(&method(ShippingPrice::Text("free".into())))),
            Err(PricingError::InvalidShippingPrice { .. })
        ));
        assert!(price_of(ShippingPrice::Number(-1.0)).is_err());
    }

    #[test]
    fn test_prepare_sorts_by_price_descending() {
        let items = vec![
            LineItem::new("cheap", 1, Money::from_cents(100)),
            LineItem::new("pricey", 1, Money::from_cents(900)),
            LineItem::new("mid", 1, Money::from_cents(500)),
        ];
        let prepared = prepare_line_items(&items);
        let ids: Vec<&str> = prepared.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["pricey", "mid", "cheap"]);
        // caller order untouched
        assert_eq!(items[0].id, "cheap");
    }

    fn units(id: &str, qty: i64) -> LineItem {
        LineItem::new(id, qty, Money::from_cents(1000))
    }

    fn outcome(
        pool: &[LineItem],
        consumed: Vec<LineItem>,
        affected: Vec<LineItem>,
    ) -> DiscountOutcome {
        DiscountOutcome {
            line_items_next: pool.to_vec(),
            line_items_discounted: consumed,
            line_items_affected: affected,
            total_discount: Money::zero(),
            quantity_discounted: 0,
        }
    }

    #[test]
    fn test_stacked_discounts_count_units_once() {
        let pool = vec![units("a", 5)];
        let mut counted = DiscountedUnits::default();

        // two percentage discounts on the same five units
        counted.record(&pool, &outcome(&pool, vec![], vec![units("a", 5)]));
        counted.record(&pool, &outcome(&pool, vec![], vec![units("a", 5)]));
        assert_eq!(counted.total, 5);

        // a bulk discount taking three of those units adds nothing new
        counted.record(&pool, &outcome(&pool, vec![units("a", 3)], vec![units("a", 3)]));
        assert_eq!(counted.total, 5);
    }

    #[test]
    fn test_triggers_use_uncounted_units_first() {
        let mut counted = DiscountedUnits::default();

        // bulk discounts 2 of 6 units, leaving 4 uncounted in the pool
        let pool = vec![units("a", 6)];
        counted.record(&pool, &outcome(&pool, vec![units("a", 2)], vec![units("a", 2)]));
        assert_eq!(counted.total, 2);

        // a regular discount then touches the remaining 4
        let pool = vec![units("a", 4)];
        counted.record(&pool, &outcome(&pool, vec![], vec![units("a", 4)]));
        assert_eq!(counted.total, 6);

        // buy 2 get 1: the reward was already counted
        counted.record(&pool, &outcome(&pool, vec![units("a", 3)], vec![units("a", 1)]));
        assert_eq!(counted.total, 6);
    }

    #[test]
    fn test_reward_after_triggers_counts_new_units() {
        let mut counted = DiscountedUnits::default();
        let pool = vec![units("x", 2), units("y", 3)];

        counted.record(
            &pool,
            &outcome(&pool, vec![units("x", 2), units("y", 1)], vec![units("y", 1)]),
        );
        assert_eq!(counted.total, 1);

        let pool = vec![units("y", 2)];
        counted.record(&pool, &outcome(&pool, vec![], vec![units("y", 2)]));
        assert_eq!(counted.total, 3);
    }
}
