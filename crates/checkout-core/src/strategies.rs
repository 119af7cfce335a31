//! # Discount Strategies
//!
//! The five discount algorithms. Each one takes the current pool by
//! reference and returns a new pool; nothing is mutated in place.
//!
//! ## Consumption Rules
//! ```text
//! ┌──────────────┬───────────────────────────┬────────────────────────────┐
//! │ Strategy     │ Units leaving the pool    │ Discount base              │
//! ├──────────────┼───────────────────────────┼────────────────────────────┤
//! │ Regular      │ none                      │ every matching unit        │
//! │ Bulk         │ bulks × qty matching      │ removed units (per bulk)   │
//! │ BuyXGetY     │ qty_x triggers + qty_y    │ reward units (per deal)    │
//! │ Bundle       │ one unit per slot         │ bundle units (per bundle)  │
//! │ Order        │ none                      │ running subtotal           │
//! └──────────────┴───────────────────────────┴────────────────────────────┘
//! ```
//!
//! Units that leave the pool are reported in `line_items_discounted` so the
//! pipeline can check `pool + consumed == cart` at every step. Buy-X trigger
//! units are consumed without a price effect, so they appear there too but
//! are not counted in `quantity_discounted`.
//!
//! Units that received a price effect are reported in `line_items_affected`.
//! `quantity_discounted` counts them for this one step; a Regular discount
//! affects units that stay in the pool, so later steps can touch the same
//! units again. The pipeline uses `line_items_affected` to count each cart
//! unit at most once across the whole run.

use tracing::debug;

use crate::error::{DiscountError, DiscountResult, ValidationError};
use crate::filters::{test_order_filters, test_product_filter, Filter};
use crate::money::{apply_discount, Money};
use crate::reducer::{compute_pass_mask, product_of, reduce_from_line_items};
use crate::types::{
    BulkParams, BundleParams, BuyXGetYParams, Discount, DiscountDetails, LineItem, OrderContext,
    OrderParams, RegularParams,
};
use crate::validation;

/// What one discount did to the pool.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscountOutcome {
    /// Pool for the next discount.
    pub line_items_next: Vec<LineItem>,
    /// Units consumed from the pool by this discount.
    pub line_items_discounted: Vec<LineItem>,
    /// Units that received a price effect, whether or not they left the pool.
    pub line_items_affected: Vec<LineItem>,
    /// Money taken off.
    pub total_discount: Money,
    /// Units that received a price effect in this step.
    pub quantity_discounted: i64,
}

impl DiscountOutcome {
    fn untouched(line_items: &[LineItem]) -> Self {
        DiscountOutcome {
            line_items_next: line_items.to_vec(),
            line_items_discounted: Vec::new(),
            line_items_affected: Vec::new(),
            total_discount: Money::zero(),
            quantity_discounted: 0,
        }
    }
}

fn invalid(discount: &Discount, source: ValidationError) -> DiscountError {
    DiscountError::InvalidParameters {
        handle: discount.handle.clone(),
        source,
    }
}

/// Adds `item` to `list`, merging with an entry for the same line item.
fn push_merged(list: &mut Vec<LineItem>, item: LineItem) {
    match list.iter_mut().find(|existing| existing.id == item.id) {
        Some(existing) => existing.qty += item.qty,
        None => list.push(item),
    }
}

// =============================================================================
// Dispatch
// =============================================================================

/// Runs the strategy selected by `discount.details` over `line_items`.
pub fn calculate_discount_for_line_items(
    discount: &Discount,
    line_items: &[LineItem],
    ctx: &OrderContext,
) -> DiscountResult<DiscountOutcome> {
    match &discount.details {
        DiscountDetails::Regular(params) => regular(discount, params, line_items),
        DiscountDetails::Bulk(params) => bulk(discount, params, line_items),
        DiscountDetails::BuyXGetY(params) => buy_x_get_y(discount, params, line_items),
        DiscountDetails::Bundle(params) => bundle(discount, params, line_items),
        DiscountDetails::Order(params) => order(discount, params, line_items, ctx),
    }
}

// =============================================================================
// Regular
// =============================================================================

/// `percent`/`fixed` off every matching unit. The pool is left as is, so
/// the same units stay eligible for later discounts.
pub fn regular(
    discount: &Discount,
    params: &RegularParams,
    line_items: &[LineItem],
) -> DiscountResult<DiscountOutcome> {
    validation::validate_regular(params).map_err(|e| invalid(discount, e))?;

    let pass = compute_pass_mask(line_items, &discount.filters);
    let matched: Vec<LineItem> = line_items
        .iter()
        .zip(&pass.mask)
        .filter(|(item, passes)| **passes && item.qty > 0)
        .map(|(item, _)| item.clone())
        .collect();
    let total_discount = matched
        .iter()
        .map(|item| apply_discount(item.qty, item.unit_price(), params.percent, params.fixed))
        .sum();

    Ok(DiscountOutcome {
        line_items_next: line_items.to_vec(),
        line_items_discounted: Vec::new(),
        line_items_affected: matched,
        total_discount,
        quantity_discounted: pass.pass_qty,
    })
}

// =============================================================================
// Bulk
// =============================================================================

/// Discount on groups of `qty` matching units, the priciest units first.
///
/// Non-recursive discounts apply to one group at most. `fixed` is granted
/// once per group.
pub fn bulk(
    discount: &Discount,
    params: &BulkParams,
    line_items: &[LineItem],
) -> DiscountResult<DiscountOutcome> {
    validation::validate_bulk(params).map_err(|e| invalid(discount, e))?;

    let pass = compute_pass_mask(line_items, &discount.filters);
    let mut bulks = pass.pass_qty / params.qty;
    if !params.recursive {
        bulks = bulks.min(1);
    }
    if bulks == 0 {
        return Ok(DiscountOutcome::untouched(line_items));
    }

    let reduction = reduce_from_line_items(line_items, bulks * params.qty, &pass.mask);
    let total_discount = apply_discount(1, reduction.total, params.percent, params.fixed * bulks);
    let quantity_discounted = reduction.removed_qty();

    Ok(DiscountOutcome {
        line_items_next: reduction.line_items_next,
        line_items_affected: reduction.line_items_removed.clone(),
        line_items_discounted: reduction.line_items_removed,
        total_discount,
        quantity_discounted,
    })
}

// =============================================================================
// Buy X Get Y
// =============================================================================

/// Buy `qty_x` units matching `filters`, get `qty_y` units matching
/// `filters_y` discounted.
///
/// ## One Deal
/// ```text
/// pool ──► enough X? ──no──► stop
///               │yes
///               ▼
///          remove qty_x X units (no price effect, never restored)
///               │
///               ▼
///          enough Y left? ──no──► stop
///               │yes
///               ▼
///          remove qty_y Y units, discount their value
///               │
///               ▼
///          recursive? ──yes──► next deal
/// ```
pub fn buy_x_get_y(
    discount: &Discount,
    params: &BuyXGetYParams,
    line_items: &[LineItem],
) -> DiscountResult<DiscountOutcome> {
    validation::validate_buy_x_get_y(params).map_err(|e| invalid(discount, e))?;

    let mut pool = line_items.to_vec();
    let mut consumed = Vec::new();
    let mut rewarded = Vec::new();
    let mut total_discount = Money::zero();
    let mut quantity_discounted = 0;

    loop {
        let pass_x = compute_pass_mask(&pool, &discount.filters);
        if pass_x.pass_qty < params.qty_x {
            break;
        }
        let triggers = reduce_from_line_items(&pool, params.qty_x, &pass_x.mask);
        pool = triggers.line_items_next;
        for unit in triggers.line_items_removed {
            push_merged(&mut consumed, unit);
        }

        let pass_y = compute_pass_mask(&pool, &params.filters_y);
        if pass_y.pass_qty < params.qty_y {
            debug!(discount = %discount.handle, "Not enough reward units left after triggers");
            break;
        }
        let rewards = reduce_from_line_items(&pool, params.qty_y, &pass_y.mask);
        total_discount += apply_discount(1, rewards.total, params.percent, params.fixed);
        quantity_discounted += rewards.removed_qty();
        pool = rewards.line_items_next;
        for unit in rewards.line_items_removed {
            push_merged(&mut rewarded, unit.clone());
            push_merged(&mut consumed, unit);
        }

        if !params.recursive {
            break;
        }
    }

    Ok(DiscountOutcome {
        line_items_next: pool,
        line_items_discounted: consumed,
        line_items_affected: rewarded,
        total_discount,
        quantity_discounted,
    })
}

// =============================================================================
// Bundle
// =============================================================================

/// One unit per product filter ("slot"), discounted as a group.
///
/// Each round works on a draft copy of the pool. If any slot finds no unit,
/// the draft is dropped and the pool stays exactly as the last completed
/// round left it.
pub fn bundle(
    discount: &Discount,
    params: &BundleParams,
    line_items: &[LineItem],
) -> DiscountResult<DiscountOutcome> {
    validation::validate_bundle(params).map_err(|e| invalid(discount, e))?;

    let slots: Vec<&Filter> = discount.filters.iter().filter(|f| f.is_product()).collect();
    if slots.is_empty() {
        return Err(DiscountError::EmptyBundle(discount.handle.clone()));
    }

    let mut pool = line_items.to_vec();
    let mut consumed = Vec::new();
    let mut total_discount = Money::zero();
    let mut quantity_discounted = 0;

    'rounds: loop {
        let mut draft = pool.clone();
        let mut picked = Vec::with_capacity(slots.len());

        for (slot_index, slot) in slots.iter().enumerate() {
            let found = draft
                .iter()
                .position(|item| item.qty > 0 && test_product_filter(slot, &product_of(item)));
            match found {
                Some(index) => {
                    draft[index].qty -= 1;
                    picked.push(draft[index].with_qty(1));
                }
                None => {
                    debug!(discount = %discount.handle, slot = slot_index, "Bundle slot unfilled");
                    break 'rounds;
                }
            }
        }

        pool = draft;
        let bundle_value: Money = picked.iter().map(LineItem::line_total).sum();
        total_discount += apply_discount(1, bundle_value, params.percent, params.fixed);
        quantity_discounted += picked.len() as i64;
        for unit in picked {
            push_merged(&mut consumed, unit);
        }

        if !params.recursive {
            break;
        }
    }

    Ok(DiscountOutcome {
        line_items_next: pool,
        line_items_affected: consumed.clone(),
        line_items_discounted: consumed,
        total_discount,
        quantity_discounted,
    })
}

// =============================================================================
// Order
// =============================================================================

/// Discount on the running subtotal when every order filter matches.
///
/// `free_shipping` is carried on the definition only; shipping cost is not
/// changed here.
pub fn order(
    discount: &Discount,
    params: &OrderParams,
    line_items: &[LineItem],
    ctx: &OrderContext,
) -> DiscountResult<DiscountOutcome> {
    validation::validate_order(params).map_err(|e| invalid(discount, e))?;

    if !test_order_filters(&discount.filters, ctx) {
        return Ok(DiscountOutcome::untouched(line_items));
    }

    Ok(DiscountOutcome {
        total_discount: apply_discount(1, ctx.subtotal, params.percent, params.fixed),
        ..DiscountOutcome::untouched(line_items)
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
