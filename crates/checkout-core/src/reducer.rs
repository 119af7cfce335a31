//! # Line Item Reducer
//!
//! The quantity-removal primitive shared by the consuming strategies.
//!
//! ## How a Reduction Walks the Pool
//! ```text
//! pool (sorted by caller):  [A ×3 ✓] [B ×2 ✗] [C ×4 ✓]     reduce 5 of ✓
//!                               │                 │
//!                               ▼                 ▼
//! line_items_next:          [A ×0]   [B ×2]   [C ×2]
//! line_items_removed:       [A ×3]            [C ×2]
//! total:                    3×price(A) + 2×price(C)
//! ```
//! Items are visited in list order; ordering by price is the caller's job
//! (the pipeline sorts by descending unit price once, before folding).

use std::borrow::Cow;

use crate::filters::test_product_filters;
use crate::filters::Filter;
use crate::money::Money;
use crate::types::{LineItem, ProductSnapshot};

/// Which line items pass a filter list, and how many units that is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassMask {
    /// One flag per line item, in pool order.
    pub mask: Vec<bool>,
    /// Units on passing items.
    pub pass_qty: i64,
    /// Units in the whole pool.
    pub pass_total_qty: i64,
}

/// Result of [`reduce_from_line_items`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    /// The pool after removal. Same length and order as the input.
    pub line_items_next: Vec<LineItem>,
    /// Value of the removed units.
    pub total: Money,
    /// One entry per touched item, carrying the removed quantity.
    pub line_items_removed: Vec<LineItem>,
}

impl Reduction {
    /// Units actually removed.
    pub fn removed_qty(&self) -> i64 {
        self.line_items_removed.iter().map(|item| item.qty).sum()
    }
}

/// The product view filters see for a line item.
///
/// Items without product data are matched as a bare product whose handle is
/// the line item id. The resolved unit price always wins over the snapshot's.
pub(crate) fn product_of(item: &LineItem) -> Cow<'_, ProductSnapshot> {
    let price = item.resolved_price();
    match &item.data {
        Some(product) if product.price == price => Cow::Borrowed(product),
        Some(product) => Cow::Owned(ProductSnapshot {
            price,
            ..product.clone()
        }),
        None => Cow::Owned(ProductSnapshot::bare(&item.id, price)),
    }
}

/// Tests every line item against the product filters of `filters`.
pub fn compute_pass_mask(line_items: &[LineItem], filters: &[Filter]) -> PassMask {
    let mut pass_qty = 0;
    let mut pass_total_qty = 0;

    let mask = line_items
        .iter()
        .map(|item| {
            let passes = test_product_filters(filters, &product_of(item));
            pass_total_qty += item.qty;
            if passes {
                pass_qty += item.qty;
            }
            passes
        })
        .collect();

    PassMask {
        mask,
        pass_qty,
        pass_total_qty,
    }
}

/// Removes up to `how_many` units from items flagged in `pass_mask`.
///
/// The input is never modified. If fewer matching units exist than asked
/// for, everything matching is removed; callers check availability first.
pub fn reduce_from_line_items(
    line_items: &[LineItem],
    how_many: i64,
    pass_mask: &[bool],
) -> Reduction {
    let mut line_items_next = line_items.to_vec();
    let mut line_items_removed = Vec::new();
    let mut total = Money::zero();
    let mut remaining = how_many.max(0);

    for (item, passes) in line_items_next.iter_mut().zip(pass_mask) {
        if remaining == 0 {
            break;
        }
        if !*passes || item.qty <= 0 {
            continue;
        }

        let take = remaining.min(item.qty);
        item.qty -= take;
        remaining -= take;

        let removed = item.with_qty(take);
        total += removed.line_total();
        line_items_removed.push(removed);
    }

    Reduction {
        line_items_next,
        total,
        line_items_removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::total_quantity;

    fn tagged(id: &str, qty: i64, cents: i64, tag: &str) -> LineItem {
        LineItem::new(id, qty, Money::from_cents(cents)).with_product(ProductSnapshot {
            handle: id.to_string(),
            tags: vec![tag.to_string()],
            ..Default::default()
        })
    }

    fn sale_filter() -> Vec<Filter> {
        vec![Filter::PInTags(vec!["sale".to_string()])]
    }

    #[test]
    fn test_pass_mask() {
        let items = vec![
            tagged("a", 3, 100, "sale"),
            tagged("b", 2, 100, "other"),
            tagged("c", 4, 100, "sale"),
        ];
        let mask = compute_pass_mask(&items, &sale_filter());
        assert_eq!(mask.mask, vec![true, false, true]);
        assert_eq!(mask.pass_qty, 7);
        assert_eq!(mask.pass_total_qty, 9);
    }

    #[test]
    fn test_pass_mask_without_product_filters_matches_nothing() {
        let items = vec![tagged("a", 3, 100, "sale")];
        let mask = compute_pass_mask(&items, &[]);
        assert_eq!(mask.mask, vec![false]);
        assert_eq!(mask.pass_qty, 0);
    }

    #[test]
    fn test_bare_items_match_by_id_and_price() {
        let items = vec![LineItem::new("sku-1", 1, Money::from_cents(700))];
        let by_id = compute_pass_mask(&items, &[Filter::PInProducts(vec!["sku-1".to_string()])]);
        assert_eq!(by_id.pass_qty, 1);

        let by_price = compute_pass_mask(
            &items,
            &[Filter::PInPriceRange(crate::filters::MoneyRange {
                from: Some(Money::from_cents(500)),
                to: None,
            })],
        );
        assert_eq!(by_price.pass_qty, 1);
    }

    #[test]
    fn test_reduce_walks_in_order_and_skips_non_matching() {
        let items = vec![
            tagged("a", 3, 300, "sale"),
            tagged("b", 2, 200, "other"),
            tagged("c", 4, 100, "sale"),
        ];
        let mask = compute_pass_mask(&items, &sale_filter());
        let reduction = reduce_from_line_items(&items, 5, &mask.mask);

        let next: Vec<i64> = reduction.line_items_next.iter().map(|i| i.qty).collect();
        assert_eq!(next, vec![0, 2, 2]);
        assert_eq!(reduction.removed_qty(), 5);
        assert_eq!(reduction.line_items_removed.len(), 2);
        assert_eq!(reduction.total.cents(), 3 * 300 + 2 * 100);

        // the input is untouched
        assert_eq!(total_quantity(&items), 9);
    }

    #[test]
    fn test_reduce_conserves_quantity() {
        let items = vec![tagged("a", 3, 300, "sale"), tagged("c", 4, 100, "sale")];
        let mask = compute_pass_mask(&items, &sale_filter());
        for how_many in 0..=9 {
            let reduction = reduce_from_line_items(&items, how_many, &mask.mask);
            assert_eq!(
                total_quantity(&reduction.line_items_next) + reduction.removed_qty(),
                total_quantity(&items)
            );
            assert_eq!(reduction.removed_qty(), how_many.min(7));
        }
    }
}
