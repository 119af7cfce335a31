//! # Tax Provider Capability
//!
//! Taxes are computed outside this crate. The pipeline calls the injected
//! provider exactly once, after every discount has been folded, with the
//! destination address and a snapshot of the report so far.
//!
//! ```text
//! calculate_pricing ──► fold discounts ──► TaxProvider::compute(address, snapshot)
//!                                                   │
//!                                      Ok(taxes) ───┴─── Err(_) → PricingError
//!                                          │
//!                                   total += Σ taxes
//! ```
//!
//! A provider failure aborts the calculation: a total without its taxes is
//! not a price the checkout can charge.

use async_trait::async_trait;

use crate::error::TaxProviderError;
use crate::money::Money;
use crate::types::{Address, PricingResult, Tax, TaxRate};

/// Computes the taxes owed on a priced order.
#[async_trait]
pub trait TaxProvider: Send + Sync {
    async fn compute(
        &self,
        address: Option<&Address>,
        pricing: &PricingResult,
    ) -> Result<Vec<Tax>, TaxProviderError>;
}

/// A single flat rate over the discounted subtotal (and optionally shipping).
///
/// Used by the preview app and tests; real deployments plug in a provider
/// backed by their tax service.
#[derive(Debug, Clone)]
pub struct FlatRateTaxProvider {
    pub name: String,
    pub rate: TaxRate,
    pub include_shipping: bool,
}

impl FlatRateTaxProvider {
    pub fn new(name: impl Into<String>, rate: TaxRate) -> Self {
        FlatRateTaxProvider {
            name: name.into(),
            rate,
            include_shipping: false,
        }
    }

    /// Also tax the shipping price.
    pub fn with_shipping(mut self) -> Self {
        self.include_shipping = true;
        self
    }
}

#[async_trait]
impl TaxProvider for FlatRateTaxProvider {
    async fn compute(
        &self,
        _address: Option<&Address>,
        pricing: &PricingResult,
    ) -> Result<Vec<Tax>, TaxProviderError> {
        let mut base = pricing.subtotal;
        if self.include_shipping {
            base = base.checked_add(pricing.shipping).ok_or_else(|| {
                TaxProviderError::Rejected("taxable base out of range".to_string())
            })?;
        }
        let base = base.max(Money::zero());

        Ok(vec![Tax {
            name: self.name.clone(),
            value: base.calculate_tax(self.rate),
            description: Some(format!("{:.2}%", self.rate.bps() as f64 / 100.0)),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(subtotal: i64, shipping: i64) -> PricingResult {
        PricingResult {
            evo: Vec::new(),
            subtotal_undiscounted: Money::from_cents(subtotal),
            subtotal_discount: Money::zero(),
            subtotal: Money::from_cents(subtotal),
            shipping: Money::from_cents(shipping),
            total: Money::from_cents(subtotal + shipping),
            total_without_taxes: Money::from_cents(subtotal + shipping),
            quantity_total: 1,
            quantity_discounted: 0,
            coupons: Vec::new(),
            taxes: None,
            errors: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_flat_rate_on_subtotal() {
        let provider = FlatRateTaxProvider::new("VAT", TaxRate::from_bps(825));
        let taxes = provider.compute(None, &report(1000, 500)).await.unwrap();
        assert_eq!(taxes.len(), 1);
        assert_eq!(taxes[0].value.cents(), 83);
        assert_eq!(taxes[0].description.as_deref(), Some("8.25%"));
    }

    #[tokio::test]
    async fn test_flat_rate_with_shipping() {
        let provider = FlatRateTaxProvider::new("VAT", TaxRate::from_bps(1000)).with_shipping();
        let taxes = provider.compute(None, &report(1000, 500)).await.unwrap();
        assert_eq!(taxes[0].value.cents(), 150);
    }
}
