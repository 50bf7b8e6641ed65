//! Order summary arithmetic for the mock checkout.
//!
//! Shipping is a flat fee waived above a subtotal threshold, and tax is a
//! single flat percentage of the subtotal. There is no jurisdiction logic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Price;

/// Shipping and tax rules applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPolicy {
    /// Flat tax rate applied to the subtotal (0.08 = 8%).
    pub tax_rate: Decimal,
    /// Subtotals strictly above this ship free.
    pub free_shipping_threshold: Price,
    /// Shipping fee charged at or below the threshold.
    pub flat_shipping: Price,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(8, 2),
            free_shipping_threshold: Price::from_cents(5000),
            flat_shipping: Price::from_cents(599),
        }
    }
}

/// Amounts shown on the cart and checkout pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderSummary {
    pub subtotal: Price,
    pub shipping: Price,
    pub tax: Price,
    pub total: Price,
    /// How much more the shopper must add to qualify for free shipping.
    pub free_shipping_remaining: Price,
}

impl OrderSummary {
    /// Compute the summary for a cart subtotal.
    ///
    /// Tax is rounded to cents before it is added to the total.
    #[must_use]
    pub fn compute(subtotal: Price, policy: &CheckoutPolicy) -> Self {
        let ships_free = subtotal > policy.free_shipping_threshold;
        let shipping = if ships_free || subtotal.is_zero() {
            Price::ZERO
        } else {
            policy.flat_shipping
        };
        let tax = subtotal.scale(policy.tax_rate).round_cents();
        let free_shipping_remaining = if ships_free {
            Price::ZERO
        } else {
            subtotal.shortfall_to(policy.free_shipping_threshold)
        };

        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
            free_shipping_remaining,
        }
    }

    /// Returns `true` when shipping is waived.
    #[must_use]
    pub fn qualifies_for_free_shipping(&self) -> bool {
        self.shipping.is_zero() && !self.subtotal.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_order_pays_shipping() {
        let summary = OrderSummary::compute(Price::from_cents(2499), &CheckoutPolicy::default());
        assert_eq!(summary.shipping, Price::from_cents(599));
        assert_eq!(summary.tax, Price::from_cents(200));
        assert_eq!(summary.total, Price::from_cents(2499 + 599 + 200));
        assert_eq!(summary.free_shipping_remaining, Price::from_cents(2501));
        assert!(!summary.qualifies_for_free_shipping());
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let at = OrderSummary::compute(Price::from_cents(5000), &CheckoutPolicy::default());
        assert_eq!(at.shipping, Price::from_cents(599));
        assert!(at.free_shipping_remaining.is_zero());

        let above = OrderSummary::compute(Price::from_cents(5001), &CheckoutPolicy::default());
        assert!(above.shipping.is_zero());
        assert!(above.qualifies_for_free_shipping());
    }

    #[test]
    fn test_empty_cart_costs_nothing() {
        let summary = OrderSummary::compute(Price::ZERO, &CheckoutPolicy::default());
        assert!(summary.total.is_zero());
    }

    #[test]
    fn test_custom_policy() {
        let policy = CheckoutPolicy {
            tax_rate: Decimal::ZERO,
            free_shipping_threshold: Price::from_cents(10_000),
            flat_shipping: Price::from_cents(1000),
        };
        let summary = OrderSummary::compute(Price::from_cents(7500), &policy);
        assert_eq!(summary.total, Price::from_cents(8500));
    }
}
