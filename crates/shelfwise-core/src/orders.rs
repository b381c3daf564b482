//! # Order Rules
//!
//! Order totals and the two order state machines.
//!
//! ## Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per line:   gross      = qty × unit_price                              │
//! │              line_total = gross − line_discount   (0 ≤ disc ≤ gross)   │
//! │                                                                         │
//! │  order:      subtotal   = Σ line_total                                  │
//! │              coupon     = coupon.discount_for(subtotal)                 │
//! │              discount   = Σ line_discount + coupon                      │
//! │              total      = subtotal − coupon + shipping_fee              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Fulfilment Lifecycle
//! ```text
//!   pending ──► processing ──► shipped ──► delivered
//!      │            │             │            │
//!      ▼            ▼             └──────┬─────┘
//!   cancelled ◄─────┘                    ▼
//!                                     returned
//! ```
//! Entering `cancelled` or `returned` puts the stock back on the shelf,
//! once per order.
//!
//! ## Payment Lifecycle
//! ```text
//!   pending ──► paid ──► refunded
//!      │  ▲      ▲
//!      ▼  │      │
//!    failed ─────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Coupon, NewOrder, OrderStatus, PaymentStatus};
use crate::validation::{validate_amount_cents, validate_email, validate_quantity};
use crate::MAX_DOCUMENT_LINES;

// =============================================================================
// State Machines
// =============================================================================

/// Whether an order may move from `from` to `to`.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Processing)
            | (Pending, Cancelled)
            | (Processing, Shipped)
            | (Processing, Cancelled)
            | (Shipped, Delivered)
            | (Shipped, Returned)
            | (Delivered, Returned)
    )
}

/// Checks an order status transition.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> CoreResult<()> {
    if !can_transition(from, to) {
        return Err(CoreError::transition("Order", from, to));
    }
    Ok(())
}

/// Whether entering `status` returns the order's stock to the shelf.
#[inline]
pub fn restocks_on(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Cancelled | OrderStatus::Returned)
}

/// Whether payment may move from `from` to `to`.
pub fn can_transition_payment(from: PaymentStatus, to: PaymentStatus) -> bool {
    use PaymentStatus::*;
    matches!(
        (from, to),
        (Pending, Paid) | (Pending, Failed) | (Failed, Paid) | (Failed, Pending) | (Paid, Refunded)
    )
}

/// Checks a payment status transition.
pub fn check_payment_transition(from: PaymentStatus, to: PaymentStatus) -> CoreResult<()> {
    if !can_transition_payment(from, to) {
        return Err(CoreError::transition("Payment", from, to));
    }
    Ok(())
}

// =============================================================================
// Input Checks
// =============================================================================

/// Validates an order request before any lookup.
pub fn validate_order(order: &NewOrder) -> CoreResult<()> {
    if order.location_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "location_id".to_string(),
        }
        .into());
    }
    if order.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        }
        .into());
    }
    if order.items.len() > MAX_DOCUMENT_LINES {
        return Err(ValidationError::TooManyLines {
            field: "items".to_string(),
            max: MAX_DOCUMENT_LINES,
        }
        .into());
    }

    validate_amount_cents("shipping_fee_cents", order.shipping_fee_cents)?;
    validate_amount_cents("transaction_fee_cents", order.transaction_fee_cents)?;

    if let Some(email) = order.customer_email.as_deref().filter(|e| !e.trim().is_empty()) {
        validate_email(email)?;
    }

    for item in &order.items {
        if item.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            }
            .into());
        }
        validate_quantity(item.quantity)?;
        validate_amount_cents("discount_cents", item.discount_cents)?;
        if let Some(price) = item.unit_price_cents {
            validate_amount_cents("unit_price_cents", price)?;
        }
    }

    Ok(())
}

// =============================================================================
// Totals
// =============================================================================

/// An order line with its price resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricedLine {
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
}

impl PricedLine {
    #[inline]
    pub fn gross(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.gross() - self.discount
    }
}

/// Monetary summary of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderTotals {
    pub gross: Money,
    pub line_discounts: Money,
    pub subtotal: Money,
    pub coupon_discount: Money,
    /// Line discounts plus coupon discount.
    pub discount: Money,
    pub shipping_fee: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Computes order totals.
    ///
    /// ## Errors
    /// - A line discount above the line's gross value
    /// - A coupon that does not apply (see [`Coupon::discount_for`])
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use shelfwise_core::money::Money;
    /// use shelfwise_core::orders::{OrderTotals, PricedLine};
    ///
    /// let lines = [PricedLine {
    ///     quantity: 2,
    ///     unit_price: Money::from_cents(2_500),
    ///     discount: Money::from_cents(500),
    /// }];
    /// let totals = OrderTotals::compute(&lines, Money::from_cents(350), None, Utc::now()).unwrap();
    /// assert_eq!(totals.subtotal.cents(), 4_500);
    /// assert_eq!(totals.total.cents(), 4_850);
    /// ```
    pub fn compute(
        lines: &[PricedLine],
        shipping_fee: Money,
        coupon: Option<&Coupon>,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let mut gross = Money::zero();
        let mut line_discounts = Money::zero();

        for line in lines {
            if line.discount.is_negative() || line.discount > line.gross() {
                return Err(ValidationError::OutOfRange {
                    field: "discount_cents".to_string(),
                    min: 0,
                    max: line.gross().cents(),
                }
                .into());
            }
            gross += line.gross();
            line_discounts += line.discount;
        }

        let subtotal = gross - line_discounts;
        let coupon_discount = match coupon {
            Some(c) => c.discount_for(subtotal, now)?,
            None => Money::zero(),
        };

        Ok(OrderTotals {
            gross,
            line_discounts,
            subtotal,
            coupon_discount,
            discount: line_discounts + coupon_discount,
            shipping_fee,
            total: subtotal - coupon_discount + shipping_fee,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscountType, NewOrderItem, OrderSource, PaymentMethod};

    fn line(qty: i64, price: i64, discount: i64) -> PricedLine {
        PricedLine {
            quantity: qty,
            unit_price: Money::from_cents(price),
            discount: Money::from_cents(discount),
        }
    }

    fn coupon(kind: DiscountType, value: i64) -> Coupon {
        Coupon {
            id: "c-1".to_string(),
            code: "SAVE".to_string(),
            discount_type: kind,
            value,
            min_order_cents: 0,
            max_discount_cents: None,
            usage_limit: None,
            used_count: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_transitions() {
        assert!(can_transition(OrderStatus::Pending, OrderStatus::Processing));
        assert!(can_transition(OrderStatus::Processing, OrderStatus::Cancelled));
        assert!(can_transition(OrderStatus::Delivered, OrderStatus::Returned));

        assert!(!can_transition(OrderStatus::Pending, OrderStatus::Delivered));
        assert!(!can_transition(OrderStatus::Shipped, OrderStatus::Cancelled));
        assert!(!can_transition(OrderStatus::Cancelled, OrderStatus::Pending));
        assert!(!can_transition(OrderStatus::Returned, OrderStatus::Returned));

        assert!(restocks_on(OrderStatus::Cancelled));
        assert!(restocks_on(OrderStatus::Returned));
        assert!(!restocks_on(OrderStatus::Delivered));
    }

    #[test]
    fn test_payment_transitions() {
        assert!(check_payment_transition(PaymentStatus::Pending, PaymentStatus::Paid).is_ok());
        assert!(check_payment_transition(PaymentStatus::Failed, PaymentStatus::Pending).is_ok());
        assert!(check_payment_transition(PaymentStatus::Paid, PaymentStatus::Refunded).is_ok());

        assert!(check_payment_transition(PaymentStatus::Pending, PaymentStatus::Refunded).is_err());
        assert!(check_payment_transition(PaymentStatus::Refunded, PaymentStatus::Paid).is_err());
    }

    #[test]
    fn test_totals_without_coupon() {
        let lines = [line(2, 1_000, 200), line(1, 3_000, 0)];
        let totals = OrderTotals::compute(&lines, Money::from_cents(400), None, Utc::now()).unwrap();

        assert_eq!(totals.gross.cents(), 5_000);
        assert_eq!(totals.subtotal.cents(), 4_800);
        assert_eq!(totals.discount.cents(), 200);
        assert_eq!(totals.total.cents(), 5_200);
    }

    #[test]
    fn test_totals_with_percentage_coupon() {
        let lines = [line(4, 2_500, 0)];
        let c = coupon(DiscountType::Percentage, 1_000);
        let totals = OrderTotals::compute(&lines, Money::zero(), Some(&c), Utc::now()).unwrap();

        assert_eq!(totals.subtotal.cents(), 10_000);
        assert_eq!(totals.coupon_discount.cents(), 1_000);
        assert_eq!(totals.discount.cents(), 1_000);
        assert_eq!(totals.total.cents(), 9_000);
    }

    #[test]
    fn test_fixed_coupon_never_exceeds_subtotal() {
        let lines = [line(1, 500, 0)];
        let c = coupon(DiscountType::Fixed, 2_000);
        let totals = OrderTotals::compute(&lines, Money::from_cents(300), Some(&c), Utc::now()).unwrap();

        assert_eq!(totals.coupon_discount.cents(), 500);
        assert_eq!(totals.total.cents(), 300);
    }

    #[test]
    fn test_line_discount_above_gross_rejected() {
        let lines = [line(1, 500, 600)];
        assert!(OrderTotals::compute(&lines, Money::zero(), None, Utc::now()).is_err());
    }

    #[test]
    fn test_validate_order() {
        let mut order = NewOrder {
            source: OrderSource::Website,
            location_id: "main".to_string(),
            customer_name: Some("Nimal".to_string()),
            customer_phone: None,
            customer_email: Some("nimal@example.lk".to_string()),
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: None,
            coupon_code: None,
            shipping_fee_cents: 350,
            transaction_fee_cents: 0,
            items: vec![NewOrderItem {
                product_id: "tee".to_string(),
                variant_id: String::new(),
                size: "M".to_string(),
                quantity: 1,
                unit_price_cents: None,
                discount_cents: 0,
            }],
        };
        assert!(validate_order(&order).is_ok());

        order.customer_email = Some("not-an-email".to_string());
        assert!(validate_order(&order).is_err());

        order.customer_email = None;
        order.items[0].unit_price_cents = Some(10_000_000_000_000);
        order.items[0].quantity = 1_000_000;
        assert!(matches!(
            validate_order(&order),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        order.items[0].unit_price_cents = None;
        order.shipping_fee_cents = i64::MAX;
        assert!(validate_order(&order).is_err());

        order.shipping_fee_cents = 350;
        order.items[0].quantity = 0;
        assert!(validate_order(&order).is_err());

        order.items.clear();
        assert!(validate_order(&order).is_err());
    }
}
