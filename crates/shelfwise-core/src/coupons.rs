//! # Coupon Rules
//!
//! Eligibility and discount calculation for promotion codes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  discount_for(subtotal, now)                                            │
//! │                                                                         │
//! │   1. is_active?                      no  → "inactive"                   │
//! │   2. now ≥ starts_at?                no  → "not yet valid"              │
//! │   3. now < expires_at?               no  → "expired"                    │
//! │   4. used_count < usage_limit?       no  → "usage limit reached"        │
//! │   5. subtotal ≥ min_order?           no  → "minimum order not met"      │
//! │                                                                         │
//! │   raw    = percentage ? round(subtotal × bps) : value                   │
//! │   capped = min(raw, max_discount, subtotal)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Coupon, DiscountType, NewCoupon};
use crate::validation::{
    normalize_coupon_code, validate_amount_cents, validate_percentage_bps, validate_positive_amount_cents,
};

impl Coupon {
    /// Why this coupon cannot be used right now, if anything.
    pub fn rejection_reason(&self, subtotal: Money, now: DateTime<Utc>) -> Option<String> {
        if !self.is_active {
            return Some("inactive".to_string());
        }
        if let Some(starts_at) = self.starts_at {
            if now < starts_at {
                return Some("not yet valid".to_string());
            }
        }
        if let Some(expires_at) = self.expires_at {
            if now >= expires_at {
                return Some("expired".to_string());
            }
        }
        if !self.has_uses_left() {
            return Some("usage limit reached".to_string());
        }
        if subtotal.cents() < self.min_order_cents {
            return Some(format!(
                "minimum order of {} not met",
                Money::from_cents(self.min_order_cents)
            ));
        }
        None
    }

    /// Discount this coupon gives on `subtotal` at `now`.
    ///
    /// ## Example
    /// ```rust
    /// use chrono::Utc;
    /// use shelfwise_core::money::Money;
    /// use shelfwise_core::{Coupon, DiscountType};
    ///
    /// let coupon = Coupon {
    ///     id: "c".into(),
    ///     code: "TENOFF".into(),
    ///     discount_type: DiscountType::Percentage,
    ///     value: 1_000,
    ///     min_order_cents: 0,
    ///     max_discount_cents: Some(500),
    ///     usage_limit: None,
    ///     used_count: 0,
    ///     starts_at: None,
    ///     expires_at: None,
    ///     is_active: true,
    ///     created_at: Utc::now(),
    /// };
    /// // 10% of 80.00 is 8.00, capped at 5.00
    /// let discount = coupon.discount_for(Money::from_cents(8_000), Utc::now()).unwrap();
    /// assert_eq!(discount.cents(), 500);
    /// ```
    pub fn discount_for(&self, subtotal: Money, now: DateTime<Utc>) -> CoreResult<Money> {
        if let Some(reason) = self.rejection_reason(subtotal, now) {
            return Err(CoreError::coupon(&self.code, reason));
        }

        let raw = match self.discount_type {
            DiscountType::Percentage => subtotal.percentage(self.value),
            DiscountType::Fixed => Money::from_cents(self.value),
        };

        let capped = match self.max_discount_cents {
            Some(max) => raw.min(Money::from_cents(max)),
            None => raw,
        };

        Ok(capped.min(subtotal).max(Money::zero()))
    }

    /// Whether another redemption is allowed by the usage limit.
    #[inline]
    pub fn has_uses_left(&self) -> bool {
        self.usage_limit.map_or(true, |limit| self.used_count < limit)
    }
}

/// Validates a new coupon and returns its normalised code.
///
/// ## Rules
/// - Code: see [`normalize_coupon_code`]
/// - Percentage: 1-10000 bps; fixed: > 0 cents
/// - `min_order_cents`, `max_discount_cents` ≥ 0; `usage_limit` > 0
/// - `starts_at` < `expires_at` when both are given
pub fn validate_coupon(coupon: &NewCoupon) -> CoreResult<String> {
    let code = normalize_coupon_code(&coupon.code)?;

    match coupon.discount_type {
        DiscountType::Percentage => validate_percentage_bps(coupon.value)?,
        DiscountType::Fixed => validate_positive_amount_cents("value", coupon.value)?,
    }

    validate_amount_cents("min_order_cents", coupon.min_order_cents)?;
    if let Some(max) = coupon.max_discount_cents {
        validate_amount_cents("max_discount_cents", max)?;
    }
    if let Some(limit) = coupon.usage_limit {
        if limit <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "usage_limit".to_string(),
            }
            .into());
        }
    }

    if let (Some(starts_at), Some(expires_at)) = (coupon.starts_at, coupon.expires_at) {
        if starts_at >= expires_at {
            return Err(ValidationError::InvalidFormat {
                field: "expires_at".to_string(),
                reason: "must be after starts_at".to_string(),
            }
            .into());
        }
    }

    Ok(code)
}

// =============================================================================
// Unit Tests
// =============================================================================
