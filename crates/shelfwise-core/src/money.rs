//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A P&L that sums 10,000 order lines in floats drifts by cents, and     │
//! │  gross_profit + cogs stops adding up to net_sales.                      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    Every amount is an i64 of cents; percentages are basis points.      │
//! │    Rounding happens exactly once, in one documented place.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use shelfwise_core::money::Money;
//!
//! let price = Money::from_cents(2_499);
//! let line = price * 3i64;                         // 74.97
//! let discount = line.percentage(1_000);           // 10% → 7.50
//! assert_eq!((line - discount).cents(), 6_747);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Basis points in 100%.
pub const BPS_SCALE: i64 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Design Decisions
/// - **i64 (signed)**: Net profit and returns can be negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Transparent serde**: serializes as a bare integer
///
/// ## Where Money is Used
/// ```text
/// Product.selling_price ──► OrderItem.unit_price ──► line_total ──┐
/// Product.cost_price    ──► OrderItem.unit_cost  ──► COGS ────────┤
///                                                                 ▼
///                                         ProfitAndLoss { net_sales, gross_profit, ... }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use shelfwise_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Multiplies money by a quantity.
    ///
    /// Callers pass amounts bounded by [`crate::MAX_AMOUNT_CENTS`] and
    /// quantities bounded by [`crate::MAX_LINE_QUANTITY`]; the product of
    /// the two fits in `i64` with room for a full document of lines.
    ///
    /// ## Example
    /// ```rust
    /// use shelfwise_core::money::Money;
    ///
    /// let unit_cost = Money::from_cents(1_250);
    /// assert_eq!(unit_cost.multiply_quantity(4).cents(), 5_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps` basis points of this amount, rounded half away from zero.
    ///
    /// ## Implementation
    /// `(amount * bps ± 5000) / 10000` in i128 so large yearly totals
    /// cannot overflow. The sign of the bias follows the sign of the
    /// product so that -0.5 rounds to -1 the same way 0.5 rounds to 1.
    ///
    /// ## Example
    /// ```rust
    /// use shelfwise_core::money::Money;
    ///
    /// // 8.25% of 10.00 = 0.825 → 0.83
    /// assert_eq!(Money::from_cents(1000).percentage(825).cents(), 83);
    /// ```
    pub fn percentage(&self, bps: i64) -> Money {
        let product = self.0 as i128 * bps as i128;
        let bias = if product < 0 { -5_000 } else { 5_000 };
        Money::from_cents(((product + bias) / BPS_SCALE as i128) as i64)
    }

    /// Integer division for averages; zero divisor yields zero.
    pub fn divide_by(&self, divisor: i64) -> Money {
        if divisor == 0 {
            return Money::zero();
        }
        Money(self.0 / divisor)
    }
}

/// Share of `part` in `whole`, in basis points, rounded half away from zero.
///
/// Margins are defined as zero when the base is zero so an empty period
/// reports `0.00%` rather than failing.
///
/// ## Example
/// ```rust
/// use shelfwise_core::money::{ratio_bps, Money};
///
/// assert_eq!(ratio_bps(Money::from_cents(1), Money::from_cents(3)), 3333);
/// assert_eq!(ratio_bps(Money::from_cents(5), Money::zero()), 0);
/// ```
pub fn ratio_bps(part: Money, whole: Money) -> i64 {
    if whole.is_zero() {
        return 0;
    }
    let numerator = part.cents() as i128 * BPS_SCALE as i128;
    let denominator = whole.cents() as i128;
    let half = denominator.abs() / 2;
    let rounded = if (numerator < 0) == (denominator < 0) {
        (numerator + half * denominator.signum()) / denominator
    } else {
        (numerator - half * denominator.signum()) / denominator
    };
    rounded as i64
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows a currency-neutral decimal (`-1234.50`).
///
/// ## Note
/// This is for logs and debugging. Currency symbols and grouping belong
/// to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
