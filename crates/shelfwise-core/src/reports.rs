//! # Reports Engine
//!
//! Profit & loss statement and yearly sales summary, computed from orders
//! and petty-cash entries that the database layer has already loaded.
//!
//! ## Recognition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  An order is RECOGNISED in [from, to) when                              │
//! │    status         ≠ cancelled                                          │
//! │    payment_status ≠ failed                                             │
//! │    from ≤ created_at < to                                              │
//! │                                                                         │
//! │  A recognised order with status = returned is a RETURN:                │
//! │    its merchandise value is reversed under `returns`                   │
//! │    its COGS is not counted (the stock came back)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Statement
//! ```text
//!   gross_sales          Σ qty × unit_price
//! − discounts            Σ discount_cents (line + coupon)
//! − returns              Σ (gross − discounts) of returned orders
//! ═ net_sales
//! − cogs                 Σ qty × unit_cost of kept orders
//! ═ gross_profit                                  gross_margin = gp / net
//! + shipping_income      kept orders
//! − transaction_fees     all recognised orders
//! − operating_expenses   petty-cash expenses in range
//! ═ net_profit                                    net_margin = np / net
//! ```
//!
//! All amounts are [`Money`] (cents), all margins are basis points.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{ratio_bps, Money};
use crate::types::{Order, OrderSource, OrderStatus, PaymentStatus, PettyCashEntry, PettyCashKind};

/// Earliest year a yearly summary can be asked for.
pub const MIN_REPORT_YEAR: i32 = 2000;

/// Latest year a yearly summary can be asked for.
pub const MAX_REPORT_YEAR: i32 = 2100;

// =============================================================================
// Period
// =============================================================================

/// Half-open reporting interval `[from, to)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportPeriod {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
}

impl ReportPeriod {
    /// Creates a period; `from` must be strictly before `to`.
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> CoreResult<Self> {
        if from >= to {
            return Err(CoreError::InvalidPeriod {
                reason: format!("from ({from}) must be before to ({to})"),
            });
        }
        Ok(ReportPeriod { from, to })
    }

    /// The calendar year `year` in UTC.
    pub fn year(year: i32) -> CoreResult<Self> {
        if !(MIN_REPORT_YEAR..=MAX_REPORT_YEAR).contains(&year) {
            return Err(CoreError::InvalidPeriod {
                reason: format!("year must be between {MIN_REPORT_YEAR} and {MAX_REPORT_YEAR}"),
            });
        }
        let from = start_of_year(year)?;
        let to = start_of_year(year + 1)?;
        ReportPeriod::new(from, to)
    }

    #[inline]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at < self.to
    }
}

fn start_of_year(year: i32) -> CoreResult<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| CoreError::InvalidPeriod {
            reason: format!("{year} is not a representable year"),
        })
}

/// Whether an order counts towards revenue in `period`.
pub fn is_recognised(order: &Order, period: &ReportPeriod) -> bool {
    order.status != OrderStatus::Cancelled
        && order.payment_status != PaymentStatus::Failed
        && period.contains(order.created_at)
}

// =============================================================================
// Sales Figures
// =============================================================================

/// The sales side of the statement. Shared by the P&L, its per-source
/// breakdown and every month of the yearly summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesFigures {
    /// Recognised orders that were not returned.
    pub order_count: i64,
    pub returned_count: i64,
    pub units_sold: i64,
    pub gross_sales: Money,
    pub discounts: Money,
    pub returns: Money,
    pub net_sales: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub gross_margin_bps: i64,
}

impl SalesFigures {
    /// Adds one recognised order. Call [`SalesFigures::finish`] afterwards.
    pub fn record(&mut self, order: &Order) {
        let gross: Money = order.items.iter().map(|i| i.gross()).sum();
        let discounts = Money::from_cents(order.discount_cents);

        self.gross_sales += gross;
        self.discounts += discounts;

        if order.status == OrderStatus::Returned {
            self.returned_count += 1;
            self.returns += gross - discounts;
        } else {
            self.order_count += 1;
            self.units_sold += order.items.iter().map(|i| i.quantity).sum::<i64>();
            self.cogs += order.items.iter().map(|i| i.cost()).sum();
        }
    }

    /// Derives net sales, gross profit and margin from the recorded totals.
    pub fn finish(&mut self) {
        self.net_sales = self.gross_sales - self.discounts - self.returns;
        self.gross_profit = self.net_sales - self.cogs;
        self.gross_margin_bps = ratio_bps(self.gross_profit, self.net_sales);
    }
}

/// Sales figures for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SourceSales {
    pub source: OrderSource,
    #[serde(flatten)]
    pub sales: SalesFigures,
}

fn by_source<'a>(orders: impl Iterator<Item = &'a Order>) -> Vec<SourceSales> {
    let mut map: BTreeMap<OrderSource, SalesFigures> = OrderSource::ALL
        .iter()
        .map(|s| (*s, SalesFigures::default()))
        .collect();

    for order in orders {
        map.entry(order.source).or_default().record(order);
    }

    map.into_iter()
        .map(|(source, mut sales)| {
            sales.finish();
            SourceSales { source, sales }
        })
        .collect()
}

// =============================================================================
// Profit & Loss
// =============================================================================

/// Operating expense total for one petty-cash category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseLine {
    pub category: String,
    pub amount: Money,
}

/// Profit & loss statement for a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfitAndLoss {
    pub period: ReportPeriod,
    pub gross_sales: Money,
    pub discounts: Money,
    pub returns: Money,
    pub net_sales: Money,
    pub cogs: Money,
    pub gross_profit: Money,
    pub gross_margin_bps: i64,
    pub shipping_income: Money,
    pub transaction_fees: Money,
    pub operating_expenses: Money,
    pub expenses_by_category: Vec<ExpenseLine>,
    pub net_profit: Money,
    pub net_margin_bps: i64,
    pub order_count: i64,
    pub returned_count: i64,
    pub units_sold: i64,
    pub average_order_value: Money,
    pub by_source: Vec<SourceSales>,
}

impl ProfitAndLoss {
    /// Builds the statement.
    ///
    /// `orders` must carry their items. Orders and expenses outside the
    /// period (or not recognised) are ignored, so callers may pass a
    /// superset.
    pub fn compute(period: ReportPeriod, orders: &[Order], expenses: &[PettyCashEntry]) -> Self {
        let recognised: Vec<&Order> = orders.iter().filter(|o| is_recognised(o, &period)).collect();

        let mut sales = SalesFigures::default();
        let mut shipping_income = Money::zero();
        let mut transaction_fees = Money::zero();
        for order in &recognised {
            sales.record(order);
            transaction_fees += Money::from_cents(order.transaction_fee_cents);
            if order.status != OrderStatus::Returned {
                shipping_income += Money::from_cents(order.shipping_fee_cents);
            }
        }
        sales.finish();

        let expenses_by_category = expense_lines(&period, expenses);
        let operating_expenses: Money = expenses_by_category.iter().map(|e| e.amount).sum();

        let net_profit = sales.gross_profit + shipping_income - transaction_fees - operating_expenses;

        ProfitAndLoss {
            period,
            gross_sales: sales.gross_sales,
            discounts: sales.discounts,
            returns: sales.returns,
            net_sales: sales.net_sales,
            cogs: sales.cogs,
            gross_profit: sales.gross_profit,
            gross_margin_bps: sales.gross_margin_bps,
            shipping_income,
            transaction_fees,
            operating_expenses,
            expenses_by_category,
            net_profit,
            net_margin_bps: ratio_bps(net_profit, sales.net_sales),
            order_count: sales.order_count,
            returned_count: sales.returned_count,
            units_sold: sales.units_sold,
            average_order_value: sales.net_sales.divide_by(sales.order_count),
            by_source: by_source(recognised.iter().copied()),
        }
    }
}

/// Petty-cash expenses in the period, grouped by category (alphabetical).
pub fn expense_lines(period: &ReportPeriod, entries: &[PettyCashEntry]) -> Vec<ExpenseLine> {
    let mut totals: BTreeMap<&str, Money> = BTreeMap::new();
    for entry in entries
        .iter()
        .filter(|e| e.kind == PettyCashKind::Expense && period.contains(e.occurred_at))
    {
        *totals.entry(entry.category.as_str()).or_default() += entry.amount();
    }

    totals
        .into_iter()
        .map(|(category, amount)| ExpenseLine {
            category: category.to_string(),
            amount,
        })
        .collect()
}

// =============================================================================
// Yearly Sales Summary
// =============================================================================

/// Sales figures for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MonthlySales {
    /// 1 = January.
    pub month: u32,
    #[serde(flatten)]
    pub sales: SalesFigures,
}

/// Month-by-month sales for one year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct YearlySalesSummary {
    pub year: i32,
    /// Always twelve rows, January first.
    pub months: Vec<MonthlySales>,
    pub totals: SalesFigures,
    pub by_source: Vec<SourceSales>,
}

/// Builds the yearly summary from orders (with items).
///
/// ## Example
/// ```rust
/// use shelfwise_core::reports::yearly_sales_summary;
///
/// let summary = yearly_sales_summary(2026, &[]).unwrap();
/// assert_eq!(summary.months.len(), 12);
/// assert_eq!(summary.totals.order_count, 0);
/// assert!(yearly_sales_summary(1999, &[]).is_err());
/// ```
pub fn yearly_sales_summary(year: i32, orders: &[Order]) -> CoreResult<YearlySalesSummary> {
    let period = ReportPeriod::year(year)?;
    let recognised: Vec<&Order> = orders.iter().filter(|o| is_recognised(o, &period)).collect();

    let mut months: Vec<MonthlySales> = (1..=12)
        .map(|month| MonthlySales {
            month,
            sales: SalesFigures::default(),
        })
        .collect();
    let mut totals = SalesFigures::default();

    for order in &recognised {
        let index = order.created_at.month0() as usize;
        months[index].sales.record(order);
        totals.record(order);
    }

    for month in &mut months {
        month.sales.finish();
    }
    totals.finish();

    Ok(YearlySalesSummary {
        year,
        months,
        totals,
        by_source: by_source(recognised.iter().copied()),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
