//! # Report Repository
//!
//! Loads the rows behind the P&L and the yearly sales summary and hands
//! them to `shelfwise_core::reports`, which does all the arithmetic.
//!
//! ```text
//! profit_and_loss(from, to)
//!      │
//!      ├── orders created in [from, to) + items     (one join, no N+1)
//!      ├── petty-cash entries in [from, to)
//!      ▼
//! ProfitAndLoss::compute (core)
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::order::created_between;
use crate::error::DbResult;
use shelfwise_core::reports::{self, ProfitAndLoss, ReportPeriod, YearlySalesSummary};
use shelfwise_core::PettyCashEntry;

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Profit & loss for `[from, to)`.
    ///
    /// ## Returns
    /// * `Err(Domain(InvalidPeriod))` - `from >= to`
    pub async fn profit_and_loss(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<ProfitAndLoss> {
        let period = ReportPeriod::new(from, to)?;

        let orders = created_between(&self.pool, period.from, period.to).await?;
        let expenses = sqlx::query_as::<_, PettyCashEntry>(
            r#"
            SELECT * FROM petty_cash_entries
            WHERE kind = 'expense' AND occurred_at >= ?1 AND occurred_at < ?2
            ORDER BY occurred_at
            "#,
        )
        .bind(period.from)
        .bind(period.to)
        .fetch_all(&self.pool)
        .await?;

        debug!(orders = orders.len(), expenses = expenses.len(), "Computing profit and loss");
        let pnl = ProfitAndLoss::compute(period, &orders, &expenses);

        info!(
            from = %period.from,
            to = %period.to,
            net_sales = %pnl.net_sales,
            net_profit = %pnl.net_profit,
            "Profit and loss generated"
        );
        Ok(pnl)
    }

    /// Month-by-month sales for a calendar year (UTC).
    ///
    /// ## Returns
    /// * `Err(Domain(InvalidPeriod))` - year outside 2000..=2100
    pub async fn yearly_sales_summary(&self, year: i32) -> DbResult<YearlySalesSummary> {
        let period = ReportPeriod::year(year)?;
        let orders = created_between(&self.pool, period.from, period.to).await?;

        debug!(year, orders = orders.len(), "Computing yearly sales summary");
        Ok(reports::yearly_sales_summary(year, &orders)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::{fixtures, test_db};
    use crate::Database;
    use chrono::TimeZone;
    use shelfwise_core::{
        CoreError, NewOrder, NewOrderItem, NewPettyCashEntry, OrderSource, OrderStatus,
        PaymentMethod, PaymentStatus, PettyCashKind, StockKey,
    };

    fn at(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, month, day, 12, 0, 0).unwrap()
    }

    /// Store with 100 × TEE-001 (price 50.00, cost 20.00).
    async fn setup() -> (Database, String, String) {
        let db = test_db().await;
        let store = fixtures::location(&db, "Store").await;
        let tee = fixtures::product(&db, "TEE-001", 5_000, 2_000).await;
        db.inventory()
            .add_stock(&StockKey::new(&store, &tee.id), 100, None)
            .await
            .unwrap();
        (db, store, tee.id)
    }

    fn order(store: &str, tee: &str, source: OrderSource, qty: i64, discount: i64) -> NewOrder {
        NewOrder {
            source,
            location_id: store.to_string(),
            customer_name: None,
            customer_phone: None,
            customer_email: None,
            payment_method: PaymentMethod::Cash,
            payment_status: Some(PaymentStatus::Paid),
            coupon_code: None,
            shipping_fee_cents: 0,
            transaction_fee_cents: 0,
            items: vec![NewOrderItem {
                product_id: tee.to_string(),
                variant_id: String::new(),
                size: String::new(),
                quantity: qty,
                unit_price_cents: None,
                discount_cents: discount,
            }],
        }
    }

    #[tokio::test]
    async fn test_profit_and_loss() {
        let (db, store, tee) = setup().await;

        // kept: 3 × 50.00 − 10.00 discount, shipping 4.00, fee 2.50
        let mut kept = order(&store, &tee, OrderSource::Website, 3, 1_000);
        kept.shipping_fee_cents = 400;
        kept.transaction_fee_cents = 250;
        db.orders().create(&kept, at(3, 5)).await.unwrap();

        // returned: 1 × 50.00
        let returned = db
            .orders()
            .create(&order(&store, &tee, OrderSource::Store, 1, 0), at(3, 6))
            .await
            .unwrap();
        for status in [OrderStatus::Processing, OrderStatus::Shipped, OrderStatus::Returned] {
            db.orders().update_status(&returned.id, status).await.unwrap();
        }

        // cancelled and out-of-period orders are ignored
        let cancelled = db
            .orders()
            .create(&order(&store, &tee, OrderSource::Store, 2, 0), at(3, 7))
            .await
            .unwrap();
        db.orders().update_status(&cancelled.id, OrderStatus::Cancelled).await.unwrap();
        db.orders()
            .create(&order(&store, &tee, OrderSource::Store, 5, 0), at(4, 2))
            .await
            .unwrap();

        for (kind, category, cents) in [
            (PettyCashKind::TopUp, "float", 10_000),
            (PettyCashKind::Expense, "transport", 1_500),
        ] {
            db.petty_cash()
                .record(&NewPettyCashEntry {
                    kind,
                    category: category.to_string(),
                    amount_cents: cents,
                    description: None,
                    reference: None,
                    occurred_at: Some(at(3, 10)),
                })
                .await
                .unwrap();
        }

        let pnl = db
            .reports()
            .profit_and_loss(at(3, 1), at(4, 1))
            .await
            .unwrap();

        assert_eq!(pnl.gross_sales.cents(), 20_000);
        assert_eq!(pnl.discounts.cents(), 1_000);
        assert_eq!(pnl.returns.cents(), 5_000);
        assert_eq!(pnl.net_sales.cents(), 14_000);
        assert_eq!(pnl.cogs.cents(), 6_000);
        assert_eq!(pnl.gross_profit.cents(), 8_000);
        assert_eq!(pnl.shipping_income.cents(), 400);
        assert_eq!(pnl.transaction_fees.cents(), 250);
        assert_eq!(pnl.operating_expenses.cents(), 1_500);
        assert_eq!(pnl.net_profit.cents(), 8_000 + 400 - 250 - 1_500);
        assert_eq!(pnl.order_count, 1);
        assert_eq!(pnl.returned_count, 1);
        assert_eq!(pnl.units_sold, 3);
        assert_eq!(pnl.average_order_value.cents(), 14_000);
        assert_eq!(pnl.expenses_by_category.len(), 1);
        assert_eq!(pnl.by_source.len(), 2);

        let err = db.reports().profit_and_loss(at(4, 1), at(3, 1)).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidPeriod { .. })));
    }

    #[tokio::test]
    async fn test_yearly_summary() {
        let (db, store, tee) = setup().await;

        db.orders()
            .create(&order(&store, &tee, OrderSource::Store, 2, 0), at(1, 15))
            .await
            .unwrap();
        db.orders()
            .create(&order(&store, &tee, OrderSource::Website, 1, 0), at(1, 20))
            .await
            .unwrap();
        db.orders()
            .create(&order(&store, &tee, OrderSource::Website, 4, 0), at(11, 3))
            .await
            .unwrap();

        let summary = db.reports().yearly_sales_summary(2026).await.unwrap();
        assert_eq!(summary.months.len(), 12);
        assert_eq!(summary.months[0].sales.order_count, 2);
        assert_eq!(summary.months[0].sales.units_sold, 3);
        assert_eq!(summary.months[5].sales.order_count, 0);
        assert_eq!(summary.months[10].sales.net_sales.cents(), 20_000);
        assert_eq!(summary.totals.units_sold, 7);
        assert_eq!(summary.totals.gross_margin_bps, 6_000);

        let website = summary
            .by_source
            .iter()
            .find(|s| s.source == OrderSource::Website)
            .unwrap();
        assert_eq!(website.sales.order_count, 2);

        assert!(db.reports().yearly_sales_summary(1999).await.is_err());
        assert!(db.reports().yearly_sales_summary(2025).await.unwrap().totals.order_count == 0);
    }
}
