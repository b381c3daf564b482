//! # Order Repository
//!
//! Store and website orders.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE (one transaction)                                           │
//! │     ├── resolve products, snapshot sku/name/price/cost                 │
//! │     ├── OrderTotals::compute (core) incl. coupon                       │
//! │     ├── redeem coupon (guarded used_count)                             │
//! │     ├── INSERT orders + order_items                                    │
//! │     └── inventory::post(−qty, order_fulfilment) per line               │
//! │                                                                         │
//! │  2. STATUS                                                             │
//! │     └── update_status() → validated by the core state machine          │
//! │         cancelled / returned → order_restock per line, once            │
//! │                                                                         │
//! │  3. PAYMENT                                                            │
//! │     └── update_payment_status() → pending / paid / failed / refunded   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::coupon::{find as find_coupon, redeem};
use super::inventory::{post, Posting};
use super::location::ensure_active;
use super::product::{ensure_variant, find_by_id as find_product};
use super::{clean, generate_id};
use crate::error::{DbError, DbResult};
use shelfwise_core::money::Money;
use shelfwise_core::orders::{
    check_payment_transition, check_transition, restocks_on, validate_order, OrderTotals, PricedLine,
};
use shelfwise_core::purchasing::document_number;
use shelfwise_core::validation::clamp_page;
use shelfwise_core::{
    CoreError, MovementKind, NewOrder, Order, OrderFilter, OrderItem, OrderStatus, PaymentStatus,
    StockKey,
};

/// Hard cap on one page of orders.
const MAX_PAGE: i64 = 500;

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Places an order and takes its stock.
    ///
    /// `now` stamps the order and is the instant coupon windows are checked
    /// against.
    ///
    /// ## Returns
    /// * `Ok(Order)` - the stored order with items
    /// * `Err(Domain(InsufficientStock))` - a line cannot be filled; nothing
    ///   is written and the coupon is not used
    /// * `Err(Domain(CouponRejected))` - coupon not applicable
    /// * `Err(Domain(ProductInactive | LocationInactive))`
    pub async fn create(&self, input: &NewOrder, now: DateTime<Utc>) -> DbResult<Order> {
        validate_order(input)?;

        let mut tx = self.pool.begin().await?;
        ensure_active(&mut tx, &input.location_id).await?;

        let uuid = Uuid::new_v4();
        let order_id = uuid.to_string();
        let order_number = document_number("ORD", now, &uuid);

        // Resolve prices and snapshots before anything is written
        let mut items = Vec::with_capacity(input.items.len());
        let mut priced = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let product = find_product(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", &line.product_id))?;
            if !product.is_active {
                return Err(CoreError::ProductInactive(product.sku).into());
            }
            ensure_variant(&mut tx, &product.id, &line.variant_id).await?;

            let priced_line = PricedLine {
                quantity: line.quantity,
                unit_price: Money::from_cents(line.unit_price_cents.unwrap_or(product.selling_price_cents)),
                discount: Money::from_cents(line.discount_cents),
            };

            items.push(OrderItem {
                id: generate_id(),
                order_id: order_id.clone(),
                product_id: product.id,
                variant_id: line.variant_id.clone(),
                size: line.size.trim().to_string(),
                sku_snapshot: product.sku,
                name_snapshot: product.name,
                quantity: line.quantity,
                unit_price_cents: priced_line.unit_price.cents(),
                unit_cost_cents: product.cost_price_cents,
                discount_cents: line.discount_cents,
                line_total_cents: priced_line.line_total().cents(),
            });
            priced.push(priced_line);
        }

        let coupon = match input.coupon_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(
                find_coupon(&mut tx, code)
                    .await?
                    .ok_or_else(|| DbError::not_found("Coupon", code.to_uppercase()))?,
            ),
            None => None,
        };

        let totals = OrderTotals::compute(
            &priced,
            Money::from_cents(input.shipping_fee_cents),
            coupon.as_ref(),
            now,
        )?;

        if let Some(coupon) = &coupon {
            redeem(&mut tx, coupon).await?;
        }

        let mut order = Order {
            id: order_id,
            order_number,
            source: input.source,
            location_id: input.location_id.clone(),
            customer_name: clean(input.customer_name.as_deref()),
            customer_phone: clean(input.customer_phone.as_deref()),
            customer_email: clean(input.customer_email.as_deref()),
            status: OrderStatus::Pending,
            payment_status: input.payment_status.unwrap_or_default(),
            payment_method: input.payment_method,
            coupon_code: coupon.as_ref().map(|c| c.code.clone()),
            subtotal_cents: totals.subtotal.cents(),
            discount_cents: totals.discount.cents(),
            shipping_fee_cents: input.shipping_fee_cents,
            transaction_fee_cents: input.transaction_fee_cents,
            total_cents: totals.total.cents(),
            stock_restored: false,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        };

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, source, location_id,
                customer_name, customer_phone, customer_email,
                status, payment_status, payment_method, coupon_code,
                subtotal_cents, discount_cents, shipping_fee_cents,
                transaction_fee_cents, total_cents, stock_restored,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(order.source)
        .bind(&order.location_id)
        .bind(&order.customer_name)
        .bind(&order.customer_phone)
        .bind(&order.customer_email)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(order.payment_method)
        .bind(&order.coupon_code)
        .bind(order.subtotal_cents)
        .bind(order.discount_cents)
        .bind(order.shipping_fee_cents)
        .bind(order.transaction_fee_cents)
        .bind(order.total_cents)
        .bind(order.stock_restored)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    id, order_id, product_id, variant_id, size,
                    sku_snapshot, name_snapshot, quantity,
                    unit_price_cents, unit_cost_cents, discount_cents, line_total_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                "#,
            )
            .bind(&item.id)
            .bind(&item.order_id)
            .bind(&item.product_id)
            .bind(&item.variant_id)
            .bind(&item.size)
            .bind(&item.sku_snapshot)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.unit_cost_cents)
            .bind(item.discount_cents)
            .bind(item.line_total_cents)
            .execute(&mut *tx)
            .await?;

            let key = item_key(&order.location_id, item);
            let posted = post(
                &mut tx,
                &Posting {
                    key: &key,
                    delta: -item.quantity,
                    kind: MovementKind::OrderFulfilment,
                    reference: Some(&order.order_number),
                    note: None,
                },
            )
            .await;
            if let Err(e) = posted {
                warn!(order_number = %order.order_number, sku = %item.sku_snapshot, "Order rejected");
                return Err(e);
            }
        }

        tx.commit().await?;
        order.items = items;

        info!(
            order_number = %order.order_number,
            source = %order.source,
            lines = order.items.len(),
            total_cents = order.total_cents,
            coupon = ?order.coupon_code,
            "Order created"
        );
        Ok(order)
    }

    /// Gets an order with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn, id).await
    }

    /// Lists orders, newest first, with items.
    pub async fn list(&self, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        let (limit, offset) = clamp_page(filter.limit, filter.offset, MAX_PAGE);

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM orders WHERE 1 = 1");
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(source) = filter.source {
            qb.push(" AND source = ").push_bind(source);
        }
        if let Some(from) = filter.from {
            qb.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND created_at < ").push_bind(to);
        }
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        debug!(status = ?filter.status, source = ?filter.source, limit, offset, "Listing orders");

        let mut orders = qb.build_query_as::<Order>().fetch_all(&self.pool).await?;
        attach_items(&self.pool, &mut orders).await?;
        Ok(orders)
    }

    /// Moves an order through its fulfilment lifecycle.
    ///
    /// Entering `cancelled` or `returned` puts every line back on the shelf
    /// at the order's location, in the same transaction. `stock_restored`
    /// makes this happen at most once per order.
    pub async fn update_status(&self, id: &str, to: OrderStatus) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let mut order = load(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        if let Err(e) = check_transition(order.status, to) {
            warn!(order_number = %order.order_number, from = %order.status, to = %to, "Order transition rejected");
            return Err(e.into());
        }

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
        )
        .bind(id)
        .bind(order.status)
        .bind(to)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::transition("Order", order.status, to).into());
        }

        if restocks_on(to) && !order.stock_restored {
            for item in &order.items {
                let key = item_key(&order.location_id, item);
                post(
                    &mut tx,
                    &Posting {
                        key: &key,
                        delta: item.quantity,
                        kind: MovementKind::OrderRestock,
                        reference: Some(&order.order_number),
                        note: Some(to.as_str()),
                    },
                )
                .await?;
            }

            sqlx::query("UPDATE orders SET stock_restored = 1 WHERE id = ?1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            order.stock_restored = true;
        }

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            from = %order.status,
            to = %to,
            restocked = order.stock_restored,
            "Order status changed"
        );
        order.status = to;
        order.updated_at = now;
        Ok(order)
    }

    /// Records a payment status change.
    pub async fn update_payment_status(&self, id: &str, to: PaymentStatus) -> DbResult<Order> {
        let mut tx = self.pool.begin().await?;

        let mut order = load(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;

        if let Err(e) = check_payment_transition(order.payment_status, to) {
            warn!(order_number = %order.order_number, from = %order.payment_status, to = %to, "Payment transition rejected");
            return Err(e.into());
        }

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE orders SET payment_status = ?3, updated_at = ?4
            WHERE id = ?1 AND payment_status = ?2
            "#,
        )
        .bind(id)
        .bind(order.payment_status)
        .bind(to)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::transition("Payment", order.payment_status, to).into());
        }

        tx.commit().await?;

        info!(order_number = %order.order_number, from = %order.payment_status, to = %to, "Payment status changed");
        order.payment_status = to;
        order.updated_at = now;
        Ok(order)
    }
}

fn item_key(location_id: &str, item: &OrderItem) -> StockKey {
    StockKey::new(location_id, item.product_id.clone())
        .with_variant(item.variant_id.clone())
        .with_size(item.size.clone())
}

async fn load(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(mut order) = order else {
        return Ok(None);
    };

    order.items =
        sqlx::query_as::<_, OrderItem>("SELECT * FROM order_items WHERE order_id = ?1 ORDER BY rowid")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;

    Ok(Some(order))
}

/// Loads the items of `orders` in one query and attaches them.
async fn attach_items(pool: &SqlitePool, orders: &mut [Order]) -> DbResult<()> {
    if orders.is_empty() {
        return Ok(());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM order_items WHERE order_id IN (");
    let mut ids = qb.separated(", ");
    for order in orders.iter() {
        ids.push_bind(order.id.clone());
    }
    ids.push_unseparated(") ORDER BY rowid");

    let items = qb.build_query_as::<OrderItem>().fetch_all(pool).await?;

    let mut grouped: HashMap<String, Vec<OrderItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id.clone()).or_default().push(item);
    }
    for order in orders.iter_mut() {
        order.items = grouped.remove(&order.id).unwrap_or_default();
    }
    Ok(())
}

/// Every order created in `[from, to)`, with items, oldest first.
///
/// Used by reports, which need all orders in the period regardless of
/// status; recognition rules are applied by the caller.
pub(crate) async fn created_between(
    pool: &SqlitePool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> DbResult<Vec<Order>> {
    let mut orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE created_at >= ?1 AND created_at < ?2
        ORDER BY created_at, rowid
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    let items = sqlx::query_as::<_, OrderItem>(
        r#"
        SELECT oi.* FROM order_items oi
        JOIN orders o ON o.id = oi.order_id
        WHERE o.created_at >= ?1 AND o.created_at < ?2
        ORDER BY oi.rowid
        "#,
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<String, Vec<OrderItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.order_id.clone()).or_default().push(item);
    }
    for order in &mut orders {
        order.items = grouped.remove(&order.id).unwrap_or_default();
    }

    Ok(orders)
}

// =============================================================================
// Unit Tests
// =============================================================================
