//! # Purchase Order Repository
//!
//! Creation and approval of purchase orders. Receiving goods against a PO
//! lives in [`super::grn`], which reuses the loaders here.
//!
//! ## Lifecycle
//! ```text
//!   pending ──approve──► approved ──GRN──► partially_received ──GRN──► completed
//!      │                    │                       │
//!      └──────cancel────────┘                       └──GRN (rest)──────┘
//!              ▼
//!          cancelled
//! ```
//!
//! Status changes are guarded updates (`WHERE status = <expected>`), so two
//! clerks approving and cancelling the same PO at once cannot both win.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::location::ensure_active as ensure_location_active;
use super::product::{ensure_variant, find_by_id as find_product};
use super::supplier::ensure_active as ensure_supplier_active;
use super::{clean, generate_id};
use crate::error::{DbError, DbResult};
use shelfwise_core::purchasing::{check_transition, document_number, validate_purchase_order};
use shelfwise_core::{CoreError, NewPurchaseOrder, PoStatus, PurchaseOrder, PurchaseOrderItem};

#[derive(Debug, Clone)]
pub struct PurchaseOrderRepository {
    pool: SqlitePool,
}

impl PurchaseOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseOrderRepository { pool }
    }

    /// Creates a pending purchase order with its items.
    ///
    /// ## Returns
    /// * `Err(Domain(SupplierInactive | LocationInactive | ProductInactive))`
    /// * `Err(NotFound)` - supplier, location, product or variant missing
    pub async fn create(&self, input: &NewPurchaseOrder) -> DbResult<PurchaseOrder> {
        let total = validate_purchase_order(input)?;

        let now = Utc::now();
        let uuid = Uuid::new_v4();
        let id = uuid.to_string();
        let mut po = PurchaseOrder {
            id: id.clone(),
            po_number: document_number("PO", now, &uuid),
            supplier_id: input.supplier_id.clone(),
            location_id: input.location_id.clone(),
            status: PoStatus::Pending,
            notes: clean(input.notes.as_deref()),
            total_cost_cents: total.cents(),
            expected_at: input.expected_at,
            created_at: now,
            updated_at: now,
            items: Vec::with_capacity(input.items.len()),
        };

        let mut tx = self.pool.begin().await?;
        ensure_supplier_active(&mut tx, &po.supplier_id).await?;
        ensure_location_active(&mut tx, &po.location_id).await?;

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, po_number, supplier_id, location_id, status, notes,
                total_cost_cents, expected_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&po.id)
        .bind(&po.po_number)
        .bind(&po.supplier_id)
        .bind(&po.location_id)
        .bind(po.status)
        .bind(&po.notes)
        .bind(po.total_cost_cents)
        .bind(po.expected_at)
        .bind(po.created_at)
        .bind(po.updated_at)
        .execute(&mut *tx)
        .await?;

        for line in &input.items {
            let product = find_product(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| DbError::not_found("Product", &line.product_id))?;
            if !product.is_active {
                return Err(CoreError::ProductInactive(product.sku).into());
            }
            ensure_variant(&mut tx, &line.product_id, &line.variant_id).await?;

            let item = PurchaseOrderItem {
                id: generate_id(),
                purchase_order_id: id.clone(),
                product_id: line.product_id.clone(),
                variant_id: line.variant_id.clone(),
                size: line.size.trim().to_string(),
                quantity_ordered: line.quantity,
                quantity_received: 0,
                unit_cost_cents: line.unit_cost_cents,
            };

            sqlx::query(
                r#"
                INSERT INTO purchase_order_items (
                    id, purchase_order_id, product_id, variant_id, size,
                    quantity_ordered, quantity_received, unit_cost_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.purchase_order_id)
            .bind(&item.product_id)
            .bind(&item.variant_id)
            .bind(&item.size)
            .bind(item.quantity_ordered)
            .bind(item.quantity_received)
            .bind(item.unit_cost_cents)
            .execute(&mut *tx)
            .await?;

            po.items.push(item);
        }

        tx.commit().await?;

        info!(
            id = %po.id,
            po_number = %po.po_number,
            items = po.items.len(),
            total_cents = po.total_cost_cents,
            "Purchase order created"
        );
        Ok(po)
    }

    /// Gets a purchase order with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<PurchaseOrder>> {
        let mut conn = self.pool.acquire().await?;
        load(&mut conn, id).await
    }

    /// Lists purchase orders, newest first, with items.
    pub async fn list(
        &self,
        status: Option<PoStatus>,
        supplier_id: Option<&str>,
    ) -> DbResult<Vec<PurchaseOrder>> {
        let mut orders = sqlx::query_as::<_, PurchaseOrder>(
            r#"
            SELECT * FROM purchase_orders
            WHERE (?1 IS NULL OR status = ?1)
              AND (?2 IS NULL OR supplier_id = ?2)
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(status)
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await?;

        if orders.is_empty() {
            return Ok(orders);
        }

        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT * FROM purchase_order_items WHERE purchase_order_id IN (");
        let mut ids = qb.separated(", ");
        for po in &orders {
            ids.push_bind(po.id.clone());
        }
        ids.push_unseparated(") ORDER BY rowid");

        let items = qb
            .build_query_as::<PurchaseOrderItem>()
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<String, Vec<PurchaseOrderItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.purchase_order_id.clone()).or_default().push(item);
        }
        for po in &mut orders {
            po.items = grouped.remove(&po.id).unwrap_or_default();
        }

        Ok(orders)
    }

    /// `pending → approved`.
    pub async fn approve(&self, id: &str) -> DbResult<PurchaseOrder> {
        self.transition(id, PoStatus::Approved).await
    }

    /// `pending | approved → cancelled`.
    pub async fn cancel(&self, id: &str) -> DbResult<PurchaseOrder> {
        self.transition(id, PoStatus::Cancelled).await
    }

    async fn transition(&self, id: &str, to: PoStatus) -> DbResult<PurchaseOrder> {
        let mut tx = self.pool.begin().await?;

        let mut po = load(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", id))?;

        if let Err(e) = check_transition(po.status, to) {
            warn!(id = %id, from = %po.status, to = %to, "Purchase order transition rejected");
            return Err(e.into());
        }

        po.updated_at = set_status(&mut tx, id, po.status, to).await?;
        po.status = to;

        tx.commit().await?;

        info!(id = %id, po_number = %po.po_number, status = %to, "Purchase order status changed");
        Ok(po)
    }
}

/// Loads a purchase order and its items on the given connection.
pub(crate) async fn load(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<PurchaseOrder>> {
    let po = sqlx::query_as::<_, PurchaseOrder>("SELECT * FROM purchase_orders WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(mut po) = po else {
        return Ok(None);
    };

    po.items = sqlx::query_as::<_, PurchaseOrderItem>(
        "SELECT * FROM purchase_order_items WHERE purchase_order_id = ?1 ORDER BY rowid",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(po))
}

/// Moves a PO from `from` to `to`, failing if someone else moved it first.
///
/// Returns the new `updated_at`.
pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    from: PoStatus,
    to: PoStatus,
) -> DbResult<chrono::DateTime<Utc>> {
    let now = Utc::now();
    debug!(id = %id, from = %from, to = %to, "Setting purchase order status");

    let result = sqlx::query(
        "UPDATE purchase_orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND status = ?2",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::transition("Purchase order", from, to).into());
    }
    Ok(now)
}
