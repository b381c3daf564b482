//! # GRN Repository
//!
//! Goods received notes: the only way purchased stock enters the ledger.
//!
//! ## Receiving Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    receive(NewGrn) - ONE transaction                   │
//! │                                                                         │
//! │  1. Load PO + items                                                    │
//! │  2. reconcile_receipt (core)  ── status, unknown items, over-receipt   │
//! │  3. INSERT grns                                                        │
//! │  4. per line:                                                          │
//! │     ├── UPDATE purchase_order_items                                    │
//! │     │     SET quantity_received = quantity_received + ?n               │
//! │     │     WHERE quantity_received + ?n <= quantity_ordered  ← GUARD    │
//! │     ├── INSERT grn_items                                               │
//! │     ├── product cost ← weighted average (on hand vs received)          │
//! │     └── inventory::post(+n, goods_received, ref = GRN number)          │
//! │  5. PO status → partially_received | completed                         │
//! │                                                                         │
//! │  Any failure rolls back every step.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::inventory::{on_hand, post, Posting};
use super::location::ensure_active;
use super::product::{find_by_id as find_product, set_cost_price};
use super::purchase_order::{load as load_purchase_order, set_status};
use super::{clean, generate_id};
use crate::error::{DbError, DbResult};
use shelfwise_core::money::Money;
use shelfwise_core::purchasing::{
    check_transition, document_number, reconcile_receipt, status_after_receipt,
    weighted_average_cost, ReceiptLine,
};
use shelfwise_core::{CoreError, Grn, GrnItem, MovementKind, NewGrn};

#[derive(Debug, Clone)]
pub struct GrnRepository {
    pool: SqlitePool,
}

impl GrnRepository {
    pub fn new(pool: SqlitePool) -> Self {
        GrnRepository { pool }
    }

    /// Receives goods against an approved purchase order.
    ///
    /// ## Returns
    /// * `Ok(Grn)` - the note with its items
    /// * `Err(Domain(OverReceipt))` - a line exceeds what is outstanding
    /// * `Err(Domain(InvalidStatusTransition))` - PO not approved, or already
    ///   completed/cancelled
    /// * `Err(Domain(UnknownPurchaseOrderItem))` - a line from another PO
    pub async fn receive(&self, input: &NewGrn) -> DbResult<Grn> {
        let mut tx = self.pool.begin().await?;

        let po = load_purchase_order(&mut tx, &input.purchase_order_id)
            .await?
            .ok_or_else(|| DbError::not_found("Purchase order", &input.purchase_order_id))?;

        let receipts = match reconcile_receipt(&po, &input.lines) {
            Ok(receipts) => receipts,
            Err(e) => {
                warn!(po_number = %po.po_number, error = %e, "Goods receipt rejected");
                return Err(e.into());
            }
        };
        ensure_active(&mut tx, &po.location_id).await?;

        let now = Utc::now();
        let uuid = Uuid::new_v4();
        let total: Money = receipts.iter().map(ReceiptLine::cost).sum();
        let mut grn = Grn {
            id: uuid.to_string(),
            grn_number: document_number("GRN", now, &uuid),
            purchase_order_id: po.id.clone(),
            location_id: po.location_id.clone(),
            notes: clean(input.notes.as_deref()),
            total_cost_cents: total.cents(),
            received_at: now,
            items: Vec::with_capacity(receipts.len()),
        };

        sqlx::query(
            r#"
            INSERT INTO grns (
                id, grn_number, purchase_order_id, location_id, notes,
                total_cost_cents, received_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&grn.id)
        .bind(&grn.grn_number)
        .bind(&grn.purchase_order_id)
        .bind(&grn.location_id)
        .bind(&grn.notes)
        .bind(grn.total_cost_cents)
        .bind(grn.received_at)
        .execute(&mut *tx)
        .await?;

        for receipt in &receipts {
            let item = receive_line(&mut tx, &grn, receipt).await?;
            grn.items.push(item);
        }

        let next = status_after_receipt(&po.items, &receipts);
        check_transition(po.status, next)?;
        set_status(&mut tx, &po.id, po.status, next).await?;

        tx.commit().await?;

        info!(
            grn_number = %grn.grn_number,
            po_number = %po.po_number,
            lines = grn.items.len(),
            total_cents = grn.total_cost_cents,
            po_status = %next,
            "Goods received"
        );
        Ok(grn)
    }

    /// Gets a GRN with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Grn>> {
        let grn = sqlx::query_as::<_, Grn>("SELECT * FROM grns WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(mut grn) = grn else {
            return Ok(None);
        };

        grn.items = sqlx::query_as::<_, GrnItem>("SELECT * FROM grn_items WHERE grn_id = ?1 ORDER BY rowid")
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(Some(grn))
    }

    /// Lists GRNs, newest first, optionally for one purchase order.
    pub async fn list(&self, purchase_order_id: Option<&str>) -> DbResult<Vec<Grn>> {
        let mut grns = sqlx::query_as::<_, Grn>(
            r#"
            SELECT * FROM grns
            WHERE (?1 IS NULL OR purchase_order_id = ?1)
            ORDER BY received_at DESC, rowid DESC
            "#,
        )
        .bind(purchase_order_id)
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, GrnItem>(
            r#"
            SELECT gi.* FROM grn_items gi
            JOIN grns g ON g.id = gi.grn_id
            WHERE (?1 IS NULL OR g.purchase_order_id = ?1)
            ORDER BY gi.rowid
            "#,
        )
        .bind(purchase_order_id)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<String, Vec<GrnItem>> = HashMap::new();
        for item in items {
            grouped.entry(item.grn_id.clone()).or_default().push(item);
        }
        for grn in &mut grns {
            grn.items = grouped.remove(&grn.id).unwrap_or_default();
        }

        Ok(grns)
    }
}

/// Applies one reconciled line: PO progress, GRN row, cost, stock.
async fn receive_line(conn: &mut SqliteConnection, grn: &Grn, receipt: &ReceiptLine) -> DbResult<GrnItem> {
    let po_item = &receipt.po_item;

    let result = sqlx::query(
        r#"
        UPDATE purchase_order_items
        SET quantity_received = quantity_received + ?2
        WHERE id = ?1 AND quantity_received + ?2 <= quantity_ordered
        "#,
    )
    .bind(&po_item.id)
    .bind(receipt.quantity)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::OverReceipt {
            po_item_id: po_item.id.clone(),
            outstanding: po_item.outstanding(),
            requested: receipt.quantity,
        }
        .into());
    }

    let item = GrnItem {
        id: generate_id(),
        grn_id: grn.id.clone(),
        po_item_id: po_item.id.clone(),
        product_id: po_item.product_id.clone(),
        variant_id: po_item.variant_id.clone(),
        size: po_item.size.clone(),
        quantity_received: receipt.quantity,
        unit_cost_cents: po_item.unit_cost_cents,
    };

    sqlx::query(
        r#"
        INSERT INTO grn_items (
            id, grn_id, po_item_id, product_id, variant_id, size,
            quantity_received, unit_cost_cents
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.grn_id)
    .bind(&item.po_item_id)
    .bind(&item.product_id)
    .bind(&item.variant_id)
    .bind(&item.size)
    .bind(item.quantity_received)
    .bind(item.unit_cost_cents)
    .execute(&mut *conn)
    .await?;

    // Cost first: the average weighs stock on hand before this receipt.
    let product = find_product(conn, &po_item.product_id)
        .await?
        .ok_or_else(|| DbError::not_found("Product", &po_item.product_id))?;
    let units = on_hand(conn, &product.id).await?;
    let cost = weighted_average_cost(units, product.cost_price(), receipt.quantity, po_item.unit_cost());
    if cost != product.cost_price() {
        debug!(
            sku = %product.sku,
            old_cents = product.cost_price_cents,
            new_cents = cost.cents(),
            "Updating moving-average cost"
        );
        set_cost_price(conn, &product.id, cost.cents()).await?;
    }

    let key = receipt.stock_key(&grn.location_id);
    post(
        conn,
        &Posting {
            key: &key,
            delta: receipt.quantity,
            kind: MovementKind::GoodsReceived,
            reference: Some(&grn.grn_number),
            note: None,
        },
    )
    .await?;

    Ok(item)
}
