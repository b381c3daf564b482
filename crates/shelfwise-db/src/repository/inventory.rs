//! # Inventory Repository
//!
//! Per-location stock levels and the movement ledger.
//!
//! ## Ledger Posting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    post(conn, posting)                                  │
//! │                                                                         │
//! │  delta > 0                              delta < 0                       │
//! │  ─────────                              ─────────                       │
//! │  INSERT ... ON CONFLICT(key)            UPDATE stock_levels             │
//! │  DO UPDATE SET                          SET quantity = quantity - ?n    │
//! │    quantity = quantity + ?n             WHERE key = ?                   │
//! │                                           AND quantity >= ?n  ← GUARD   │
//! │                                                │                        │
//! │                                   0 rows? ──► InsufficientStock         │
//! │                                                                         │
//! │  then, same connection / transaction:                                  │
//! │    read the level ──► INSERT stock_movements (delta, balance_after)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Deltas?
//! Every change is a relative update that SQLite applies atomically, so two
//! requests removing the last unit cannot both succeed, even without any
//! locking in the application. The `CHECK (quantity >= 0)` constraint in the
//! schema backs the guard up.
//!
//! Goods receipt and order fulfilment reuse [`post`] inside their own
//! transactions, so every stock change in the system goes through the same
//! guarded path and writes exactly one movement.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::generate_id;
use super::location::ensure_active;
use super::product::ensure_variant;
use crate::error::DbResult;
use shelfwise_core::inventory::{line_key, validate_adjustment, validate_transfer};
use shelfwise_core::purchasing::document_number;
use shelfwise_core::validation::validate_quantity;
use shelfwise_core::{AdjustmentLine, MovementKind, StockKey, StockLevel, StockMovement, TransferRequest};

/// Maximum movements returned by one history query.
const MAX_MOVEMENTS: i64 = 1_000;

// =============================================================================
// Ledger Posting
// =============================================================================

/// One signed change to post against a stock key.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Posting<'a> {
    pub key: &'a StockKey,
    pub delta: i64,
    pub kind: MovementKind,
    pub reference: Option<&'a str>,
    pub note: Option<&'a str>,
}

/// Applies a posting and records its movement.
///
/// Runs on whatever connection it is given; callers wanting atomicity with
/// other writes pass `&mut *tx`.
pub(crate) async fn post(conn: &mut SqliteConnection, posting: &Posting<'_>) -> DbResult<StockLevel> {
    let key = posting.key;
    let now = Utc::now();

    ensure_variant(conn, &key.product_id, &key.variant_id).await?;

    if posting.delta > 0 {
        sqlx::query(
            r#"
            INSERT INTO stock_levels (id, location_id, product_id, variant_id, size, quantity, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (location_id, product_id, variant_id, size) DO UPDATE SET
                quantity = quantity + excluded.quantity,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(generate_id())
        .bind(&key.location_id)
        .bind(&key.product_id)
        .bind(&key.variant_id)
        .bind(&key.size)
        .bind(posting.delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    } else {
        let requested = -posting.delta;
        let result = sqlx::query(
            r#"
            UPDATE stock_levels
            SET quantity = quantity - ?5, updated_at = ?6
            WHERE location_id = ?1 AND product_id = ?2 AND variant_id = ?3 AND size = ?4
              AND quantity >= ?5
            "#,
        )
        .bind(&key.location_id)
        .bind(&key.product_id)
        .bind(&key.variant_id)
        .bind(&key.size)
        .bind(requested)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let available = quantity(conn, key).await?;
            warn!(key = %key, available, requested, "Stock decrement rejected");
            return Err(key.insufficient(available, requested).into());
        }
    }

    let level = sqlx::query_as::<_, StockLevel>(
        r#"
        SELECT * FROM stock_levels
        WHERE location_id = ?1 AND product_id = ?2 AND variant_id = ?3 AND size = ?4
        "#,
    )
    .bind(&key.location_id)
    .bind(&key.product_id)
    .bind(&key.variant_id)
    .bind(&key.size)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, location_id, product_id, variant_id, size,
            kind, quantity_delta, balance_after, reference, note, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(generate_id())
    .bind(&key.location_id)
    .bind(&key.product_id)
    .bind(&key.variant_id)
    .bind(&key.size)
    .bind(posting.kind)
    .bind(posting.delta)
    .bind(level.quantity)
    .bind(posting.reference)
    .bind(posting.note)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    debug!(key = %key, delta = posting.delta, balance = level.quantity, kind = %posting.kind, "Stock posted");
    Ok(level)
}

/// Current quantity of a key; a missing row reads as 0.
pub(crate) async fn quantity(conn: &mut SqliteConnection, key: &StockKey) -> DbResult<i64> {
    let qty: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT quantity FROM stock_levels
        WHERE location_id = ?1 AND product_id = ?2 AND variant_id = ?3 AND size = ?4
        "#,
    )
    .bind(&key.location_id)
    .bind(&key.product_id)
    .bind(&key.variant_id)
    .bind(&key.size)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(qty.unwrap_or(0))
}

/// Units of a product on hand across all locations.
pub(crate) async fn on_hand(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    let total: i64 =
        sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM stock_levels WHERE product_id = ?1")
            .bind(product_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(total)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock operations.
///
/// ## Usage
/// ```rust,ignore
/// let key = StockKey::new(&store.id, &tee.id).with_size("M");
/// db.inventory().add_stock(&key, 12, Some("opening count")).await?;
/// db.inventory().remove_stock(&key, 2, Some("damaged")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Adds `qty` units to a key (manual stock-in).
    pub async fn add_stock(&self, key: &StockKey, qty: i64, note: Option<&str>) -> DbResult<StockLevel> {
        self.manual(key, qty, MovementKind::StockIn, note).await
    }

    /// Removes `qty` units from a key (manual stock-out).
    ///
    /// ## Returns
    /// * `Err(Domain(InsufficientStock))` - fewer than `qty` units on hand
    pub async fn remove_stock(&self, key: &StockKey, qty: i64, note: Option<&str>) -> DbResult<StockLevel> {
        self.manual(key, qty, MovementKind::StockOut, note).await
    }

    /// Posts a manual movement of `qty` units; the sign comes from `kind`.
    async fn manual(
        &self,
        key: &StockKey,
        qty: i64,
        kind: MovementKind,
        note: Option<&str>,
    ) -> DbResult<StockLevel> {
        key.validate()?;
        validate_quantity(qty)?;
        let delta = if kind.is_inbound() { qty } else { -qty };

        let mut tx = self.pool.begin().await?;
        ensure_active(&mut tx, &key.location_id).await?;

        let level = post(
            &mut tx,
            &Posting {
                key,
                delta,
                kind,
                reference: None,
                note,
            },
        )
        .await?;

        tx.commit().await?;

        info!(key = %key, delta, balance = level.quantity, "Stock adjusted");
        Ok(level)
    }

    /// Moves stock between two active locations in one transaction.
    ///
    /// ## Returns
    /// `(source_level, destination_level)` after the move. Both movements
    /// share a `TRF-...` reference.
    pub async fn transfer_stock(&self, req: &TransferRequest) -> DbResult<(StockLevel, StockLevel)> {
        let (from, to) = validate_transfer(req)?;
        let now = Utc::now();
        let reference = document_number("TRF", now, &Uuid::new_v4());
        let note = req.note.as_deref();

        let mut tx = self.pool.begin().await?;
        ensure_active(&mut tx, &from.location_id).await?;
        ensure_active(&mut tx, &to.location_id).await?;

        let source = post(
            &mut tx,
            &Posting {
                key: &from,
                delta: -req.quantity,
                kind: MovementKind::TransferOut,
                reference: Some(&reference),
                note,
            },
        )
        .await?;

        let destination = post(
            &mut tx,
            &Posting {
                key: &to,
                delta: req.quantity,
                kind: MovementKind::TransferIn,
                reference: Some(&reference),
                note,
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            reference = %reference,
            from = %from,
            to = %to,
            quantity = req.quantity,
            "Stock transferred"
        );
        Ok((source, destination))
    }

    /// Applies a multi-line adjustment at one location, all or nothing.
    ///
    /// Positive deltas post as `stock_in`, negative as `stock_out`; all
    /// lines share an `ADJ-...` reference.
    pub async fn adjust_stock(
        &self,
        location_id: &str,
        lines: &[AdjustmentLine],
        note: Option<&str>,
    ) -> DbResult<Vec<StockLevel>> {
        validate_adjustment(location_id, lines)?;
        let reference = document_number("ADJ", Utc::now(), &Uuid::new_v4());

        let mut tx = self.pool.begin().await?;
        ensure_active(&mut tx, location_id).await?;

        let mut levels = Vec::with_capacity(lines.len());
        for line in lines {
            let key = line_key(location_id, line);
            let kind = if line.delta > 0 {
                MovementKind::StockIn
            } else {
                MovementKind::StockOut
            };
            let level = post(
                &mut tx,
                &Posting {
                    key: &key,
                    delta: line.delta,
                    kind,
                    reference: Some(&reference),
                    note,
                },
            )
            .await?;
            levels.push(level);
        }

        tx.commit().await?;

        info!(reference = %reference, location_id = %location_id, lines = lines.len(), "Stock adjustment applied");
        Ok(levels)
    }

    /// Quantity of one key; 0 when the key has never been stocked.
    pub async fn get_stock(&self, key: &StockKey) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        quantity(&mut conn, key).await
    }

    /// Stock levels, optionally filtered by location and/or product.
    pub async fn list_stock(
        &self,
        location_id: Option<&str>,
        product_id: Option<&str>,
    ) -> DbResult<Vec<StockLevel>> {
        let levels = sqlx::query_as::<_, StockLevel>(
            r#"
            SELECT * FROM stock_levels
            WHERE (?1 IS NULL OR location_id = ?1)
              AND (?2 IS NULL OR product_id = ?2)
            ORDER BY location_id, product_id, variant_id, size
            "#,
        )
        .bind(location_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(levels)
    }

    /// Units of a product across every location.
    pub async fn total_on_hand(&self, product_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        on_hand(&mut conn, product_id).await
    }

    /// Movement history, newest first.
    pub async fn list_movements(
        &self,
        location_id: Option<&str>,
        product_id: Option<&str>,
        limit: i64,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT * FROM stock_movements
            WHERE (?1 IS NULL OR location_id = ?1)
              AND (?2 IS NULL OR product_id = ?2)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3
            "#,
        )
        .bind(location_id)
        .bind(product_id)
        .bind(limit.clamp(1, MAX_MOVEMENTS))
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Movements written under one document number, oldest first.
    pub async fn movements_for_reference(&self, reference: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            "SELECT * FROM stock_movements WHERE reference = ?1 ORDER BY rowid",
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_db;
    use crate::Database;
    use shelfwise_core::{CoreError, NewLocation, NewProduct, NewVariant, ValidationError};

    struct Fixture {
        db: Database,
        store: String,
        warehouse: String,
        tee: String,
    }

    async fn fixture() -> Fixture {
        let db = test_db().await;
        let store = db
            .locations()
            .create(&NewLocation {
                name: "Store".to_string(),
                address: None,
            })
            .await
            .unwrap();
        let warehouse = db
            .locations()
            .create(&NewLocation {
                name: "Warehouse".to_string(),
                address: None,
            })
            .await
            .unwrap();
        let tee = db
            .products()
            .create(&NewProduct {
                sku: "TEE-001".to_string(),
                name: "Basic Tee".to_string(),
                description: None,
                category: None,
                brand: None,
                selling_price_cents: 2_500,
                cost_price_cents: 1_000,
            })
            .await
            .unwrap();

        Fixture {
            db,
            store: store.id,
            warehouse: warehouse.id,
            tee: tee.id,
        }
    }

    #[tokio::test]
    async fn test_add_and_remove_stock() {
        let f = fixture().await;
        let repo = f.db.inventory();
        let key = StockKey::new(&f.store, &f.tee).with_size("M");

        assert_eq!(repo.get_stock(&key).await.unwrap(), 0);

        let level = repo.add_stock(&key, 10, Some("opening")).await.unwrap();
        assert_eq!(level.quantity, 10);
        let level = repo.add_stock(&key, 5, None).await.unwrap();
        assert_eq!(level.quantity, 15);

        let level = repo.remove_stock(&key, 15, Some("sold out")).await.unwrap();
        assert_eq!(level.quantity, 0);

        let err = repo.remove_stock(&key, 1, None).await.unwrap_err();
        match err {
            DbError::Domain(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 0);
                assert_eq!(requested, 1);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        let history = repo.list_movements(Some(&f.store), None, 50).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].kind, MovementKind::StockOut);
        assert_eq!(history[0].quantity_delta, -15);
        assert_eq!(history[0].balance_after, 0);
        assert_eq!(history[2].balance_after, 10);
    }

    #[tokio::test]
    async fn test_quantity_must_be_positive() {
        let f = fixture().await;
        let key = StockKey::new(&f.store, &f.tee);
        assert!(f.db.inventory().add_stock(&key, 0, None).await.is_err());
        assert!(f.db.inventory().remove_stock(&key, -3, None).await.is_err());
    }

    #[tokio::test]
    async fn test_negative_quantity_cannot_flip_direction() {
        let f = fixture().await;
        let repo = f.db.inventory();
        let key = StockKey::new(&f.store, &f.tee);
        repo.add_stock(&key, 3, None).await.unwrap();

        let err = repo.remove_stock(&key, -5, None).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));
        let err = repo.add_stock(&key, -2, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert!(repo.remove_stock(&key, i64::MIN, None).await.is_err());
        assert!(repo.add_stock(&key, i64::MIN, None).await.is_err());

        assert_eq!(repo.get_stock(&key).await.unwrap(), 3);
        let history = repo.list_movements(None, Some(&f.tee), 50).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, MovementKind::StockIn);
        assert_eq!(history[0].quantity_delta, 3);
    }

    #[tokio::test]
    async fn test_sizes_are_separate_keys() {
        let f = fixture().await;
        let repo = f.db.inventory();
        let m = StockKey::new(&f.store, &f.tee).with_size("M");
        let l = StockKey::new(&f.store, &f.tee).with_size("L");

        repo.add_stock(&m, 4, None).await.unwrap();
        repo.add_stock(&l, 6, None).await.unwrap();

        assert_eq!(repo.get_stock(&m).await.unwrap(), 4);
        assert_eq!(repo.total_on_hand(&f.tee).await.unwrap(), 10);
        assert_eq!(repo.list_stock(None, Some(&f.tee)).await.unwrap().len(), 2);

        let err = repo.remove_stock(&l, 7, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));
        assert_eq!(repo.get_stock(&l).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_unknown_variant_rejected() {
        let f = fixture().await;
        let repo = f.db.inventory();

        let bogus = StockKey::new(&f.store, &f.tee).with_variant("nope");
        let err = repo.add_stock(&bogus, 1, None).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let red = f
            .db
            .products()
            .add_variant(&f.tee, &NewVariant { name: "Red".to_string() })
            .await
            .unwrap();
        let key = StockKey::new(&f.store, &f.tee).with_variant(red.id);
        assert_eq!(repo.add_stock(&key, 3, None).await.unwrap().quantity, 3);
    }

    #[tokio::test]
    async fn test_inactive_location_rejected() {
        let f = fixture().await;
        f.db.locations().deactivate(&f.store).await.unwrap();

        let key = StockKey::new(&f.store, &f.tee);
        let err = f.db.inventory().add_stock(&key, 1, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::LocationInactive(_))));
    }

    #[tokio::test]
    async fn test_transfer_moves_stock_atomically() {
        let f = fixture().await;
        let repo = f.db.inventory();
        let source = StockKey::new(&f.warehouse, &f.tee).with_size("M");
        repo.add_stock(&source, 10, None).await.unwrap();

        let req = TransferRequest {
            from_location_id: f.warehouse.clone(),
            to_location_id: f.store.clone(),
            product_id: f.tee.clone(),
            variant_id: String::new(),
            size: "M".to_string(),
            quantity: 4,
            note: Some("restock floor".to_string()),
        };
        let (from, to) = repo.transfer_stock(&req).await.unwrap();
        assert_eq!(from.quantity, 6);
        assert_eq!(to.quantity, 4);
        assert_eq!(repo.total_on_hand(&f.tee).await.unwrap(), 10);

        let latest = repo.list_movements(Some(&f.store), None, 1).await.unwrap();
        let reference = latest[0].reference.clone().unwrap();
        assert!(reference.starts_with("TRF-"));
        let pair = repo.movements_for_reference(&reference).await.unwrap();
        assert_eq!(pair.len(), 2);
        assert_eq!(pair[0].kind, MovementKind::TransferOut);
        assert_eq!(pair[1].kind, MovementKind::TransferIn);

        // Too much: nothing moves
        let mut too_much = req.clone();
        too_much.quantity = 7;
        let err = repo.transfer_stock(&too_much).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));
        assert_eq!(repo.get_stock(&source).await.unwrap(), 6);
        assert_eq!(repo.get_stock(&source.at(&f.store)).await.unwrap(), 4);

        let mut same = req;
        same.to_location_id = f.warehouse.clone();
        let err = repo.transfer_stock(&same).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SameLocationTransfer(_))));
    }

    #[tokio::test]
    async fn test_adjustment_is_all_or_nothing() {
        let f = fixture().await;
        let repo = f.db.inventory();
        let m = StockKey::new(&f.store, &f.tee).with_size("M");
        repo.add_stock(&m, 2, None).await.unwrap();

        let lines = vec![
            AdjustmentLine {
                product_id: f.tee.clone(),
                variant_id: String::new(),
                size: "L".to_string(),
                delta: 5,
            },
            AdjustmentLine {
                product_id: f.tee.clone(),
                variant_id: String::new(),
                size: "M".to_string(),
                delta: -3,
            },
        ];
        let err = repo.adjust_stock(&f.store, &lines, Some("count")).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));
        assert_eq!(repo.get_stock(&m.clone().with_size("L")).await.unwrap(), 0);
        assert_eq!(repo.list_movements(None, None, 50).await.unwrap().len(), 1);

        let mut ok_lines = lines;
        ok_lines[1].delta = -2;
        let levels = repo.adjust_stock(&f.store, &ok_lines, Some("count")).await.unwrap();
        assert_eq!(levels[0].quantity, 5);
        assert_eq!(levels[1].quantity, 0);
    }

    #[tokio::test]
    async fn test_concurrent_removals_cannot_oversell() {
        let f = fixture().await;
        let key = StockKey::new(&f.store, &f.tee);
        f.db.inventory().add_stock(&key, 3, None).await.unwrap();

        let a = f.db.inventory();
        let b = f.db.inventory();
        let (ra, rb) = tokio::join!(a.remove_stock(&key, 2, None), b.remove_stock(&key, 2, None));

        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);
        assert_eq!(f.db.inventory().get_stock(&key).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_latest_movement_matches_level() {
        let f = fixture().await;
        let repo = f.db.inventory();
        let key = StockKey::new(&f.store, &f.tee);

        for delta in [5_i64, -2, 7, -10] {
            if delta > 0 {
                repo.add_stock(&key, delta, None).await.unwrap();
            } else {
                repo.remove_stock(&key, -delta, None).await.unwrap();
            }
        }

        let level = repo.get_stock(&key).await.unwrap();
        let latest = repo.list_movements(None, Some(&f.tee), 1).await.unwrap();
        assert_eq!(level, 0);
        assert_eq!(latest[0].balance_after, level);

        let levels = repo.list_stock(Some(&f.store), None).await.unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].product_id, key.product_id);
        assert_eq!(levels[0].size, key.size);
    }
}
