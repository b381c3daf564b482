//! # Coupon Repository
//!
//! Promotion codes. Eligibility and discount math live in
//! `shelfwise_core::coupons`; this module stores coupons and counts
//! redemptions.
//!
//! Codes are stored uppercase and looked up case-insensitively by
//! normalising the input the same way.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::generate_id;
use crate::error::{DbError, DbResult};
use shelfwise_core::coupons::validate_coupon;
use shelfwise_core::money::Money;
use shelfwise_core::{Coupon, CoreError, NewCoupon};

#[derive(Debug, Clone)]
pub struct CouponRepository {
    pool: SqlitePool,
}

impl CouponRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CouponRepository { pool }
    }

    /// Creates a coupon.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - code already used
    pub async fn create(&self, input: &NewCoupon) -> DbResult<Coupon> {
        let code = validate_coupon(input)?;

        let coupon = Coupon {
            id: generate_id(),
            code,
            discount_type: input.discount_type,
            value: input.value,
            min_order_cents: input.min_order_cents,
            max_discount_cents: input.max_discount_cents,
            usage_limit: input.usage_limit,
            used_count: 0,
            starts_at: input.starts_at,
            expires_at: input.expires_at,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO coupons (
                id, code, discount_type, value, min_order_cents, max_discount_cents,
                usage_limit, used_count, starts_at, expires_at, is_active, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&coupon.id)
        .bind(&coupon.code)
        .bind(coupon.discount_type)
        .bind(coupon.value)
        .bind(coupon.min_order_cents)
        .bind(coupon.max_discount_cents)
        .bind(coupon.usage_limit)
        .bind(coupon.used_count)
        .bind(coupon.starts_at)
        .bind(coupon.expires_at)
        .bind(coupon.is_active)
        .bind(coupon.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate("coupon code", &coupon.code))?;

        info!(code = %coupon.code, kind = %coupon.discount_type, value = coupon.value, "Coupon created");
        Ok(coupon)
    }

    /// Looks a coupon up by code, ignoring case and surrounding spaces.
    pub async fn get(&self, code: &str) -> DbResult<Option<Coupon>> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, code).await
    }

    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Coupon>> {
        let coupons = sqlx::query_as::<_, Coupon>(
            "SELECT * FROM coupons WHERE ?1 OR is_active = 1 ORDER BY code",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(coupons)
    }

    pub async fn deactivate(&self, code: &str) -> DbResult<()> {
        let code = normalise(code);
        let result = sqlx::query("UPDATE coupons SET is_active = 0 WHERE code = ?1")
            .bind(&code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Coupon", code));
        }

        info!(code = %code, "Coupon deactivated");
        Ok(())
    }

    /// Previews the discount a coupon would give, without redeeming it.
    ///
    /// ## Returns
    /// * `Ok(Money)` - the discount on `subtotal`
    /// * `Err(Domain(CouponRejected))` - inactive, out of window, used up
    ///   or minimum not met
    /// * `Err(NotFound)` - no such code
    pub async fn validate(&self, code: &str, subtotal: Money, now: DateTime<Utc>) -> DbResult<Money> {
        let coupon = self
            .get(code)
            .await?
            .ok_or_else(|| DbError::not_found("Coupon", normalise(code)))?;

        let discount = coupon.discount_for(subtotal, now)?;
        debug!(code = %coupon.code, subtotal = %subtotal, discount = %discount, "Coupon validated");
        Ok(discount)
    }
}

fn normalise(code: &str) -> String {
    code.trim().to_uppercase()
}

pub(crate) async fn find(conn: &mut SqliteConnection, code: &str) -> DbResult<Option<Coupon>> {
    let coupon = sqlx::query_as::<_, Coupon>("SELECT * FROM coupons WHERE code = ?1")
        .bind(normalise(code))
        .fetch_optional(&mut *conn)
        .await?;

    Ok(coupon)
}

/// Counts one use of a coupon.
///
/// The usage limit is checked in the UPDATE itself, so two orders racing
/// for the last use cannot both get it.
pub(crate) async fn redeem(conn: &mut SqliteConnection, coupon: &Coupon) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE coupons SET used_count = used_count + 1
        WHERE id = ?1 AND is_active = 1
          AND (usage_limit IS NULL OR used_count < usage_limit)
        "#,
    )
    .bind(&coupon.id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(code = %coupon.code, "Coupon redemption lost a race");
        return Err(CoreError::coupon(&coupon.code, "usage limit reached").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_db;
    use chrono::Duration;
    use shelfwise_core::DiscountType;

    fn ten_percent() -> NewCoupon {
        NewCoupon {
            code: " avurudu10 ".to_string(),
            discount_type: DiscountType::Percentage,
            value: 1_000,
            min_order_cents: 5_000,
            max_discount_cents: Some(2_000),
            usage_limit: Some(1),
            starts_at: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_create_normalises_code() {
        let db = test_db().await;
        let repo = db.coupons();

        let coupon = repo.create(&ten_percent()).await.unwrap();
        assert_eq!(coupon.code, "AVURUDU10");

        let found = repo.get("Avurudu10").await.unwrap().unwrap();
        assert_eq!(found.id, coupon.id);

        let err = repo.create(&ten_percent()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_validate_preview() {
        let db = test_db().await;
        let repo = db.coupons();
        repo.create(&ten_percent()).await.unwrap();
        let now = Utc::now();

        // 10% of 80.00
        let discount = repo.validate("avurudu10", Money::from_cents(8_000), now).await.unwrap();
        assert_eq!(discount.cents(), 800);

        // capped at 20.00
        let discount = repo.validate("AVURUDU10", Money::from_cents(50_000), now).await.unwrap();
        assert_eq!(discount.cents(), 2_000);

        let err = repo.validate("AVURUDU10", Money::from_cents(4_000), now).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CouponRejected { .. })));

        let err = repo.validate("NOPE", Money::from_cents(8_000), now).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        // preview never redeems
        assert_eq!(repo.get("AVURUDU10").await.unwrap().unwrap().used_count, 0);
    }

    #[tokio::test]
    async fn test_redeem_respects_limit() {
        let db = test_db().await;
        let coupon = db.coupons().create(&ten_percent()).await.unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        redeem(&mut conn, &coupon).await.unwrap();
        let err = redeem(&mut conn, &coupon).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CouponRejected { .. })));
        drop(conn);

        let stored = db.coupons().get(&coupon.code).await.unwrap().unwrap();
        assert_eq!(stored.used_count, 1);
        assert!(!stored.has_uses_left());
    }

    #[tokio::test]
    async fn test_deactivate_and_window() {
        let db = test_db().await;
        let repo = db.coupons();
        let now = Utc::now();

        let mut later = ten_percent();
        later.code = "LATER".to_string();
        later.usage_limit = None;
        later.starts_at = Some(now + Duration::days(1));
        repo.create(&later).await.unwrap();

        let err = repo.validate("later", Money::from_cents(9_000), now).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CouponRejected { .. })));
        assert!(repo
            .validate("later", Money::from_cents(9_000), now + Duration::days(2))
            .await
            .is_ok());

        repo.deactivate("later").await.unwrap();
        assert!(repo.list(false).await.unwrap().is_empty());
        assert_eq!(repo.list(true).await.unwrap().len(), 1);
        assert!(matches!(
            repo.deactivate("missing").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
