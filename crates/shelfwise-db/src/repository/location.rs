//! # Location Repository
//!
//! Stores, warehouses and any other place that holds stock.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{clean, generate_id};
use crate::error::{DbError, DbResult};
use shelfwise_core::validation::validate_text;
use shelfwise_core::{CoreError, NewLocation, StockLocation};

#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LocationRepository { pool }
    }

    /// Creates a location. Names are unique.
    pub async fn create(&self, input: &NewLocation) -> DbResult<StockLocation> {
        validate_text("name", &input.name, 100)?;

        let location = StockLocation {
            id: generate_id(),
            name: input.name.trim().to_string(),
            address: clean(input.address.as_deref()),
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO stock_locations (id, name, address, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&location.id)
        .bind(&location.name)
        .bind(&location.address)
        .bind(location.is_active)
        .bind(location.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate("location name", &location.name))?;

        info!(id = %location.id, name = %location.name, "Location created");
        Ok(location)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockLocation>> {
        let location =
            sqlx::query_as::<_, StockLocation>("SELECT * FROM stock_locations WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(location)
    }

    /// Lists locations by name.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<StockLocation>> {
        let locations = sqlx::query_as::<_, StockLocation>(
            r#"
            SELECT * FROM stock_locations
            WHERE ?1 OR is_active = 1
            ORDER BY name
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(locations)
    }

    /// Deactivates a location. Its stock rows stay for history, but no
    /// further stock can move in or out.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating location");

        let result = sqlx::query("UPDATE stock_locations SET is_active = 0 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Location", id));
        }

        info!(id = %id, "Location deactivated");
        Ok(())
    }
}

/// Fails unless the location exists and is active.
pub(crate) async fn ensure_active(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let active: Option<bool> =
        sqlx::query_scalar("SELECT is_active FROM stock_locations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    match active {
        Some(true) => Ok(()),
        Some(false) => Err(CoreError::LocationInactive(id.to_string()).into()),
        None => Err(DbError::not_found("Location", id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_db;

    fn loc(name: &str) -> NewLocation {
        NewLocation {
            name: name.to_string(),
            address: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_list_deactivate() {
        let db = test_db().await;
        let repo = db.locations();

        let store = repo.create(&loc("Colombo Store")).await.unwrap();
        repo.create(&loc("Warehouse")).await.unwrap();
        assert!(store.address.is_none());

        let err = repo.create(&loc("Warehouse")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        repo.deactivate(&store.id).await.unwrap();
        assert_eq!(repo.list(false).await.unwrap().len(), 1);
        assert_eq!(repo.list(true).await.unwrap().len(), 2);
        assert!(!repo.get_by_id(&store.id).await.unwrap().unwrap().is_active);

        let mut conn = db.pool().acquire().await.unwrap();
        let err = ensure_active(&mut conn, &store.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::LocationInactive(_))));
        let err = ensure_active(&mut conn, "missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
