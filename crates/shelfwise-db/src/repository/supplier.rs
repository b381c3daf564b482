//! # Supplier Repository

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{clean, generate_id};
use crate::error::{DbError, DbResult};
use shelfwise_core::validation::{validate_email, validate_text};
use shelfwise_core::{CoreError, NewSupplier, Supplier, SupplierUpdate};

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Creates a supplier.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain)` - missing name or malformed email
    pub async fn create(&self, input: &NewSupplier) -> DbResult<Supplier> {
        validate_text("name", &input.name, 200)?;
        let email = clean(input.email.as_deref());
        if let Some(email) = &email {
            validate_email(email)?;
        }

        let now = Utc::now();
        let supplier = Supplier {
            id: generate_id(),
            name: input.name.trim().to_string(),
            contact_person: clean(input.contact_person.as_deref()),
            email,
            phone: clean(input.phone.as_deref()),
            address: clean(input.address.as_deref()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, name, contact_person, email, phone, address,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(supplier.is_active)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>("SELECT * FROM suppliers WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(supplier)
    }

    /// Lists suppliers by name.
    pub async fn list(&self, include_inactive: bool) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT * FROM suppliers WHERE ?1 OR is_active = 1 ORDER BY name",
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    /// Applies a partial update. A blank optional field clears it.
    pub async fn update(&self, id: &str, changes: &SupplierUpdate) -> DbResult<Supplier> {
        let mut supplier = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))?;

        if let Some(name) = &changes.name {
            validate_text("name", name, 200)?;
            supplier.name = name.trim().to_string();
        }
        if changes.contact_person.is_some() {
            supplier.contact_person = clean(changes.contact_person.as_deref());
        }
        if changes.email.is_some() {
            let email = clean(changes.email.as_deref());
            if let Some(email) = &email {
                validate_email(email)?;
            }
            supplier.email = email;
        }
        if changes.phone.is_some() {
            supplier.phone = clean(changes.phone.as_deref());
        }
        if changes.address.is_some() {
            supplier.address = clean(changes.address.as_deref());
        }
        supplier.updated_at = Utc::now();

        debug!(id = %id, "Updating supplier");

        sqlx::query(
            r#"
            UPDATE suppliers SET
                name = ?2, contact_person = ?3, email = ?4, phone = ?5,
                address = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await?;

        info!(id = %id, "Supplier updated");
        Ok(supplier)
    }

    /// Soft-deletes a supplier. Existing purchase orders keep their link.
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE suppliers SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        info!(id = %id, "Supplier deactivated");
        Ok(())
    }
}

/// Fails unless the supplier exists and is active.
pub(crate) async fn ensure_active(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM suppliers WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match active {
        Some(true) => Ok(()),
        Some(false) => Err(CoreError::SupplierInactive(id.to_string()).into()),
        None => Err(DbError::not_found("Supplier", id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_db;

    fn acme() -> NewSupplier {
        NewSupplier {
            name: " Acme Textiles ".to_string(),
            contact_person: Some("Nimal".to_string()),
            email: Some("orders@acme.lk".to_string()),
            phone: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let db = test_db().await;
        let repo = db.suppliers();

        let supplier = repo.create(&acme()).await.unwrap();
        assert_eq!(supplier.name, "Acme Textiles");
        assert!(supplier.is_active);

        let updated = repo
            .update(
                &supplier.id,
                &SupplierUpdate {
                    phone: Some("+94 11 234 5678".to_string()),
                    email: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+94 11 234 5678"));
        assert!(updated.email.is_none());
        assert_eq!(updated.contact_person.as_deref(), Some("Nimal"));

        let stored = repo.get_by_id(&supplier.id).await.unwrap().unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let db = test_db().await;
        let repo = db.suppliers();

        let mut bad = acme();
        bad.email = Some("not-an-email".to_string());
        assert!(matches!(repo.create(&bad).await, Err(DbError::Domain(_))));

        bad = acme();
        bad.name = "  ".to_string();
        assert!(matches!(repo.create(&bad).await, Err(DbError::Domain(_))));

        let err = repo
            .update("missing", &SupplierUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_list() {
        let db = test_db().await;
        let repo = db.suppliers();
        let supplier = repo.create(&acme()).await.unwrap();

        repo.deactivate(&supplier.id).await.unwrap();
        assert!(repo.list(false).await.unwrap().is_empty());
        assert_eq!(repo.list(true).await.unwrap().len(), 1);

        let mut conn = db.pool().acquire().await.unwrap();
        let err = ensure_active(&mut conn, &supplier.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::SupplierInactive(_))));
    }
}
