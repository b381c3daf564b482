//! # Product Repository
//!
//! Database operations for the catalog: products and their variants.
//!
//! ## Key Operations
//! - CRUD with soft delete
//! - Filtered listing (search, category, paging)
//! - Variants, unique by name within a product
//! - Moving-average cost updates (used by goods receipt)
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User types: "linen"                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  WHERE (sku LIKE '%linen%' OR name LIKE '%linen%')   ← case-insensitive│
//! │    AND category = ?            (optional)                              │
//! │    AND is_active = 1           (unless include_inactive)               │
//! │  ORDER BY name LIMIT ? OFFSET ?                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  [LIN-SHIRT-WHT, LIN-TROUSER-BEI, ...]                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::{clean, generate_id};
use crate::error::{DbError, DbResult};
use shelfwise_core::validation::{
    clamp_page, validate_amount_cents, validate_product_name, validate_search_query, validate_sku,
    validate_text,
};
use shelfwise_core::{NewProduct, NewVariant, Product, ProductFilter, ProductUpdate, ProductVariant};

/// Hard cap on one page of products.
const MAX_PAGE: i64 = 500;

/// Repository for catalog database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let tee = repo.create(&new_product).await?;
/// let found = repo.list(&ProductFilter { query: Some("tee".into()), ..Default::default() }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    /// * `Err(DbError::Domain)` - Invalid SKU, name or price
    pub async fn create(&self, input: &NewProduct) -> DbResult<Product> {
        let sku = input.sku.trim();
        validate_sku(sku)?;
        validate_product_name(&input.name)?;
        validate_amount_cents("selling_price_cents", input.selling_price_cents)?;
        validate_amount_cents("cost_price_cents", input.cost_price_cents)?;

        let now = Utc::now();
        let product = Product {
            id: generate_id(),
            sku: sku.to_string(),
            name: input.name.trim().to_string(),
            description: clean(input.description.as_deref()),
            category: clean(input.category.as_deref()),
            brand: clean(input.brand.as_deref()),
            selling_price_cents: input.selling_price_cents,
            cost_price_cents: input.cost_price_cents,
            is_active: true,
            created_at: now,
            updated_at: now,
            sync_version: 0,
        };

        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, description, category, brand,
                selling_price_cents, cost_price_cents,
                is_active, created_at, updated_at, sync_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(product.selling_price_cents)
        .bind(product.cost_price_cents)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.sync_version)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate("sku", &product.sku))?;

        info!(id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found (active or not)
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        find_by_id(&mut conn, id).await
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE sku = ?1")
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Applies a partial update.
    ///
    /// Only fields present in `changes` are touched. Every successful update
    /// bumps `sync_version` and `updated_at`.
    pub async fn update(&self, id: &str, changes: &ProductUpdate) -> DbResult<Product> {
        let mut product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if let Some(sku) = &changes.sku {
            validate_sku(sku)?;
            product.sku = sku.trim().to_string();
        }
        if let Some(name) = &changes.name {
            validate_product_name(name)?;
            product.name = name.trim().to_string();
        }
        if changes.description.is_some() {
            product.description = clean(changes.description.as_deref());
        }
        if changes.category.is_some() {
            product.category = clean(changes.category.as_deref());
        }
        if changes.brand.is_some() {
            product.brand = clean(changes.brand.as_deref());
        }
        if let Some(price) = changes.selling_price_cents {
            validate_amount_cents("selling_price_cents", price)?;
            product.selling_price_cents = price;
        }
        if let Some(cost) = changes.cost_price_cents {
            validate_amount_cents("cost_price_cents", cost)?;
            product.cost_price_cents = cost;
        }

        debug!(id = %id, "Updating product");

        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE products SET
                sku = ?2,
                name = ?3,
                description = ?4,
                category = ?5,
                brand = ?6,
                selling_price_cents = ?7,
                cost_price_cents = ?8,
                updated_at = ?9,
                sync_version = sync_version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(&product.brand)
        .bind(product.selling_price_cents)
        .bind(product.cost_price_cents)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate("sku", &product.sku))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// ## Why Soft Delete?
    /// - Historical orders and POs still reference this product
    /// - Can be restored if deactivated by mistake
    pub async fn deactivate(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deactivating product");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET is_active = 0, updated_at = ?2, sync_version = sync_version + 1
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product deactivated");
        Ok(())
    }

    /// Lists products matching a filter, ordered by name.
    pub async fn list(&self, filter: &ProductFilter) -> DbResult<Vec<Product>> {
        let (limit, offset) = clamp_page(filter.limit, filter.offset, MAX_PAGE);

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM products WHERE 1 = 1");

        if !filter.include_inactive {
            qb.push(" AND is_active = 1");
        }

        if let Some(query) = filter.query.as_deref() {
            let query = validate_search_query(query)?;
            if !query.is_empty() {
                let pattern = format!("%{}%", query.to_lowercase());
                qb.push(" AND (LOWER(sku) LIKE ")
                    .push_bind(pattern.clone())
                    .push(" OR LOWER(name) LIKE ")
                    .push_bind(pattern)
                    .push(")");
            }
        }

        if let Some(category) = clean(filter.category.as_deref()) {
            qb.push(" AND category = ").push_bind(category);
        }

        qb.push(" ORDER BY name, sku LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// Adds a variant to a product.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    /// * `Err(DbError::UniqueViolation)` - Product already has a variant with this name
    pub async fn add_variant(&self, product_id: &str, input: &NewVariant) -> DbResult<ProductVariant> {
        validate_text("name", &input.name, 100)?;

        if self.get_by_id(product_id).await?.is_none() {
            return Err(DbError::not_found("Product", product_id));
        }

        let variant = ProductVariant {
            id: generate_id(),
            product_id: product_id.to_string(),
            name: input.name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO product_variants (id, product_id, name, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.name)
        .bind(variant.is_active)
        .bind(variant.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate("variant", &variant.name))?;

        debug!(product_id = %product_id, variant = %variant.name, "Variant added");
        Ok(variant)
    }

    /// Lists a product's variants by name.
    pub async fn list_variants(&self, product_id: &str) -> DbResult<Vec<ProductVariant>> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            "SELECT * FROM product_variants WHERE product_id = ?1 ORDER BY name",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn find_by_id(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Sets the moving-average unit cost.
pub(crate) async fn set_cost_price(
    conn: &mut SqliteConnection,
    product_id: &str,
    cost_price_cents: i64,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET cost_price_cents = ?2, updated_at = ?3, sync_version = sync_version + 1
        WHERE id = ?1
        "#,
    )
    .bind(product_id)
    .bind(cost_price_cents)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product_id));
    }
    Ok(())
}

/// Checks that a non-empty variant id belongs to the product.
pub(crate) async fn ensure_variant(
    conn: &mut SqliteConnection,
    product_id: &str,
    variant_id: &str,
) -> DbResult<()> {
    if variant_id.is_empty() {
        return Ok(());
    }

    let found: Option<String> =
        sqlx::query_scalar("SELECT id FROM product_variants WHERE id = ?1 AND product_id = ?2")
            .bind(variant_id)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(DbError::not_found("Variant", variant_id)),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
