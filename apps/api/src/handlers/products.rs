//! # Product Handlers
//!
//! Catalog CRUD and variants. Products are never deleted; `DELETE`
//! deactivates so order and stock history keep their references.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use shelfwise_core::{NewProduct, NewVariant, Product, ProductFilter, ProductUpdate, ProductVariant};

/// Query string for `GET /api/v2/products`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductListQuery {
    /// Matches SKU or name
    pub q: Option<String>,
    pub category: Option<String>,
    pub include_inactive: bool,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v2/products
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductListQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let filter = ProductFilter {
        query: query.q,
        category: query.category,
        include_inactive: query.include_inactive,
        limit: state.config.page_size(query.limit),
        offset: query.offset.unwrap_or(0),
    };
    debug!(?filter, "list products");

    Ok(Json(state.db.products().list(&filter).await?))
}

/// POST /api/v2/products
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.db.products().create(&input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/v2/products/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Product>> {
    let product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;
    Ok(Json(product))
}

/// PUT /api/v2/products/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<ProductUpdate>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.db.products().update(&id, &changes).await?))
}

/// DELETE /api/v2/products/:id
pub async fn deactivate(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.db.products().deactivate(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v2/products/:id/variants
pub async fn list_variants(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ProductVariant>>> {
    Ok(Json(state.db.products().list_variants(&id).await?))
}

/// POST /api/v2/products/:id/variants
pub async fn add_variant(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<NewVariant>,
) -> ApiResult<(StatusCode, Json<ProductVariant>)> {
    let variant = state.db.products().add_variant(&id, &input).await?;
    Ok((StatusCode::CREATED, Json(variant)))
}
