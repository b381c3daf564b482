//! # Inventory Handlers
//!
//! Stock levels and the movement ledger.
//!
//! ```text
//! POST /inventory/add       { location_id, product_id, variant_id?, size?, quantity, note? }
//! POST /inventory/remove    same body; 409 INSUFFICIENT_STOCK when short
//! POST /inventory/transfer  { from_location_id, to_location_id, product_id, ..., quantity }
//! POST /inventory/adjust    { location_id, lines: [{ product_id, ..., delta }], note? }
//! ```
//!
//! Every call is one transaction in shelfwise-db; a rejected line leaves
//! no partial stock change behind.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use shelfwise_core::{AdjustmentLine, StockKey, StockLevel, StockMovement, TransferRequest};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StockQuery {
    pub location_id: Option<String>,
    pub product_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MovementQuery {
    pub location_id: Option<String>,
    pub product_id: Option<String>,
    /// Document number (`TRF-...`, `GRN-...`); other filters are ignored
    pub reference: Option<String>,
    /// Clamped to the configured page size
    pub limit: Option<i64>,
}

/// Body for manual stock-in and stock-out.
#[derive(Debug, Clone, Deserialize)]
pub struct StockChangeRequest {
    #[serde(flatten)]
    pub key: StockKey,
    pub quantity: i64,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustRequest {
    pub location_id: String,
    pub lines: Vec<AdjustmentLine>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub source: StockLevel,
    pub destination: StockLevel,
}

/// GET /api/v2/inventory
pub async fn list_stock(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<StockQuery>,
) -> ApiResult<Json<Vec<StockLevel>>> {
    let levels = state
        .db
        .inventory()
        .list_stock(query.location_id.as_deref(), query.product_id.as_deref())
        .await?;
    Ok(Json(levels))
}

/// POST /api/v2/inventory/add
pub async fn add(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StockChangeRequest>,
) -> ApiResult<Json<StockLevel>> {
    debug!(key = %req.key, quantity = req.quantity, "add stock");
    let level = state
        .db
        .inventory()
        .add_stock(&req.key, req.quantity, req.note.as_deref())
        .await?;
    Ok(Json(level))
}

/// POST /api/v2/inventory/remove
pub async fn remove(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<StockChangeRequest>,
) -> ApiResult<Json<StockLevel>> {
    debug!(key = %req.key, quantity = req.quantity, "remove stock");
    let level = state
        .db
        .inventory()
        .remove_stock(&req.key, req.quantity, req.note.as_deref())
        .await?;
    Ok(Json(level))
}

/// POST /api/v2/inventory/transfer
pub async fn transfer(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<TransferRequest>,
) -> ApiResult<Json<TransferResponse>> {
    let (source, destination) = state.db.inventory().transfer_stock(&req).await?;
    Ok(Json(TransferResponse { source, destination }))
}

/// POST /api/v2/inventory/adjust
pub async fn adjust(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<AdjustRequest>,
) -> ApiResult<Json<Vec<StockLevel>>> {
    let levels = state
        .db
        .inventory()
        .adjust_stock(&req.location_id, &req.lines, req.note.as_deref())
        .await?;
    Ok(Json(levels))
}

/// GET /api/v2/inventory/movements
pub async fn movements(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<MovementQuery>,
) -> ApiResult<Json<Vec<StockMovement>>> {
    let inventory = state.db.inventory();
    let movements = match query.reference.as_deref() {
        Some(reference) => inventory.movements_for_reference(reference).await?,
        None => {
            inventory
                .list_movements(
                    query.location_id.as_deref(),
                    query.product_id.as_deref(),
                    state.config.page_size(query.limit),
                )
                .await?
        }
    };
    Ok(Json(movements))
}
