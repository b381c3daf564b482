//! Goods received notes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use shelfwise_core::{Grn, NewGrn};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GrnQuery {
    pub purchase_order_id: Option<String>,
}

/// GET /api/v2/grn
pub async fn list(State(state): State<AppState>, ApiQuery(query): ApiQuery<GrnQuery>) -> ApiResult<Json<Vec<Grn>>> {
    Ok(Json(state.db.grns().list(query.purchase_order_id.as_deref()).await?))
}

/// POST /api/v2/grn
///
/// Receives stock at the PO's location and updates product cost.
pub async fn receive(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewGrn>,
) -> ApiResult<(StatusCode, Json<Grn>)> {
    let grn = state.db.grns().receive(&input).await?;
    Ok((StatusCode::CREATED, Json(grn)))
}

/// GET /api/v2/grn/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Grn>> {
    let grn = state
        .db
        .grns()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("GRN", &id))?;
    Ok(Json(grn))
}
