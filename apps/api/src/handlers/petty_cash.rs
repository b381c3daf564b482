//! Petty cash float.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use shelfwise_core::{NewPettyCashEntry, PettyCashEntry, PettyCashKind};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PettyCashQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub kind: Option<PettyCashKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceResponse {
    pub balance_cents: i64,
}

/// GET /api/v2/petty-cash
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PettyCashQuery>,
) -> ApiResult<Json<Vec<PettyCashEntry>>> {
    let entries = state
        .db
        .petty_cash()
        .list(query.from, query.to, query.kind)
        .await?;
    Ok(Json(entries))
}

/// POST /api/v2/petty-cash
///
/// An expense larger than the float returns 422 `BUSINESS_RULE`.
pub async fn record(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewPettyCashEntry>,
) -> ApiResult<(StatusCode, Json<PettyCashEntry>)> {
    let entry = state.db.petty_cash().record(&input).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /api/v2/petty-cash/balance
pub async fn balance(State(state): State<AppState>) -> ApiResult<Json<BalanceResponse>> {
    let balance = state.db.petty_cash().balance().await?;
    Ok(Json(BalanceResponse {
        balance_cents: balance.cents(),
    }))
}
