//! Coupon handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::locations::IncludeInactive;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use shelfwise_core::{Coupon, Money, NewCoupon};

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub subtotal_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateCouponResponse {
    pub code: String,
    pub discount_cents: i64,
    pub total_after_discount_cents: i64,
}

/// GET /api/v2/coupons
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IncludeInactive>,
) -> ApiResult<Json<Vec<Coupon>>> {
    Ok(Json(state.db.coupons().list(query.include_inactive).await?))
}

/// POST /api/v2/coupons
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewCoupon>,
) -> ApiResult<(StatusCode, Json<Coupon>)> {
    let coupon = state.db.coupons().create(&input).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// GET /api/v2/coupons/:code
pub async fn get(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<Json<Coupon>> {
    let coupon = state
        .db
        .coupons()
        .get(&code)
        .await?
        .ok_or_else(|| ApiError::not_found("Coupon", &code))?;
    Ok(Json(coupon))
}

/// DELETE /api/v2/coupons/:code
pub async fn deactivate(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<StatusCode> {
    state.db.coupons().deactivate(&code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v2/coupons/validate
///
/// Previews the discount for a cart subtotal. Does not count a use.
pub async fn validate(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ValidateCouponRequest>,
) -> ApiResult<Json<ValidateCouponResponse>> {
    if req.subtotal_cents < 0 {
        return Err(ApiError::validation("subtotal_cents must not be negative"));
    }
    let subtotal = Money::from_cents(req.subtotal_cents);
    let discount = state.db.coupons().validate(&req.code, subtotal, Utc::now()).await?;

    Ok(Json(ValidateCouponResponse {
        code: req.code.trim().to_uppercase(),
        discount_cents: discount.cents(),
        total_after_discount_cents: (subtotal - discount).cents(),
    }))
}
