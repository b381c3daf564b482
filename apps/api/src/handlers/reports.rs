//! # Report Handlers
//!
//! ```text
//! GET /api/v2/reports/pnl?from=2026-03-01T00:00:00Z&to=2026-04-01T00:00:00Z
//! GET /api/v2/reports/sales/yearly-summary?year=2026
//! ```
//!
//! Periods are half-open `[from, to)` in UTC.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Datelike, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::AppState;
use shelfwise_core::reports::{ProfitAndLoss, YearlySalesSummary};

#[derive(Debug, Clone, Deserialize)]
pub struct PeriodQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct YearQuery {
    /// Defaults to the current year
    pub year: Option<i32>,
}

/// GET /api/v2/reports/pnl
pub async fn profit_and_loss(
    State(state): State<AppState>,
    ApiQuery(period): ApiQuery<PeriodQuery>,
) -> ApiResult<Json<ProfitAndLoss>> {
    debug!(from = %period.from, to = %period.to, "profit and loss requested");
    Ok(Json(state.db.reports().profit_and_loss(period.from, period.to).await?))
}

/// GET /api/v2/reports/sales/yearly-summary
pub async fn yearly_sales_summary(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<YearQuery>,
) -> ApiResult<Json<YearlySalesSummary>> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    Ok(Json(state.db.reports().yearly_sales_summary(year).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::handlers::fixtures;
    use crate::test_state;
    use chrono::TimeZone;
    use shelfwise_core::{NewOrder, NewOrderItem, OrderSource, PaymentMethod, PaymentStatus, StockKey};

    #[tokio::test]
    async fn test_reports_over_one_order() {
        let state = test_state().await;
        let store = fixtures::location(&state, "Store").await;
        let tee = fixtures::product(&state, "TEE-001", 5_000, 2_000).await;
        state
            .db
            .inventory()
            .add_stock(&StockKey::new(&store, &tee.id), 10, None)
            .await
            .unwrap();

        let placed = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();
        state
            .db
            .orders()
            .create(
                &NewOrder {
                    source: OrderSource::Store,
                    location_id: store,
                    customer_name: None,
                    customer_phone: None,
                    customer_email: None,
                    payment_method: PaymentMethod::Cash,
                    payment_status: Some(PaymentStatus::Paid),
                    coupon_code: None,
                    shipping_fee_cents: 0,
                    transaction_fee_cents: 0,
                    items: vec![NewOrderItem {
                        product_id: tee.id,
                        variant_id: String::new(),
                        size: String::new(),
                        quantity: 2,
                        unit_price_cents: None,
                        discount_cents: 0,
                    }],
                },
                placed,
            )
            .await
            .unwrap();

        let period = PeriodQuery {
            from: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(),
        };
        let Json(pnl) = profit_and_loss(State(state.clone()), ApiQuery(period.clone())).await.unwrap();
        assert_eq!(pnl.net_sales.cents(), 10_000);
        assert_eq!(pnl.gross_profit.cents(), 6_000);

        let backwards = PeriodQuery {
            from: period.to,
            to: period.from,
        };
        let err = profit_and_loss(State(state.clone()), ApiQuery(backwards)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let Json(summary) = yearly_sales_summary(State(state.clone()), ApiQuery(YearQuery { year: Some(2026) }))
            .await
            .unwrap();
        assert_eq!(summary.months[2].sales.units_sold, 2);

        let err = yearly_sales_summary(State(state), ApiQuery(YearQuery { year: Some(1900) }))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_malformed_period_is_validation_error() {
        use axum::extract::FromRequestParts;
        use axum::http::Request;

        let uri = "/api/v2/reports/pnl?from=yesterday&to=2026-04-01T00:00:00Z";
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        let err = ApiQuery::<PeriodQuery>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.code.status(), axum::http::StatusCode::BAD_REQUEST);

        let uri = "/api/v2/reports/pnl?from=2026-03-01T00:00:00Z";
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        let err = ApiQuery::<PeriodQuery>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
