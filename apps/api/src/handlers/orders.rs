//! # Order Handlers
//!
//! Store and website orders share one pipeline:
//!
//! ```text
//! POST /orders
//!   │  price lines (catalog price unless overridden), snapshot cost
//!   │  apply coupon, redeem it
//!   │  take stock from the order's location
//!   ▼
//! pending ─► processing ─► shipped ─► delivered
//!    │            │           │           │
//!    └────────────┴─► cancelled           └─► returned
//!                     (stock restored)        (stock restored)
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use shelfwise_core::{NewOrder, Order, OrderFilter, OrderSource, OrderStatus, PaymentStatus};

/// Query string for `GET /api/v2/orders`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub source: Option<OrderSource>,
    /// Inclusive lower bound on `created_at` (RFC 3339)
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at` (RFC 3339)
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusUpdate {
    pub payment_status: PaymentStatus,
}

/// GET /api/v2/orders
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> ApiResult<Json<Vec<Order>>> {
    let filter = OrderFilter {
        status: query.status,
        source: query.source,
        from: query.from,
        to: query.to,
        limit: state.config.page_size(query.limit),
        offset: query.offset.unwrap_or(0),
    };
    debug!(?filter, "list orders");

    Ok(Json(state.db.orders().list(&filter).await?))
}

/// POST /api/v2/orders
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state.db.orders().create(&input, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /api/v2/orders/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Order>> {
    let order = state
        .db
        .orders()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &id))?;
    Ok(Json(order))
}

/// PUT /api/v2/orders/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.db.orders().update_status(&id, body.status).await?))
}

/// PUT /api/v2/orders/:id/payment-status
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PaymentStatusUpdate>,
) -> ApiResult<Json<Order>> {
    Ok(Json(
        state
            .db
            .orders()
            .update_payment_status(&id, body.payment_status)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::handlers::fixtures;
    use crate::{test_state, AppState};
    use shelfwise_core::{NewOrderItem, PaymentMethod, StockKey};

    /// Store with 10 × TEE-001 (price 25.00).
    async fn setup() -> (AppState, String, String) {
        let state = test_state().await;
        let store = fixtures::location(&state, "Store").await;
        let tee = fixtures::product(&state, "TEE-001", 2_500, 900).await;
        state
            .db
            .inventory()
            .add_stock(&StockKey::new(&store, &tee.id), 10, None)
            .await
            .unwrap();
        (state, store, tee.id)
    }

    fn order(store: &str, tee: &str, quantity: i64) -> NewOrder {
        NewOrder {
            source: OrderSource::Website,
            location_id: store.to_string(),
            customer_name: Some("Amaya".to_string()),
            customer_phone: None,
            customer_email: None,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_status: None,
            coupon_code: None,
            shipping_fee_cents: 400,
            transaction_fee_cents: 0,
            items: vec![NewOrderItem {
                product_id: tee.to_string(),
                variant_id: String::new(),
                size: String::new(),
                quantity,
                unit_price_cents: None,
                discount_cents: 0,
            }],
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let (state, store, tee) = setup().await;

        let (code, Json(created)) = create(State(state.clone()), ApiJson(order(&store, &tee, 2))).await.unwrap();
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(created.subtotal_cents, 5_000);
        assert_eq!(created.total_cents, 5_400);
        assert_eq!(created.status, OrderStatus::Pending);
        assert_eq!(created.payment_status, PaymentStatus::Pending);

        let Json(found) = get(State(state.clone()), Path(created.id.clone())).await.unwrap();
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.items[0].unit_cost_cents, 900);

        let err = create(State(state.clone()), ApiJson(order(&store, &tee, 9))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let query = OrderListQuery {
            source: Some(OrderSource::Website),
            ..Default::default()
        };
        let Json(orders) = list(State(state), ApiQuery(query)).await.unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_restores_stock() {
        let (state, store, tee) = setup().await;
        let (_, Json(created)) = create(State(state.clone()), ApiJson(order(&store, &tee, 3))).await.unwrap();
        let key = StockKey::new(&store, &tee);
        assert_eq!(state.db.inventory().get_stock(&key).await.unwrap(), 7);

        let Json(cancelled) = update_status(
            State(state.clone()),
            Path(created.id.clone()),
            ApiJson(StatusUpdate {
                status: OrderStatus::Cancelled,
            }),
        )
        .await
        .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(cancelled.stock_restored);
        assert_eq!(state.db.inventory().get_stock(&key).await.unwrap(), 10);

        let err = update_status(
            State(state),
            Path(created.id),
            ApiJson(StatusUpdate {
                status: OrderStatus::Shipped,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);
    }

    #[tokio::test]
    async fn test_payment_status() {
        let (state, store, tee) = setup().await;
        let (_, Json(created)) = create(State(state.clone()), ApiJson(order(&store, &tee, 1))).await.unwrap();

        let Json(paid) = update_payment_status(
            State(state.clone()),
            Path(created.id),
            ApiJson(PaymentStatusUpdate {
                payment_status: PaymentStatus::Paid,
            }),
        )
        .await
        .unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);

        let err = update_payment_status(
            State(state),
            Path("missing".to_string()),
            ApiJson(PaymentStatusUpdate {
                payment_status: PaymentStatus::Paid,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
