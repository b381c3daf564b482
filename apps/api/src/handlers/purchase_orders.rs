//! # Purchase Order Handlers
//!
//! ```text
//! POST /purchase-orders            → pending
//! POST /purchase-orders/:id/approve  pending → approved
//! POST /purchase-orders/:id/cancel   pending | approved → cancelled
//! POST /grn                          approved → partially_received → completed
//! ```

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use shelfwise_core::{NewPurchaseOrder, PoStatus, PurchaseOrder};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PurchaseOrderQuery {
    pub status: Option<PoStatus>,
    pub supplier_id: Option<String>,
}

/// GET /api/v2/purchase-orders
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<PurchaseOrderQuery>,
) -> ApiResult<Json<Vec<PurchaseOrder>>> {
    let orders = state
        .db
        .purchase_orders()
        .list(query.status, query.supplier_id.as_deref())
        .await?;
    Ok(Json(orders))
}

/// POST /api/v2/purchase-orders
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewPurchaseOrder>,
) -> ApiResult<(StatusCode, Json<PurchaseOrder>)> {
    let po = state.db.purchase_orders().create(&input).await?;
    Ok((StatusCode::CREATED, Json(po)))
}

/// GET /api/v2/purchase-orders/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<PurchaseOrder>> {
    let po = state
        .db
        .purchase_orders()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Purchase order", &id))?;
    Ok(Json(po))
}

/// POST /api/v2/purchase-orders/:id/approve
pub async fn approve(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<PurchaseOrder>> {
    Ok(Json(state.db.purchase_orders().approve(&id).await?))
}

/// POST /api/v2/purchase-orders/:id/cancel
pub async fn cancel(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<PurchaseOrder>> {
    Ok(Json(state.db.purchase_orders().cancel(&id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::handlers::fixtures;
    use crate::test_state;
    use shelfwise_core::NewPurchaseOrderItem;

    #[tokio::test]
    async fn test_create_approve_cancel() {
        let state = test_state().await;
        let warehouse = fixtures::location(&state, "Warehouse").await;
        let supplier = fixtures::supplier(&state, "Lanka Textiles").await;
        let tee = fixtures::product(&state, "TEE-001", 2_500, 0).await;

        let input = NewPurchaseOrder {
            supplier_id: supplier.clone(),
            location_id: warehouse,
            notes: None,
            expected_at: None,
            items: vec![NewPurchaseOrderItem {
                product_id: tee.id,
                variant_id: String::new(),
                size: "M".to_string(),
                quantity: 10,
                unit_cost_cents: 900,
            }],
        };

        let (code, Json(po)) = create(State(state.clone()), ApiJson(input.clone())).await.unwrap();
        assert_eq!(code, StatusCode::CREATED);
        assert_eq!(po.status, PoStatus::Pending);
        assert_eq!(po.total_cost_cents, 9_000);
        assert!(po.po_number.starts_with("PO-"));

        let Json(po) = approve(State(state.clone()), Path(po.id)).await.unwrap();
        assert_eq!(po.status, PoStatus::Approved);

        let err = approve(State(state.clone()), Path(po.id.clone())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessRule);

        let Json(po) = cancel(State(state.clone()), Path(po.id)).await.unwrap();
        assert_eq!(po.status, PoStatus::Cancelled);

        let (_, Json(second)) = create(State(state.clone()), ApiJson(input)).await.unwrap();
        let query = PurchaseOrderQuery {
            status: Some(PoStatus::Pending),
            supplier_id: Some(supplier),
        };
        let Json(pending) = list(State(state.clone()), ApiQuery(query)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, second.id);
        assert_eq!(pending[0].items.len(), 1);

        let err = get(State(state), Path("missing".to_string())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_empty_order_rejected() {
        let state = test_state().await;
        let warehouse = fixtures::location(&state, "Warehouse").await;
        let supplier = fixtures::supplier(&state, "Lanka Textiles").await;

        let input = NewPurchaseOrder {
            supplier_id: supplier,
            location_id: warehouse,
            notes: None,
            expected_at: None,
            items: Vec::new(),
        };
        let err = create(State(state), ApiJson(input)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
