//! Supplier handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::locations::IncludeInactive;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use shelfwise_core::{NewSupplier, Supplier, SupplierUpdate};

/// GET /api/v2/suppliers
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IncludeInactive>,
) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(state.db.suppliers().list(query.include_inactive).await?))
}

/// POST /api/v2/suppliers
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewSupplier>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let supplier = state.db.suppliers().create(&input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// GET /api/v2/suppliers/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Supplier>> {
    let supplier = state
        .db
        .suppliers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Supplier", &id))?;
    Ok(Json(supplier))
}

/// PUT /api/v2/suppliers/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<SupplierUpdate>,
) -> ApiResult<Json<Supplier>> {
    Ok(Json(state.db.suppliers().update(&id, &changes).await?))
}

/// DELETE /api/v2/suppliers/:id
pub async fn deactivate(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.db.suppliers().deactivate(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_state;

    #[tokio::test]
    async fn test_supplier_crud() {
        let state = test_state().await;
        let input = NewSupplier {
            name: "Lanka Textiles".to_string(),
            contact_person: None,
            email: Some("orders@lankatextiles.lk".to_string()),
            phone: None,
            address: None,
        };

        let (code, Json(supplier)) = create(State(state.clone()), ApiJson(input)).await.unwrap();
        assert_eq!(code, StatusCode::CREATED);

        let changes = SupplierUpdate {
            phone: Some("+94 11 234 5678".to_string()),
            ..Default::default()
        };
        let Json(updated) = update(State(state.clone()), Path(supplier.id.clone()), ApiJson(changes))
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("+94 11 234 5678"));
        assert_eq!(updated.email.as_deref(), Some("orders@lankatextiles.lk"));

        deactivate(State(state.clone()), Path(supplier.id.clone())).await.unwrap();
        let Json(found) = get(State(state.clone()), Path(supplier.id)).await.unwrap();
        assert!(!found.is_active);

        let Json(active) = list(State(state), ApiQuery(IncludeInactive::default())).await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_email_rejected() {
        let state = test_state().await;
        let input = NewSupplier {
            name: "Bad Email Ltd".to_string(),
            contact_person: None,
            email: Some("not-an-email".to_string()),
            phone: None,
            address: None,
        };

        let err = create(State(state), ApiJson(input)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
