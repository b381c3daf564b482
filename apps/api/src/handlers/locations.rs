//! Stores and warehouses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiQuery};
use crate::AppState;
use shelfwise_core::{NewLocation, StockLocation};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct IncludeInactive {
    pub include_inactive: bool,
}

/// GET /api/v2/locations
pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IncludeInactive>,
) -> ApiResult<Json<Vec<StockLocation>>> {
    Ok(Json(state.db.locations().list(query.include_inactive).await?))
}

/// POST /api/v2/locations
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewLocation>,
) -> ApiResult<(StatusCode, Json<StockLocation>)> {
    let location = state.db.locations().create(&input).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

/// DELETE /api/v2/locations/:id
pub async fn deactivate(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.db.locations().deactivate(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_state;

    fn store(name: &str) -> NewLocation {
        NewLocation {
            name: name.to_string(),
            address: None,
        }
    }

    #[tokio::test]
    async fn test_location_lifecycle() {
        let state = test_state().await;

        let (code, Json(main)) = create(State(state.clone()), ApiJson(store("Main Store"))).await.unwrap();
        assert_eq!(code, StatusCode::CREATED);
        create(State(state.clone()), ApiJson(store("Warehouse"))).await.unwrap();

        let err = create(State(state.clone()), ApiJson(store("Main Store"))).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        deactivate(State(state.clone()), Path(main.id)).await.unwrap();
        let Json(active) = list(State(state.clone()), ApiQuery(IncludeInactive::default())).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "Warehouse");

        let Json(all) = list(State(state.clone()), ApiQuery(IncludeInactive { include_inactive: true }))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let err = deactivate(State(state), Path("missing".to_string())).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
