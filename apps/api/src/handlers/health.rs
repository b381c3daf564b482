//! Liveness and database health.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    /// Embedded migrations not yet recorded in `_sqlx_migrations`
    pub pending_migrations: usize,
    pub version: &'static str,
}

/// GET /health
///
/// 200 when the database answers `SELECT 1` and the schema is current,
/// 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let pending_migrations = match state.db.migration_status().await {
        Ok((total, applied)) => total.saturating_sub(applied),
        Err(_) => 0,
    };
    let (code, status) = if database && pending_migrations == 0 {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        code,
        Json(HealthResponse {
            status,
            database,
            pending_migrations,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
