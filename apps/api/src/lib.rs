//! # Shelfwise API
//!
//! HTTP back office for the Shelfwise ERP.
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          /api/v2                                        │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Catalog       │  │  Stock         │  │  Purchasing                ││
//! │  │                │  │                │  │                            ││
//! │  │ • products     │  │ • inventory    │  │ • suppliers                ││
//! │  │ • variants     │  │ • movements    │  │ • purchase-orders          ││
//! │  │ • locations    │  │ • add/remove/  │  │ • grn                      ││
//! │  │                │  │   transfer/adj │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  Sales         │  │  Cash          │  │  Reports                   ││
//! │  │                │  │                │  │                            ││
//! │  │ • orders       │  │ • petty-cash   │  │ • pnl                      ││
//! │  │ • coupons      │  │ • balance      │  │ • sales/yearly-summary     ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::ApiConfig`]. Environment variables use the `SHELFWISE_`
//! prefix:
//! - `SHELFWISE_PORT` - HTTP port (default: 8080)
//! - `SHELFWISE_DATABASE_PATH` - SQLite file (default: ./shelfwise.db)
//! - `SHELFWISE_LOG_FILTER` - tracing filter when `RUST_LOG` is unset

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

// Re-exports
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
use shelfwise_db::Database;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ApiConfig) -> Self {
        AppState {
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the full router with CORS and request logging.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api/v2", api_routes())
        .layer(axum::middleware::from_fn(middleware::request_logger))
        .layer(cors)
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    use handlers::*;

    Router::new()
        // ========================================
        // CATALOG
        // ========================================
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/:id",
            get(products::get).put(products::update).delete(products::deactivate),
        )
        .route(
            "/products/:id/variants",
            get(products::list_variants).post(products::add_variant),
        )
        .route("/locations", get(locations::list).post(locations::create))
        .route("/locations/:id", axum::routing::delete(locations::deactivate))
        // ========================================
        // INVENTORY
        // ========================================
        .route("/inventory", get(inventory::list_stock))
        .route("/inventory/add", post(inventory::add))
        .route("/inventory/remove", post(inventory::remove))
        .route("/inventory/transfer", post(inventory::transfer))
        .route("/inventory/adjust", post(inventory::adjust))
        .route("/inventory/movements", get(inventory::movements))
        // ========================================
        // PURCHASING
        // ========================================
        .route("/suppliers", get(suppliers::list).post(suppliers::create))
        .route(
            "/suppliers/:id",
            get(suppliers::get).put(suppliers::update).delete(suppliers::deactivate),
        )
        .route(
            "/purchase-orders",
            get(purchase_orders::list).post(purchase_orders::create),
        )
        .route("/purchase-orders/:id", get(purchase_orders::get))
        .route("/purchase-orders/:id/approve", post(purchase_orders::approve))
        .route("/purchase-orders/:id/cancel", post(purchase_orders::cancel))
        .route("/grn", get(grns::list).post(grns::receive))
        .route("/grn/:id", get(grns::get))
        // ========================================
        // SALES
        // ========================================
        .route("/orders", get(orders::list).post(orders::create))
        .route("/orders/:id", get(orders::get))
        .route("/orders/:id/status", put(orders::update_status))
        .route("/orders/:id/payment-status", put(orders::update_payment_status))
        .route("/coupons", get(coupons::list).post(coupons::create))
        .route("/coupons/validate", post(coupons::validate))
        .route("/coupons/:code", get(coupons::get).delete(coupons::deactivate))
        // ========================================
        // PETTY CASH & REPORTS
        // ========================================
        .route("/petty-cash", get(petty_cash::list).post(petty_cash::record))
        .route("/petty-cash/balance", get(petty_cash::balance))
        .route("/reports/pnl", get(reports::profit_and_loss))
        .route("/reports/sales/yearly-summary", get(reports::yearly_sales_summary))
}

/// In-memory state for handler tests.
#[cfg(test)]
pub(crate) async fn test_state() -> AppState {
    let db = Database::new(shelfwise_db::DbConfig::in_memory())
        .await
        .unwrap();
    AppState::new(db, ApiConfig::default())
}
