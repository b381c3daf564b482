//! # Repository Module
//!
//! Database repository implementations for Shelfwise.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.grns().receive(&new_grn)                                   │
//! │       ▼                                                                 │
//! │  GrnRepository                                                         │
//! │  ├── opens ONE transaction                                             │
//! │  ├── loads the PO, asks shelfwise-core to reconcile                    │
//! │  ├── writes GRN rows, PO progress, product cost                        │
//! │  └── posts stock through the shared ledger (inventory::post)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Connections and Transactions
//! Public repository methods take `&self` and use the pool. Helpers that
//! must run inside another repository's transaction take
//! `&mut SqliteConnection` instead, and callers pass `&mut *tx`.
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`] - Catalog CRUD, variants, search
//! - [`LocationRepository`] - Stores and warehouses
//! - [`InventoryRepository`] - Stock levels and the movement ledger
//! - [`SupplierRepository`] - Supplier CRUD
//! - [`PurchaseOrderRepository`] - PO creation and approval
//! - [`GrnRepository`] - Goods receipt against POs
//! - [`OrderRepository`] - Orders, fulfilment and payment status
//! - [`CouponRepository`] - Promotion codes
//! - [`PettyCashRepository`] - Cash float and expenses
//! - [`ReportRepository`] - P&L and yearly sales summary

pub mod coupon;
pub mod grn;
pub mod inventory;
pub mod location;
pub mod order;
pub mod petty_cash;
pub mod product;
pub mod purchase_order;
pub mod report;
pub mod supplier;

pub use coupon::CouponRepository;
pub use grn::GrnRepository;
pub use inventory::InventoryRepository;
pub use location::LocationRepository;
pub use order::OrderRepository;
pub use petty_cash::PettyCashRepository;
pub use product::ProductRepository;
pub use purchase_order::PurchaseOrderRepository;
pub use report::ReportRepository;
pub use supplier::SupplierRepository;

use uuid::Uuid;

/// Generates a new entity ID.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trims an optional text field; blank becomes `None`.
pub(crate) fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// In-memory database with migrations applied, for repository tests.
#[cfg(test)]
pub(crate) async fn test_db() -> crate::Database {
    crate::Database::new(crate::DbConfig::in_memory())
        .await
        .unwrap()
}
