//! # shelfwise-db: Database Layer for Shelfwise
//!
//! SQLite persistence for the Shelfwise back office, built on sqlx.
//! Every write that touches stock goes through one ledger helper so the
//! stock level and its movement row are always committed together.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Shelfwise Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (POST /api/v2/grns)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   shelfwise-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ GrnRepo ──┐   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo ┼──►│    │ 001_init.sql │  │   │
//! │  │   │ WAL, FK on    │    │ ...       │   │    │              │  │   │
//! │  │   │               │    │   inventory::post (stock ledger)   │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (shelfwise.db)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (inventory, orders, etc.)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shelfwise_db::{Database, DbConfig};
//!
//! // Migrations run on connect unless disabled
//! let db = Database::new(DbConfig::new("shelfwise.db")).await?;
//!
//! let on_hand = db.inventory().total_on_hand(&product_id).await?;
//! let pnl = db.reports().profit_and_loss(from, to).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CouponRepository, GrnRepository, InventoryRepository, LocationRepository, OrderRepository,
    PettyCashRepository, ProductRepository, PurchaseOrderRepository, ReportRepository,
    SupplierRepository,
};
