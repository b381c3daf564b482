//! # shelfwise-core: Pure Business Logic for the Shelfwise back-office
//!
//! This crate contains every business rule of the ERP as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Shelfwise Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  HTTP API (axum, apps/api)                       │   │
//! │  │   /api/v2/products, /inventory, /grn, /orders, /reports/pnl     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ shelfwise-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌──────────┐  │   │
//! │  │   │   types   │  │   money   │  │ inventory  │  │ reports  │  │   │
//! │  │   │ Product   │  │  Money    │  │ StockKey   │  │   P&L    │  │   │
//! │  │   │ Order, PO │  │ ratio_bps │  │ balances   │  │  yearly  │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └──────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐                 │   │
//! │  │   │purchasing │  │  orders   │  │  coupons   │                 │   │
//! │  │   │ GRN recon │  │ totals/FSM│  │ discounts  │                 │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘                 │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                shelfwise-db (Database Layer)                    │   │
//! │  │        SQLite queries, migrations, transactional ledger         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockLevel, PurchaseOrder, Order, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//! - [`inventory`] - Stock keys, balance arithmetic, adjustment checks
//! - [`purchasing`] - PO state machine and GRN reconciliation
//! - [`orders`] - Order totals and order/payment state machines
//! - [`coupons`] - Coupon eligibility and discount calculation
//! - [`reports`] - Profit & loss and yearly sales summary engine
//!
//! ## Example Usage
//!
//! ```rust
//! use shelfwise_core::money::{ratio_bps, Money};
//!
//! let net_sales = Money::from_cents(200_000);
//! let gross_profit = Money::from_cents(50_000);
//!
//! // 25.00% gross margin, expressed in basis points
//! assert_eq!(ratio_bps(gross_profit, net_sales), 2500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coupons;
pub mod error;
pub mod inventory;
pub mod money;
pub mod orders;
pub mod purchasing;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use shelfwise_core::Money` instead of
// `use shelfwise_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::StockKey;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of lines in a single stock adjustment.
///
/// ## Business Reason
/// Stock counts are entered by hand per shelf. Anything larger is almost
/// always a spreadsheet pasted into the wrong form.
pub const MAX_ADJUSTMENT_LINES: usize = 200;

/// Maximum quantity moved by a single line (adjustment, PO, order).
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Maximum number of lines on an order or purchase order.
pub const MAX_DOCUMENT_LINES: usize = 500;

/// Largest single amount accepted from input (10,000,000.00).
///
/// Prices, costs, fees, coupon values and petty-cash entries are all
/// bounded by this so line and document totals cannot overflow.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000;
