//! # Domain Types
//!
//! Core domain types used throughout the Shelfwise back-office.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog            Stock                    Purchasing                 │
//! │  ─────────────      ──────────────────       ─────────────────────      │
//! │  Product            StockLocation            Supplier                   │
//! │  ProductVariant     StockLevel (per key)     PurchaseOrder + items      │
//! │                     StockMovement (ledger)   Grn + items                │
//! │                                                                         │
//! │  Selling            Cash                                                │
//! │  ─────────────      ──────────────────                                  │
//! │  Order + items      PettyCashEntry                                      │
//! │  Coupon                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conventions
//! - `id`: UUID v4 string, used for relations
//! - Business numbers (`po_number`, `grn_number`, `order_number`) are for humans
//! - Amounts are stored as `*_cents: i64`; accessor methods return [`Money`]
//! - `variant_id` / `size` use the empty string for "no variant" / "one size"

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

/// Implements `Display` for enums that expose `as_str()`.
macro_rules! display_as_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

// =============================================================================
// Catalog
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    pub description: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,

    /// Default selling price in cents.
    pub selling_price_cents: i64,

    /// Moving-average unit cost in cents, maintained by goods receipts.
    pub cost_price_cents: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Incremented on every write.
    pub sync_version: i64,
}

impl Product {
    /// Returns the selling price as Money.
    #[inline]
    pub fn selling_price(&self) -> Money {
        Money::from_cents(self.selling_price_cents)
    }

    /// Returns the unit cost as Money.
    #[inline]
    pub fn cost_price(&self) -> Money {
        Money::from_cents(self.cost_price_cents)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    pub selling_price_cents: i64,
    #[serde(default)]
    pub cost_price_cents: i64,
}

/// Partial product update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub selling_price_cents: Option<i64>,
    pub cost_price_cents: Option<i64>,
}

/// A variant (colour, style) of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductVariant {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for adding a variant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewVariant {
    pub name: String,
}

/// Catalog listing filter.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct ProductFilter {
    /// Case-insensitive match on SKU or name.
    pub query: Option<String>,
    pub category: Option<String>,
    pub include_inactive: bool,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ProductFilter {
    fn default() -> Self {
        ProductFilter {
            query: None,
            category: None,
            include_inactive: false,
            limit: 50,
            offset: 0,
        }
    }
}

// =============================================================================
// Locations
// =============================================================================

/// A place that holds stock (store, warehouse, pop-up).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLocation {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for creating a location.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewLocation {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Current quantity of one stock key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    pub id: String,
    pub location_id: String,
    pub product_id: String,
    pub variant_id: String,
    pub size: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Why a stock quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Manual increase (count correction, found stock).
    StockIn,
    /// Manual decrease (damage, shrinkage).
    StockOut,
    TransferIn,
    TransferOut,
    /// Receipt against a purchase order.
    GoodsReceived,
    /// Sold on an order.
    OrderFulfilment,
    /// Returned to shelf after cancellation or return.
    OrderRestock,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::StockIn => "stock_in",
            MovementKind::StockOut => "stock_out",
            MovementKind::TransferIn => "transfer_in",
            MovementKind::TransferOut => "transfer_out",
            MovementKind::GoodsReceived => "goods_received",
            MovementKind::OrderFulfilment => "order_fulfilment",
            MovementKind::OrderRestock => "order_restock",
        }
    }

    /// Whether this kind increases stock.
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            MovementKind::StockIn
                | MovementKind::TransferIn
                | MovementKind::GoodsReceived
                | MovementKind::OrderRestock
        )
    }
}

/// One row of the stock ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub location_id: String,
    pub product_id: String,
    pub variant_id: String,
    pub size: String,
    pub kind: MovementKind,
    /// Signed change applied to the level.
    pub quantity_delta: i64,
    /// Level after the change.
    pub balance_after: i64,
    /// Document number (GRN-..., ORD-..., TRF-...).
    pub reference: Option<String>,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// One line of a multi-line adjustment at a single location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdjustmentLine {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: String,
    #[serde(default)]
    pub size: String,
    /// Non-zero signed change.
    pub delta: i64,
}

/// Move stock between two locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TransferRequest {
    pub from_location_id: String,
    pub to_location_id: String,
    pub product_id: String,
    #[serde(default)]
    pub variant_id: String,
    #[serde(default)]
    pub size: String,
    pub quantity: i64,
    #[serde(default)]
    pub note: Option<String>,
}

// =============================================================================
// Suppliers
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Partial supplier update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct SupplierUpdate {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

// =============================================================================
// Purchase Orders
// =============================================================================

/// Lifecycle of a purchase order. See [`crate::purchasing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PoStatus {
    Pending,
    Approved,
    PartiallyReceived,
    Completed,
    Cancelled,
}

impl PoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoStatus::Pending => "pending",
            PoStatus::Approved => "approved",
            PoStatus::PartiallyReceived => "partially_received",
            PoStatus::Completed => "completed",
            PoStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for PoStatus {
    fn default() -> Self {
        PoStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrder {
    pub id: String,
    pub po_number: String,
    pub supplier_id: String,
    /// Location the goods will be received into.
    pub location_id: String,
    pub status: PoStatus,
    pub notes: Option<String>,
    pub total_cost_cents: i64,
    #[ts(as = "Option<String>")]
    pub expected_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<PurchaseOrderItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseOrderItem {
    pub id: String,
    pub purchase_order_id: String,
    pub product_id: String,
    pub variant_id: String,
    pub size: String,
    pub quantity_ordered: i64,
    pub quantity_received: i64,
    pub unit_cost_cents: i64,
}

impl PurchaseOrderItem {
    /// Quantity still expected from the supplier.
    #[inline]
    pub fn outstanding(&self) -> i64 {
        (self.quantity_ordered - self.quantity_received).max(0)
    }

    #[inline]
    pub fn is_fully_received(&self) -> bool {
        self.quantity_received >= self.quantity_ordered
    }

    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchaseOrder {
    pub supplier_id: String,
    pub location_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expected_at: Option<DateTime<Utc>>,
    pub items: Vec<NewPurchaseOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchaseOrderItem {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: String,
    #[serde(default)]
    pub size: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

// =============================================================================
// Goods Received Notes
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Grn {
    pub id: String,
    pub grn_number: String,
    pub purchase_order_id: String,
    pub location_id: String,
    pub notes: Option<String>,
    pub total_cost_cents: i64,
    #[ts(as = "String")]
    pub received_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<GrnItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct GrnItem {
    pub id: String,
    pub grn_id: String,
    pub po_item_id: String,
    pub product_id: String,
    pub variant_id: String,
    pub size: String,
    pub quantity_received: i64,
    pub unit_cost_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewGrn {
    pub purchase_order_id: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub lines: Vec<NewGrnLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewGrnLine {
    pub po_item_id: String,
    pub quantity_received: i64,
}

// =============================================================================
// Orders
// =============================================================================

/// Sales channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    Store,
    Website,
}

impl OrderSource {
    pub const ALL: [OrderSource; 2] = [OrderSource::Store, OrderSource::Website];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSource::Store => "store",
            OrderSource::Website => "website",
        }
    }
}

/// Fulfilment lifecycle of an order. See [`crate::orders`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub source: OrderSource,
    /// Location the stock was taken from.
    pub location_id: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_email: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
    /// Σ line totals (after line discounts).
    pub subtotal_cents: i64,
    /// Line discounts + coupon discount.
    pub discount_cents: i64,
    pub shipping_fee_cents: i64,
    /// Payment gateway / card fees borne by the business.
    pub transaction_fee_cents: i64,
    pub total_cents: i64,
    /// Set once stock has been put back after cancel/return.
    pub stock_restored: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderItem>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item. Uses the snapshot pattern: SKU, name, price and cost are
/// frozen at the time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub variant_id: String,
    pub size: String,
    pub sku_snapshot: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
    pub discount_cents: i64,
    /// quantity × unit_price − discount.
    pub line_total_cents: i64,
}

impl OrderItem {
    /// Merchandise value before discounts.
    #[inline]
    pub fn gross(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }

    /// Cost of goods for this line.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents).multiply_quantity(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrder {
    pub source: OrderSource,
    pub location_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub shipping_fee_cents: i64,
    #[serde(default)]
    pub transaction_fee_cents: i64,
    pub items: Vec<NewOrderItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewOrderItem {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: String,
    #[serde(default)]
    pub size: String,
    pub quantity: i64,
    /// Overrides the catalog selling price when set.
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub discount_cents: i64,
}

/// Order listing filter.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub source: Option<OrderSource>,
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for OrderFilter {
    fn default() -> Self {
        OrderFilter {
            status: None,
            source: None,
            from: None,
            to: None,
            limit: 50,
            offset: 0,
        }
    }
}

// =============================================================================
// Coupons
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is basis points (1500 = 15%).
    Percentage,
    /// `value` is cents.
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Coupon {
    pub id: String,
    /// Uppercase code customers type in.
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub min_order_cents: i64,
    pub max_discount_cents: Option<i64>,
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    #[ts(as = "Option<String>")]
    pub starts_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewCoupon {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    #[serde(default)]
    pub min_order_cents: i64,
    #[serde(default)]
    pub max_discount_cents: Option<i64>,
    #[serde(default)]
    pub usage_limit: Option<i64>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Petty Cash
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PettyCashKind {
    /// Cash added to the float.
    TopUp,
    /// Cash spent from the float.
    Expense,
}

impl PettyCashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PettyCashKind::TopUp => "top_up",
            PettyCashKind::Expense => "expense",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PettyCashEntry {
    pub id: String,
    pub kind: PettyCashKind,
    /// Expense head ("transport", "utilities", ...).
    pub category: String,
    pub amount_cents: i64,
    pub description: Option<String>,
    pub reference: Option<String>,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PettyCashEntry {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPettyCashEntry {
    pub kind: PettyCashKind,
    pub category: String,
    pub amount_cents: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    /// Defaults to now.
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub occurred_at: Option<DateTime<Utc>>,
}

display_as_str!(
    MovementKind,
    PoStatus,
    OrderSource,
    OrderStatus,
    PaymentStatus,
    PaymentMethod,
    DiscountType,
    PettyCashKind,
);

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn po_item(ordered: i64, received: i64) -> PurchaseOrderItem {
        PurchaseOrderItem {
            id: "poi-1".to_string(),
            purchase_order_id: "po-1".to_string(),
            product_id: "p-1".to_string(),
            variant_id: String::new(),
            size: "M".to_string(),
            quantity_ordered: ordered,
            quantity_received: received,
            unit_cost_cents: 1_200,
        }
    }

    #[test]
    fn test_po_item_outstanding() {
        assert_eq!(po_item(10, 4).outstanding(), 6);
        assert!(!po_item(10, 4).is_fully_received());
        assert_eq!(po_item(10, 10).outstanding(), 0);
        assert!(po_item(10, 10).is_fully_received());
    }

    #[test]
    fn test_status_serialization_matches_display() {
        let json = serde_json::to_string(&PoStatus::PartiallyReceived).unwrap();
        assert_eq!(json, "\"partially_received\"");
        assert_eq!(PoStatus::PartiallyReceived.to_string(), "partially_received");

        let json = serde_json::to_string(&PaymentMethod::CashOnDelivery).unwrap();
        assert_eq!(json, "\"cash_on_delivery\"");
    }

    #[test]
    fn test_movement_direction() {
        assert!(MovementKind::GoodsReceived.is_inbound());
        assert!(MovementKind::OrderRestock.is_inbound());
        assert!(!MovementKind::OrderFulfilment.is_inbound());
        assert!(!MovementKind::TransferOut.is_inbound());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(PoStatus::default(), PoStatus::Pending);
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert_eq!(ProductFilter::default().limit, 50);
    }
}
