//! # Purchasing Rules
//!
//! Purchase order lifecycle and goods-received reconciliation.
//!
//! ## Purchase Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   pending ──approve──► approved ──GRN──► partially_received ──GRN──┐   │
//! │      │                    │  │                 ▲      │            │   │
//! │      │                    │  │                 └─GRN──┘            │   │
//! │      │                    │  └───────────GRN (all lines)──────────►│   │
//! │      ▼                    ▼                                        ▼   │
//! │  cancelled ◄──cancel──────┘                                  completed  │
//! │                                                                         │
//! │  completed and cancelled are terminal.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## GRN Reconciliation
//! A goods-received note may only receive what is still outstanding on
//! each PO line. [`reconcile_receipt`] checks this against the PO as
//! loaded inside the receiving transaction; the database repeats the
//! check in its guarded update so two concurrent GRNs cannot both win.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::inventory::StockKey;
use crate::money::Money;
use crate::types::{NewGrnLine, NewPurchaseOrder, PoStatus, PurchaseOrder, PurchaseOrderItem};
use crate::validation::{validate_amount_cents, validate_quantity};
use crate::MAX_DOCUMENT_LINES;

// =============================================================================
// State Machine
// =============================================================================

/// Whether a purchase order may move from `from` to `to`.
pub fn can_transition(from: PoStatus, to: PoStatus) -> bool {
    use PoStatus::*;
    matches!(
        (from, to),
        (Pending, Approved)
            | (Pending, Cancelled)
            | (Approved, Cancelled)
            | (Approved, PartiallyReceived)
            | (Approved, Completed)
            | (PartiallyReceived, PartiallyReceived)
            | (PartiallyReceived, Completed)
    )
}

/// Checks a purchase order transition.
pub fn check_transition(from: PoStatus, to: PoStatus) -> CoreResult<()> {
    if !can_transition(from, to) {
        return Err(CoreError::transition("Purchase order", from, to));
    }
    Ok(())
}

/// Whether goods can be received against a PO in this status.
#[inline]
pub fn accepts_receipts(status: PoStatus) -> bool {
    matches!(status, PoStatus::Approved | PoStatus::PartiallyReceived)
}

// =============================================================================
// Purchase Order Creation
// =============================================================================

/// Validates a new purchase order and returns its total cost.
///
/// ## Rules
/// - Supplier and location given
/// - 1 to [`MAX_DOCUMENT_LINES`] items
/// - Each item: product given, quantity > 0, unit cost ≥ 0
/// - No (product, variant, size) twice
pub fn validate_purchase_order(po: &NewPurchaseOrder) -> CoreResult<Money> {
    if po.supplier_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "supplier_id".to_string(),
        }
        .into());
    }
    if po.location_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "location_id".to_string(),
        }
        .into());
    }
    if po.items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        }
        .into());
    }
    if po.items.len() > MAX_DOCUMENT_LINES {
        return Err(ValidationError::TooManyLines {
            field: "items".to_string(),
            max: MAX_DOCUMENT_LINES,
        }
        .into());
    }

    let mut seen = HashSet::new();
    let mut total = Money::zero();
    for item in &po.items {
        let key = StockKey::new(po.location_id.clone(), item.product_id.clone())
            .with_variant(item.variant_id.clone())
            .with_size(item.size.clone());
        key.validate()?;
        validate_quantity(item.quantity)?;
        validate_amount_cents("unit_cost_cents", item.unit_cost_cents)?;

        if !seen.insert(key.clone()) {
            return Err(ValidationError::DuplicateLine {
                field: "items".to_string(),
                value: key.to_string(),
            }
            .into());
        }

        total += Money::from_cents(item.unit_cost_cents).multiply_quantity(item.quantity);
    }

    Ok(total)
}

// =============================================================================
// Goods Receipt
// =============================================================================

/// A GRN line matched to its PO item.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine {
    pub po_item: PurchaseOrderItem,
    pub quantity: i64,
}

impl ReceiptLine {
    /// Stock key the goods land on.
    pub fn stock_key(&self, location_id: &str) -> StockKey {
        StockKey::new(location_id, self.po_item.product_id.clone())
            .with_variant(self.po_item.variant_id.clone())
            .with_size(self.po_item.size.clone())
    }

    /// Cost of the received quantity at the PO unit cost.
    pub fn cost(&self) -> Money {
        self.po_item.unit_cost().multiply_quantity(self.quantity)
    }
}

/// Matches GRN lines to PO items and checks quantities.
///
/// ## Rules
/// - PO must be `approved` or `partially_received`
/// - At least one line; each line's item must belong to the PO
/// - Each PO item at most once per GRN
/// - `0 < quantity ≤ outstanding`
pub fn reconcile_receipt(po: &PurchaseOrder, lines: &[NewGrnLine]) -> CoreResult<Vec<ReceiptLine>> {
    if !accepts_receipts(po.status) {
        return Err(CoreError::transition(
            "Purchase order",
            po.status,
            PoStatus::PartiallyReceived,
        ));
    }

    if lines.is_empty() {
        return Err(ValidationError::Empty {
            field: "lines".to_string(),
        }
        .into());
    }

    let items: HashMap<&str, &PurchaseOrderItem> =
        po.items.iter().map(|i| (i.id.as_str(), i)).collect();

    let mut seen = HashSet::new();
    let mut matched = Vec::with_capacity(lines.len());
    for line in lines {
        let item = items.get(line.po_item_id.as_str()).ok_or_else(|| {
            CoreError::UnknownPurchaseOrderItem {
                purchase_order_id: po.id.clone(),
                po_item_id: line.po_item_id.clone(),
            }
        })?;

        if !seen.insert(line.po_item_id.as_str()) {
            return Err(ValidationError::DuplicateLine {
                field: "lines".to_string(),
                value: line.po_item_id.clone(),
            }
            .into());
        }

        validate_quantity(line.quantity_received)?;

        let outstanding = item.outstanding();
        if line.quantity_received > outstanding {
            return Err(CoreError::OverReceipt {
                po_item_id: item.id.clone(),
                outstanding,
                requested: line.quantity_received,
            });
        }

        matched.push(ReceiptLine {
            po_item: (*item).clone(),
            quantity: line.quantity_received,
        });
    }

    Ok(matched)
}

/// Status of the PO once `receipts` have been applied to `items`.
pub fn status_after_receipt(items: &[PurchaseOrderItem], receipts: &[ReceiptLine]) -> PoStatus {
    let received: HashMap<&str, i64> = receipts
        .iter()
        .map(|r| (r.po_item.id.as_str(), r.quantity))
        .collect();

    let complete = items.iter().all(|item| {
        let extra = received.get(item.id.as_str()).copied().unwrap_or(0);
        item.quantity_received + extra >= item.quantity_ordered
    });

    if complete {
        PoStatus::Completed
    } else {
        PoStatus::PartiallyReceived
    }
}

/// Weighted moving-average unit cost after a receipt.
///
/// ```text
/// new_cost = round((on_hand × old_cost + qty × unit_cost) / (on_hand + qty))
/// ```
///
/// Stock on hand that is zero or negative carries no cost weight, so the
/// receipt cost becomes the new cost.
///
/// ## Example
/// ```rust
/// use shelfwise_core::money::Money;
/// use shelfwise_core::purchasing::weighted_average_cost;
///
/// // 10 on hand at 10.00, receive 30 at 14.00 → 13.00
/// let cost = weighted_average_cost(10, Money::from_cents(1000), 30, Money::from_cents(1400));
/// assert_eq!(cost.cents(), 1300);
/// ```
pub fn weighted_average_cost(
    on_hand: i64,
    current_cost: Money,
    received_qty: i64,
    unit_cost: Money,
) -> Money {
    if on_hand <= 0 || received_qty <= 0 {
        return if received_qty > 0 { unit_cost } else { current_cost };
    }

    let value = current_cost.cents() as i128 * on_hand as i128
        + unit_cost.cents() as i128 * received_qty as i128;
    let units = (on_hand + received_qty) as i128;
    Money::from_cents(((value + units / 2) / units) as i64)
}

/// Human-readable document number: `PREFIX-YYYYMMDD-XXXXXX`.
///
/// The suffix is the first six hex characters of the document UUID, so
/// numbers stay unique without a shared counter.
pub fn document_number(prefix: &str, at: DateTime<Utc>, id: &uuid::Uuid) -> String {
    let suffix: String = id.simple().to_string().chars().take(6).collect();
    format!("{}-{}-{}", prefix, at.format("%Y%m%d"), suffix.to_uppercase())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NewPurchaseOrderItem;
    use chrono::TimeZone;

    fn item(id: &str, ordered: i64, received: i64) -> PurchaseOrderItem {
        PurchaseOrderItem {
            id: id.to_string(),
            purchase_order_id: "po-1".to_string(),
            product_id: format!("product-{id}"),
            variant_id: String::new(),
            size: String::new(),
            quantity_ordered: ordered,
            quantity_received: received,
            unit_cost_cents: 500,
        }
    }

    fn po(status: PoStatus, items: Vec<PurchaseOrderItem>) -> PurchaseOrder {
        let now = Utc::now();
        PurchaseOrder {
            id: "po-1".to_string(),
            po_number: "PO-1".to_string(),
            supplier_id: "sup-1".to_string(),
            location_id: "main".to_string(),
            status,
            notes: None,
            total_cost_cents: 0,
            expected_at: None,
            created_at: now,
            updated_at: now,
            items,
        }
    }

    fn grn_line(id: &str, qty: i64) -> NewGrnLine {
        NewGrnLine {
            po_item_id: id.to_string(),
            quantity_received: qty,
        }
    }

    #[test]
    fn test_transitions() {
        assert!(can_transition(PoStatus::Pending, PoStatus::Approved));
        assert!(can_transition(PoStatus::Approved, PoStatus::Cancelled));
        assert!(can_transition(PoStatus::PartiallyReceived, PoStatus::Completed));

        assert!(!can_transition(PoStatus::Pending, PoStatus::Completed));
        assert!(!can_transition(PoStatus::PartiallyReceived, PoStatus::Cancelled));
        assert!(!can_transition(PoStatus::Completed, PoStatus::Approved));
        assert!(!can_transition(PoStatus::Cancelled, PoStatus::Pending));
        assert!(check_transition(PoStatus::Completed, PoStatus::Cancelled).is_err());
    }

    #[test]
    fn test_validate_purchase_order_totals() {
        let new_po = NewPurchaseOrder {
            supplier_id: "sup-1".to_string(),
            location_id: "main".to_string(),
            notes: None,
            expected_at: None,
            items: vec![
                NewPurchaseOrderItem {
                    product_id: "tee".to_string(),
                    variant_id: String::new(),
                    size: "M".to_string(),
                    quantity: 10,
                    unit_cost_cents: 450,
                },
                NewPurchaseOrderItem {
                    product_id: "tee".to_string(),
                    variant_id: String::new(),
                    size: "L".to_string(),
                    quantity: 4,
                    unit_cost_cents: 500,
                },
            ],
        };
        assert_eq!(validate_purchase_order(&new_po).unwrap().cents(), 6_500);

        let mut dup = new_po.clone();
        dup.items[1].size = "M".to_string();
        assert!(validate_purchase_order(&dup).is_err());

        let mut huge = new_po.clone();
        huge.items[0].unit_cost_cents = 10_000_000_000_000;
        huge.items[0].quantity = 1_000_000;
        assert!(matches!(
            validate_purchase_order(&huge),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let mut ceiling = new_po.clone();
        ceiling.items[0].unit_cost_cents = crate::MAX_AMOUNT_CENTS;
        ceiling.items[0].quantity = crate::MAX_LINE_QUANTITY;
        let total = validate_purchase_order(&ceiling).unwrap();
        assert_eq!(total.cents(), crate::MAX_AMOUNT_CENTS * crate::MAX_LINE_QUANTITY + 2_000);

        let mut empty = new_po;
        empty.items.clear();
        assert!(validate_purchase_order(&empty).is_err());
    }

    #[test]
    fn test_reconcile_receipt_partial_then_complete() {
        let order = po(PoStatus::Approved, vec![item("a", 10, 0), item("b", 5, 0)]);

        let lines = reconcile_receipt(&order, &[grn_line("a", 10)]).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].cost().cents(), 5_000);
        assert_eq!(
            status_after_receipt(&order.items, &lines),
            PoStatus::PartiallyReceived
        );

        let lines = reconcile_receipt(&order, &[grn_line("a", 10), grn_line("b", 5)]).unwrap();
        assert_eq!(status_after_receipt(&order.items, &lines), PoStatus::Completed);
    }

    #[test]
    fn test_reconcile_receipt_rejects_over_receipt() {
        let order = po(PoStatus::PartiallyReceived, vec![item("a", 10, 7)]);
        match reconcile_receipt(&order, &[grn_line("a", 4)]) {
            Err(CoreError::OverReceipt {
                outstanding,
                requested,
                ..
            }) => {
                assert_eq!(outstanding, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("expected OverReceipt, got {other:?}"),
        }
    }

    #[test]
    fn test_reconcile_receipt_rejects_bad_documents() {
        let order = po(PoStatus::Pending, vec![item("a", 10, 0)]);
        assert!(matches!(
            reconcile_receipt(&order, &[grn_line("a", 1)]),
            Err(CoreError::InvalidStatusTransition { .. })
        ));

        let order = po(PoStatus::Approved, vec![item("a", 10, 0)]);
        assert!(matches!(
            reconcile_receipt(&order, &[grn_line("zzz", 1)]),
            Err(CoreError::UnknownPurchaseOrderItem { .. })
        ));
        assert!(reconcile_receipt(&order, &[grn_line("a", 1), grn_line("a", 1)]).is_err());
        assert!(reconcile_receipt(&order, &[grn_line("a", 0)]).is_err());
        assert!(reconcile_receipt(&order, &[]).is_err());
    }

    #[test]
    fn test_weighted_average_cost() {
        let cost = weighted_average_cost(10, Money::from_cents(1000), 30, Money::from_cents(1400));
        assert_eq!(cost.cents(), 1300);

        // Rounds to nearest cent: (3×100 + 1×101) / 4 = 100.25 → 100
        let cost = weighted_average_cost(3, Money::from_cents(100), 1, Money::from_cents(101));
        assert_eq!(cost.cents(), 100);

        // Empty shelf: receipt cost wins
        let cost = weighted_average_cost(0, Money::from_cents(999), 5, Money::from_cents(700));
        assert_eq!(cost.cents(), 700);
        let cost = weighted_average_cost(-2, Money::from_cents(999), 5, Money::from_cents(700));
        assert_eq!(cost.cents(), 700);
    }

    #[test]
    fn test_document_number() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let id = uuid::Uuid::parse_str("abcdef12-3456-4789-8abc-def012345678").unwrap();
        assert_eq!(document_number("GRN", at, &id), "GRN-20260309-ABCDEF");
    }
}
