//! # Inventory Rules
//!
//! Stock identity and the arithmetic of the stock ledger.
//!
//! ## Stock Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A stock level is keyed by four parts:                                  │
//! │                                                                         │
//! │    location_id ── where it sits (store, warehouse)                      │
//! │    product_id  ── the SKU                                               │
//! │    variant_id  ── colour / style   ("" = no variant)                    │
//! │    size        ── S, M, 32x34      ("" = one size)                      │
//! │                                                                         │
//! │  Every quantity change is a signed delta against exactly one key and   │
//! │  is written to the ledger with the balance it produced.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The database layer enforces non-negative stock with guarded updates;
//! the functions here let callers reject bad input before opening a
//! transaction and compute the error a failed guard should surface.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{AdjustmentLine, TransferRequest};
use crate::validation::validate_quantity;
use crate::{MAX_ADJUSTMENT_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Stock Key
// =============================================================================

/// Identity of one stock level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockKey {
    pub location_id: String,
    pub product_id: String,
    #[serde(default)]
    pub variant_id: String,
    #[serde(default)]
    pub size: String,
}

impl StockKey {
    /// Key for a product without variant or size.
    pub fn new(location_id: impl Into<String>, product_id: impl Into<String>) -> Self {
        StockKey {
            location_id: location_id.into(),
            product_id: product_id.into(),
            variant_id: String::new(),
            size: String::new(),
        }
    }

    pub fn with_variant(mut self, variant_id: impl Into<String>) -> Self {
        self.variant_id = variant_id.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into().trim().to_string();
        self
    }

    /// Same product/variant/size at another location.
    pub fn at(&self, location_id: impl Into<String>) -> Self {
        StockKey {
            location_id: location_id.into(),
            ..self.clone()
        }
    }

    /// Checks that the key names a location and a product.
    pub fn validate(&self) -> CoreResult<()> {
        if self.location_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "location_id".to_string(),
            }
            .into());
        }
        if self.product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The error to report when a decrement of `requested` hits `available`.
    pub fn insufficient(&self, available: i64, requested: i64) -> CoreError {
        CoreError::InsufficientStock {
            location_id: self.location_id.clone(),
            product_id: self.product_id.clone(),
            available,
            requested,
        }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.location_id, self.product_id)?;
        if !self.variant_id.is_empty() {
            write!(f, "/{}", self.variant_id)?;
        }
        if !self.size.is_empty() {
            write!(f, "/{}", self.size)?;
        }
        Ok(())
    }
}

// =============================================================================
// Document Checks
// =============================================================================

/// Validates a multi-line adjustment before any write.
///
/// ## Rules
/// - At least one line, at most [`MAX_ADJUSTMENT_LINES`]
/// - Each line names a product and has a non-zero delta within
///   [`MAX_LINE_QUANTITY`]
/// - No stock key appears twice (two lines for the same key would make
///   the ledger order-dependent)
pub fn validate_adjustment(location_id: &str, lines: &[AdjustmentLine]) -> CoreResult<()> {
    if location_id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "location_id".to_string(),
        }
        .into());
    }

    if lines.is_empty() {
        return Err(ValidationError::Empty {
            field: "lines".to_string(),
        }
        .into());
    }

    if lines.len() > MAX_ADJUSTMENT_LINES {
        return Err(ValidationError::TooManyLines {
            field: "lines".to_string(),
            max: MAX_ADJUSTMENT_LINES,
        }
        .into());
    }

    let mut seen = HashSet::with_capacity(lines.len());
    for line in lines {
        let key = line_key(location_id, line);
        key.validate()?;

        if line.delta == 0 || !(-MAX_LINE_QUANTITY..=MAX_LINE_QUANTITY).contains(&line.delta) {
            return Err(ValidationError::OutOfRange {
                field: "delta".to_string(),
                min: -MAX_LINE_QUANTITY,
                max: MAX_LINE_QUANTITY,
            }
            .into());
        }

        if !seen.insert(key.clone()) {
            return Err(ValidationError::DuplicateLine {
                field: "lines".to_string(),
                value: key.to_string(),
            }
            .into());
        }
    }

    Ok(())
}

/// The stock key an adjustment line refers to.
pub fn line_key(location_id: &str, line: &AdjustmentLine) -> StockKey {
    StockKey::new(location_id, line.product_id.clone())
        .with_variant(line.variant_id.clone())
        .with_size(line.size.clone())
}

/// Validates a transfer request and returns the (source, destination) keys.
///
/// ## Example
/// ```rust
/// use shelfwise_core::inventory::validate_transfer;
/// use shelfwise_core::TransferRequest;
///
/// let req = TransferRequest {
///     from_location_id: "warehouse".into(),
///     to_location_id: "warehouse".into(),
///     product_id: "tee".into(),
///     variant_id: String::new(),
///     size: "M".into(),
///     quantity: 2,
///     note: None,
/// };
/// assert!(validate_transfer(&req).is_err());
/// ```
pub fn validate_transfer(req: &TransferRequest) -> CoreResult<(StockKey, StockKey)> {
    validate_quantity(req.quantity)?;

    let from = StockKey::new(req.from_location_id.clone(), req.product_id.clone())
        .with_variant(req.variant_id.clone())
        .with_size(req.size.clone());
    from.validate()?;

    let to = from.at(req.to_location_id.clone());
    to.validate()?;

    if from.location_id == to.location_id {
        return Err(CoreError::SameLocationTransfer(from.location_id));
    }

    Ok((from, to))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product: &str, size: &str, delta: i64) -> AdjustmentLine {
        AdjustmentLine {
            product_id: product.to_string(),
            variant_id: String::new(),
            size: size.to_string(),
            delta,
        }
    }

    #[test]
    fn test_key_display() {
        let key = StockKey::new("main", "tee");
        assert_eq!(key.to_string(), "main/tee");

        let key = key.with_variant("red").with_size(" L ");
        assert_eq!(key.to_string(), "main/tee/red/L");
    }

    #[test]
    fn test_validate_adjustment_accepts_distinct_keys() {
        let lines = vec![line("tee", "M", 4), line("tee", "L", -2)];
        assert!(validate_adjustment("main", &lines).is_ok());
    }

    #[test]
    fn test_validate_adjustment_rejects_duplicates() {
        let lines = vec![line("tee", "M", 4), line("tee", "M", -1)];
        let err = validate_adjustment("main", &lines).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::DuplicateLine { .. })
        ));
    }

    #[test]
    fn test_validate_adjustment_rejects_bad_lines() {
        assert!(validate_adjustment("main", &[]).is_err());
        assert!(validate_adjustment("", &[line("tee", "M", 1)]).is_err());
        assert!(validate_adjustment("main", &[line("tee", "M", 0)]).is_err());
        assert!(validate_adjustment("main", &[line("", "M", 1)]).is_err());
        assert!(validate_adjustment("main", &[line("tee", "M", i64::MIN)]).is_err());
        assert!(validate_adjustment("main", &[line("tee", "M", MAX_LINE_QUANTITY + 1)]).is_err());

        let too_many: Vec<_> = (0..=MAX_ADJUSTMENT_LINES)
            .map(|i| line("tee", &i.to_string(), 1))
            .collect();
        assert!(validate_adjustment("main", &too_many).is_err());
    }

    #[test]
    fn test_validate_transfer() {
        let mut req = TransferRequest {
            from_location_id: "warehouse".to_string(),
            to_location_id: "store".to_string(),
            product_id: "tee".to_string(),
            variant_id: "red".to_string(),
            size: "M".to_string(),
            quantity: 3,
            note: None,
        };

        let (from, to) = validate_transfer(&req).unwrap();
        assert_eq!(from.location_id, "warehouse");
        assert_eq!(to.location_id, "store");
        assert_eq!(to.size, "M");

        req.quantity = 0;
        assert!(validate_transfer(&req).is_err());

        req.quantity = 1;
        req.to_location_id = "warehouse".to_string();
        assert!(matches!(
            validate_transfer(&req),
            Err(CoreError::SameLocationTransfer(_))
        ));
    }
}
