//! Reasons a symbol drops out of a rebalance cycle.

use crate::types::Symbol;

/// Why a symbol was left out of this cycle.
///
/// None of these stop a cycle: the symbol is skipped and re-evaluated on the
/// next one.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum SkipReason {
    /// Price or history missing, or unusable (non-positive).
    #[error("data unavailable")]
    DataUnavailable,

    /// Fewer observations than the minimum for the analysis window.
    #[error("insufficient history: {observed} bars, need {required}")]
    InsufficientHistory { observed: usize, required: usize },

    /// Last price under the penny-stock floor.
    #[error("price {price:.4} below floor {floor:.2}")]
    BelowPriceFloor { price: f64, floor: f64 },

    /// Order quantity truncated to zero.
    #[error("computed quantity {quantity} truncates to zero")]
    ZeroOrNegativeComputedQuantity { quantity: f64 },

    /// Not enough free cash to place any part of a buy.
    #[error("not enough cash: need {needed:.2}, have {available:.2}")]
    NotEnoughCash { needed: f64, available: f64 },
}

/// A symbol skipped this cycle, with the reason.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skip {
    pub symbol: Symbol,
    pub reason: SkipReason,
}

impl Skip {
    pub fn new(symbol: Symbol, reason: SkipReason) -> Self {
        Self { symbol, reason }
    }
}

impl std::fmt::Display for Skip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.symbol, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(format!("{}", SkipReason::DataUnavailable), "data unavailable");
        assert_eq!(
            format!(
                "{}",
                SkipReason::InsufficientHistory {
                    observed: 10,
                    required: 965
                }
            ),
            "insufficient history: 10 bars, need 965"
        );
        let skip = Skip::new(
            Symbol::new("PENNY"),
            SkipReason::BelowPriceFloor {
                price: 0.5,
                floor: 1.0,
            },
        );
        assert_eq!(format!("{skip}"), "PENNY: price 0.5000 below floor 1.00");
    }

    #[test]
    fn is_error() {
        let err: Box<dyn std::error::Error> = Box::new(SkipReason::DataUnavailable);
        assert!(err.to_string().contains("unavailable"));
    }
}
