//! Trading fee estimate for a rebalance plan.

use std::fmt;

use crate::plan::RebalancePlan;

/// Percentage fee on traded notional, with a per-order minimum.
///
/// ```
/// use weightbook::cost::FeeModel;
///
/// let model = FeeModel { percent_fee: 0.001, min_fee: 0.0 };
/// assert_eq!(model.fee(10_000.0), 10.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeeModel {
    /// Fraction of notional (0.001 = 0.1%).
    pub percent_fee: f64,
    /// Minimum fee per order, in quote currency.
    pub min_fee: f64,
}

impl FeeModel {
    pub fn zero() -> Self {
        Self {
            percent_fee: 0.0,
            min_fee: 0.0,
        }
    }

    /// Fee for one order of the given notional.
    pub fn fee(&self, notional: f64) -> f64 {
        (notional.abs() * self.percent_fee).max(self.min_fee)
    }

    /// Estimate fees over every order of a plan.
    ///
    /// Orders without a reference price contribute the minimum fee only.
    pub fn estimate(&self, plan: &RebalancePlan) -> CostEstimate {
        let mut traded = 0.0;
        let mut fees = 0.0;
        for order in plan.orders() {
            let notional = order.notional().unwrap_or(0.0);
            traded += notional;
            fees += self.fee(notional);
        }
        CostEstimate { traded, fees }
    }
}

impl Default for FeeModel {
    fn default() -> Self {
        Self::zero()
    }
}

/// Estimated costs of a plan.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CostEstimate {
    /// Total notional traded (quote currency).
    pub traded: f64,
    pub fees: f64,
}

impl fmt::Display for CostEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2} fees on ${:.2} traded", self.fees, self.traded)
    }
}
