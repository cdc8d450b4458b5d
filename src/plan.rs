//! Rebalance plan: the orders one cycle wants to place, grouped by phase.

use std::fmt;

use crate::error::Skip;
use crate::types::{Side, Symbol};

/// Why an order is in the plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum OrderReason {
    /// Held but no longer targeted: sell everything.
    Divest,
    /// Targeted, currently above target.
    Trim,
    /// Targeted, nothing held yet.
    Open,
    /// Targeted, currently below target.
    Increase,
}

impl fmt::Display for OrderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderReason::Divest => "divest",
            OrderReason::Trim => "trim",
            OrderReason::Open => "open",
            OrderReason::Increase => "increase",
        };
        f.pad(s)
    }
}

/// A single planned order.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannedOrder {
    pub symbol: Symbol,
    pub side: Side,
    /// Always > 0.
    pub quantity: f64,
    /// Price the quantity was computed at. Divestitures may have none.
    pub reference_price: Option<f64>,
    pub reason: OrderReason,
}

impl PlannedOrder {
    /// `quantity * reference_price`, if the price is known.
    pub fn notional(&self) -> Option<f64> {
        self.reference_price.map(|p| self.quantity * p)
    }
}

/// Submission phase. Phases run in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Divest,
    Sell,
    Buy,
}

impl Phase {
    /// All phases in submission order.
    pub const ORDER: [Phase; 3] = [Phase::Divest, Phase::Sell, Phase::Buy];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Divest => "divest",
            Phase::Sell => "sell",
            Phase::Buy => "buy",
        };
        f.pad(s)
    }
}

/// Everything one cycle decided, created fresh each cycle.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RebalancePlan {
    /// Full-quantity sells of holdings that are no longer targeted.
    pub divestitures: Vec<PlannedOrder>,
    /// Trims of targeted symbols.
    pub sells: Vec<PlannedOrder>,
    pub buys: Vec<PlannedOrder>,
    /// Symbols dropped this cycle.
    pub skipped: Vec<Skip>,
    /// Targeted symbols whose drift stayed inside the deadband: (symbol, drift
    /// as a fraction of portfolio value).
    pub within_threshold: Vec<(Symbol, f64)>,
}

impl RebalancePlan {
    /// Orders of one phase.
    pub fn phase(&self, phase: Phase) -> &[PlannedOrder] {
        match phase {
            Phase::Divest => &self.divestitures,
            Phase::Sell => &self.sells,
            Phase::Buy => &self.buys,
        }
    }

    /// All orders in submission order: divestitures, sells, buys.
    pub fn orders(&self) -> impl Iterator<Item = &PlannedOrder> {
        self.divestitures
            .iter()
            .chain(self.sells.iter())
            .chain(self.buys.iter())
    }

    /// Number of orders (skips not counted).
    pub fn len(&self) -> usize {
        self.divestitures.len() + self.sells.len() + self.buys.len()
    }

    /// True if there is nothing to submit.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the order for a symbol, if any.
    pub fn order_for(&self, symbol: Symbol) -> Option<&PlannedOrder> {
        self.orders().find(|o| o.symbol == symbol)
    }
}
