//! CURRENT→TARGET diff engine.
//!
//! Turns a portfolio snapshot and a set of target weights into a
//! [`RebalancePlan`]. Works on quantities only and never mutates anything:
//! the snapshot is taken once per cycle by the caller.
//!
//! For each target:
//!
//! - `target_qty = portfolio_value * weight / price`
//! - `delta = target_qty - potential_total` (held plus in-flight)
//! - the quantity is truncated at two decimals, zero quantities dropped
//! - with a rebalance threshold, trades on an existing holding whose value is
//!   within `threshold * portfolio_value` are suppressed
//!
//! Holdings that are no longer targeted (other than the quote asset) are sold
//! in full, regardless of the threshold. Sells already in flight count
//! against that quantity.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Skip, SkipReason};
use crate::plan::{OrderReason, PlannedOrder, RebalancePlan};
use crate::types::{Holding, Side, Symbol, TargetAllocation, truncate_quantity};

/// Account state captured at the start of a cycle.
#[derive(Clone, Debug, Default)]
pub struct PortfolioSnapshot {
    pub portfolio_value: f64,
    pub holdings: Vec<Holding>,
    potential_totals: FxHashMap<Symbol, f64>,
    prices: FxHashMap<Symbol, f64>,
}

impl PortfolioSnapshot {
    pub fn new(portfolio_value: f64, holdings: Vec<Holding>) -> Self {
        Self {
            portfolio_value,
            holdings,
            potential_totals: FxHashMap::default(),
            prices: FxHashMap::default(),
        }
    }

    /// Builder-style [`set_price`](Self::set_price).
    pub fn with_price(mut self, symbol: Symbol, price: f64) -> Self {
        self.set_price(symbol, price);
        self
    }

    /// Builder-style [`set_potential_total`](Self::set_potential_total).
    pub fn with_potential_total(mut self, symbol: Symbol, quantity: f64) -> Self {
        self.set_potential_total(symbol, quantity);
        self
    }

    /// Record the last price of a symbol.
    pub fn set_price(&mut self, symbol: Symbol, price: f64) {
        self.prices.insert(symbol, price);
    }

    /// Record held-plus-in-flight quantity for a symbol.
    pub fn set_potential_total(&mut self, symbol: Symbol, quantity: f64) {
        self.potential_totals.insert(symbol, quantity);
    }

    pub fn price(&self, symbol: Symbol) -> Option<f64> {
        self.prices.get(&symbol).copied()
    }

    /// Quantity currently held (0 if not held).
    pub fn held(&self, symbol: Symbol) -> f64 {
        self.holdings
            .iter()
            .filter(|h| h.symbol == symbol)
            .map(|h| h.quantity)
            .sum()
    }

    /// Held plus in-flight quantity. Falls back to the held quantity when no
    /// potential total was recorded.
    pub fn potential_total(&self, symbol: Symbol) -> f64 {
        self.potential_totals
            .get(&symbol)
            .copied()
            .unwrap_or_else(|| self.held(symbol))
    }
}

/// Per-strategy diff settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiffParams {
    /// Cash asset of the account; never divested.
    pub quote_asset: Symbol,
    /// Deadband as a fraction of portfolio value (`None` = trade any drift).
    pub rebalance_threshold: Option<f64>,
}

impl DiffParams {
    pub fn new(quote_asset: Symbol) -> Self {
        Self {
            quote_asset,
            rebalance_threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.rebalance_threshold = Some(threshold);
        self
    }
}

/// Compute the orders that move the snapshot to the targets.
pub fn compute_plan(
    snapshot: &PortfolioSnapshot,
    targets: &[TargetAllocation],
    params: &DiffParams,
) -> RebalancePlan {
    let mut plan = RebalancePlan::default();
    let targeted: FxHashSet<Symbol> = targets.iter().map(|t| t.symbol).collect();
    let portfolio_value = snapshot.portfolio_value;

    // 1. Divest holdings that are no longer targeted
    let mut divested = FxHashSet::default();
    for holding in &snapshot.holdings {
        if targeted.contains(&holding.symbol) || holding.symbol == params.quote_asset {
            continue;
        }
        if !divested.insert(holding.symbol) {
            continue;
        }
        // an open sell already counts against the holding
        let quantity = snapshot
            .held(holding.symbol)
            .min(snapshot.potential_total(holding.symbol));
        if quantity <= 0.0 {
            continue;
        }
        plan.divestitures.push(PlannedOrder {
            symbol: holding.symbol,
            side: Side::Sell,
            quantity,
            reference_price: snapshot.price(holding.symbol),
            reason: OrderReason::Divest,
        });
    }

    // 2. Move each target toward its weight
    for target in targets {
        let symbol = target.symbol;
        let price = match snapshot.price(symbol) {
            Some(p) if p > 0.0 && p.is_finite() => p,
            _ => {
                plan.skipped.push(Skip::new(symbol, SkipReason::DataUnavailable));
                continue;
            }
        };

        let target_qty = portfolio_value * target.weight / price;
        let current_qty = snapshot.potential_total(symbol);
        let delta = target_qty - current_qty;
        if delta == 0.0 {
            continue;
        }

        if let Some(threshold) = params.rebalance_threshold {
            if current_qty > 0.0 {
                let drift = if portfolio_value > 0.0 {
                    (delta * price).abs() / portfolio_value
                } else {
                    f64::INFINITY
                };
                if drift <= threshold {
                    plan.within_threshold.push((symbol, drift));
                    continue;
                }
            }
        }

        let quantity = truncate_quantity(delta.abs());
        if quantity <= 0.0 {
            plan.skipped.push(Skip::new(
                symbol,
                SkipReason::ZeroOrNegativeComputedQuantity {
                    quantity: delta.abs(),
                },
            ));
            continue;
        }

        let order = |side, reason| PlannedOrder {
            symbol,
            side,
            quantity,
            reference_price: Some(price),
            reason,
        };
        if delta > 0.0 {
            let reason = if current_qty > 0.0 {
                OrderReason::Increase
            } else {
                OrderReason::Open
            };
            plan.buys.push(order(Side::Buy, reason));
        } else {
            plan.sells.push(order(Side::Sell, OrderReason::Trim));
        }
    }

    plan
}
