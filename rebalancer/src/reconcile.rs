//! Compare actual holdings against target weights.

use rustc_hash::FxHashMap;
use serde::Serialize;
use weightbook::{PortfolioSnapshot, Symbol, TargetAllocation, truncate_quantity};

/// Reconciliation report comparing actual vs target.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileReport {
    pub entries: Vec<ReconcileEntry>,
    /// Fraction of the portfolio held in the quote asset.
    pub cash_weight: f64,
    pub tracking_error_pct: f64,
}

/// One symbol's reconciliation entry.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileEntry {
    pub symbol: Symbol,
    pub target_weight: f64,
    pub actual_weight: f64,
    pub diff_weight: f64,
    pub target_qty: f64,
    pub actual_qty: f64,
}

/// Compare a snapshot against targets.
///
/// Every targeted or held symbol gets an entry, the quote asset excluded.
/// Symbols without a price count as weight 0.
pub fn reconcile(
    snapshot: &PortfolioSnapshot,
    targets: &[TargetAllocation],
    quote_asset: Symbol,
) -> ReconcileReport {
    let target_map: FxHashMap<Symbol, f64> =
        targets.iter().map(|t| (t.symbol, t.weight)).collect();
    let equity = snapshot.portfolio_value;

    let mut all_symbols: Vec<Symbol> = target_map.keys().copied().collect();
    for h in &snapshot.holdings {
        if h.symbol != quote_asset && !target_map.contains_key(&h.symbol) {
            all_symbols.push(h.symbol);
        }
    }
    all_symbols.sort();
    all_symbols.dedup();

    let mut entries = Vec::with_capacity(all_symbols.len());
    let mut sum_sq_diff = 0.0_f64;

    for &sym in &all_symbols {
        let price = snapshot.price(sym).filter(|p| *p > 0.0);
        let target_weight = target_map.get(&sym).copied().unwrap_or(0.0);
        let actual_qty = snapshot.held(sym);

        let actual_weight = match price {
            Some(p) if equity > 0.0 => actual_qty * p / equity,
            _ => 0.0,
        };
        let target_qty = price.map_or(0.0, |p| truncate_quantity(equity * target_weight / p));

        let diff_weight = actual_weight - target_weight;
        sum_sq_diff += diff_weight * diff_weight;

        entries.push(ReconcileEntry {
            symbol: sym,
            target_weight,
            actual_weight,
            diff_weight,
            target_qty,
            actual_qty,
        });
    }

    let cash_weight = if equity > 0.0 {
        snapshot.held(quote_asset) / equity
    } else {
        0.0
    };
    let tracking_error_pct = (sum_sq_diff / all_symbols.len().max(1) as f64).sqrt() * 100.0;

    ReconcileReport {
        entries,
        cash_weight,
        tracking_error_pct,
    }
}

impl std::fmt::Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "RECONCILIATION:")?;
        writeln!(
            f,
            "  {:8} {:>10} {:>10} {:>10} {:>12} {:>12}",
            "Symbol", "Target%", "Actual%", "Diff%", "TargetQty", "ActualQty"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "  {:8} {:>9.2}% {:>9.2}% {:>+9.2}% {:>12.2} {:>12.2}",
                e.symbol,
                e.target_weight * 100.0,
                e.actual_weight * 100.0,
                e.diff_weight * 100.0,
                e.target_qty,
                e.actual_qty,
            )?;
        }
        writeln!(f, "\n  Cash: {:.2}%", self.cash_weight * 100.0)?;
        writeln!(f, "  Tracking error: {:.3}%", self.tracking_error_pct)?;
        Ok(())
    }
}
