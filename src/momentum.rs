//! Momentum top-N selection.
//!
//! Each symbol in the universe is scored by its trailing total return
//! (`last_close / first_close`) over the analysis window. Symbols with no
//! data, sparse history, or a price under the floor are skipped. The top
//! `number_of_symbols` survivors are held at equal weight `1/N`.
//!
//! ```
//! use weightbook::Symbol;
//! use weightbook::momentum::{MomentumParams, Ranking, evaluate};
//!
//! let params = MomentumParams::new(7, 2);
//! let mut ranking = Ranking::default();
//! ranking.record(Symbol::new("A"), evaluate(Some(&[10.0, 10.5, 11.0, 11.5, 12.0]), Some(12.0), &params));
//! ranking.record(Symbol::new("B"), evaluate(Some(&[10.0, 9.5, 9.0, 9.2, 9.0]), Some(9.0), &params));
//! ranking.record(Symbol::new("C"), evaluate(Some(&[10.0, 12.0, 13.0, 14.0, 15.0]), Some(15.0), &params));
//!
//! let top = ranking.top(params.number_of_symbols);
//! assert_eq!(top[0].symbol, Symbol::new("C"));
//! assert_eq!(top[1].symbol, Symbol::new("A"));
//! assert_eq!(top[0].weight, 0.5);
//! ```

use rustc_hash::FxHashSet;

use crate::error::{Skip, SkipReason};
use crate::types::{Symbol, TargetAllocation};

/// Default penny-stock floor.
pub const DEFAULT_MIN_PRICE: f64 = 1.0;

/// Parameters of the momentum ranking.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MomentumParams {
    /// Length of the trailing window in calendar days.
    pub analysis_period_days: u32,
    /// How many symbols to hold.
    pub number_of_symbols: usize,
    /// Symbols whose last price is under this are skipped.
    pub min_price: f64,
}

impl MomentumParams {
    pub fn new(analysis_period_days: u32, number_of_symbols: usize) -> Self {
        Self {
            analysis_period_days,
            number_of_symbols,
            min_price: DEFAULT_MIN_PRICE,
        }
    }

    /// Minimum number of observations for this window.
    pub fn min_observations(&self) -> usize {
        min_observations(self.analysis_period_days)
    }
}

/// Minimum bars required over `analysis_period_days` calendar days:
/// `ceil(4.5/7 * period)`, i.e. roughly the trading days in that span.
///
/// Computed in integers (`ceil(9p / 14)`) so whole-week periods are exact.
pub fn min_observations(analysis_period_days: u32) -> usize {
    let p = analysis_period_days as u64;
    (9 * p).div_ceil(14) as usize
}

/// Outcome of scoring one symbol: its total return, or why it was skipped.
pub type Evaluation = Result<f64, SkipReason>;

/// Score one symbol.
///
/// - `closes`: closing prices over the window, oldest first (`None` if the
///   feed returned nothing).
/// - `last_price`: current price (`None` if unavailable).
pub fn evaluate(
    closes: Option<&[f64]>,
    last_price: Option<f64>,
    params: &MomentumParams,
) -> Evaluation {
    let closes = closes.ok_or(SkipReason::DataUnavailable)?;

    let required = params.min_observations();
    if closes.len() < required || closes.is_empty() {
        return Err(SkipReason::InsufficientHistory {
            observed: closes.len(),
            required,
        });
    }

    let price = last_price.ok_or(SkipReason::DataUnavailable)?;
    if !price.is_finite() {
        return Err(SkipReason::DataUnavailable);
    }
    if price < params.min_price {
        return Err(SkipReason::BelowPriceFloor {
            price,
            floor: params.min_price,
        });
    }

    let first = closes[0];
    let last = closes[closes.len() - 1];
    if first <= 0.0 || !first.is_finite() {
        return Err(SkipReason::DataUnavailable);
    }
    let total_return = last / first;
    if !total_return.is_finite() {
        return Err(SkipReason::DataUnavailable);
    }
    Ok(total_return)
}

/// Rank by total return, best first.
///
/// The sort is stable: equal returns keep their universe order.
pub fn rank(returns: &[(Symbol, f64)]) -> Vec<(Symbol, f64)> {
    let mut ranked = returns.to_vec();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Take the first `n` ranked symbols at equal weight `1/n`.
///
/// When fewer than `n` symbols survived, the remainder of the portfolio
/// stays in cash.
pub fn select_top(ranked: &[(Symbol, f64)], n: usize) -> Vec<TargetAllocation> {
    if n == 0 {
        return Vec::new();
    }
    let weight = 1.0 / n as f64;
    ranked
        .iter()
        .take(n)
        .map(|&(symbol, _)| TargetAllocation::new(symbol, weight))
        .collect()
}

/// Drop repeated symbols, keeping the first occurrence.
pub fn dedup_universe(universe: &[Symbol]) -> Vec<Symbol> {
    let mut seen = FxHashSet::default();
    universe.iter().copied().filter(|s| seen.insert(*s)).collect()
}

/// Accumulates per-symbol evaluations for one cycle.
#[derive(Clone, Debug, Default)]
pub struct Ranking {
    returns: Vec<(Symbol, f64)>,
    skipped: Vec<Skip>,
}

impl Ranking {
    /// Record the evaluation of one symbol, in universe order.
    pub fn record(&mut self, symbol: Symbol, evaluation: Evaluation) {
        match evaluation {
            Ok(total_return) => self.returns.push((symbol, total_return)),
            Err(reason) => self.skipped.push(Skip::new(symbol, reason)),
        }
    }

    /// Symbols that survived filtering, in universe order.
    pub fn returns(&self) -> &[(Symbol, f64)] {
        &self.returns
    }

    /// Symbols that were skipped, with reasons.
    pub fn skipped(&self) -> &[Skip] {
        &self.skipped
    }

    /// Survivors ranked best first.
    pub fn ranked(&self) -> Vec<(Symbol, f64)> {
        rank(&self.returns)
    }

    /// Equal-weight allocation over the top `n`.
    pub fn top(&self, n: usize) -> Vec<TargetAllocation> {
        select_top(&self.ranked(), n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::new(s)
    }

    fn flat(n: usize, price: f64) -> Vec<f64> {
        vec![price; n]
    }

    #[test]
    fn min_observations_matches_trading_day_ratio() {
        assert_eq!(min_observations(7), 5); // 4.5 -> 5
        assert_eq!(min_observations(14), 9);
        assert_eq!(min_observations(1500), 965); // 964.28...
        assert_eq!(min_observations(0), 0);
    }

    #[test]
    fn missing_data_is_skipped() {
        let params = MomentumParams::new(7, 1);
        assert_eq!(evaluate(None, Some(10.0), &params), Err(SkipReason::DataUnavailable));
        let closes = flat(5, 10.0);
        assert_eq!(
            evaluate(Some(&closes), None, &params),
            Err(SkipReason::DataUnavailable)
        );
    }

    #[test]
    fn sparse_history_is_skipped() {
        let params = MomentumParams::new(14, 1);
        let closes = flat(8, 10.0);
        assert_eq!(
            evaluate(Some(&closes), Some(10.0), &params),
            Err(SkipReason::InsufficientHistory {
                observed: 8,
                required: 9
            })
        );
        let closes = flat(9, 10.0);
        assert_eq!(evaluate(Some(&closes), Some(10.0), &params), Ok(1.0));
    }

    #[test]
    fn empty_history_is_insufficient_even_for_zero_period() {
        let params = MomentumParams::new(0, 1);
        assert!(matches!(
            evaluate(Some(&[]), Some(10.0), &params),
            Err(SkipReason::InsufficientHistory { observed: 0, .. })
        ));
    }

    #[test]
    fn penny_stock_is_skipped() {
        let params = MomentumParams::new(7, 1);
        let closes = flat(5, 0.8);
        assert_eq!(
            evaluate(Some(&closes), Some(0.99), &params),
            Err(SkipReason::BelowPriceFloor {
                price: 0.99,
                floor: 1.0
            })
        );
        // Exactly at the floor passes.
        let closes = flat(5, 1.0);
        assert!(evaluate(Some(&closes), Some(1.0), &params).is_ok());
    }

    #[test]
    fn non_positive_first_close_is_unusable() {
        let params = MomentumParams::new(7, 1);
        let closes = [0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(
            evaluate(Some(&closes), Some(4.0), &params),
            Err(SkipReason::DataUnavailable)
        );
    }

    #[test]
    fn total_return_uses_first_and_last_close() {
        let params = MomentumParams::new(7, 1);
        let closes = [100.0, 90.0, 130.0, 110.0, 120.0];
        let r = evaluate(Some(&closes), Some(121.0), &params).unwrap();
        assert!((r - 1.2).abs() < 1e-12);
    }

    #[test]
    fn top_two_of_three() {
        let returns = [(sym("A"), 1.2), (sym("B"), 0.9), (sym("C"), 1.5)];
        let top = select_top(&rank(&returns), 2);
        let symbols: Vec<_> = top.iter().map(|t| t.symbol).collect();
        assert_eq!(symbols, vec![sym("C"), sym("A")]);
        assert!(top.iter().all(|t| t.weight == 0.5));
    }

    #[test]
    fn fewer_survivors_than_slots_leaves_cash() {
        let returns = [(sym("A"), 1.1)];
        let top = select_top(&returns, 4);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].weight, 0.25);
    }

    #[test]
    fn ties_keep_universe_order() {
        let returns = [(sym("X"), 1.1), (sym("Y"), 1.3), (sym("Z"), 1.1)];
        let ranked = rank(&returns);
        assert_eq!(ranked[1].0, sym("X"));
        assert_eq!(ranked[2].0, sym("Z"));
    }

    #[test]
    fn zero_slots_selects_nothing() {
        let returns = [(sym("A"), 1.2)];
        assert!(select_top(&returns, 0).is_empty());
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let universe = [sym("EWI"), sym("SPY"), sym("EWI"), sym("GREK"), sym("EWI")];
        assert_eq!(dedup_universe(&universe), vec![sym("EWI"), sym("SPY"), sym("GREK")]);
    }

    #[test]
    fn ranking_collects_skips() {
        let params = MomentumParams::new(7, 2);
        let mut ranking = Ranking::default();
        ranking.record(sym("A"), evaluate(Some(&flat(5, 10.0)), Some(10.0), &params));
        ranking.record(sym("B"), evaluate(None, Some(10.0), &params));
        assert_eq!(ranking.returns().len(), 1);
        assert_eq!(ranking.skipped().len(), 1);
        assert_eq!(ranking.skipped()[0].symbol, sym("B"));
        assert_eq!(ranking.top(2).len(), 1);
    }
}
