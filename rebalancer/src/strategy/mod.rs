//! Strategies decide what the portfolio should hold.
//!
//! Weight-based strategies hand their targets to the diff engine; signal
//! strategies such as [`Crossover`] decide their orders directly. Either way
//! the result goes through the same sequencer.

mod crossover;
mod fixed;
mod momentum;

pub use crossover::Crossover;
pub use fixed::FixedWeight;
pub use momentum::MomentumTopN;

use weightbook::{DiffParams, RebalancePlan, Skip, Symbol, TargetAllocation};
use weightbook_broker::Broker;

use crate::config::StrategyConfig;
use crate::error::Result;
use crate::target::TargetSpec;

/// What a strategy wants this cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    /// Target weights; the diff engine turns them into orders.
    Weights {
        targets: Vec<TargetAllocation>,
        skipped: Vec<Skip>,
    },
    /// Orders decided by the strategy itself.
    Orders(RebalancePlan),
}

pub trait Strategy {
    fn name(&self) -> &str;

    /// Quote asset prices and orders are expressed in, if not the broker's.
    fn quote(&self) -> Option<Symbol> {
        None
    }

    /// Deadband as a fraction of portfolio value.
    fn rebalance_threshold(&self) -> Option<f64> {
        None
    }

    fn diff_params(&self, quote_asset: Symbol) -> DiffParams {
        let params = DiffParams::new(quote_asset);
        match self.rebalance_threshold() {
            Some(t) => params.with_threshold(t),
            None => params,
        }
    }

    /// Decide this cycle's targets. Called once per rebalance.
    fn propose(&mut self, broker: &dyn Broker) -> Result<Proposal>;
}

/// Build the configured strategy.
pub fn from_config(config: &StrategyConfig) -> Result<Box<dyn Strategy>> {
    let strategy: Box<dyn Strategy> = match config {
        StrategyConfig::FixedWeight(c) => {
            let spec = match &c.target_file {
                Some(path) => TargetSpec::load(path)?,
                None => TargetSpec::from_targets(c.portfolio.clone())?,
            };
            Box::new(FixedWeight::new(&c.name, spec.targets).with_quote(c.quote))
        }
        StrategyConfig::Momentum(c) => Box::new(MomentumTopN::from_config(c)),
        StrategyConfig::Crossover(c) => Box::new(Crossover::from_config(c)),
    };
    Ok(strategy)
}
