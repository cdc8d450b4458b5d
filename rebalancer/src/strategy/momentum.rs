use log::{info, warn};
use weightbook::momentum::{self, MomentumParams, Ranking};
use weightbook::{Symbol, TargetAllocation};
use weightbook_broker::{Broker, Granularity};

use super::{Proposal, Strategy};
use crate::config::MomentumConfig;
use crate::error::Result;

/// Holds the `number_of_symbols` best performers of a universe by trailing
/// total return, at equal weight ("top ETF picker").
#[derive(Debug, Clone)]
pub struct MomentumTopN {
    name: String,
    universe: Vec<Symbol>,
    params: MomentumParams,
    rebalance_threshold: Option<f64>,
}

impl MomentumTopN {
    /// Duplicate symbols in `universe` are evaluated once.
    pub fn new(name: &str, universe: &[Symbol], params: MomentumParams) -> Self {
        Self {
            name: name.to_string(),
            universe: momentum::dedup_universe(universe),
            params,
            rebalance_threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.rebalance_threshold = threshold;
        self
    }

    pub fn from_config(config: &MomentumConfig) -> Self {
        let params = MomentumParams {
            min_price: config.min_price,
            ..MomentumParams::new(config.analysis_period, config.number_of_symbols)
        };
        Self::new(&config.name, &config.symbols, params).with_threshold(config.rebalance_threshold)
    }

    pub fn universe(&self) -> &[Symbol] {
        &self.universe
    }

    /// Evaluate every symbol of the universe. Broker errors count as missing
    /// data for that symbol.
    pub fn rank(&self, broker: &dyn Broker) -> Ranking {
        let mut ranking = Ranking::default();
        for &symbol in &self.universe {
            let closes = match broker.historical_prices(
                symbol,
                self.params.analysis_period_days,
                Granularity::Day,
            ) {
                Ok(bars) => bars.map(|bars| bars.iter().map(|b| b.close).collect::<Vec<_>>()),
                Err(e) => {
                    warn!("{symbol}: history request failed: {e}");
                    None
                }
            };
            let last_price = match closes {
                Some(_) => broker.last_price(symbol, None).unwrap_or_else(|e| {
                    warn!("{symbol}: price request failed: {e}");
                    None
                }),
                None => None,
            };
            ranking.record(
                symbol,
                momentum::evaluate(closes.as_deref(), last_price, &self.params),
            );
        }
        ranking
    }
}

impl Strategy for MomentumTopN {
    fn name(&self) -> &str {
        &self.name
    }

    fn rebalance_threshold(&self) -> Option<f64> {
        self.rebalance_threshold
    }

    fn propose(&mut self, broker: &dyn Broker) -> Result<Proposal> {
        let ranking = self.rank(broker);
        let targets: Vec<TargetAllocation> = ranking.top(self.params.number_of_symbols);

        let picks: Vec<&str> = targets.iter().map(|t| t.symbol.as_str()).collect();
        info!(
            "{}: top {} of {} evaluated: [{}]",
            self.name,
            self.params.number_of_symbols,
            ranking.returns().len(),
            picks.join(", ")
        );

        Ok(Proposal::Weights {
            targets,
            skipped: ranking.skipped().to_vec(),
        })
    }
}
