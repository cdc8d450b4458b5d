use log::{debug, info};
use weightbook::indicators::{self, Crossover as Signal};
use weightbook::{
    OrderReason, PlannedOrder, RebalancePlan, Side, Skip, SkipReason, Symbol, truncate_quantity,
};
use weightbook_broker::{Broker, Granularity};

use super::{Proposal, Strategy};
use crate::config::{BarSize, CrossoverConfig};
use crate::error::Result;

/// Moving-average crossover on a single symbol.
///
/// Buys a fixed quantity when the last close rises more than `band` above
/// the average and nothing is held; sells the holding (up to that quantity)
/// when it falls more than `band` below.
#[derive(Debug, Clone)]
pub struct Crossover {
    name: String,
    symbol: Symbol,
    window: usize,
    band: f64,
    quantity: f64,
    granularity: Granularity,
}

impl Crossover {
    pub fn new(name: &str, symbol: Symbol, window: usize, band: f64, quantity: f64) -> Self {
        Self {
            name: name.to_string(),
            symbol,
            window,
            band,
            quantity,
            granularity: Granularity::Day,
        }
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn from_config(config: &CrossoverConfig) -> Self {
        let granularity = match config.bars {
            BarSize::Minute => Granularity::Minute,
            BarSize::Day => Granularity::Day,
        };
        Self::new(
            &config.name,
            config.symbol,
            config.window,
            config.band,
            config.quantity,
        )
        .with_granularity(granularity)
    }

    fn order(&self, side: Side, quantity: f64, price: f64) -> PlannedOrder {
        PlannedOrder {
            symbol: self.symbol,
            side,
            quantity,
            reference_price: Some(price),
            reason: match side {
                Side::Buy => OrderReason::Open,
                Side::Sell => OrderReason::Trim,
            },
        }
    }
}

/// Calendar days that cover `bars` trading days: five sessions a week plus
/// a week of slack for holidays.
fn daily_span(bars: usize) -> usize {
    bars.saturating_mul(7).div_ceil(5).saturating_add(7)
}

impl Strategy for Crossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn propose(&mut self, broker: &dyn Broker) -> Result<Proposal> {
        let mut plan = RebalancePlan::default();
        let span = match self.granularity {
            Granularity::Day => daily_span(self.window),
            Granularity::Minute => self.window,
        };
        let length = u32::try_from(span).unwrap_or(u32::MAX);
        let closes: Vec<f64> = broker
            .historical_prices(self.symbol, length, self.granularity)?
            .unwrap_or_default()
            .iter()
            .map(|b| b.close)
            .collect();

        let average = indicators::last_sma(&closes, self.window);
        let (Some(average), Some(&last)) = (average, closes.last()) else {
            plan.skipped.push(Skip::new(
                self.symbol,
                SkipReason::InsufficientHistory {
                    observed: closes.len(),
                    required: self.window,
                },
            ));
            return Ok(Proposal::Orders(plan));
        };

        let held = broker.potential_total(self.symbol)?;
        let signal = indicators::crossover(average, last, self.band);
        debug!(
            "{}: {} last {last:.2}, average {average:.2}, held {held}: {signal:?}",
            self.name, self.symbol
        );

        match signal {
            Signal::Above if held <= 0.0 => {
                info!("{}: {} crossed above its average, buying", self.name, self.symbol);
                plan.buys.push(self.order(Side::Buy, self.quantity, last));
            }
            Signal::Below if held > 0.0 => {
                let quantity = truncate_quantity(self.quantity.min(held));
                if quantity > 0.0 {
                    info!("{}: {} crossed below its average, selling", self.name, self.symbol);
                    plan.sells.push(self.order(Side::Sell, quantity, last));
                }
            }
            _ => {}
        }
        Ok(Proposal::Orders(plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, NaiveDate};
    use weightbook_broker::Bar;
    use weightbook_broker::mock::MockBroker;

    fn aapl() -> Symbol {
        Symbol::new("AAPL")
    }

    fn broker(closes: &[f64], held: f64) -> MockBroker {
        MockBroker::builder()
            .with_cash(10_000.0)
            .with_holding(aapl(), held)
            .with_daily_closes(aapl(), NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(), closes)
            .build()
    }

    fn propose(broker: &MockBroker) -> RebalancePlan {
        let mut s = Crossover::new("ma", aapl(), 5, 1.0, 5.0);
        match s.propose(broker).unwrap() {
            Proposal::Orders(plan) => plan,
            other => panic!("expected orders, got {other:?}"),
        }
    }

    #[test]
    fn buys_on_upward_cross() {
        let plan = propose(&broker(&[100.0, 100.0, 100.0, 100.0, 110.0], 0.0));
        assert_eq!(plan.buys.len(), 1);
        assert_eq!(plan.buys[0].quantity, 5.0);
        assert_eq!(plan.buys[0].reference_price, Some(110.0));
        assert!(plan.sells.is_empty());
    }

    #[test]
    fn no_second_buy_while_held() {
        let plan = propose(&broker(&[100.0, 100.0, 100.0, 100.0, 110.0], 5.0));
        assert!(plan.is_empty());
    }

    #[test]
    fn sells_on_downward_cross() {
        let plan = propose(&broker(&[100.0, 100.0, 100.0, 100.0, 90.0], 3.0));
        assert_eq!(plan.sells.len(), 1);
        assert_eq!(plan.sells[0].quantity, 3.0);
    }

    #[test]
    fn inside_band_does_nothing() {
        let plan = propose(&broker(&[100.0, 100.0, 100.0, 100.0, 100.5], 0.0));
        assert!(plan.is_empty());
        assert!(plan.skipped.is_empty());
    }

    #[test]
    fn weekday_bars_fill_the_window() {
        // Weekday closes from 2024-06-10, jumping on Tuesday 2024-06-25.
        let bars: Vec<Bar> = (0..15)
            .map(|i| NaiveDate::from_ymd_opt(2024, 6, 10).unwrap() + Duration::days(i))
            .filter(|d| d.weekday().number_from_monday() <= 5)
            .map(|d| Bar::new(d, 100.0))
            .chain([Bar::new(NaiveDate::from_ymd_opt(2024, 6, 25).unwrap(), 120.0)])
            .collect();
        let broker = MockBroker::builder()
            .with_cash(10_000.0)
            .with_history(aapl(), bars)
            .as_of(NaiveDate::from_ymd_opt(2024, 6, 25).unwrap())
            .build();

        let plan = propose(&broker);
        assert!(plan.skipped.is_empty());
        assert_eq!(plan.buys.len(), 1);
        assert_eq!(plan.buys[0].reference_price, Some(120.0));
    }

    #[test]
    fn daily_span_covers_weekends() {
        assert_eq!(daily_span(5), 14);
        assert_eq!(daily_span(20), 35);
    }

    #[test]
    fn short_history_is_skipped() {
        let plan = propose(&broker(&[100.0, 101.0], 0.0));
        assert!(plan.is_empty());
        assert_eq!(plan.skipped.len(), 1);
    }
}
