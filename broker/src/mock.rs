//! In-memory broker: an account with cash, holdings and price history that
//! fills orders according to a configurable [`FillMode`].
//!
//! Use this in tests to drive a rebalance cycle without network calls; the
//! rebalancer's `paper` mode builds one from a market file.
//!
//! ```
//! use weightbook::{Side, Symbol};
//! use weightbook_broker::Broker;
//! use weightbook_broker::mock::{FillMode, MockBroker};
//!
//! let spy = Symbol::new("SPY");
//! let broker = MockBroker::builder()
//!     .fill_mode(FillMode::ImmediateFull)
//!     .with_cash(10_000.0)
//!     .with_price(spy, 100.0)
//!     .build();
//!
//! let order = broker.create_order(spy, 25.0, Side::Buy, None);
//! broker.submit_order(&order).unwrap();
//! assert_eq!(broker.potential_total(spy).unwrap(), 25.0);
//! assert_eq!(broker.cash().unwrap(), 7_500.0);
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{Duration, NaiveDate};
use log::debug;
use weightbook::{Holding, Side, Symbol};

use crate::error::BrokerError;
use crate::types::*;
use crate::{Broker, BrokerResult};

/// Quantities below this are treated as zero.
const DUST: f64 = 1e-9;

/// How the mock broker handles submitted orders.
#[derive(Clone, Debug, PartialEq)]
pub enum FillMode {
    /// Orders fill completely at the last price on submission.
    ImmediateFull,
    /// The given fraction (e.g. 0.5 = 50%) fills on submission; the rest
    /// stays open.
    ImmediatePartial(f64),
    /// Orders fill completely after their status has been polled this many
    /// times.
    AfterPolls(u32),
    /// Orders stay open until [`MockBroker::fill_open_orders`] is called.
    Pending,
    /// All orders are rejected.
    Reject,
}

/// A recorded order submission for assertion in tests.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedOrder {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: f64,
    pub filled: f64,
    pub state: OrderState,
}

impl RecordedOrder {
    fn remaining(&self) -> f64 {
        (self.quantity - self.filled).max(0.0)
    }
}

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    quote_asset: Symbol,
    fill_mode: FillMode,
    cash: f64,
    holdings: BTreeMap<Symbol, f64>,
    prices: BTreeMap<Symbol, f64>,
    history: BTreeMap<Symbol, Vec<Bar>>,
    as_of: Option<NaiveDate>,
}

impl MockBrokerBuilder {
    pub fn quote_asset(mut self, quote: Symbol) -> Self {
        self.quote_asset = quote;
        self
    }

    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    pub fn with_cash(mut self, cash: f64) -> Self {
        self.cash = cash;
        self
    }

    pub fn with_holding(mut self, symbol: Symbol, quantity: f64) -> Self {
        *self.holdings.entry(symbol).or_insert(0.0) += quantity;
        self
    }

    /// Explicit last price (takes precedence over the last bar of history).
    pub fn with_price(mut self, symbol: Symbol, price: f64) -> Self {
        self.prices.insert(symbol, price);
        self
    }

    /// Daily closing prices. Bars are sorted by date.
    pub fn with_history(mut self, symbol: Symbol, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.date);
        self.history.insert(symbol, bars);
        self
    }

    /// Consecutive daily closes ending on `end`, one per calendar day.
    pub fn with_daily_closes(self, symbol: Symbol, end: NaiveDate, closes: &[f64]) -> Self {
        let n = closes.len() as i64;
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar::new(end - Duration::days(n - 1 - i as i64), close))
            .collect();
        self.with_history(symbol, bars)
    }

    /// The "today" that daily history windows end on. Defaults to the latest
    /// bar date across all symbols.
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn build(self) -> MockBroker {
        let as_of = self.as_of.or_else(|| {
            self.history
                .values()
                .filter_map(|bars| bars.last().map(|b| b.date))
                .max()
        });
        MockBroker {
            quote_asset: self.quote_asset,
            fill_mode: self.fill_mode,
            prices: self.prices,
            history: self.history,
            as_of,
            state: Mutex::new(State {
                cash: self.cash,
                holdings: self.holdings,
                orders: Vec::new(),
                polls: BTreeMap::new(),
            }),
        }
    }
}

struct State {
    cash: f64,
    holdings: BTreeMap<Symbol, f64>,
    orders: Vec<RecordedOrder>,
    polls: BTreeMap<u64, u32>,
}

/// A mock broker that keeps a cash/holdings ledger and records submitted orders.
pub struct MockBroker {
    quote_asset: Symbol,
    fill_mode: FillMode,
    prices: BTreeMap<Symbol, f64>,
    history: BTreeMap<Symbol, Vec<Bar>>,
    as_of: Option<NaiveDate>,
    state: Mutex<State>,
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            quote_asset: Symbol::new("USD"),
            fill_mode: FillMode::ImmediateFull,
            cash: 0.0,
            holdings: BTreeMap::new(),
            prices: BTreeMap::new(),
            history: BTreeMap::new(),
            as_of: None,
        }
    }

    /// Get all orders that were submitted (for assertion in tests).
    pub fn submitted_orders(&self) -> Vec<RecordedOrder> {
        self.state()
            .map(|s| s.orders.clone())
            .unwrap_or_default()
    }

    /// Fill every open order at the last price, as if the market caught up.
    pub fn fill_open_orders(&self) -> BrokerResult<usize> {
        let mut state = self.state()?;
        let open: Vec<usize> = state
            .orders
            .iter()
            .enumerate()
            .filter(|(_, o)| !o.state.is_terminal())
            .map(|(i, _)| i)
            .collect();
        for &i in &open {
            let remaining = state.orders[i].remaining();
            self.fill(&mut state, i, remaining)?;
        }
        Ok(open.len())
    }

    fn state(&self) -> BrokerResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| BrokerError::Other("mock broker state poisoned".into()))
    }

    fn price_of(&self, symbol: Symbol) -> Option<f64> {
        if symbol == self.quote_asset {
            return Some(1.0);
        }
        self.prices
            .get(&symbol)
            .copied()
            .or_else(|| self.history.get(&symbol)?.last().map(|b| b.close))
    }

    /// Apply a fill of `quantity` to order `index`.
    fn fill(&self, state: &mut State, index: usize, quantity: f64) -> BrokerResult<()> {
        let (symbol, side) = {
            let o = &state.orders[index];
            (o.symbol, o.side)
        };
        if quantity > DUST {
            let price = self
                .price_of(symbol)
                .ok_or_else(|| BrokerError::DataUnavailable(format!("no price for {symbol}")))?;
            let notional = quantity * price;
            let held = state.holdings.entry(symbol).or_insert(0.0);
            match side {
                Side::Buy => {
                    *held += quantity;
                    state.cash -= notional;
                }
                Side::Sell => {
                    *held -= quantity;
                    state.cash += notional;
                }
            }
            if state.holdings.get(&symbol).is_some_and(|q| q.abs() < DUST) {
                state.holdings.remove(&symbol);
            }
            debug!("mock fill: {side} {quantity} {symbol} @ {price}");
        }

        let order = &mut state.orders[index];
        order.filled += quantity;
        order.state = if order.remaining() <= DUST {
            OrderState::Filled
        } else {
            OrderState::PartiallyFilled
        };
        Ok(())
    }
}

impl Broker for MockBroker {
    fn quote_asset(&self) -> Symbol {
        self.quote_asset
    }

    fn last_price(&self, symbol: Symbol, quote: Option<Symbol>) -> BrokerResult<Option<f64>> {
        if quote.is_some_and(|q| q != self.quote_asset) {
            return Ok(None);
        }
        Ok(self.price_of(symbol))
    }

    fn historical_prices(
        &self,
        symbol: Symbol,
        length: u32,
        granularity: Granularity,
    ) -> BrokerResult<Option<Vec<Bar>>> {
        let Some(bars) = self.history.get(&symbol) else {
            return Ok(None);
        };
        let window = match (granularity, self.as_of) {
            (Granularity::Day, Some(as_of)) => {
                let start = as_of - Duration::days(i64::from(length));
                bars.iter()
                    .filter(|b| b.date > start && b.date <= as_of)
                    .copied()
                    .collect()
            }
            _ => {
                let skip = bars.len().saturating_sub(length as usize);
                bars[skip..].to_vec()
            }
        };
        Ok(Some(window))
    }

    fn positions(&self) -> BrokerResult<Vec<Holding>> {
        let state = self.state()?;
        let mut out: Vec<Holding> = state
            .holdings
            .iter()
            .filter(|(_, q)| q.abs() > DUST)
            .map(|(&s, &q)| Holding::new(s, q))
            .collect();
        if state.cash > 0.0 {
            out.push(Holding::new(self.quote_asset, state.cash));
        }
        Ok(out)
    }

    fn potential_total(&self, symbol: Symbol) -> BrokerResult<f64> {
        let state = self.state()?;
        let held = state.holdings.get(&symbol).copied().unwrap_or(0.0);
        let in_flight: f64 = state
            .orders
            .iter()
            .filter(|o| o.symbol == symbol && !o.state.is_terminal())
            .map(|o| match o.side {
                Side::Buy => o.remaining(),
                Side::Sell => -o.remaining(),
            })
            .sum();
        Ok(held + in_flight)
    }

    fn portfolio_value(&self) -> BrokerResult<f64> {
        let state = self.state()?;
        let positions: f64 = state
            .holdings
            .iter()
            .filter_map(|(&s, &q)| self.price_of(s).map(|p| p * q))
            .sum();
        Ok(state.cash + positions)
    }

    fn cash(&self) -> BrokerResult<f64> {
        Ok(self.state()?.cash)
    }

    fn submit_order(&self, order: &BrokerOrder) -> BrokerResult<OrderId> {
        if !(order.quantity.is_finite() && order.quantity > 0.0) {
            return Err(BrokerError::Order(format!(
                "invalid quantity {} for {}",
                order.quantity, order.symbol
            )));
        }
        if order.quote.is_some_and(|q| q != self.quote_asset) {
            return Err(BrokerError::InvalidSymbol(format!(
                "{} not tradable against this account",
                order.symbol
            )));
        }

        let mut state = self.state()?;
        let id = OrderId(state.orders.len() as u64 + 1);
        let mut record = RecordedOrder {
            id,
            symbol: order.symbol,
            side: order.side,
            quantity: order.quantity,
            filled: 0.0,
            state: OrderState::Submitted,
        };

        if self.fill_mode == FillMode::Reject {
            record.state = OrderState::Rejected;
            state.orders.push(record);
            return Err(BrokerError::Order("mock: order rejected".into()));
        }

        // Account checks at the last price
        let price = self.price_of(order.symbol).ok_or_else(|| {
            BrokerError::DataUnavailable(format!("no price for {}", order.symbol))
        })?;
        match order.side {
            Side::Buy if order.quantity * price > state.cash + DUST => {
                return Err(BrokerError::Order(format!(
                    "insufficient buying power: need {:.2}, have {:.2}",
                    order.quantity * price,
                    state.cash
                )));
            }
            Side::Sell => {
                let held = state.holdings.get(&order.symbol).copied().unwrap_or(0.0);
                let committed: f64 = state
                    .orders
                    .iter()
                    .filter(|o| {
                        o.symbol == order.symbol && o.side == Side::Sell && !o.state.is_terminal()
                    })
                    .map(RecordedOrder::remaining)
                    .sum();
                let available = held - committed;
                if order.quantity > available + DUST {
                    return Err(BrokerError::Order(format!(
                        "insufficient quantity: selling {} of {}, {available} available",
                        order.quantity, order.symbol
                    )));
                }
            }
            _ => {}
        }

        state.orders.push(record);
        let index = state.orders.len() - 1;
        match self.fill_mode {
            FillMode::ImmediateFull => self.fill(&mut state, index, order.quantity)?,
            FillMode::ImmediatePartial(frac) => {
                self.fill(&mut state, index, order.quantity * frac.clamp(0.0, 1.0))?
            }
            FillMode::AfterPolls(_) | FillMode::Pending | FillMode::Reject => {}
        }
        Ok(id)
    }

    fn order_status(&self, id: OrderId) -> BrokerResult<OrderState> {
        let mut state = self.state()?;
        let index = state
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(BrokerError::UnknownOrder(id.0))?;

        if let FillMode::AfterPolls(n) = self.fill_mode {
            if !state.orders[index].state.is_terminal() {
                let polls = state.polls.entry(id.0).or_insert(0);
                *polls += 1;
                if *polls >= n {
                    let remaining = state.orders[index].remaining();
                    self.fill(&mut state, index, remaining)?;
                }
            }
        }
        Ok(state.orders[index].state)
    }
}
