//! Broker capability trait for weightbook.
//!
//! The rebalancer never talks to a brokerage directly. It is handed a
//! `&dyn Broker` at construction and uses only the calls below. Sessions,
//! authentication and market-data plumbing live behind the implementation.
//!
//! Implementations:
//!
//! - [`mock::MockBroker`]: in-memory account with configurable fills, used by
//!   tests and by the rebalancer's `paper` mode.

pub mod error;
pub mod mock;
pub mod types;

pub use error::BrokerError;
pub use types::*;

use weightbook::{Holding, Side, Symbol};

/// Result alias for broker calls.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// The calls a rebalance cycle needs from a broker.
///
/// Every call is synchronous. "Unavailable" data is `Ok(None)`; `Err` is
/// reserved for failures of the call itself.
pub trait Broker {
    /// The account's cash asset (`USD`, `USDT`, ...).
    fn quote_asset(&self) -> Symbol;

    /// Last traded price of `symbol` in `quote` (default: the quote asset).
    fn last_price(&self, symbol: Symbol, quote: Option<Symbol>) -> BrokerResult<Option<f64>>;

    /// Up to `length` units of history, oldest first.
    fn historical_prices(
        &self,
        symbol: Symbol,
        length: u32,
        granularity: Granularity,
    ) -> BrokerResult<Option<Vec<Bar>>>;

    /// All current holdings.
    fn positions(&self) -> BrokerResult<Vec<Holding>>;

    /// Held quantity plus the net quantity of orders not yet filled.
    fn potential_total(&self, symbol: Symbol) -> BrokerResult<f64>;

    /// Cash plus the market value of all holdings.
    fn portfolio_value(&self) -> BrokerResult<f64>;

    /// Free cash in the quote asset.
    fn cash(&self) -> BrokerResult<f64>;

    /// Build an order. No side effects.
    fn create_order(
        &self,
        symbol: Symbol,
        quantity: f64,
        side: Side,
        quote: Option<Symbol>,
    ) -> BrokerOrder {
        BrokerOrder {
            symbol,
            side,
            quantity,
            quote,
        }
    }

    /// Submit an order. Returns the broker's order ID.
    fn submit_order(&self, order: &BrokerOrder) -> BrokerResult<OrderId>;

    /// Current state of a submitted order.
    fn order_status(&self, id: OrderId) -> BrokerResult<OrderState>;
}

impl<B: Broker + ?Sized> Broker for Box<B> {
    fn quote_asset(&self) -> Symbol {
        (**self).quote_asset()
    }

    fn last_price(&self, symbol: Symbol, quote: Option<Symbol>) -> BrokerResult<Option<f64>> {
        (**self).last_price(symbol, quote)
    }

    fn historical_prices(
        &self,
        symbol: Symbol,
        length: u32,
        granularity: Granularity,
    ) -> BrokerResult<Option<Vec<Bar>>> {
        (**self).historical_prices(symbol, length, granularity)
    }

    fn positions(&self) -> BrokerResult<Vec<Holding>> {
        (**self).positions()
    }

    fn potential_total(&self, symbol: Symbol) -> BrokerResult<f64> {
        (**self).potential_total(symbol)
    }

    fn portfolio_value(&self) -> BrokerResult<f64> {
        (**self).portfolio_value()
    }

    fn cash(&self) -> BrokerResult<f64> {
        (**self).cash()
    }

    fn create_order(
        &self,
        symbol: Symbol,
        quantity: f64,
        side: Side,
        quote: Option<Symbol>,
    ) -> BrokerOrder {
        (**self).create_order(symbol, quantity, side, quote)
    }

    fn submit_order(&self, order: &BrokerOrder) -> BrokerResult<OrderId> {
        (**self).submit_order(order)
    }

    fn order_status(&self, id: OrderId) -> BrokerResult<OrderState> {
        (**self).order_status(id)
    }
}
