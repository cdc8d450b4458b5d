//! Shared broker types: bars, orders, order states.

use std::fmt;

use chrono::NaiveDate;
use weightbook::{Side, Symbol};

/// One bar of price history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bar {
    pub date: NaiveDate,
    pub close: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Bar size requested from the price history feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Minute,
    Day,
}

/// Order to submit to a broker. Always a market order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrokerOrder {
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: f64,
    /// Asset the order is priced in; `None` = the account's quote asset.
    pub quote: Option<Symbol>,
}

/// Opaque order ID returned by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Submitted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderState {
    /// True once the order can no longer change.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Cancelled | OrderState::Rejected
        )
    }
}
