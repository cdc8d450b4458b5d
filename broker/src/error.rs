//! Broker error types.

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("data unavailable: {0}")]
    DataUnavailable(String),

    #[error("unknown order id: {0}")]
    UnknownOrder(u64),

    #[error("{0}")]
    Other(String),
}
