//! Waiting for a sell phase to settle before the next phase is submitted.

use std::sync::Mutex;
use std::time::Duration;

use log::{debug, warn};
use weightbook_broker::{Broker, OrderId};

/// Source of waiting. Tests substitute a clock that only records.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// Blocks the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A clock that returns immediately and remembers every requested sleep.
#[derive(Debug, Default)]
pub struct ManualClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Sum of all requested sleeps.
    pub fn elapsed(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

impl Clock for ManualClock {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
    }
}

/// How to wait between order phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Sleep a fixed time and assume the orders filled.
    FixedDelay(Duration),
    /// Poll order status until every order is terminal or `timeout` passes.
    AwaitFills { poll: Duration, timeout: Duration },
}

impl Default for Settlement {
    fn default() -> Self {
        Settlement::FixedDelay(Duration::from_secs(5))
    }
}

/// Result of one settle step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleOutcome {
    /// Time spent waiting.
    pub waited: Duration,
    /// Orders still open when the wait ended. Always 0 for a fixed delay.
    pub open: usize,
}

impl SettleOutcome {
    pub fn is_settled(&self) -> bool {
        self.open == 0
    }
}

/// Wait for `orders` to settle. No orders means no wait.
pub fn settle(
    settlement: &Settlement,
    broker: &dyn Broker,
    clock: &dyn Clock,
    orders: &[OrderId],
) -> SettleOutcome {
    if orders.is_empty() {
        return SettleOutcome::default();
    }

    match *settlement {
        Settlement::FixedDelay(delay) => {
            debug!("waiting {delay:?} for {} orders to settle", orders.len());
            clock.sleep(delay);
            SettleOutcome {
                waited: delay,
                open: 0,
            }
        }
        Settlement::AwaitFills { poll, timeout } => {
            let mut waited = Duration::ZERO;
            loop {
                let open = count_open(broker, orders);
                if open == 0 {
                    return SettleOutcome { waited, open };
                }
                if waited >= timeout || poll.is_zero() {
                    warn!(
                        "{open} of {} orders still open after {waited:?}",
                        orders.len()
                    );
                    return SettleOutcome { waited, open };
                }
                clock.sleep(poll);
                waited += poll;
            }
        }
    }
}

/// Orders not yet in a terminal state. A status that cannot be read is not
/// waited on.
fn count_open(broker: &dyn Broker, orders: &[OrderId]) -> usize {
    orders
        .iter()
        .filter(|&&id| match broker.order_status(id) {
            Ok(state) => !state.is_terminal(),
            Err(e) => {
                warn!("status of order {id} unavailable: {e}");
                false
            }
        })
        .count()
}
