//! Rebalance cycle counter.
//!
//! One tick per scheduling period. A tick fires a rebalance when the counter
//! is uninitialized (first tick) or has reached the rebalance period; firing
//! resets the counter to 0. Every tick then advances the counter by one, so
//! a period of `P` fires on ticks 1, P+1, 2P+1, ...

use std::fmt;

/// What a tick decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickAction {
    /// Run a full rebalance cycle now.
    Rebalance,
    /// Keep waiting; `counter` is the value seen on this tick.
    Wait { counter: u32, period: u32 },
}

impl fmt::Display for TickAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickAction::Rebalance => write!(f, "rebalance"),
            TickAction::Wait { counter, period } => {
                write!(f, "waiting ({counter}/{period})")
            }
        }
    }
}

/// Per-strategy cycle counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleCounter {
    counter: Option<u32>,
    period: u32,
}

impl CycleCounter {
    /// A counter firing every `period` ticks (a period of 0 is treated as 1).
    pub fn new(period: u32) -> Self {
        Self {
            counter: None,
            period: period.max(1),
        }
    }

    pub fn period(&self) -> u32 {
        self.period
    }

    /// Current counter value (`None` before the first tick).
    pub fn counter(&self) -> Option<u32> {
        self.counter
    }

    /// Advance by one tick.
    pub fn tick(&mut self) -> TickAction {
        let action = match self.counter {
            None => TickAction::Rebalance,
            Some(c) if c >= self.period => TickAction::Rebalance,
            Some(c) => TickAction::Wait {
                counter: c,
                period: self.period,
            },
        };
        let base = match action {
            TickAction::Rebalance => 0,
            TickAction::Wait { counter, .. } => counter,
        };
        self.counter = Some(base + 1);
        action
    }
}
