//! The periodic loop: one tick per interval, a full cycle every
//! `rebalance_period` ticks.

use std::time::Duration;

use log::{error, info};
use weightbook::{CycleCounter, TickAction};

use crate::audit::AuditLog;
use crate::execution::{self, CycleOptions, CycleReport, Executor};
use crate::settle::Clock;
use crate::strategy::Strategy;

/// What one tick did.
#[derive(Debug)]
pub enum TickOutcome {
    Waited { counter: u32, period: u32 },
    Rebalanced(Box<CycleReport>),
    /// The cycle failed; the loop goes on.
    Failed(String),
}

/// Totals over a scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub cycles: u64,
    pub failures: u64,
}

pub struct Scheduler<'a> {
    counter: CycleCounter,
    tick_interval: Duration,
    clock: &'a dyn Clock,
}

impl<'a> Scheduler<'a> {
    pub fn new(rebalance_period: u32, tick_interval: Duration, clock: &'a dyn Clock) -> Self {
        Self {
            counter: CycleCounter::new(rebalance_period),
            tick_interval,
            clock,
        }
    }

    /// Advance one tick, running a cycle if the counter fires.
    pub fn tick(
        &mut self,
        strategy: &mut dyn Strategy,
        executor: &Executor<'_>,
        audit: &mut AuditLog,
        opts: &CycleOptions,
    ) -> TickOutcome {
        match self.counter.tick() {
            TickAction::Wait { counter, period } => {
                info!(
                    "{}: waiting for next rebalance, counter is {counter} but should be {period}",
                    strategy.name()
                );
                TickOutcome::Waited { counter, period }
            }
            TickAction::Rebalance => match execution::run_cycle(strategy, executor, audit, opts) {
                Ok(report) => TickOutcome::Rebalanced(Box::new(report)),
                Err(e) => {
                    error!("{}: cycle failed: {e}", strategy.name());
                    TickOutcome::Failed(e.to_string())
                }
            },
        }
    }

    /// Tick until `max_ticks` (forever if `None`), sleeping the tick interval
    /// between ticks.
    pub fn run(
        &mut self,
        strategy: &mut dyn Strategy,
        executor: &Executor<'_>,
        audit: &mut AuditLog,
        opts: &CycleOptions,
        max_ticks: Option<u64>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        loop {
            match self.tick(strategy, executor, audit, opts) {
                TickOutcome::Waited { .. } => {}
                TickOutcome::Rebalanced(_) => summary.cycles += 1,
                TickOutcome::Failed(_) => {
                    summary.cycles += 1;
                    summary.failures += 1;
                }
            }
            summary.ticks += 1;
            if max_ticks.is_some_and(|max| summary.ticks >= max) {
                return summary;
            }
            self.clock.sleep(self.tick_interval);
        }
    }
}
