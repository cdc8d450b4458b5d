//! One rebalance cycle: snapshot → targets → plan → sequenced submission.
//!
//! Orders go out in three phases: divestitures, trims, buys. Each sell phase
//! is allowed to settle before the next one starts, and buys are checked
//! against the cash actually free once the sells have settled.

use log::{error, info, warn};
use weightbook::{
    FeeModel, Phase, PlannedOrder, PortfolioSnapshot, RebalancePlan, Skip, SkipReason, Symbol,
    TargetAllocation, compute_plan, truncate_quantity,
};
use weightbook_broker::{Broker, OrderId};

use crate::audit::{self, AuditLog};
use crate::error::{Error, Result};
use crate::settle::{self, Clock, SettleOutcome, Settlement};
use crate::strategy::{Proposal, Strategy};

/// Slack allowed when comparing an order's cost with free cash.
const CASH_EPSILON: f64 = 1e-6;

/// Options for a rebalance cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleOptions {
    /// Compute and log the plan without submitting.
    pub dry_run: bool,
    /// Abort the cycle if the plan has more orders than this.
    pub max_orders: usize,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_orders: 50,
        }
    }
}

/// An order the broker accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedOrder {
    /// As submitted; a buy may have been shrunk to fit free cash.
    pub order: PlannedOrder,
    pub id: OrderId,
}

/// An order the broker refused.
#[derive(Debug, Clone, PartialEq)]
pub struct FailedOrder {
    pub order: PlannedOrder,
    pub error: String,
}

/// What the sequencer did with a plan.
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub submitted: Vec<SubmittedOrder>,
    pub failed: Vec<FailedOrder>,
    /// Buys dropped by the cash check.
    pub skipped: Vec<Skip>,
    /// Settle steps that actually waited, in order.
    pub settled: Vec<(Phase, SettleOutcome)>,
}

impl ExecutionReport {
    /// Symbols of the submitted orders, in submission order.
    pub fn submitted_symbols(&self) -> Vec<Symbol> {
        self.submitted.iter().map(|s| s.order.symbol).collect()
    }
}

/// Tracks cash committed to buys within one cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashLedger {
    available: f64,
    committed: f64,
}

impl CashLedger {
    pub fn new(available: f64) -> Self {
        Self {
            available,
            committed: 0.0,
        }
    }

    /// Cash not yet committed.
    pub fn remaining(&self) -> f64 {
        (self.available - self.committed).max(0.0)
    }

    /// Commit cash for a buy.
    ///
    /// Returns the order as it should be submitted: unchanged if it fits,
    /// shrunk to the affordable truncated quantity if only part fits. Orders
    /// without a reference price cannot be checked and pass unchanged.
    pub fn reserve(
        &mut self,
        order: &PlannedOrder,
    ) -> std::result::Result<PlannedOrder, SkipReason> {
        let Some(price) = order.reference_price.filter(|p| *p > 0.0) else {
            return Ok(*order);
        };
        let cost = order.quantity * price;
        let remaining = self.remaining();
        if cost <= remaining + CASH_EPSILON {
            self.committed += cost;
            return Ok(*order);
        }

        let affordable = truncate_quantity(remaining / price);
        if affordable > 0.0 {
            self.committed += affordable * price;
            Ok(PlannedOrder {
                quantity: affordable,
                ..*order
            })
        } else {
            Err(SkipReason::NotEnoughCash {
                needed: cost,
                available: remaining,
            })
        }
    }
}

/// Submits a plan phase by phase.
pub struct Executor<'a> {
    broker: &'a dyn Broker,
    clock: &'a dyn Clock,
    settlement: Settlement,
    check_cash: bool,
}

impl<'a> Executor<'a> {
    pub fn new(broker: &'a dyn Broker, clock: &'a dyn Clock) -> Self {
        Self {
            broker,
            clock,
            settlement: Settlement::default(),
            check_cash: true,
        }
    }

    pub fn with_settlement(mut self, settlement: Settlement) -> Self {
        self.settlement = settlement;
        self
    }

    pub fn with_cash_check(mut self, check_cash: bool) -> Self {
        self.check_cash = check_cash;
        self
    }

    pub fn broker(&self) -> &'a dyn Broker {
        self.broker
    }

    /// Submit every order of the plan: divestitures, settle, trims, settle,
    /// buys. A failed submission is logged and counted; it never stops the
    /// remaining orders.
    pub fn execute(
        &self,
        plan: &RebalancePlan,
        quote: Option<Symbol>,
        audit: &mut AuditLog,
    ) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::default();

        for phase in Phase::ORDER {
            let orders = plan.phase(phase);
            if orders.is_empty() {
                continue;
            }
            let orders = if phase == Phase::Buy && self.check_cash {
                self.fit_to_cash(orders, &mut report, audit)?
            } else {
                orders.to_vec()
            };

            let mut ids = Vec::with_capacity(orders.len());
            for order in &orders {
                if let Some(id) = self.submit(order, quote, &mut report, audit)? {
                    ids.push(id);
                }
            }

            if phase != Phase::Buy && !ids.is_empty() {
                let outcome = settle::settle(&self.settlement, self.broker, self.clock, &ids);
                if !outcome.is_settled() {
                    warn!(
                        "{phase} phase: {} of {} orders unsettled, continuing",
                        outcome.open,
                        ids.len()
                    );
                }
                audit::log_phase_settled(audit, phase, &outcome)?;
                report.settled.push((phase, outcome));
            }
        }

        Ok(report)
    }

    fn fit_to_cash(
        &self,
        buys: &[PlannedOrder],
        report: &mut ExecutionReport,
        audit: &mut AuditLog,
    ) -> Result<Vec<PlannedOrder>> {
        let available = match self.broker.cash() {
            Ok(cash) => cash,
            Err(e) => {
                warn!("cash unavailable ({e}), submitting buys unchecked");
                return Ok(buys.to_vec());
            }
        };

        let mut ledger = CashLedger::new(available);
        let mut fitted = Vec::with_capacity(buys.len());
        for order in buys {
            match ledger.reserve(order) {
                Ok(o) => {
                    if o.quantity < order.quantity {
                        warn!(
                            "{}: buy reduced from {} to {} to fit free cash",
                            o.symbol, order.quantity, o.quantity
                        );
                    }
                    fitted.push(o);
                }
                Err(reason) => {
                    let skip = Skip::new(order.symbol, reason);
                    warn!("{skip}");
                    audit::log_skip(audit, &skip)?;
                    report.skipped.push(skip);
                }
            }
        }
        Ok(fitted)
    }

    fn submit(
        &self,
        order: &PlannedOrder,
        quote: Option<Symbol>,
        report: &mut ExecutionReport,
        audit: &mut AuditLog,
    ) -> Result<Option<OrderId>> {
        let broker_order = self
            .broker
            .create_order(order.symbol, order.quantity, order.side, quote);
        match self.broker.submit_order(&broker_order) {
            Ok(id) => {
                info!(
                    "{} {} {} ({}) submitted as {id}",
                    order.side, order.quantity, order.symbol, order.reason
                );
                audit::log_order_submitted(audit, order, id)?;
                report.submitted.push(SubmittedOrder { order: *order, id });
                Ok(Some(id))
            }
            Err(e) => {
                error!(
                    "{} {} {} failed: {e}",
                    order.side, order.quantity, order.symbol
                );
                let message = e.to_string();
                audit::log_order_failed(audit, order, &message)?;
                report.failed.push(FailedOrder {
                    order: *order,
                    error: message,
                });
                Ok(None)
            }
        }
    }
}

/// Capture portfolio value, holdings, prices and potential totals.
///
/// Prices and potential totals are fetched for every targeted and held symbol
/// except the quote asset; a price the broker cannot provide is left out and
/// the diff engine skips that symbol.
pub fn take_snapshot(
    broker: &dyn Broker,
    targets: &[TargetAllocation],
    quote: Option<Symbol>,
) -> Result<PortfolioSnapshot> {
    let portfolio_value = broker.portfolio_value()?;
    let holdings = broker.positions()?;
    let quote_asset = broker.quote_asset();
    let mut snapshot = PortfolioSnapshot::new(portfolio_value, holdings);

    let mut symbols: Vec<Symbol> = targets.iter().map(|t| t.symbol).collect();
    for h in &snapshot.holdings {
        if !symbols.contains(&h.symbol) {
            symbols.push(h.symbol);
        }
    }

    for symbol in symbols {
        if symbol == quote_asset {
            continue;
        }
        match broker.last_price(symbol, quote) {
            Ok(Some(price)) => snapshot.set_price(symbol, price),
            Ok(None) => {}
            Err(e) => warn!("{symbol}: price request failed: {e}"),
        }
        match broker.potential_total(symbol) {
            Ok(quantity) => snapshot.set_potential_total(symbol, quantity),
            Err(e) => warn!("{symbol}: potential total unavailable ({e}), using held"),
        }
    }

    Ok(snapshot)
}

/// A planned cycle, before submission.
#[derive(Debug, Clone)]
pub struct CyclePlan {
    pub plan: RebalancePlan,
    /// Target weights, for weight-based strategies.
    pub targets: Option<Vec<TargetAllocation>>,
    pub snapshot: Option<PortfolioSnapshot>,
}

/// Ask the strategy for targets and turn them into a plan.
pub fn plan_cycle(
    strategy: &mut dyn Strategy,
    broker: &dyn Broker,
    audit: &mut AuditLog,
) -> Result<CyclePlan> {
    info!("{}: starting cycle", strategy.name());
    audit::log_cycle_started(audit, strategy.name())?;

    let cycle = match strategy.propose(broker)? {
        Proposal::Weights { targets, skipped } => {
            audit::log_targets(audit, &targets)?;
            let snapshot = take_snapshot(broker, &targets, strategy.quote())?;
            audit::log_snapshot(audit, &snapshot)?;

            let params = strategy.diff_params(broker.quote_asset());
            let mut plan = compute_plan(&snapshot, &targets, &params);
            let diff_skips = std::mem::replace(&mut plan.skipped, skipped);
            plan.skipped.extend(diff_skips);
            CyclePlan {
                plan,
                targets: Some(targets),
                snapshot: Some(snapshot),
            }
        }
        Proposal::Orders(plan) => CyclePlan {
            plan,
            targets: None,
            snapshot: None,
        },
    };

    for skip in &cycle.plan.skipped {
        log_skip(skip);
        audit::log_skip(audit, skip)?;
    }
    for (symbol, drift) in &cycle.plan.within_threshold {
        info!(
            "{symbol}: drift {:.2}% within rebalance threshold",
            drift * 100.0
        );
    }
    audit::log_plan(audit, &cycle.plan)?;

    Ok(cycle)
}

fn log_skip(skip: &Skip) {
    match skip.reason {
        SkipReason::DataUnavailable | SkipReason::NotEnoughCash { .. } => {
            warn!("skipped {skip}")
        }
        _ => info!("skipped {skip}"),
    }
}

/// Fail if a plan has more orders than allowed for one run.
pub fn enforce_max_orders_per_run(order_count: usize, max_orders: usize) -> Result<()> {
    if order_count > max_orders {
        return Err(Error::Aborted(format!(
            "plan has {order_count} orders, max_orders_per_run is {max_orders}"
        )));
    }
    Ok(())
}

/// Result of one cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub plan: RebalancePlan,
    pub targets: Option<Vec<TargetAllocation>>,
    /// `None` for a dry run or an empty plan.
    pub execution: Option<ExecutionReport>,
}

impl CycleReport {
    pub fn submitted(&self) -> usize {
        self.execution.as_ref().map_or(0, |e| e.submitted.len())
    }

    pub fn failed(&self) -> usize {
        self.execution.as_ref().map_or(0, |e| e.failed.len())
    }

    /// Symbols skipped while planning or by the cash check.
    pub fn skipped(&self) -> usize {
        self.plan.skipped.len() + self.execution.as_ref().map_or(0, |e| e.skipped.len())
    }
}

/// Run one full cycle: plan, then submit unless this is a dry run.
pub fn run_cycle(
    strategy: &mut dyn Strategy,
    executor: &Executor<'_>,
    audit: &mut AuditLog,
    opts: &CycleOptions,
) -> Result<CycleReport> {
    let cycle = plan_cycle(strategy, executor.broker(), audit)?;
    execute_cycle(cycle, strategy.quote(), executor, audit, opts)
}

/// Submit an already computed plan.
pub fn execute_cycle(
    cycle: CyclePlan,
    quote: Option<Symbol>,
    executor: &Executor<'_>,
    audit: &mut AuditLog,
    opts: &CycleOptions,
) -> Result<CycleReport> {
    let mut report = CycleReport {
        plan: cycle.plan,
        targets: cycle.targets,
        execution: None,
    };

    if report.plan.is_empty() {
        info!("No rebalancing needed.");
        audit::log_cycle_completed(audit, 0, 0, report.skipped())?;
        return Ok(report);
    }

    enforce_max_orders_per_run(report.plan.len(), opts.max_orders)?;

    if opts.dry_run {
        info!("[DRY RUN] {} orders not submitted.", report.plan.len());
        return Ok(report);
    }

    let execution = executor.execute(&report.plan, quote, audit)?;
    report.execution = Some(execution);
    audit::log_cycle_completed(audit, report.submitted(), report.failed(), report.skipped())?;
    info!(
        "Cycle done: {} submitted, {} failed, {} skipped.",
        report.submitted(),
        report.failed(),
        report.skipped()
    );
    Ok(report)
}

// === Display ===

pub fn display_positions(snapshot: &PortfolioSnapshot) {
    if snapshot.holdings.is_empty() {
        println!("No positions.");
        return;
    }

    println!("CURRENT PORTFOLIO (${:.2}):", snapshot.portfolio_value);
    for h in &snapshot.holdings {
        match snapshot.price(h.symbol) {
            Some(price) => {
                let value = h.quantity * price;
                let weight = if snapshot.portfolio_value > 0.0 {
                    value / snapshot.portfolio_value
                } else {
                    0.0
                };
                println!(
                    "  {:8} {:>12.2} @ ${:>10.2} = ${:>12.2}  ({:.1}%)",
                    h.symbol,
                    h.quantity,
                    price,
                    value,
                    weight * 100.0,
                );
            }
            None => println!("  {:8} {:>12.2}", h.symbol, h.quantity),
        }
    }
}

pub fn display_plan(plan: &RebalancePlan, fees: &FeeModel) {
    if plan.is_empty() {
        println!("\nNo rebalancing needed.");
    } else {
        println!("\nREBALANCE ORDERS:");
        println!(
            "  {:>3}  {:6} {:8} {:>12} {:>10} {:>12}",
            "#", "Side", "Symbol", "Qty", "Price", "Notional"
        );
        for (i, order) in plan.orders().enumerate() {
            let price = order
                .reference_price
                .map_or_else(|| "-".to_string(), |p| format!("${p:.2}"));
            let notional = order
                .notional()
                .map_or_else(|| "-".to_string(), |n| format!("${n:.2}"));
            println!(
                "  {:>3}  {:6} {:8} {:>12.2} {:>10} {:>12}   ({})",
                i + 1,
                order.side,
                order.symbol,
                order.quantity,
                price,
                notional,
                order.reason,
            );
        }
        println!("\nEst. cost: {}", fees.estimate(plan));
    }

    if !plan.skipped.is_empty() {
        println!("\nSKIPPED:");
        for skip in &plan.skipped {
            println!("  {skip}");
        }
    }
}
