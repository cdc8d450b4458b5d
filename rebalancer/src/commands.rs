//! Config-driven workflows behind the CLI subcommands.

use log::info;

use crate::audit::AuditLog;
use crate::broker;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::execution::{self, CycleOptions, Executor};
use crate::reconcile;
use crate::scheduler::{RunSummary, Scheduler};
use crate::settle::SystemClock;
use crate::strategy::{self, Proposal};

/// Options for a single manual cycle.
pub struct OnceOptions {
    pub dry_run: bool,
    /// Skip the confirmation prompt.
    pub force: bool,
}

fn cycle_options(config: &Config, dry_run: bool) -> CycleOptions {
    CycleOptions {
        dry_run,
        max_orders: config.execution.max_orders_per_run,
    }
}

/// Run the periodic loop for `ticks` ticks, or forever.
pub fn run_scheduled(config: &Config, ticks: Option<u64>, dry_run: bool) -> Result<RunSummary> {
    let broker = broker::connect(config)?;
    let mut strategy = strategy::from_config(&config.strategy)?;
    let mut audit = AuditLog::open(&config.audit_path())?;
    let clock = SystemClock;
    let executor = Executor::new(broker.as_ref(), &clock)
        .with_settlement(config.settlement())
        .with_cash_check(config.execution.check_cash);

    info!(
        "Starting {}: rebalance every {} ticks of {}s",
        strategy.name(),
        config.schedule.rebalance_period,
        config.schedule.tick_interval_secs
    );
    let mut scheduler = Scheduler::new(
        config.schedule.rebalance_period,
        config.tick_interval(),
        &clock,
    );
    let summary = scheduler.run(
        strategy.as_mut(),
        &executor,
        &mut audit,
        &cycle_options(config, dry_run),
        ticks,
    );

    println!(
        "{} ticks, {} cycles, {} failed. Audit logged to {}",
        summary.ticks,
        summary.cycles,
        summary.failures,
        config.audit_path().display()
    );
    Ok(summary)
}

/// Run one cycle now: plan, show, confirm, execute, reconcile.
pub fn run_once(config: &Config, opts: &OnceOptions) -> Result<()> {
    let broker = broker::connect(config)?;
    let mut strategy = strategy::from_config(&config.strategy)?;
    let mut audit = AuditLog::open(&config.audit_path())?;
    let clock = SystemClock;
    let executor = Executor::new(broker.as_ref(), &clock)
        .with_settlement(config.settlement())
        .with_cash_check(config.execution.check_cash);

    println!("Strategy: {}", strategy.name());
    let cycle = execution::plan_cycle(strategy.as_mut(), broker.as_ref(), &mut audit)?;
    if let Some(snapshot) = &cycle.snapshot {
        execution::display_positions(snapshot);
    }
    execution::display_plan(&cycle.plan, &config.fee_model());
    println!();

    if cycle.plan.is_empty() {
        audit.log_simple("no_rebalance_needed")?;
        return Ok(());
    }
    execution::enforce_max_orders_per_run(
        cycle.plan.len(),
        config.execution.max_orders_per_run,
    )?;

    if opts.dry_run {
        println!("[DRY RUN] No orders submitted.");
        return Ok(());
    }

    if !opts.force && !confirm(&mut audit)? {
        println!("Aborted.");
        return Ok(());
    }

    let quote = strategy.quote();
    let report = execution::execute_cycle(
        cycle,
        quote,
        &executor,
        &mut audit,
        &cycle_options(config, false),
    )?;
    println!(
        "\n{} submitted, {} failed, {} skipped. Audit logged to {}",
        report.submitted(),
        report.failed(),
        report.skipped(),
        config.audit_path().display()
    );

    if let Some(targets) = &report.targets {
        info!("Running post-execution reconciliation...");
        let snapshot = execution::take_snapshot(broker.as_ref(), targets, quote)?;
        let report = reconcile::reconcile(&snapshot, targets, broker.quote_asset());
        print!("\n{report}");
    }
    Ok(())
}

fn confirm(audit: &mut AuditLog) -> Result<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt("Execute?")
        .default(false)
        .interact()
        .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))?;
    audit.log(
        "user_confirmed",
        serde_json::json!({ "approved": confirmed }),
    )?;
    Ok(confirmed)
}

/// Show the account's holdings at current prices.
pub fn show_positions(config: &Config) -> Result<()> {
    let broker = broker::connect(config)?;
    let snapshot = execution::take_snapshot(broker.as_ref(), &[], None)?;
    println!(
        "Account: ${:.2} value, ${:.2} {} cash\n",
        snapshot.portfolio_value,
        broker.cash()?,
        broker.quote_asset()
    );
    execution::display_positions(&snapshot);
    Ok(())
}

/// Compare holdings against the strategy's current targets.
pub fn run_reconcile(config: &Config) -> Result<()> {
    let broker = broker::connect(config)?;
    let mut strategy = strategy::from_config(&config.strategy)?;
    let Proposal::Weights { targets, .. } = strategy.propose(broker.as_ref())? else {
        return Err(Error::Config(format!(
            "{} trades on signals and has no target weights to reconcile",
            strategy.name()
        )));
    };
    let snapshot = execution::take_snapshot(broker.as_ref(), &targets, strategy.quote())?;
    let report = reconcile::reconcile(&snapshot, &targets, broker.quote_asset());
    print!("{report}");
    Ok(())
}
