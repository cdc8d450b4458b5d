//! Edge-case tests: adversarial inputs to every public API.

use weightbook::momentum::{self, MomentumParams};
use weightbook::{
    CycleCounter, DiffParams, FeeModel, Holding, OrderReason, PortfolioSnapshot, Side,
    SkipReason, Symbol, TargetAllocation, TickAction, compute_plan, truncate_quantity,
};

fn sym(s: &str) -> Symbol {
    Symbol::new(s)
}

fn usd() -> Symbol {
    sym("USD")
}

// ============================================================================
// Empty and degenerate portfolios
// ============================================================================

#[test]
fn empty_everything_plans_nothing() {
    let plan = compute_plan(&PortfolioSnapshot::default(), &[], &DiffParams::new(usd()));
    assert!(plan.is_empty());
    assert!(plan.skipped.is_empty());
}

#[test]
fn empty_targets_divest_everything_but_cash() {
    let snapshot = PortfolioSnapshot::new(
        1_500.0,
        vec![Holding::new(sym("AAA"), 3.0), Holding::new(usd(), 1_200.0)],
    )
    .with_price(sym("AAA"), 100.0);

    let plan = compute_plan(&snapshot, &[], &DiffParams::new(usd()));

    assert_eq!(plan.len(), 1);
    assert_eq!(plan.divestitures[0].symbol, sym("AAA"));
    assert_eq!(plan.divestitures[0].quantity, 3.0);
}

#[test]
fn zero_portfolio_value_sells_existing_target() {
    // A held target on a worthless account trims to zero.
    let snapshot = PortfolioSnapshot::new(0.0, vec![Holding::new(sym("AAA"), 2.0)])
        .with_price(sym("AAA"), 10.0);
    let targets = [TargetAllocation::new(sym("AAA"), 0.5)];

    let plan = compute_plan(&snapshot, &targets, &DiffParams::new(usd()).with_threshold(0.1));

    assert_eq!(plan.sells.len(), 1);
    assert_eq!(plan.sells[0].quantity, 2.0);
    assert_eq!(plan.sells[0].reason, OrderReason::Trim);
}

#[test]
fn divestiture_without_price_is_still_planned() {
    let snapshot = PortfolioSnapshot::new(100.0, vec![Holding::new(sym("DELIST"), 7.5)]);
    let plan = compute_plan(&snapshot, &[], &DiffParams::new(usd()));
    assert_eq!(plan.divestitures.len(), 1);
    assert_eq!(plan.divestitures[0].reference_price, None);
}

#[test]
fn split_holding_rows_divest_once_in_full() {
    let snapshot = PortfolioSnapshot::new(
        0.0,
        vec![Holding::new(sym("AAA"), 1.5), Holding::new(sym("AAA"), 2.25)],
    );
    let plan = compute_plan(&snapshot, &[], &DiffParams::new(usd()));
    assert_eq!(plan.divestitures.len(), 1);
    assert_eq!(plan.divestitures[0].quantity, 3.75);
}

// ============================================================================
// Unusable prices
// ============================================================================

#[test]
fn bad_prices_skip_the_target() {
    for price in [0.0, -5.0, f64::NAN, f64::INFINITY] {
        let snapshot = PortfolioSnapshot::new(1_000.0, vec![]).with_price(sym("AAA"), price);
        let targets = [TargetAllocation::new(sym("AAA"), 0.5)];
        let plan = compute_plan(&snapshot, &targets, &DiffParams::new(usd()));
        assert!(plan.is_empty(), "price {price}");
        assert_eq!(plan.skipped[0].reason, SkipReason::DataUnavailable);
    }
}

#[test]
fn sub_cent_target_is_skipped() {
    // $1 of a $500 share is 0.002 shares.
    let snapshot = PortfolioSnapshot::new(100.0, vec![]).with_price(sym("BRK.A"), 500.0);
    let targets = [TargetAllocation::new(sym("BRK.A"), 0.01)];
    let plan = compute_plan(&snapshot, &targets, &DiffParams::new(usd()));
    assert!(plan.is_empty());
    assert!(matches!(
        plan.skipped[0].reason,
        SkipReason::ZeroOrNegativeComputedQuantity { .. }
    ));
}

#[test]
fn in_flight_sell_is_not_repeated() {
    // Held 10, a pending sell of 5 leaves a potential total at target.
    let snapshot = PortfolioSnapshot::new(500.0, vec![Holding::new(sym("AAA"), 10.0)])
        .with_price(sym("AAA"), 50.0)
        .with_potential_total(sym("AAA"), 5.0);
    let targets = [TargetAllocation::new(sym("AAA"), 0.5)];
    let plan = compute_plan(&snapshot, &targets, &DiffParams::new(usd()));
    assert!(plan.is_empty());
}

#[test]
fn in_flight_divestiture_is_not_repeated() {
    let snapshot = PortfolioSnapshot::new(500.0, vec![Holding::new(sym("OLD"), 10.0)])
        .with_price(sym("OLD"), 50.0)
        .with_potential_total(sym("OLD"), 0.0);
    let plan = compute_plan(&snapshot, &[], &DiffParams::new(usd()));
    assert!(plan.is_empty());
}

#[test]
fn partly_sold_divestiture_sells_the_rest() {
    let snapshot = PortfolioSnapshot::new(500.0, vec![Holding::new(sym("OLD"), 10.0)])
        .with_price(sym("OLD"), 50.0)
        .with_potential_total(sym("OLD"), 4.0);
    let plan = compute_plan(&snapshot, &[], &DiffParams::new(usd()));
    assert_eq!(plan.divestitures[0].quantity, 4.0);
}

#[test]
fn full_weight_spends_whole_portfolio() {
    let snapshot = PortfolioSnapshot::new(1_000.0, vec![]).with_price(sym("AAA"), 3.0);
    let targets = [TargetAllocation::new(sym("AAA"), 1.0)];
    let plan = compute_plan(&snapshot, &targets, &DiffParams::new(usd()));
    assert_eq!(plan.buys[0].quantity, 333.33);
    assert_eq!(plan.buys[0].side, Side::Buy);
}

// ============================================================================
// Deadband boundaries
// ============================================================================

#[test]
fn drift_equal_to_threshold_is_suppressed() {
    // 0.2 shares * $50 = $10 on $1000: exactly 1%.
    let snapshot = PortfolioSnapshot::new(1_000.0, vec![Holding::new(sym("AAA"), 10.0)])
        .with_price(sym("AAA"), 50.0)
        .with_potential_total(sym("AAA"), 9.8);
    let targets = [TargetAllocation::new(sym("AAA"), 0.5)];
    let plan = compute_plan(&snapshot, &targets, &DiffParams::new(usd()).with_threshold(0.01));
    assert!(plan.is_empty());
    assert_eq!(plan.within_threshold.len(), 1);
}

#[test]
fn zero_threshold_trades_any_drift() {
    let snapshot = PortfolioSnapshot::new(1_000.0, vec![Holding::new(sym("AAA"), 9.0)])
        .with_price(sym("AAA"), 50.0);
    let targets = [TargetAllocation::new(sym("AAA"), 0.5)];
    let plan = compute_plan(&snapshot, &targets, &DiffParams::new(usd()).with_threshold(0.0));
    assert_eq!(plan.buys[0].quantity, 1.0);
    assert_eq!(plan.buys[0].reason, OrderReason::Increase);
}

// ============================================================================
// Momentum inputs
// ============================================================================

#[test]
fn zero_period_needs_no_history_but_some_data() {
    let params = MomentumParams::new(0, 3);
    assert_eq!(params.min_observations(), 0);
    assert!(matches!(
        momentum::evaluate(Some(&[][..]), Some(10.0), &params),
        Err(SkipReason::InsufficientHistory { observed: 0, .. })
    ));
}

#[test]
fn non_positive_first_close_is_unusable() {
    let params = MomentumParams::new(7, 1);
    let closes = [0.0, 1.0, 2.0, 3.0, 4.0];
    assert_eq!(
        momentum::evaluate(Some(&closes[..]), Some(4.0), &params),
        Err(SkipReason::DataUnavailable)
    );
}

#[test]
fn missing_last_price_is_unavailable() {
    let params = MomentumParams::new(7, 1);
    let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
    assert_eq!(
        momentum::evaluate(Some(&closes[..]), None, &params),
        Err(SkipReason::DataUnavailable)
    );
}

#[test]
fn top_zero_selects_nothing() {
    let ranked = [(sym("AAA"), 1.5)];
    assert!(momentum::select_top(&ranked, 0).is_empty());
}

#[test]
fn ties_keep_universe_order() {
    let returns = [(sym("BBB"), 1.1), (sym("AAA"), 1.1), (sym("CCC"), 1.1)];
    let picks = momentum::select_top(&momentum::rank(&returns), 2);
    assert_eq!(picks[0].symbol, sym("BBB"));
    assert_eq!(picks[1].symbol, sym("AAA"));
}

#[test]
fn duplicate_universe_entries_collapse() {
    let universe = [sym("SPY"), sym("QQQ"), sym("SPY")];
    assert_eq!(momentum::dedup_universe(&universe), vec![sym("SPY"), sym("QQQ")]);
}

// ============================================================================
// Small types
// ============================================================================

#[test]
fn symbol_limits() {
    assert!(Symbol::try_new("").is_none());
    assert!(Symbol::try_new("TOOLONGSYM").is_none());
    assert!(Symbol::try_new("A B").is_none());
    assert!(Symbol::try_new("ÄPPL").is_none());
    assert_eq!(Symbol::try_new("BRK.B").map(|s| s.to_string()), Some("BRK.B".into()));
}

#[test]
fn truncation_edges() {
    assert_eq!(truncate_quantity(f64::NAN), 0.0);
    assert_eq!(truncate_quantity(f64::INFINITY), 0.0);
    assert_eq!(truncate_quantity(-1.239), -1.23);
    assert_eq!(truncate_quantity(0.009999), 0.0);
}

#[test]
fn zero_period_counter_fires_every_tick() {
    let mut counter = CycleCounter::new(0);
    assert_eq!(counter.period(), 1);
    for _ in 0..3 {
        assert_eq!(counter.tick(), TickAction::Rebalance);
    }
}

#[test]
fn min_fee_applies_to_unpriced_orders() {
    let snapshot = PortfolioSnapshot::new(0.0, vec![Holding::new(sym("DELIST"), 1.0)]);
    let plan = compute_plan(&snapshot, &[], &DiffParams::new(usd()));
    let model = FeeModel {
        percent_fee: 0.001,
        min_fee: 1.0,
    };
    let estimate = model.estimate(&plan);
    assert_eq!(estimate.traded, 0.0);
    assert_eq!(estimate.fees, 1.0);
}
