//! Property-based tests for rebalance plan invariants.
//!
//! These tests use proptest to verify that key invariants hold
//! across randomly generated portfolios and targets.

use proptest::prelude::*;
use weightbook::momentum::{rank, select_top};
use weightbook::{
    CycleCounter, DiffParams, Holding, OrderReason, PortfolioSnapshot, RebalancePlan, Side,
    Symbol, TargetAllocation, TickAction, compute_plan,
};

const UNIVERSE: [&str; 8] = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF", "GGG", "HHH"];

fn usd() -> Symbol {
    Symbol::new("USD")
}

/// A random account: cash, holdings and targets over the same universe.
#[derive(Debug, Clone)]
struct Scenario {
    cash: f64,
    prices: Vec<f64>,
    held: Vec<Option<f64>>,
    weights: Vec<Option<f64>>,
}

impl Scenario {
    fn symbol(i: usize) -> Symbol {
        Symbol::new(UNIVERSE[i])
    }

    fn snapshot(&self) -> PortfolioSnapshot {
        let holdings: Vec<Holding> = self
            .held
            .iter()
            .enumerate()
            .filter_map(|(i, q)| q.map(|q| Holding::new(Self::symbol(i), q)))
            .collect();
        let invested: f64 = self
            .held
            .iter()
            .zip(&self.prices)
            .filter_map(|(q, p)| q.map(|q| q * p))
            .sum();
        let mut snapshot = PortfolioSnapshot::new(self.cash + invested, holdings);
        for (i, &p) in self.prices.iter().enumerate() {
            snapshot.set_price(Self::symbol(i), p);
        }
        snapshot
    }

    /// Targets scaled so the weights sum to at most 1.
    fn targets(&self) -> Vec<TargetAllocation> {
        let raw: Vec<(usize, f64)> = self
            .weights
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.map(|w| (i, w)))
            .collect();
        let sum: f64 = raw.iter().map(|(_, w)| w).sum();
        let scale = if sum > 1.0 { 1.0 / sum } else { 1.0 };
        raw.into_iter()
            .map(|(i, w)| TargetAllocation::new(Self::symbol(i), w * scale))
            .collect()
    }
}

fn scenario_strategy() -> impl Strategy<Value = Scenario> {
    (
        0.0f64..100_000.0,
        prop::collection::vec(1.0f64..1_000.0, UNIVERSE.len()),
        prop::collection::vec(prop::option::of(0.01f64..500.0), UNIVERSE.len()),
        prop::collection::vec(prop::option::of(0.01f64..1.0), UNIVERSE.len()),
    )
        .prop_map(|(cash, prices, held, weights)| Scenario {
            cash,
            prices,
            held,
            weights,
        })
}

/// Apply a plan to the snapshot as if every order filled at its price.
fn apply(snapshot: &PortfolioSnapshot, plan: &RebalancePlan) -> PortfolioSnapshot {
    let mut held: Vec<Holding> = snapshot.holdings.clone();
    for order in plan.orders() {
        let signed = match order.side {
            Side::Buy => order.quantity,
            Side::Sell => -order.quantity,
        };
        match held.iter_mut().find(|h| h.symbol == order.symbol) {
            Some(h) => h.quantity += signed,
            None => held.push(Holding::new(order.symbol, signed)),
        }
    }
    held.retain(|h| h.quantity.abs() > 1e-9);

    let mut next = PortfolioSnapshot::new(snapshot.portfolio_value, held);
    for i in 0..UNIVERSE.len() {
        let symbol = Scenario::symbol(i);
        if let Some(p) = snapshot.price(symbol) {
            next.set_price(symbol, p);
        }
    }
    next
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // ========================================================================
    // QUANTITY INVARIANTS
    // ========================================================================

    /// Every non-divestiture quantity is positive and on the 0.01 grid.
    #[test]
    fn quantities_are_truncated(scenario in scenario_strategy()) {
        let plan = compute_plan(&scenario.snapshot(), &scenario.targets(), &DiffParams::new(usd()));
        for order in plan.sells.iter().chain(plan.buys.iter()) {
            prop_assert!(order.quantity > 0.0, "{:?}", order);
            let cents = order.quantity * 100.0;
            prop_assert!((cents - cents.round()).abs() < 1e-6, "{:?}", order);
        }
    }

    /// After the plan fills, every target sits within one truncation step of
    /// its ideal quantity.
    #[test]
    fn plan_converges_within_truncation(scenario in scenario_strategy()) {
        let snapshot = scenario.snapshot();
        let targets = scenario.targets();
        let plan = compute_plan(&snapshot, &targets, &DiffParams::new(usd()));
        let after = apply(&snapshot, &plan);

        for t in &targets {
            let price = snapshot.price(t.symbol).unwrap();
            let ideal = snapshot.portfolio_value * t.weight / price;
            let gap = (after.held(t.symbol) - ideal).abs();
            prop_assert!(gap < 0.01 + 1e-6, "{}: gap {}", t.symbol, gap);
        }
    }

    /// Spending never exceeds the targeted share of the portfolio.
    #[test]
    fn allocation_stays_within_weights(scenario in scenario_strategy()) {
        let snapshot = scenario.snapshot();
        let targets = scenario.targets();
        let plan = compute_plan(&snapshot, &targets, &DiffParams::new(usd()));
        let after = apply(&snapshot, &plan);

        let invested: f64 = targets
            .iter()
            .map(|t| after.held(t.symbol) * snapshot.price(t.symbol).unwrap())
            .sum();
        let weight_sum: f64 = targets.iter().map(|t| t.weight).sum();
        let slack: f64 = targets.iter().map(|t| 0.01 * snapshot.price(t.symbol).unwrap()).sum();
        prop_assert!(invested <= snapshot.portfolio_value * weight_sum + slack + 1e-6);
    }

    /// A second plan over the filled portfolio has nothing left to trade.
    #[test]
    fn second_plan_is_empty(scenario in scenario_strategy()) {
        let snapshot = scenario.snapshot();
        let targets = scenario.targets();
        let params = DiffParams::new(usd());
        let after = apply(&snapshot, &compute_plan(&snapshot, &targets, &params));

        let again = compute_plan(&after, &targets, &params);
        prop_assert!(again.divestitures.is_empty());
        for order in again.orders() {
            // binary error can leave at most one hundredth behind
            prop_assert!(order.quantity <= 0.01 + 1e-9, "{:?}", order);
        }
    }

    // ========================================================================
    // DIVESTITURE AND ORDERING
    // ========================================================================

    /// Every untargeted holding is sold in full; nothing else is divested.
    #[test]
    fn divestiture_is_complete(scenario in scenario_strategy()) {
        let snapshot = scenario.snapshot();
        let targets = scenario.targets();
        let plan = compute_plan(&snapshot, &targets, &DiffParams::new(usd()));

        for h in &snapshot.holdings {
            let targeted = targets.iter().any(|t| t.symbol == h.symbol);
            let divested = plan.divestitures.iter().find(|o| o.symbol == h.symbol);
            if targeted {
                prop_assert!(divested.is_none());
            } else {
                let order = divested.unwrap();
                prop_assert_eq!(order.quantity, h.quantity);
                prop_assert_eq!(order.reason, OrderReason::Divest);
            }
        }
    }

    /// No buy is ordered before a sell.
    #[test]
    fn sells_precede_buys(scenario in scenario_strategy()) {
        let plan = compute_plan(&scenario.snapshot(), &scenario.targets(), &DiffParams::new(usd()));
        let sides: Vec<Side> = plan.orders().map(|o| o.side).collect();
        let first_buy = sides.iter().position(|s| *s == Side::Buy).unwrap_or(sides.len());
        prop_assert!(sides[first_buy..].iter().all(|s| *s == Side::Buy));
    }

    /// The quote asset is never traded, even when held.
    #[test]
    fn quote_asset_is_never_ordered(scenario in scenario_strategy()) {
        let mut snapshot = scenario.snapshot();
        snapshot.holdings.push(Holding::new(usd(), scenario.cash));
        let plan = compute_plan(&snapshot, &scenario.targets(), &DiffParams::new(usd()));
        prop_assert!(plan.orders().all(|o| o.symbol != usd()));
    }

    // ========================================================================
    // DEADBAND
    // ========================================================================

    /// With a threshold, trades on existing holdings exceed it and suppressed
    /// drifts do not.
    #[test]
    fn deadband_respected(
        scenario in scenario_strategy(),
        threshold in 0.001f64..0.2,
    ) {
        let snapshot = scenario.snapshot();
        prop_assume!(snapshot.portfolio_value > 0.0);
        let targets = scenario.targets();
        let params = DiffParams::new(usd()).with_threshold(threshold);
        let plan = compute_plan(&snapshot, &targets, &params);

        for (_, drift) in &plan.within_threshold {
            prop_assert!(*drift <= threshold);
        }
        for order in plan.sells.iter().chain(plan.buys.iter()) {
            if snapshot.held(order.symbol) > 0.0 {
                let price = snapshot.price(order.symbol).unwrap();
                // truncation shaves at most one hundredth off the drift
                let drift = (order.quantity + 0.01) * price / snapshot.portfolio_value;
                prop_assert!(drift > threshold, "{:?} drift {}", order, drift);
            }
        }
    }

    // ========================================================================
    // MOMENTUM SELECTION
    // ========================================================================

    /// Top-N picks are at most N, best first, each at 1/N.
    #[test]
    fn top_n_selection(
        returns in prop::collection::vec(0.1f64..3.0, 0..UNIVERSE.len()),
        n in 1usize..6,
    ) {
        let scored: Vec<(Symbol, f64)> = returns
            .iter()
            .enumerate()
            .map(|(i, &r)| (Scenario::symbol(i), r))
            .collect();
        let ranked = rank(&scored);
        let picks = select_top(&ranked, n);

        prop_assert_eq!(picks.len(), n.min(scored.len()));
        for w in ranked.windows(2) {
            prop_assert!(w[0].1 >= w[1].1);
        }
        for (pick, (symbol, _)) in picks.iter().zip(ranked.iter()) {
            prop_assert_eq!(pick.symbol, *symbol);
            prop_assert!((pick.weight - 1.0 / n as f64).abs() < 1e-12);
        }
        let total: f64 = picks.iter().map(|p| p.weight).sum();
        prop_assert!(total <= 1.0 + 1e-9);
    }

    // ========================================================================
    // CYCLE COUNTER
    // ========================================================================

    /// A period of P fires on ticks 1, P+1, 2P+1, ...
    #[test]
    fn counter_fires_every_period(period in 1u32..20, ticks in 1usize..100) {
        let mut counter = CycleCounter::new(period);
        for tick in 1..=ticks {
            let fired = counter.tick() == TickAction::Rebalance;
            prop_assert_eq!(fired, (tick - 1) % period as usize == 0, "tick {}", tick);
        }
    }
}
