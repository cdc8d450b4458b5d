//! # weightbook
//!
//! Portfolio rebalancing core: target weights in, ordered orders out.
//!
//! ## Features
//!
//! - **Fixed weights**: converge each asset to `portfolio_value * weight`
//! - **Momentum top-N**: rank a universe by trailing total return, hold the
//!   best `N` at `1/N` each
//! - **Deadband**: ignore maintenance trades smaller than a fraction of the
//!   portfolio
//! - **Divestiture**: sell untargeted holdings in full
//! - **Phased plans**: divestitures, then trims, then buys
//!
//! The crate does no I/O. Prices, positions and order submission belong to a
//! broker; see the `weightbook-broker` and `weightbook-rebalancer` crates.
//!
//! ## Quick Start
//!
//! ```
//! use weightbook::{DiffParams, PortfolioSnapshot, Side, Symbol, TargetAllocation, compute_plan};
//!
//! let spy = Symbol::new("SPY");
//! let snapshot = PortfolioSnapshot::new(10_000.0, vec![]).with_price(spy, 100.0);
//! let targets = [TargetAllocation::new(spy, 0.25)];
//!
//! let plan = compute_plan(&snapshot, &targets, &DiffParams::new(Symbol::new("USD")));
//!
//! assert_eq!(plan.buys.len(), 1);
//! assert_eq!(plan.buys[0].side, Side::Buy);
//! assert_eq!(plan.buys[0].quantity, 25.0);
//! ```
//!
//! ## Deadband
//!
//! With a rebalance threshold, a trade on an existing holding is only planned
//! when its value exceeds `threshold * portfolio_value`:
//!
//! ```
//! use weightbook::{DiffParams, Holding, PortfolioSnapshot, Symbol, TargetAllocation, compute_plan};
//!
//! let aaa = Symbol::new("AAA");
//! // Holding 10 @ $50, target 10.3: a $15 trade on a $10,000 portfolio.
//! let snapshot = PortfolioSnapshot::new(10_000.0, vec![Holding::new(aaa, 10.0)])
//!     .with_price(aaa, 50.0);
//! let targets = [TargetAllocation::new(aaa, 0.0515)];
//! let params = DiffParams::new(Symbol::new("USD")).with_threshold(0.08);
//!
//! assert!(compute_plan(&snapshot, &targets, &params).is_empty());
//! ```
//!
//! ## Cycle counter
//!
//! ```
//! use weightbook::{CycleCounter, TickAction};
//!
//! let mut counter = CycleCounter::new(2);
//! assert_eq!(counter.tick(), TickAction::Rebalance);
//! assert!(matches!(counter.tick(), TickAction::Wait { .. }));
//! assert_eq!(counter.tick(), TickAction::Rebalance);
//! ```

pub mod cost;
pub mod diff;
mod error;
pub mod indicators;
pub mod momentum;
pub mod plan;
pub mod schedule;
mod types;

// Re-export public API
pub use cost::{CostEstimate, FeeModel};
pub use diff::{DiffParams, PortfolioSnapshot, compute_plan};
pub use error::{Skip, SkipReason};
pub use momentum::{MomentumParams, Ranking};
pub use plan::{OrderReason, Phase, PlannedOrder, RebalancePlan};
pub use schedule::{CycleCounter, TickAction};
pub use types::{Holding, QUANTITY_DECIMALS, Side, Symbol, TargetAllocation, truncate_quantity};
